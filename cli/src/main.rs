//! Binary entrypoint for lyfonts-cli

fn main() {
    if let Err(err) = lyfonts_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
