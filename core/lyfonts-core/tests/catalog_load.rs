//! Full load cycles against a scripted stand-in for the engine.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lyfonts_core::catalog::{FontCatalog, LoadState};
use lyfonts_core::engine::{EngineInfo, LogSink, TokioLauncher};
use lyfonts_core::music::MusicFormat;
use lyfonts_core::styles::{NoLocalStyles, StaticStyles};

fn fake_engine(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod");
    path
}

#[tokio::test(flavor = "multi_thread")]
async fn loads_text_music_and_misc_catalogs() {
    let temp = tempfile::tempdir().expect("tempdir");
    let engine = fake_engine(
        temp.path(),
        "lilypond",
        r#"[ "$1" = "-dshow-available-fonts" ] || exit 2
echo 'Config files: /etc/fonts/fonts.conf'
echo 'Font dir: /usr/share/fonts'
echo 'family Foo-10'
echo 'Foo,FooBold:style=Bold,BoldItalic'
echo 'Config dir: /etc/fonts/conf.d' >&2"#,
    );
    let datadir = temp.path().join("share");
    let otf = datadir.join("fonts").join("otf");
    fs::create_dir_all(&otf).expect("mkdir");
    fs::write(otf.join("emmentaler-11.otf"), b"").expect("touch");

    let styles = StaticStyles::new().with_family("FooBold", ["Bold", "Italic"]);
    let catalog = FontCatalog::new(Arc::new(TokioLauncher::current()), Arc::new(styles));
    let info = EngineInfo::new(&engine).with_datadir(&datadir);

    let seen = Arc::new(parking_lot::Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    let sink: LogSink = Arc::new(move |_line: &str| *counter.lock() += 1);

    let ready = catalog.load(&info, Some(sink)).expect("load");
    assert!(!catalog.is_loaded());
    assert!(catalog.music_fonts().is_empty());
    assert!(ready.wait().await);

    assert_eq!(catalog.state(), LoadState::Loaded);
    assert_eq!(*seen.lock(), 5);
    assert_eq!(catalog.raw_log().len(), 5);

    let tree = catalog.family_tree();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].children()[0].name(), "FooBold (Bold)");

    let misc = catalog.misc_catalog();
    assert_eq!(misc.config_files, vec!["/etc/fonts/fonts.conf"]);
    assert_eq!(misc.config_dirs, vec!["/etc/fonts/conf.d"]);
    assert_eq!(misc.font_dirs, vec!["/usr/share/fonts"]);

    let music = catalog.music_fonts();
    let emmentaler = music.get("emmentaler").expect("music font");
    assert_eq!(
        emmentaler.completeness(MusicFormat::Otf).to_string(),
        "Missing: 13, 14, 16, 18, 20, 23, 26"
    );
    assert!(catalog.job_status().expect("status").success());
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_engine_still_reaches_loaded() {
    let temp = tempfile::tempdir().expect("tempdir");
    let engine = fake_engine(temp.path(), "lilypond", "exit 3");

    let catalog = FontCatalog::new(Arc::new(TokioLauncher::current()), Arc::new(NoLocalStyles));
    let ready = catalog.load(&EngineInfo::new(&engine), None).expect("load");
    assert!(ready.wait().await);

    assert!(catalog.is_loaded());
    assert!(catalog.family_tree().is_empty());
    assert!(catalog.misc_catalog().is_empty());
    assert!(!catalog.job_status().expect("status").success());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_engine_still_reaches_loaded() {
    let catalog = FontCatalog::new(Arc::new(TokioLauncher::current()), Arc::new(NoLocalStyles));
    let ready = catalog
        .load(&EngineInfo::new("/nonexistent/lilypond"), None)
        .expect("load");
    assert!(ready.wait().await);

    assert!(catalog.is_loaded());
    assert!(catalog.raw_log().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn reload_replaces_previous_results() {
    let temp = tempfile::tempdir().expect("tempdir");
    let engine = fake_engine(temp.path(), "lilypond-a", "echo 'Font dir: /first'");
    let catalog = FontCatalog::new(Arc::new(TokioLauncher::current()), Arc::new(NoLocalStyles));

    let ready = catalog.load(&EngineInfo::new(&engine), None).expect("load");
    assert!(ready.wait().await);
    assert_eq!(catalog.misc_catalog().font_dirs, vec!["/first"]);

    let engine = fake_engine(temp.path(), "lilypond-b", "echo 'Font dir: /second'");
    let ready = catalog.load(&EngineInfo::new(&engine), None).expect("reload");
    assert!(ready.wait().await);
    assert_eq!(catalog.misc_catalog().font_dirs, vec!["/second"]);
}
