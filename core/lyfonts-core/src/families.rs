//! Text font families and style reconciliation (lyfonts)

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::styles::LocalStyles;

/// Ordered, duplicate-free style names of one subfamily.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StyleList(Vec<String>);

impl StyleList {
    /// Append `style` unless an identical entry is already present.
    pub fn push_unique(&mut self, style: impl Into<String>) -> bool {
        let style = style.into();
        if self.0.contains(&style) {
            return false;
        }
        self.0.push(style);
        true
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Subfamily name → styles, iterated in ordinal order.
pub type SubfamilyMap = BTreeMap<String, StyleList>;

/// Family → subfamily → styles as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FamilyMap {
    families: BTreeMap<String, SubfamilyMap>,
}

impl FamilyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `(family, subfamily)` exists and return its style list.
    pub fn entry(&mut self, family: &str, subfamily: &str) -> &mut StyleList {
        self.families
            .entry(family.to_string())
            .or_default()
            .entry(subfamily.to_string())
            .or_default()
    }

    pub fn family(&self, name: &str) -> Option<&SubfamilyMap> {
        self.families.get(name)
    }

    pub fn styles(&self, family: &str, subfamily: &str) -> Option<&[String]> {
        self.families
            .get(family)
            .and_then(|subs| subs.get(subfamily))
            .map(StyleList::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SubfamilyMap)> {
        self.families.iter()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// Rewrites style tokens the engine spells differently from the font system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleAliases {
    table: HashMap<String, String>,
}

impl Default for StyleAliases {
    fn default() -> Self {
        Self::empty().with_alias("BoldItalic", "Bold Italic")
    }
}

impl StyleAliases {
    /// A table that passes every token through unchanged.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.table.insert(from.into(), to.into());
        self
    }

    pub fn normalize<'a>(&'a self, token: &'a str) -> &'a str {
        self.table.get(token).map(String::as_str).unwrap_or(token)
    }
}

/// Reconciles engine style descriptors with the local style lookup.
///
/// A descriptor looks like `DejaVu Sans,DejaVu Sans Condensed:style=Bold,Fett`.
/// The subfamily is the last comma-separated name before the colon; the
/// resolved style is the first engine token the local system knows, or the
/// first token when nothing matches.
pub struct StyleMatcher<'a> {
    local: &'a dyn LocalStyles,
    aliases: &'a StyleAliases,
}

impl<'a> StyleMatcher<'a> {
    pub fn new(local: &'a dyn LocalStyles, aliases: &'a StyleAliases) -> Self {
        Self { local, aliases }
    }

    /// Record the style described by `descriptor` under `family`.
    ///
    /// Returns `false` and leaves `families` untouched when the descriptor does
    /// not have exactly two colon-separated segments.
    pub fn add_style_to_family(
        &self,
        families: &mut FamilyMap,
        family: &str,
        descriptor: &str,
    ) -> bool {
        let segments: Vec<&str> = descriptor.trim().split(':').collect();
        let [names, styles] = segments.as_slice() else {
            debug!(family, descriptor, "skipping malformed style descriptor");
            return false;
        };

        let subfamily = subfamily_name(names);
        let tokens = style_tokens(styles);
        let resolved = self.resolve(&subfamily, &tokens);

        let list = families.entry(family, &subfamily);
        if let Some(style) = resolved {
            list.push_unique(style);
        }
        true
    }

    /// Pick the style for `subfamily` from the engine's `tokens`.
    pub fn resolve(&self, subfamily: &str, tokens: &[&str]) -> Option<String> {
        let first = tokens.first().map(|t| self.aliases.normalize(t))?;

        let known = self.local.styles(subfamily);
        if known.is_empty() {
            return Some(first.to_string());
        }

        let matched = tokens
            .iter()
            .map(|t| self.aliases.normalize(t))
            .find(|style| known.contains(*style))
            .unwrap_or(first);
        Some(matched.to_string())
    }
}

fn subfamily_name(names: &str) -> String {
    names
        .rsplit(',')
        .next()
        .unwrap_or(names)
        .replace("\\-", "-")
}

fn style_tokens(segment: &str) -> Vec<&str> {
    let list = segment.strip_prefix("style=").unwrap_or(segment);
    list.split(',').collect()
}
