//! Display tree for text font families (lyfonts)

use serde::Serialize;

use crate::families::{FamilyMap, StyleList, SubfamilyMap};

/// Sentence shown next to every style.
pub const SAMPLE_TEXT: &str = "The quick brown fox jumps over the lazy dog";

/// Rendering hint for a sample line.
///
/// Best effort: the engine's style aliases do not always correspond to a style
/// the renderer can select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub text: String,
    pub family: String,
    pub style: String,
}

impl Sample {
    pub fn new(subfamily: &str, style: &str) -> Self {
        Self {
            text: SAMPLE_TEXT.to_string(),
            family: subfamily.to_string(),
            style: style.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogNode {
    /// A row; text font rows carry a sample in the second column.
    Leaf {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample: Option<Sample>,
    },
    Container {
        name: String,
        children: Vec<CatalogNode>,
    },
}

impl CatalogNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        CatalogNode::Leaf {
            name: name.into(),
            sample: None,
        }
    }

    pub fn row(name: impl Into<String>, sample: Sample) -> Self {
        CatalogNode::Leaf {
            name: name.into(),
            sample: Some(sample),
        }
    }

    pub fn container(name: impl Into<String>, children: Vec<CatalogNode>) -> Self {
        CatalogNode::Container {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogNode::Leaf { name, .. } | CatalogNode::Container { name, .. } => name,
        }
    }

    pub fn children(&self) -> &[CatalogNode] {
        match self {
            CatalogNode::Leaf { .. } => &[],
            CatalogNode::Container { children, .. } => children,
        }
    }

    pub fn sample(&self) -> Option<&Sample> {
        match self {
            CatalogNode::Leaf { sample, .. } => sample.as_ref(),
            CatalogNode::Container { .. } => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, CatalogNode::Container { .. })
    }
}

/// Builds the compacted family tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct FamilyTreeBuilder;

impl FamilyTreeBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, families: &FamilyMap) -> Vec<CatalogNode> {
        let mut names: Vec<(&String, &SubfamilyMap)> = families.iter().collect();
        // Stable on top of the map's ordinal order, so equal keys stay deterministic.
        names.sort_by_key(|(name, _)| name.to_lowercase());

        let mut roots = Vec::new();
        for (family, subfamilies) in names {
            let mut entries: Vec<CatalogNode> = subfamilies
                .iter()
                .map(|(name, styles)| subfamily_node(name, styles))
                .collect();

            if entries.len() == 1 && entries[0].is_container() {
                roots.append(&mut entries);
            } else {
                roots.push(CatalogNode::container(family.as_str(), entries));
            }
        }
        roots
    }
}

fn subfamily_node(subfamily: &str, styles: &StyleList) -> CatalogNode {
    if let [style] = styles.as_slice() {
        return CatalogNode::row(
            format!("{subfamily} ({style})"),
            Sample::new(subfamily, style),
        );
    }

    let mut sorted: Vec<&String> = styles.as_slice().iter().collect();
    sorted.sort();
    let children = sorted
        .into_iter()
        .map(|style| CatalogNode::row(style.as_str(), Sample::new(subfamily, style)))
        .collect();
    CatalogNode::container(subfamily, children)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn families(entries: &[(&str, &str, &[&str])]) -> FamilyMap {
        let mut map = FamilyMap::new();
        for (family, subfamily, styles) in entries {
            let list = map.entry(family, subfamily);
            for style in *styles {
                list.push_unique(*style);
            }
        }
        map
    }

    #[test]
    fn single_multi_style_subfamily_is_pulled_up() {
        let map = families(&[("Foo", "Foo Sans", &["Italic", "Bold"])]);
        let tree = FamilyTreeBuilder::new().build(&map);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name(), "Foo Sans");
        let styles: Vec<_> = tree[0].children().iter().map(CatalogNode::name).collect();
        assert_eq!(styles, vec!["Bold", "Italic"]);
        assert_eq!(
            tree[0].children()[0].sample(),
            Some(&Sample::new("Foo Sans", "Bold"))
        );
    }

    #[test]
    fn single_style_subfamily_keeps_family_wrapper() {
        let map = families(&[("Foo", "Foo Sans", &["Bold"])]);
        let tree = FamilyTreeBuilder::new().build(&map);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name(), "Foo");
        assert_eq!(tree[0].children().len(), 1);
        let row = &tree[0].children()[0];
        assert!(!row.is_container());
        assert_eq!(row.name(), "Foo Sans (Bold)");
    }

    #[test]
    fn several_subfamilies_are_wrapped_in_order() {
        let map = families(&[
            ("Foo", "b", &["Regular", "Bold"]),
            ("Foo", "B", &["Regular"]),
        ]);
        let tree = FamilyTreeBuilder::new().build(&map);

        assert_eq!(tree.len(), 1);
        let names: Vec<_> = tree[0].children().iter().map(CatalogNode::name).collect();
        assert_eq!(names, vec!["B (Regular)", "b"]);
    }

    #[test]
    fn families_sort_case_insensitively() {
        let map = families(&[
            ("beta", "beta", &["Regular"]),
            ("Alpha", "Alpha", &["Regular"]),
            ("Gamma", "Gamma", &["Regular"]),
        ]);
        let tree = FamilyTreeBuilder::new().build(&map);

        let names: Vec<_> = tree.iter().map(CatalogNode::name).collect();
        assert_eq!(names, vec!["Alpha", "beta", "Gamma"]);
    }
}
