use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where a label points once numbering is done.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LabelTarget {
    /// Output file that holds the anchor.
    pub file: PathBuf,
    pub anchor: String,
    /// Display number, e.g. `2.3`. Empty when the target is unnumbered.
    pub number: String,
}

/// Label key to target. Keys are `kind:name` (`thm:main`) for kinded labels
/// and the bare name for `\label`.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    entries: BTreeMap<String, LabelTarget>,
}

impl LabelTable {
    /// Inserts or replaces a label, returning the entry it replaced.
    pub fn insert(&mut self, key: impl Into<String>, target: LabelTarget) -> Option<LabelTarget> {
        self.entries.insert(key.into(), target)
    }

    pub fn get(&self, key: &str) -> Option<&LabelTarget> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabelTarget)> {
        self.entries.iter().map(|(key, target)| (key.as_str(), target))
    }
}

/// Human-readable name of a label or environment kind.
pub fn kind_title(kind: &str) -> Option<&'static str> {
    let title = match kind {
        "chap" | "chapter" => "Chapter",
        "sec" | "section" => "Section",
        "subsection" => "Subsection",
        "subsubsection" => "Subsubsection",
        "thm" => "Theorem",
        "lem" => "Lemma",
        "fig" | "figure" => "Figure",
        "eq" | "equation" => "Equation",
        "exc" => "Exercise",
        "proof" => "Proof",
        _ => return None,
    };
    Some(title)
}

/// Splits `thmref` into `thm`; `ref` and `pageref` have no kind.
pub fn ref_kind(command: &str) -> &str {
    match command {
        "ref" | "pageref" => "",
        other => other.strip_suffix("ref").unwrap_or(other),
    }
}

/// Label key for a reference of `kind` to `name`.
pub fn label_key(kind: &str, name: &str) -> String {
    if kind.is_empty() {
        name.to_string()
    } else {
        format!("{kind}:{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelTable, LabelTarget, kind_title, label_key, ref_kind};
    use std::path::PathBuf;

    fn target(anchor: &str) -> LabelTarget {
        LabelTarget {
            file: PathBuf::from("a.html"),
            anchor: anchor.to_string(),
            number: "1".to_string(),
        }
    }

    #[test]
    fn insert_reports_replaced_entry() {
        let mut table = LabelTable::default();
        assert!(table.insert("thm:x", target("thm:1.1")).is_none());
        let old = table.insert("thm:x", target("thm:1.2"));
        assert_eq!(old.map(|t| t.anchor), Some("thm:1.1".to_string()));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("thm:x").map(|t| t.anchor.as_str()), Some("thm:1.2"));
    }

    #[test]
    fn reference_kinds() {
        assert_eq!(ref_kind("thmref"), "thm");
        assert_eq!(ref_kind("eqref"), "eq");
        assert_eq!(ref_kind("ref"), "");
        assert_eq!(ref_kind("pageref"), "");
        assert_eq!(label_key("thm", "main"), "thm:main");
        assert_eq!(label_key("", "here"), "here");
        assert_eq!(kind_title("lem"), Some("Lemma"));
        assert_eq!(kind_title("unknown"), None);
    }
}
