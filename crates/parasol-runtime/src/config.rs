//! The `[Name]` / `Key = Value` config file format described in `spec.md`
//! §6, used for font metrics overrides, display info, and screen mode
//! enumeration. This is not TOML — no quoting rules, no nested tables — so
//! it is parsed by hand as a small line reader rather than pulled in as a
//! dependency on the `toml` crate.

use compact_str::CompactString;
use std::collections::HashMap;

/// A parsed config file: an ordered list of section names, each holding a
/// `Key = Value` map. Duplicate keys within a section: last write wins,
/// matching the original `ConfigBuffer` semantics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    sections: Vec<(CompactString, HashMap<CompactString, CompactString>)>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<(CompactString, HashMap<CompactString, CompactString>)> = Vec::new();
        let mut current: Option<usize> = None;

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                sections.push((CompactString::from(name.trim()), HashMap::new()));
                current = Some(sections.len() - 1);
                continue;
            }
            let Some((key, value)) = line.split_once('=') else { continue };
            let key = CompactString::from(key.trim());
            let value = CompactString::from(value.trim());
            match current {
                Some(idx) => {
                    sections[idx].1.insert(key, value);
                }
                None => {
                    // A `Key = Value` line before any `[Section]` header: the
                    // original format has no bare top-level keys, so this is
                    // tolerated by starting an implicit unnamed section.
                    sections.push((CompactString::new(), HashMap::new()));
                    let idx = sections.len() - 1;
                    current = Some(idx);
                    sections[idx].1.insert(key, value);
                }
            }
        }

        Self { sections }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.iter().find(|(name, _)| name == section)?.1.get(key).map(|v| v.as_str())
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    pub fn section(&self, name: &str) -> Option<&HashMap<CompactString, CompactString>> {
        self.sections.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [Display]
        Width = 1920
        Height = 1080

        [Display]
        Width = 1280
        RefreshRate = 60
    "#;

    #[test]
    fn reads_multiple_sections_and_keys() {
        let cfg = ConfigFile::parse(SAMPLE);
        assert_eq!(cfg.section_names().collect::<Vec<_>>(), vec!["Display", "Display"]);
        assert_eq!(cfg.get("Display", "Height"), Some("1080"));
    }

    #[test]
    fn last_duplicate_section_key_wins_when_merged_by_caller() {
        let cfg = ConfigFile::parse(SAMPLE);
        // Two sections named "Display" are kept distinct (as the original
        // ConfigBuffer's ordered list does); callers that want a merged view
        // fold sections with the same name themselves, last write winning.
        let merged_width = cfg
            .section_names()
            .enumerate()
            .filter(|(_, n)| *n == "Display")
            .filter_map(|(i, _)| cfg.sections[i].1.get("Width"))
            .last()
            .cloned();
        assert_eq!(merged_width.as_deref(), Some("1280"));
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        let cfg = ConfigFile::parse("# comment\n\n[A]\n; also a comment\nX = 1\n");
        assert_eq!(cfg.get("A", "X"), Some("1"));
    }

    #[test]
    fn duplicate_key_within_one_section_keeps_last_value() {
        let cfg = ConfigFile::parse("[A]\nX = 1\nX = 2\n");
        assert_eq!(cfg.get("A", "X"), Some("2"));
    }
}
