//! Parsed output of a collaborator search (`bgparse`) pass: candidate files
//! and their raw metadata.

use std::collections::HashMap;

/// A single typed metadata value, as carried by a `.bgi` index's sidecar
/// metadata and compared against `-f/--filter` predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// An integer-valued field (e.g. `size=1024`).
    Int(i64),
    /// A string-valued field, kept verbatim (e.g. `name=foo.exe`).
    Str(String),
}

impl MetadataValue {
    /// Parse a raw metadata token, preferring an integer interpretation and
    /// falling back to a string one. Mirrors the `typeify` helper used when
    /// reading `bgparse` candidate lines.
    pub fn typeify(raw: &str) -> MetadataValue {
        match raw.parse::<i64>() {
            Ok(n) => MetadataValue::Int(n),
            Err(_) => MetadataValue::Str(raw.to_string()),
        }
    }

    /// The value rendered back to its string form, used for `~` (regex) and
    /// prefix-match comparisons that operate on text regardless of the
    /// value's parsed type.
    pub fn as_display(&self) -> String {
        match self {
            MetadataValue::Int(n) => n.to_string(),
            MetadataValue::Str(s) => s.clone(),
        }
    }
}

/// Key/value metadata attached to a candidate file, parsed lazily from the
/// comma-separated tail of a `bgparse` output line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataMap(HashMap<String, MetadataValue>);

impl MetadataMap {
    /// Parse a raw `key=value,key=value,...` metadata string.
    ///
    /// Fields that don't contain an `=` are skipped rather than treated as
    /// fatal: a `.bgi` producing slightly malformed metadata shouldn't sink
    /// the whole search.
    pub fn parse(raw: &str) -> MetadataMap {
        let mut map = HashMap::new();
        for field in raw.split(',') {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            if let Some((key, value)) = field.split_once('=') {
                map.insert(key.trim().to_string(), MetadataValue::typeify(value.trim()));
            }
        }
        MetadataMap(map)
    }

    /// Look up a metadata field by key.
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    /// Whether the map has no entry for `key`.
    pub fn is_missing(&self, key: &str) -> bool {
        !self.0.contains_key(key)
    }
}

/// A single file produced by a `bgparse` search pass, with its metadata
/// parsed on first use rather than eagerly, since most candidates are
/// re-emitted by `bgverify` verbatim without ever being inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Path to the candidate file, as reported by the collaborator.
    pub file_path: String,
    /// Raw, unparsed metadata tail of the candidate line.
    pub raw_metadata: String,
}

impl Candidate {
    /// Parse a raw `bgparse` stdout line of the form `<path>,<metadata>`.
    /// `raw_metadata` keeps the leading comma (it is the remainder of the
    /// line after the path, not the comma-separated fields themselves), so
    /// a bare path with no metadata yields an empty `raw_metadata` and can
    /// be printed back as `{file_path}{raw_metadata}` with no stray comma.
    pub fn parse_line(line: &str) -> Candidate {
        match line.find(',') {
            Some(pos) => Candidate {
                file_path: line[..pos].to_string(),
                raw_metadata: line[pos..].to_string(),
            },
            None => Candidate {
                file_path: line.to_string(),
                raw_metadata: String::new(),
            },
        }
    }

    /// Parse this candidate's metadata tail into a [`MetadataMap`].
    pub fn metadata(&self) -> MetadataMap {
        MetadataMap::parse(&self.raw_metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_splits_path_and_metadata() {
        let c = Candidate::parse_line("/bin/ls,size=123,name=ls");
        assert_eq!(c.file_path, "/bin/ls");
        let meta = c.metadata();
        assert_eq!(meta.get("size"), Some(&MetadataValue::Int(123)));
        assert_eq!(meta.get("name"), Some(&MetadataValue::Str("ls".to_string())));
    }

    #[test]
    fn parse_line_without_metadata() {
        let c = Candidate::parse_line("/bin/ls");
        assert_eq!(c.file_path, "/bin/ls");
        assert!(c.metadata().is_missing("size"));
        assert_eq!(c.raw_metadata, "");
    }

    #[test]
    fn parse_line_keeps_leading_comma_in_raw_metadata() {
        let c = Candidate::parse_line("/bin/ls,size=123");
        assert_eq!(c.raw_metadata, ",size=123");
        assert_eq!(format!("{}{}", c.file_path, c.raw_metadata), "/bin/ls,size=123");
    }

    #[test]
    fn typeify_prefers_int() {
        assert_eq!(MetadataValue::typeify("42"), MetadataValue::Int(42));
        assert_eq!(
            MetadataValue::typeify("42a"),
            MetadataValue::Str("42a".to_string())
        );
    }
}
