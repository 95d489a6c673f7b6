//! Normalizes heterogeneous user search terms into canonical hex byte strings.

use crate::error::TermError;

/// How a raw user-supplied term should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermMode {
    /// Sniff: pure even-length hex is treated as hex, otherwise as ascii.
    Auto,
    /// The term is already a hexadecimal byte string.
    Hex,
    /// The term is an ascii/raw-bytes string.
    Ascii,
    /// The term is a Unicode string, encoded as UTF-16LE (BOM stripped).
    Unicode,
}

/// A canonical lowercase, even-length hexadecimal search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    hex: String,
    mode: TermMode,
}

impl SearchTerm {
    /// The canonical lowercase hex representation, as passed to `bgparse -s`
    /// and `bgverify`.
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// The mode under which this term was constructed.
    pub fn mode(&self) -> TermMode {
        self.mode
    }
}

/// Result of [`normalize`]: the canonical term plus an optional warning the
/// caller should log (auto-detect falling back to ascii on odd-length hex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// The canonical search term.
    pub term: SearchTerm,
    /// A warning to surface to the user, if any.
    pub warning: Option<String>,
}

fn looks_like_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize a raw user term into a canonical hex [`SearchTerm`].
///
/// See spec.md §4.1 and §8 ("Term normalization laws") for the exact rules.
pub fn normalize(raw: &str, mode: TermMode) -> Result<Normalized, TermError> {
    match mode {
        TermMode::Hex => {
            if !looks_like_hex(raw) {
                return Err(TermError::InvalidHexChar {
                    term: raw.to_string(),
                });
            }
            if raw.len() % 2 != 0 {
                return Err(TermError::OddLengthHex {
                    term: raw.to_string(),
                });
            }
            Ok(Normalized {
                term: SearchTerm {
                    hex: raw.to_ascii_lowercase(),
                    mode: TermMode::Hex,
                },
                warning: None,
            })
        }
        TermMode::Ascii => Ok(Normalized {
            term: SearchTerm {
                hex: hex::encode(raw.as_bytes()),
                mode: TermMode::Ascii,
            },
            warning: None,
        }),
        TermMode::Unicode => {
            let utf16le: Vec<u8> = raw
                .encode_utf16()
                .flat_map(|unit| unit.to_le_bytes())
                .collect();
            Ok(Normalized {
                term: SearchTerm {
                    hex: hex::encode(utf16le),
                    mode: TermMode::Unicode,
                },
                warning: None,
            })
        }
        TermMode::Auto => {
            if looks_like_hex(raw) {
                if raw.len() % 2 == 0 {
                    return Ok(Normalized {
                        term: SearchTerm {
                            hex: raw.to_ascii_lowercase(),
                            mode: TermMode::Hex,
                        },
                        warning: None,
                    });
                }
                return Ok(Normalized {
                    term: SearchTerm {
                        hex: hex::encode(raw.as_bytes()),
                        mode: TermMode::Ascii,
                    },
                    warning: Some(format!(
                        "term {raw:?} appears to be hexadecimal, but has an odd number of \
                         characters and will be treated as an ascii string"
                    )),
                });
            }
            Ok(Normalized {
                term: SearchTerm {
                    hex: hex::encode(raw.as_bytes()),
                    mode: TermMode::Ascii,
                },
                warning: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_mode_accepts_valid_even_length() {
        let n = normalize("41", TermMode::Hex).unwrap();
        assert_eq!(n.term.as_hex(), "41");
    }

    #[test]
    fn hex_mode_rejects_odd_length() {
        assert!(matches!(
            normalize("A", TermMode::Hex),
            Err(TermError::OddLengthHex { .. })
        ));
    }

    #[test]
    fn hex_mode_rejects_non_hex_chars() {
        assert!(matches!(
            normalize("zz", TermMode::Hex),
            Err(TermError::InvalidHexChar { .. })
        ));
    }

    #[test]
    fn ascii_mode_encodes_bytes() {
        let n = normalize("A", TermMode::Ascii).unwrap();
        assert_eq!(n.term.as_hex(), "41");
    }

    #[test]
    fn unicode_mode_encodes_utf16le_without_bom() {
        let n = normalize("AB", TermMode::Unicode).unwrap();
        assert_eq!(n.term.as_hex(), "41004200");
    }

    #[test]
    fn auto_mode_treats_even_hex_as_hex() {
        let n = normalize("41", TermMode::Auto).unwrap();
        assert_eq!(n.term.as_hex(), "41");
        assert_eq!(n.term.mode(), TermMode::Hex);
    }

    #[test]
    fn auto_mode_treats_non_hex_as_ascii() {
        let n = normalize("hello", TermMode::Auto).unwrap();
        assert_eq!(n.term.as_hex(), "68656c6c6f");
    }

    #[test]
    fn auto_mode_warns_on_odd_length_hex_like_input() {
        let n = normalize("abc", TermMode::Auto).unwrap();
        assert!(n.warning.is_some());
        assert_eq!(n.term.mode(), TermMode::Ascii);
    }
}
