//! Parsing and evaluation of `-f/--filter` metadata predicates.

use regex::Regex;

use crate::candidate::{MetadataMap, MetadataValue};
use crate::error::FilterError;

/// A comparison operator usable in a `-f/--filter` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `==` or `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `~`, a regex match against the field's string form.
    Regex,
}

impl FilterOp {
    fn from_str(raw: &str) -> Option<FilterOp> {
        match raw {
            "=" | "==" => Some(FilterOp::Eq),
            "!=" => Some(FilterOp::Ne),
            ">" => Some(FilterOp::Gt),
            ">=" => Some(FilterOp::Ge),
            "<" => Some(FilterOp::Lt),
            "<=" => Some(FilterOp::Le),
            "~" => Some(FilterOp::Regex),
            _ => None,
        }
    }
}

/// A single parsed `key OP value` metadata predicate.
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    key: String,
    op: FilterOp,
    value: MetadataValue,
    regex: Option<Regex>,
    /// Whether `value` ends in `*`, making `Eq` a prefix match rather than
    /// an exact one (e.g. `name=foo*`).
    prefix: bool,
}

fn predicate_pattern() -> Regex {
    Regex::new(r#"^(\w+)\s*([><=!~]{1,2})\s*([\w/*\-+]+)$"#)
        .expect("filter predicate pattern is a fixed, valid regex")
}

impl FilterPredicate {
    /// Parse a single `-f/--filter` expression, e.g. `size>=1024` or
    /// `name=foo*`.
    pub fn parse(expr: &str) -> Result<FilterPredicate, FilterError> {
        let expr = expr.trim();
        let pattern = predicate_pattern();
        let caps = pattern.captures(expr).ok_or_else(|| FilterError::Malformed {
            expr: expr.to_string(),
        })?;
        let key = caps[1].to_string();
        let op_raw = &caps[2];
        let value_raw = &caps[3];

        let op = FilterOp::from_str(op_raw).ok_or_else(|| FilterError::UnsupportedOperator {
            expr: expr.to_string(),
        })?;

        let regex = if op == FilterOp::Regex {
            // Anchored at the start to match Python's `re.match` semantics
            // (unanchored `Regex::is_match` would accept a substring match
            // anywhere in the field, which is looser than the original).
            Some(
                Regex::new(&format!("^(?:{value_raw})")).map_err(|source| FilterError::InvalidRegex {
                    expr: expr.to_string(),
                    source,
                })?,
            )
        } else {
            None
        };

        let (value_raw, prefix) = if op == FilterOp::Eq {
            match value_raw.strip_suffix('*') {
                Some(stripped) => (stripped, true),
                None => (value_raw.as_ref(), false),
            }
        } else {
            (value_raw.as_ref(), false)
        };

        Ok(FilterPredicate {
            key,
            op,
            value: MetadataValue::typeify(value_raw),
            regex,
            prefix,
        })
    }

    /// The metadata key this predicate compares against.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn matches(&self, field: &MetadataValue) -> bool {
        match self.op {
            FilterOp::Regex => self
                .regex
                .as_ref()
                .expect("Regex predicates always carry a compiled regex")
                .is_match(&field.as_display()),
            FilterOp::Eq if self.prefix => field.as_display().starts_with(&self.value.as_display()),
            FilterOp::Eq => field == &self.value,
            FilterOp::Ne => field != &self.value,
            FilterOp::Gt | FilterOp::Ge | FilterOp::Lt | FilterOp::Le => {
                match (field, &self.value) {
                    (MetadataValue::Int(a), MetadataValue::Int(b)) => match self.op {
                        FilterOp::Gt => a > b,
                        FilterOp::Ge => a >= b,
                        FilterOp::Lt => a < b,
                        FilterOp::Le => a <= b,
                        _ => unreachable!(),
                    },
                    (a, b) => {
                        let (a, b) = (a.as_display(), b.as_display());
                        match self.op {
                            FilterOp::Gt => a > b,
                            FilterOp::Ge => a >= b,
                            FilterOp::Lt => a < b,
                            FilterOp::Le => a <= b,
                            _ => unreachable!(),
                        }
                    }
                }
            }
        }
    }
}

/// Outcome of evaluating every filter predicate against a candidate's
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterVerdict {
    /// Whether the candidate passed every predicate it could be evaluated
    /// against. A candidate missing a key is, per spec, treated as passing
    /// that predicate (with the key recorded in `missing_keys`).
    pub passed: bool,
    /// Metadata keys referenced by a predicate but absent from the
    /// candidate, annotated onto the result as `FILTER_MISSING_METADATA`.
    pub missing_keys: Vec<String>,
}

/// Evaluate every predicate against `metadata`, short-circuiting on the
/// first predicate that fails outright (a key present but not matching).
pub fn evaluate(predicates: &[FilterPredicate], metadata: &MetadataMap) -> FilterVerdict {
    let mut missing_keys = Vec::new();
    for predicate in predicates {
        match metadata.get(predicate.key()) {
            None => missing_keys.push(predicate.key().to_string()),
            Some(field) => {
                if !predicate.matches(field) {
                    return FilterVerdict {
                        passed: false,
                        missing_keys,
                    };
                }
            }
        }
    }
    FilterVerdict {
        passed: true,
        missing_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_ge_predicate() {
        let p = FilterPredicate::parse("size>=1024").unwrap();
        let meta = MetadataMap::parse("size=2048");
        assert!(evaluate(&[p], &meta).passed);
    }

    #[test]
    fn numeric_predicate_fails_below_threshold() {
        let p = FilterPredicate::parse("size>=1024").unwrap();
        let meta = MetadataMap::parse("size=10");
        assert!(!evaluate(&[p], &meta).passed);
    }

    #[test]
    fn prefix_match_on_trailing_star() {
        let p = FilterPredicate::parse("name=foo*").unwrap();
        let meta = MetadataMap::parse("name=foobar.exe");
        assert!(evaluate(&[p], &meta).passed);
    }

    #[test]
    fn missing_key_passes_but_is_annotated() {
        let p = FilterPredicate::parse("size>=1024").unwrap();
        let meta = MetadataMap::parse("name=foo");
        let verdict = evaluate(&[p], &meta);
        assert!(verdict.passed);
        assert_eq!(verdict.missing_keys, vec!["size".to_string()]);
    }

    #[test]
    fn malformed_expression_is_rejected() {
        assert!(matches!(
            FilterPredicate::parse("not a filter"),
            Err(FilterError::Malformed { .. })
        ));
    }

    #[test]
    fn regex_predicate_matches_display_form() {
        let p = FilterPredicate::parse(r"name~foobar").unwrap();
        let meta = MetadataMap::parse("name=foobar.exe");
        assert!(evaluate(&[p], &meta).passed);
    }

    #[test]
    fn regex_predicate_is_anchored_at_start() {
        let p = FilterPredicate::parse(r"name~bar").unwrap();
        let meta = MetadataMap::parse("name=foobar.exe");
        assert!(!evaluate(&[p], &meta).passed);
    }
}
