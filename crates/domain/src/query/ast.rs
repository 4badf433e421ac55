use std::fmt;

use crate::record::{FieldValue, Record};

use super::QueryError;
use super::parser::Parser;

/// One end of an inclusive range clause. `*` in the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    Unbounded,
    Value(String),
}

/// Typed query over record fields.
///
/// Composed programmatically by the handler and parsed from the
/// wire-format language used in rule conditions (`field:value`,
/// `field:te*`, `field:[min TO max]`, `AND`/`OR`/`NOT`, parentheses).
/// Composing through the AST instead of string concatenation keeps
/// rule conditions free of quoting and injection pitfalls.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Exact field match. Numeric-aware: `counter:100` matches an
    /// integer field holding 100.
    Term { field: String, value: String },
    /// Glob match (`*` and `?`) on the string form of a field value.
    /// `field:*` doubles as a field-presence test.
    Wildcard { field: String, pattern: String },
    /// Inclusive range, numeric when both sides are numeric, otherwise
    /// lexicographic.
    Range {
        field: String,
        min: Bound,
        max: Bound,
    },
    Not(Box<Query>),
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Query {
    /// Parse the wire-format query language.
    pub fn parse(input: &str) -> Result<Query, QueryError> {
        Parser::new(input).parse()
    }

    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Query {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn wildcard(field: impl Into<String>, pattern: impl Into<String>) -> Query {
        Query::Wildcard {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn range(field: impl Into<String>, min: Bound, max: Bound) -> Query {
        Query::Range {
            field: field.into(),
            min,
            max,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(query: Query) -> Query {
        Query::Not(Box::new(query))
    }

    /// Conjunction, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Query) -> Query {
        match self {
            Query::And(mut clauses) => {
                clauses.push(other);
                Query::And(clauses)
            }
            first => Query::And(vec![first, other]),
        }
    }

    /// Disjunction, flattening nested `Or`s.
    #[must_use]
    pub fn or(self, other: Query) -> Query {
        match self {
            Query::Or(mut clauses) => {
                clauses.push(other);
                Query::Or(clauses)
            }
            first => Query::Or(vec![first, other]),
        }
    }

    /// Evaluate this query against a single record.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Query::Term { field, value } => record
                .get(field)
                .is_some_and(|actual| term_matches(actual, value)),
            Query::Wildcard { field, pattern } => record
                .get(field)
                .is_some_and(|actual| wildcard_match(pattern, &actual.to_string())),
            Query::Range { field, min, max } => record
                .get(field)
                .is_some_and(|actual| range_matches(actual, min, max)),
            Query::Not(inner) => !inner.matches(record),
            Query::And(clauses) => clauses.iter().all(|q| q.matches(record)),
            Query::Or(clauses) => clauses.iter().any(|q| q.matches(record)),
        }
    }
}

fn term_matches(actual: &FieldValue, expected: &str) -> bool {
    match actual {
        FieldValue::Str(s) => s == expected,
        FieldValue::Bool(b) => expected.parse::<bool>() == Ok(*b),
        FieldValue::Int(_) | FieldValue::Float(_) => {
            let value = actual.as_f64().unwrap_or_default();
            expected
                .parse::<f64>()
                .is_ok_and(|e| e.total_cmp(&value).is_eq())
        }
    }
}

fn range_matches(actual: &FieldValue, min: &Bound, max: &Bound) -> bool {
    let numeric_bound = |b: &Bound| match b {
        Bound::Unbounded => Some(None),
        Bound::Value(v) => v.parse::<f64>().ok().map(Some),
    };

    // Numeric comparison when the field and both bounds are numeric.
    if let Some(value) = actual.as_f64()
        && let Some(lo) = numeric_bound(min)
        && let Some(hi) = numeric_bound(max)
    {
        return lo.is_none_or(|lo| value >= lo) && hi.is_none_or(|hi| value <= hi);
    }

    // Fall back to lexicographic comparison on the string form.
    let value = actual.to_string();
    let lo_ok = match min {
        Bound::Unbounded => true,
        Bound::Value(v) => value.as_str() >= v.as_str(),
    };
    let hi_ok = match max {
        Bound::Unbounded => true,
        Bound::Value(v) => value.as_str() <= v.as_str(),
    };
    lo_ok && hi_ok
}

/// Glob match supporting `*` (any run) and `?` (any single char).
/// Iterative with star backtracking; no allocation.
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

// ── Wire-format serialization ──────────────────────────────────────

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Unbounded => write!(f, "*"),
            Bound::Value(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term { field, value } => write!(f, "{field}:{}", quote_value(value)),
            Query::Wildcard { field, pattern } => write!(f, "{field}:{pattern}"),
            Query::Range { field, min, max } => write!(f, "{field}:[{min} TO {max}]"),
            Query::Not(inner) => {
                write!(f, "NOT ")?;
                write_operand(f, inner)
            }
            Query::And(clauses) => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write_operand(f, clause)?;
                }
                Ok(())
            }
            Query::Or(clauses) => {
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{clause}")?;
                }
                Ok(())
            }
        }
    }
}

/// Parenthesize composite operands so precedence survives a round trip.
fn write_operand(f: &mut fmt::Formatter<'_>, query: &Query) -> fmt::Result {
    match query {
        Query::And(_) | Query::Or(_) => write!(f, "({query})"),
        other => write!(f, "{other}"),
    }
}

fn quote_value(value: &str) -> String {
    let needs_quoting = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ':' | '"'));
    if needs_quoting {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}
