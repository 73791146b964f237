//! Comparator grammar for matching an `extra_specs` value against a set of
//! candidate strings (aggregate metadata values, image properties, ...).
//!
//! Not transliterated from an original implementation: the upstream
//! `extra_specs_ops` module wasn't available to consult, so this is built
//! directly from the operator grammar spec.md §6 documents: `=`, `<=`,
//! `>=`, `==`, `!=`, `<`, `>`, the `s`-prefixed string variants, `<in>`,
//! `<all-in>`, `<or>`, and bare-operand equality.
use std::cmp::Ordering;

/// Evaluates a single extra_specs requirement string (e.g. `">= 4"`,
/// `"<in> ssd"`, `"foo"`) against the set of values a host (or aggregate)
/// advertises for the corresponding key. Returns `true` if any advertised
/// value satisfies the requirement.
pub fn match_any(requirement: &str, values: impl IntoIterator<Item = impl AsRef<str>>) -> bool {
    let requirement = requirement.trim();
    for value in values {
        if match_one(requirement, value.as_ref()) {
            return true;
        }
    }
    false
}

fn match_one(requirement: &str, value: &str) -> bool {
    if let Some(rest) = requirement.strip_prefix("<or>") {
        let value = value.trim();
        return rest.split_whitespace().any(|alt| alt == value);
    }
    if let Some(rest) = requirement.strip_prefix("<all-in>") {
        let wanted: Vec<&str> = rest.split_whitespace().collect();
        return !wanted.is_empty() && wanted.iter().all(|w| value.contains(w));
    }
    if let Some(rest) = requirement.strip_prefix("<in>") {
        return value.contains(rest.trim());
    }

    for (op, cmp) in STRING_OPS {
        if let Some(rest) = requirement.strip_prefix(op) {
            return cmp(value, rest.trim());
        }
    }
    for (op, cmp) in NUMERIC_OPS {
        if let Some(rest) = requirement.strip_prefix(op) {
            let (Ok(lhs), Ok(rhs)) = (value.trim().parse::<f64>(), rest.trim().parse::<f64>())
            else {
                return false;
            };
            return cmp(lhs, rhs);
        }
    }

    // No operator prefix: bare-operand equality against the raw value.
    value.trim() == requirement
}

type StringCmp = fn(&str, &str) -> bool;
type NumericCmp = fn(f64, f64) -> bool;

const STRING_OPS: &[(&str, StringCmp)] = &[
    ("s==", |v, r| v == r),
    ("s!=", |v, r| v != r),
    ("s<=", |v, r| v <= r),
    ("s>=", |v, r| v >= r),
    ("s<", |v, r| v < r),
    ("s>", |v, r| v > r),
];

const NUMERIC_OPS: &[(&str, NumericCmp)] = &[
    ("==", |v, r| v == r),
    ("!=", |v, r| v != r),
    ("<=", |v, r| v <= r),
    (">=", |v, r| v >= r),
    // Bare "=" is documented as "(numeric ≥)", not equality.
    ("=", |v, r| v >= r),
    ("<", |v, r| matches!(v.partial_cmp(&r), Some(Ordering::Less))),
    (">", |v, r| matches!(v.partial_cmp(&r), Some(Ordering::Greater))),
];
