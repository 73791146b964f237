//! Parses `img_hv_requires_version`-style predicates, e.g. `">= 6.0"` or
//! `">=6.0,<8.0"`, and checks them against a hypervisor's integer version
//! number. Like `extra_specs_ops`, the upstream predicate parser wasn't in
//! the retrieved source, so this follows spec.md §6's textual grammar: a
//! comma-separated list of `op value` clauses, all of which must hold.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

fn parse_clause(clause: &str) -> Option<(Op, i64)> {
    let clause = clause.trim();
    for (prefix, op) in [
        ("<=", Op::Le),
        (">=", Op::Ge),
        ("==", Op::Eq),
        ("!=", Op::Ne),
        ("<", Op::Lt),
        (">", Op::Gt),
    ] {
        if let Some(rest) = clause.strip_prefix(prefix) {
            let value = parse_version(rest.trim())?;
            return Some((op, value));
        }
    }
    None
}

/// Hypervisor versions are reported as a single monotonically increasing
/// integer (e.g. `6000000` for `6.0.0`), so a bare `"6.0"` predicate value
/// is read via `semver` and folded into that same integer space.
fn parse_version(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let padded = match raw.matches('.').count() {
        0 => format!("{raw}.0.0"),
        1 => format!("{raw}.0"),
        _ => raw.to_string(),
    };
    let v = semver::Version::parse(&padded).ok()?;
    Some((v.major as i64) * 1_000_000 + (v.minor as i64) * 1_000 + v.patch as i64)
}

/// Returns `true` if `version` satisfies every comma-separated clause in
/// `predicate`. An empty or unparseable predicate string is treated as
/// satisfied, consistent with `ImageProperties`'s "missing property means
/// unconstrained" rule.
pub fn satisfies(predicate: &str, version: i64) -> bool {
    let predicate = predicate.trim();
    if predicate.is_empty() {
        return true;
    }
    predicate.split(',').all(|clause| {
        let Some((op, target)) = parse_clause(clause) else {
            return true;
        };
        match op {
            Op::Lt => version < target,
            Op::Le => version <= target,
            Op::Gt => version > target,
            Op::Ge => version >= target,
            Op::Eq => version == target,
            Op::Ne => version != target,
        }
    })
}
