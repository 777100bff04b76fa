//! Dotted path lookups into store values.
//!
//! `"a.b.c"` is split on `.` and looked up segment by segment: object fields
//! by key (tracked), list items by index. Anything missing along the way
//! resolves to nothing rather than failing.

use ferry_store::Value;

/// Resolves `path` against `root`.
///
/// Returns `None` when the path is absent, when a segment is missing or lands
/// on a non-container, and when the final value is `Undefined`.
pub fn resolve(root: &Value, path: Option<&str>) -> Option<Value> {
    let path = path?;
    let mut current = root.clone();
    for segment in path.split('.') {
        current = current.member(segment)?;
    }
    (!current.is_undefined()).then_some(current)
}

/// [`resolve`], falling back to `default`.
pub fn resolve_or(root: &Value, path: &str, default: Value) -> Value {
    resolve(root, Some(path)).unwrap_or(default)
}

/// The object a function found at `path` should be called on: `root` for a
/// single segment, otherwise whatever all but the last segment resolve to.
pub fn parent_of(root: &Value, path: &str) -> Value {
    match path.rsplit_once('.') {
        None => root.clone(),
        Some((parent, _)) => resolve_or(root, parent, Value::Undefined),
    }
}

/// The last segment of `path`, used as the default binding key.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
