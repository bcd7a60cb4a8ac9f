//! Cache-row meta merging.

use serde_json::Value;

/// Shallow-merge `patch` into `existing`.
///
/// Keys present only in `existing` are preserved, keys in `patch` override
/// same-named keys. The cache row's meta accumulates fields from several
/// writers, so a sync must never drop keys it does not know about.
///
/// A non-object on either side degenerates to the patch, matching the
/// replace semantics of a first-time write.
#[must_use]
pub fn merge_meta(existing: Value, patch: Value) -> Value {
    match (existing, patch) {
        (Value::Object(mut base), Value::Object(update)) => {
            for (key, value) in update {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, patch) => patch,
    }
}
