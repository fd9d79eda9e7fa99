//! Deep merge logic for JSON documents
//!
//! Combines two JSON values under a [`MergePolicy`]. Objects merge key by
//! key, arrays are replaced, concatenated or merged by index, and anything
//! else is won by the right-hand side.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{CombineError, HookError};

/// Caller-supplied override consulted before the default merge rules
///
/// Returning `Ok(None)` means "no opinion": the default rules apply.
/// Returning `Ok(Some(v))` uses `v` verbatim for that position.
pub type Customizer =
    Arc<dyn Fn(&Value, &Value) -> Result<Option<Value>, HookError> + Send + Sync>;

/// Options controlling how two values are merged
#[derive(Clone)]
pub struct MergePolicy {
    /// Append right-hand arrays to left-hand arrays
    pub concat_arrays: bool,
    /// Merge arrays element-wise by index (ignored when `concat_arrays` is set)
    pub merge_arrays: bool,
    /// Override consulted at every paired child position
    pub customizer: Option<Customizer>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            concat_arrays: false,
            merge_arrays: true,
            customizer: None,
        }
    }
}

impl fmt::Debug for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergePolicy")
            .field("concat_arrays", &self.concat_arrays)
            .field("merge_arrays", &self.merge_arrays)
            .field("customizer", &self.customizer.is_some())
            .finish()
    }
}

impl MergePolicy {
    pub fn with_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        self.customizer = Some(Arc::new(customizer));
        self
    }
}

/// Merge `right` into `left`, consulting the customizer first
///
/// - Customizer returns a value: use it, stop recursing
/// - Both arrays: concatenate, merge by index, or replace (per policy)
/// - Both objects: recursive merge of keys, left key order first
/// - Otherwise: `right` wins
pub fn merge(left: Value, right: Value, policy: &MergePolicy) -> Result<Value, CombineError> {
    if let Some(customizer) = &policy.customizer {
        if let Some(decided) = customizer(&left, &right).map_err(CombineError::Customizer)? {
            return Ok(decided);
        }
    }

    merge_structure(left, right, policy)
}

/// Merge a whole document into an accumulated value
///
/// Differs from [`merge`] at the root only: the customizer is not consulted
/// for the root pair, and an array accumulator under `concat_arrays` takes
/// `right` by plain concatenation (an array is spliced in, anything else is
/// appended as a single element).
pub fn merge_document(
    left: Value,
    right: Value,
    policy: &MergePolicy,
) -> Result<Value, CombineError> {
    match (left, right) {
        (Value::Array(mut acc), right) if policy.concat_arrays => {
            match right {
                Value::Array(items) => acc.extend(items),
                other => acc.push(other),
            }
            Ok(Value::Array(acc))
        }
        (left, right) => merge_structure(left, right, policy),
    }
}

/// Apply the default rules for one position
fn merge_structure(
    left: Value,
    right: Value,
    policy: &MergePolicy,
) -> Result<Value, CombineError> {
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => {
            if policy.concat_arrays {
                let mut result = a;
                result.extend(b);
                Ok(Value::Array(result))
            } else if policy.merge_arrays {
                merge_arrays(a, b, policy).map(Value::Array)
            } else {
                Ok(Value::Array(b))
            }
        }
        (Value::Object(a), Value::Object(b)) => merge_objects(a, b, policy).map(Value::Object),
        (_, right) => Ok(right),
    }
}

/// Merge two arrays by index, keeping the tail of the longer one
fn merge_arrays(
    left: Vec<Value>,
    right: Vec<Value>,
    policy: &MergePolicy,
) -> Result<Vec<Value>, CombineError> {
    let mut result = Vec::with_capacity(left.len().max(right.len()));
    let mut left = left.into_iter();
    let mut right = right.into_iter();

    loop {
        match (left.next(), right.next()) {
            (Some(a), Some(b)) => result.push(merge(a, b, policy)?),
            (Some(a), None) => result.push(a),
            (None, Some(b)) => result.push(b),
            (None, None) => break,
        }
    }

    Ok(result)
}

/// Merge two objects; keys of `left` keep their position, new keys are appended
fn merge_objects(
    mut left: Map<String, Value>,
    right: Map<String, Value>,
    policy: &MergePolicy,
) -> Result<Map<String, Value>, CombineError> {
    for (key, value_b) in right {
        match left.get_mut(&key) {
            Some(slot) => {
                let value_a = slot.take();
                *slot = merge(value_a, value_b, policy)?;
            }
            None => {
                left.insert(key, value_b);
            }
        }
    }

    Ok(left)
}
