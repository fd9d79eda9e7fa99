//! Ordered accumulation of documents into one merged value
//!
//! An [`Accumulator`] starts from a seed value, absorbs documents one at a
//! time through an [`EditHook`], and is finalized exactly once. Finalizing
//! an accumulator that never absorbed a document yields no output at all.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{CombineError, HookError};
use crate::merge::{merge_document, MergePolicy};
use crate::source::DocumentId;

type EditFn = dyn Fn(Value, &DocumentId) -> Result<Value, HookError> + Send + Sync;

/// Transformation applied to each parsed document before it is merged
#[derive(Clone)]
pub struct EditHook {
    edit: Option<Arc<EditFn>>,
}

impl EditHook {
    /// Pass documents through unchanged
    pub fn identity() -> Self {
        Self { edit: None }
    }

    /// Edit documents with a caller-supplied function
    pub fn from_fn<F>(edit: F) -> Self
    where
        F: Fn(Value, &DocumentId) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        Self {
            edit: Some(Arc::new(edit)),
        }
    }

    /// Merge a static value over every document
    pub fn overlay(overlay: Value, policy: MergePolicy) -> Self {
        Self::from_fn(move |document, _| {
            merge_document(document, overlay.clone(), &policy).map_err(|e| match e {
                CombineError::Customizer(hook) => hook,
                other => HookError::new(other.to_string()),
            })
        })
    }

    pub fn apply(&self, document: Value, id: &DocumentId) -> Result<Value, CombineError> {
        match &self.edit {
            Some(edit) => edit(document, id).map_err(CombineError::Edit),
            None => Ok(document),
        }
    }
}

impl Default for EditHook {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for EditHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditHook")
            .field("edit", &self.edit.is_some())
            .finish()
    }
}

/// Running merge state for a single operation
#[derive(Debug)]
pub struct Accumulator {
    current: Value,
    seeded: bool,
}

impl Accumulator {
    /// Start from `start`; nothing has been absorbed yet
    pub fn new(start: Value) -> Self {
        Self {
            current: start,
            seeded: false,
        }
    }

    /// Whether at least one document has been absorbed
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Current merged value
    pub fn current(&self) -> &Value {
        &self.current
    }

    /// Edit `document` and merge it into the running value
    ///
    /// On error the running value and seeded state are left as they were.
    pub fn absorb(
        &mut self,
        document: Value,
        id: &DocumentId,
        edit: &EditHook,
        policy: &MergePolicy,
    ) -> Result<(), CombineError> {
        let edited = edit.apply(document, id)?;
        self.current = merge_document(self.current.clone(), edited, policy)?;
        self.seeded = true;
        Ok(())
    }

    /// Apply the end overlay and return the merged value
    ///
    /// Returns `None` when no document was ever absorbed, regardless of the
    /// start and end values.
    pub fn finalize(
        self,
        end: Option<Value>,
        policy: &MergePolicy,
    ) -> Result<Option<Value>, CombineError> {
        if !self.seeded {
            return Ok(None);
        }

        let merged = match end {
            Some(end) => merge_document(self.current, end, policy)?,
            None => self.current,
        };

        Ok(Some(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;
    use serde_json::json;

    fn fold(docs: &[Value], policy: &MergePolicy) -> Option<Value> {
        let mut acc = Accumulator::new(json!({}));
        for (i, doc) in docs.iter().enumerate() {
            acc.absorb(
                doc.clone(),
                &DocumentId::new(format!("doc{}.json", i)),
                &EditHook::identity(),
                policy,
            )
            .unwrap();
        }
        acc.finalize(None, policy).unwrap()
    }

    #[test]
    fn test_fold_is_left_to_right() {
        let policy = MergePolicy::default();
        let d1 = json!({"place": "NYC", "a": {"x": 1}});
        let d2 = json!({"place": "SF", "a": {"y": 2}});
        let d3 = json!({"b": true});

        let folded = fold(&[d1.clone(), d2.clone(), d3.clone()], &policy).unwrap();
        let manual = merge(
            merge(merge(json!({}), d1.clone(), &policy).unwrap(), d2.clone(), &policy).unwrap(),
            d3,
            &policy,
        )
        .unwrap();
        assert_eq!(folded, manual);
        assert_eq!(folded["place"], json!("SF"));

        let swapped = fold(&[d2, d1], &policy).unwrap();
        assert_eq!(swapped["place"], json!("NYC"));
    }

    #[test]
    fn test_no_documents_no_output() {
        let policy = MergePolicy::default();
        let acc = Accumulator::new(json!({"initial": "value"}));
        assert!(!acc.is_seeded());
        let result = acc.finalize(Some(json!({"place": "Vegas"})), &policy).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_start_value_is_seed() {
        let policy = MergePolicy::default();
        let mut acc = Accumulator::new(json!({"initial": "value"}));
        acc.absorb(json!({"name": "Josh"}), &"a.json".into(), &EditHook::identity(), &policy)
            .unwrap();
        assert!(acc.is_seeded());
        assert_eq!(acc.current(), &json!({"initial": "value", "name": "Josh"}));
    }

    #[test]
    fn test_end_overlay() {
        let policy = MergePolicy::default();
        let mut acc = Accumulator::new(json!({}));
        acc.absorb(json!({"place": "SF"}), &"a.json".into(), &EditHook::identity(), &policy)
            .unwrap();
        let result = acc.finalize(Some(json!({"place": "Vegas"})), &policy).unwrap();
        assert_eq!(result, Some(json!({"place": "Vegas"})));
    }

    #[test]
    fn test_customizer_first_value_wins() {
        let policy = MergePolicy::default().with_customizer(|left, _| Ok(Some(left.clone())));
        let docs = [
            json!({"name": "Josh", "tags": ["cool", "fun"]}),
            json!({"name": "Indy", "tags": ["awesome"], "place": "SF"}),
            json!({"name": "Other", "place": "NYC", "extra": 1}),
        ];
        let result = fold(&docs, &policy).unwrap();
        assert_eq!(
            result,
            json!({"name": "Josh", "tags": ["cool", "fun"], "place": "SF", "extra": 1})
        );
    }

    #[test]
    fn test_edit_hook_sees_identity() {
        let policy = MergePolicy::default();
        let edit = EditHook::from_fn(|mut doc, id| {
            if let Some(obj) = doc.as_object_mut() {
                obj.insert(id.to_string(), json!(true));
            }
            Ok(doc)
        });
        let mut acc = Accumulator::new(json!({}));
        acc.absorb(json!({}), &"one.json".into(), &edit, &policy).unwrap();
        acc.absorb(json!({}), &"two.json".into(), &edit, &policy).unwrap();
        assert_eq!(acc.current(), &json!({"one.json": true, "two.json": true}));
    }

    #[test]
    fn test_edit_hook_error_verbatim() {
        let policy = MergePolicy::default();
        let edit = EditHook::from_fn(|_, _| Err(HookError::from("Oh no!")));
        let mut acc = Accumulator::new(json!({}));
        let err = acc
            .absorb(json!({"a": 1}), &"a.json".into(), &edit, &policy)
            .unwrap_err();
        assert!(matches!(err, CombineError::Edit(_)));
        assert_eq!(err.to_string(), "Oh no!");
    }

    #[test]
    fn test_failed_absorb_keeps_state() {
        let policy = MergePolicy::default().with_customizer(|_, right| {
            if right == &json!("bad") {
                Err(HookError::from("rejected"))
            } else {
                Ok(None)
            }
        });
        let mut acc = Accumulator::new(json!({"initial": "value"}));
        let err = acc
            .absorb(json!({"initial": "bad"}), &"a.json".into(), &EditHook::identity(), &policy)
            .unwrap_err();
        assert!(matches!(err, CombineError::Customizer(_)));
        assert!(!acc.is_seeded());
        assert_eq!(acc.current(), &json!({"initial": "value"}));

        acc.absorb(json!({"name": "Josh"}), &"b.json".into(), &EditHook::identity(), &policy)
            .unwrap();
        assert_eq!(acc.current(), &json!({"initial": "value", "name": "Josh"}));
    }

    #[test]
    fn test_overlay_edit() {
        let policy = MergePolicy::default();
        let edit = EditHook::overlay(json!({"settings": {"timezone": "PST"}}), policy.clone());
        let mut acc = Accumulator::new(json!({}));
        acc.absorb(
            json!({"settings": {"likesSleep": true}}),
            &"a.json".into(),
            &edit,
            &policy,
        )
        .unwrap();
        assert_eq!(
            acc.current(),
            &json!({"settings": {"likesSleep": true, "timezone": "PST"}})
        );
    }

    #[test]
    fn test_array_accumulator() {
        let docs = [json!([{"a": 1, "b": 2}]), json!([{"c": 3, "d": 4}])];

        let policy = MergePolicy::default();
        let mut acc = Accumulator::new(json!([]));
        for doc in &docs {
            acc.absorb(doc.clone(), &"a.json".into(), &EditHook::identity(), &policy)
                .unwrap();
        }
        assert_eq!(
            acc.finalize(None, &policy).unwrap(),
            Some(json!([{"a": 1, "b": 2, "c": 3, "d": 4}]))
        );

        let concat = MergePolicy {
            concat_arrays: true,
            ..MergePolicy::default()
        };
        let mut acc = Accumulator::new(json!([]));
        for doc in &docs {
            acc.absorb(doc.clone(), &"a.json".into(), &EditHook::identity(), &concat)
                .unwrap();
        }
        acc.absorb(json!({"e": 5}), &"b.json".into(), &EditHook::identity(), &concat)
            .unwrap();
        assert_eq!(
            acc.finalize(None, &concat).unwrap(),
            Some(json!([{"a": 1, "b": 2}, {"c": 3, "d": 4}, {"e": 5}]))
        );
    }
}
