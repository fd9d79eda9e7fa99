//! Main combine logic
//!
//! Drives one merge operation: validates options, folds the documents in
//! order, applies the end overlay, and encodes the result.

use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};

use crate::accumulate::Accumulator;
use crate::codec::{decode, encode, wrap_module};
use crate::config::MergeOptions;
use crate::error::CombineError;
use crate::source::{Contents, Document};

/// Result of a combine operation that produced output
#[derive(Debug, Clone)]
pub struct CombineOutput {
    /// The merged tree
    pub value: Value,
    /// Encoded (and possibly module-wrapped) text
    pub contents: String,
    /// Output location: the first document's directory joined with the file name
    pub path: PathBuf,
    /// Number of documents merged
    pub documents: usize,
}

/// Merge `documents` in order according to `options`
///
/// Returns `Ok(None)` when no document had contents to merge. Any error
/// aborts the whole operation; no partial output is produced.
pub fn combine<I>(
    options: &MergeOptions,
    documents: I,
) -> Result<Option<CombineOutput>, CombineError>
where
    I: IntoIterator<Item = Document>,
{
    options.validate()?;

    let policy = options.policy();
    let edit = options.edit_hook(&policy);
    let format = options.format();

    let mut accumulator = Accumulator::new(options.start_value());
    let mut output_base: Option<PathBuf> = None;
    let mut count = 0;

    for document in documents {
        let text = match document.contents {
            Contents::Buffer(text) => text,
            Contents::Empty => {
                debug!(document = %document.id, "Skipping document without contents");
                continue;
            }
            Contents::Stream(_) => {
                return Err(CombineError::UnsupportedInput {
                    identity: document.id.to_string(),
                });
            }
        };

        if output_base.is_none() {
            output_base = Some(document.base.clone());
        }

        let parsed = decode(&text, &document.id, format)?;
        accumulator.absorb(parsed, &document.id, &edit, &policy)?;
        count += 1;
        debug!(document = %document.id, "Merged document");
    }

    let Some(value) = accumulator.finalize(options.end_value(), &policy)? else {
        info!("No input documents, nothing to write");
        return Ok(None);
    };

    let encoded = encode(&value, &options.encode_options())?;
    let contents = wrap_module(encoded, &options.export_module);
    let path = output_base.unwrap_or_default().join(&options.file_name);

    info!(documents = count, output = %path.display(), "Combined documents");

    Ok(Some(CombineOutput {
        value,
        contents,
        path,
        documents: count,
    }))
}

/// Parse and merge in-memory texts, returning only the encoded output
pub fn combine_texts<'a, I>(
    options: &MergeOptions,
    texts: I,
) -> Result<Option<String>, CombineError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let documents = texts
        .into_iter()
        .map(|(name, text)| Document::from_text(name, text));
    Ok(combine(options, documents)?.map(|output| output.contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ExportModule;
    use crate::error::HookError;
    use serde_json::json;
    use std::io::Cursor;

    const TEST1: &str = r#"{"name": "Josh", "pet": {"name": "Indy"}, "tags": ["cool", "fun"]}"#;
    const TEST2: &str =
        r#"{"tags": ["awesome"], "place": "San Francisco", "settings": {"likesSleep": true}}"#;

    fn inputs() -> Vec<(&'static str, &'static str)> {
        vec![("test1.json", TEST1), ("test2.json", TEST2)]
    }

    fn documents() -> Vec<Document> {
        inputs()
            .into_iter()
            .map(|(name, text)| Document::from_text(name, text))
            .collect()
    }

    fn compact() -> MergeOptions {
        MergeOptions {
            json_space: crate::config::JsonSpace::Text(String::new()),
            ..MergeOptions::default()
        }
    }

    #[test]
    fn test_combine_default() {
        let output = combine_texts(&compact(), inputs()).unwrap().unwrap();
        assert_eq!(
            output,
            concat!(
                r#"{"name":"Josh","pet":{"name":"Indy"},"tags":["awesome","fun"],"#,
                r#""place":"San Francisco","settings":{"likesSleep":true}}"#
            )
        );
    }

    #[test]
    fn test_combine_concat_arrays() {
        let options = MergeOptions {
            concat_arrays: true,
            ..compact()
        };
        let output = combine(&options, documents())
            .unwrap()
            .unwrap();
        assert_eq!(output.value["tags"], json!(["cool", "fun", "awesome"]));
        assert_eq!(output.documents, 2);
    }

    #[test]
    fn test_combine_no_merge_arrays() {
        let options = MergeOptions {
            merge_arrays: false,
            ..compact()
        };
        let output = combine(&options, documents())
            .unwrap()
            .unwrap();
        assert_eq!(output.value["tags"], json!(["awesome"]));
    }

    #[test]
    fn test_combine_start_and_end() {
        let options = MergeOptions {
            start_obj: Some(json!({"initial": "value"})),
            end_obj: Some(json!({"place": "Las Vegas"})),
            ..compact()
        };
        let output = combine(&options, documents())
            .unwrap()
            .unwrap();
        let keys: Vec<&String> = output.value.as_object().unwrap().keys().collect();
        assert_eq!(keys[0], "initial");
        assert_eq!(output.value["place"], json!("Las Vegas"));
    }

    #[test]
    fn test_combine_no_documents() {
        let options = MergeOptions {
            start_obj: Some(json!({"initial": "value"})),
            ..MergeOptions::default()
        };
        let result = combine(&options, Vec::new()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_contents_do_not_seed() {
        let empty = Document {
            id: "dir".into(),
            base: PathBuf::new(),
            contents: Contents::Empty,
        };
        let result = combine(&MergeOptions::default(), vec![empty]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_start_before_any_document() {
        let options = MergeOptions {
            start_obj: Some(json!(10)),
            ..MergeOptions::default()
        };
        // a stream would fail if it were looked at
        let documents = vec![Document::from_stream(
            "stream.txt",
            Box::new(Cursor::new(Vec::<u8>::new())),
        )];
        let err = combine(&options, documents).unwrap_err();
        assert!(matches!(err, CombineError::InvalidStartOrEnd));
    }

    #[test]
    fn test_stream_rejected() {
        let documents = vec![
            Document::from_text("test1.json", TEST1),
            Document::from_stream(
                "test/invalid/stream.txt",
                Box::new(Cursor::new(Vec::<u8>::new())),
            ),
        ];
        let err = combine(&MergeOptions::default(), documents).unwrap_err();
        assert!(matches!(
            err,
            CombineError::UnsupportedInput { ref identity } if identity == "test/invalid/stream.txt"
        ));
    }

    #[test]
    fn test_decode_failure_names_document() {
        let err = combine_texts(
            &MergeOptions::default(),
            vec![("test1.json", TEST1), ("bad.json", "{ Invalid }")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_edit_error_aborts() {
        let options = MergeOptions::default().with_edit_fn(|_, _| Err(HookError::from("Oh no!")));
        let err = combine_texts(&options, inputs()).unwrap_err();
        assert_eq!(err.to_string(), "Oh no!");
    }

    #[test]
    fn test_edit_function_modifies_documents() {
        let options = compact().with_edit_fn(|mut json, _| {
            if let Some(obj) = json.as_object_mut() {
                if obj.contains_key("place") {
                    obj.insert("place".to_string(), json!("New York"));
                }
                obj.remove("pet");
            }
            Ok(json)
        });
        let output = combine(&options, documents())
            .unwrap()
            .unwrap();
        assert_eq!(output.value["place"], json!("New York"));
        assert!(output.value.get("pet").is_none());
    }

    #[test]
    fn test_export_module_wrapping() {
        let options = MergeOptions {
            export_module: ExportModule::ModuleExports,
            ..compact()
        };
        let output = combine_texts(&options, vec![("a.json", r#"{"a": 1}"#)])
            .unwrap()
            .unwrap();
        assert_eq!(output, r#"module.exports = {"a":1};"#);
    }

    #[test]
    fn test_output_path_from_first_document() {
        let documents = vec![
            Document::from_text("a.json", "{}").with_base("config/first"),
            Document::from_text("b.json", "{}").with_base("config/second"),
        ];
        let options = MergeOptions {
            file_name: "merged.json".to_string(),
            ..MergeOptions::default()
        };
        let output = combine(&options, documents).unwrap().unwrap();
        assert_eq!(output.path, PathBuf::from("config/first/merged.json"));
    }
}
