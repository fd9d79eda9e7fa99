//! JSON Document Merging Library
//!
//! This library merges an ordered collection of JSON (or JSON5) documents
//! into a single combined document and serializes the result, for use in
//! build pipelines that assemble one artifact from many small fragments.
//!
//! # Overview
//!
//! A merge operation:
//!
//! 1. Validates the options (start/end values must be objects or arrays)
//! 2. Seeds the result with the start value (an empty object by default)
//! 3. For each document in order: parses it, runs the edit hook, and deep
//!    merges it into the running result
//! 4. Merges the end value over the result, if configured
//! 5. Encodes the result, optionally wrapped as `module.exports = ...;`
//!
//! When no document had contents, no output is produced at all.
//!
//! # Merge rules
//!
//! - Objects merge key by key; existing keys keep their position
//! - Arrays merge by index, concatenate (`concat_arrays`), or are replaced
//!   (`merge_arrays = false`)
//! - Scalars and mismatched shapes: the later value wins
//! - A customizer can decide any paired position before the default rules
//!
//! # Usage
//!
//! ```ignore
//! use merge_json::{combine, load_documents, MergeOptions};
//!
//! let documents = load_documents(&["a.json", "b.json"])?;
//! let options = MergeOptions {
//!     concat_arrays: true,
//!     ..MergeOptions::default()
//! };
//!
//! if let Some(output) = combine(&options, documents)? {
//!     std::fs::write(&output.path, output.contents)?;
//! }
//! ```

pub mod accumulate;
pub mod codec;
pub mod combine;
pub mod config;
pub mod error;
pub mod merge;
pub mod source;

// Re-export main types for convenience
pub use crate::accumulate::{Accumulator, EditHook};
pub use crate::codec::{decode, encode, wrap_module, EncodeOptions, ExportModule, Format, Replacer};
pub use crate::combine::{combine, combine_texts, CombineOutput};
pub use crate::config::{JsonSpace, MergeOptions, DEFAULT_FILE_NAME};
pub use crate::error::{CombineError, HookError};
pub use crate::merge::{merge, merge_document, Customizer, MergePolicy};
pub use crate::source::{load_documents, Contents, Document, DocumentId};
