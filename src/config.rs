//! Options for a merge operation
//!
//! [`MergeOptions`] can be built in code or loaded from a TOML file. Hooks
//! (edit function, customizer, replacer) are only available in code.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::accumulate::EditHook;
use crate::codec::{EncodeOptions, ExportModule, Format, Replacer, DEFAULT_INDENT, MAX_INDENT};
use crate::error::{CombineError, HookError};
use crate::merge::{Customizer, MergePolicy};
use crate::source::DocumentId;

/// Default name of the merged output file
pub const DEFAULT_FILE_NAME: &str = "combined.json";

type EditFn = Arc<dyn Fn(Value, &DocumentId) -> Result<Value, HookError> + Send + Sync>;

/// Indent given either as a number of spaces or as a literal string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum JsonSpace {
    Count(usize),
    Text(String),
}

impl JsonSpace {
    pub fn to_indent(&self) -> String {
        match self {
            JsonSpace::Count(n) => " ".repeat((*n).min(MAX_INDENT)),
            JsonSpace::Text(s) => s.clone(),
        }
    }
}

impl Default for JsonSpace {
    fn default() -> Self {
        JsonSpace::Text(DEFAULT_INDENT.to_string())
    }
}

/// Options for combining documents
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MergeOptions {
    /// Output file name, resolved against the first document's directory
    pub file_name: String,
    /// Static value merged over every document
    pub edit: Option<Value>,
    /// Seed value for the merge (object or array)
    pub start_obj: Option<Value>,
    /// Final overlay merged after all documents (object or array)
    pub end_obj: Option<Value>,
    pub export_module: ExportModule,
    pub concat_arrays: bool,
    pub merge_arrays: bool,
    pub json_space: JsonSpace,
    /// Read and write JSON5 instead of JSON
    pub json5: bool,

    /// Edit function; takes precedence over `edit`
    #[serde(skip)]
    pub edit_fn: Option<EditFn>,
    #[serde(skip)]
    pub customizer: Option<Customizer>,
    #[serde(skip)]
    pub replacer: Option<Replacer>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            edit: None,
            start_obj: None,
            end_obj: None,
            export_module: ExportModule::Off,
            concat_arrays: false,
            merge_arrays: true,
            json_space: JsonSpace::default(),
            json5: false,
            edit_fn: None,
            customizer: None,
            replacer: None,
        }
    }
}

impl fmt::Debug for MergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeOptions")
            .field("file_name", &self.file_name)
            .field("edit", &self.edit)
            .field("start_obj", &self.start_obj)
            .field("end_obj", &self.end_obj)
            .field("export_module", &self.export_module)
            .field("concat_arrays", &self.concat_arrays)
            .field("merge_arrays", &self.merge_arrays)
            .field("json_space", &self.json_space)
            .field("json5", &self.json5)
            .field("edit_fn", &self.edit_fn.is_some())
            .field("customizer", &self.customizer.is_some())
            .field("replacer", &self.replacer.is_some())
            .finish()
    }
}

impl MergeOptions {
    /// Load options from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, CombineError> {
        let content = fs::read_to_string(path).map_err(|e| CombineError::InvalidConfig {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            CombineError::InvalidConfig { reason, .. } => CombineError::InvalidConfig {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CombineError> {
        toml::from_str(content).map_err(|e| CombineError::InvalidConfig {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn with_edit_fn<F>(mut self, edit: F) -> Self
    where
        F: Fn(Value, &DocumentId) -> Result<Value, HookError> + Send + Sync + 'static,
    {
        self.edit_fn = Some(Arc::new(edit));
        self
    }

    pub fn with_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<Option<Value>, HookError> + Send + Sync + 'static,
    {
        self.customizer = Some(Arc::new(customizer));
        self
    }

    pub fn with_replacer<F>(mut self, replacer: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.replacer = Some(Arc::new(replacer));
        self
    }

    /// Check the start, end and edit values before any document is read
    ///
    /// `null` counts as absent. Anything else must be an object or array.
    pub fn validate(&self) -> Result<(), CombineError> {
        if !is_container_or_absent(self.start_obj.as_ref())
            || !is_container_or_absent(self.end_obj.as_ref())
        {
            return Err(CombineError::InvalidStartOrEnd);
        }
        if !is_container_or_absent(self.edit.as_ref()) {
            return Err(CombineError::InvalidEdit);
        }
        Ok(())
    }

    pub fn policy(&self) -> MergePolicy {
        MergePolicy {
            concat_arrays: self.concat_arrays,
            merge_arrays: self.merge_arrays,
            customizer: self.customizer.clone(),
        }
    }

    pub fn format(&self) -> Format {
        if self.json5 {
            Format::Json5
        } else {
            Format::Json
        }
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            indent: self.json_space.to_indent(),
            format: self.format(),
            replacer: self.replacer.clone(),
        }
    }

    /// Normalize the edit configuration into one hook
    pub fn edit_hook(&self, policy: &MergePolicy) -> EditHook {
        if let Some(edit) = &self.edit_fn {
            let edit = Arc::clone(edit);
            return EditHook::from_fn(move |document, id| edit(document, id));
        }

        match self.edit.as_ref().filter(|v| !v.is_null()) {
            Some(overlay) => EditHook::overlay(overlay.clone(), policy.clone()),
            None => EditHook::identity(),
        }
    }

    /// Seed value: the start object, or an empty object
    pub fn start_value(&self) -> Value {
        match &self.start_obj {
            Some(start) if !start.is_null() => start.clone(),
            _ => Value::Object(Default::default()),
        }
    }

    pub fn end_value(&self) -> Option<Value> {
        self.end_obj.clone().filter(|v| !v.is_null())
    }
}

fn is_container_or_absent(value: Option<&Value>) -> bool {
    matches!(
        value,
        None | Some(Value::Null) | Some(Value::Object(_)) | Some(Value::Array(_))
    )
}
