//! Decoding documents from text and encoding the merged result
//!
//! Both JSON and JSON5 are supported on either side. Encoding takes an
//! indent string and an optional replacer that can rewrite or drop members
//! while the output is produced.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Value};

use crate::error::CombineError;
use crate::source::DocumentId;

/// Largest float magnitude still written as a plain integer (2^53)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Longest indent honoured when encoding; longer strings are truncated
pub const MAX_INDENT: usize = 10;

/// Default indent when encoding
pub const DEFAULT_INDENT: &str = "\t";

/// Prefix used for [`ExportModule::ModuleExports`]
pub const MODULE_EXPORTS: &str = "module.exports";

/// Text syntax for input and output documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Json5,
}

/// Rewrites a member during encoding
///
/// Called with the member key (array index as a string, `""` for the root)
/// and its value. `None` drops an object member; in arrays it becomes `null`.
pub type Replacer = Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>;

/// Options for [`encode`]
#[derive(Clone)]
pub struct EncodeOptions {
    pub indent: String,
    pub format: Format,
    pub replacer: Option<Replacer>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT.to_string(),
            format: Format::Json,
            replacer: None,
        }
    }
}

impl std::fmt::Debug for EncodeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeOptions")
            .field("indent", &self.indent)
            .field("format", &self.format)
            .field("replacer", &self.replacer.is_some())
            .finish()
    }
}

/// How the encoded text is wrapped
///
/// Deserializes from `true`/`false` or a variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawExportModule", into = "RawExportModule")]
pub enum ExportModule {
    #[default]
    Off,
    /// `module.exports = <json>;`
    ModuleExports,
    /// `<name> = <json>;`
    Variable(String),
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RawExportModule {
    Flag(bool),
    Name(String),
}

impl From<RawExportModule> for ExportModule {
    fn from(raw: RawExportModule) -> Self {
        match raw {
            RawExportModule::Flag(true) => ExportModule::ModuleExports,
            RawExportModule::Flag(false) => ExportModule::Off,
            RawExportModule::Name(name) => ExportModule::variable(name),
        }
    }
}

impl From<ExportModule> for RawExportModule {
    fn from(export: ExportModule) -> Self {
        match export {
            ExportModule::Off => RawExportModule::Flag(false),
            ExportModule::ModuleExports => RawExportModule::Flag(true),
            ExportModule::Variable(name) => RawExportModule::Name(name),
        }
    }
}

impl ExportModule {
    /// Wrap as an assignment to `name`; an empty name disables wrapping
    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            ExportModule::Off
        } else {
            ExportModule::Variable(name)
        }
    }
}

/// Parse a document's text into a tree
pub fn decode(text: &str, id: &DocumentId, format: Format) -> Result<Value, CombineError> {
    let parsed: Result<Value, String> = match format {
        Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        Format::Json5 => json5::from_str::<FiniteValue>(text)
            .map(|finite| finite.0)
            .map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| CombineError::Parse {
        identity: id.to_string(),
        message,
    })
}

/// Serialize a tree to text
pub fn encode(value: &Value, options: &EncodeOptions) -> Result<String, CombineError> {
    let indent: String = options.indent.chars().take(MAX_INDENT).collect();

    let mut value = match &options.replacer {
        Some(replacer) => apply_replacer("", value.clone(), replacer).unwrap_or(Value::Null),
        None => value.clone(),
    };
    normalize_integral_floats(&mut value);

    match options.format {
        Format::Json => write_json(&value, &indent),
        Format::Json5 => {
            let mut out = String::new();
            write_json5_value(&mut out, &value, &indent, 0);
            Ok(out)
        }
    }
}

/// Apply the module wrapper to encoded text
pub fn wrap_module(contents: String, export: &ExportModule) -> String {
    match export {
        ExportModule::Off => contents,
        ExportModule::ModuleExports => format!("{} = {};", MODULE_EXPORTS, contents),
        ExportModule::Variable(name) => format!("{} = {};", name, contents),
    }
}

/// JSON5 tree that rejects `Infinity` and `NaN` instead of turning them into `null`
struct FiniteValue(Value);

impl<'de> Deserialize<'de> for FiniteValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FiniteVisitor).map(FiniteValue)
    }
}

struct FiniteVisitor;

impl<'de> Visitor<'de> for FiniteVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON5 value with finite numbers")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| E::custom(format!("non-finite number {} is not supported", v)))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        FiniteValue::deserialize(deserializer).map(|finite| finite.0)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(FiniteValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members = Map::new();
        while let Some((key, FiniteValue(value))) = map.next_entry::<String, FiniteValue>()? {
            members.insert(key, value);
        }
        Ok(Value::Object(members))
    }
}

/// Rewrite floats with no fractional part (`1.0`, `1e2`) as integers
fn normalize_integral_floats(value: &mut Value) {
    match value {
        Value::Number(n) if n.is_f64() => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
                    *value = Value::from(f as i64);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_integral_floats),
        Value::Object(map) => map.values_mut().for_each(normalize_integral_floats),
        _ => {}
    }
}

/// Walk the tree top-down, letting the replacer rewrite each member
fn apply_replacer(key: &str, value: Value, replacer: &Replacer) -> Option<Value> {
    let value = replacer(key, &value)?;

    let walked = match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| apply_replacer(&k, v, replacer).map(|v| (k, v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| apply_replacer(&i.to_string(), v, replacer).unwrap_or(Value::Null))
                .collect(),
        ),
        other => other,
    };

    Some(walked)
}

fn write_json(value: &Value, indent: &str) -> Result<String, CombineError> {
    if indent.is_empty() {
        return Ok(serde_json::to_string(value)?);
    }

    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    String::from_utf8(buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

fn write_json5_value(out: &mut String, value: &Value, indent: &str, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => push_json5_string(out, s),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                push_separator(out, indent, depth + 1, i == 0);
                write_json5_value(out, item, indent, depth + 1);
            }
            push_closing(out, indent, depth);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                push_separator(out, indent, depth + 1, i == 0);
                push_json5_key(out, key);
                out.push(':');
                if !indent.is_empty() {
                    out.push(' ');
                }
                write_json5_value(out, item, indent, depth + 1);
            }
            push_closing(out, indent, depth);
            out.push('}');
        }
    }
}

/// Comma before every member but the first; pretty mode adds a newline and
/// indent, and [`push_closing`] adds the trailing comma
fn push_separator(out: &mut String, indent: &str, depth: usize, first: bool) {
    if !first {
        out.push(',');
    }
    if !indent.is_empty() {
        out.push('\n');
        out.push_str(&indent.repeat(depth));
    }
}

fn push_closing(out: &mut String, indent: &str, depth: usize) {
    if !indent.is_empty() {
        out.push_str(",\n");
        out.push_str(&indent.repeat(depth));
    }
}

fn push_json5_key(out: &mut String, key: &str) {
    if is_identifier(key) {
        out.push_str(key);
    } else {
        push_json5_string(out, key);
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '$' || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '$' || c == '_')
}

/// Quote with whichever of `'` and `"` needs fewer escapes, preferring `'`
fn push_json5_string(out: &mut String, s: &str) {
    let singles = s.matches('\'').count();
    let doubles = s.matches('"').count();
    let quote = if singles > doubles { '"' } else { '\'' };

    out.push(quote);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            '\0' => {
                if chars.peek().is_some_and(|next| next.is_ascii_digit()) {
                    out.push_str("\\x00");
                } else {
                    out.push_str("\\0");
                }
            }
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}
