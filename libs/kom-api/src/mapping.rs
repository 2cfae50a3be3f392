//! Field mappings: how a named column is located and converted inside a
//! fetched record.
//!
//! Field definitions are comma separated entries of the form
//!
//! ```text
//! name:(type)source.path=(type)default
//! ```
//!
//! where both `(type)` tags and the `=default` part are optional. A leading
//! `metadata` or `parameters` path segment reads from the part's metadata or
//! parameter set instead of the part record itself.

use std::fmt;

use indexmap::IndexMap;

use crate::convert::{TargetType, coerce_opt};
use crate::error::PluginError;
use crate::value::{Lookup, Value};

/// Object a source path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The part record itself.
    Record,
    /// The part's metadata object (secondary fetch).
    Metadata,
    /// The part's parameters keyed by template name (secondary fetch).
    Parameters,
}

/// Location of a value: origin object + keys inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    pub origin: Origin,
    pub segments: Vec<String>,
}

impl SourcePath {
    /// Split a dotted path, classifying its leading segment.
    pub fn parse(dotted: &str) -> Self {
        let mut segments: Vec<String> = dotted.split('.').map(str::to_string).collect();
        let origin = match segments.first().map(String::as_str) {
            Some("metadata") => Origin::Metadata,
            Some("parameters") => Origin::Parameters,
            _ => Origin::Record,
        };
        if origin != Origin::Record {
            segments.remove(0);
        }
        Self { origin, segments }
    }

    pub fn lookup<'a>(&self, object: &'a Value) -> Lookup<'a> {
        object.lookup(&self.segments)
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.origin {
            Origin::Record => None,
            Origin::Metadata => Some("metadata"),
            Origin::Parameters => Some("parameters"),
        };
        let mut first = true;
        for part in prefix.into_iter().chain(self.segments.iter().map(String::as_str)) {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

/// Recipe for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub source: SourcePath,
    /// `None` keeps the value's native representation.
    pub ty: Option<TargetType>,
    /// Used when the source path is absent. Already converted.
    pub default: Value,
}

impl FieldMapping {
    pub fn new(source: &str) -> Self {
        Self {
            source: SourcePath::parse(source),
            ty: None,
            default: Value::Null,
        }
    }

    pub fn with_type(mut self, ty: TargetType) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    /// Resolve against `object` (the one selected by `source.origin`).
    ///
    /// Absent, `null`, and wrongly shaped paths produce the default.
    pub fn resolve(&self, object: &Value) -> Result<Value, PluginError> {
        match self.source.lookup(object).present() {
            Some(value) => coerce_opt(value, self.ty)
                .map_err(|e| e.with_context(format!("field source `{}`", self.source))),
            None => Ok(self.default.clone()),
        }
    }
}

/// Ordered set of column mappings.
///
/// Column order is the order of first declaration; re-declaring a name
/// replaces its mapping in place.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: IndexMap<String, FieldMapping>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, mapping: FieldMapping) {
        self.fields.insert(name.into(), mapping);
    }

    pub fn apply(&mut self, defs: Vec<FieldDef>) {
        for def in defs {
            self.add(def.name, def.mapping);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldMapping)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn uses(&self, origin: Origin) -> bool {
        self.fields.values().any(|m| m.source.origin == origin)
    }
}

/// One parsed field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub mapping: FieldMapping,
}

// ═══════════════════════════════════════════════════════════════
//  Field definition parser
// ═══════════════════════════════════════════════════════════════

/// Malformed field definition entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldParseError {
    pub entry: String,
    /// Byte offset inside `entry`.
    pub position: usize,
    /// Offending text, empty at end of input.
    pub token: String,
    pub message: String,
}

impl fmt::Display for FieldParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() {
            "end of input".to_string()
        } else {
            format!("`{}`", self.token)
        };
        write!(
            f,
            "could not parse field `{}`: {} at position {} ({token})",
            self.entry, self.message, self.position
        )
    }
}

impl std::error::Error for FieldParseError {}

impl From<FieldParseError> for PluginError {
    fn from(e: FieldParseError) -> Self {
        PluginError::config(e.to_string())
    }
}

/// Parse a comma separated list of field definitions.
pub fn parse_fields(spec: &str) -> Result<Vec<FieldDef>, PluginError> {
    spec.split(',').map(|entry| parse_field(entry.trim())).collect()
}

/// Parse a single `name:(type)source=(type)default` entry.
pub fn parse_field(entry: &str) -> Result<FieldDef, PluginError> {
    let mut p = EntryParser { entry, pos: 0 };

    let name = p.take_until(&[':']);
    if name.is_empty() {
        return Err(p.error("expected field name", p.rest_token()).into());
    }
    if !p.eat(':') {
        return Err(p.error("expected `:` after field name", "").into());
    }

    let ty = p.type_tag()?;

    let source_start = p.pos;
    let source = p.take_until(&['=']);
    if source.is_empty() {
        return Err(p.error("expected source path", p.rest_token()).into());
    }
    if let Some(offset) = empty_segment(source) {
        return Err(FieldParseError {
            entry: entry.to_string(),
            position: source_start + offset,
            token: source.to_string(),
            message: "empty path segment".into(),
        }
        .into());
    }

    let mut mapping = FieldMapping {
        source: SourcePath::parse(source),
        ty,
        default: Value::Null,
    };

    if p.eat('=') {
        let default_ty = p.type_tag()?;
        let raw = Value::Text(p.rest().to_string());
        mapping.default = coerce_opt(&raw, default_ty)
            .map_err(|e| e.with_context(format!("default of field `{entry}`")))?;
    }

    Ok(FieldDef {
        name: name.to_string(),
        mapping,
    })
}

/// Offset of the first empty segment in a dotted path.
fn empty_segment(path: &str) -> Option<usize> {
    let mut offset = 0;
    for segment in path.split('.') {
        if segment.is_empty() {
            return Some(offset);
        }
        offset += segment.len() + 1;
    }
    None
}

struct EntryParser<'a> {
    entry: &'a str,
    pos: usize,
}

impl<'a> EntryParser<'a> {
    fn rest(&self) -> &'a str {
        &self.entry[self.pos..]
    }

    fn rest_token(&self) -> &'a str {
        self.rest().chars().next().map_or("", |c| &self.rest()[..c.len_utf8()])
    }

    fn eat(&mut self, c: char) -> bool {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Consume up to (not including) the first of `stops`, or to the end.
    fn take_until(&mut self, stops: &[char]) -> &'a str {
        let rest = self.rest();
        let len = rest.find(stops).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Optional `(type)` tag.
    fn type_tag(&mut self) -> Result<Option<TargetType>, FieldParseError> {
        if !self.eat('(') {
            return Ok(None);
        }
        let start = self.pos;
        let name = self.take_until(&[')']);
        if !self.eat(')') {
            return Err(self.error("unterminated type tag, expected `)`", ""));
        }
        name.parse::<TargetType>().map(Some).map_err(|_| FieldParseError {
            entry: self.entry.to_string(),
            position: start,
            token: name.to_string(),
            message: "unknown type, expected one of int, float, string".into(),
        })
    }

    fn error(&self, message: &str, token: &str) -> FieldParseError {
        FieldParseError {
            entry: self.entry.to_string(),
            position: self.pos,
            token: token.to_string(),
            message: message.to_string(),
        }
    }
}
