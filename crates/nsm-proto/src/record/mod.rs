//! Self-describing typed records.
//!
//! A [`TypedRecord`] is an ordered set of named, typed fields. Status records
//! carry live telemetry and keep an append-only history per scalar field.
//! Configuration records keep one current value per field and may hold text,
//! enumerations and nested configuration arrays.

mod path;
mod wire;

use std::collections::HashMap;

use strum::Display;

use crate::error::ProtocolError;
use crate::field::{FieldType, Scalar};

use path::PathSegment;
pub use wire::MAX_NESTING_DEPTH;

/// Which family a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    /// Live telemetry published by a node.
    Status,
    /// Configuration object addressed by name.
    Configuration,
}

impl RecordKind {
    /// Whether this kind can store fields of the given type.
    #[must_use]
    pub const fn supports(self, field_type: FieldType) -> bool {
        match self {
            Self::Status => !matches!(field_type, FieldType::Text | FieldType::Enum),
            Self::Configuration => true,
        }
    }
}

/// Declared shape of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    name: String,
    field_type: FieldType,
    length: usize,
    offset: i32,
}

impl FieldSchema {
    /// Field name, unique within its record.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Declared array length; `0` and `1` both mean a single value.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Byte offset reported by the publisher. Informational only.
    #[must_use]
    pub const fn offset(&self) -> i32 {
        self.offset
    }

    /// Number of values carried per message for scalar fields.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.length.max(1)
    }
}

/// An enumeration field: a label table plus the selected label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumValue {
    options: Vec<(String, i32)>,
    selected: String,
}

impl EnumValue {
    /// Builds an enumeration from its label table and selection.
    #[must_use]
    pub fn new(options: Vec<(String, i32)>, selected: impl Into<String>) -> Self {
        Self {
            options,
            selected: selected.into(),
        }
    }

    /// Label table in declaration order.
    #[must_use]
    pub fn options(&self) -> &[(String, i32)] {
        &self.options
    }

    /// Selected label.
    #[must_use]
    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Integer value of the selected label, or `0` if it is not in the table.
    #[must_use]
    pub fn value(&self) -> i32 {
        self.value_of(&self.selected).unwrap_or_default()
    }

    /// Integer value of an arbitrary label.
    #[must_use]
    pub fn value_of(&self, label: &str) -> Option<i32> {
        self.options
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map(|(_, value)| *value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FieldData {
    Scalars(Vec<Scalar>),
    Text(String),
    Enum(EnumValue),
    Objects(Vec<TypedRecord>),
}

impl FieldData {
    fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => Self::Text(String::new()),
            FieldType::Enum => Self::Enum(EnumValue::default()),
            FieldType::Object => Self::Objects(Vec::new()),
            _ => Self::Scalars(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    schema: FieldSchema,
    data: FieldData,
}

/// Result of a path lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// A scalar value.
    Scalar(Scalar),
    /// A text field.
    Text(&'a str),
    /// An enumeration field.
    Enum(&'a EnumValue),
    /// One element of an OBJECT array.
    Record(&'a TypedRecord),
}

/// A self-describing record of named, typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    kind: RecordKind,
    id: i32,
    name: String,
    origin: String,
    table: String,
    revision: i32,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl TypedRecord {
    /// Creates an empty record of the given kind.
    ///
    /// `origin` is the owning node for status records and the format name for
    /// configuration records.
    #[must_use]
    pub fn new(kind: RecordKind, name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            kind,
            id: 0,
            name: name.into(),
            origin: origin.into(),
            table: String::new(),
            revision: 0,
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates an empty status record owned by `node`.
    #[must_use]
    pub fn status(name: impl Into<String>, node: impl Into<String>) -> Self {
        Self::new(RecordKind::Status, name, node)
    }

    /// Creates an empty configuration record with the given format name.
    #[must_use]
    pub fn configuration(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self::new(RecordKind::Configuration, name, format)
    }

    /// Sets the record id.
    #[must_use]
    pub const fn with_id(mut self, id: i32) -> Self {
        self.id = id;
        self
    }

    /// Sets the table name.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sets the revision.
    #[must_use]
    pub const fn with_revision(mut self, revision: i32) -> Self {
        self.revision = revision;
        self
    }

    /// Record kind.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Record id.
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    /// Record name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning node or format name, depending on the kind.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Owning node of a status record.
    #[must_use]
    pub fn node(&self) -> Option<&str> {
        (self.kind == RecordKind::Status).then_some(self.origin.as_str())
    }

    /// Format name of a configuration record.
    #[must_use]
    pub fn format_name(&self) -> Option<&str> {
        (self.kind == RecordKind::Configuration).then_some(self.origin.as_str())
    }

    /// Table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Revision.
    #[must_use]
    pub const fn revision(&self) -> i32 {
        self.revision
    }

    /// Field schemas in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().map(|field| &field.schema)
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Schema of a field.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&FieldSchema> {
        self.field(name).map(|field| &field.schema)
    }

    /// Declared type of a field.
    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.schema(name).map(FieldSchema::field_type)
    }

    fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).and_then(|slot| self.fields.get(*slot))
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        let slot = *self.index.get(name)?;
        self.fields.get_mut(slot)
    }

    /// Declares a field.
    ///
    /// Declaring an existing name is a no-op that returns `false`. OBJECT
    /// declarations create `length` empty nested records of the same kind.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedField`] when the kind cannot hold
    /// the type.
    pub fn add_field(
        &mut self,
        name: &str,
        field_type: FieldType,
        length: usize,
    ) -> Result<bool, ProtocolError> {
        self.declare(name, field_type, length, 0)
    }

    fn declare(
        &mut self,
        name: &str,
        field_type: FieldType,
        length: usize,
        offset: i32,
    ) -> Result<bool, ProtocolError> {
        if !self.kind.supports(field_type) {
            return Err(ProtocolError::UnsupportedField {
                kind: self.kind,
                field_type,
            });
        }
        if self.index.contains_key(name) {
            return Ok(false);
        }
        let data = match field_type {
            FieldType::Object => FieldData::Objects(
                (0..length)
                    .map(|_| Self::new(self.kind, "", ""))
                    .collect(),
            ),
            other => FieldData::empty(other),
        };
        self.push_field(
            FieldSchema {
                name: name.to_owned(),
                field_type,
                length,
                offset,
            },
            data,
        );
        Ok(true)
    }

    /// Appends a decoded field, replacing any earlier field of the same name.
    fn push_field(&mut self, schema: FieldSchema, data: FieldData) {
        if let Some(existing) = self.field_mut(&schema.name) {
            *existing = Field { schema, data };
            return;
        }
        self.index.insert(schema.name.clone(), self.fields.len());
        self.fields.push(Field { schema, data });
    }

    /// Stores a scalar value, declaring the field with the value's type if
    /// needed.
    ///
    /// Status records append to the field history; configuration records
    /// overwrite the single slot. The value is cast to the declared type.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FieldTypeMismatch`] when the field is not a
    /// scalar field.
    pub fn add_value(&mut self, name: &str, input: impl Into<Scalar>) -> Result<(), ProtocolError> {
        let value = input.into();
        self.declare(name, value.field_type(), 0, 0)?;
        let kind = self.kind;
        let Some(field) = self.field_mut(name) else {
            return Err(ProtocolError::UnknownField {
                field: name.to_owned(),
            });
        };
        let declared = field.schema.field_type;
        let (Some(cast), FieldData::Scalars(history)) = (value.cast(declared), &mut field.data)
        else {
            return Err(ProtocolError::FieldTypeMismatch {
                field: name.to_owned(),
                declared,
            });
        };
        match kind {
            RecordKind::Status => history.push(cast),
            RecordKind::Configuration => {
                history.clear();
                history.push(cast);
            }
        }
        Ok(())
    }

    /// Sets a text field, declaring it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedField`] on status records and
    /// [`ProtocolError::FieldTypeMismatch`] when the field has another type.
    pub fn set_text(&mut self, name: &str, text: impl Into<String>) -> Result<(), ProtocolError> {
        self.declare(name, FieldType::Text, 0, 0)?;
        if let Some(FieldData::Text(slot)) = self.field_mut(name).map(|field| &mut field.data) {
            *slot = text.into();
            return Ok(());
        }
        Err(self.mismatch(name))
    }

    /// Replaces an enumeration field's table and selection, declaring it if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedField`] on status records and
    /// [`ProtocolError::FieldTypeMismatch`] when the field has another type.
    pub fn set_enum(&mut self, name: &str, value: EnumValue) -> Result<(), ProtocolError> {
        self.declare(name, FieldType::Enum, 0, 0)?;
        if let Some(FieldData::Enum(slot)) = self.field_mut(name).map(|field| &mut field.data) {
            *slot = value;
            return Ok(());
        }
        Err(self.mismatch(name))
    }

    /// Selects a label of an existing enumeration field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownField`], [`ProtocolError::FieldTypeMismatch`]
    /// or [`ProtocolError::UnknownEnumLabel`].
    pub fn select_enum(&mut self, name: &str, label: &str) -> Result<(), ProtocolError> {
        let Some(field) = self.field_mut(name) else {
            return Err(ProtocolError::UnknownField {
                field: name.to_owned(),
            });
        };
        let FieldData::Enum(value) = &mut field.data else {
            return Err(ProtocolError::FieldTypeMismatch {
                field: name.to_owned(),
                declared: field.schema.field_type,
            });
        };
        if value.value_of(label).is_none() {
            return Err(ProtocolError::UnknownEnumLabel {
                field: name.to_owned(),
                label: label.to_owned(),
            });
        }
        label.clone_into(&mut value.selected);
        Ok(())
    }

    /// Appends nested records to an OBJECT field, declaring it if needed. The
    /// declared length follows the number of nested records.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::RecordKindMismatch`] when a nested record has
    /// another kind and [`ProtocolError::FieldTypeMismatch`] when the field is
    /// not an OBJECT field.
    pub fn add_objects(
        &mut self,
        name: &str,
        objects: impl IntoIterator<Item = Self>,
    ) -> Result<(), ProtocolError> {
        let records: Vec<Self> = objects.into_iter().collect();
        if let Some(other) = records.iter().find(|record| record.kind != self.kind) {
            return Err(ProtocolError::RecordKindMismatch {
                expected: self.kind,
                found: other.kind,
            });
        }
        self.declare(name, FieldType::Object, 0, 0)?;
        if let Some(Field {
            schema,
            data: FieldData::Objects(nested),
        }) = self.field_mut(name)
        {
            nested.extend(records);
            schema.length = nested.len();
            return Ok(());
        }
        Err(self.mismatch(name))
    }

    fn mismatch(&self, name: &str) -> ProtocolError {
        match self.field_type(name) {
            Some(declared) => ProtocolError::FieldTypeMismatch {
                field: name.to_owned(),
                declared,
            },
            None => ProtocolError::UnknownField {
                field: name.to_owned(),
            },
        }
    }

    /// Whether a scalar field holds at least one value.
    ///
    /// TEXT, ENUM and OBJECT fields never report a value here; use their
    /// dedicated accessors.
    #[must_use]
    pub fn has_value(&self, name: &str) -> bool {
        matches!(
            self.field(name).map(|field| &field.data),
            Some(FieldData::Scalars(history)) if !history.is_empty()
        )
    }

    /// Full value history of a scalar field, oldest first.
    #[must_use]
    pub fn history(&self, name: &str) -> &[Scalar] {
        match self.field(name).map(|field| &field.data) {
            Some(FieldData::Scalars(history)) => history,
            _ => &[],
        }
    }

    /// Nested records of an OBJECT field.
    #[must_use]
    pub fn get_objects(&self, name: &str) -> &[Self] {
        match self.field(name).map(|field| &field.data) {
            Some(FieldData::Objects(objects)) => objects,
            _ => &[],
        }
    }

    /// Nested record addressed by a path such as `crate[1].module`.
    #[must_use]
    pub fn get_object(&self, path: &str) -> Option<&Self> {
        match self.find(path)? {
            Lookup::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Mutable nested record addressed by a path.
    pub fn object_mut(&mut self, path: &str) -> Option<&mut Self> {
        let segments = path::parse(path)?;
        let mut current = self;
        for segment in segments {
            let field = current.field_mut(segment.name)?;
            let FieldData::Objects(objects) = &mut field.data else {
                return None;
            };
            current = objects.get_mut(segment.index.unwrap_or(0))?;
        }
        Some(current)
    }

    /// Resolves a dotted path such as `outer.inner[2].leaf`.
    ///
    /// Each segment except the last must name an OBJECT field; its index
    /// selects the nested record and defaults to `0`. On the last segment an
    /// index selects an element of a scalar array or of an OBJECT array.
    /// Without an index a scalar leaf resolves to its most recent value.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<Lookup<'_>> {
        let segments = path::parse(path)?;
        let (leaf, parents) = segments.split_last()?;
        let mut current = self;
        for segment in parents {
            let FieldData::Objects(objects) = &current.field(segment.name)?.data else {
                return None;
            };
            current = objects.get(segment.index.unwrap_or(0))?;
        }
        current.lookup_leaf(leaf)
    }

    fn lookup_leaf(&self, leaf: &PathSegment<'_>) -> Option<Lookup<'_>> {
        let field = self.field(leaf.name)?;
        match &field.data {
            FieldData::Scalars(history) => match leaf.index {
                None => history.last().copied().map(Lookup::Scalar),
                Some(index) => wire::window(&field.schema, history)
                    .nth(index)
                    .map(Lookup::Scalar),
            },
            FieldData::Text(text) => Some(Lookup::Text(text)),
            FieldData::Enum(value) => Some(Lookup::Enum(value)),
            FieldData::Objects(objects) => objects.get(leaf.index.unwrap_or(0)).map(Lookup::Record),
        }
    }

    fn scalar(&self, path: &str, target: FieldType) -> Option<Scalar> {
        match self.find(path)? {
            Lookup::Scalar(value) => value.cast(target),
            Lookup::Enum(value) => Scalar::Int(value.value()).cast(target),
            Lookup::Text(_) | Lookup::Record(_) => None,
        }
    }

    /// Boolean at `path`, `false` when absent.
    #[must_use]
    pub fn get_bool(&self, path: &str) -> bool {
        matches!(self.scalar(path, FieldType::Bool), Some(Scalar::Bool(true)))
    }

    /// Signed byte at `path`, `0` when absent.
    #[must_use]
    pub fn get_char(&self, path: &str) -> i8 {
        match self.scalar(path, FieldType::Char) {
            Some(Scalar::Char(value)) => value,
            _ => 0,
        }
    }

    /// 16-bit integer at `path`, `0` when absent.
    #[must_use]
    pub fn get_short(&self, path: &str) -> i16 {
        match self.scalar(path, FieldType::Short) {
            Some(Scalar::Short(value)) => value,
            _ => 0,
        }
    }

    /// 32-bit integer at `path`, `0` when absent. Enumerations yield the
    /// selected label's value.
    #[must_use]
    pub fn get_int(&self, path: &str) -> i32 {
        match self.scalar(path, FieldType::Int) {
            Some(Scalar::Int(value)) => value,
            _ => 0,
        }
    }

    /// 64-bit integer at `path`, `0` when absent.
    #[must_use]
    pub fn get_long(&self, path: &str) -> i64 {
        match self.scalar(path, FieldType::Long) {
            Some(Scalar::Long(value)) => value,
            _ => 0,
        }
    }

    /// Single precision float at `path`, `0.0` when absent.
    #[must_use]
    pub fn get_float(&self, path: &str) -> f32 {
        match self.scalar(path, FieldType::Float) {
            Some(Scalar::Float(value)) => value,
            _ => 0.0,
        }
    }

    /// Double at `path`, `0.0` when absent.
    #[must_use]
    pub fn get_double(&self, path: &str) -> f64 {
        match self.scalar(path, FieldType::Double) {
            Some(Scalar::Double(value)) => value,
            _ => 0.0,
        }
    }

    /// Text at `path`, empty when absent.
    #[must_use]
    pub fn get_text(&self, path: &str) -> &str {
        match self.find(path) {
            Some(Lookup::Text(text)) => text,
            _ => "",
        }
    }

    /// Enumeration at `path`.
    #[must_use]
    pub fn get_enum(&self, path: &str) -> Option<&EnumValue> {
        match self.find(path)? {
            Lookup::Enum(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
