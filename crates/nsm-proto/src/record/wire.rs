//! Wire encoding of typed records.
//!
//! Header: id, name, origin, table, revision, field count. Each field carries
//! its name and type tag; status fields add length and offset. Values follow:
//!
//! | type    | status                       | configuration                      |
//! |---------|------------------------------|------------------------------------|
//! | scalar  | `max(length, 1)` values      | one value                          |
//! | TEXT    | rejected                     | one string                         |
//! | ENUM    | rejected                     | count, (label, int) pairs, label   |
//! | OBJECT  | `length` nested records      | int count, then nested records     |

use std::io::{Read, Write};

use super::{EnumValue, Field, FieldData, FieldSchema, RecordKind, TypedRecord};
use crate::codec::{WireReader, WireWriter};
use crate::error::ProtocolError;
use crate::field::{FieldType, Scalar};

/// Deepest nesting of OBJECT fields accepted on the wire.
pub const MAX_NESTING_DEPTH: usize = 32;

/// The last `arity` values of a scalar history, zero-padded at the front.
pub(super) fn window<'a>(
    schema: &FieldSchema,
    history: &'a [Scalar],
) -> impl Iterator<Item = Scalar> + 'a {
    let arity = schema.arity();
    let padding = arity.saturating_sub(history.len());
    let skip = history.len().saturating_sub(arity);
    let zero = Scalar::zero(schema.field_type).unwrap_or(Scalar::Int(0));
    std::iter::repeat_n(zero, padding).chain(history.iter().skip(skip).copied())
}

fn read_count<R: Read>(
    reader: &mut WireReader<R>,
    what: &'static str,
) -> Result<usize, ProtocolError> {
    let count = reader.read_int()?;
    usize::try_from(count).map_err(|_| ProtocolError::InvalidCount { what, count })
}

impl TypedRecord {
    /// Decodes one record of the given kind, including nested records.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] on I/O failure, unknown type tags, types the
    /// kind does not support, negative counts or excessive nesting.
    pub fn decode<R: Read>(
        reader: &mut WireReader<R>,
        kind: RecordKind,
    ) -> Result<Self, ProtocolError> {
        Self::decode_at(reader, kind, 0)
    }

    fn decode_at<R: Read>(
        reader: &mut WireReader<R>,
        kind: RecordKind,
        depth: usize,
    ) -> Result<Self, ProtocolError> {
        if depth >= MAX_NESTING_DEPTH {
            return Err(ProtocolError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        let id = reader.read_int()?;
        let name = reader.read_string()?;
        let origin = reader.read_string()?;
        let table = reader.read_string()?;
        let revision = reader.read_int()?;
        let field_count = read_count(reader, "field")?;

        let mut record = Self::new(kind, name, origin)
            .with_id(id)
            .with_table(table)
            .with_revision(revision);
        for _ in 0..field_count {
            let (schema, data) = record.decode_field(reader, depth)?;
            record.push_field(schema, data);
        }
        Ok(record)
    }

    fn decode_field<R: Read>(
        &self,
        reader: &mut WireReader<R>,
        depth: usize,
    ) -> Result<(FieldSchema, FieldData), ProtocolError> {
        let name = reader.read_string()?;
        let tag = reader.read_int()?;
        let field_type = FieldType::from_tag(tag).ok_or(ProtocolError::UnknownFieldType { tag })?;
        if !self.kind.supports(field_type) {
            return Err(ProtocolError::UnsupportedField {
                kind: self.kind,
                field_type,
            });
        }
        let (length, offset) = match self.kind {
            RecordKind::Status => (read_count(reader, "field length")?, reader.read_int()?),
            RecordKind::Configuration => (0, 0),
        };
        let mut schema = FieldSchema {
            name,
            field_type,
            length,
            offset,
        };

        let data = match field_type {
            FieldType::Text => FieldData::Text(reader.read_string()?),
            FieldType::Enum => FieldData::Enum(decode_enum(reader)?),
            FieldType::Object => {
                if self.kind == RecordKind::Configuration {
                    schema.length = read_count(reader, "object")?;
                }
                let mut objects = Vec::new();
                for _ in 0..schema.length {
                    objects.push(Self::decode_at(reader, self.kind, depth.saturating_add(1))?);
                }
                FieldData::Objects(objects)
            }
            scalar => {
                let values = match self.kind {
                    RecordKind::Status => schema.arity(),
                    RecordKind::Configuration => 1,
                };
                let mut history = Vec::new();
                for _ in 0..values {
                    history.push(reader.read_scalar(scalar)?);
                }
                FieldData::Scalars(history)
            }
        };
        Ok((schema, data))
    }

    /// Encodes the record, iterating fields in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] when the writer fails or a length does not
    /// fit the wire format.
    pub fn encode<W: Write>(&self, writer: &mut WireWriter<W>) -> Result<(), ProtocolError> {
        writer.write_int(self.id)?;
        writer.write_string(&self.name)?;
        writer.write_string(&self.origin)?;
        writer.write_string(&self.table)?;
        writer.write_int(self.revision)?;
        writer.write_length(self.fields.len())?;
        for field in &self.fields {
            self.encode_field(writer, field)?;
        }
        Ok(())
    }

    fn encode_field<W: Write>(
        &self,
        writer: &mut WireWriter<W>,
        field: &Field,
    ) -> Result<(), ProtocolError> {
        let schema = &field.schema;
        writer.write_string(&schema.name)?;
        writer.write_int(schema.field_type.tag())?;
        if self.kind == RecordKind::Status {
            let length = match &field.data {
                FieldData::Objects(objects) => objects.len(),
                _ => schema.length,
            };
            writer.write_length(length)?;
            writer.write_int(schema.offset)?;
        }

        match &field.data {
            FieldData::Scalars(history) => match self.kind {
                RecordKind::Status => {
                    for value in window(schema, history) {
                        writer.write_scalar(value)?;
                    }
                }
                RecordKind::Configuration => {
                    let value = history
                        .last()
                        .copied()
                        .or_else(|| Scalar::zero(schema.field_type));
                    if let Some(value) = value {
                        writer.write_scalar(value)?;
                    }
                }
            },
            FieldData::Text(text) => writer.write_string(text)?,
            FieldData::Enum(value) => encode_enum(writer, value)?,
            FieldData::Objects(objects) => {
                if self.kind == RecordKind::Configuration {
                    writer.write_length(objects.len())?;
                }
                for object in objects {
                    object.encode(writer)?;
                }
            }
        }
        Ok(())
    }
}

fn decode_enum<R: Read>(reader: &mut WireReader<R>) -> Result<EnumValue, ProtocolError> {
    let count = read_count(reader, "enum option")?;
    let mut options = Vec::new();
    for _ in 0..count {
        let label = reader.read_string()?;
        let value = reader.read_int()?;
        options.push((label, value));
    }
    let selected = reader.read_string()?;
    Ok(EnumValue::new(options, selected))
}

fn encode_enum<W: Write>(writer: &mut WireWriter<W>, value: &EnumValue) -> Result<(), ProtocolError> {
    writer.write_length(value.options.len())?;
    for (label, number) in &value.options {
        writer.write_string(label)?;
        writer.write_int(*number)?;
    }
    writer.write_string(&value.selected)?;
    Ok(())
}
