//! Error types for the wire codec and protocol layer.

use std::io;

use thiserror::Error;

use crate::field::FieldType;
use crate::record::RecordKind;

/// Errors raised by the primitive codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Reading from or writing to the stream failed, including short reads.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A string or count was announced with a negative length.
    #[error("negative length {length} on the wire")]
    NegativeLength {
        /// The length that was read.
        length: i32,
    },

    /// A length exceeds the accepted bound.
    #[error("length {length} exceeds the limit of {limit} bytes")]
    LengthLimit {
        /// The offending length.
        length: usize,
        /// The maximum accepted length.
        limit: usize,
    },

    /// A composite type was passed where a fixed-width scalar is required.
    #[error("{field_type} is not a fixed-width scalar type")]
    NotScalar {
        /// The rejected type.
        field_type: FieldType,
    },
}

/// Errors raised while framing messages or building typed records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Underlying codec failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A field carried a type tag outside the known set.
    #[error("unknown field type tag {tag}")]
    UnknownFieldType {
        /// The unrecognised tag.
        tag: i32,
    },

    /// The field type is not allowed for this record kind.
    #[error("{field_type} fields are not supported by {kind} records")]
    UnsupportedField {
        /// Kind of the record being built or decoded.
        kind: RecordKind,
        /// The rejected type.
        field_type: FieldType,
    },

    /// Nested records exceed the accepted depth.
    #[error("record nesting exceeds {limit} levels")]
    NestingTooDeep {
        /// The maximum accepted depth.
        limit: usize,
    },

    /// A message carried a different number of params than expected.
    #[error("expected {expected} params, found {actual}")]
    ParamCountMismatch {
        /// The arity the caller expected.
        expected: usize,
        /// The arity found on the wire.
        actual: usize,
    },

    /// A message announced more params than accepted.
    #[error("{count} params exceed the limit of {limit}")]
    TooManyParams {
        /// The announced count.
        count: usize,
        /// The maximum accepted count.
        limit: usize,
    },

    /// A count read from the wire was negative.
    #[error("invalid {what} count {count}")]
    InvalidCount {
        /// What was being counted.
        what: &'static str,
        /// The value that was read.
        count: i32,
    },

    /// A record-carrying command was encoded without a record.
    #[error("{command} messages must carry a record")]
    MissingRecord {
        /// Wire label of the command.
        command: String,
    },

    /// A record of the wrong kind was supplied.
    #[error("expected a {expected} record, found {found}")]
    RecordKindMismatch {
        /// Kind required by the context.
        expected: RecordKind,
        /// Kind that was supplied.
        found: RecordKind,
    },

    /// A field was addressed that the record does not declare.
    #[error("record has no field named '{field}'")]
    UnknownField {
        /// The requested field name.
        field: String,
    },

    /// A value was written to a field of an incompatible type.
    #[error("field '{field}' is declared as {declared}")]
    FieldTypeMismatch {
        /// The field name.
        field: String,
        /// The declared type.
        declared: FieldType,
    },

    /// An enum label was selected that the field's table does not contain.
    #[error("enum field '{field}' has no label '{label}'")]
    UnknownEnumLabel {
        /// The field name.
        field: String,
        /// The rejected label.
        label: String,
    },
}

impl ProtocolError {
    /// Whether the failure came from the transport rather than the content.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Codec(CodecError::Io(_)))
    }
}
