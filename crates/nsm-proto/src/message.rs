//! Message framing.
//!
//! Layout: command label, node name, param count, params (`i32` each),
//! payload (written NUL-terminated), then a trailing record for
//! [`Command::StatusSet`] and [`Command::ConfigSet`] only.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::codec::{WireReader, WireWriter};
use crate::command::Command;
use crate::error::ProtocolError;
use crate::record::TypedRecord;

/// Most params accepted in one message.
pub const MAX_PARAMS: usize = 1024;

/// One framed protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    command: Command,
    node: String,
    params: Box<[i32]>,
    payload: String,
    record: Option<Arc<TypedRecord>>,
}

impl Message {
    /// Creates a message without params, payload or record.
    #[must_use]
    pub fn new(command: Command, node: impl Into<String>) -> Self {
        Self {
            command,
            node: node.into(),
            params: Box::default(),
            payload: String::new(),
            record: None,
        }
    }

    /// Sets the params. Their number is fixed from here on.
    #[must_use]
    pub fn with_params(mut self, params: impl Into<Box<[i32]>>) -> Self {
        self.params = params.into();
        self
    }

    /// Sets the payload text.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Attaches a trailing record. It is only written for record-carrying
    /// commands.
    #[must_use]
    pub fn with_record(mut self, record: impl Into<Arc<TypedRecord>>) -> Self {
        self.record = Some(record.into());
        self
    }

    /// Command.
    #[must_use]
    pub const fn command(&self) -> &Command {
        &self.command
    }

    /// Node the message is addressed to or originates from.
    #[must_use]
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Params in wire order.
    #[must_use]
    pub fn params(&self) -> &[i32] {
        &self.params
    }

    /// A single param.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<i32> {
        self.params.get(index).copied()
    }

    /// Mutable access to the params. The count cannot change.
    pub fn params_mut(&mut self) -> &mut [i32] {
        &mut self.params
    }

    /// Payload text.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Trailing record, if any.
    #[must_use]
    pub const fn record(&self) -> Option<&Arc<TypedRecord>> {
        self.record.as_ref()
    }

    /// Decodes one message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] on I/O failure or malformed content.
    pub fn decode<R: Read>(reader: &mut WireReader<R>) -> Result<Self, ProtocolError> {
        let command = Command::from_label(&reader.read_string()?);
        let node = reader.read_string()?;

        let raw_count = reader.read_int()?;
        let count = usize::try_from(raw_count).map_err(|_| ProtocolError::InvalidCount {
            what: "param",
            count: raw_count,
        })?;
        if count > MAX_PARAMS {
            return Err(ProtocolError::TooManyParams {
                count,
                limit: MAX_PARAMS,
            });
        }
        let mut params = Vec::with_capacity(count);
        for _ in 0..count {
            params.push(reader.read_int()?);
        }

        let payload = reader.read_string()?;
        let record = match command.record_kind() {
            Some(kind) => Some(Arc::new(TypedRecord::decode(reader, kind)?)),
            None => None,
        };

        Ok(Self {
            command,
            node,
            params: params.into_boxed_slice(),
            payload,
            record,
        })
    }

    /// Decodes one message and checks its param count.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ParamCountMismatch`] when the message does not
    /// carry exactly `expected` params.
    pub fn decode_expecting<R: Read>(
        reader: &mut WireReader<R>,
        expected: usize,
    ) -> Result<Self, ProtocolError> {
        let message = Self::decode(reader)?;
        if message.params.len() != expected {
            return Err(ProtocolError::ParamCountMismatch {
                expected,
                actual: message.params.len(),
            });
        }
        Ok(message)
    }

    /// Encodes the message and, for record-carrying commands, its record.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingRecord`] or
    /// [`ProtocolError::RecordKindMismatch`] when the record does not suit
    /// the command, or a codec error when writing fails.
    pub fn encode<W: Write>(&self, writer: &mut WireWriter<W>) -> Result<(), ProtocolError> {
        let record = self.checked_record()?;
        writer.write_string(self.command.label())?;
        writer.write_string(&self.node)?;
        writer.write_length(self.params.len())?;
        for param in self.params.iter() {
            writer.write_int(*param)?;
        }
        writer.write_terminated_string(&self.payload)?;
        if let Some(record) = record {
            record.encode(writer)?;
        }
        Ok(())
    }

    /// Encodes the message into a fresh buffer.
    ///
    /// # Errors
    ///
    /// See [`Message::encode`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut writer = WireWriter::new(Vec::new());
        self.encode(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn checked_record(&self) -> Result<Option<&TypedRecord>, ProtocolError> {
        if self.params.len() > MAX_PARAMS {
            return Err(ProtocolError::TooManyParams {
                count: self.params.len(),
                limit: MAX_PARAMS,
            });
        }
        let Some(expected) = self.command.record_kind() else {
            return Ok(None);
        };
        let Some(record) = self.record.as_deref() else {
            return Err(ProtocolError::MissingRecord {
                command: self.command.label().to_owned(),
            });
        };
        if record.kind() != expected {
            return Err(ProtocolError::RecordKindMismatch {
                expected,
                found: record.kind(),
            });
        }
        Ok(Some(record))
    }
}
