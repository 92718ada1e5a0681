//! Wire protocol for the NSM monitoring network.
//!
//! The crate provides the big-endian primitive [`codec`], the self-describing
//! [`TypedRecord`] container in its status and configuration flavours, the
//! [`Command`] table and [`Message`] framing. It performs no I/O of its own;
//! callers hand it any [`std::io::Read`] or [`std::io::Write`].

pub mod codec;
mod command;
mod error;
mod field;
mod message;
mod record;

pub use codec::{MAX_STRING_LEN, WireReader, WireWriter};
pub use command::Command;
pub use error::{CodecError, ProtocolError};
pub use field::{FieldType, Scalar};
pub use message::{MAX_PARAMS, Message};
pub use record::{EnumValue, FieldSchema, Lookup, MAX_NESTING_DEPTH, RecordKind, TypedRecord};
