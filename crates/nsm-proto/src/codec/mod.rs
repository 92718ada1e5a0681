//! Primitive big-endian codec.
//!
//! Fixed-width values use network byte order. Strings are an `i32` byte
//! length followed by the bytes; a single trailing NUL is stripped on read so
//! that NUL-terminated writers and plain writers both decode to the same text.

use std::io::{Read, Write};

use crate::error::CodecError;
use crate::field::{FieldType, Scalar};

/// Largest string accepted from the wire.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Reads primitive values from a byte stream.
#[derive(Debug)]
pub struct WireReader<R> {
    inner: R,
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the NSM wire format is big-endian by definition"
)]
impl<R: Read> WireReader<R> {
    /// Wraps a reader.
    #[must_use]
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Borrows the underlying reader.
    pub const fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Returns the underlying reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut bytes = [0_u8; N];
        self.inner.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads a one-byte boolean.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] on a short read.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_array::<1>()? != [0])
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] on a short read.
    pub fn read_char(&mut self) -> Result<i8, CodecError> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Reads a 16-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] on a short read.
    pub fn read_short(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Reads a 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] on a short read.
    pub fn read_int(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads a 64-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] on a short read.
    pub fn read_long(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads a single precision float.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] on a short read.
    pub fn read_float(&mut self) -> Result<f32, CodecError> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    /// Reads a double precision float.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] on a short read.
    pub fn read_double(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Reads one value of the given scalar type.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotScalar`] for composite types and
    /// [`CodecError::Io`] on a short read.
    pub fn read_scalar(&mut self, field_type: FieldType) -> Result<Scalar, CodecError> {
        let value = match field_type {
            FieldType::Bool => Scalar::Bool(self.read_bool()?),
            FieldType::Char => Scalar::Char(self.read_char()?),
            FieldType::Short => Scalar::Short(self.read_short()?),
            FieldType::Int => Scalar::Int(self.read_int()?),
            FieldType::Long => Scalar::Long(self.read_long()?),
            FieldType::Float => Scalar::Float(self.read_float()?),
            FieldType::Double => Scalar::Double(self.read_double()?),
            FieldType::Text | FieldType::Object | FieldType::Enum => {
                return Err(CodecError::NotScalar { field_type });
            }
        };
        Ok(value)
    }

    /// Reads a non-negative `i32` length, bounded by `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NegativeLength`] or [`CodecError::LengthLimit`]
    /// for out-of-range values.
    pub fn read_length(&mut self, limit: usize) -> Result<usize, CodecError> {
        let raw = self.read_int()?;
        let length =
            usize::try_from(raw).map_err(|_| CodecError::NegativeLength { length: raw })?;
        if length > limit {
            return Err(CodecError::LengthLimit { length, limit });
        }
        Ok(length)
    }

    /// Reads a length-prefixed string, dropping one trailing NUL.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] on a short read or an out-of-range length.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let length = self.read_length(MAX_STRING_LEN)?;
        let mut bytes = vec![0_u8; length];
        self.inner.read_exact(&mut bytes)?;
        if bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(error) => String::from_utf8_lossy(error.as_bytes()).into_owned(),
        })
    }
}

/// Writes primitive values to a byte stream.
#[derive(Debug)]
pub struct WireWriter<W> {
    inner: W,
}

#[expect(
    clippy::big_endian_bytes,
    reason = "the NSM wire format is big-endian by definition"
)]
impl<W: Write> WireWriter<W> {
    /// Wraps a writer.
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrows the underlying writer.
    pub const fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes a one-byte boolean.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.inner.write_all(&[u8::from(value)])?;
        Ok(())
    }

    /// Writes a signed byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_char(&mut self, value: i8) -> Result<(), CodecError> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a 16-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_short(&mut self, value: i16) -> Result<(), CodecError> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_int(&mut self, value: i32) -> Result<(), CodecError> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a 64-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_long(&mut self, value: i64) -> Result<(), CodecError> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a single precision float.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_float(&mut self, value: f32) -> Result<(), CodecError> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a double precision float.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_double(&mut self, value: f64) -> Result<(), CodecError> {
        self.inner.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a scalar using its own width.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the write fails.
    pub fn write_scalar(&mut self, value: Scalar) -> Result<(), CodecError> {
        match value {
            Scalar::Bool(inner) => self.write_bool(inner),
            Scalar::Char(inner) => self.write_char(inner),
            Scalar::Short(inner) => self.write_short(inner),
            Scalar::Int(inner) => self.write_int(inner),
            Scalar::Long(inner) => self.write_long(inner),
            Scalar::Float(inner) => self.write_float(inner),
            Scalar::Double(inner) => self.write_double(inner),
        }
    }

    /// Writes a collection length as an `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LengthLimit`] when the length does not fit.
    pub fn write_length(&mut self, length: usize) -> Result<(), CodecError> {
        let raw = i32::try_from(length).map_err(|_| CodecError::LengthLimit {
            length,
            limit: i32::MAX.unsigned_abs() as usize,
        })?;
        self.write_int(raw)
    }

    /// Writes a length-prefixed string without a terminator.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the string is too long or the write fails.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_length(value.len())?;
        self.inner.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Writes a length-prefixed string followed by one NUL byte, which the
    /// length includes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the string is too long or the write fails.
    pub fn write_terminated_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_length(value.len().saturating_add(1))?;
        self.inner.write_all(value.as_bytes())?;
        self.inner.write_all(&[0])?;
        Ok(())
    }

    /// Flushes the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] when the flush fails.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
