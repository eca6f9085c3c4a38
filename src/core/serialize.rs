// Serialization utilities for Bitcoin data structures

use std::io::{self, Cursor, Read, Write};

use super::error::{CodecError, Result};

/// Upper bound on capacity reserved up front from an untrusted length prefix.
/// Larger collections still decode, they just grow as items arrive.
pub(crate) const MAX_PREALLOC: usize = 4096;

/// Trait for types with a wire encoding
pub trait Serializable: Sized {
    /// Write the wire form to `writer`
    fn pack<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()>;

    /// Read one value from `reader`
    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self>;

    /// Wire form as a fresh byte vector
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.pack(&mut buf)?;
        Ok(buf)
    }

    /// Decode from the front of `data`. Trailing bytes are not inspected.
    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        Self::unpack(&mut cursor)
    }
}

pub(crate) fn prealloc(count: u64) -> usize {
    usize::try_from(count).map_or(MAX_PREALLOC, |n| n.min(MAX_PREALLOC))
}

fn write_bytes<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> Result<()> {
    writer.write_all(data).map_err(CodecError::ShortWrite)
}

fn read_array<R: Read + ?Sized, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(CodecError::ShortRead)?;
    Ok(buf)
}

pub fn write_u8<W: Write + ?Sized>(writer: &mut W, value: u8) -> Result<()> {
    write_bytes(writer, &[value])
}

pub fn read_u8<R: Read + ?Sized>(reader: &mut R) -> Result<u8> {
    Ok(read_array::<_, 1>(reader)?[0])
}

pub fn write_u32<W: Write + ?Sized>(writer: &mut W, value: u32) -> Result<()> {
    write_bytes(writer, &value.to_le_bytes())
}

pub fn read_u32<R: Read + ?Sized>(reader: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

pub fn write_i32<W: Write + ?Sized>(writer: &mut W, value: i32) -> Result<()> {
    write_bytes(writer, &value.to_le_bytes())
}

pub fn read_i32<R: Read + ?Sized>(reader: &mut R) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array(reader)?))
}

pub fn write_u64<W: Write + ?Sized>(writer: &mut W, value: u64) -> Result<()> {
    write_bytes(writer, &value.to_le_bytes())
}

pub fn read_u64<R: Read + ?Sized>(reader: &mut R) -> Result<u64> {
    Ok(u64::from_le_bytes(read_array(reader)?))
}

pub fn write_i64<W: Write + ?Sized>(writer: &mut W, value: i64) -> Result<()> {
    write_bytes(writer, &value.to_le_bytes())
}

pub fn read_i64<R: Read + ?Sized>(reader: &mut R) -> Result<i64> {
    Ok(i64::from_le_bytes(read_array(reader)?))
}

/// Write a raw fixed-length field (no length prefix)
pub fn write_fixed<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> Result<()> {
    write_bytes(writer, data)
}

/// Read a raw fixed-length field (no length prefix)
pub fn read_fixed<R: Read + ?Sized, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    read_array(reader)
}

/// Write a variable-length integer (CompactSize)
/// Bitcoin uses a compact format for integers
pub fn write_varint<W: Write + ?Sized>(writer: &mut W, value: u64) -> Result<()> {
    match value {
        0..=0xfc => write_u8(writer, value as u8),
        0xfd..=0xffff => {
            write_u8(writer, 0xfd)?;
            write_bytes(writer, &(value as u16).to_le_bytes())
        }
        0x10000..=0xffffffff => {
            write_u8(writer, 0xfe)?;
            write_u32(writer, value as u32)
        }
        _ => {
            write_u8(writer, 0xff)?;
            write_u64(writer, value)
        }
    }
}

/// Read a variable-length integer (CompactSize)
///
/// Non-minimal encodings are accepted: `fd 05 00` decodes to 5.
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<u64> {
    match read_u8(reader)? {
        0xfd => Ok(u16::from_le_bytes(read_array(reader)?) as u64),
        0xfe => Ok(read_u32(reader)? as u64),
        0xff => read_u64(reader),
        small => Ok(small as u64),
    }
}

/// Number of bytes `write_varint` emits for `value`
pub fn varint_size(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffffffff => 5,
        _ => 9,
    }
}

/// Write bytes with length prefix (VarInt length + data)
pub fn write_var_bytes<W: Write + ?Sized>(writer: &mut W, data: &[u8]) -> Result<()> {
    write_varint(writer, data.len() as u64)?;
    write_bytes(writer, data)
}

/// Read bytes with length prefix
pub fn read_var_bytes<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_varint(reader)?;
    let mut data = Vec::with_capacity(prealloc(len));
    let read = Read::take(&mut *reader, len)
        .read_to_end(&mut data)
        .map_err(CodecError::ShortRead)?;
    if read as u64 != len {
        return Err(CodecError::ShortRead(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, read),
        )));
    }
    Ok(data)
}
