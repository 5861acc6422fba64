//! Tag value reading.
//!
//! Small values live inline in the IFD entry; anything larger (tile offset
//! tables, descriptions, JPEG tables) is fetched with one range read.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{IfdEntry, TiffHeader};
use super::tags::FieldType;

/// Reads tag values respecting the file's byte order and offset width.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Raw bytes of an entry's value, inline or fetched from its offset.
    pub async fn read_bytes(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))? as usize;

        if entry.is_inline {
            return Ok(Bytes::copy_from_slice(&entry.value_offset_bytes[..size]));
        }

        let offset = entry.value_offset(self.header.byte_order);
        Ok(self.reader.read_exact_at(offset, size).await?)
    }

    /// All values of an integer entry (Byte, Short, Long or Long8) widened to u64.
    ///
    /// Used for TileOffsets and TileByteCounts, whose element type varies
    /// between writers.
    pub async fn read_u64_array(&self, entry: &IfdEntry) -> Result<Vec<u64>, TiffError> {
        let field_type = entry
            .field_type
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;
        if entry.count == 0 {
            return Ok(Vec::new());
        }

        let width = field_type.size_in_bytes();
        let order = self.header.byte_order;
        let read_one: fn(&[u8], super::parser::ByteOrder) -> u64 = match field_type {
            FieldType::Byte => |b, _| b[0] as u64,
            FieldType::Short => |b, o| o.read_u16(b) as u64,
            FieldType::Long => |b, o| o.read_u32(b) as u64,
            FieldType::Long8 => |b, o| o.read_u64(b),
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag: "integer array",
                    message: format!("unexpected field type {:?}", other),
                })
            }
        };

        let bytes = self.read_bytes(entry).await?;
        Ok(bytes
            .chunks_exact(width)
            .map(|chunk| read_one(chunk, order))
            .collect())
    }

    /// An ASCII entry as a string, with the trailing NUL stripped.
    pub async fn read_string(&self, entry: &IfdEntry) -> Result<String, TiffError> {
        if entry.field_type != Some(FieldType::Ascii) {
            return Err(TiffError::InvalidTagValue {
                tag: "string",
                message: format!("expected ASCII, got type {}", entry.field_type_raw),
            });
        }

        let bytes = self.read_bytes(entry).await?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
