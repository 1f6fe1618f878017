//! WOFF 1.0: per-table zlib compression around an sfnt.

use super::{pad4, read_tag, read_u16, read_u32, FontError, Sfnt, Table, Tag};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// `wOFF`
pub const SIGNATURE: u32 = u32::from_be_bytes(*b"wOFF");
const HEADER_LEN: usize = 44;
const DIR_ENTRY_LEN: usize = 20;

fn deflate(data: &[u8]) -> Result<Vec<u8>, FontError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Encode a font as WOFF 1.0.
///
/// A table is stored uncompressed when zlib does not make it smaller.
pub fn encode(font: &Sfnt) -> Result<Vec<u8>, FontError> {
    let tables = font.tables();
    let mut blocks = Vec::with_capacity(tables.len());
    for table in tables {
        let compressed = deflate(&table.data)?;
        if compressed.len() < table.data.len() {
            blocks.push(compressed);
        } else {
            blocks.push(table.data.clone());
        }
    }

    let data_start = HEADER_LEN + DIR_ENTRY_LEN * tables.len();
    let total_len = data_start + blocks.iter().map(|b| pad4(b.len())).sum::<usize>();

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&SIGNATURE.to_be_bytes());
    out.extend_from_slice(&font.flavor().to_be_bytes());
    out.extend_from_slice(&(total_len as u32).to_be_bytes());
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(font.sfnt_size() as u32).to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    // metadata and private blocks: offset, length (, origLength)
    out.extend_from_slice(&[0u8; 20]);

    let mut offset = data_start;
    for (table, block) in tables.iter().zip(&blocks) {
        out.extend_from_slice(&table.tag);
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(block.len() as u32).to_be_bytes());
        out.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&table.checksum().to_be_bytes());
        offset += pad4(block.len());
    }

    for block in &blocks {
        out.extend_from_slice(block);
        out.resize(pad4(out.len()), 0);
    }

    debug_assert_eq!(out.len(), total_len);
    Ok(out)
}

/// Decode a WOFF 1.0 file back to its sfnt tables.
pub fn decode(data: &[u8]) -> Result<Sfnt, FontError> {
    if read_u32(data, 0, "WOFF header")? != SIGNATURE {
        return Err(FontError::BadSignature(read_u32(data, 0, "WOFF header")?));
    }
    let flavor = read_u32(data, 4, "WOFF header")?;
    let num_tables = read_u16(data, 12, "WOFF header")? as usize;

    let mut tables = Vec::with_capacity(num_tables);
    for i in 0..num_tables {
        let entry = HEADER_LEN + i * DIR_ENTRY_LEN;
        let tag = read_tag(data, entry)?;
        let offset = read_u32(data, entry + 4, "WOFF directory")? as usize;
        let comp_len = read_u32(data, entry + 8, "WOFF directory")? as usize;
        let orig_len = read_u32(data, entry + 12, "WOFF directory")? as usize;

        let block = offset
            .checked_add(comp_len)
            .and_then(|end| data.get(offset..end))
            .ok_or(FontError::TableOutOfBounds(tag))?;

        let table_data = if comp_len < orig_len {
            inflate(tag, block, orig_len)?
        } else {
            block.to_vec()
        };
        tables.push(Table { tag, data: table_data });
    }

    Sfnt::new(flavor, tables)
}

/// Inflate one table, reading at most one byte past `orig_len`.
fn inflate(tag: Tag, block: &[u8], orig_len: usize) -> Result<Vec<u8>, FontError> {
    // zlib output is at most ~1032x its input.
    let mut out = Vec::with_capacity(orig_len.min(block.len().saturating_mul(1032)));
    ZlibDecoder::new(block)
        .take(orig_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| FontError::Decompress(tag, e.to_string()))?;
    if out.len() > orig_len {
        let message = format!("output exceeds declared {} bytes", orig_len);
        return Err(FontError::Decompress(tag, message));
    }
    if out.len() != orig_len {
        let message = format!("expected {} bytes, got {}", orig_len, out.len());
        return Err(FontError::Decompress(tag, message));
    }
    Ok(out)
}
