//! WOFF 2.0 with null table transforms.
//!
//! All table data is concatenated into one Brotli stream. `glyf` and `loca`
//! are written with transform version 3 (null), every other table with
//! version 0 (null), so no table carries a `transformLength`.

use super::{FontError, Sfnt, Table, Tag};
use std::io::Write;

/// `wOF2`
pub const SIGNATURE: u32 = u32::from_be_bytes(*b"wOF2");
const HEADER_LEN: usize = 48;
/// Flag index meaning "explicit tag follows".
const ARBITRARY_TAG: u8 = 63;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_LGWIN: u32 = 22;

/// Tags with a one-byte code in the table directory, by index.
pub const KNOWN_TAGS: [&Tag; 63] = [
    b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
    b"glyf", b"loca", b"prep", b"CFF ", b"VORG", b"EBDT", b"EBLC", b"gasp", b"hdmx", b"kern",
    b"LTSH", b"PCLT", b"VDMX", b"vhea", b"vmtx", b"BASE", b"GDEF", b"GPOS", b"GSUB", b"EBSC",
    b"JSTF", b"MATH", b"CBDT", b"CBLC", b"COLR", b"CPAL", b"SVG ", b"sbix", b"acnt", b"avar",
    b"bdat", b"bloc", b"bsln", b"cvar", b"fdsc", b"feat", b"fmtx", b"fvar", b"gvar", b"hsty",
    b"just", b"lcar", b"mort", b"morx", b"opbd", b"prop", b"trak", b"Zapf", b"Silf", b"Glat",
    b"Gloc", b"Feat", b"Sill",
];

/// Append a UIntBase128 value.
pub fn write_base128(out: &mut Vec<u8>, value: u32) {
    let mut groups = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7F) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | continuation);
    }
}

/// Read a UIntBase128 value, returning it and the bytes consumed.
pub fn read_base128(data: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    for (i, byte) in data.iter().take(5).enumerate() {
        if i == 0 && *byte == 0x80 {
            return None;
        }
        if value & 0xFE00_0000 != 0 {
            return None;
        }
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

fn flags_for(tag: &Tag) -> u8 {
    let transform_bits: u8 = if tag == b"glyf" || tag == b"loca" { 3 << 6 } else { 0 };
    let index = KNOWN_TAGS.iter().position(|t| *t == tag).map(|i| i as u8).unwrap_or(ARBITRARY_TAG);
    transform_bits | index
}

/// Directory order: sorted by tag, with `loca` right after `glyf`.
fn directory_order(font: &Sfnt) -> Vec<&Table> {
    let mut order: Vec<&Table> = font.tables().iter().filter(|t| &t.tag != b"loca").collect();
    if let Some(loca) = font.table(b"loca") {
        match order.iter().position(|t| &t.tag == b"glyf") {
            Some(glyf) => order.insert(glyf + 1, loca),
            None => order.push(loca),
        }
    }
    order
}

/// Encode a font as WOFF 2.0.
pub fn encode(font: &Sfnt) -> Result<Vec<u8>, FontError> {
    let tables = directory_order(font);

    let mut directory = Vec::new();
    let mut stream_len = 0usize;
    for table in &tables {
        let flags = flags_for(&table.tag);
        directory.push(flags);
        if flags & 0x3F == ARBITRARY_TAG {
            directory.extend_from_slice(&table.tag);
        }
        write_base128(&mut directory, table.data.len() as u32);
        stream_len += table.data.len();
    }

    let mut compressor =
        brotli::CompressorWriter::new(Vec::new(), 4096, BROTLI_QUALITY, BROTLI_LGWIN);
    for table in &tables {
        compressor.write_all(&table.data)?;
    }
    compressor.flush()?;
    let compressed = compressor.into_inner();

    let unpadded = HEADER_LEN + directory.len() + compressed.len();
    let total_len = super::pad4(unpadded);

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&SIGNATURE.to_be_bytes());
    out.extend_from_slice(&font.flavor().to_be_bytes());
    out.extend_from_slice(&(total_len as u32).to_be_bytes());
    out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&(font.sfnt_size() as u32).to_be_bytes());
    out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    // metaOffset, metaLength, metaOrigLength, privOffset, privLength
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&directory);
    out.extend_from_slice(&compressed);
    out.resize(total_len, 0);

    tracing::debug!(
        tables = tables.len(),
        uncompressed = stream_len,
        compressed = compressed.len(),
        "encoded woff2"
    );
    Ok(out)
}
