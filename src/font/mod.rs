//! sfnt font containers.
//!
//! Parsing and writing of the OpenType/TrueType table directory, plus the
//! WOFF 1.0 ([`woff`]) and WOFF 2.0 ([`woff2`]) wrappers. Outline data is
//! never interpreted; tables are carried as opaque byte blocks.

pub mod woff;
pub mod woff2;

use thiserror::Error;

/// A four-byte table tag.
pub type Tag = [u8; 4];

/// `0x00010000`: TrueType outlines.
pub const FLAVOR_TRUETYPE: u32 = 0x0001_0000;
/// `true`: legacy Apple TrueType.
pub const FLAVOR_APPLE_TRUE: u32 = u32::from_be_bytes(*b"true");
/// `OTTO`: CFF outlines.
pub const FLAVOR_CFF: u32 = u32::from_be_bytes(*b"OTTO");
/// `ttcf`: font collection.
pub const FLAVOR_COLLECTION: u32 = u32::from_be_bytes(*b"ttcf");

/// `head.checkSumAdjustment` target.
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;
/// Byte offset of `checkSumAdjustment` inside `head`.
const HEAD_ADJUSTMENT_OFFSET: usize = 8;

/// Font container error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FontError {
    /// Data ends before a structure it declares
    #[error("truncated {0}")]
    Truncated(&'static str),
    /// Unknown container signature
    #[error("unrecognized font signature 0x{0:08X}")]
    BadSignature(u32),
    /// Font collections are not converted
    #[error("font collections (ttcf) are not supported")]
    Collection,
    /// Table record points outside the file
    #[error("table '{}' lies outside the font data", tag_str(.0))]
    TableOutOfBounds(Tag),
    /// A table appears twice
    #[error("duplicate table '{}'", tag_str(.0))]
    DuplicateTable(Tag),
    /// zlib stream in a WOFF file failed
    #[error("failed to decompress table '{}': {1}", tag_str(.0))]
    Decompress(Tag, String),
    /// Compression failure while writing
    #[error("compression failed: {0}")]
    Compress(#[from] std::io::Error),
}

/// Render a tag for messages.
pub fn tag_str(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

pub(crate) fn read_u16(data: &[u8], offset: usize, what: &'static str) -> Result<u16, FontError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(FontError::Truncated(what))
}

pub(crate) fn read_u32(data: &[u8], offset: usize, what: &'static str) -> Result<u32, FontError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(FontError::Truncated(what))
}

pub(crate) fn read_tag(data: &[u8], offset: usize) -> Result<Tag, FontError> {
    data.get(offset..offset + 4)
        .map(|b| [b[0], b[1], b[2], b[3]])
        .ok_or(FontError::Truncated("table tag"))
}

/// Round up to a multiple of four.
pub(crate) fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

/// Sum of big-endian u32 words, zero-padded at the end.
pub fn checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        sum = sum.wrapping_add(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut last = [0u8; 4];
        last[..rest.len()].copy_from_slice(rest);
        sum = sum.wrapping_add(u32::from_be_bytes(last));
    }
    sum
}

/// One font table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table tag
    pub tag: Tag,
    /// Raw table bytes, unpadded
    pub data: Vec<u8>,
}

impl Table {
    /// Checksum as recorded in a table directory.
    ///
    /// `head` is summed with `checkSumAdjustment` treated as zero.
    pub fn checksum(&self) -> u32 {
        if &self.tag == b"head" && self.data.len() >= HEAD_ADJUSTMENT_OFFSET + 4 {
            let mut data = self.data.clone();
            data[HEAD_ADJUSTMENT_OFFSET..HEAD_ADJUSTMENT_OFFSET + 4].fill(0);
            checksum(&data)
        } else {
            checksum(&self.data)
        }
    }
}

/// Outline technology of a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outlines {
    /// `glyf` quadratic outlines
    TrueType,
    /// `CFF `/`CFF2` cubic outlines
    Cff,
}

/// A parsed sfnt font: flavor plus tables sorted by tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sfnt {
    flavor: u32,
    tables: Vec<Table>,
}

impl Sfnt {
    /// Build a font from tables; sorts them and fixes `head.checkSumAdjustment`.
    pub fn new(flavor: u32, mut tables: Vec<Table>) -> Result<Self, FontError> {
        tables.sort_by(|a, b| a.tag.cmp(&b.tag));
        if let Some(dup) = tables.windows(2).find(|w| w[0].tag == w[1].tag) {
            return Err(FontError::DuplicateTable(dup[0].tag));
        }
        let mut sfnt = Self { flavor, tables };
        sfnt.update_checksum_adjustment();
        Ok(sfnt)
    }

    /// Parse a font file: bare sfnt (TrueType/OpenType) or WOFF 1.0.
    pub fn parse(data: &[u8]) -> Result<Self, FontError> {
        let signature = read_u32(data, 0, "font header")?;
        match signature {
            FLAVOR_TRUETYPE | FLAVOR_APPLE_TRUE | FLAVOR_CFF => Self::parse_sfnt(data),
            woff::SIGNATURE => woff::decode(data),
            FLAVOR_COLLECTION => Err(FontError::Collection),
            other => Err(FontError::BadSignature(other)),
        }
    }

    fn parse_sfnt(data: &[u8]) -> Result<Self, FontError> {
        let flavor = read_u32(data, 0, "sfnt header")?;
        let num_tables = read_u16(data, 4, "sfnt header")? as usize;

        let mut tables = Vec::with_capacity(num_tables);
        for i in 0..num_tables {
            let record = 12 + i * 16;
            let tag = read_tag(data, record)?;
            let offset = read_u32(data, record + 8, "table record")? as usize;
            let length = read_u32(data, record + 12, "table record")? as usize;
            let bytes = offset
                .checked_add(length)
                .and_then(|end| data.get(offset..end))
                .ok_or(FontError::TableOutOfBounds(tag))?;
            tables.push(Table { tag, data: bytes.to_vec() });
        }

        Self::new(flavor, tables)
    }

    /// sfnt version tag.
    pub fn flavor(&self) -> u32 {
        self.flavor
    }

    /// Tables sorted by tag.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Look up a table.
    pub fn table(&self, tag: &Tag) -> Option<&Table> {
        self.tables.iter().find(|t| &t.tag == tag)
    }

    /// Outline technology, judged by flavor and tables.
    pub fn outlines(&self) -> Outlines {
        if self.flavor == FLAVOR_CFF || self.table(b"CFF ").is_some() || self.table(b"CFF2").is_some()
        {
            Outlines::Cff
        } else {
            Outlines::TrueType
        }
    }

    /// Size of the sfnt this font serializes to.
    pub fn sfnt_size(&self) -> usize {
        12 + 16 * self.tables.len() + self.tables.iter().map(|t| pad4(t.data.len())).sum::<usize>()
    }

    fn search_params(&self) -> (u16, u16, u16) {
        let n = self.tables.len() as u32;
        let mut entry_selector = 0u32;
        while n > 0 && (1u32 << (entry_selector + 1)) <= n {
            entry_selector += 1;
        }
        let search_range = if n == 0 { 0 } else { (1u32 << entry_selector) * 16 };
        (search_range as u16, entry_selector as u16, (n * 16 - search_range) as u16)
    }

    /// Serialize to a bare sfnt file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (search_range, entry_selector, range_shift) = self.search_params();
        let mut out = Vec::with_capacity(self.sfnt_size());
        out.extend_from_slice(&self.flavor.to_be_bytes());
        out.extend_from_slice(&(self.tables.len() as u16).to_be_bytes());
        out.extend_from_slice(&search_range.to_be_bytes());
        out.extend_from_slice(&entry_selector.to_be_bytes());
        out.extend_from_slice(&range_shift.to_be_bytes());

        let mut offset = 12 + 16 * self.tables.len();
        for table in &self.tables {
            out.extend_from_slice(&table.tag);
            out.extend_from_slice(&table.checksum().to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(table.data.len() as u32).to_be_bytes());
            offset += pad4(table.data.len());
        }
        for table in &self.tables {
            out.extend_from_slice(&table.data);
            out.resize(pad4(out.len()), 0);
        }
        out
    }

    /// Recompute `head.checkSumAdjustment` for the current tables.
    fn update_checksum_adjustment(&mut self) {
        let Some(idx) = self.tables.iter().position(|t| &t.tag == b"head") else {
            return;
        };
        if self.tables[idx].data.len() < HEAD_ADJUSTMENT_OFFSET + 4 {
            return;
        }
        let range = HEAD_ADJUSTMENT_OFFSET..HEAD_ADJUSTMENT_OFFSET + 4;
        self.tables[idx].data[range.clone()].fill(0);
        let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&self.to_bytes()));
        self.tables[idx].data[range].copy_from_slice(&adjustment.to_be_bytes());
    }
}

#[cfg(test)]
pub(crate) mod test_fonts {
    use super::*;

    /// A structurally valid TrueType font with placeholder table contents.
    pub fn truetype() -> Sfnt {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());
        let tables = vec![
            Table { tag: *b"cmap", data: vec![0, 0, 0, 0] },
            Table { tag: *b"glyf", data: vec![0u8; 37] },
            Table { tag: *b"head", data: head },
            Table { tag: *b"hhea", data: vec![0u8; 36] },
            Table { tag: *b"loca", data: vec![0, 0, 0, 37] },
            Table { tag: *b"maxp", data: vec![0, 1, 0, 0, 0, 2] },
            Table { tag: *b"name", data: b"sitepipe-test-name-table".to_vec() },
            Table { tag: *b"post", data: vec![0, 3, 0, 0] },
            Table { tag: *b"zzzz", data: vec![7; 3] },
        ];
        Sfnt::new(FLAVOR_TRUETYPE, tables).unwrap()
    }
}
