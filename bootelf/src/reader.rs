//! ELF32 Reader
//!
//! Validates an image, decodes its header tables once into host order, and
//! answers structural queries against the borrowed bytes.
//!
//! # Lifecycle
//!
//! - Construction reads the file header, then every program header and every
//!   section header the header declares. Nothing else is decoded up front.
//! - Section data, names and segment bytes are sliced out of the borrowed
//!   image on each query; the reader caches nothing further.

use alloc::vec::Vec;

use crate::config::LoaderConfig;
use crate::elf::{
    ByteOrder, Elf32Header, Elf32ProgramHeader, Elf32SectionHeader, ET_EXEC,
    PROGRAM_HEADER_SIZE, SECTION_HEADER_SIZE, SHT_NOBITS,
};
use crate::error::{ElfError, ElfResult, HeaderTable};

/// Parsed view over a borrowed ELF32 image.
#[derive(Debug, Clone)]
pub struct ElfReader<'a> {
    bytes: &'a [u8],
    order: ByteOrder,
    header: Elf32Header,
    segments: Vec<Elf32ProgramHeader>,
    sections: Vec<Elf32SectionHeader>,
    relocatable: bool,
    pub(crate) config: LoaderConfig,
}

impl<'a> ElfReader<'a> {
    /// Parse an image with the default [`LoaderConfig`].
    pub fn new(bytes: &'a [u8]) -> ElfResult<Self> {
        Self::with_config(bytes, LoaderConfig::default())
    }

    /// Parse and validate an ELF32 image
    ///
    /// # Arguments
    ///
    /// * `bytes` - Raw bytes of the ELF file
    /// * `config` - Loader tunables
    ///
    /// # Returns
    ///
    /// * `Ok(ElfReader)` - Header tables decoded into host order
    /// * `Err(ElfError)` - Bad identification bytes or out-of-bounds tables
    pub fn with_config(bytes: &'a [u8], config: LoaderConfig) -> ElfResult<Self> {
        let (header, order) = Elf32Header::parse(bytes)?;

        let segments = Self::parse_table(
            bytes,
            header.e_phoff,
            header.e_phnum,
            PROGRAM_HEADER_SIZE,
            HeaderTable::Program,
            |offset| Elf32ProgramHeader::parse(bytes, offset, order),
        )?;

        let sections = Self::parse_table(
            bytes,
            header.e_shoff,
            header.e_shnum,
            SECTION_HEADER_SIZE,
            HeaderTable::Section,
            |offset| Elf32SectionHeader::parse(bytes, offset, order),
        )?;

        let relocatable = header.e_type != ET_EXEC;

        log::debug!(
            "ELF32 {:?}-endian: type={} machine={} entry={:#010x} phnum={} shnum={}",
            order,
            header.e_type,
            header.e_machine,
            header.e_entry,
            header.e_phnum,
            header.e_shnum
        );

        Ok(Self {
            bytes,
            order,
            header,
            segments,
            sections,
            relocatable,
            config,
        })
    }

    /// Decode `count` fixed-size records starting at `offset`.
    fn parse_table<T>(
        bytes: &[u8],
        offset: u32,
        count: u16,
        record_size: usize,
        table: HeaderTable,
        parse: impl Fn(usize) -> Option<T>,
    ) -> ElfResult<Vec<T>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let start = offset as usize;
        let table_end = (count as usize)
            .checked_mul(record_size)
            .and_then(|len| start.checked_add(len))
            .ok_or(ElfError::OutOfBoundsTable(table))?;

        if table_end > bytes.len() {
            return Err(ElfError::OutOfBoundsTable(table));
        }

        (0..count as usize)
            .map(|i| parse(start + i * record_size).ok_or(ElfError::OutOfBoundsTable(table)))
            .collect()
    }

    /// The borrowed image.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn header(&self) -> &Elf32Header {
        &self.header
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn entry_point(&self) -> u32 {
        self.header.e_entry
    }

    pub fn machine(&self) -> u16 {
        self.header.e_machine
    }

    pub fn flags(&self) -> u32 {
        self.header.e_flags
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// True unless the image is `ET_EXEC`.
    pub fn is_relocatable(&self) -> bool {
        self.relocatable
    }

    pub fn segments(&self) -> &[Elf32ProgramHeader] {
        &self.segments
    }

    pub fn sections(&self) -> &[Elf32SectionHeader] {
        &self.sections
    }

    pub fn segment(&self, index: usize) -> Option<&Elf32ProgramHeader> {
        self.segments.get(index)
    }

    pub fn section(&self, index: usize) -> Option<&Elf32SectionHeader> {
        self.sections.get(index)
    }

    /// File-resident bytes of a segment (`p_filesz` bytes at `p_offset`).
    pub fn segment_data(&self, index: usize) -> Option<&'a [u8]> {
        let range = self.segment(index)?.file_range(self.bytes.len())?;
        self.bytes.get(range)
    }

    /// A loadable segment with the execute flag set.
    pub fn is_code_segment(&self, index: usize) -> bool {
        self.segment(index)
            .map_or(false, |ph| ph.is_load() && ph.is_executable())
    }

    /// Contents of a section, or `None` for `NOBITS` sections and extents
    /// that fall outside the image.
    pub fn section_data(&self, index: usize) -> Option<&'a [u8]> {
        let section = self.section(index)?;
        if section.sh_type == SHT_NOBITS {
            return None;
        }

        let start = section.sh_offset as usize;
        let end = start.checked_add(section.sh_size as usize)?;
        self.bytes.get(start..end)
    }
}
