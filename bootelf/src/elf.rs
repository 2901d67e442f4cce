//! ELF32 Records and Byte-Order Normalization
//!
//! Host-order copies of the ELF32 header, program headers, section headers
//! and symbol records. Every record is decoded from the borrowed image
//! through bounds-checked field reads in the byte order the image declares.

use crate::error::{ElfError, ElfResult, HeaderDefect};

/// ELF magic number: 0x7F 'E' 'L' 'F'
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// Index of the class byte in `e_ident`
pub const EI_CLASS: usize = 4;

/// Index of the data-encoding byte in `e_ident`
pub const EI_DATA: usize = 5;

/// ELF class: 32-bit
pub const ELFCLASS32: u8 = 1;

/// ELF data encoding: little endian
pub const ELFDATA2LSB: u8 = 1;

/// ELF data encoding: big endian
pub const ELFDATA2MSB: u8 = 2;

/// ELF type: relocatable object
pub const ET_REL: u16 = 1;

/// ELF type: executable
pub const ET_EXEC: u16 = 2;

/// ELF type: shared object
pub const ET_DYN: u16 = 3;

/// Machine type: 32-bit PowerPC
pub const EM_PPC: u16 = 20;

/// Program header type: unused entry
pub const PT_NULL: u32 = 0;

/// Program header type: loadable segment
pub const PT_LOAD: u32 = 1;

/// Program header type: auxiliary information
pub const PT_NOTE: u32 = 4;

/// Section type: inactive header
pub const SHT_NULL: u32 = 0;

/// Section type: program data
pub const SHT_PROGBITS: u32 = 1;

/// Section type: symbol table
pub const SHT_SYMTAB: u32 = 2;

/// Section type: string table
pub const SHT_STRTAB: u32 = 3;

/// Section type: occupies no file space
pub const SHT_NOBITS: u32 = 8;

/// Symbol type: data object
pub const STT_OBJECT: u8 = 1;

/// Symbol type: function
pub const STT_FUNC: u8 = 2;

/// Size of the ELF32 file header.
pub const HEADER_SIZE: usize = 52;

/// Size of one ELF32 program header.
pub const PROGRAM_HEADER_SIZE: usize = 32;

/// Size of one ELF32 section header.
pub const SECTION_HEADER_SIZE: usize = 40;

/// Size of one ELF32 symbol record.
pub const SYMBOL_SIZE: usize = 16;

bitflags::bitflags! {
    /// Program header permission flags (`p_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u32 {
        /// Executable
        const EXECUTE = 1;
        /// Writable
        const WRITE = 2;
        /// Readable
        const READ = 4;
    }
}

bitflags::bitflags! {
    /// Section attribute flags (`sh_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SectionFlags: u32 {
        /// Writable at run time
        const WRITE = 0x1;
        /// Occupies memory at run time
        const ALLOC = 0x2;
        /// Contains machine instructions
        const EXECINSTR = 0x4;
    }
}

/// Byte order declared by `e_ident[EI_DATA]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn from_ident(data: u8) -> Option<Self> {
        match data {
            ELFDATA2LSB => Some(ByteOrder::Little),
            ELFDATA2MSB => Some(ByteOrder::Big),
            _ => None,
        }
    }

    /// Read a `u16` at `offset`, or `None` if it would run past `bytes`.
    pub fn read_u16(self, bytes: &[u8], offset: usize) -> Option<u16> {
        let raw: [u8; 2] = bytes.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
        Some(match self {
            ByteOrder::Little => u16::from_le_bytes(raw),
            ByteOrder::Big => u16::from_be_bytes(raw),
        })
    }

    /// Read a `u32` at `offset`, or `None` if it would run past `bytes`.
    pub fn read_u32(self, bytes: &[u8], offset: usize) -> Option<u32> {
        let raw: [u8; 4] = bytes.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(match self {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }

    /// Re-encode a host-order word so that it compares equal to the same
    /// word read raw (`u32::from_ne_bytes`) out of an image in this order.
    pub fn to_image_order(self, value: u32) -> u32 {
        match self {
            ByteOrder::Little => u32::from_ne_bytes(value.to_le_bytes()),
            ByteOrder::Big => u32::from_ne_bytes(value.to_be_bytes()),
        }
    }
}

/// Sequential field reader over one fixed-size record.
struct FieldReader<'a> {
    record: &'a [u8],
    order: ByteOrder,
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// `None` unless `bytes` holds `len` bytes starting at `offset`.
    fn at(bytes: &'a [u8], offset: usize, len: usize, order: ByteOrder) -> Option<Self> {
        let record = bytes.get(offset..offset.checked_add(len)?)?;
        Some(Self { record, order, pos: 0 })
    }

    // Callers never read past the record length they asked for in `at`.
    fn u8(&mut self) -> u8 {
        let value = self.record.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        value
    }

    fn u16(&mut self) -> u16 {
        let value = self.order.read_u16(self.record, self.pos).unwrap_or(0);
        self.pos += 2;
        value
    }

    fn u32(&mut self) -> u32 {
        let value = self.order.read_u32(self.record, self.pos).unwrap_or(0);
        self.pos += 4;
        value
    }
}

/// ELF32 file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32Header {
    /// Magic number and other info
    pub e_ident: [u8; 16],
    /// Object file type
    pub e_type: u16,
    /// Machine type
    pub e_machine: u16,
    /// Object file version
    pub e_version: u32,
    /// Entry point virtual address
    pub e_entry: u32,
    /// Program header table file offset
    pub e_phoff: u32,
    /// Section header table file offset
    pub e_shoff: u32,
    /// Processor-specific flags
    pub e_flags: u32,
    /// ELF header size
    pub e_ehsize: u16,
    /// Program header table entry size
    pub e_phentsize: u16,
    /// Program header table entry count
    pub e_phnum: u16,
    /// Section header table entry size
    pub e_shentsize: u16,
    /// Section header table entry count
    pub e_shnum: u16,
    /// Section name string table index
    pub e_shstrndx: u16,
}

impl Elf32Header {
    /// Validate the identification bytes and decode the header into host
    /// order. Returns the byte order the rest of the image uses.
    pub fn parse(bytes: &[u8]) -> ElfResult<(Self, ByteOrder)> {
        if bytes.len() < HEADER_SIZE {
            return Err(ElfError::MalformedHeader(HeaderDefect::TooSmall));
        }

        let mut e_ident = [0u8; 16];
        e_ident.copy_from_slice(&bytes[..16]);

        if e_ident[..4] != ELF_MAGIC {
            return Err(ElfError::MalformedHeader(HeaderDefect::InvalidMagic));
        }
        if e_ident[EI_CLASS] != ELFCLASS32 {
            return Err(ElfError::MalformedHeader(HeaderDefect::InvalidClass));
        }
        let order = ByteOrder::from_ident(e_ident[EI_DATA])
            .ok_or(ElfError::MalformedHeader(HeaderDefect::InvalidEncoding))?;

        let mut r = FieldReader::at(bytes, 16, HEADER_SIZE - 16, order)
            .ok_or(ElfError::MalformedHeader(HeaderDefect::TooSmall))?;

        let header = Elf32Header {
            e_ident,
            e_type: r.u16(),
            e_machine: r.u16(),
            e_version: r.u32(),
            e_entry: r.u32(),
            e_phoff: r.u32(),
            e_shoff: r.u32(),
            e_flags: r.u32(),
            e_ehsize: r.u16(),
            e_phentsize: r.u16(),
            e_phnum: r.u16(),
            e_shentsize: r.u16(),
            e_shnum: r.u16(),
            e_shstrndx: r.u16(),
        };

        Ok((header, order))
    }
}

/// ELF32 program header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32ProgramHeader {
    /// Segment type
    pub p_type: u32,
    /// Segment file offset
    pub p_offset: u32,
    /// Segment virtual address
    pub p_vaddr: u32,
    /// Segment physical address (unused)
    pub p_paddr: u32,
    /// Segment size in file
    pub p_filesz: u32,
    /// Segment size in memory
    pub p_memsz: u32,
    /// Segment flags
    pub p_flags: SegmentFlags,
    /// Segment alignment
    pub p_align: u32,
}

impl Elf32ProgramHeader {
    pub fn parse(bytes: &[u8], offset: usize, order: ByteOrder) -> Option<Self> {
        let mut r = FieldReader::at(bytes, offset, PROGRAM_HEADER_SIZE, order)?;
        Some(Self {
            p_type: r.u32(),
            p_offset: r.u32(),
            p_vaddr: r.u32(),
            p_paddr: r.u32(),
            p_filesz: r.u32(),
            p_memsz: r.u32(),
            p_flags: SegmentFlags::from_bits_retain(r.u32()),
            p_align: r.u32(),
        })
    }

    pub fn is_load(&self) -> bool {
        self.p_type == PT_LOAD
    }

    pub fn is_executable(&self) -> bool {
        self.p_flags.contains(SegmentFlags::EXECUTE)
    }

    /// File byte range of the segment, if it lies inside an image of
    /// `image_len` bytes.
    pub fn file_range(&self, image_len: usize) -> Option<core::ops::Range<usize>> {
        let start = self.p_offset as usize;
        let end = start.checked_add(self.p_filesz as usize)?;
        (end <= image_len).then_some(start..end)
    }
}

/// ELF32 section header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32SectionHeader {
    /// Section name (string table offset)
    pub sh_name: u32,
    /// Section type
    pub sh_type: u32,
    /// Section flags
    pub sh_flags: SectionFlags,
    /// Section virtual address
    pub sh_addr: u32,
    /// Section file offset
    pub sh_offset: u32,
    /// Section size
    pub sh_size: u32,
    /// Link to another section
    pub sh_link: u32,
    /// Additional section information
    pub sh_info: u32,
    /// Section alignment
    pub sh_addralign: u32,
    /// Entry size if section holds table
    pub sh_entsize: u32,
}

impl Elf32SectionHeader {
    pub fn parse(bytes: &[u8], offset: usize, order: ByteOrder) -> Option<Self> {
        let mut r = FieldReader::at(bytes, offset, SECTION_HEADER_SIZE, order)?;
        Some(Self {
            sh_name: r.u32(),
            sh_type: r.u32(),
            sh_flags: SectionFlags::from_bits_retain(r.u32()),
            sh_addr: r.u32(),
            sh_offset: r.u32(),
            sh_size: r.u32(),
            sh_link: r.u32(),
            sh_info: r.u32(),
            sh_addralign: r.u32(),
            sh_entsize: r.u32(),
        })
    }

    pub fn is_null(&self) -> bool {
        self.sh_type == SHT_NULL
    }
}

/// ELF32 symbol table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf32Symbol {
    /// Symbol name (string table offset)
    pub st_name: u32,
    /// Symbol value
    pub st_value: u32,
    /// Symbol size
    pub st_size: u32,
    /// Type (low nibble) and binding (high nibble)
    pub st_info: u8,
    /// Visibility
    pub st_other: u8,
    /// Owning section index
    pub st_shndx: u16,
}

impl Elf32Symbol {
    pub fn parse(bytes: &[u8], offset: usize, order: ByteOrder) -> Option<Self> {
        let mut r = FieldReader::at(bytes, offset, SYMBOL_SIZE, order)?;
        Some(Self {
            st_name: r.u32(),
            st_value: r.u32(),
            st_size: r.u32(),
            st_info: r.u8(),
            st_other: r.u8(),
            st_shndx: r.u16(),
        })
    }

    /// Symbol type (`STT_*`).
    pub fn symbol_type(&self) -> u8 {
        self.st_info & 0xF
    }

    /// Symbol binding (`STB_*`).
    pub fn binding(&self) -> u8 {
        self.st_info >> 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::ElfBuilder;

    #[test]
    fn test_big_endian_header_fields() {
        let image = ElfBuilder::new(ByteOrder::Big)
            .entry(0x8000_3100)
            .machine(EM_PPC)
            .build();

        // e_entry as stored on disk, most significant byte first
        assert_eq!(&image[24..28], &[0x80, 0x00, 0x31, 0x00]);

        let (header, order) = Elf32Header::parse(&image).unwrap();
        assert_eq!(order, ByteOrder::Big);
        assert_eq!(header.e_entry, 0x8000_3100);
        assert_eq!(header.e_machine, EM_PPC);
        assert_eq!(header.e_type, ET_EXEC);
        assert_eq!(header.e_ehsize, HEADER_SIZE as u16);
    }

    #[test]
    fn test_little_endian_header_matches_big_endian() {
        let big = ElfBuilder::new(ByteOrder::Big).entry(0x8000_3100).build();
        let little = ElfBuilder::new(ByteOrder::Little).entry(0x8000_3100).build();

        assert_eq!(&little[24..28], &[0x00, 0x31, 0x00, 0x80]);

        let (big_header, _) = Elf32Header::parse(&big).unwrap();
        let (little_header, order) = Elf32Header::parse(&little).unwrap();
        assert_eq!(order, ByteOrder::Little);
        assert_eq!(big_header.e_entry, little_header.e_entry);
        assert_eq!(big_header.e_type, little_header.e_type);
    }

    #[test]
    fn test_header_too_small() {
        let image = [0x7F, b'E', b'L', b'F'];
        assert_eq!(
            Elf32Header::parse(&image),
            Err(ElfError::MalformedHeader(HeaderDefect::TooSmall))
        );
    }

    #[test]
    fn test_header_defects() {
        let mut image = ElfBuilder::new(ByteOrder::Big).build();
        image[0] = 0x00;
        assert_eq!(
            Elf32Header::parse(&image),
            Err(ElfError::MalformedHeader(HeaderDefect::InvalidMagic))
        );

        let mut image = ElfBuilder::new(ByteOrder::Big).build();
        image[EI_CLASS] = 2; // ELFCLASS64
        assert_eq!(
            Elf32Header::parse(&image),
            Err(ElfError::MalformedHeader(HeaderDefect::InvalidClass))
        );

        let mut image = ElfBuilder::new(ByteOrder::Big).build();
        image[EI_DATA] = 0;
        assert_eq!(
            Elf32Header::parse(&image),
            Err(ElfError::MalformedHeader(HeaderDefect::InvalidEncoding))
        );
    }

    #[test]
    fn test_program_header_parse() {
        let mut record = [0u8; PROGRAM_HEADER_SIZE];
        record[0..4].copy_from_slice(&PT_LOAD.to_be_bytes());
        record[4..8].copy_from_slice(&0x100u32.to_be_bytes());
        record[8..12].copy_from_slice(&0x8000_4000u32.to_be_bytes());
        record[16..20].copy_from_slice(&16u32.to_be_bytes());
        record[20..24].copy_from_slice(&32u32.to_be_bytes());
        record[24..28].copy_from_slice(&5u32.to_be_bytes()); // R | X

        let ph = Elf32ProgramHeader::parse(&record, 0, ByteOrder::Big).unwrap();
        assert!(ph.is_load());
        assert!(ph.is_executable());
        assert!(ph.p_flags.contains(SegmentFlags::READ));
        assert!(!ph.p_flags.contains(SegmentFlags::WRITE));
        assert_eq!(ph.p_vaddr, 0x8000_4000);
        assert_eq!(ph.file_range(0x110), Some(0x100..0x110));
        assert_eq!(ph.file_range(0x10F), None);

        // Truncated record
        assert!(Elf32ProgramHeader::parse(&record[..31], 0, ByteOrder::Big).is_none());
    }

    #[test]
    fn test_symbol_info_nibbles() {
        let mut record = [0u8; SYMBOL_SIZE];
        record[12] = (1 << 4) | STT_FUNC; // STB_GLOBAL, STT_FUNC
        record[14..16].copy_from_slice(&3u16.to_le_bytes());

        let sym = Elf32Symbol::parse(&record, 0, ByteOrder::Little).unwrap();
        assert_eq!(sym.symbol_type(), STT_FUNC);
        assert_eq!(sym.binding(), 1);
        assert_eq!(sym.st_shndx, 3);
    }

    #[test]
    fn test_image_order_word_compare() {
        let word = [0x7C, 0x13, 0xFB, 0xA6];
        let raw = u32::from_ne_bytes(word);
        assert_eq!(ByteOrder::Big.to_image_order(0x7C13_FBA6), raw);

        let reversed = [0xA6, 0xFB, 0x13, 0x7C];
        let raw = u32::from_ne_bytes(reversed);
        assert_eq!(ByteOrder::Little.to_image_order(0x7C13_FBA6), raw);
    }
}
