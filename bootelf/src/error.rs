//! ELF Error Types and Result Definitions

use core::fmt;

/// Why an image was rejected as not being an ELF32 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDefect {
    /// Binary too small to contain an ELF32 header
    TooSmall,
    /// Invalid ELF magic number
    InvalidMagic,
    /// Invalid ELF class (not 32-bit)
    InvalidClass,
    /// Data encoding is neither little nor big endian
    InvalidEncoding,
}

/// Header table that failed its bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTable {
    Program,
    Section,
}

/// ELF parsing and loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// Not an ELF32 image
    MalformedHeader(HeaderDefect),
    /// Program or section header table extends beyond the image
    OutOfBoundsTable(HeaderTable),
    /// Image is not `ET_EXEC` and would need relocation to load
    RelocationUnsupported,
    /// Segment file data extends beyond the image
    TruncatedSegment { index: usize },
    /// Segment memory size smaller than its file size
    InvalidMemSize { index: usize },
    /// Segment end wraps the 32-bit address space
    AddressOverflow { index: usize },
}

impl fmt::Display for HeaderDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderDefect::TooSmall => write!(f, "image smaller than an ELF32 header"),
            HeaderDefect::InvalidMagic => write!(f, "invalid ELF magic number"),
            HeaderDefect::InvalidClass => write!(f, "not a 32-bit ELF"),
            HeaderDefect::InvalidEncoding => write!(f, "unknown data encoding"),
        }
    }
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader(defect) => write!(f, "Malformed ELF header: {}", defect),
            Self::OutOfBoundsTable(HeaderTable::Program) => {
                write!(f, "Program header table out of bounds")
            }
            Self::OutOfBoundsTable(HeaderTable::Section) => {
                write!(f, "Section header table out of bounds")
            }
            Self::RelocationUnsupported => write!(f, "Relocatable ELF images cannot be loaded"),
            Self::TruncatedSegment { index } => {
                write!(f, "Segment {} data out of bounds", index)
            }
            Self::InvalidMemSize { index } => {
                write!(f, "Segment {} memory size smaller than file size", index)
            }
            Self::AddressOverflow { index } => {
                write!(f, "Segment {} wraps the address space", index)
            }
        }
    }
}

/// Result type for ELF operations
pub type ElfResult<T> = Result<T, ElfError>;
