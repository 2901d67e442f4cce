//! bootelf - ELF32 boot-image loader
//!
//! Loads homebrew and developer-built PowerPC executables into a console's
//! address space before execution begins.
//!
//! # Features
//!
//! - ELF32 header validation, either byte order, normalized once up front
//! - `PT_LOAD` segment copy with BSS zero-fill into a [`MemoryImage`]
//! - Section lookup by name through the section-header string table
//! - Symbol extraction into any [`SymbolSink`] (see [`SymbolMap`])
//! - Console variant detection from code contents
//!
//! Relocatable images are recognized but never loaded.
//!
//! # Example
//!
//! ```ignore
//! let reader = ElfReader::new(&image)?;
//! reader.load_segments(&mut ram, false)?;
//! let mut symbols = SymbolMap::new();
//! reader.extract_symbols(&mut symbols);
//! let platform = reader.platform();
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod elf;
pub mod error;
pub mod platform;
pub mod reader;
pub mod sections;
pub mod segment_loader;
pub mod symbol_map;
pub mod symbols;

#[cfg(test)]
mod fixture;

pub use config::LoaderConfig;
pub use elf::{
    ByteOrder, Elf32Header, Elf32ProgramHeader, Elf32SectionHeader, Elf32Symbol, SectionFlags,
    SegmentFlags,
};
pub use error::{ElfError, ElfResult, HeaderDefect, HeaderTable};
pub use platform::{InstructionPattern, Platform};
pub use reader::ElfReader;
pub use segment_loader::MemoryImage;
pub use symbol_map::{Symbol, SymbolMap};
pub use symbols::{SectionBases, SymbolKind, SymbolSink};
