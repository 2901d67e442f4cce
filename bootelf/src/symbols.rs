//! Symbol Table Extraction
//!
//! Walks `.symtab`, keeps sized data objects and functions, and hands them
//! to a [`SymbolSink`].
//!
//! # Relocatable images
//!
//! Symbol values of a relocatable image are rebased by the load address of
//! their owning section. Those addresses only exist once something has
//! placed the sections, and [`ElfReader::load_segments`] refuses relocatable
//! images, so [`ElfReader::extract_symbols`] rebases against an empty table
//! (a no-op). Hosts that lay sections out themselves pass their table to
//! [`ElfReader::extract_symbols_rebased`].

use alloc::string::String;
use hashbrown::HashMap;

use crate::elf::{Elf32Symbol, STT_FUNC, STT_OBJECT, SYMBOL_SIZE};
use crate::reader::ElfReader;
use crate::sections::bytes_at;

/// Kind of symbol forwarded to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// `STT_OBJECT`
    Data,
    /// `STT_FUNC`
    Function,
}

impl SymbolKind {
    /// Classify an `st_info` byte; anything but object/function is `None`.
    pub fn from_info(st_info: u8) -> Option<Self> {
        match st_info & 0xF {
            STT_OBJECT => Some(SymbolKind::Data),
            STT_FUNC => Some(SymbolKind::Function),
            _ => None,
        }
    }
}

/// Consumer of extracted symbols.
pub trait SymbolSink {
    /// Record one symbol.
    fn add_symbol(&mut self, address: u32, size: u32, name: &str, kind: SymbolKind);

    /// Called once after the last symbol of an extraction pass.
    fn finalize(&mut self);
}

/// Load address of each section of a relocatable image, by section index.
pub type SectionBases = HashMap<u16, u32>;

impl<'a> ElfReader<'a> {
    /// Forward every sized data/function symbol to `sink`, then finalize it.
    ///
    /// Returns whether at least one symbol was emitted. A missing symbol
    /// table is not an error.
    pub fn extract_symbols<S: SymbolSink + ?Sized>(&self, sink: &mut S) -> bool {
        self.extract_symbols_rebased(sink, &SectionBases::new())
    }

    /// Like [`extract_symbols`](Self::extract_symbols), but relocatable
    /// images add `bases[st_shndx]` (zero when absent) to each value.
    pub fn extract_symbols_rebased<S: SymbolSink + ?Sized>(
        &self,
        sink: &mut S,
        bases: &SectionBases,
    ) -> bool {
        let emitted = self.emit_symbols(sink, bases);
        sink.finalize();
        emitted
    }

    fn emit_symbols<S: SymbolSink + ?Sized>(&self, sink: &mut S, bases: &SectionBases) -> bool {
        let Some(symtab_index) = self.section_by_name(self.config.symbol_table_name, 0) else {
            log::debug!("No {} section", self.config.symbol_table_name);
            return false;
        };
        let Some(symtab) = self.section_data(symtab_index) else {
            log::warn!("Symbol table section {} is unreadable", symtab_index);
            return false;
        };

        let string_index = self.section(symtab_index).map_or(0, |s| s.sh_link as usize);
        let strings = self.section_data(string_index);
        if strings.is_none() {
            log::warn!("Symbol string table {} is unreadable", string_index);
        }

        let count = symtab.len() / SYMBOL_SIZE;
        let mut emitted = false;

        for i in 0..count {
            let Some(sym) = Elf32Symbol::parse(symtab, i * SYMBOL_SIZE, self.byte_order()) else {
                break;
            };

            if sym.st_size == 0 {
                continue;
            }
            let Some(kind) = SymbolKind::from_info(sym.st_info) else {
                continue;
            };

            let Some(raw_name) = strings.and_then(|table| bytes_at(table, sym.st_name as usize))
            else {
                log::warn!("Symbol {} has an unresolvable name, skipped", i);
                continue;
            };

            let address = if self.is_relocatable() {
                let base = bases.get(&sym.st_shndx).copied().unwrap_or(0);
                sym.st_value.wrapping_add(base)
            } else {
                sym.st_value
            };

            let name = String::from_utf8_lossy(raw_name);
            sink.add_symbol(address, sym.st_size, &name, kind);
            emitted = true;
        }

        log::info!("Symbol table {}: {} entries scanned", symtab_index, count);
        emitted
    }
}
