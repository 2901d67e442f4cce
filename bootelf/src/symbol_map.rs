//! In-memory symbol database
//!
//! A [`SymbolSink`] for hosts without a symbol database of their own.
//! Symbols accumulate unsorted; [`SymbolSink::finalize`] sorts them by
//! address and rebuilds the name index. Lookups see the state as of the
//! last finalize.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::symbols::{SymbolKind, SymbolSink};

/// One extracted symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub address: u32,
    pub size: u32,
    pub name: String,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn contains(&self, address: u32) -> bool {
        address >= self.address && (address - self.address) < self.size
    }
}

/// Address-ordered symbol table with a name index.
#[derive(Debug, Default, Clone)]
pub struct SymbolMap {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
    sorted: bool,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.by_name.clear();
        self.sorted = true;
    }

    /// Symbols in address order (insertion order until finalized).
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Symbol starting exactly at `address`.
    pub fn get(&self, address: u32) -> Option<&Symbol> {
        if !self.sorted {
            return self.symbols.iter().find(|s| s.address == address);
        }
        self.symbols
            .binary_search_by_key(&address, |s| s.address)
            .ok()
            .map(|i| &self.symbols[i])
    }

    /// Symbol whose `[address, address + size)` range covers `address`.
    /// With nested symbols, the one starting closest below `address` wins.
    pub fn symbol_containing(&self, address: u32) -> Option<&Symbol> {
        if !self.sorted {
            return self
                .symbols
                .iter()
                .filter(|s| s.contains(address))
                .max_by_key(|s| s.address);
        }
        let after = self.symbols.partition_point(|s| s.address <= address);
        self.symbols[..after].iter().rev().find(|s| s.contains(address))
    }

    /// Start address of the symbol called `name`.
    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).map(|&i| self.symbols[i].address)
    }

    fn reindex(&mut self) {
        // Later definitions at the same address replace earlier ones
        self.symbols.sort_by_key(|s| s.address);
        let mut deduped: Vec<Symbol> = Vec::with_capacity(self.symbols.len());
        for sym in self.symbols.drain(..) {
            match deduped.last_mut() {
                Some(last) if last.address == sym.address => *last = sym,
                _ => deduped.push(sym),
            }
        }
        self.symbols = deduped;

        self.by_name.clear();
        for (i, sym) in self.symbols.iter().enumerate() {
            self.by_name.insert(sym.name.clone(), i);
        }
        self.sorted = true;
    }
}

impl SymbolSink for SymbolMap {
    fn add_symbol(&mut self, address: u32, size: u32, name: &str, kind: SymbolKind) {
        self.symbols.push(Symbol {
            address,
            size,
            name: String::from(name),
            kind,
        });
        self.sorted = false;
    }

    fn finalize(&mut self) {
        self.reindex();
        log::debug!("Symbol map indexed: {} symbols", self.symbols.len());
    }
}
