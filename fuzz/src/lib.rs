//! bootelf Fuzzing Infrastructure
//!
//! Mutation fuzzing for the ELF32 reader. Targets check loader invariants
//! on every input and report violations as crashes.

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod elf;
pub mod harness;

use alloc::string::String;
use alloc::vec::Vec;

/// Fuzzing target trait
pub trait FuzzTarget {
    /// Name of the fuzz target
    fn name(&self) -> &str;

    /// Run fuzzing iteration with input
    fn fuzz(&mut self, input: &[u8]) -> FuzzResult;

    /// Reset state between iterations
    fn reset(&mut self);
}

/// Result of a fuzz iteration
#[derive(Debug, Clone)]
pub enum FuzzResult {
    /// Input processed successfully
    Ok,
    /// Parsing error (expected for malformed input)
    ParseError(String),
    /// Crash detected
    Crash(CrashInfo),
    /// Interesting input found
    Interesting(String),
}

impl FuzzResult {
    /// Check if this is a crash
    pub fn is_crash(&self) -> bool {
        matches!(self, FuzzResult::Crash(_))
    }

    /// Check if this is interesting
    pub fn is_interesting(&self) -> bool {
        matches!(self, FuzzResult::Interesting(_) | FuzzResult::Crash(_))
    }
}

/// Crash information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashInfo {
    /// Crash type
    pub crash_type: CrashType,
    /// What went wrong
    pub message: String,
}

/// Type of crash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashType {
    /// A loader guarantee did not hold for this input
    InvariantViolation,
    /// Memory image written outside the declared segments
    StrayWrite,
}

/// Fuzzer configuration
#[derive(Debug, Clone)]
pub struct FuzzerConfig {
    /// Maximum input size
    pub max_input_size: usize,
    /// Seed for the mutator
    pub seed: u64,
    /// Maximum corpus entries kept
    pub max_corpus: usize,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            max_input_size: 64 * 1024,
            seed: 12345,
            max_corpus: 1024,
        }
    }
}

/// Fuzzing statistics
#[derive(Debug, Clone, Default)]
pub struct FuzzStats {
    /// Total iterations
    pub iterations: u64,
    /// Inputs rejected by the parser
    pub parse_errors: u64,
    /// Crashes found
    pub crashes: u64,
    /// Unique crashes
    pub unique_crashes: u64,
    /// Corpus size
    pub corpus_size: usize,
}

/// Mutator for input generation
pub struct Mutator {
    /// Current seed
    seed: u64,
    /// Dictionary of interesting values
    dictionary: Vec<Vec<u8>>,
}

impl Mutator {
    /// Create a new mutator
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            dictionary: Vec::new(),
        }
    }

    /// Add dictionary entry
    pub fn add_dictionary(&mut self, entry: Vec<u8>) {
        self.dictionary.push(entry);
    }

    /// Next pseudo-random value
    pub fn random(&mut self) -> u64 {
        self.seed = self.seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.seed >> 16
    }

    /// Mutate input
    pub fn mutate(&mut self, input: &mut Vec<u8>) {
        match self.random() % 8 {
            0 => self.bit_flip(input),
            1 => self.byte_replace(input),
            2 => self.byte_delete(input),
            3 => self.truncate(input),
            4 => self.interesting_word(input),
            5 => self.dictionary_insert(input),
            6 => self.havoc(input),
            _ => self.random_bytes(input),
        }
    }

    fn position(&mut self, input: &[u8]) -> Option<usize> {
        if input.is_empty() {
            None
        } else {
            Some((self.random() as usize) % input.len())
        }
    }

    fn bit_flip(&mut self, input: &mut Vec<u8>) {
        if let Some(pos) = self.position(input) {
            let bit = (self.random() % 8) as u8;
            input[pos] ^= 1 << bit;
        }
    }

    fn byte_replace(&mut self, input: &mut Vec<u8>) {
        if let Some(pos) = self.position(input) {
            input[pos] = (self.random() & 0xFF) as u8;
        }
    }

    fn byte_delete(&mut self, input: &mut Vec<u8>) {
        if let Some(pos) = self.position(input) {
            input.remove(pos);
        }
    }

    fn truncate(&mut self, input: &mut Vec<u8>) {
        if let Some(pos) = self.position(input) {
            input.truncate(pos);
        }
    }

    /// Overwrite an aligned 32-bit field with a boundary value; most
    /// header fields are words, so this hits offsets and sizes directly.
    fn interesting_word(&mut self, input: &mut Vec<u8>) {
        const INTERESTING: &[u32] = &[0, 1, 0x7F, 0x80, 0xFFFF, 0x8000_0000, 0xFFFF_FFF0, u32::MAX];
        if input.len() < 4 {
            return;
        }
        let pos = ((self.random() as usize) % (input.len() - 3)) & !3;
        let value = INTERESTING[(self.random() as usize) % INTERESTING.len()];
        input[pos..pos + 4].copy_from_slice(&value.to_be_bytes());
    }

    fn dictionary_insert(&mut self, input: &mut Vec<u8>) {
        if self.dictionary.is_empty() {
            return;
        }
        let dict_idx = (self.random() as usize) % self.dictionary.len();
        let pos = self.position(input).unwrap_or(0);
        for (i, &byte) in self.dictionary[dict_idx].iter().enumerate() {
            if pos + i < input.len() {
                input[pos + i] = byte;
            } else {
                input.push(byte);
            }
        }
    }

    fn havoc(&mut self, input: &mut Vec<u8>) {
        let iterations = (self.random() % 16) + 1;
        for _ in 0..iterations {
            match self.random() % 4 {
                0 => self.bit_flip(input),
                1 => self.byte_replace(input),
                2 => self.interesting_word(input),
                _ => self.dictionary_insert(input),
            }
        }
    }

    fn random_bytes(&mut self, input: &mut Vec<u8>) {
        let count = ((self.random() % 8) + 1) as usize;
        for _ in 0..count {
            let byte = (self.random() & 0xFF) as u8;
            input.push(byte);
        }
    }
}

/// Corpus manager
pub struct Corpus {
    /// Input entries
    entries: Vec<Vec<u8>>,
    /// Maximum size
    max_size: usize,
}

impl Corpus {
    /// Create new corpus
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_size,
        }
    }

    /// Add entry; the oldest non-seed entries are dropped once full
    pub fn add(&mut self, data: Vec<u8>) {
        if self.entries.len() >= self.max_size && self.entries.len() > 1 {
            self.entries.remove(1);
        }
        self.entries.push(data);
    }

    /// Pick an entry
    pub fn pick(&self, seed: u64) -> Option<&Vec<u8>> {
        if self.entries.is_empty() {
            return None;
        }
        Some(&self.entries[(seed as usize) % self.entries.len()])
    }

    /// Get corpus size
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
