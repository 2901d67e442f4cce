//! Fuzzing Harness
//!
//! Main fuzzing harness and orchestration.

use crate::{Corpus, CrashInfo, CrashType, FuzzResult, FuzzStats, FuzzTarget, FuzzerConfig, Mutator};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashSet;

/// Main fuzzer harness
pub struct FuzzHarness {
    /// Configuration
    config: FuzzerConfig,
    /// Fuzz targets
    targets: Vec<Box<dyn FuzzTarget>>,
    /// Mutator
    mutator: Mutator,
    /// Corpus
    corpus: Corpus,
    /// Statistics
    stats: FuzzStats,
    /// Found crashes
    crashes: Vec<CrashEntry>,
    /// Hashes of crashes already recorded
    seen: HashSet<u64>,
}

/// A crash entry
#[derive(Debug, Clone)]
pub struct CrashEntry {
    /// Input that caused crash
    pub input: Vec<u8>,
    /// Crash info
    pub info: CrashInfo,
    /// Target name
    pub target: String,
}

impl FuzzHarness {
    /// Create new harness
    pub fn new(config: FuzzerConfig) -> Self {
        Self {
            mutator: Mutator::new(config.seed),
            corpus: Corpus::new(config.max_corpus),
            config,
            targets: Vec::new(),
            stats: FuzzStats::default(),
            crashes: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add fuzz target
    pub fn add_target(&mut self, target: Box<dyn FuzzTarget>) {
        self.targets.push(target);
    }

    /// Add corpus entry
    pub fn add_corpus(&mut self, data: Vec<u8>) {
        self.corpus.add(data);
        self.stats.corpus_size = self.corpus.len();
    }

    /// Add dictionary entries
    pub fn add_dictionary(&mut self, entries: Vec<Vec<u8>>) {
        for entry in entries {
            self.mutator.add_dictionary(entry);
        }
    }

    /// Run fuzzing loop
    pub fn run(&mut self, iterations: u64) -> FuzzReport {
        for _ in 0..iterations {
            self.fuzz_iteration();
        }

        FuzzReport {
            stats: self.stats.clone(),
            crashes: self.crashes.clone(),
        }
    }

    /// Run single fuzzing iteration
    fn fuzz_iteration(&mut self) {
        self.stats.iterations += 1;

        let pick = self.mutator.random();
        let mut input = self.corpus.pick(pick).cloned().unwrap_or_default();
        self.mutator.mutate(&mut input);
        input.truncate(self.config.max_input_size);

        let mut crash: Option<(CrashInfo, String)> = None;
        let mut parse_error = false;
        let mut interesting = false;

        for target in &mut self.targets {
            match target.fuzz(&input) {
                FuzzResult::Crash(info) => crash = Some((info, String::from(target.name()))),
                FuzzResult::ParseError(_) => parse_error = true,
                FuzzResult::Interesting(_) => interesting = true,
                FuzzResult::Ok => {}
            }
            target.reset();
        }

        if let Some((info, name)) = crash {
            self.handle_crash(&input, info, name);
        }
        if parse_error {
            self.stats.parse_errors += 1;
        }
        if interesting {
            self.add_corpus(input);
        }
    }

    fn handle_crash(&mut self, input: &[u8], info: CrashInfo, target: String) {
        self.stats.crashes += 1;

        if self.seen.insert(Self::hash_crash(&info)) {
            self.stats.unique_crashes += 1;
            self.crashes.push(CrashEntry {
                input: input.to_vec(),
                info,
                target,
            });
        }
    }

    fn hash_crash(info: &CrashInfo) -> u64 {
        // FNV-1a over crash type and message
        let mut hash: u64 = match info.crash_type {
            CrashType::InvariantViolation => 1,
            CrashType::StrayWrite => 2,
        };
        for byte in info.message.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01B3);
        }
        hash
    }

    /// Get current statistics
    pub fn stats(&self) -> &FuzzStats {
        &self.stats
    }

    /// Get found crashes
    pub fn crashes(&self) -> &[CrashEntry] {
        &self.crashes
    }
}

/// Fuzzing report
#[derive(Debug, Clone)]
pub struct FuzzReport {
    /// Statistics
    pub stats: FuzzStats,
    /// Crashes found
    pub crashes: Vec<CrashEntry>,
}

impl FuzzReport {
    /// Format as text
    pub fn format(&self) -> String {
        let mut output = String::new();

        output.push_str("=== Fuzzing Report ===\n\n");
        output.push_str(&format!("  Iterations: {}\n", self.stats.iterations));
        output.push_str(&format!("  Parse errors: {}\n", self.stats.parse_errors));
        output.push_str(&format!(
            "  Crashes: {} ({} unique)\n",
            self.stats.crashes, self.stats.unique_crashes
        ));
        output.push_str(&format!("  Corpus: {}\n", self.stats.corpus_size));

        if !self.crashes.is_empty() {
            output.push_str("\nCrashes:\n");
            for crash in &self.crashes {
                output.push_str(&format!(
                    "  - {:?} in {}: {}\n",
                    crash.info.crash_type, crash.target, crash.info.message
                ));
            }
        }

        output
    }
}

/// Run a quick fuzz test; returns true if any input crashed the target
pub fn quick_fuzz<T: FuzzTarget>(mut target: T, corpus: Vec<Vec<u8>>, iterations: u64) -> bool {
    let mut mutator = Mutator::new(42);
    let mut current_corpus = corpus;

    for _ in 0..iterations {
        let mut input = if current_corpus.is_empty() {
            Vec::new()
        } else {
            current_corpus[mutator.random() as usize % current_corpus.len()].clone()
        };

        mutator.mutate(&mut input);

        let result = target.fuzz(&input);
        target.reset();

        if result.is_crash() {
            return true;
        }
        if result.is_interesting() && current_corpus.len() < 256 {
            current_corpus.push(input);
        }
    }

    false
}
