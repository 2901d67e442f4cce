//! ELF32 Reader Fuzzing
//!
//! Drives every public reader operation on each input and checks the
//! guarantees the loader makes about untrusted images:
//!
//! - a failed or refused load performs no writes
//! - a successful load writes only the declared `PT_LOAD` file bytes and
//!   BSS ranges
//! - symbol sinks never see zero-sized symbols and are finalized once

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use bootelf::{ElfError, ElfReader, MemoryImage, SymbolKind, SymbolSink};

use crate::{CrashInfo, CrashType, FuzzResult, FuzzTarget};

/// Memory image that only records what it was asked to do.
#[derive(Default)]
struct RecordingMemory {
    copies: Vec<(u32, usize)>,
    fills: Vec<(u32, u32)>,
}

impl MemoryImage for RecordingMemory {
    fn copy_bytes_in(&mut self, address: u32, bytes: &[u8]) {
        self.copies.push((address, bytes.len()));
    }

    fn zero_fill(&mut self, address: u32, length: u32) {
        self.fills.push((address, length));
    }
}

#[derive(Default)]
struct CheckingSink {
    symbols: usize,
    zero_sized: usize,
    finalized: usize,
}

impl SymbolSink for CheckingSink {
    fn add_symbol(&mut self, _address: u32, size: u32, _name: &str, _kind: SymbolKind) {
        self.symbols += 1;
        if size == 0 {
            self.zero_sized += 1;
        }
    }

    fn finalize(&mut self) {
        self.finalized += 1;
    }
}

/// ELF reader fuzzer
pub struct ElfReaderFuzzer {
    /// Maximum image size
    max_size: usize,
}

impl ElfReaderFuzzer {
    /// Create new ELF reader fuzzer
    pub fn new() -> Self {
        Self {
            max_size: 256 * 1024,
        }
    }

    /// Set maximum size
    pub fn max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    fn violation(crash_type: CrashType, message: String) -> FuzzResult {
        FuzzResult::Crash(CrashInfo { crash_type, message })
    }

    fn check_load(reader: &ElfReader<'_>) -> Result<bool, FuzzResult> {
        let mut memory = RecordingMemory::default();
        let result = reader.load_segments(&mut memory, false);
        let writes = memory.copies.len() + memory.fills.len();

        match result {
            Err(err) => {
                if writes != 0 {
                    return Err(Self::violation(
                        CrashType::StrayWrite,
                        format!("{} writes before failing with {}", writes, err),
                    ));
                }
                if reader.is_relocatable() && err != ElfError::RelocationUnsupported {
                    return Err(Self::violation(
                        CrashType::InvariantViolation,
                        format!("relocatable image failed with {}", err),
                    ));
                }
                Ok(false)
            }
            Ok(()) => {
                if reader.is_relocatable() {
                    return Err(Self::violation(
                        CrashType::InvariantViolation,
                        String::from("relocatable image loaded"),
                    ));
                }

                let mut expected_copies = Vec::new();
                let mut expected_fills = Vec::new();
                for ph in reader.segments().iter().filter(|ph| ph.is_load()) {
                    expected_copies.push((ph.p_vaddr, ph.p_filesz as usize));
                    if ph.p_memsz > ph.p_filesz {
                        expected_fills.push((ph.p_vaddr + ph.p_filesz, ph.p_memsz - ph.p_filesz));
                    }
                }

                if memory.copies != expected_copies || memory.fills != expected_fills {
                    return Err(Self::violation(
                        CrashType::StrayWrite,
                        format!(
                            "writes {:?}/{:?} do not match segments",
                            memory.copies, memory.fills
                        ),
                    ));
                }
                Ok(true)
            }
        }
    }

    fn check_symbols(reader: &ElfReader<'_>) -> Result<bool, FuzzResult> {
        let mut sink = CheckingSink::default();
        let emitted = reader.extract_symbols(&mut sink);

        if sink.zero_sized != 0 {
            return Err(Self::violation(
                CrashType::InvariantViolation,
                format!("{} zero-sized symbols emitted", sink.zero_sized),
            ));
        }
        if sink.finalized != 1 {
            return Err(Self::violation(
                CrashType::InvariantViolation,
                format!("sink finalized {} times", sink.finalized),
            ));
        }
        if emitted != (sink.symbols > 0) {
            return Err(Self::violation(
                CrashType::InvariantViolation,
                String::from("return value disagrees with emitted symbols"),
            ));
        }
        Ok(emitted)
    }

    fn check_sections(reader: &ElfReader<'_>) -> Result<(), FuzzResult> {
        for index in 0..reader.section_count() {
            let Some(name) = reader.section_name(index) else {
                continue;
            };
            match reader.section_by_name(name, 0) {
                Some(found) if found <= index && reader.section_name(found) == Some(name) => {}
                other => {
                    return Err(Self::violation(
                        CrashType::InvariantViolation,
                        format!("section {} ({:?}) resolved to {:?}", index, name, other),
                    ))
                }
            }
        }
        Ok(())
    }
}

impl Default for ElfReaderFuzzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzTarget for ElfReaderFuzzer {
    fn name(&self) -> &str {
        "elf-reader"
    }

    fn fuzz(&mut self, input: &[u8]) -> FuzzResult {
        if input.len() > self.max_size {
            return FuzzResult::ParseError(String::from("too large"));
        }

        let reader = match ElfReader::new(input) {
            Ok(reader) => reader,
            Err(err) => return FuzzResult::ParseError(format!("{}", err)),
        };

        let loaded = match Self::check_load(&reader) {
            Ok(loaded) => loaded,
            Err(crash) => return crash,
        };
        let has_symbols = match Self::check_symbols(&reader) {
            Ok(emitted) => emitted,
            Err(crash) => return crash,
        };
        if let Err(crash) = Self::check_sections(&reader) {
            return crash;
        }
        let platform = reader.platform();

        if loaded || has_symbols {
            FuzzResult::Interesting(format!(
                "loaded={} symbols={} platform={:?}",
                loaded, has_symbols, platform
            ))
        } else {
            FuzzResult::Ok
        }
    }

    fn reset(&mut self) {}
}

/// Tokens worth splicing into ELF inputs.
pub fn elf_dictionary() -> Vec<Vec<u8>> {
    vec![
        vec![0x7F, b'E', b'L', b'F', 1, 2, 1],
        1u32.to_be_bytes().to_vec(),        // PT_LOAD
        2u16.to_be_bytes().to_vec(),        // ET_EXEC
        0x7C13_FBA6u32.to_be_bytes().to_vec(), // mfspr HID4
        b".symtab\0".to_vec(),
        b".strtab\0".to_vec(),
        b".shstrtab\0".to_vec(),
    ]
}

fn put_u16(out: &mut [u8], offset: usize, value: u16) {
    out[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut [u8], offset: usize, value: u32) {
    out[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// A small big-endian PowerPC executable: one code segment with a BSS
/// tail, and a symbol table naming one function.
///
/// ```text
///   0x000  ELF header
///   0x034  program header (PT_LOAD, R+X)
///   0x054  code (16 bytes)
///   0x064  .strtab  "\0main\0"
///   0x06C  .symtab  null + main
///   0x08C  .shstrtab
///   0x0B0  section headers (null, .strtab, .symtab, .shstrtab)
/// ```
pub fn seed_image() -> Vec<u8> {
    const SHOFF: usize = 0xB0;
    let mut image = vec![0u8; SHOFF + 4 * 40];

    image[..7].copy_from_slice(&[0x7F, b'E', b'L', b'F', 1, 2, 1]);
    put_u16(&mut image, 16, 2); // ET_EXEC
    put_u16(&mut image, 18, 20); // EM_PPC
    put_u32(&mut image, 20, 1);
    put_u32(&mut image, 24, 0x8000_3100);
    put_u32(&mut image, 28, 0x34);
    put_u32(&mut image, 32, SHOFF as u32);
    put_u16(&mut image, 40, 52);
    put_u16(&mut image, 42, 32);
    put_u16(&mut image, 44, 1);
    put_u16(&mut image, 46, 40);
    put_u16(&mut image, 48, 4);
    put_u16(&mut image, 50, 3);

    // PT_LOAD: offset 0x54, vaddr 0x80003100, filesz 16, memsz 0x40, R+X
    for (i, value) in [1u32, 0x54, 0x8000_3100, 0x8000_3100, 16, 0x40, 5, 4]
        .into_iter()
        .enumerate()
    {
        put_u32(&mut image, 0x34 + i * 4, value);
    }

    for (i, word) in [0x9421_FFF0u32, 0x7C73_FBA6, 0x6000_0000, 0x4E80_0020]
        .into_iter()
        .enumerate()
    {
        put_u32(&mut image, 0x54 + i * 4, word);
    }

    image[0x64..0x6A].copy_from_slice(b"\0main\0");

    // main: name 1, value 0x80003100, size 16, STB_GLOBAL|STT_FUNC, shndx 1
    put_u32(&mut image, 0x7C, 1);
    put_u32(&mut image, 0x80, 0x8000_3100);
    put_u32(&mut image, 0x84, 16);
    image[0x88] = 0x12;
    put_u16(&mut image, 0x8A, 1);

    let names = b"\0.strtab\0.symtab\0.shstrtab\0";
    image[0x8C..0x8C + names.len()].copy_from_slice(names);

    // name, type, offset, size, link, entsize
    let sections = [
        (1u32, 3u32, 0x64u32, 6u32, 0u32, 0u32),
        (9, 2, 0x6C, 32, 1, 16),
        (17, 3, 0x8C, names.len() as u32, 0, 0),
    ];
    for (i, (name, sh_type, offset, size, link, entsize)) in sections.into_iter().enumerate() {
        let sh = SHOFF + (i + 1) * 40;
        put_u32(&mut image, sh, name);
        put_u32(&mut image, sh + 4, sh_type);
        put_u32(&mut image, sh + 16, offset);
        put_u32(&mut image, sh + 20, size);
        put_u32(&mut image, sh + 24, link);
        put_u32(&mut image, sh + 36, entsize);
    }

    image
}
