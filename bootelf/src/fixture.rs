//! ELF32 image builder for tests.
//!
//! Layout: file header, program headers, segment data, section data,
//! `.strtab`/`.symtab` (when symbols were added), `.shstrtab`, then the
//! section header table. Section 0 is the null section and `.shstrtab` is
//! always last.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::elf::{
    ByteOrder, SegmentFlags, ELFCLASS32, ELFDATA2LSB, ELFDATA2MSB, ELF_MAGIC, EM_PPC, ET_EXEC,
    HEADER_SIZE, PROGRAM_HEADER_SIZE, PT_LOAD, SECTION_HEADER_SIZE, SHT_NOBITS, SHT_STRTAB,
    SHT_SYMTAB, SYMBOL_SIZE,
};

struct SegmentSpec {
    p_type: u32,
    vaddr: u32,
    data: Vec<u8>,
    memsz: u32,
    flags: SegmentFlags,
}

#[derive(Clone)]
struct SectionSpec {
    name: String,
    sh_type: u32,
    addr: u32,
    data: Vec<u8>,
    size: u32,
    link: u32,
    entsize: u32,
}

struct SymbolSpec {
    name: String,
    value: u32,
    size: u32,
    info: u8,
    shndx: u16,
}

pub(crate) struct ElfBuilder {
    order: ByteOrder,
    e_type: u16,
    machine: u16,
    entry: u32,
    segments: Vec<SegmentSpec>,
    sections: Vec<SectionSpec>,
    symbols: Vec<SymbolSpec>,
}

impl ElfBuilder {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            e_type: ET_EXEC,
            machine: EM_PPC,
            entry: 0x8000_3100,
            segments: Vec::new(),
            sections: Vec::new(),
            symbols: Vec::new(),
        }
    }

    pub fn elf_type(mut self, e_type: u16) -> Self {
        self.e_type = e_type;
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn entry(mut self, entry: u32) -> Self {
        self.entry = entry;
        self
    }

    pub fn segment(
        mut self,
        p_type: u32,
        vaddr: u32,
        data: &[u8],
        memsz: u32,
        flags: SegmentFlags,
    ) -> Self {
        self.segments.push(SegmentSpec {
            p_type,
            vaddr,
            data: data.to_vec(),
            memsz,
            flags,
        });
        self
    }

    pub fn load(self, vaddr: u32, data: &[u8], memsz: u32, flags: SegmentFlags) -> Self {
        self.segment(PT_LOAD, vaddr, data, memsz, flags)
    }

    /// Add a section; user sections get indices 1, 2, ... in call order.
    pub fn section(mut self, name: &str, sh_type: u32, addr: u32, data: &[u8]) -> Self {
        self.sections.push(SectionSpec {
            name: String::from(name),
            sh_type,
            addr,
            data: data.to_vec(),
            size: data.len() as u32,
            link: 0,
            entsize: 0,
        });
        self
    }

    pub fn section_nobits(mut self, name: &str, addr: u32, size: u32) -> Self {
        self.sections.push(SectionSpec {
            name: String::from(name),
            sh_type: SHT_NOBITS,
            addr,
            data: Vec::new(),
            size,
            link: 0,
            entsize: 0,
        });
        self
    }

    /// Add a symbol. The first call also makes the builder emit `.strtab`
    /// and `.symtab` (with the mandatory null symbol at index 0).
    pub fn symbol(mut self, name: &str, value: u32, size: u32, info: u8, shndx: u16) -> Self {
        self.symbols.push(SymbolSpec {
            name: String::from(name),
            value,
            size,
            info,
            shndx,
        });
        self
    }

    fn put_u16(&self, out: &mut [u8], offset: usize, value: u16) {
        let raw = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        out[offset..offset + 2].copy_from_slice(&raw);
    }

    fn put_u32(&self, out: &mut [u8], offset: usize, value: u32) {
        let raw = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        out[offset..offset + 4].copy_from_slice(&raw);
    }

    fn symbol_sections(&self) -> Vec<SectionSpec> {
        if self.symbols.is_empty() {
            return Vec::new();
        }

        let mut strtab = vec![0u8];
        let mut symtab = vec![0u8; SYMBOL_SIZE];
        for sym in &self.symbols {
            let name_offset = strtab.len() as u32;
            strtab.extend_from_slice(sym.name.as_bytes());
            strtab.push(0);

            let mut record = [0u8; SYMBOL_SIZE];
            self.put_u32(&mut record, 0, name_offset);
            self.put_u32(&mut record, 4, sym.value);
            self.put_u32(&mut record, 8, sym.size);
            record[12] = sym.info;
            self.put_u16(&mut record, 14, sym.shndx);
            symtab.extend_from_slice(&record);
        }

        // .strtab lands right after the user sections, .symtab after it
        let strtab_index = self.sections.len() as u32 + 1;
        vec![
            SectionSpec {
                name: String::from(".strtab"),
                sh_type: SHT_STRTAB,
                addr: 0,
                size: strtab.len() as u32,
                data: strtab,
                link: 0,
                entsize: 0,
            },
            SectionSpec {
                name: String::from(".symtab"),
                sh_type: SHT_SYMTAB,
                addr: 0,
                size: symtab.len() as u32,
                data: symtab,
                link: strtab_index,
                entsize: SYMBOL_SIZE as u32,
            },
        ]
    }

    pub fn build(self) -> Vec<u8> {
        let mut sections = self.sections.clone();
        sections.extend(self.symbol_sections());

        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for name in sections.iter().map(|s| s.name.as_str()).chain([".shstrtab"]) {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = name_offsets.pop().unwrap_or(0);
        sections.push(SectionSpec {
            name: String::from(".shstrtab"),
            sh_type: SHT_STRTAB,
            addr: 0,
            size: shstrtab.len() as u32,
            data: shstrtab,
            link: 0,
            entsize: 0,
        });
        name_offsets.push(shstrtab_name);

        let phoff = HEADER_SIZE;
        let mut cursor = phoff + self.segments.len() * PROGRAM_HEADER_SIZE;

        let mut segment_offsets = Vec::new();
        for seg in &self.segments {
            segment_offsets.push(cursor);
            cursor += seg.data.len();
        }

        let mut section_offsets = Vec::new();
        for sec in &sections {
            section_offsets.push(cursor);
            cursor += sec.data.len();
        }

        let shoff = (cursor + 3) & !3;
        let shnum = sections.len() + 1;
        let mut out = vec![0u8; shoff + shnum * SECTION_HEADER_SIZE];

        out[..4].copy_from_slice(&ELF_MAGIC);
        out[4] = ELFCLASS32;
        out[5] = match self.order {
            ByteOrder::Little => ELFDATA2LSB,
            ByteOrder::Big => ELFDATA2MSB,
        };
        out[6] = 1;
        self.put_u16(&mut out, 16, self.e_type);
        self.put_u16(&mut out, 18, self.machine);
        self.put_u32(&mut out, 20, 1);
        self.put_u32(&mut out, 24, self.entry);
        self.put_u32(&mut out, 28, if self.segments.is_empty() { 0 } else { phoff as u32 });
        self.put_u32(&mut out, 32, shoff as u32);
        self.put_u16(&mut out, 40, HEADER_SIZE as u16);
        self.put_u16(&mut out, 42, PROGRAM_HEADER_SIZE as u16);
        self.put_u16(&mut out, 44, self.segments.len() as u16);
        self.put_u16(&mut out, 46, SECTION_HEADER_SIZE as u16);
        self.put_u16(&mut out, 48, shnum as u16);
        self.put_u16(&mut out, 50, (shnum - 1) as u16);

        for (i, seg) in self.segments.iter().enumerate() {
            let ph = phoff + i * PROGRAM_HEADER_SIZE;
            let offset = segment_offsets[i];
            self.put_u32(&mut out, ph, seg.p_type);
            self.put_u32(&mut out, ph + 4, offset as u32);
            self.put_u32(&mut out, ph + 8, seg.vaddr);
            self.put_u32(&mut out, ph + 12, seg.vaddr);
            self.put_u32(&mut out, ph + 16, seg.data.len() as u32);
            self.put_u32(&mut out, ph + 20, seg.memsz);
            self.put_u32(&mut out, ph + 24, seg.flags.bits());
            self.put_u32(&mut out, ph + 28, 4);
            out[offset..offset + seg.data.len()].copy_from_slice(&seg.data);
        }

        // Section 0 stays all-zero (SHT_NULL)
        for (i, sec) in sections.iter().enumerate() {
            let sh = shoff + (i + 1) * SECTION_HEADER_SIZE;
            let offset = section_offsets[i];
            self.put_u32(&mut out, sh, name_offsets[i]);
            self.put_u32(&mut out, sh + 4, sec.sh_type);
            self.put_u32(&mut out, sh + 12, sec.addr);
            self.put_u32(&mut out, sh + 16, offset as u32);
            self.put_u32(&mut out, sh + 20, sec.size);
            self.put_u32(&mut out, sh + 24, sec.link);
            self.put_u32(&mut out, sh + 36, sec.entsize);
            out[offset..offset + sec.data.len()].copy_from_slice(&sec.data);
        }

        out
    }
}
