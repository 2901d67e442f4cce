//! ELF Segment Memory Loader
//!
//! Copies the `PT_LOAD` segments of a parsed image into a caller-owned
//! [`MemoryImage`].
//!
//! # Process
//!
//! 1. Refuse relocatable images before touching memory
//! 2. Validate every eligible segment (file extent, sizes, address range)
//! 3. For each eligible segment:
//!    a. Copy `p_filesz` bytes from the image to `p_vaddr`
//!    b. Zero-fill BSS (`p_memsz > p_filesz` region)
//!
//! Validation runs to completion before the first write, so a failed load
//! leaves the memory image untouched.

use alloc::vec::Vec;

use crate::elf::Elf32ProgramHeader;
use crate::error::{ElfError, ElfResult};
use crate::reader::ElfReader;

/// Target address space the loader writes segments into.
///
/// The loader holds the image by `&mut` for the whole of
/// [`ElfReader::load_segments`], so no other writer can interleave.
pub trait MemoryImage {
    /// Copy `bytes` to the guest at `address`.
    fn copy_bytes_in(&mut self, address: u32, bytes: &[u8]);

    /// Fill `length` guest bytes starting at `address` with zero.
    fn zero_fill(&mut self, address: u32, length: u32);

    /// Whether `address` lies in the primary memory region. Consulted only
    /// when a load is constrained to that region.
    fn is_in_primary_region(&self, address: u32) -> bool {
        let _ = address;
        true
    }
}

/// A validated segment ready to be written.
#[derive(Debug, Clone, Copy)]
struct LoadPlan<'a> {
    vaddr: u32,
    data: &'a [u8],
    bss_len: u32,
}

impl<'a> ElfReader<'a> {
    /// Load every `PT_LOAD` segment into `memory`.
    ///
    /// # Arguments
    ///
    /// * `memory` - Target address space
    /// * `constrain_to_primary_region` - Skip segments whose virtual address
    ///   is outside [`MemoryImage::is_in_primary_region`]
    ///
    /// # Errors
    ///
    /// * `RelocationUnsupported` - Image is not `ET_EXEC`
    /// * `TruncatedSegment` / `InvalidMemSize` / `AddressOverflow` - An
    ///   eligible segment is malformed; nothing has been written
    pub fn load_segments<M: MemoryImage + ?Sized>(
        &self,
        memory: &mut M,
        constrain_to_primary_region: bool,
    ) -> ElfResult<()> {
        log::info!("String section: {}", self.header().e_shstrndx);

        if self.is_relocatable() {
            log::error!("Cannot load a relocatable ELF (type {})", self.header().e_type);
            return Err(ElfError::RelocationUnsupported);
        }

        log::info!("{} segments:", self.segment_count());

        let plans = self.plan_segments(memory, constrain_to_primary_region)?;

        for plan in &plans {
            memory.copy_bytes_in(plan.vaddr, plan.data);
            if plan.bss_len > 0 {
                // vaddr + memsz was checked not to wrap in `plan_segment`
                memory.zero_fill(plan.vaddr + plan.data.len() as u32, plan.bss_len);
            }

            log::info!(
                "Loadable segment copied to {:#010x}, size {:#010x}",
                plan.vaddr,
                plan.data.len() as u32 + plan.bss_len
            );
        }

        log::info!("Done loading.");
        Ok(())
    }

    fn plan_segments<M: MemoryImage + ?Sized>(
        &self,
        memory: &M,
        constrain_to_primary_region: bool,
    ) -> ElfResult<Vec<LoadPlan<'a>>> {
        let mut plans = Vec::new();

        for (index, ph) in self.segments().iter().enumerate() {
            log::debug!(
                "Type: {} Vaddr: {:#010x} Filesz: {} Memsz: {}",
                ph.p_type,
                ph.p_vaddr,
                ph.p_filesz,
                ph.p_memsz
            );

            if !ph.is_load() {
                continue;
            }

            if constrain_to_primary_region && !memory.is_in_primary_region(ph.p_vaddr) {
                log::debug!("Segment {} outside primary region, skipped", index);
                continue;
            }

            plans.push(self.plan_segment(index, ph)?);
        }

        Ok(plans)
    }

    fn plan_segment(&self, index: usize, ph: &Elf32ProgramHeader) -> ElfResult<LoadPlan<'a>> {
        let range = ph
            .file_range(self.bytes().len())
            .ok_or(ElfError::TruncatedSegment { index })?;

        if ph.p_memsz < ph.p_filesz {
            return Err(ElfError::InvalidMemSize { index });
        }

        // The last byte may be 0xFFFF_FFFF, so an end of exactly 2^32 is fine
        if (ph.p_vaddr as u64) + (ph.p_memsz as u64) > (u32::MAX as u64) + 1 {
            return Err(ElfError::AddressOverflow { index });
        }

        let data = self
            .bytes()
            .get(range)
            .ok_or(ElfError::TruncatedSegment { index })?;

        Ok(LoadPlan {
            vaddr: ph.p_vaddr,
            data,
            bss_len: ph.p_memsz - ph.p_filesz,
        })
    }
}
