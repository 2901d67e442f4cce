//! Console Variant Detection
//!
//! Both consoles run big-endian PowerPC ELF images, so nothing in the
//! headers tells them apart. The successor's system software configures the
//! HID4 special-purpose register, which the original console does not have,
//! so a `mfspr rD, HID4` anywhere in executable code marks the image as
//! built for the successor. False positives and negatives are possible.

use crate::reader::ElfReader;

/// One 32-bit instruction word, compared under a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionPattern {
    pub pattern: u32,
    pub mask: u32,
}

impl InstructionPattern {
    /// `mfspr rD, 1011` (HID4); the mask leaves the `rD` field free.
    pub const MFSPR_HID4: Self = Self {
        pattern: 0x7C13_FBA6,
        mask: 0xFC1F_FFFF,
    };

    pub fn matches(&self, word: u32) -> bool {
        word & self.mask == self.pattern
    }
}

/// Console family an image targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    GameCube,
    Wii,
}

impl<'a> ElfReader<'a> {
    /// True if any executable `PT_LOAD` segment contains the configured
    /// probe instruction.
    pub fn classify_platform_variant(&self) -> bool {
        let probe = self.config.variant_probe;

        // Swap once here, instead of swapping every word in the image
        let order = self.byte_order();
        let pattern = order.to_image_order(probe.pattern);
        let mask = order.to_image_order(probe.mask);

        (0..self.segment_count())
            .filter(|&index| self.is_code_segment(index))
            .filter_map(|index| self.segment_data(index))
            .any(|code| {
                code.chunks_exact(4).any(|word| {
                    u32::from_ne_bytes([word[0], word[1], word[2], word[3]]) & mask == pattern
                })
            })
    }

    /// [`Platform::Wii`] when the variant probe matches.
    pub fn platform(&self) -> Platform {
        if self.classify_platform_variant() {
            Platform::Wii
        } else {
            Platform::GameCube
        }
    }
}
