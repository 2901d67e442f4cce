//! Loader configuration

use crate::platform::InstructionPattern;

/// Tunables for an [`ElfReader`](crate::ElfReader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Name of the section holding the symbol table
    pub symbol_table_name: &'static str,
    /// Instruction whose presence in code marks the successor console
    pub variant_probe: InstructionPattern,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            symbol_table_name: ".symtab",
            variant_probe: InstructionPattern::MFSPR_HID4,
        }
    }
}
