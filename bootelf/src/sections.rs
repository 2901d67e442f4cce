//! Section and string-table lookup

use crate::reader::ElfReader;

/// Raw bytes of the NUL-terminated string at `offset`, terminator excluded.
///
/// `None` if the offset is past the table or the string runs off the end
/// of the table without a terminator.
pub fn bytes_at(table: &[u8], offset: usize) -> Option<&[u8]> {
    let tail = table.get(offset..)?;
    let len = tail.iter().position(|&b| b == 0)?;
    Some(&tail[..len])
}

/// Like [`bytes_at`], but also `None` when the string is not UTF-8.
pub fn string_at(table: &[u8], offset: usize) -> Option<&str> {
    core::str::from_utf8(bytes_at(table, offset)?).ok()
}

impl<'a> ElfReader<'a> {
    /// Name of a section, resolved through the section-header string table.
    /// `SHT_NULL` sections have no name.
    pub fn section_name(&self, index: usize) -> Option<&'a str> {
        let section = self.section(index)?;
        if section.is_null() {
            return None;
        }

        let names = self.section_data(self.header().e_shstrndx as usize)?;
        string_at(names, section.sh_name as usize)
    }

    /// Index of the first section at or after `search_from_index` whose
    /// name is exactly `name`.
    pub fn section_by_name(&self, name: &str, search_from_index: usize) -> Option<usize> {
        (search_from_index..self.section_count())
            .find(|&index| self.section_name(index) == Some(name))
    }
}
