//! Byte-level container construction for unit tests.

use super::format::*;
use super::ContainerHeader;

/// Lays out a container: preamble, directory, then 8-byte aligned data.
pub struct ContainerBuilder {
    version: u32,
    entries: Vec<(String, Vec<u8>)>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self { version: CURRENT_VERSION, entries: Vec::new() }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn add(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let dir_len: usize = self
            .entries
            .iter()
            .map(|(name, _)| ENTRY_FIXED_SIZE + name.len())
            .sum();
        let mut offset = align8(PREAMBLE_SIZE + dir_len);
        let mut ranges = Vec::with_capacity(self.entries.len());
        for (_, data) in &self.entries {
            ranges.push((offset as u64, (offset + data.len()) as u64));
            offset = align8(offset + data.len());
        }

        let mut out = Vec::with_capacity(offset);
        out.extend_from_slice(BFAST_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for ((name, _), (start, end)) in self.entries.iter().zip(&ranges) {
            out.extend_from_slice(&(name.len() as u32).to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&start.to_le_bytes());
            out.extend_from_slice(&end.to_le_bytes());
        }
        for ((_, data), (start, _)) in self.entries.iter().zip(&ranges) {
            out.resize(*start as usize, 0);
            out.extend_from_slice(data);
        }
        out
    }

    /// Byte position of entry `index`'s start field within the directory.
    pub fn entry_start_offset(header: &ContainerHeader, index: usize) -> usize {
        let before: usize = header.entries[..index]
            .iter()
            .map(|e| ENTRY_FIXED_SIZE + e.name.len())
            .sum();
        PREAMBLE_SIZE + before + 4 + header.entries[index].name.len()
    }
}

fn align8(n: usize) -> usize {
    (n + 7) & !7
}
