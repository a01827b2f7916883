//! Sidecar line table mapping code addresses to source lines.
//!
//! The table lives next to the bytecode image with a `.dbg` extension and
//! holds one `<code address> <source line>` pair per line, sorted ascending
//! by address. It is advisory: a missing file or malformed lines are
//! tolerated, and lookups simply return `None` when nothing maps.

use std::fs;
use std::path::Path;

/// Sorted pc-to-source-line mapping.
#[derive(Debug, Clone, Default)]
pub struct LineTable {
    entries: Vec<(u32, u32)>,
}

impl LineTable {
    /// Load the sidecar for `image_path` (extension replaced by `dbg`).
    /// Returns `None` when the sidecar does not exist or cannot be read.
    pub fn load_for_image(image_path: &Path) -> Option<LineTable> {
        let sidecar = image_path.with_extension("dbg");
        let text = fs::read_to_string(&sidecar).ok()?;
        Some(Self::parse(&text))
    }

    /// Parse sidecar text, skipping lines that are not two decimal integers.
    pub fn parse(text: &str) -> LineTable {
        let entries = text
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let address = fields.next()?.parse().ok()?;
                let source_line = fields.next()?.parse().ok()?;
                Some((address, source_line))
            })
            .collect();
        LineTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Source line of the last entry whose address is <= `pc`.
    pub fn lookup(&self, pc: u32) -> Option<u32> {
        let idx = self.entries.partition_point(|&(address, _)| address <= pc);
        idx.checked_sub(1).map(|i| self.entries[i].1)
    }
}
