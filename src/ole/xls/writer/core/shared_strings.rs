use std::collections::HashMap;

/// Workbook-wide shared string table.
///
/// Strings keep their first-seen index. `total` counts every string cell,
/// duplicates included (SST `cstTotal`).
#[derive(Debug, Default)]
pub(crate) struct SharedStrings {
    strings: Vec<String>,
    index: HashMap<String, u32>,
    total: u32,
}

impl SharedStrings {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record one string cell and return the string's table index
    pub(crate) fn add(&mut self, value: &str) -> u32 {
        self.total = self.total.saturating_add(1);
        if let Some(&idx) = self.index.get(value) {
            return idx;
        }
        let idx = self.strings.len() as u32;
        self.index.insert(value.to_string(), idx);
        self.strings.push(value.to_string());
        idx
    }

    pub(crate) fn strings(&self) -> &[String] {
        &self.strings
    }

    pub(crate) fn total(&self) -> u32 {
        self.total
    }

    pub(crate) fn unique(&self) -> usize {
        self.strings.len()
    }
}
