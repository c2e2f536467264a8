//! Directory entries (PPS) for the compound document writer
//!
//! Entries live in an arena and refer to each other by [`PpsId`]. The root
//! storage is always id 0. Sibling and child pointers of the on-disk format
//! are not stored here; they are derived when the tree is flattened.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::super::consts::*;
use super::super::error::{OleError, OleResult};

/// Index of an entry inside the arena
pub type PpsId = usize;

/// Name written for the root storage
pub const ROOT_NAME: &str = "Root Entry";

/// Maximum directory entry name length in UTF-16 code units
const MAX_NAME_UNITS: usize = 31;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpsKind {
    Root,
    Storage,
    Stream,
}

impl PpsKind {
    /// Object type byte stored in the directory entry
    pub fn type_byte(self) -> u8 {
        match self {
            PpsKind::Root => STGTY_ROOT,
            PpsKind::Storage => STGTY_STORAGE,
            PpsKind::Stream => STGTY_STREAM,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, PpsKind::Root | PpsKind::Storage)
    }
}

/// A single directory entry and its payload
#[derive(Debug, Clone)]
pub struct Pps {
    pub(crate) name: String,
    pub(crate) kind: PpsKind,
    pub(crate) created: Option<DateTime<Utc>>,
    pub(crate) modified: Option<DateTime<Utc>>,
    pub(crate) data: Vec<u8>,
    pub(crate) children: Vec<PpsId>,
}

impl Pps {
    fn new(name: String, kind: PpsKind, data: Vec<u8>) -> Self {
        Self {
            name,
            kind,
            created: None,
            modified: None,
            data,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PpsKind {
        self.kind
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn children(&self) -> &[PpsId] {
        &self.children
    }
}

/// Arena of directory entries rooted at id 0
#[derive(Debug, Clone)]
pub struct PpsArena {
    entries: Vec<Pps>,
}

impl PpsArena {
    pub fn new() -> Self {
        Self {
            entries: vec![Pps::new(ROOT_NAME.to_string(), PpsKind::Root, Vec::new())],
        }
    }

    pub fn root(&self) -> PpsId {
        0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: PpsId) -> Option<&Pps> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: PpsId) -> Option<&mut Pps> {
        self.entries.get_mut(id)
    }

    /// Insert a new entry below `parent`.
    ///
    /// The parent must be the root or a storage, the name must fit in 31
    /// UTF-16 code units, and no sibling may already carry the same name
    /// (compared case-insensitively, as compound document readers do).
    pub fn insert(
        &mut self,
        parent: PpsId,
        name: &str,
        kind: PpsKind,
        data: Vec<u8>,
    ) -> OleResult<PpsId> {
        if kind == PpsKind::Root {
            return Err(OleError::InvalidData(
                "A compound document has exactly one root".to_string(),
            ));
        }
        if name.is_empty() {
            return Err(OleError::InvalidData("Empty entry name".to_string()));
        }
        if name.encode_utf16().count() > MAX_NAME_UNITS {
            return Err(OleError::NameTooLong {
                name: name.to_string(),
            });
        }

        let parent_entry = self
            .entries
            .get(parent)
            .ok_or_else(|| OleError::InvalidData(format!("Unknown parent entry {}", parent)))?;
        if !parent_entry.kind.is_container() {
            return Err(OleError::InvalidData(format!(
                "Entry '{}' is a stream and cannot hold children",
                parent_entry.name
            )));
        }
        let upper = name.to_uppercase();
        if parent_entry
            .children
            .iter()
            .any(|&c| self.entries[c].name.to_uppercase() == upper)
        {
            return Err(OleError::InvalidData(format!(
                "Entry '{}' already exists in '{}'",
                name, parent_entry.name
            )));
        }

        let id = self.entries.len();
        self.entries.push(Pps::new(name.to_string(), kind, data));
        self.entries[parent].children.push(id);
        Ok(id)
    }

    /// Find a direct child of `parent` by name
    pub fn child_named(&self, parent: PpsId, name: &str) -> Option<PpsId> {
        let upper = name.to_uppercase();
        self.entries
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| self.entries[c].name.to_uppercase() == upper)
    }

    /// Children of `id` in compound document name order
    pub fn sorted_children(&self, id: PpsId) -> Vec<PpsId> {
        let mut children = self
            .entries
            .get(id)
            .map(|e| e.children.clone())
            .unwrap_or_default();
        children.sort_by(|&a, &b| compare_names(&self.entries[a].name, &self.entries[b].name));
        children
    }
}

impl Default for PpsArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Order used by compound document readers to search siblings:
/// shorter names first, then by uppercase code units.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let len_a = a.encode_utf16().count();
    let len_b = b.encode_utf16().count();
    len_a.cmp(&len_b).then_with(|| {
        a.to_uppercase()
            .encode_utf16()
            .cmp(b.to_uppercase().encode_utf16())
    })
}
