//! Flattening of the entry arena into directory order
//!
//! Each sibling list is laid out as a balanced binary search tree: the
//! median entry (index `len / 2`) takes the next free directory slot, the
//! left half hangs off its "previous" pointer, the right half off its
//! "next" pointer, and its own children off its "directory" pointer. An
//! empty list yields [`NOSTREAM`]. The root is always slot 0.

use super::super::consts::NOSTREAM;
use super::pps::{PpsArena, PpsId};

/// One directory slot after flattening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatEntry {
    /// Arena id of the entry stored in this slot
    pub id: PpsId,
    /// Slot of the left sibling subtree
    pub prev: u32,
    /// Slot of the right sibling subtree
    pub next: u32,
    /// Slot of the child subtree
    pub dir: u32,
}

/// Flatten the arena into directory slots using the median split.
///
/// The function only reads the arena; the slot numbers are carried in the
/// returned list.
pub fn build_tree(arena: &PpsArena) -> Vec<FlatEntry> {
    let mut out = Vec::with_capacity(arena.len());
    place(arena, &[arena.root()], &mut out);
    out
}

fn place(arena: &PpsArena, siblings: &[PpsId], out: &mut Vec<FlatEntry>) -> u32 {
    if siblings.is_empty() {
        return NOSTREAM;
    }

    let mid = siblings.len() / 2;
    let slot = out.len();
    out.push(FlatEntry {
        id: siblings[mid],
        prev: NOSTREAM,
        next: NOSTREAM,
        dir: NOSTREAM,
    });

    let prev = place(arena, &siblings[..mid], out);
    let next = place(arena, &siblings[mid + 1..], out);
    let children = arena.sorted_children(siblings[mid]);
    let dir = place(arena, &children, out);

    let entry = &mut out[slot];
    entry.prev = prev;
    entry.next = next;
    entry.dir = dir;
    slot as u32
}
