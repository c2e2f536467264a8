//! Block accounting for a flattened directory
//!
//! Streams below the ministream cutoff are counted in small blocks, larger
//! ones in big blocks. The small blocks are themselves stored in the root
//! entry's ministream, which occupies big blocks.

use super::super::consts::*;
use super::pps::{PpsArena, PpsKind};
use super::tree::FlatEntry;

/// Block counts for every region of the file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockLayout {
    /// Small blocks used by streams in the ministream
    pub small_blocks: u32,
    /// Big blocks holding the small block allocation table (SBAT)
    pub sbat_blocks: u32,
    /// Big blocks holding stream data, ministream included
    pub big_blocks: u32,
    /// Big blocks holding directory entries
    pub dir_blocks: u32,
    /// Big blocks holding the big block allocation table (BAT)
    pub bat_blocks: u32,
    /// Big blocks holding the extension of the BAT index (XBAT)
    pub xbat_blocks: u32,
}

impl BlockLayout {
    /// Blocks that are not part of the allocation tables themselves
    pub fn content_blocks(&self) -> u32 {
        self.sbat_blocks + self.big_blocks + self.dir_blocks
    }

    /// Every block following the header
    pub fn total_blocks(&self) -> u32 {
        self.content_blocks() + self.bat_blocks + self.xbat_blocks
    }
}

/// Count the blocks needed to store `flat` with the given block sizes.
pub fn calculate_layout(
    arena: &PpsArena,
    flat: &[FlatEntry],
    big_block_size: usize,
    small_block_size: usize,
) -> BlockLayout {
    let mut small_blocks = 0u32;
    let mut big_blocks = 0u32;

    for entry in flat {
        let Some(pps) = arena.get(entry.id) else {
            continue;
        };
        if pps.kind() != PpsKind::Stream {
            continue;
        }
        let size = pps.size();
        if size < MINI_STREAM_CUTOFF as usize {
            small_blocks += size.div_ceil(small_block_size) as u32;
        } else {
            big_blocks += size.div_ceil(big_block_size) as u32;
        }
    }

    let ids_per_block = (big_block_size / BLOCK_ID_SIZE) as u32;
    let ministream_len = small_blocks as usize * small_block_size;
    big_blocks += ministream_len.div_ceil(big_block_size) as u32;

    let sbat_blocks = small_blocks.div_ceil(ids_per_block);
    let entries_per_block = (big_block_size / DIRENTRY_SIZE) as u32;
    let dir_blocks = (flat.len() as u32).div_ceil(entries_per_block);

    let mut layout = BlockLayout {
        small_blocks,
        sbat_blocks,
        big_blocks,
        dir_blocks,
        bat_blocks: 0,
        xbat_blocks: 0,
    };
    let (bat, xbat) = allocation_table_blocks(layout.content_blocks(), big_block_size);
    layout.bat_blocks = bat;
    layout.xbat_blocks = xbat;
    layout
}

/// Number of BAT and XBAT blocks needed to describe `content_blocks` blocks.
///
/// BAT blocks must also describe themselves and the XBAT blocks, and XBAT
/// blocks are only needed once the BAT outgrows the header's 109 slots, so
/// the counts are iterated until they stop changing.
pub fn allocation_table_blocks(content_blocks: u32, big_block_size: usize) -> (u32, u32) {
    let ids_per_block = (big_block_size / BLOCK_ID_SIZE) as u32;
    // The last id of every XBAT block links to the next one.
    let ids_per_xbat = ids_per_block - 1;

    let mut bat = 0u32;
    let mut xbat = 0u32;
    loop {
        let needed_bat = (content_blocks + bat + xbat).div_ceil(ids_per_block);
        let needed_xbat = needed_bat
            .saturating_sub(HEADER_BAT_SLOTS as u32)
            .div_ceil(ids_per_xbat);
        if needed_bat <= bat && needed_xbat <= xbat {
            return (bat, xbat);
        }
        bat = bat.max(needed_bat);
        xbat = xbat.max(needed_xbat);
    }
}
