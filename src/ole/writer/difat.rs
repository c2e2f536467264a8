//! XBAT (extension of the BAT index) generation for OLE2 files
//!
//! The header lists the first 109 BAT blocks. Any further BAT block ids
//! are stored in XBAT blocks: each holds `block_size / 4 - 1` ids followed
//! by the id of the next XBAT block, or ENDOFCHAIN in the last one.

use super::super::consts::*;

#[derive(Debug)]
pub struct DifatBuilder {
    /// BAT block ids beyond the first 109
    overflow_ids: Vec<u32>,
    block_size: usize,
}

impl DifatBuilder {
    pub fn new(block_size: usize, bat_blocks: &[u32]) -> Self {
        let overflow_ids = bat_blocks
            .get(HEADER_BAT_SLOTS..)
            .map(<[u32]>::to_vec)
            .unwrap_or_default();
        Self {
            overflow_ids,
            block_size,
        }
    }

    fn ids_per_block(&self) -> usize {
        self.block_size / BLOCK_ID_SIZE - 1
    }

    /// Number of XBAT blocks needed for the overflow ids
    pub fn block_count(&self) -> u32 {
        self.overflow_ids.len().div_ceil(self.ids_per_block()) as u32
    }

    /// Serialize the XBAT chain whose first block is `first_block`.
    pub fn generate(&self, first_block: u32) -> Vec<u8> {
        let per_block = self.ids_per_block();
        let count = self.block_count() as usize;
        let mut out = Vec::with_capacity(count * self.block_size);

        for (i, chunk) in self.overflow_ids.chunks(per_block).enumerate() {
            for id in chunk {
                out.extend_from_slice(&id.to_le_bytes());
            }
            for _ in chunk.len()..per_block {
                out.extend_from_slice(&FREESECT.to_le_bytes());
            }
            let next = if i + 1 < count {
                first_block + i as u32 + 1
            } else {
                ENDOFCHAIN
            };
            out.extend_from_slice(&next.to_le_bytes());
        }
        out
    }
}
