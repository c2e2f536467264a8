//! OLE2 header generation
//!
//! Generates the header block with magic bytes, block size exponents, the
//! starting blocks of the directory, SBAT and XBAT chains, and the first
//! 109 BAT block ids.

use super::super::consts::*;

/// OLE2 header builder
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    big_block_shift: u16,
    small_block_shift: u16,
    first_dir_block: u32,
    num_dir_blocks: u32,
    first_sbat_block: u32,
    num_sbat_blocks: u32,
    first_xbat_block: u32,
    num_xbat_blocks: u32,
    bat_blocks: Vec<u32>,
}

impl HeaderBuilder {
    pub fn new(big_block_shift: u16, small_block_shift: u16) -> Self {
        Self {
            big_block_shift,
            small_block_shift,
            first_dir_block: 0,
            num_dir_blocks: 0,
            first_sbat_block: ENDOFCHAIN,
            num_sbat_blocks: 0,
            first_xbat_block: ENDOFCHAIN,
            num_xbat_blocks: 0,
            bat_blocks: Vec::new(),
        }
    }

    fn block_size(&self) -> usize {
        1usize << self.big_block_shift
    }

    pub fn set_directory(&mut self, first_block: u32, num_blocks: u32) {
        self.first_dir_block = first_block;
        self.num_dir_blocks = num_blocks;
    }

    /// Start of the SBAT chain, or ENDOFCHAIN when there are no small blocks
    pub fn set_sbat(&mut self, first_block: u32, num_blocks: u32) {
        self.first_sbat_block = if num_blocks > 0 { first_block } else { ENDOFCHAIN };
        self.num_sbat_blocks = num_blocks;
    }

    pub fn set_xbat(&mut self, first_block: u32, num_blocks: u32) {
        self.first_xbat_block = if num_blocks > 0 { first_block } else { ENDOFCHAIN };
        self.num_xbat_blocks = num_blocks;
    }

    /// Ids of every BAT block; only the first 109 are stored in the header
    pub fn set_bat_blocks(&mut self, ids: &[u32]) {
        self.bat_blocks = ids.to_vec();
    }

    /// Generate the header block.
    ///
    /// The populated header is 512 bytes; with 4096-byte blocks the rest of
    /// the first block is zero-filled.
    pub fn generate(&self) -> Vec<u8> {
        let mut header = vec![0u8; self.block_size().max(HEADER_SIZE)];

        header[0..8].copy_from_slice(MAGIC);
        // header[8..24] CLSID, zero

        header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());
        let dll_version: u16 = if self.big_block_shift == 12 { 4 } else { 3 };
        header[26..28].copy_from_slice(&dll_version.to_le_bytes());
        header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
        header[30..32].copy_from_slice(&self.big_block_shift.to_le_bytes());
        header[32..34].copy_from_slice(&self.small_block_shift.to_le_bytes());
        // header[34..40] reserved

        // csectDir must be zero for version 3 files
        let dir_count = if dll_version == 3 { 0 } else { self.num_dir_blocks };
        header[40..44].copy_from_slice(&dir_count.to_le_bytes());
        header[44..48].copy_from_slice(&(self.bat_blocks.len() as u32).to_le_bytes());
        header[48..52].copy_from_slice(&self.first_dir_block.to_le_bytes());
        // header[52..56] transaction signature
        header[56..60].copy_from_slice(&MINI_STREAM_CUTOFF.to_le_bytes());
        header[60..64].copy_from_slice(&self.first_sbat_block.to_le_bytes());
        header[64..68].copy_from_slice(&self.num_sbat_blocks.to_le_bytes());
        header[68..72].copy_from_slice(&self.first_xbat_block.to_le_bytes());
        header[72..76].copy_from_slice(&self.num_xbat_blocks.to_le_bytes());

        for slot in 0..HEADER_BAT_SLOTS {
            let id = self.bat_blocks.get(slot).copied().unwrap_or(FREESECT);
            let offset = 76 + slot * BLOCK_ID_SIZE;
            header[offset..offset + BLOCK_ID_SIZE].copy_from_slice(&id.to_le_bytes());
        }

        header
    }
}
