//! OLE file writer implementation
//!
//! Entries are collected in an arena and the whole compound document is
//! produced in one sequential pass by [`OleWriter::write_to`].
//!
//! # File layout
//!
//! After the header block the big blocks are written in this order:
//!
//! 1. the small block allocation table (SBAT)
//! 2. the ministream holding every stream below 4096 bytes
//! 3. each big stream, in directory order
//! 4. the directory entries
//! 5. the big block allocation table (BAT)
//! 6. the XBAT blocks, when more than 109 BAT blocks are needed
//!
//! Every region is its own chain, and the BAT lists them in the same order,
//! followed by the FATSECT and DIFSECT markers of the tables themselves.
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::ole::OleWriter;
//!
//! let mut writer = OleWriter::new();
//! let root = writer.root();
//! writer.add_stream(root, "MyStream", b"Hello, World!".to_vec())?;
//!
//! let storage = writer.add_storage(root, "MyStorage")?;
//! writer.add_stream(storage, "NestedStream", b"Nested content".to_vec())?;
//!
//! writer.save("output.ole")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::super::consts::*;
use super::super::error::{OleError, OleResult};
use super::difat::DifatBuilder;
use super::directory::{empty_entry, encode_entry};
use super::fat::FatBuilder;
use super::header::HeaderBuilder;
use super::layout::{BlockLayout, calculate_layout};
use super::minifat::MiniFatBuilder;
use super::pps::{PpsArena, PpsId, PpsKind};
use super::tree::{FlatEntry, build_tree};

/// Block geometry and root timestamps for a new compound document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OleWriterOptions {
    /// Big block exponent: 9 (512 bytes) or 12 (4096 bytes)
    pub big_block_shift: u16,
    /// Small block exponent, 6 (64 bytes)
    pub small_block_shift: u16,
    /// Creation time stamped on the root entry
    pub created: Option<DateTime<Utc>>,
    /// Modification time stamped on the root entry
    pub modified: Option<DateTime<Utc>>,
}

impl Default for OleWriterOptions {
    fn default() -> Self {
        Self {
            big_block_shift: DEFAULT_BIG_BLOCK_SHIFT,
            small_block_shift: DEFAULT_SMALL_BLOCK_SHIFT,
            created: None,
            modified: None,
        }
    }
}

/// OLE file writer
///
/// All entries are buffered in memory until `write_to()` or `save()`.
#[derive(Debug, Clone)]
pub struct OleWriter {
    arena: PpsArena,
    big_block_shift: u16,
    small_block_shift: u16,
}

impl OleWriter {
    /// Create an empty writer with 512-byte big blocks and 64-byte small blocks
    pub fn new() -> Self {
        Self {
            arena: PpsArena::new(),
            big_block_shift: DEFAULT_BIG_BLOCK_SHIFT,
            small_block_shift: DEFAULT_SMALL_BLOCK_SHIFT,
        }
    }

    /// Create a writer with explicit block sizes and root timestamps.
    ///
    /// Big blocks must be 512 or 4096 bytes and small blocks 64 bytes;
    /// other exponents are rejected.
    pub fn with_options(options: OleWriterOptions) -> OleResult<Self> {
        if !matches!(options.big_block_shift, 9 | 12) {
            return Err(OleError::UnsupportedBlockSize {
                shift: options.big_block_shift,
            });
        }
        if options.small_block_shift != DEFAULT_SMALL_BLOCK_SHIFT {
            return Err(OleError::UnsupportedBlockSize {
                shift: options.small_block_shift,
            });
        }

        let mut writer = Self {
            arena: PpsArena::new(),
            big_block_shift: options.big_block_shift,
            small_block_shift: options.small_block_shift,
        };
        let root = writer.root();
        writer.set_times(root, options.created, options.modified)?;
        Ok(writer)
    }

    pub fn big_block_size(&self) -> usize {
        1usize << self.big_block_shift
    }

    pub fn small_block_size(&self) -> usize {
        1usize << self.small_block_shift
    }

    /// Id of the root storage
    pub fn root(&self) -> PpsId {
        self.arena.root()
    }

    pub fn arena(&self) -> &PpsArena {
        &self.arena
    }

    /// Add a storage below `parent`
    pub fn add_storage(&mut self, parent: PpsId, name: &str) -> OleResult<PpsId> {
        self.arena
            .insert(parent, name, PpsKind::Storage, Vec::new())
    }

    /// Add a stream below `parent`
    pub fn add_stream(
        &mut self,
        parent: PpsId,
        name: &str,
        data: impl Into<Vec<u8>>,
    ) -> OleResult<PpsId> {
        self.arena
            .insert(parent, name, PpsKind::Stream, data.into())
    }

    /// Create a stream at `path`, creating intermediate storages as needed.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use longan::ole::OleWriter;
    /// let mut writer = OleWriter::new();
    /// writer.create_stream(&["Storage", "Stream"], b"data")?;
    /// # Ok::<(), longan::ole::OleError>(())
    /// ```
    pub fn create_stream(&mut self, path: &[&str], data: &[u8]) -> OleResult<PpsId> {
        let Some((name, parents)) = path.split_last() else {
            return Err(OleError::InvalidData("Empty path".to_string()));
        };

        let mut parent = self.root();
        for storage in parents {
            parent = match self.arena.child_named(parent, storage) {
                Some(existing) => existing,
                None => self.add_storage(parent, storage)?,
            };
        }
        self.add_stream(parent, name, data.to_vec())
    }

    /// Set the creation and modification stamps of an entry
    pub fn set_times(
        &mut self,
        id: PpsId,
        created: Option<DateTime<Utc>>,
        modified: Option<DateTime<Utc>>,
    ) -> OleResult<()> {
        let pps = self
            .arena
            .get_mut(id)
            .ok_or_else(|| OleError::InvalidData(format!("Unknown entry {}", id)))?;
        pps.created = created;
        pps.modified = modified;
        Ok(())
    }

    /// Flatten the entry arena into directory slots (median split)
    pub fn build_tree(&self) -> Vec<FlatEntry> {
        build_tree(&self.arena)
    }

    /// Block counts for a flattened directory
    pub fn calculate_layout(&self, flat: &[FlatEntry]) -> BlockLayout {
        calculate_layout(
            &self.arena,
            flat,
            self.big_block_size(),
            self.small_block_size(),
        )
    }

    /// Serialize the compound document to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> OleResult<()> {
        let big = self.big_block_size();
        let flat = self.build_tree();
        let layout = self.calculate_layout(&flat);
        debug!(
            "compound layout: {} entries, {} small blocks, {:?}",
            flat.len(),
            layout.small_blocks,
            layout
        );

        // Small streams go to the ministream in directory order.
        let mut minifat = MiniFatBuilder::new(self.small_block_size());
        let mut starts = vec![ENDOFCHAIN; flat.len()];
        for (slot, entry) in flat.iter().enumerate() {
            let pps = self.entry(entry.id)?;
            if pps.kind() == PpsKind::Stream && pps.size() < MINI_STREAM_CUTOFF as usize {
                starts[slot] = minifat.allocate_mini_chain(pps.data());
            }
        }
        if minifat.small_blocks() != layout.small_blocks {
            return Err(OleError::CorruptedLayout(format!(
                "expected {} small blocks, allocated {}",
                layout.small_blocks,
                minifat.small_blocks()
            )));
        }

        let mut fat = FatBuilder::new(big);
        let sbat_start = fat.allocate_chain(layout.sbat_blocks);
        let ministream_start = fat.allocate_bytes(minifat.ministream_data().len());
        for (slot, entry) in flat.iter().enumerate() {
            let pps = self.entry(entry.id)?;
            if pps.kind() == PpsKind::Stream && pps.size() >= MINI_STREAM_CUTOFF as usize {
                starts[slot] = fat.allocate_bytes(pps.size());
            }
        }
        let dir_start = fat.allocate_chain(layout.dir_blocks);
        let bat_start = fat.allocate_special(layout.bat_blocks, FATSECT);
        let xbat_start = fat.allocate_special(layout.xbat_blocks, DIFSECT);

        let ids_per_block = (big / BLOCK_ID_SIZE) as u32;
        if fat.total_blocks() != layout.total_blocks()
            || fat.total_blocks() > layout.bat_blocks * ids_per_block
        {
            return Err(OleError::CorruptedLayout(format!(
                "allocated {} blocks for a layout of {}",
                fat.total_blocks(),
                layout.total_blocks()
            )));
        }
        fat.validate().map_err(OleError::CorruptedLayout)?;

        let bat_ids: Vec<u32> = (0..layout.bat_blocks).map(|i| bat_start + i).collect();
        let difat = DifatBuilder::new(big, &bat_ids);
        if difat.block_count() != layout.xbat_blocks {
            return Err(OleError::CorruptedLayout(format!(
                "expected {} XBAT blocks, need {}",
                layout.xbat_blocks,
                difat.block_count()
            )));
        }

        let mut header = HeaderBuilder::new(self.big_block_shift, self.small_block_shift);
        header.set_sbat(sbat_start, layout.sbat_blocks);
        header.set_directory(dir_start, layout.dir_blocks);
        header.set_bat_blocks(&bat_ids);
        header.set_xbat(xbat_start, layout.xbat_blocks);

        writer.write_all(&header.generate())?;
        writer.write_all(&minifat.generate_sbat_blocks(big))?;
        write_padded(writer, minifat.ministream_data(), big)?;
        for entry in &flat {
            let pps = self.entry(entry.id)?;
            if pps.kind() == PpsKind::Stream && pps.size() >= MINI_STREAM_CUTOFF as usize {
                write_padded(writer, pps.data(), big)?;
            }
        }

        let mut directory = Vec::with_capacity(layout.dir_blocks as usize * big);
        for (slot, entry) in flat.iter().enumerate() {
            let pps = self.entry(entry.id)?;
            let (start, size) = match pps.kind() {
                PpsKind::Root if !minifat.is_empty() => {
                    (ministream_start, minifat.ministream_data().len() as u64)
                },
                PpsKind::Root | PpsKind::Storage => (ENDOFCHAIN, 0),
                PpsKind::Stream => (starts[slot], pps.size() as u64),
            };
            directory.extend_from_slice(&encode_entry(pps, entry, start, size));
        }
        while directory.len() < layout.dir_blocks as usize * big {
            directory.extend_from_slice(&empty_entry());
        }
        writer.write_all(&directory)?;

        writer.write_all(&fat.to_blocks(big))?;
        writer.write_all(&difat.generate(xbat_start))?;
        writer.flush()?;

        Ok(())
    }

    /// Serialize the compound document into a new byte vector
    pub fn to_bytes(&self) -> OleResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Save the OLE file to a file path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> OleResult<()> {
        let file = std::fs::File::create(path)?;
        let mut buffered = std::io::BufWriter::new(file);
        self.write_to(&mut buffered)?;
        buffered.flush()?;
        Ok(())
    }

    fn entry(&self, id: PpsId) -> OleResult<&super::pps::Pps> {
        self.arena
            .get(id)
            .ok_or_else(|| OleError::CorruptedLayout(format!("dangling entry id {}", id)))
    }
}

impl Default for OleWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_padded<W: Write>(writer: &mut W, data: &[u8], block_size: usize) -> OleResult<()> {
    writer.write_all(data)?;
    let rem = data.len() % block_size;
    if rem != 0 {
        writer.write_all(&vec![0u8; block_size - rem])?;
    }
    Ok(())
}
