//! Directory entry serialization for OLE2 files
//!
//! Each entry is a fixed 128-byte record: the UTF-16 name padded to 64
//! bytes, the name length in bytes including the terminator, the object
//! type, the node colour, the previous/next/child slots, a CLSID, state
//! bits, two FILETIME stamps, the start block and the stream size.

use chrono::{DateTime, Utc};
use zerocopy::byteorder::{LittleEndian, U16, U32, U64};
use zerocopy::{Immutable, IntoBytes};

use super::super::consts::*;
use super::pps::{Pps, PpsKind};
use super::tree::FlatEntry;

/// On-disk layout of a directory entry
#[derive(Debug, Clone, Copy, IntoBytes, Immutable)]
#[repr(C)]
struct RawDirEntry {
    name: [u8; 64],
    name_len: U16<LittleEndian>,
    object_type: u8,
    color: u8,
    left: U32<LittleEndian>,
    right: U32<LittleEndian>,
    child: U32<LittleEndian>,
    clsid: [u8; 16],
    state_bits: U32<LittleEndian>,
    created: U64<LittleEndian>,
    modified: U64<LittleEndian>,
    start_block: U32<LittleEndian>,
    size_low: U32<LittleEndian>,
    size_high: U32<LittleEndian>,
}

const _: () = assert!(std::mem::size_of::<RawDirEntry>() == DIRENTRY_SIZE);

/// Convert a timestamp to a FILETIME: 100-nanosecond intervals since
/// 1601-01-01. `None` encodes as zero.
pub fn to_filetime(time: Option<DateTime<Utc>>) -> u64 {
    let Some(time) = time else {
        return 0;
    };
    let seconds = time.timestamp() + FILETIME_EPOCH_DAYS * 86_400;
    let ticks = seconds as i128 * 10_000_000 + i128::from(time.timestamp_subsec_nanos() / 100);
    ticks.clamp(0, i128::from(u64::MAX)) as u64
}

/// UTF-16LE name padded to 64 bytes, plus its byte length with terminator
fn encode_name(name: &str) -> ([u8; 64], u16) {
    let mut out = [0u8; 64];
    let mut units = 0usize;
    for (i, unit) in name.encode_utf16().take(31).enumerate() {
        out[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        units = i + 1;
    }
    (out, ((units + 1) * 2) as u16)
}

/// Serialize one directory slot.
pub fn encode_entry(pps: &Pps, slot: &FlatEntry, start_block: u32, size: u64) -> [u8; 128] {
    let (name, name_len) = encode_name(pps.name());
    let clsid = if pps.kind() == PpsKind::Root {
        ROOT_CLSID
    } else {
        [0u8; 16]
    };
    let raw = RawDirEntry {
        name,
        name_len: U16::new(name_len),
        object_type: pps.kind().type_byte(),
        color: DE_BLACK,
        left: U32::new(slot.prev),
        right: U32::new(slot.next),
        child: U32::new(slot.dir),
        clsid,
        state_bits: U32::new(0),
        created: U64::new(to_filetime(pps.created)),
        modified: U64::new(to_filetime(pps.modified)),
        start_block: U32::new(start_block),
        size_low: U32::new(size as u32),
        size_high: U32::new((size >> 32) as u32),
    };

    let mut out = [0u8; 128];
    out.copy_from_slice(raw.as_bytes());
    out
}

/// An unused directory slot, as written to pad the last directory block
pub fn empty_entry() -> [u8; 128] {
    let mut out = [0u8; 128];
    for offset in [68, 72, 76] {
        out[offset..offset + 4].copy_from_slice(&NOSTREAM.to_le_bytes());
    }
    out
}
