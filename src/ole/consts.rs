/// Magic bytes that should be at the beginning of every OLE file
pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Size of the populated part of the header block
pub const HEADER_SIZE: usize = 512;

/// Size of a directory entry in bytes
pub const DIRENTRY_SIZE: usize = 128;

/// Streams smaller than this live in the ministream
pub const MINI_STREAM_CUTOFF: u32 = 0x1000;

/// Number of BAT block ids stored inline in the header
pub const HEADER_BAT_SLOTS: usize = 109;

/// Default big block exponent (512-byte blocks)
pub const DEFAULT_BIG_BLOCK_SHIFT: u16 = 9;

/// Default small block exponent (64-byte blocks)
pub const DEFAULT_SMALL_BLOCK_SHIFT: u16 = 6;

/// Width of a block id in the allocation tables
pub const BLOCK_ID_SIZE: usize = 4;

// Sector IDs (from AAF specifications)
/// Denotes a DIFAT (XBAT) sector in a FAT
pub const DIFSECT: u32 = 0xFFFFFFFC; // -4
/// Denotes a FAT sector in a FAT
pub const FATSECT: u32 = 0xFFFFFFFD; // -3
/// End of a virtual stream chain
pub const ENDOFCHAIN: u32 = 0xFFFFFFFE; // -2
/// Unallocated sector
pub const FREESECT: u32 = 0xFFFFFFFF; // -1

/// Unallocated directory entry
pub const NOSTREAM: u32 = 0xFFFFFFFF; // -1

// Object types in storage (from AAF specifications)
/// Element is a storage object
pub const STGTY_STORAGE: u8 = 1;
/// Element is a stream object
pub const STGTY_STREAM: u8 = 2;
/// Element is a root storage
pub const STGTY_ROOT: u8 = 5;

/// Red-black tree colour written for every directory entry
pub const DE_BLACK: u8 = 1;

/// Class id stamped on the root entry of workbooks
pub const ROOT_CLSID: [u8; 16] = [
    0x00, 0x09, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46,
];

/// Days between 1601-01-01 and 1970-01-01
pub const FILETIME_EPOCH_DAYS: i64 = 134_774;
