//! Integration tests for OLE writer
//!
//! The written files are read back with the `cfb` crate, and a few layout
//! properties are checked directly on the raw bytes.

use std::io::{Cursor, Read};

use proptest::prelude::*;

use super::super::consts::*;
use super::core::{OleWriter, OleWriterOptions};

fn read_back(data: Vec<u8>, path: &str) -> Vec<u8> {
    let mut comp = cfb::CompoundFile::open(Cursor::new(data)).unwrap();
    let mut stream = comp.open_stream(path).unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    out
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// BAT entries of a file without XBAT blocks
fn read_bat(data: &[u8]) -> Vec<u32> {
    let count = u32_at(data, 44) as usize;
    let mut bat = Vec::new();
    for i in 0..count {
        let block = u32_at(data, 76 + i * 4) as usize;
        let start = 512 + block * 512;
        for j in 0..128 {
            bat.push(u32_at(data, start + j * 4));
        }
    }
    bat
}

#[test]
fn test_write_simple_ole_file() {
    let mut writer = OleWriter::new();
    writer
        .create_stream(&["TestStream"], b"Hello, World!")
        .unwrap();

    let data = writer.to_bytes().unwrap();
    // header, SBAT, ministream, directory, BAT
    assert_eq!(data.len(), 512 * 5);
    assert_eq!(&data[0..8], MAGIC);

    assert_eq!(read_back(data, "/TestStream"), b"Hello, World!");
}

#[test]
fn test_write_multiple_streams() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["Small1"], b"Small").unwrap();
    writer.create_stream(&["Small2"], b"Data").unwrap();
    writer
        .create_stream(&["Large1"], &vec![0xAAu8; 5000])
        .unwrap();
    writer
        .create_stream(&["Large2"], &vec![0xBBu8; 10000])
        .unwrap();

    let data = writer.to_bytes().unwrap();
    assert_eq!(read_back(data.clone(), "/Small1"), b"Small");
    assert_eq!(read_back(data.clone(), "/Small2"), b"Data");

    let large1 = read_back(data.clone(), "/Large1");
    assert_eq!(large1.len(), 5000);
    assert!(large1.iter().all(|&b| b == 0xAA));

    let large2 = read_back(data, "/Large2");
    assert_eq!(large2.len(), 10000);
    assert!(large2.iter().all(|&b| b == 0xBB));
}

#[test]
fn test_write_empty_stream() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["Empty"], b"").unwrap();

    let data = writer.to_bytes().unwrap();
    // No small blocks at all: the SBAT start is ENDOFCHAIN.
    assert_eq!(u32_at(&data, 60), ENDOFCHAIN);
    assert_eq!(u32_at(&data, 64), 0);

    let comp = cfb::CompoundFile::open(Cursor::new(data.clone())).unwrap();
    assert!(comp.is_stream("/Empty"));
    assert!(read_back(data, "/Empty").is_empty());
}

#[test]
fn test_write_nested_storages() {
    let mut writer = OleWriter::new();
    let root = writer.root();
    let storage = writer.add_storage(root, "Storage").unwrap();
    let inner = writer.add_storage(storage, "Inner").unwrap();
    writer.add_stream(inner, "Deep", b"deep data".to_vec()).unwrap();
    writer.add_stream(root, "Top", vec![7u8; 4096]).unwrap();

    let data = writer.to_bytes().unwrap();
    let comp = cfb::CompoundFile::open(Cursor::new(data.clone())).unwrap();
    assert!(comp.is_storage("/Storage"));
    assert!(comp.is_storage("/Storage/Inner"));

    assert_eq!(read_back(data.clone(), "/Storage/Inner/Deep"), b"deep data");
    // Exactly at the cutoff the stream goes to big blocks.
    assert_eq!(read_back(data, "/Top"), vec![7u8; 4096]);
}

#[test]
fn test_many_siblings_are_searchable() {
    let mut writer = OleWriter::new();
    let names: Vec<String> = (0..40).map(|i| format!("Stream{}", i)).collect();
    for (i, name) in names.iter().enumerate() {
        writer.create_stream(&[name], &[i as u8; 3]).unwrap();
    }

    let data = writer.to_bytes().unwrap();
    for (i, name) in names.iter().enumerate() {
        assert_eq!(read_back(data.clone(), &format!("/{}", name)), vec![i as u8; 3]);
    }
}

#[test]
fn test_directory_and_chain_lengths() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["Book"], &vec![1u8; 3000]).unwrap();
    writer.create_stream(&["Big"], &vec![2u8; 2000 * 5]).unwrap();

    let data = writer.to_bytes().unwrap();
    let bat = read_bat(&data);
    let layout = writer.calculate_layout(&writer.build_tree());

    // Directory chain length matches the directory block count.
    let mut dir_len = 0;
    let mut block = u32_at(&data, 48);
    while block != ENDOFCHAIN {
        dir_len += 1;
        block = bat[block as usize];
    }
    assert_eq!(dir_len, layout.dir_blocks);

    // Exactly as many FATSECT markers as BAT blocks.
    let fat_marks = bat.iter().filter(|&&id| id == FATSECT).count() as u32;
    assert_eq!(fat_marks, u32_at(&data, 44));
    assert_eq!(fat_marks, layout.bat_blocks);

    // File length is header plus every counted block.
    assert_eq!(data.len(), 512 * (1 + layout.total_blocks() as usize));
}

#[test]
fn test_root_entry_carries_ministream() {
    let mut writer = OleWriter::new();
    writer.create_stream(&["A"], &[1u8; 100]).unwrap();
    writer.create_stream(&["B"], &[2u8; 10]).unwrap();

    let data = writer.to_bytes().unwrap();
    let dir_start = u32_at(&data, 48) as usize;
    let root = &data[512 + dir_start * 512..512 + dir_start * 512 + 128];

    assert_eq!(root[66], STGTY_ROOT);
    assert_eq!(&root[80..96], &ROOT_CLSID);
    // Two small blocks for A plus one for B
    assert_eq!(u32_at(root, 120), 192);
}

#[test]
fn test_write_sector_size_4096() {
    let options = OleWriterOptions {
        big_block_shift: 12,
        ..Default::default()
    };
    let mut writer = OleWriter::with_options(options).unwrap();
    writer.create_stream(&["Small"], b"tiny").unwrap();
    writer
        .create_stream(&["Large"], &vec![0x5Au8; 9000])
        .unwrap();

    let data = writer.to_bytes().unwrap();
    assert_eq!(data.len() % 4096, 0);
    assert_eq!(u16::from_le_bytes([data[26], data[27]]), 4);
    assert_eq!(u16::from_le_bytes([data[30], data[31]]), 12);

    let comp = cfb::CompoundFile::open(Cursor::new(data.clone())).unwrap();
    assert_eq!(comp.version(), cfb::Version::V4);
    assert_eq!(read_back(data.clone(), "/Small"), b"tiny");
    assert_eq!(read_back(data, "/Large"), vec![0x5Au8; 9000]);
}

#[test]
fn test_large_file_uses_xbat() {
    let mut writer = OleWriter::new();
    let payload: Vec<u8> = (0..7_200_000u32).map(|i| (i % 251) as u8).collect();
    writer.create_stream(&["Huge"], &payload).unwrap();

    let layout = writer.calculate_layout(&writer.build_tree());
    assert!(layout.bat_blocks > 109);
    assert_eq!(layout.xbat_blocks, 1);

    let data = writer.to_bytes().unwrap();
    assert_eq!(u32_at(&data, 72), 1);
    assert_ne!(u32_at(&data, 68), ENDOFCHAIN);

    let back = read_back(data, "/Huge");
    assert_eq!(back.len(), payload.len());
    assert!(back == payload);
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.ole");

    let mut writer = OleWriter::new();
    writer.create_stream(&["Stream"], b"file data").unwrap();
    writer.save(&path).unwrap();

    let data = std::fs::read(&path).unwrap();
    assert_eq!(read_back(data, "/Stream"), b"file data");
}

#[test]
fn test_boundary_conditions() {
    let mut writer = OleWriter::new();
    for (name, len) in [("Below", 4095usize), ("At", 4096), ("Above", 4097), ("Block", 512)] {
        writer.create_stream(&[name], &vec![0x11u8; len]).unwrap();
    }

    let data = writer.to_bytes().unwrap();
    assert_eq!(read_back(data.clone(), "/Below").len(), 4095);
    assert_eq!(read_back(data.clone(), "/At").len(), 4096);
    assert_eq!(read_back(data.clone(), "/Above").len(), 4097);
    assert_eq!(read_back(data, "/Block").len(), 512);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_streams_round_trip(sizes in proptest::collection::vec(0usize..9000, 1..6)) {
        let mut writer = OleWriter::new();
        for (i, size) in sizes.iter().enumerate() {
            let data: Vec<u8> = (0..*size).map(|b| (b + i) as u8).collect();
            writer.create_stream(&[&format!("S{}", i)], &data).unwrap();
        }

        let data = writer.to_bytes().unwrap();
        for (i, size) in sizes.iter().enumerate() {
            let expected: Vec<u8> = (0..*size).map(|b| (b + i) as u8).collect();
            prop_assert_eq!(read_back(data.clone(), &format!("/S{}", i)), expected);
        }
    }
}
