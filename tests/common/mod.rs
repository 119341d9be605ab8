//! Shared helpers: a byte-level container writer and a small model.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const MAGIC: &[u8; 8] = b"BFAST\0\0\x01";

/// Lay out a version-1 container with 8-byte aligned data.
pub fn container(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let dir_len: usize = entries.iter().map(|(name, _)| 20 + name.len()).sum();
    let mut offset = align8(16 + dir_len);
    let mut ranges = Vec::new();
    for (_, data) in entries {
        ranges.push((offset as u64, (offset + data.len()) as u64));
        offset = align8(offset + data.len());
    }

    let mut out = Vec::with_capacity(offset);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for ((name, _), (start, end)) in entries.iter().zip(&ranges) {
        out.extend_from_slice(&(name.len() as u32).to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&start.to_le_bytes());
        out.extend_from_slice(&end.to_le_bytes());
    }
    for ((_, data), (start, _)) in entries.iter().zip(&ranges) {
        out.resize(*start as usize, 0);
        out.extend_from_slice(data);
    }
    out
}

fn align8(n: usize) -> usize {
    (n + 7) & !7
}

pub fn i32s(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn i64s(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn f32s(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// NUL-separated string pool.
pub fn strings(values: &[&str]) -> Vec<u8> {
    values.iter().flat_map(|s| s.bytes().chain([0])).collect()
}

/// Write bytes to a temporary file.
pub fn temp_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(bytes).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Entity tables for a small building: two categories, two families,
/// one level and `elements` elements.
///
/// String pool: 0 "Doors", 1 "Walls", 2 "Single Flush", 3 "Basic Wall", 4 "Level 1".
/// Element `i` belongs to family `i % 2`; every third element has no family.
pub fn model_tables(elements: usize) -> Vec<(&'static str, Vec<u8>)> {
    let ids: Vec<i64> = (0..elements as i64).map(|i| 1000 + i).collect();
    let families: Vec<i32> = (0..elements as i32).map(|i| if i % 3 == 2 { -1 } else { i % 2 }).collect();
    let categories: Vec<i32> = (0..elements as i32).map(|i| i % 2).collect();
    let level_names: Vec<i32> = vec![4; elements];

    vec![
        ("strings", strings(&["Doors", "Walls", "Single Flush", "Basic Wall", "Level 1"])),
        ("table/Category/Name:string", i32s(&[0, 1])),
        ("table/Family/Name:string", i32s(&[2, 3])),
        ("table/Family/Category:index:Category", i32s(&[0, 1])),
        ("table/Level/Name:string", i32s(&[4])),
        ("table/Level/Elevation:float64", 3.0f64.to_le_bytes().to_vec()),
        ("table/Element/Id:int64", i64s(&ids)),
        ("table/Element/Category:index:Category", i32s(&categories)),
        ("table/Element/Family:index:Family", i32s(&families)),
        ("table/Element/Level.Name:string", i32s(&level_names)),
    ]
}
