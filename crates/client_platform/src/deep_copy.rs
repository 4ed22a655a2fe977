//! Independent copies of nested string-map collections.
//!
//! Row lists (one ordered string map per song, album, ...) are handed between background work
//! and the UI. Copies own every level so edits on one side never leak into the other.

use std::collections::BTreeMap;

use indexmap::IndexMap;

/// One row of string fields in insertion order.
pub type StringMap = IndexMap<String, String>;
/// Ordered collection of rows.
pub type StringMapList = Vec<StringMap>;
/// Row lists grouped under integer section keys.
pub type IndexedStringMapLists = BTreeMap<i32, StringMapList>;

/// Returns an owned copy of `rows` sharing no state with the original.
pub fn copy_string_maps(rows: &[StringMap]) -> StringMapList {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .collect()
}

/// Returns an owned copy of grouped rows sharing no state with the original at either level.
pub fn copy_indexed_string_maps(sections: &IndexedStringMapLists) -> IndexedStringMapLists {
    sections
        .iter()
        .map(|(section, rows)| (*section, copy_string_maps(rows)))
        .collect()
}
