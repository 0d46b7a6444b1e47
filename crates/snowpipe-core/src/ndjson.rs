//! Newline-delimited record encoding for history entries.
//!
//! Each entry becomes one self-contained JSON object followed by `\n`, in input
//! order. An empty input produces no bytes at all; callers use that to decide
//! that there is nothing to emit.

use std::io::Write;

use crate::models::FileEntry;

/// Write one line per entry. Returns the number of records written.
pub fn write_entries<W: Write>(mut writer: W, entries: &[FileEntry]) -> serde_json::Result<usize> {
    for entry in entries {
        serde_json::to_writer(&mut writer, entry)?;
        writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    }
    Ok(entries.len())
}

/// Encode entries into a buffer; empty input yields an empty buffer.
pub fn serialize_entries(entries: &[FileEntry]) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_entries(&mut buffer, entries)?;
    Ok(buffer)
}
