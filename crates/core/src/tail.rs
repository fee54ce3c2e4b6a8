//! Tail reader: the two byte-level operations behind every stream.
//!
//! [`last_lines`] extracts the last N terminated lines of a file without
//! reading it in full (backward scan in 8KB chunks from EOF). [`lines_since`]
//! extracts the lines appended after a byte offset. Both return the offset
//! just past the last terminator they observed, so an unterminated trailing
//! fragment stays in front of the offset and is re-read once a later append
//! terminates it. Offsets therefore always lie on line boundaries.

use std::io;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::TailError;

/// Chunk size for the backward scan: 8KB.
const CHUNK_SIZE: u64 = 8 * 1024;

/// Read the last `n` terminated lines from a file, plus the byte offset a
/// live stream should continue from.
///
/// Strategy: seek to EOF, read backwards in 8KB chunks, count newlines.
/// Peak auxiliary memory is proportional to `n` lines plus one chunk,
/// independent of file size. Lines are returned in file order (oldest
/// first) with their LF/CRLF terminators stripped.
///
/// Edge cases:
/// - An empty file returns no lines and offset 0
/// - A file with fewer than `n` lines returns all of them
/// - An unterminated trailing fragment is never returned; the offset stops
///   before it
/// - `n == 0` returns no lines but still reports the live offset
pub async fn last_lines(path: &Path, n: usize) -> Result<(Vec<String>, u64), TailError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| TailError::io(path, e))?;
    let file_len = file
        .metadata()
        .await
        .map_err(|e| TailError::io(path, e))?
        .len();

    if file_len == 0 {
        return Ok((Vec::new(), 0));
    }

    // Read chunks from the end backward until n + 1 newlines are seen (the
    // extra one delimits the start of the oldest included line) or BOF is
    // reached.
    let mut collected: Vec<u8> = Vec::new();
    let mut remaining = file_len;
    let target_newlines = n + 1;
    let mut newline_count = 0usize;

    while remaining > 0 {
        let chunk_len = remaining.min(CHUNK_SIZE);
        let offset = remaining - chunk_len;

        file.seek(io::SeekFrom::Start(offset))
            .await
            .map_err(|e| TailError::io(path, e))?;

        let mut buf = vec![0u8; chunk_len as usize];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| TailError::io(path, e))?;

        newline_count += buf.iter().filter(|&&b| b == b'\n').count();

        // Prepend this chunk to the collected bytes.
        buf.append(&mut collected);
        collected = buf;

        remaining = offset;

        if newline_count >= target_newlines {
            break;
        }
    }

    // `collected` spans [remaining, file_len). Everything past its last
    // newline is an unterminated fragment and is not delivered.
    let last_newline = match collected.iter().rposition(|&b| b == b'\n') {
        Some(pos) => pos,
        // No terminator anywhere in the file: the whole file is one fragment.
        None => return Ok((Vec::new(), 0)),
    };
    let end_offset = remaining + last_newline as u64 + 1;

    let mut lines = split_lines(&collected[..=last_newline]);
    if lines.len() > n {
        lines.drain(..lines.len() - n);
    }

    Ok((lines, end_offset))
}

/// Read every terminated line whose terminator lies after byte `from`, plus
/// the new offset.
///
/// Returns lines in file order with terminators stripped. The offset only
/// advances past the last terminator seen; an incomplete trailing line is
/// not returned and will be picked up by a later call once it is complete.
/// If the file is no larger than `from` (including the shrunk-file edge),
/// no lines are returned and the file's current size is the new offset.
pub async fn lines_since(path: &Path, from: u64) -> Result<(Vec<String>, u64), TailError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| TailError::io(path, e))?;
    let file_len = file
        .metadata()
        .await
        .map_err(|e| TailError::io(path, e))?
        .len();

    if file_len <= from {
        return Ok((Vec::new(), file_len));
    }

    file.seek(io::SeekFrom::Start(from))
        .await
        .map_err(|e| TailError::io(path, e))?;
    let mut buf = Vec::with_capacity((file_len - from) as usize);
    file.read_to_end(&mut buf)
        .await
        .map_err(|e| TailError::io(path, e))?;

    let last_newline = match buf.iter().rposition(|&b| b == b'\n') {
        Some(pos) => pos,
        // Nothing terminated yet; don't advance.
        None => return Ok((Vec::new(), from)),
    };

    let lines = split_lines(&buf[..=last_newline]);
    Ok((lines, from + last_newline as u64 + 1))
}

/// Split a region ending in a newline into lines, stripping LF/CRLF.
///
/// Interior empty lines are real lines and are kept; only the empty
/// element after the final newline is dropped.
fn split_lines(region: &[u8]) -> Vec<String> {
    let mut lines: Vec<String> = region
        .split(|&b| b == b'\n')
        .map(|raw| {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            String::from_utf8_lossy(raw).into_owned()
        })
        .collect();
    lines.pop();
    lines
}
