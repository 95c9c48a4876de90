//! Splits reference records into bounded-length retrieval segments.
//!
//! Segments are char-counted windows with a fixed shared prefix between
//! consecutive windows of the same record, so no row loses content at a
//! chunk boundary. Output order is record order, then chunk order, which
//! makes chunking deterministic for identical input and parameters.

use crate::corpus::{ReferenceRecord, SourceTable};

/// A bounded-length slice of one record's text representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub source_table: SourceTable,
    /// Index of the originating record in the loaded corpus.
    pub record_position: usize,
    /// Chunk order within the record.
    pub chunk_position: usize,
    pub content: String,
    /// Chars shared with the previous segment of the same record.
    pub overlap_with_predecessor: usize,
}

/// Split every record into segments of at most `max_chunk_length` chars
/// with `overlap_length` chars shared between consecutive segments.
///
/// `overlap_length < max_chunk_length` is enforced by config validation.
pub fn chunk_records(
    records: &[ReferenceRecord],
    max_chunk_length: usize,
    overlap_length: usize,
) -> Vec<Segment> {
    let mut segments = Vec::new();

    for (record_position, record) in records.iter().enumerate() {
        let pieces = split_with_overlap(
            &record.text_representation,
            max_chunk_length,
            overlap_length,
        );
        for (chunk_position, content) in pieces.into_iter().enumerate() {
            segments.push(Segment {
                source_table: record.source_table,
                record_position,
                chunk_position,
                overlap_with_predecessor: if chunk_position == 0 {
                    0
                } else {
                    overlap_length
                },
                content,
            });
        }
    }

    segments
}

/// Split text into char-counted windows of at most `max_len`, each
/// sharing exactly `overlap` chars with its predecessor (the tail window
/// keeps whatever remains, never less than the overlap).
///
/// Config validation rejects `overlap >= max_len`, but callers with
/// hand-built parameters are still guaranteed termination: the overlap
/// is clamped so the window always advances by at least one char.
pub fn split_with_overlap(text: &str, max_len: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if max_len == 0 || chars.len() <= max_len {
        // A zero-length window cannot be honored; keep the text whole.
        return vec![text.to_string()];
    }

    let overlap = overlap.min(max_len - 1);
    let step = max_len - overlap;
    let mut pieces = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_len).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    pieces
}

// ── Tests ────────────────────────────────────────────────────────────
