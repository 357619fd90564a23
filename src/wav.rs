//! # WAV Header Validation
//!
//! Uploaded training samples must be WAV files. This module inspects the
//! leading bytes of an upload and decides whether they look like a RIFF/WAVE
//! container with a `fmt ` chunk.
//!
//! ## Header Layout (little-endian):
//! ```text
//! offset  size  field
//! 0       4     "RIFF"
//! 4       4     chunk size
//! 8       4     "WAVE"
//! 12      4     sub-chunk id ("fmt ")
//! 16      4     sub-chunk size
//! 20      16    format body (audio format, channels, sample rate, ...)
//! ```
//!
//! ## Known gap:
//! Sample rate, channel count and bit depth are parsed when present but are
//! NOT enforced. Only the container tags decide validity.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Number of bytes needed to make a validity decision.
pub const MIN_HEADER_LEN: usize = 20;

const RIFF_TAG: &[u8; 4] = b"RIFF";
const WAVE_TAG: &[u8; 4] = b"WAVE";
const FMT_TAG: &[u8; 4] = b"fmt ";

/// Parsed WAV header fields.
///
/// The format fields are only filled in when the upload is long enough to
/// contain the body of the `fmt ` chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub fmt_chunk_size: u32,
    pub format: Option<WavFormat>,
}

/// Contents of the `fmt ` chunk body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavFormat {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

/// Returns true if `data` starts with a minimal RIFF/WAVE/`fmt ` header.
///
/// Truncated input (fewer than 20 bytes) is expected client input and
/// yields `false` rather than an error.
pub fn is_valid_wav(data: &[u8]) -> bool {
    parse_header(data).is_some()
}

/// Parse the RIFF header, returning `None` if the tags are wrong or the
/// input is too short.
///
/// ## Rust Concepts:
/// - **Cursor + ReadBytesExt**: `byteorder` reads little-endian integers
///   straight from the byte slice, advancing the cursor as it goes
/// - **`.ok()?`**: turns each read error into an early `None`, so a short
///   buffer is just "not a WAV" rather than an error to handle
pub fn parse_header(data: &[u8]) -> Option<WavHeader> {
    if data.len() < MIN_HEADER_LEN {
        return None;
    }

    let mut cursor = Cursor::new(data);

    let riff = read_tag(&mut cursor)?;
    let riff_size = cursor.read_u32::<LittleEndian>().ok()?;
    let wave = read_tag(&mut cursor)?;
    if &riff != RIFF_TAG || &wave != WAVE_TAG {
        return None;
    }

    let subchunk_id = read_tag(&mut cursor)?;
    let fmt_chunk_size = cursor.read_u32::<LittleEndian>().ok()?;
    if &subchunk_id != FMT_TAG {
        return None;
    }

    Some(WavHeader {
        riff_size,
        fmt_chunk_size,
        format: read_format(&mut cursor),
    })
}

fn read_tag(cursor: &mut Cursor<&[u8]>) -> Option<[u8; 4]> {
    let mut tag = [0u8; 4];
    cursor.read_exact(&mut tag).ok()?;
    Some(tag)
}

// Any short read means the body is absent; that is not a validity failure.
fn read_format(cursor: &mut Cursor<&[u8]>) -> Option<WavFormat> {
    Some(WavFormat {
        audio_format: cursor.read_u16::<LittleEndian>().ok()?,
        channels: cursor.read_u16::<LittleEndian>().ok()?,
        sample_rate: cursor.read_u32::<LittleEndian>().ok()?,
        byte_rate: cursor.read_u32::<LittleEndian>().ok()?,
        block_align: cursor.read_u16::<LittleEndian>().ok()?,
        bits_per_sample: cursor.read_u16::<LittleEndian>().ok()?,
    })
}

/// Build a canonical 44-byte PCM WAV header followed by `samples`.
/// Used by tests across the crate.
#[cfg(test)]
pub(crate) fn pcm_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    use byteorder::WriteBytesExt;

    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(RIFF_TAG);
    out.write_u32::<LittleEndian>(36 + data_len).unwrap();
    out.extend_from_slice(WAVE_TAG);
    out.extend_from_slice(FMT_TAG);
    out.write_u32::<LittleEndian>(16).unwrap();
    out.write_u16::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(channels).unwrap();
    out.write_u32::<LittleEndian>(sample_rate).unwrap();
    out.write_u32::<LittleEndian>(sample_rate * channels as u32 * 2).unwrap();
    out.write_u16::<LittleEndian>(channels * 2).unwrap();
    out.write_u16::<LittleEndian>(16).unwrap();
    out.extend_from_slice(b"data");
    out.write_u32::<LittleEndian>(data_len).unwrap();
    for sample in samples {
        out.write_i16::<LittleEndian>(*sample).unwrap();
    }
    out
}
