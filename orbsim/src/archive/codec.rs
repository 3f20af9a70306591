//! Binary framing for archive files.
//!
//! Every archive starts with a header and is followed by frames:
//! ```text
//! [magic: 4 bytes][version: 1 byte]
//! [version: 1][len: 4 LE][payload: len][crc32: 4 LE][len: 4 LE][trailer: 4]
//! [version: 1][len: 4 LE][payload: len][crc32: 4 LE][len: 4 LE][trailer: 4]
//! ...
//! ```
//! The trailing length lets a reader locate the last frame from the end of
//! the file without scanning. A frame torn by a crash fails the trailer or
//! CRC check and is ignored, so the last complete frame stays readable.

use std::io::{BufReader, Error as IoError, ErrorKind, Read, Result as IoResult, Seek, SeekFrom, Write};

use crc32fast::Hasher;

/// Current codec version (header and frames).
pub const CODEC_VERSION: u8 = 1;

/// Magic + version.
pub const HEADER_LEN: u64 = 5;

/// Marker closing every complete frame.
pub const TRAILER: [u8; 4] = *b"OSNP";

/// Bytes a frame adds around its payload.
pub const FRAME_OVERHEAD: u64 = 1 + 4 + 4 + 4 + 4;

/// Frames above this size are rejected as corrupt (256 MiB).
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Write the file header (magic + version).
pub fn write_header(writer: &mut impl Write, magic: [u8; 4]) -> IoResult<()> {
    writer.write_all(&magic)?;
    writer.write_all(&[CODEC_VERSION])?;
    Ok(())
}

/// Read and validate the file header.
pub fn read_header(reader: &mut impl Read, magic: [u8; 4]) -> IoResult<u8> {
    let mut found = [0u8; 4];
    reader.read_exact(&mut found)?;
    if found != magic {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("invalid magic bytes: expected {:?}, got {:?}", magic, found),
        ));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != CODEC_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("unsupported archive version: {} (expected {})", version[0], CODEC_VERSION),
        ));
    }
    Ok(version[0])
}

/// Wrap a payload in a checksummed frame.
pub fn encode_frame(payload: &[u8]) -> IoResult<Vec<u8>> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(IoError::new(
            ErrorKind::InvalidInput,
            format!("entry size {} exceeds maximum {}", payload.len(), MAX_FRAME_SIZE),
        ));
    }
    let len = (payload.len() as u32).to_le_bytes();

    let mut hasher = Hasher::new();
    hasher.update(payload);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(payload.len() + FRAME_OVERHEAD as usize);
    out.push(CODEC_VERSION);
    out.extend_from_slice(&len);
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&len);
    out.extend_from_slice(&TRAILER);
    Ok(out)
}

/// Read one frame. Returns `Ok(None)` on a clean end of input (no byte of
/// a new frame present); a partial or corrupt frame is an error.
pub fn decode_frame(reader: &mut impl Read) -> IoResult<Option<Vec<u8>>> {
    let mut version = [0u8; 1];
    if reader.read(&mut version)? == 0 {
        return Ok(None);
    }
    if version[0] != CODEC_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("unsupported frame version: {} (expected {})", version[0], CODEC_VERSION),
        ));
    }

    let len = read_u32(reader)? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("entry size {} exceeds maximum {}", len, MAX_FRAME_SIZE),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    let stored_crc = read_u32(reader)?;
    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let computed_crc = hasher.finalize();
    if stored_crc != computed_crc {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!(
                "CRC mismatch: stored={:08x}, computed={:08x} (data corrupted)",
                stored_crc, computed_crc
            ),
        ));
    }

    let tail_len = read_u32(reader)? as usize;
    let mut trailer = [0u8; 4];
    reader.read_exact(&mut trailer)?;
    if tail_len != len || trailer != TRAILER {
        return Err(IoError::new(ErrorKind::InvalidData, "frame trailer mismatch"));
    }

    Ok(Some(payload))
}

fn read_u32(reader: &mut impl Read) -> IoResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// The last complete frame of a file and the offset just past it.
#[derive(Debug)]
pub struct LastFrame {
    pub payload: Vec<u8>,
    pub end: u64,
}

/// Locate the last complete frame between `start` (just past the header)
/// and `len` (the file length).
///
/// Tries the trailer at the end of the file first; if the tail is torn or
/// corrupt, falls back to a forward scan that stops at the first bad frame.
pub fn find_last_frame<R: Read + Seek>(file: &mut R, start: u64, len: u64) -> IoResult<Option<LastFrame>> {
    if let Some(payload) = read_tail_frame(file, start, len)? {
        return Ok(Some(LastFrame { payload, end: len }));
    }

    let mut last = None;
    for_each_frame(file, start, |payload, end| {
        last = Some(LastFrame { payload, end });
    })?;
    Ok(last)
}

/// Call `f(payload, end_offset)` for every complete frame from `start`,
/// stopping silently at the first torn or corrupt one.
/// Returns the offset just past the last complete frame.
pub fn for_each_frame<R: Read + Seek>(
    file: &mut R,
    start: u64,
    mut f: impl FnMut(Vec<u8>, u64),
) -> IoResult<u64> {
    file.seek(SeekFrom::Start(start))?;
    let mut reader = BufReader::new(file);
    let mut end = start;
    loop {
        match decode_frame(&mut reader) {
            Ok(Some(payload)) => {
                end += payload.len() as u64 + FRAME_OVERHEAD;
                f(payload, end);
            }
            Ok(None) => break,
            Err(e) if matches!(e.kind(), ErrorKind::InvalidData | ErrorKind::UnexpectedEof) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(end)
}

fn read_tail_frame<R: Read + Seek>(file: &mut R, start: u64, len: u64) -> IoResult<Option<Vec<u8>>> {
    if len < start + FRAME_OVERHEAD {
        return Ok(None);
    }
    file.seek(SeekFrom::Start(len - 8))?;
    let payload_len = read_u32(file)? as u64;
    let mut trailer = [0u8; 4];
    file.read_exact(&mut trailer)?;
    if trailer != TRAILER || payload_len + FRAME_OVERHEAD > len - start {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(len - payload_len - FRAME_OVERHEAD))?;
    match decode_frame(file) {
        Ok(Some(payload)) => Ok(Some(payload)),
        Ok(None) => Ok(None),
        Err(e) if matches!(e.kind(), ErrorKind::InvalidData | ErrorKind::UnexpectedEof) => Ok(None),
        Err(e) => Err(e),
    }
}
