//! Primary simulation archive: an append-only sequence of checkpoints.
//!
//! Each frame holds one `bincode`-encoded [`Simulation`], with strictly
//! increasing times. The last complete frame is the resume point.
//!
//! # Single writer
//! No locking is done; one process at a time may append to a given path.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ArchiveReadError, ArchiveWriteError};
use crate::simulation::engine::Simulation;

use super::codec;

/// Magic bytes identifying a simulation archive.
pub const MAGIC: [u8; 4] = *b"OSIM";

fn io_read(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveReadError + '_ {
    move |source| ArchiveReadError::Io { path: path.to_path_buf(), source }
}

fn io_write(path: &Path) -> impl FnOnce(std::io::Error) -> ArchiveWriteError + '_ {
    move |source| ArchiveWriteError::Io { path: path.to_path_buf(), source }
}

fn decode(path: &Path, payload: &[u8]) -> Result<Simulation, ArchiveReadError> {
    bincode::deserialize(payload).map_err(|e| ArchiveReadError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Open `path` and validate its header. Returns the file and its length.
fn open_archive(path: &Path) -> Result<(File, u64), ArchiveReadError> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ArchiveReadError::Missing { path: path.to_path_buf() });
        }
        Err(e) => return Err(io_read(path)(e)),
    };
    let len = file.metadata().map_err(io_read(path))?.len();
    if len == 0 {
        return Err(ArchiveReadError::Empty { path: path.to_path_buf() });
    }
    codec::read_header(&mut file, MAGIC).map_err(|e| ArchiveReadError::BadHeader {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok((file, len))
}

/// Load the most recent complete checkpoint in `path`.
///
/// Read-only: never creates or modifies the file.
pub fn read_latest(path: &Path) -> Result<Simulation, ArchiveReadError> {
    let (mut file, len) = open_archive(path)?;
    let last = codec::find_last_frame(&mut file, codec::HEADER_LEN, len).map_err(io_read(path))?;
    match last {
        Some(frame) => decode(path, &frame.payload),
        None => Err(ArchiveReadError::NoCompleteEntry { path: path.to_path_buf() }),
    }
}

/// Every complete checkpoint in `path`, oldest first.
pub fn read_all(path: &Path) -> Result<Vec<Simulation>, ArchiveReadError> {
    let (mut file, _) = open_archive(path)?;
    let mut payloads = Vec::new();
    codec::for_each_frame(&mut file, codec::HEADER_LEN, |payload, _| payloads.push(payload))
        .map_err(io_read(path))?;
    payloads.iter().map(|p| decode(path, p)).collect()
}

/// Resume from `path` if it holds a valid checkpoint.
///
/// Any read failure means "no state": the caller constructs a fresh
/// simulation instead.
pub fn try_resume(path: &Path) -> Option<Simulation> {
    match read_latest(path) {
        Ok(sim) => {
            info!(
                path = %path.display(),
                steps = sim.steps(),
                kappa = sim.perturbation().map(|p| p.eccentricity_scale),
                "found simulation archive, loaded snapshot at t={:.16}",
                sim.t()
            );
            Some(sim)
        }
        Err(ArchiveReadError::Missing { .. }) => {
            info!(path = %path.display(), "no simulation archive found, creating new simulation");
            None
        }
        Err(e) => {
            info!(error = %e, "simulation archive unusable, creating new simulation");
            None
        }
    }
}

/// Where [`set_aside_unusable`] moves an archive that cannot be resumed
pub fn corrupt_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".corrupt");
    PathBuf::from(name)
}

/// Move a primary archive that exists but cannot be resumed (foreign or
/// torn header, undecodable last entry) out of the writer's way.
///
/// Missing, empty and entry-less archives are left alone: the writer
/// reinitialises those itself. Returns the new location when a file was moved.
pub fn set_aside_unusable(path: &Path) -> Result<Option<PathBuf>, ArchiveWriteError> {
    match read_latest(path) {
        Err(ArchiveReadError::BadHeader { .. }) | Err(ArchiveReadError::Corrupt { .. }) => {}
        _ => return Ok(None),
    }
    let aside = corrupt_path_for(path);
    fs::rename(path, &aside).map_err(io_write(path))?;
    warn!(
        path = %path.display(),
        moved_to = %aside.display(),
        "simulation archive unusable, moved aside before starting fresh"
    );
    Ok(Some(aside))
}

/// Checkpoint writer: appends full-state frames to the primary archive.
///
/// The file is only created by the first [`append`](ArchiveWriter::append),
/// so a run that never reaches a checkpoint leaves nothing on disk.
pub struct ArchiveWriter {
    path: PathBuf,
    file: Option<File>,
    last_t: Option<f64>,
    written: u64,
}

impl ArchiveWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            last_t: None,
            written: 0,
        }
    }

    /// Checkpoints appended by this writer
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Time of the newest entry in the archive, once opened
    pub fn last_time(&self) -> Option<f64> {
        self.last_t
    }

    /// Append `sim` as a new checkpoint.
    ///
    /// Returns `Ok(false)` without writing when the archive already holds an
    /// entry at or after `sim.t()`.
    pub fn append(&mut self, sim: &Simulation) -> Result<bool, ArchiveWriteError> {
        if self.file.is_none() {
            self.open()?;
        }
        if let Some(last) = self.last_t {
            if sim.t() <= last {
                debug!(t = sim.t(), last, "checkpoint already written, skipping");
                return Ok(false);
            }
        }

        let payload = bincode::serialize(sim).map_err(|e| ArchiveWriteError::Encode(e.to_string()))?;
        let frame = codec::encode_frame(&payload).map_err(io_write(&self.path))?;

        let path = &self.path;
        let Some(file) = self.file.as_mut() else {
            return Err(io_write(path)(std::io::Error::new(ErrorKind::Other, "archive not open")));
        };
        file.write_all(&frame).map_err(io_write(path))?;
        file.flush().map_err(io_write(path))?;
        file.sync_data().map_err(io_write(path))?;

        self.last_t = Some(sim.t());
        self.written += 1;
        debug!(t = sim.t(), steps = sim.steps(), bytes = frame.len(), "checkpoint written");
        Ok(true)
    }

    /// Open for appending: create with a header, or validate an existing
    /// archive and cut off any torn tail left by a crash.
    fn open(&mut self) -> Result<(), ArchiveWriteError> {
        let path = self.path.clone();
        let existing_len = match fs::metadata(&path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(io_write(&path)(e)),
        };

        // shorter than a header: torn while the file was being created
        if existing_len < codec::HEADER_LEN {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(io_write(&path))?;
            }
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .map_err(io_write(&path))?;
            codec::write_header(&mut file, MAGIC).map_err(io_write(&path))?;
            file.sync_all().map_err(io_write(&path))?;
            info!(path = %path.display(), "created simulation archive");
            self.file = Some(file);
            self.last_t = None;
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_write(&path))?;
        codec::read_header(&mut file, MAGIC).map_err(|e| ArchiveWriteError::NotAnArchive {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let last = codec::find_last_frame(&mut file, codec::HEADER_LEN, existing_len)
            .map_err(io_write(&path))?;
        let (end, last_t) = match last {
            Some(frame) => {
                let sim: Simulation = bincode::deserialize(&frame.payload).map_err(|e| {
                    ArchiveWriteError::NotAnArchive { path: path.clone(), reason: e.to_string() }
                })?;
                (frame.end, Some(sim.t()))
            }
            None => (codec::HEADER_LEN, None),
        };

        if end < existing_len {
            warn!(
                path = %path.display(),
                dropped = existing_len - end,
                "truncating torn tail of simulation archive"
            );
            file.set_len(end).map_err(io_write(&path))?;
            file.sync_all().map_err(io_write(&path))?;
        }
        file.seek(SeekFrom::Start(end)).map_err(io_write(&path))?;

        self.file = Some(file);
        self.last_t = last_t;
        Ok(())
    }
}
