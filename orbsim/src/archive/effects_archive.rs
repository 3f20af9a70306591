//! Effects archive: a create-once record of the run's effect parameters.
//!
//! The path is derived from the primary archive (`<primary>.effects`) so a
//! resumed run always finds the effects it started with. Once written, the
//! stored values are authoritative; a changed default builder does not
//! migrate them.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ArchiveReadError, ArchiveWriteError};
use crate::simulation::effects::EffectSet;

use super::codec;

/// Magic bytes identifying an effects archive.
pub const MAGIC: [u8; 4] = *b"OSFX";

/// Effects archive path belonging to a primary archive path
pub fn effects_path_for(primary: &Path) -> PathBuf {
    let mut name = OsString::from(primary.as_os_str());
    name.push(".effects");
    PathBuf::from(name)
}

/// Load the effect set stored at `path`.
pub fn load_effects(path: &Path) -> Result<EffectSet, ArchiveReadError> {
    let io_err = |source| ArchiveReadError::Io { path: path.to_path_buf(), source };

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ArchiveReadError::Missing { path: path.to_path_buf() });
        }
        Err(e) => return Err(io_err(e)),
    };
    let len = file.metadata().map_err(io_err)?.len();
    if len == 0 {
        return Err(ArchiveReadError::Empty { path: path.to_path_buf() });
    }
    codec::read_header(&mut file, MAGIC).map_err(|e| ArchiveReadError::BadHeader {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let frame = codec::find_last_frame(&mut file, codec::HEADER_LEN, len)
        .map_err(|source| ArchiveReadError::Io { path: path.to_path_buf(), source })?
        .ok_or_else(|| ArchiveReadError::NoCompleteEntry { path: path.to_path_buf() })?;

    bincode::deserialize(&frame.payload).map_err(|e| ArchiveReadError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write `effects` to `path` through a temporary file and a rename, so a
/// reader sees either nothing or the complete archive.
pub fn write_effects(path: &Path, effects: &EffectSet) -> Result<(), ArchiveWriteError> {
    let io_err = |source| ArchiveWriteError::Io { path: path.to_path_buf(), source };

    let payload = bincode::serialize(effects).map_err(|e| ArchiveWriteError::Encode(e.to_string()))?;
    let frame = codec::encode_frame(&payload).map_err(io_err)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp_name = OsString::from(path.as_os_str());
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp)
        .map_err(io_err)?;
    codec::write_header(&mut file, MAGIC).map_err(io_err)?;
    file.write_all(&frame).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Load the effects at `path`, or build them with `default_builder`,
/// persist them and return them.
pub fn load_or_init_effects(
    path: &Path,
    default_builder: impl FnOnce() -> EffectSet,
) -> Result<EffectSet, ArchiveWriteError> {
    match load_effects(path) {
        Ok(effects) => {
            info!(path = %path.display(), effects = effects.effects.len(), "found effects archive");
            return Ok(effects);
        }
        Err(ArchiveReadError::Missing { .. }) => {
            info!(path = %path.display(), "no effects archive found, creating new effects");
        }
        Err(e) => {
            warn!(error = %e, "effects archive unusable, replacing it with new effects");
        }
    }

    let effects = default_builder();
    write_effects(path, &effects)?;
    Ok(effects)
}
