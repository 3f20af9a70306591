//! On-disk archives: the primary checkpoint archive and the coupled
//! effects archive.

pub mod codec;
pub mod effects_archive;
pub mod simulation_archive;

pub use effects_archive::{effects_path_for, load_effects, load_or_init_effects, write_effects};
pub use simulation_archive::{
    corrupt_path_for, read_all, read_latest, set_aside_unusable, try_resume, ArchiveWriter,
};
