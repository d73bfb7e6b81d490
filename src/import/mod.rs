use crate::error::{ParseError, PacersError, Result};
use crate::models::Track;
use std::path::Path;
use tracing::debug;

pub mod gpx;

pub use gpx::GpxLoader;

/// Trait for turning a structured activity file into a track
pub trait TrackLoader {
    /// Check if this loader can handle the given file
    fn can_load(&self, file_path: &Path) -> bool;

    /// Parse an in-memory document into an ordered track
    fn load(&self, bytes: &[u8]) -> Result<Track>;

    /// Get the format name for this loader
    fn format_name(&self) -> &'static str;
}

/// Read a file from disk and hand its bytes to `loader`
///
/// Returns the raw bytes alongside the track so callers can rewrite the
/// document (e.g. after downsampling) without reading it twice.
pub fn read_track_file<L: TrackLoader + ?Sized>(
    loader: &L,
    file_path: &Path,
) -> Result<(Vec<u8>, Track)> {
    if !file_path.exists() {
        return Err(PacersError::Parse(ParseError::FileNotFound {
            path: file_path.to_path_buf(),
        }));
    }

    let bytes = std::fs::read(file_path)?;
    debug!(
        file = %file_path.display(),
        bytes = bytes.len(),
        format = loader.format_name(),
        "Read activity file"
    );

    let track = loader.load(&bytes)?;
    Ok((bytes, track))
}
