use std::path::Path;

use crate::error::AnalysisError;
use crate::model::AudioBytes;

/// Where selected files are read from.
pub trait AudioSource {
    fn read(&self, file_name: &str) -> Result<AudioBytes, AnalysisError>;
}

/// Reads selections straight from the local filesystem.
pub struct FsSource;

impl AudioSource for FsSource {
    fn read(&self, file_name: &str) -> Result<AudioBytes, AnalysisError> {
        std::fs::read(file_name)
            .map(AudioBytes::new)
            .map_err(|e| AnalysisError::FileUnreadable {
                file: file_name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// The picker's extension filter: only `.wav` files can be selected.
///
/// Container contents are not inspected; a broken file with the right
/// extension is left for the backend to reject.
pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}
