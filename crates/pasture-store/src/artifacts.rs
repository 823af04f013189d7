use std::path::{Path, PathBuf};

use pasture_core::error::AppError;
use pasture_core::traits::ArtifactStore;

use crate::fs::write_atomic;

/// Writes Markdown artifacts to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStore;

impl FsArtifactStore {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactStore for FsArtifactStore {
    async fn write(&self, path: &Path, contents: &str) -> Result<PathBuf, AppError> {
        let target = path.to_path_buf();
        let bytes = contents.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes).map(|()| target))
            .await
            .map_err(|e| AppError::Generic(format!("Artifact writer panicked: {e}")))?
    }
}
