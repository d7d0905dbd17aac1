//! Persists a [`GeneratedArtifactSet`] to disk.

use super::GeneratedArtifactSet;
use crate::error::{Result, ScaffoldError};
use std::path::PathBuf;

/// Files written for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenApplication {
    /// Freshly created `app_<uuid>` directory
    pub root: PathBuf,
    /// Every written file, in write order
    pub files: Vec<PathBuf>,
}

/// Writes generated applications below an output root.
///
/// Each call creates a new `app_<uuid>` directory, so concurrent requests
/// never share output. Files are written one after another; a failure
/// leaves what was already written in place.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_root: PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer for `output_root`, which is created on demand.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Writes every artifact of `set` into a new application directory.
    ///
    /// # Errors
    /// Returns an I/O error naming the first path that could not be created
    /// or written.
    pub async fn write(&self, set: &GeneratedArtifactSet) -> Result<WrittenApplication> {
        let root = self
            .output_root
            .join(format!("app_{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            ScaffoldError::io(format!("Failed to create '{}'", root.display()), e)
        })?;
        tracing::info!("Writing {} files to {}", set.len(), root.display());

        let mut files = Vec::with_capacity(set.len());
        for artifact in set.artifacts() {
            let path = artifact
                .path
                .split('/')
                .fold(root.clone(), |path, segment| path.join(segment));

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ScaffoldError::io(format!("Failed to create '{}'", parent.display()), e)
                })?;
            }
            tokio::fs::write(&path, &artifact.contents)
                .await
                .map_err(|e| ScaffoldError::io(format!("Failed to write '{}'", path.display()), e))?;

            tracing::debug!("Wrote {}", path.display());
            files.push(path);
        }

        tracing::info!("✓ Application written to {}", root.display());
        Ok(WrittenApplication { root, files })
    }
}
