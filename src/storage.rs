//! # Temporary File Management
//!
//! Every training request writes its uploads to the temp directory and
//! reserves one more path for the model the training tool produces. All of
//! those paths belong to the request and must be gone by the time the
//! response is sent.
//!
//! ## Lifecycle:
//! 1. [`TempFileSet::reserve`] picks N+1 fresh absolute paths
//! 2. [`TempFileSet::persist`] writes the uploads to the first N
//! 3. The training tool writes its model to [`TempFileSet::output`]
//! 4. [`TempFileSet::cleanup`] (or `Drop`) removes whatever exists
//!
//! Dropping the set always cleans up, so early returns and abandoned
//! requests cannot leak files.
//!
//! ## Uniqueness:
//! Names are UUID v7 tokens checked for non-existence. Inputs are then
//! opened with exclusive create, so a name collision fails the write rather
//! than overwriting another request's file. The output slot stays a
//! best-effort reservation because the training tool creates it.

use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};
use uuid::Uuid;

/// Generate `n` distinct absolute paths under `dir`, none of which exist.
///
/// `dir` is created if missing.
pub async fn generate_paths(dir: &Path, n: usize) -> io::Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let dir = tokio::fs::canonicalize(dir).await?;

    let mut paths: Vec<PathBuf> = Vec::with_capacity(n);
    while paths.len() < n {
        let candidate = dir.join(Uuid::now_v7().to_string());
        if !paths.contains(&candidate) && !tokio::fs::try_exists(&candidate).await? {
            paths.push(candidate);
        }
    }
    Ok(paths)
}

/// Write each blob to its path. Stops at the first failure.
pub async fn persist(paths: &[PathBuf], contents: &[impl AsRef<[u8]>]) -> io::Result<()> {
    if contents.len() > paths.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} uploads but only {} paths", contents.len(), paths.len()),
        ));
    }

    for (path, data) in paths.iter().zip(contents) {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(data.as_ref()).await?;
        file.flush().await?;
        debug!(path = %path.display(), bytes = data.as_ref().len(), "Upload persisted");
    }
    Ok(())
}

/// Delete every path that exists. Failures are logged, never returned.
pub async fn cleanup(paths: &[PathBuf]) {
    for path in paths {
        log_removal(path, tokio::fs::remove_file(path).await);
    }
}

fn log_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => debug!(path = %path.display(), "Temp file removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => error!(path = %path.display(), error = %e, "Unable to delete temp file"),
    }
}

/// The temp paths owned by one training request.
///
/// The last path is the model output slot; the rest are inputs.
///
/// ## Rust Concepts:
/// - **RAII**: the set owns its paths, and `Drop` removes them. Any `?` or
///   early return in the handler therefore cleans up without extra code.
/// - **Consuming `self`**: [`TempFileSet::cleanup`] takes the set by value,
///   so it cannot be used after its files are gone.
///
/// ## Why both `cleanup` and `Drop`:
/// `Drop` cannot await, so it falls back to blocking deletes. It only runs
/// for files that are still listed, which on the normal path is none.
#[derive(Debug)]
pub struct TempFileSet {
    paths: Vec<PathBuf>,
}

impl TempFileSet {
    /// Reserve `inputs` input paths plus one output path under `dir`.
    pub async fn reserve(dir: &Path, inputs: usize) -> io::Result<Self> {
        Ok(Self {
            paths: generate_paths(dir, inputs + 1).await?,
        })
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.paths[..self.paths.len() - 1]
    }

    pub fn output(&self) -> &Path {
        &self.paths[self.paths.len() - 1]
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub async fn persist(&self, contents: &[impl AsRef<[u8]>]) -> io::Result<()> {
        persist(self.inputs(), contents).await
    }

    /// Remove all files now. Dropping the set afterwards is a no-op.
    pub async fn cleanup(mut self) {
        cleanup(&self.paths).await;
        self.paths.clear();
    }
}

impl Drop for TempFileSet {
    fn drop(&mut self) {
        for path in &self.paths {
            log_removal(path, std::fs::remove_file(path));
        }
    }
}
