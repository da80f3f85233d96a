//! Deployment context emitter and reader
//!
//! The provisioning run leaves a [`DeploymentContext`] at a well-known path;
//! the application stage finds it from the repository root or a subfolder.

use crate::error::{OrchestratorError, Result};
use rigging_types::{DeploymentContext, CONTEXT_FILE_NAME};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Writes the context atomically into a directory
#[derive(Debug, Clone)]
pub struct ContextEmitter {
    dir: PathBuf,
}

impl ContextEmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONTEXT_FILE_NAME)
    }

    /// Replace any previous context. Readers see the old file or the new one,
    /// never a partial write.
    #[instrument(skip(self, context), fields(resource_group = %context.resource_group))]
    pub fn emit(&self, context: &DeploymentContext) -> Result<PathBuf> {
        context.validate()?;
        let target = self.path();
        let body = serde_json::to_string_pretty(context)?;

        let mut staging = tempfile::Builder::new()
            .prefix(".deployment-context")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        staging.write_all(body.as_bytes())?;
        staging.write_all(b"\n")?;
        staging.as_file().sync_all()?;
        staging.persist(&target).map_err(|e| e.error)?;

        info!(path = %target.display(), deployed_gen_ai = context.deployed_gen_ai, "Deployment context written");
        Ok(target)
    }
}

/// Candidate locations, in search order.
///
/// A relative `start` is resolved against the working directory first, so
/// `.` still has a parent to search.
pub fn context_search_paths(start: &Path) -> Result<Vec<PathBuf>> {
    let start = std::path::absolute(start)?;
    let mut paths = vec![start.join(CONTEXT_FILE_NAME)];
    if let Some(parent) = start.parent() {
        paths.push(parent.join(CONTEXT_FILE_NAME));
    }
    Ok(paths)
}

/// Find and load the context from `start` or its parent
pub fn load_context(start: &Path) -> Result<(PathBuf, DeploymentContext)> {
    for candidate in context_search_paths(start)? {
        debug!(path = %candidate.display(), "Looking for deployment context");
        if !candidate.is_file() {
            continue;
        }
        let body = std::fs::read_to_string(&candidate)?;
        let context: DeploymentContext = serde_json::from_str(&body)?;
        context.validate()?;
        return Ok((candidate, context));
    }

    Err(OrchestratorError::ContextNotFound {
        searched: start.to_path_buf(),
    })
}
