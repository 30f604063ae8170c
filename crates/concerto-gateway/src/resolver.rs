//! Maps application names to repository directories.

use crate::config::{RepoLayout, RepositoryConfig};
use crate::error::GatewayError;
use std::path::PathBuf;

/// A repository directory known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    /// Application name from the URL.
    pub app: String,
    /// Repository directory handed to the Git subprocess.
    pub path: PathBuf,
}

/// Resolves application names under a repository root.
#[derive(Debug, Clone)]
pub struct RepositoryResolver {
    root: PathBuf,
    layout: RepoLayout,
    subdirectory: String,
}

impl RepositoryResolver {
    /// Creates a resolver for a root directory.
    pub fn new(root: impl Into<PathBuf>, repository: &RepositoryConfig) -> Self {
        Self {
            root: root.into(),
            layout: repository.layout,
            subdirectory: repository.subdirectory.clone(),
        }
    }

    /// Where the repository for `app` lives, whether or not it exists.
    pub fn path_for(&self, app: &str) -> PathBuf {
        match self.layout {
            RepoLayout::Nested => self.root.join(app).join(&self.subdirectory),
            RepoLayout::Suffix => self.root.join(format!("{app}.git")),
        }
    }

    /// Resolves `app`, failing with a 404 when no repository exists.
    ///
    /// The check is synchronous: it runs before any subprocess is spawned.
    pub fn resolve(&self, app: &str) -> Result<RepositoryHandle, GatewayError> {
        let path = self.path_for(app);
        if !path.is_dir() {
            tracing::debug!(app, path = %path.display(), "repository not found");
            return Err(GatewayError::AppNotFound(app.to_string()));
        }

        Ok(RepositoryHandle {
            app: app.to_string(),
            path,
        })
    }
}
