//! Project discovery and directory layout
//!
//! A project is any directory containing a `.pst/` marker. Commands walk up
//! from the current directory to find it, the same way git finds its repo.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Marker directory identifying a project root
const PROJECT_DIR: &str = ".pst";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not inside a pst project (no .pst directory found). Run 'pst init' first")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to a discovered project root.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Walk upward from the current directory until a `.pst/` marker is found.
    pub fn discover() -> Result<Self, ProjectError> {
        let cwd = std::env::current_dir()?;
        Self::discover_from(&cwd)
    }

    /// Walk upward from the given directory.
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut dir = start;
        loop {
            if dir.join(PROJECT_DIR).is_dir() {
                return Ok(Self {
                    root: dir.to_path_buf(),
                });
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Err(ProjectError::NotFound),
            }
        }
    }

    /// Create the project skeleton under the given root.
    pub fn init(root: &Path) -> Result<Self, ProjectError> {
        for dir in [
            PROJECT_DIR,
            "catalog",
            "stock/entries",
            "stock/batches",
            "items",
        ] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(PROJECT_DIR).join("config.yaml")
    }

    pub fn team_path(&self) -> PathBuf {
        self.root.join(PROJECT_DIR).join("team.yaml")
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.root.join("catalog")
    }

    pub fn stock_entries_dir(&self) -> PathBuf {
        self.root.join("stock/entries")
    }

    pub fn stock_batches_dir(&self) -> PathBuf {
        self.root.join("stock/batches")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("stock/ledger.jsonl")
    }

    pub fn items_dir(&self) -> PathBuf {
        self.root.join("items")
    }
}
