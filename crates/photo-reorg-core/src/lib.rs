//! Core functionality for reordering and renaming photos by capture date.
//!
//! This library provides the components of a reorganization run:
//! - Capture timestamp extraction from embedded metadata
//! - Staging of source files under temporary names, with rollback
//! - Deterministic ordering and destination name allocation
//! - Optional content rewriting (resize, date stamp, metadata patch)

// -- External Dependencies --

use log::info;

// -- Standard Library --

use std::path::Path;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use engine::ReorganizationEngine;
pub use error::{Error, Result};
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod discovery;
pub mod engine;
pub mod inspect;
pub mod logging;
pub mod metadata;
pub mod naming;
pub mod ordering;
pub mod processing;
pub mod safety;
pub mod staging;
pub mod types;

// -- Test Modules --
#[cfg(test)]
pub mod test_utils;

/// Main entry point for reorganizing a photo tree
pub struct PhotoReorganizer {
    config: Config,
    engine: ReorganizationEngine,
}

impl PhotoReorganizer {
    /// Create a new PhotoReorganizer with the provided configuration
    pub fn new(config: Config) -> Result<Self> {
        let engine = ReorganizationEngine::new(config.clone())?;
        Ok(Self { config, engine })
    }

    /// Run the full reorganization below `source`
    pub fn reorganize(&self, source: &Path) -> Result<RunReport> {
        info!("Reorganizing {}", source.display());
        self.engine.run(source)
    }

    /// Describe every file below `source` without touching it
    pub fn list(&self, source: &Path) -> Result<Vec<inspect::FileDescription>> {
        let descriptions = inspect::describe_tree(source, &self.config)?;
        info!("Described {} files", descriptions.len());
        Ok(descriptions)
    }
}
