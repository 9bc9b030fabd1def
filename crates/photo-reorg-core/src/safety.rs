use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};

/// Canonical source and destination roots of one run
#[derive(Debug, Clone)]
pub struct Roots {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Roots {
    pub fn same(&self) -> bool {
        self.source == self.destination
    }
}

/// Checks the roots of a run before anything on disk is touched
pub struct SafetyManager {
    config: Config,
}

impl SafetyManager {
    /// Create a new SafetyManager with the provided configuration
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Resolve both roots, creating the destination if needed.
    ///
    /// Fails if the source is not a directory, or if pruning is enabled and
    /// the source lies inside the destination (the prune step would see the
    /// source tree as extraneous).
    pub fn prepare_roots(&self, source: &Path) -> Result<Roots> {
        if !source.is_dir() {
            return Err(Error::FileNotFound(source.to_path_buf()));
        }
        let source = fs::canonicalize(source)?;

        let destination = match &self.config.destination {
            Some(destination) => {
                if destination.exists() && !destination.is_dir() {
                    return Err(Error::SafetyCheck(format!(
                        "Destination is not a directory: {}",
                        destination.display()
                    )));
                }
                fs::create_dir_all(destination)?;
                fs::canonicalize(destination)?
            }
            None => source.clone(),
        };

        if self.config.prune && source != destination && source.starts_with(&destination) {
            return Err(Error::SafetyCheck(format!(
                "Refusing to prune {}: it contains the source {}",
                destination.display(),
                source.display()
            )));
        }

        Ok(Roots {
            source,
            destination,
        })
    }
}
