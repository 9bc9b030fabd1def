//! Directory-level reorganization.
//!
//! Each directory is one rollback scope. Its files go through
//! `Listing -> Staging -> Ordering -> Allocating -> Committing`; an error in
//! any phase restores every entry still staged at that level and is returned
//! to the parent level, which aborts in turn. Subdirectories are processed
//! before their parent's files, so a parent never has staged files while a
//! child runs.

mod commit;
mod prune;

use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, Transfer};
use crate::discovery::{list_directory, Listing};
use crate::error::{Error, Result};
use crate::metadata::{ExifReader, ExifWriter, MetadataReader, MetadataResolver, MetadataWriter};
use crate::naming::{DestinationNamespace, NameAllocator};
use crate::ordering::OrderingPolicy;
use crate::processing::{ImagePipeline, ImageTransform};
use crate::safety::{Roots, SafetyManager};
use crate::staging::{Restoration, StagingArea};
use crate::types::{Batch, Entry, EntryState, RunReport};

/// Phase of a directory level, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Listing,
    Staging,
    Ordering,
    Allocating,
    Committing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Listing => "listing",
            Phase::Staging => "staging",
            Phase::Ordering => "ordering",
            Phase::Allocating => "allocating",
            Phase::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Fixed facts about the current run
struct RunContext {
    roots: Roots,
    transfer: Transfer,
}

/// Per-level bookkeeping that outlives a single entry
struct Level {
    batch: Batch,
    staging: StagingArea,
    namespace: DestinationNamespace,

    /// Files the engine left in place or put back; never pruned
    protected: Vec<PathBuf>,
    phase: Phase,
}

/// Moves a tree of photos into its ordered, renamed layout
pub struct ReorganizationEngine {
    config: Config,
    resolver: MetadataResolver,
    writer: Box<dyn MetadataWriter>,
    transform: Option<Box<dyn ImageTransform>>,
    ordering: OrderingPolicy,
    allocator: NameAllocator,
}

impl ReorganizationEngine {
    /// Create an engine reading and writing EXIF metadata
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let transform: Option<Box<dyn ImageTransform>> = if config.has_transforms() {
            Some(Box::new(ImagePipeline::from_config(&config)))
        } else {
            None
        };

        Ok(Self {
            resolver: MetadataResolver::new(Box::new(ExifReader), config.fix_date),
            writer: Box::new(ExifWriter),
            transform,
            ordering: OrderingPolicy::from_config(&config),
            allocator: NameAllocator::from_config(&config),
            config,
        })
    }

    /// Replace the source of capture timestamps
    pub fn with_reader(mut self, reader: impl MetadataReader + 'static) -> Self {
        self.resolver = MetadataResolver::new(Box::new(reader), self.config.fix_date);
        self
    }

    /// Replace the writer used to patch fallback timestamps
    pub fn with_writer(mut self, writer: impl MetadataWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    /// Route committed bytes through `transform`
    pub fn with_transform(mut self, transform: impl ImageTransform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Reorganize `source` and everything below it
    pub fn run(&self, source: &Path) -> Result<RunReport> {
        let roots = SafetyManager::new(&self.config).prepare_roots(source)?;
        let transfer = self.config.effective_transfer(roots.same());

        info!(
            "Reorganizing {} -> {} ({:?})",
            roots.source.display(),
            roots.destination.display(),
            transfer
        );

        let context = RunContext { roots, transfer };
        let mut report = RunReport::default();
        self.process_directory(
            &context,
            &context.roots.source,
            &context.roots.destination,
            &mut report,
        )?;

        info!(
            "Done: {} committed, {} unchanged, {} skipped in {} directories",
            report.committed, report.unchanged, report.skipped, report.directories
        );
        Ok(report)
    }

    fn process_directory(
        &self,
        context: &RunContext,
        source_dir: &Path,
        dest_dir: &Path,
        report: &mut RunReport,
    ) -> Result<()> {
        debug!("Processing directory: {}", source_dir.display());

        let listing = fs::create_dir_all(dest_dir)
            .map_err(Error::from)
            .and_then(|_| list_directory(source_dir, &self.config.hidden_prefix))
            .map_err(|e| {
                error!("{} failed in {}: {}", Phase::Listing, source_dir.display(), e);
                Error::Directory {
                    path: source_dir.to_path_buf(),
                    source: Box::new(e),
                }
            })?;

        for subdirectory in &listing.directories {
            if *subdirectory == context.roots.destination {
                debug!("Not descending into destination {}", subdirectory.display());
                continue;
            }
            let Some(name) = subdirectory.file_name() else {
                continue;
            };

            if let Err(e) = self.process_directory(context, subdirectory, &dest_dir.join(name), report) {
                error!("Error while processing directory {}: {}", source_dir.display(), e);
                return Err(e);
            }
        }

        let mut level = self.open_level(source_dir, dest_dir, &listing);

        if let Err(e) = self.reorganize(context, &mut level, report) {
            self.roll_back(&mut level, &e);
            return Err(Error::Directory {
                path: source_dir.to_path_buf(),
                source: Box::new(e),
            });
        }

        if self.config.prune {
            let keep = self.prune_keep_set(context, &level, dest_dir);
            report.pruned += prune::prune_directory(dest_dir, &keep, &self.config.hidden_prefix);
        }

        report.directories += 1;
        debug!(
            "Finished {}: {} entries",
            source_dir.display(),
            level.batch.len()
        );
        Ok(())
    }

    fn open_level(&self, source_dir: &Path, dest_dir: &Path, listing: &Listing) -> Level {
        let entries = listing
            .files
            .iter()
            .map(|path| {
                let resolution = self.resolver.resolve(path);
                Entry::new(path.clone(), resolution.timestamp, resolution.source)
            })
            .collect();

        // Mirrored subdirectories occupy their names in the destination
        let mut namespace = DestinationNamespace::new(dest_dir);
        for directory in &listing.directories {
            if let Some(name) = directory.file_name() {
                namespace.reserve(name);
            }
        }

        Level {
            batch: Batch::new(source_dir.to_path_buf(), entries),
            staging: StagingArea::new(),
            namespace,
            protected: Vec::new(),
            phase: Phase::Listing,
        }
    }

    fn reorganize(&self, context: &RunContext, level: &mut Level, report: &mut RunReport) -> Result<()> {
        level.phase = Phase::Staging;
        match context.transfer {
            Transfer::Move => {
                for entry in level.batch.entries.iter_mut() {
                    let staged = level.staging.stage(entry.original_path())?;
                    entry.mark_staged(staged);
                }
            }
            // Unstaged sources sharing the destination keep their names
            Transfer::Copy if context.roots.same() => {
                for entry in &level.batch.entries {
                    level.namespace.occupy(entry.file_name());
                }
            }
            Transfer::Copy => {}
        }

        level.phase = Phase::Ordering;
        self.ordering.sort(&mut level.batch.entries);

        level.phase = Phase::Allocating;
        let mut finals = Vec::with_capacity(level.batch.len());
        for (index, entry) in level.batch.entries.iter_mut().enumerate() {
            let final_path = self.allocator.allocate(index + 1, entry, &mut level.namespace)?;
            entry.assign_final(final_path.clone());
            finals.push(final_path);
        }

        level.phase = Phase::Committing;
        for (entry, final_path) in level.batch.entries.iter_mut().zip(finals) {
            self.commit_entry(
                context,
                entry,
                final_path,
                &mut level.staging,
                &mut level.protected,
                report,
            )?;
        }

        Ok(())
    }

    /// Restore every entry of this level that is still staged
    fn roll_back(&self, level: &mut Level, cause: &Error) {
        error!(
            "{} failed in {}, rolling back {} staged entries: {}",
            level.phase,
            level.batch.directory.display(),
            level.batch.staged().count(),
            cause
        );

        for restoration in level.staging.rollback_all() {
            match &restoration {
                Restoration::Restored(path) => debug!("Restored {}", path.display()),
                Restoration::Relocated(path) => {
                    warn!("Restored to a different name: {}", path.display())
                }
                Restoration::Stranded { path, error } => error!(
                    "Could not restore {}, file left in place: {}",
                    path.display(),
                    error
                ),
            }
        }

        for entry in level.batch.entries.iter_mut() {
            if entry.state() == EntryState::Staged {
                entry.mark_rolled_back();
            }
        }
    }

    /// Names in `dest_dir` that the prune step must leave alone
    fn prune_keep_set(&self, context: &RunContext, level: &Level, dest_dir: &Path) -> HashSet<OsString> {
        let mut keep: HashSet<OsString> = level
            .namespace
            .names()
            .map(|name| name.to_os_string())
            .collect();

        if context.roots.same() {
            keep.extend(level.batch.entries.iter().map(|e| e.file_name().to_os_string()));
        }

        keep.extend(
            level
                .protected
                .iter()
                .filter(|path| path.parent() == Some(dest_dir))
                .filter_map(|path| path.file_name().map(|name| name.to_os_string())),
        );

        keep
    }
}
