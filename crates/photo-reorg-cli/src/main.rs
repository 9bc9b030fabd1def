use anyhow::{anyhow, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use photo_reorg_core::config::LogLevel;
use photo_reorg_core::logging::{default_log_dir, init_file_logger};
use photo_reorg_core::{
    parse_timestamp, CaptureTimestamp, Config, Direction, ExistingPolicy, NamingMode,
    PhotoReorganizer, Transfer, UndatedPlacement,
};

#[derive(Parser)]
#[command(name = "photo-reorg")]
#[command(about = "Reorder and rename photos by capture date")]
#[command(version, args_conflicts_with_subcommands = true, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "photo-reorg.json")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Directory to reorganize
    #[arg(conflicts_with = "src")]
    source: Option<PathBuf>,

    /// Directory to reorganize
    #[arg(short, long, value_name = "DIR")]
    src: Option<PathBuf>,

    /// Destination directory (defaults to the source)
    #[arg(short, long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// Name files after their capture date
    #[arg(long)]
    rename: bool,

    /// Number files in capture order, zero-padded to WIDTH digits
    #[arg(long, value_name = "WIDTH", num_args = 0..=1, require_equals = true, default_missing_value = "4")]
    sequence: Option<usize>,

    /// Leave the date out of sequence names
    #[arg(long, requires = "sequence")]
    no_sequence_date: bool,

    /// Newest first
    #[arg(long)]
    descending: bool,

    /// Put files without a capture date before dated ones
    #[arg(long)]
    undated_first: bool,

    /// Draw the capture date into each image
    #[arg(long)]
    stamp: bool,

    /// Scale images down so the longer side is at most SIZE pixels
    #[arg(long, value_name = "SIZE", num_args = 0..=1, require_equals = true, default_missing_value = "1900")]
    resize: Option<u32>,

    /// Capture date for files without one, written into their metadata
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    fixdate: Option<CaptureTimestamp>,

    /// Replace existing destination files
    #[arg(long)]
    overwrite: bool,

    /// Pick a new name instead of skipping existing destination files
    #[arg(long, conflicts_with = "overwrite")]
    keep_both: bool,

    /// Delete destination files that this run did not produce
    #[arg(long)]
    delete: bool,

    /// Print each file's capture date and exit without changing anything
    #[arg(long)]
    list: bool,

    /// Move files even when the destination differs from the source
    #[arg(long = "move", conflicts_with = "copy")]
    move_files: bool,

    /// Copy files even when reorganizing in place
    #[arg(long)]
    copy: bool,

    /// Verbosity level
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write a rotating log file, by default to the user data directory
    #[arg(long, value_name = "DIR", num_args = 0..=1, require_equals = true)]
    log_dir: Option<Option<PathBuf>>,
}

impl RunArgs {
    /// Override config with command line arguments
    fn apply(&self, config: &mut Config) {
        if let Some(dest) = &self.dest {
            config.destination = Some(dest.clone());
        }

        if self.rename {
            config.naming = NamingMode::Date;
        }
        if let Some(width) = self.sequence {
            config.naming = NamingMode::Sequence;
            config.sequence_width = width;
        }
        if self.no_sequence_date {
            config.sequence_with_date = false;
        }

        if self.descending {
            config.direction = Direction::Descending;
        }
        if self.undated_first {
            config.undated = UndatedPlacement::First;
        }

        if self.stamp {
            config.stamp = true;
        }
        if self.resize.is_some() {
            config.resize = self.resize;
        }
        if self.fixdate.is_some() {
            config.fix_date = self.fixdate;
        }

        if self.overwrite {
            config.on_existing = ExistingPolicy::Overwrite;
        }
        if self.keep_both {
            config.on_existing = ExistingPolicy::KeepBoth;
        }
        if self.delete {
            config.prune = true;
        }

        if self.move_files {
            config.transfer = Some(Transfer::Move);
        }
        if self.copy {
            config.transfer = Some(Transfer::Copy);
        }

        // Set log level based on verbosity
        match self.verbose {
            0 => {}
            1 => config.log_level = LogLevel::Debug,
            _ => config.log_level = LogLevel::Trace,
        }
    }
}

fn parse_date(value: &str) -> Result<CaptureTimestamp, String> {
    parse_timestamp(value).map_err(|e| e.to_string())
}

fn init_logging(log_dir: &Option<Option<PathBuf>>, level: LogLevel) -> anyhow::Result<()> {
    let level = level.to_level_filter();

    match log_dir {
        Some(dir) => {
            let dir = match dir {
                Some(dir) => dir.clone(),
                None => default_log_dir().context("No data directory for log files")?,
            };
            let path = init_file_logger(&dir, level).map_err(|e| anyhow!("{}", e))?;
            eprintln!("Logging to {}", path.display());
        }
        None => {
            let env = env_logger::Env::default().default_filter_or(level.to_string());
            env_logger::Builder::from_env(env).init();
        }
    }

    Ok(())
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    // Set up configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => Config::default(),
    };
    args.apply(&mut config);

    init_logging(&args.log_dir, config.log_level)?;

    let source = args
        .source
        .or(args.src)
        .context("No source directory given")?;

    let reorganizer = PhotoReorganizer::new(config)?;

    if args.list {
        for description in reorganizer.list(&source)? {
            println!("{}", description);
            if args.verbose > 0 {
                for field in &description.fields {
                    println!("    [{}] {} = {}", field.ifd, field.tag, field.value);
                }
                if let Some(reason) = &description.error {
                    println!("    metadata unreadable: {}", reason);
                }
            }
        }
        return Ok(());
    }

    info!("Starting reorganization...");
    let report = reorganizer.reorganize(&source).map_err(|e| {
        if let Some(directory) = e.directory() {
            error!("Aborted; changes in {} were rolled back", directory.display());
        }
        e
    })?;
    info!("Reorganization complete");

    println!(
        "{} directories: {} committed, {} unchanged, {} skipped",
        report.directories, report.committed, report.unchanged, report.skipped
    );
    if report.rewritten + report.degraded > 0 {
        println!(
            "{} rewritten, {} copied unmodified after a processing error",
            report.rewritten, report.degraded
        );
    }
    if report.patched > 0 {
        println!("{} capture dates written", report.patched);
    }
    if report.pruned > 0 {
        println!("{} extraneous entries deleted", report.pruned);
    }

    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::GenerateConfig { path }) => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
        None => run(cli.run),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("photo-reorg").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&[
            "/photos",
            "--sequence=3",
            "--descending",
            "--resize",
            "--fixdate",
            "2020-01-02 03:04",
            "--keep-both",
            "-v",
        ]);

        let mut config = Config::default();
        cli.run.apply(&mut config);

        assert_eq!(cli.run.source, Some(PathBuf::from("/photos")));
        assert_eq!(config.naming, NamingMode::Sequence);
        assert_eq!(config.sequence_width, 3);
        assert_eq!(config.direction, Direction::Descending);
        assert_eq!(config.resize, Some(1900));
        assert_eq!(config.fix_date, Some(parse_timestamp("2020-01-02 03:04").unwrap()));
        assert_eq!(config.on_existing, ExistingPolicy::KeepBoth);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_sequence_without_value_uses_default_width() {
        let cli = parse(&["--src", "/photos", "--sequence", "--rename"]);
        let mut config = Config::default();
        cli.run.apply(&mut config);

        assert_eq!(config.naming, NamingMode::Sequence);
        assert_eq!(config.sequence_width, 4);
    }

    #[test]
    fn test_conflicting_flags_are_rejected() {
        let args = ["photo-reorg", "/photos", "--overwrite", "--keep-both"];
        assert!(Cli::try_parse_from(args).is_err());

        let args = ["photo-reorg", "/photos", "--move", "--copy"];
        assert!(Cli::try_parse_from(args).is_err());

        assert!(Cli::try_parse_from(["photo-reorg", "--fixdate", "yesterday", "/photos"]).is_err());
    }

    #[test]
    fn test_generate_config_subcommand() {
        let cli = parse(&["generate-config", "custom.json"]);
        assert!(matches!(
            cli.command,
            Some(Commands::GenerateConfig { path }) if path == PathBuf::from("custom.json")
        ));
    }
}
