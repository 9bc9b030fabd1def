use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::CaptureTimestamp;

/// Default longest side, in pixels, for `--resize` without a value
pub const RESIZE_DEFAULT: u32 = 1900;

/// Default width of the zero-padded sequence number
pub const SEQUENCE_WIDTH_DEFAULT: usize = 4;

/// Format used for names and the stamp overlay unless configured otherwise
pub const DATE_FORMAT_DEFAULT: &str = "%Y-%m-%d %H:%M";

/// How destination file names are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamingMode {
    /// Keep the original file name
    #[default]
    Keep,

    /// Name after the formatted capture timestamp, falling back to the base name
    Date,

    /// Zero-padded position in the ordered batch, optionally followed by the date
    Sequence,
}

/// Direction applied to the dated portion of the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Where entries without a capture timestamp go, regardless of direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UndatedPlacement {
    First,
    #[default]
    Last,
}

/// What to do when a destination file already exists on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExistingPolicy {
    /// Leave the existing file alone and skip the entry
    #[default]
    Skip,

    /// Replace the existing file
    Overwrite,

    /// Allocate a suffixed name that does not exist yet
    KeepBoth,
}

/// Where the `" (k)"` collision suffix is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuffixPlacement {
    /// `name (1).jpg`
    #[default]
    BeforeExtension,

    /// `name.jpg (1)`
    AfterExtension,
}

/// Whether sources are moved or copied into the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transfer {
    Move,
    Copy,
}

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for a reorganization run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Destination root; `None` reorganizes the source in place
    pub destination: Option<PathBuf>,

    /// How destination names are derived
    pub naming: NamingMode,

    /// Zero-pad width of the sequence number
    pub sequence_width: usize,

    /// Whether sequence names carry the formatted date after the number
    pub sequence_with_date: bool,

    /// chrono format for dates in file names
    pub date_format: String,

    /// chrono format for the stamped overlay
    pub stamp_format: String,

    /// Ordering of dated entries
    pub direction: Direction,

    /// Placement of entries without a capture timestamp
    pub undated: UndatedPlacement,

    /// Behaviour for destinations that already exist
    pub on_existing: ExistingPolicy,

    /// Position of the collision counter
    pub suffix_placement: SuffixPlacement,

    /// Forced transfer mode; `None` moves in place and copies elsewhere
    pub transfer: Option<Transfer>,

    /// Delete destination files not produced or expected by this run
    pub prune: bool,

    /// Draw the capture date into the image
    pub stamp: bool,

    /// Scale the longest side down to this many pixels
    pub resize: Option<u32>,

    /// Timestamp used when metadata has none; written back into the output
    pub fix_date: Option<CaptureTimestamp>,

    /// Entries whose name starts with this marker are ignored
    pub hidden_prefix: String,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination: None,
            naming: NamingMode::Keep,
            sequence_width: SEQUENCE_WIDTH_DEFAULT,
            sequence_with_date: true,
            date_format: DATE_FORMAT_DEFAULT.to_string(),
            stamp_format: DATE_FORMAT_DEFAULT.to_string(),
            direction: Direction::Ascending,
            undated: UndatedPlacement::Last,
            on_existing: ExistingPolicy::Skip,
            suffix_placement: SuffixPlacement::BeforeExtension,
            transfer: None,
            prune: false,
            stamp: false,
            resize: None,
            fix_date: None,
            hidden_prefix: ".".to_string(),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.sequence_width) {
            return Err(Error::Configuration(format!(
                "Sequence width must be between 1 and 12, got {}",
                self.sequence_width
            )));
        }

        if self.resize == Some(0) {
            return Err(Error::Configuration(
                "Resize target must be greater than zero".to_string(),
            ));
        }

        if self.hidden_prefix.is_empty() {
            return Err(Error::Configuration(
                "Hidden prefix must not be empty".to_string(),
            ));
        }

        validate_name_format("date_format", &self.date_format)?;

        if !is_valid_format(&self.stamp_format) {
            return Err(Error::Configuration(format!(
                "stamp_format is not a valid date format: '{}'",
                self.stamp_format
            )));
        }

        Ok(())
    }

    /// Whether any option rewrites image content
    pub fn has_transforms(&self) -> bool {
        self.stamp || self.resize.is_some()
    }

    /// Transfer mode for a run whose roots compare as given
    pub fn effective_transfer(&self, same_root: bool) -> Transfer {
        match self.transfer {
            Some(transfer) => transfer,
            None if same_root => Transfer::Move,
            None => Transfer::Copy,
        }
    }
}

/// Format a timestamp without panicking on a malformed format string
pub fn format_timestamp(timestamp: &CaptureTimestamp, format: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", timestamp.format(format))
        .map_err(|_| Error::Configuration(format!("Invalid date format: '{}'", format)))?;
    Ok(out)
}

/// Parse a user supplied date as accepted by `--fixdate`
pub fn parse_timestamp(value: &str) -> Result<CaptureTimestamp> {
    let value = value.trim();
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(timestamp);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            Error::Configuration(format!(
                "Invalid date '{}', expected YYYY-MM-DD HH:MM",
                value
            ))
        })
}

fn is_valid_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn validate_name_format(field: &str, format: &str) -> Result<()> {
    if !is_valid_format(format) {
        return Err(Error::Configuration(format!(
            "{} is not a valid date format: '{}'",
            field, format
        )));
    }

    let sample = NaiveDate::from_ymd_opt(2021, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .ok_or_else(|| Error::Configuration("Invalid sample date".to_string()))?;
    let rendered = format_timestamp(&sample, format)?;
    if rendered.contains('/') || rendered.contains('\\') {
        return Err(Error::Configuration(format!(
            "{} must not produce path separators: '{}'",
            field, format
        )));
    }

    Ok(())
}
