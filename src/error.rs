//! Configuration and level-data errors
//!
//! Everything else the simulation runs into (stale cascade indices, hits on
//! dead targets, an empty paddle pool) is ordinary control flow, not an error.

use std::fmt;

/// Malformed or missing level data, reported when a level is loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    /// The catalog holds no levels at all
    EmptyCatalog,
    /// Requested a level index outside `1..=count`
    NoSuchLevel { level: u32, count: u32 },
    /// A level with zero rows
    EmptyLevel { level: u32 },
    /// A row with zero columns
    EmptyRow { level: u32, row: usize },
    /// A row whose width differs from the first row
    RaggedRow {
        level: u32,
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A cell holding a code that names no target kind
    UnknownKind {
        level: u32,
        row: usize,
        column: usize,
        code: u8,
    },
    /// Catalog text could not be parsed
    Parse(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCatalog => write!(f, "level catalog is empty"),
            Self::NoSuchLevel { level, count } => {
                write!(f, "no level {level}: catalog holds levels 1..={count}")
            }
            Self::EmptyLevel { level } => write!(f, "level {level} has no rows"),
            Self::EmptyRow { level, row } => {
                write!(f, "level {level} row {row} has no columns")
            }
            Self::RaggedRow {
                level,
                row,
                expected,
                found,
            } => write!(
                f,
                "level {level} row {row} has {found} columns, expected {expected}"
            ),
            Self::UnknownKind {
                level,
                row,
                column,
                code,
            } => write!(
                f,
                "level {level} cell ({row}, {column}) has unknown target code {code}"
            ),
            Self::Parse(msg) => write!(f, "level catalog parse error: {msg}"),
        }
    }
}

impl std::error::Error for LevelError {}

/// Invalid settings or tuning
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Only 60 and 120 steps per second are supported
    UnsupportedFrameRate { found: u32 },
    /// Field dimensions must be positive
    InvalidField { width: f32, height: f32 },
    /// Difficulty tier outside 0..=2
    UnknownDifficulty(String),
    /// A tuning value outside its meaningful range
    InvalidTuning { field: &'static str, value: f32 },
    /// JSON could not be parsed
    Parse(String),
    /// Config file could not be read
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFrameRate { found } => {
                write!(f, "unsupported frame rate {found}: expected 60 or 120")
            }
            Self::InvalidField { width, height } => {
                write!(f, "invalid field size {width}x{height}")
            }
            Self::UnknownDifficulty(s) => write!(f, "unknown difficulty '{s}'"),
            Self::InvalidTuning { field, value } => {
                write!(f, "tuning value {field} = {value} is out of range")
            }
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Io(msg) => write!(f, "config read error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for LevelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
