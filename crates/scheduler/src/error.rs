use thiserror::Error;

/// A task list or profile that cannot be scheduled. These are always fatal and are reported
/// before any job is opened.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task command is empty")]
    EmptyCommand,
    #[error("Task duration {0} is negative")]
    NegativeDuration(i64),
    #[error("Invalid size {0:?}")]
    InvalidSize(String),
    #[error("Invalid duration scale factor")]
    InvalidScaleFactor,
    #[error("Profile capacity must be greater than zero")]
    ZeroCapacity,
}

/// Failed to write a schedule's scripts. Scripts written before the failure are left in place.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Failed to create output directory")]
    CreateOutputDir,
    #[error("Failed to write job script")]
    WriteJobScript,
    #[error("Failed to write master script")]
    WriteMasterScript,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file")]
    Read,
    #[error("Failed to parse configuration")]
    Parse,
    #[error("Configuration is invalid")]
    Invalid,
    #[error("Failed to determine input size")]
    InputSize,
}
