//! Unified error types for the tracker firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! dispatch boundary can log any failure uniformly before dropping it.
//! All variants are `Copy`.

use core::fmt;

pub use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the configuration core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Durable storage could not be read or written.
    Storage(StorageError),
    /// A command document or command was malformed.
    Command(CommandError),
    /// The config store refused a mutation.
    Store(StoreError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The outer document has no `commands` array.
    MissingCommands,
    /// The command needs a `data` object and has none.
    MissingData,
    /// A required field is absent or has the wrong JSON type.
    InvalidField(&'static str),
    /// `data.mode` does not name a device mode.
    UnknownMode(i64),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCommands => write!(f, "document lacks a commands array"),
            Self::MissingData => write!(f, "command lacks a data object"),
            Self::InvalidField(name) => write!(f, "field '{name}' missing or invalid"),
            Self::UnknownMode(raw) => write!(f, "unknown device mode {raw}"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// All network slots are taken and none matches the requested name.
    NetworksFull,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworksFull => write!(f, "network list is full"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
