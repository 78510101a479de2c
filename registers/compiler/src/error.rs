// Licensed under the Apache-2.0 license

//! Error taxonomy for the register compiler.
//!
//! Every variant carries a [`Location`] naming the block, register and field
//! (where known) so the caller can print a diagnostic without access to the
//! input tree.

use std::fmt;
use thiserror::Error;

/// Position of an entity within the input, from the block down to the field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub block: Option<String>,
    pub register: Option<String>,
    pub field: Option<String>,
}

impl Location {
    /// The top-level address map.
    pub fn top() -> Self {
        Self::default()
    }

    pub fn block(name: &str) -> Self {
        Self {
            block: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Narrow this location to a register (or window) inside it.
    pub fn register(&self, name: &str) -> Self {
        Self {
            block: self.block.clone(),
            register: Some(name.to_string()),
            field: None,
        }
    }

    /// Narrow this location to a field inside the current register.
    pub fn field(&self, name: &str) -> Self {
        Self {
            block: self.block.clone(),
            register: self.register.clone(),
            field: Some(name.to_string()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            self.block.as_ref().map(|b| format!("block {b}")),
            self.register.as_ref().map(|r| format!("register {r}")),
            self.field.as_ref().map(|x| format!("field {x}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            write!(f, "top level")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors raised while compiling a block or a top-level map.
///
/// All of them are defects in the input; nothing here is retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegError {
    /// Structurally malformed input: missing key, wrong value type, unknown name.
    #[error("{loc}: {msg}")]
    Schema { loc: Location, msg: String },

    /// Malformed or reversed bit range, or a reset value that does not fit it.
    #[error("{loc}: bad bit range: {msg}")]
    FieldRange { loc: Location, msg: String },

    /// A field reaching past the register width, or of the wrong width for its encoding.
    #[error("{loc}: bad field width: {msg}")]
    FieldWidth { loc: Location, msg: String },

    #[error("{loc}: fields {first} and {second} overlap")]
    FieldOverlap {
        loc: Location,
        first: String,
        second: String,
    },

    #[error("{loc}: bad enum: {msg}")]
    Enum { loc: Location, msg: String },

    #[error("{loc}: {name} at {offset:#x} with size {size:#x} does not fit below {limit:#x}")]
    AddressOverflow {
        loc: Location,
        name: String,
        offset: u64,
        size: u64,
        limit: u128,
    },

    #[error("{loc}: {name} at {addr:#x} is not aligned to {align:#x}")]
    Alignment {
        loc: Location,
        name: String,
        addr: u64,
        align: u64,
    },

    #[error("{loc}: {first} and {second} overlap")]
    AddressOverlap {
        loc: Location,
        first: String,
        second: String,
    },
}

impl RegError {
    pub fn schema(loc: &Location, msg: impl Into<String>) -> Self {
        RegError::Schema {
            loc: loc.clone(),
            msg: msg.into(),
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            RegError::Schema { loc, .. }
            | RegError::FieldRange { loc, .. }
            | RegError::FieldWidth { loc, .. }
            | RegError::FieldOverlap { loc, .. }
            | RegError::Enum { loc, .. }
            | RegError::AddressOverflow { loc, .. }
            | RegError::Alignment { loc, .. }
            | RegError::AddressOverlap { loc, .. } => loc,
        }
    }
}

/// Result type for compiler operations.
pub type RegResult<T> = std::result::Result<T, RegError>;
