// Licensed under the Apache-2.0 license

//! Compile options for blocks and top-level maps.
//!
//! [`BlockOptions`] controls per-block compilation (parameter overrides and
//! the multi-bit boolean encoding width). [`TopOptions`] controls the
//! top-level address space (its width and the alignment floor used for
//! entities whose size is not a power of two).

use crate::error::{Location, RegError, RegResult};
use crate::tree::parse_int;

/// Default width of a multi-bit boolean field.
pub const DEFAULT_MUBI_WIDTH: u32 = 4;

/// Options for compiling one block.
///
/// # Example
///
/// ```
/// use registers_compiler::config::BlockOptions;
///
/// let opts = BlockOptions::with_defaults().add_param("NumAlerts", 3);
/// assert_eq!(opts.param_overrides, vec![("NumAlerts".to_string(), 3)]);
///
/// let opts = BlockOptions::with_defaults().with_param_string("A=1;B=0x10").unwrap();
/// assert_eq!(opts.param_overrides.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct BlockOptions {
    /// Parameter values that replace the block's declared defaults.
    pub param_overrides: Vec<(String, u64)>,
    /// Required width of fields tagged `mubi`.
    pub mubi_width: u32,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BlockOptions {
    pub fn with_defaults() -> Self {
        Self {
            param_overrides: vec![],
            mubi_width: DEFAULT_MUBI_WIDTH,
        }
    }

    pub fn add_param(mut self, name: &str, value: u64) -> Self {
        self.param_overrides.push((name.to_string(), value));
        self
    }

    pub fn mubi_width(mut self, width: u32) -> Self {
        self.mubi_width = width;
        self
    }

    /// Parse overrides of the form `ParamA=ValA;ParamB=ValB`.
    pub fn with_param_string(mut self, overrides: &str) -> RegResult<Self> {
        for (idx, entry) in overrides.split(';').filter(|e| !e.trim().is_empty()).enumerate() {
            let parsed = entry
                .split_once('=')
                .and_then(|(name, value)| Some((name.trim(), parse_int(value)?)));
            match parsed {
                Some((name, value)) if !name.is_empty() => {
                    self.param_overrides.push((name.to_string(), value));
                }
                _ => {
                    return Err(RegError::schema(
                        &Location::top(),
                        format!("parameter override {idx} ({entry:?}) is not of the form name=value"),
                    ))
                }
            }
        }
        Ok(self)
    }
}

/// Options for assembling a top-level address map.
///
/// # Example
///
/// ```
/// use registers_compiler::config::TopOptions;
///
/// let opts = TopOptions::with_defaults().addr_width(64).min_align(0x100);
/// assert_eq!(opts.limit(), 1u128 << 64);
/// ```
#[derive(Clone, Debug)]
pub struct TopOptions {
    /// Width of the address space in bits; every entity must end at or below `1 << addr_width`.
    pub addr_width: u32,
    /// Alignment applied to entities whose size is not a power of two.
    pub min_align: u64,
}

impl Default for TopOptions {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TopOptions {
    pub fn with_defaults() -> Self {
        Self {
            addr_width: 32,
            min_align: 0x1000,
        }
    }

    pub fn addr_width(mut self, bits: u32) -> Self {
        self.addr_width = bits;
        self
    }

    pub fn min_align(mut self, align: u64) -> Self {
        self.min_align = align;
        self
    }

    /// First address past the end of the address space.
    pub fn limit(&self) -> u128 {
        1u128 << self.addr_width.min(64)
    }
}
