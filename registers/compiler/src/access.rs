// Licensed under the Apache-2.0 license

//! Software and hardware access policies for fields and windows.

use crate::error::{Location, RegError, RegResult};
use crate::tree::check_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How software sees a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwAccess {
    /// No access; the bits read as zero.
    None,
    Ro,
    /// Read-only, cleared by the read.
    Rc,
    Rw,
    /// Reads as zero, write 1 to clear.
    R0w1c,
    /// Write 1 to set.
    Rw1s,
    /// Write 1 to clear.
    Rw1c,
    /// Write 0 to clear.
    Rw0c,
    Wo,
}

impl SwAccess {
    pub const ALL: [SwAccess; 9] = [
        SwAccess::None,
        SwAccess::Ro,
        SwAccess::Rc,
        SwAccess::Rw,
        SwAccess::R0w1c,
        SwAccess::Rw1s,
        SwAccess::Rw1c,
        SwAccess::Rw0c,
        SwAccess::Wo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SwAccess::None => "none",
            SwAccess::Ro => "ro",
            SwAccess::Rc => "rc",
            SwAccess::Rw => "rw",
            SwAccess::R0w1c => "r0w1c",
            SwAccess::Rw1s => "rw1s",
            SwAccess::Rw1c => "rw1c",
            SwAccess::Rw0c => "rw0c",
            SwAccess::Wo => "wo",
        }
    }

    pub fn from_raw(raw: &Value, loc: &Location, what: &str) -> RegResult<Self> {
        let s = check_str(raw, loc, what)?;
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                RegError::schema(loc, format!("{what} is not a software access policy: {s:?}"))
            })
    }

    /// Whether a software read returns the stored value.
    pub fn allows_read(&self) -> bool {
        !matches!(self, SwAccess::None | SwAccess::Wo | SwAccess::R0w1c)
    }

    /// Whether a software write has any effect.
    pub fn allows_write(&self) -> bool {
        !matches!(self, SwAccess::None | SwAccess::Ro | SwAccess::Rc)
    }
}

impl fmt::Display for SwAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the hardware side of the block sees a field.
///
/// Externally implemented registers are not a variant here; they are marked
/// with [`Register::hwext`](crate::register::Register::hwext).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HwAccess {
    Hro,
    Hrw,
    Hwo,
    None,
}

impl HwAccess {
    pub const ALL: [HwAccess; 4] = [HwAccess::Hro, HwAccess::Hrw, HwAccess::Hwo, HwAccess::None];

    pub fn as_str(&self) -> &'static str {
        match self {
            HwAccess::Hro => "hro",
            HwAccess::Hrw => "hrw",
            HwAccess::Hwo => "hwo",
            HwAccess::None => "none",
        }
    }

    pub fn from_raw(raw: &Value, loc: &Location, what: &str) -> RegResult<Self> {
        let s = check_str(raw, loc, what)?;
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                RegError::schema(loc, format!("{what} is not a hardware access policy: {s:?}"))
            })
    }

    pub fn hw_reads(&self) -> bool {
        matches!(self, HwAccess::Hro | HwAccess::Hrw)
    }

    pub fn hw_writes(&self) -> bool {
        matches!(self, HwAccess::Hwo | HwAccess::Hrw)
    }
}

impl fmt::Display for HwAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sw_access_round_trip() {
        let loc = Location::top();
        for access in SwAccess::ALL {
            let raw = json!(access.as_str());
            assert_eq!(SwAccess::from_raw(&raw, &loc, "swaccess").unwrap(), access);
        }
        assert!(SwAccess::from_raw(&json!("rw2c"), &loc, "swaccess").is_err());
    }

    #[test]
    fn test_sw_access_capabilities() {
        assert!(SwAccess::Rw.allows_read() && SwAccess::Rw.allows_write());
        assert!(SwAccess::Ro.allows_read() && !SwAccess::Ro.allows_write());
        assert!(!SwAccess::Wo.allows_read() && SwAccess::Wo.allows_write());
        assert!(!SwAccess::R0w1c.allows_read() && SwAccess::R0w1c.allows_write());
        assert!(SwAccess::Rc.allows_read() && !SwAccess::Rc.allows_write());
    }

    #[test]
    fn test_hw_access() {
        let loc = Location::top();
        assert_eq!(
            HwAccess::from_raw(&json!("hrw"), &loc, "hwaccess").unwrap(),
            HwAccess::Hrw
        );
        assert!(HwAccess::Hro.hw_reads() && !HwAccess::Hro.hw_writes());
        assert!(HwAccess::from_raw(&json!("rw"), &loc, "hwaccess").is_err());
    }
}
