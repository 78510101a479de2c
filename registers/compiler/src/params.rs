// Licensed under the Apache-2.0 license

//! Integer parameters declared by a block's `param_list`.
//!
//! Parameters let a multireg take its repetition count from a named value
//! that the caller may override at compile time.

use crate::error::{Location, RegError, RegResult};
use crate::tree::{check_int, check_keys, check_list, check_name, opt_bool, opt_str, parse_int};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single resolved parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub desc: Option<String>,
    /// Declared type, recorded for renderers (`int` when omitted).
    pub ty: String,
    pub default: u64,
    /// Value after caller overrides have been applied.
    pub value: u64,
    /// Local parameters cannot be overridden.
    pub local: bool,
}

/// The ordered parameter list of a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    list: Vec<Param>,
}

const PARAM_REQUIRED: &[&str] = &["name", "default"];
const PARAM_OPTIONAL: &[&str] = &["desc", "type", "local", "expose", "randtype", "randcount"];

impl Params {
    pub fn from_raw(raw: Option<&Value>, loc: &Location) -> RegResult<Self> {
        let mut params = Params::default();
        let Some(raw) = raw else {
            return Ok(params);
        };
        for entry in check_list(raw, loc, "param_list")? {
            let map = check_keys(entry, loc, "parameter", PARAM_REQUIRED, PARAM_OPTIONAL)?;
            let name = check_name(&map["name"], loc, "parameter name")?;
            let what = format!("parameter {name}");
            if params.get(&name).is_some() {
                return Err(RegError::schema(loc, format!("duplicate {what}")));
            }
            let default = check_int(&map["default"], loc, &format!("default of {what}"))?;
            params.list.push(Param {
                desc: opt_str(map, "desc", loc, &what)?,
                ty: opt_str(map, "type", loc, &what)?.unwrap_or_else(|| "int".to_string()),
                local: opt_bool(map, "local", loc, &what)?,
                default,
                value: default,
                name,
            });
        }
        Ok(params)
    }

    /// Apply `(name, value)` overrides supplied by the caller.
    pub fn apply_overrides(&mut self, overrides: &[(String, u64)], loc: &Location) -> RegResult<()> {
        for (name, value) in overrides {
            let param = self
                .list
                .iter_mut()
                .find(|p| &p.name == name)
                .ok_or_else(|| RegError::schema(loc, format!("no parameter named {name}")))?;
            if param.local {
                return Err(RegError::schema(
                    loc,
                    format!("parameter {name} is local and cannot be overridden"),
                ));
            }
            log::debug!("{loc}: parameter {name} overridden to {value}");
            param.value = *value;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.list.iter().find(|p| p.name == name).map(|p| p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.list.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Resolve an integer that may be written as a literal or as a parameter name.
    pub fn resolve(&self, raw: &Value, loc: &Location, what: &str) -> RegResult<u64> {
        if let Value::String(s) = raw {
            if parse_int(s).is_none() {
                return self
                    .get(s)
                    .ok_or_else(|| RegError::schema(loc, format!("{what} names unknown parameter {s}")));
            }
        }
        check_int(raw, loc, what)
    }
}
