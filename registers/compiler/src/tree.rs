// Licensed under the Apache-2.0 license

//! Typed accessors over the raw description tree.
//!
//! The loader hands the compiler an untyped [`serde_json::Value`]. Every
//! "is this key present, is it the right shape" question is answered here, so
//! the field/register/block layers only ever see typed values.

use crate::error::{Location, RegError, RegResult};
use serde_json::{Map, Value};

pub type RawMap = Map<String, Value>;

/// Check that `raw` is a mapping with all `required` keys and nothing outside
/// `required` and `optional`.
pub fn check_keys<'a>(
    raw: &'a Value,
    loc: &Location,
    what: &str,
    required: &[&str],
    optional: &[&str],
) -> RegResult<&'a RawMap> {
    let map = require_keys(raw, loc, what, required)?;
    let unknown: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|k| !required.contains(k) && !optional.contains(k))
        .collect();
    if !unknown.is_empty() {
        return Err(RegError::schema(
            loc,
            format!("{what} has unknown keys: {}", unknown.join(", ")),
        ));
    }
    Ok(map)
}

/// Like [`check_keys`] but ignores keys it does not know about.
pub fn require_keys<'a>(
    raw: &'a Value,
    loc: &Location,
    what: &str,
    required: &[&str],
) -> RegResult<&'a RawMap> {
    let map = raw
        .as_object()
        .ok_or_else(|| RegError::schema(loc, format!("{what} is not a mapping")))?;
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| !map.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(RegError::schema(
            loc,
            format!("{what} is missing required keys: {}", missing.join(", ")),
        ));
    }
    Ok(map)
}

pub fn check_str<'a>(raw: &'a Value, loc: &Location, what: &str) -> RegResult<&'a str> {
    raw.as_str()
        .ok_or_else(|| RegError::schema(loc, format!("{what} is not a string: {raw}")))
}

/// A name usable as an identifier in every backend: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn check_name(raw: &Value, loc: &Location, what: &str) -> RegResult<String> {
    let s = check_str(raw, loc, what)?;
    let mut chars = s.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        return Err(RegError::schema(
            loc,
            format!("{what} is not a valid name: {s:?}"),
        ));
    }
    Ok(s.to_string())
}

/// Parse an integer literal: decimal, or `0x`/`0o`/`0b` prefixed, with
/// optional `_` separators.
pub fn parse_int(s: &str) -> Option<u64> {
    let s: String = s.trim().chars().filter(|c| *c != '_').collect();
    let lower = s.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else {
        (lower.as_str(), 10)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

/// A non-negative integer given either as a number or as a string literal.
pub fn check_int(raw: &Value, loc: &Location, what: &str) -> RegResult<u64> {
    let val = match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_int(s),
        _ => None,
    };
    val.ok_or_else(|| {
        RegError::schema(
            loc,
            format!("{what} is not a non-negative integer: {raw}"),
        )
    })
}

/// A boolean, also accepting the strings `"true"` and `"false"`.
pub fn check_bool(raw: &Value, loc: &Location, what: &str) -> RegResult<bool> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(RegError::schema(
            loc,
            format!("{what} is not a boolean: {raw}"),
        )),
    }
}

pub fn check_list<'a>(raw: &'a Value, loc: &Location, what: &str) -> RegResult<&'a [Value]> {
    raw.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| RegError::schema(loc, format!("{what} is not a list")))
}

/// A list of strings; a single string is accepted as a one-element list.
pub fn check_str_list(raw: &Value, loc: &Location, what: &str) -> RegResult<Vec<String>> {
    if let Value::String(s) = raw {
        return Ok(vec![s.clone()]);
    }
    check_list(raw, loc, what)?
        .iter()
        .map(|v| check_str(v, loc, what).map(str::to_string))
        .collect()
}

/// Optional boolean key, defaulting to false.
pub fn opt_bool(map: &RawMap, key: &str, loc: &Location, what: &str) -> RegResult<bool> {
    map.get(key)
        .map(|v| check_bool(v, loc, &format!("{key} of {what}")))
        .transpose()
        .map(|b| b.unwrap_or(false))
}

/// Optional string key.
pub fn opt_str(map: &RawMap, key: &str, loc: &Location, what: &str) -> RegResult<Option<String>> {
    map.get(key)
        .map(|v| check_str(v, loc, &format!("{key} of {what}")).map(str::to_string))
        .transpose()
}

/// Optional integer key.
pub fn opt_int(map: &RawMap, key: &str, loc: &Location, what: &str) -> RegResult<Option<u64>> {
    map.get(key)
        .map(|v| check_int(v, loc, &format!("{key} of {what}")))
        .transpose()
}
