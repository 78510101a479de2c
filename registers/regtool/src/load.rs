// Licensed under the Apache-2.0 license

//! Reading Hjson descriptions into raw trees.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

pub fn load_hjson(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let tree: Value = serde_hjson::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    log::debug!("loaded {}", path.display());
    Ok(tree)
}
