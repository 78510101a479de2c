// Licensed under the Apache-2.0 license

//! The `block` command: compile one block and emit JSON or a rendered format.

use crate::load::load_hjson;
use crate::BlockFormat;
use anyhow::{Context, Result};
use registers_compiler::{BlockMap, BlockOptions};
use registers_render::{CDefines, RegisterDoc, Renderer};
use std::path::Path;

pub fn generate(
    input: &Path,
    params: Option<&str>,
    format: BlockFormat,
    output: Option<&Path>,
) -> Result<()> {
    let raw = load_hjson(input)?;
    let mut opts = BlockOptions::with_defaults();
    if let Some(params) = params {
        opts = opts.with_param_string(params)?;
    }
    let block = BlockMap::from_raw(&raw, &opts)
        .with_context(|| format!("failed to compile {}", input.display()))?;
    log::info!(
        "compiled block {}: {} entities, {:#x} bytes",
        block.name,
        block.entities.len(),
        block.size
    );

    let text = match format {
        BlockFormat::Json => serde_json::to_string_pretty(&block)? + "\n",
        BlockFormat::Cdefines => CDefines.render(&block)?,
        BlockFormat::Adoc => RegisterDoc.render(&block)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("output written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
