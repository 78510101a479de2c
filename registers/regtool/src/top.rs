// Licensed under the Apache-2.0 license

//! The `top` command: compile the referenced blocks, assemble the top-level
//! map and write it out together with every top-level artifact.

use crate::load::load_hjson;
use anyhow::{bail, Context, Result};
use registers_compiler::{compile_blocks, BlockOptions, TopMap, TopOptions};
use registers_render::top_renderers;
use std::path::{Path, PathBuf};

pub fn generate(
    input: &Path,
    block_files: &[PathBuf],
    outdir: &Path,
    addr_width: u32,
    min_align: u64,
) -> Result<()> {
    let raws = block_files
        .iter()
        .map(|path| load_hjson(path))
        .collect::<Result<Vec<_>>>()?;

    let mut blocks = Vec::new();
    let mut failed = 0;
    for (path, result) in block_files
        .iter()
        .zip(compile_blocks(&raws, &BlockOptions::with_defaults()))
    {
        match result {
            Ok(block) => blocks.push(block),
            Err(err) => {
                log::error!("{}: {err}", path.display());
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} blocks failed to compile", block_files.len());
    }

    let opts = TopOptions::with_defaults()
        .addr_width(addr_width)
        .min_align(min_align);
    let top = TopMap::from_raw(&load_hjson(input)?, &blocks, &opts)
        .with_context(|| format!("failed to assemble {}", input.display()))?;
    for entity in &top.entities {
        log::info!(
            "{:<16} {:#010x} .. {:#010x}",
            entity.name,
            entity.base,
            entity.end()
        );
    }

    std::fs::create_dir_all(outdir)
        .with_context(|| format!("failed to create {}", outdir.display()))?;
    let mut outputs = vec![(
        format!("{}.json", top.name),
        serde_json::to_string_pretty(&top)? + "\n",
    )];
    for renderer in top_renderers() {
        outputs.push((renderer.file_name(&top), renderer.render(&top)?));
    }
    for (name, text) in outputs {
        let path = outdir.join(name);
        std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        log::info!("output written to {}", path.display());
    }
    Ok(())
}
