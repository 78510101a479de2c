// Licensed under the Apache-2.0 license

//! AsciiDoc register documentation for one block.
//!
//! A summary table of every register and window, followed by one section
//! per register with its offset, reset value and field table.

use crate::util::first_line;
use crate::Renderer;
use registers_compiler::{BlockMap, Entity, Field, Register};
use std::fmt::{self, Write};

#[derive(Clone, Debug, Default)]
pub struct RegisterDoc;

impl Renderer for RegisterDoc {
    type Ir = BlockMap;

    fn file_name(&self, block: &BlockMap) -> String {
        format!("{}.adoc", block.name)
    }

    fn render(&self, block: &BlockMap) -> Result<String, fmt::Error> {
        let mut output = String::new();
        writeln!(output, "= {} Register Map", block.name)?;
        writeln!(output)?;

        let word = block.word_bytes();
        let rows: Vec<Vec<String>> = block
            .entities
            .iter()
            .map(|e| {
                let desc = match e {
                    Entity::Register(r) => first_line(r.desc.as_deref()),
                    Entity::Window(w) => first_line(w.desc.as_deref()),
                };
                vec![
                    format!("<<{}, {}>>", e.name().to_lowercase(), e.name()),
                    format!("0x{:04x}", e.offset()),
                    e.size(word).to_string(),
                    desc.to_string(),
                ]
            })
            .collect();
        writeln!(output, "[cols=\"3,2,2,5\",options=\"header\"]")?;
        table(&mut output, &["Name", "Offset", "Length (bytes)", "Description"], &rows)?;
        writeln!(output)?;

        for entity in &block.entities {
            match entity {
                Entity::Register(reg) => register_section(&mut output, reg)?,
                Entity::Window(win) => {
                    writeln!(output, "[[{}]]", win.name.to_lowercase())?;
                    writeln!(output, "== {}", win.name)?;
                    if let Some(desc) = &win.desc {
                        writeln!(output, "{desc}")?;
                    }
                    writeln!(output, "* Offset: `0x{:04x}`", win.offset)?;
                    writeln!(output, "* Items: {} x {} bits", win.items, win.validbits)?;
                    writeln!(output, "* Access: {}", win.swaccess)?;
                    writeln!(output)?;
                }
            }
        }
        Ok(output)
    }
}

fn register_section(output: &mut String, reg: &Register) -> fmt::Result {
    writeln!(output, "[[{}]]", reg.name.to_lowercase())?;
    writeln!(output, "== {}", reg.name)?;
    if let Some(desc) = &reg.desc {
        writeln!(output, "{desc}")?;
    }
    writeln!(output, "* Offset: `0x{:04x}`", reg.offset)?;
    writeln!(output, "* Reset default: `0x{:x}`", reg.resval())?;
    if let Some(regwen) = &reg.regwen {
        writeln!(output, "* Write enable: <<{}, {regwen}>>", regwen.to_lowercase())?;
    }
    writeln!(output)?;

    let rows: Vec<Vec<String>> = reg.fields.iter().map(field_row).collect();
    writeln!(output, "[cols=\"2,2,2,3,7\",options=\"header\"]")?;
    table(output, &["Bits", "Type", "Reset", "Name", "Description"], &rows)?;
    writeln!(output)?;
    Ok(())
}

fn field_row(field: &Field) -> Vec<String> {
    let mut desc = field.desc.clone().unwrap_or_default();
    for value in &field.enums {
        if !desc.is_empty() {
            desc.push_str(" +\n");
        }
        desc.push_str(&format!("`{:#x}` = {}", value.value, value.name));
    }
    vec![
        field.bits.to_string(),
        field.swaccess.to_string(),
        format!("0x{:x}", field.resval),
        field.name.clone(),
        desc,
    ]
}

fn table(output: &mut String, headers: &[&str], rows: &[Vec<String>]) -> fmt::Result {
    writeln!(output, "|===")?;
    writeln!(output, "| {}", headers.join(" | "))?;
    for row in rows {
        writeln!(output, "| {}", row.join(" | "))?;
    }
    writeln!(output, "|===")
}
