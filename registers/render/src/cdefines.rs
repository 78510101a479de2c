// Licensed under the Apache-2.0 license

//! C header of `#define`s for one block's registers.
//!
//! ```text
//! #define UART_CTRL_REG_OFFSET 0x0
//! #define UART_CTRL_REG_RESVAL 0x0u
//! #define UART_CTRL_TX_EN_BIT 0
//! #define UART_STATUS_LEVEL_MASK 0xfu
//! #define UART_STATUS_LEVEL_OFFSET 2
//! ```

use crate::util::{c_hex, first_line, upper_snake};
use crate::Renderer;
use registers_compiler::{BlockMap, Entity, Field, Register, Window};
use std::fmt::{self, Write};

/// Renders a block as C preprocessor defines.
#[derive(Clone, Debug, Default)]
pub struct CDefines;

impl Renderer for CDefines {
    type Ir = BlockMap;

    fn file_name(&self, block: &BlockMap) -> String {
        format!("{}_regs.h", block.name)
    }

    fn render(&self, block: &BlockMap) -> Result<String, fmt::Error> {
        let prefix = upper_snake(&block.name);
        let guard = format!("_{prefix}_REG_DEFS_");
        let mut output = String::new();

        writeln!(output, "// Generated register defines for {}", block.name)?;
        writeln!(output)?;
        writeln!(output, "#ifndef {guard}")?;
        writeln!(output, "#define {guard}")?;
        writeln!(output)?;
        writeln!(output, "#ifdef __cplusplus")?;
        writeln!(output, "extern \"C\" {{")?;
        writeln!(output, "#endif")?;

        for param in block.params.iter() {
            writeln!(output)?;
            let desc = first_line(param.desc.as_deref());
            writeln!(output, "// {}", if desc.is_empty() { param.name.as_str() } else { desc })?;
            writeln!(
                output,
                "#define {prefix}_PARAM_{} {}",
                upper_snake(&param.name),
                param.value
            )?;
        }
        writeln!(output)?;
        writeln!(output, "// Register width")?;
        writeln!(output, "#define {prefix}_PARAM_REG_WIDTH {}", block.regwidth)?;

        for entity in &block.entities {
            writeln!(output)?;
            match entity {
                Entity::Register(reg) => render_register(&mut output, &prefix, reg)?,
                Entity::Window(win) => render_window(&mut output, &prefix, win)?,
            }
        }

        writeln!(output)?;
        writeln!(output, "#ifdef __cplusplus")?;
        writeln!(output, "}}  // extern \"C\"")?;
        writeln!(output, "#endif")?;
        writeln!(output, "#endif  // {guard}")?;
        Ok(output)
    }
}

fn render_register(output: &mut String, prefix: &str, reg: &Register) -> fmt::Result {
    let reg_prefix = format!("{prefix}_{}", upper_snake(&reg.name));
    if let Some(desc) = reg.desc.as_deref() {
        writeln!(output, "// {}", first_line(Some(desc)))?;
    }
    if let Some(mr) = reg.multireg.as_ref().filter(|mr| mr.index == 0) {
        writeln!(
            output,
            "#define {prefix}_{}_MULTIREG_COUNT {}",
            upper_snake(&mr.template),
            mr.count
        )?;
    }
    writeln!(output, "#define {reg_prefix}_REG_OFFSET {:#x}", reg.offset)?;
    writeln!(output, "#define {reg_prefix}_REG_RESVAL {}", c_hex(reg.resval()))?;
    for field in &reg.fields {
        render_field(output, &reg_prefix, reg, field)?;
    }
    Ok(())
}

fn render_field(output: &mut String, reg_prefix: &str, reg: &Register, field: &Field) -> fmt::Result {
    // A lone field named after its register (or multireg template) spans it.
    let template = reg.multireg.as_ref().map(|mr| mr.template.as_str());
    let spans_register = reg.fields.len() == 1
        && (field.name == reg.name || Some(field.name.as_str()) == template);
    let field_prefix = format!("{reg_prefix}_{}", upper_snake(&field.name));
    if !spans_register {
        if field.bits.width() == 1 {
            writeln!(output, "#define {field_prefix}_BIT {}", field.bits.lsb)?;
        } else {
            writeln!(output, "#define {field_prefix}_MASK {}", c_hex(field.bits.value_mask()))?;
            writeln!(output, "#define {field_prefix}_OFFSET {}", field.bits.lsb)?;
        }
    }
    for value in &field.enums {
        writeln!(
            output,
            "#define {field_prefix}_VALUE_{} {:#x}",
            upper_snake(&value.name),
            value.value
        )?;
    }
    Ok(())
}

fn render_window(output: &mut String, prefix: &str, win: &Window) -> fmt::Result {
    let win_prefix = format!("{prefix}_{}", upper_snake(&win.name));
    writeln!(output, "// Memory area: {}", first_line(win.desc.as_deref()))?;
    writeln!(output, "#define {win_prefix}_REG_OFFSET {:#x}", win.offset)?;
    writeln!(output, "#define {win_prefix}_SIZE_WORDS {}", win.items)?;
    writeln!(output, "#define {win_prefix}_SIZE_BYTES {}", win.size)?;
    Ok(())
}
