// Licensed under the Apache-2.0 license

//! Renderers for the top-level address map: a C header and a SystemVerilog
//! package of base addresses, a linker-script `MEMORY` stub, the register
//! model package of block instances, and an address table as AsciiDoc and
//! HTML.

use crate::util::{c_hex, sv_hex, upper_snake};
use crate::Renderer;
use regex::Regex;
use registers_compiler::{TopEntity, TopKind, TopMap};
use std::fmt::{self, Write};

fn describe(entity: &TopEntity) -> String {
    match &entity.kind {
        TopKind::Module { target } if *target != entity.name => {
            format!("{} (instance of {target})", entity.name)
        }
        TopKind::Module { .. } => entity.name.clone(),
        TopKind::Memory { mem_type } => match mem_type {
            Some(t) => format!("{} ({t} memory)", entity.name),
            None => format!("{} (memory)", entity.name),
        },
    }
}

/// `TOP_<NAME>_BASE_ADDR` / `TOP_<NAME>_SIZE_BYTES` defines.
#[derive(Clone, Debug, Default)]
pub struct TopCHeader;

impl Renderer for TopCHeader {
    type Ir = TopMap;

    fn file_name(&self, _top: &TopMap) -> String {
        "top_base_addrs.h".into()
    }

    fn render(&self, top: &TopMap) -> Result<String, fmt::Error> {
        let guard = "TOP_BASE_ADDRS_H_";
        let mut output = String::new();
        writeln!(output, "// Base addresses for {}", top.name)?;
        writeln!(output)?;
        writeln!(output, "#ifndef {guard}")?;
        writeln!(output, "#define {guard}")?;
        for entity in &top.entities {
            let name = upper_snake(&entity.name);
            writeln!(output)?;
            writeln!(output, "// {}", describe(entity))?;
            writeln!(output, "#define TOP_{name}_BASE_ADDR {}", c_hex(entity.base))?;
            writeln!(output, "#define TOP_{name}_SIZE_BYTES {}", c_hex(entity.size))?;
        }
        writeln!(output)?;
        writeln!(output, "#endif  // {guard}")?;
        Ok(output)
    }
}

/// A SystemVerilog package of base-address parameters.
#[derive(Clone, Debug, Default)]
pub struct TopSvPackage;

impl Renderer for TopSvPackage {
    type Ir = TopMap;

    fn file_name(&self, _top: &TopMap) -> String {
        "top_base_addrs_pkg.sv".into()
    }

    fn render(&self, top: &TopMap) -> Result<String, fmt::Error> {
        let pkg = "top_base_addrs_pkg";
        let width = top.addr_width;
        let mut output = String::new();
        writeln!(output, "// Base addresses for {}", top.name)?;
        writeln!(output)?;
        writeln!(output, "package {pkg};")?;
        for entity in &top.entities {
            let name = upper_snake(&entity.name);
            writeln!(output)?;
            writeln!(output, "  // {}", describe(entity))?;
            writeln!(
                output,
                "  parameter logic [{}:0] TOP_{name}_BASE_ADDR = {};",
                width - 1,
                sv_hex(entity.base, width)
            )?;
            writeln!(
                output,
                "  parameter logic [{}:0] TOP_{name}_SIZE_BYTES = {};",
                width - 1,
                sv_hex(entity.size, width)
            )?;
        }
        writeln!(output)?;
        writeln!(output, "endpackage : {pkg}")?;
        Ok(output)
    }
}

/// A linker-script `MEMORY` block listing the top level's memories.
#[derive(Clone, Debug, Default)]
pub struct LinkerScript;

impl Renderer for LinkerScript {
    type Ir = TopMap;

    fn file_name(&self, _top: &TopMap) -> String {
        "toplevel_memory.ld".into()
    }

    fn render(&self, top: &TopMap) -> Result<String, fmt::Error> {
        let mut output = String::new();
        writeln!(output, "/* Memory regions for {} */", top.name)?;
        writeln!(output)?;
        writeln!(output, "MEMORY")?;
        writeln!(output, "{{")?;
        for mem in top.memories() {
            let attrs = match &mem.kind {
                TopKind::Memory { mem_type: Some(t) } if t.eq_ignore_ascii_case("rom") => "rx",
                _ => "rwx",
            };
            writeln!(
                output,
                "  {} ({attrs}) : ORIGIN = {:#010x}, LENGTH = {:#x}",
                mem.name, mem.base, mem.size
            )?;
        }
        writeln!(output, "}}")?;
        Ok(output)
    }
}

/// SystemVerilog package naming the register-model block behind each module.
#[derive(Clone, Debug, Default)]
pub struct TopRalPackage;

impl Renderer for TopRalPackage {
    type Ir = TopMap;

    fn file_name(&self, _top: &TopMap) -> String {
        "top_ral_pkg.sv".into()
    }

    fn render(&self, top: &TopMap) -> Result<String, fmt::Error> {
        let pkg = "top_ral_pkg";
        let width = top.addr_width;
        let mut output = String::new();
        writeln!(output, "// Register model instances for {}", top.name)?;
        writeln!(output)?;
        writeln!(output, "package {pkg};")?;
        for module in top.modules() {
            let TopKind::Module { target } = &module.kind else {
                continue;
            };
            let name = upper_snake(&module.name);
            writeln!(output)?;
            writeln!(output, "  // {}", describe(module))?;
            writeln!(
                output,
                "  parameter logic [{}:0] {name}_RAL_BASE_ADDR = {};",
                width - 1,
                sv_hex(module.base, width)
            )?;
            writeln!(output, "  parameter string {name}_RAL_BLOCK = \"{target}_reg_block\";")?;
        }
        writeln!(output)?;
        writeln!(output, "endpackage : {pkg}")?;
        Ok(output)
    }
}

/// AsciiDoc tables of every module and memory with its address range.
#[derive(Clone, Debug, Default)]
pub struct TopAddressDoc;

impl Renderer for TopAddressDoc {
    type Ir = TopMap;

    fn file_name(&self, _top: &TopMap) -> String {
        "top_addresses.md".into()
    }

    fn render(&self, top: &TopMap) -> Result<String, fmt::Error> {
        let mut output = String::new();
        writeln!(output, "= {} Address Map", top.name)?;

        writeln!(output)?;
        writeln!(output, "== Modules")?;
        writeln!(output, "[cols=\"3,3,2,2\",options=\"header\"]")?;
        writeln!(output, "|===")?;
        writeln!(output, "| Name | Block | Base address | Size (bytes)")?;
        for module in top.modules() {
            let block = match &module.kind {
                TopKind::Module { target } => format!("<<{target}, {target}>>"),
                TopKind::Memory { .. } => continue,
            };
            writeln!(
                output,
                "| {} | {block} | {:#010x} | {:#x}",
                module.name, module.base, module.size
            )?;
        }
        writeln!(output, "|===")?;

        writeln!(output)?;
        writeln!(output, "== Memories")?;
        writeln!(output, "[cols=\"3,2,2,2\",options=\"header\"]")?;
        writeln!(output, "|===")?;
        writeln!(output, "| Name | Type | Base address | Size (bytes)")?;
        for mem in top.memories() {
            let mem_type = match &mem.kind {
                TopKind::Memory { mem_type: Some(t) } => t.as_str(),
                _ => "-",
            };
            writeln!(
                output,
                "| {} | {mem_type} | {:#010x} | {:#x}",
                mem.name, mem.base, mem.size
            )?;
        }
        writeln!(output, "|===")?;
        Ok(output)
    }
}

/// [`TopAddressDoc`] converted to a standalone HTML page.
#[derive(Clone, Debug, Default)]
pub struct TopAddressHtml;

impl Renderer for TopAddressHtml {
    type Ir = TopMap;

    fn file_name(&self, _top: &TopMap) -> String {
        "top_addresses.html".into()
    }

    fn render(&self, top: &TopMap) -> Result<String, fmt::Error> {
        adoc_to_html(&TopAddressDoc.render(top)?)
    }
}

/// Convert the subset of AsciiDoc the top-level docs use (titles, tables,
/// `<<target, label>>` cross references) to HTML. Cross references point at
/// `<target>.html`.
pub fn adoc_to_html(adoc: &str) -> Result<String, fmt::Error> {
    let links = Regex::new(r"<<([A-Za-z0-9_]+),\s*([^>]+)>>").map_err(|_| fmt::Error)?;
    let mut output = String::new();
    let mut in_table = false;
    let mut header_row = false;

    writeln!(output, "<html><body>")?;
    for line in adoc.lines() {
        if line.starts_with("[cols") {
            continue;
        }
        if line.starts_with("|===") {
            if in_table {
                writeln!(output, "</table>")?;
            } else {
                writeln!(output, "<table border=\"1\" cellspacing=\"0\" cellpadding=\"4\">")?;
                header_row = true;
            }
            in_table = !in_table;
            continue;
        }
        if in_table && line.starts_with("| ") {
            let tag = if header_row { "th" } else { "td" };
            header_row = false;
            write!(output, "<tr>")?;
            for cell in line.split('|').map(str::trim).filter(|c| !c.is_empty()) {
                write!(output, "<{tag}>{}</{tag}>", inline_html(&links, cell))?;
            }
            writeln!(output, "</tr>")?;
        } else if let Some(title) = line.strip_prefix("= ") {
            writeln!(output, "<h1>{}</h1>", escape_html(title.trim()))?;
        } else if let Some(title) = line.strip_prefix("== ") {
            writeln!(output, "<h2>{}</h2>", escape_html(title.trim()))?;
        } else if !line.trim().is_empty() {
            writeln!(output, "<p>{}</p>", inline_html(&links, line.trim()))?;
        }
    }
    writeln!(output, "</body></html>")?;
    Ok(output)
}

fn inline_html(links: &Regex, text: &str) -> String {
    let mut html = String::new();
    let mut last = 0;
    for caps in links.captures_iter(text) {
        let (Some(whole), Some(target), Some(label)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        html.push_str(&escape_html(&text[last..whole.start()]));
        html.push_str(&format!(
            "<a href=\"{}.html\">{}</a>",
            target.as_str(),
            escape_html(label.as_str().trim())
        ));
        last = whole.end();
    }
    html.push_str(&escape_html(&text[last..]));
    html
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
