// Licensed under the Apache-2.0 license

//! Name conversion and number formatting shared by the renderers.

/// Converts a name to UPPER_SNAKE_CASE for use in C and SystemVerilog
/// identifiers.
///
/// CamelCase transitions get an underscore separator and punctuation or
/// whitespace collapse to a single underscore.
///
/// # Examples
/// ```
/// use registers_render::util::upper_snake;
/// assert_eq!(upper_snake("RxFifoDepth"), "RX_FIFO_DEPTH");
/// assert_eq!(upper_snake("uart0"), "UART0");
/// assert_eq!(upper_snake("INTR_STATE"), "INTR_STATE");
/// ```
pub fn upper_snake(name: &str) -> String {
    let mut result = String::new();
    if let Some(c) = name.chars().next() {
        if c.is_ascii_digit() {
            result.push('_');
        }
    }
    let mut prev = None;
    for c in name.chars() {
        if c.is_ascii_whitespace() || c.is_ascii_punctuation() {
            if prev != Some('_') {
                result.push('_');
            }
            prev = Some('_');
            continue;
        }
        if let Some(prev) = prev {
            if (prev.is_ascii_lowercase() || prev.is_ascii_digit()) && c.is_ascii_uppercase() {
                result.push('_');
            }
        }
        prev = Some(c);
        result.push(c.to_ascii_uppercase());
    }
    result.trim_end_matches('_').to_string()
}

/// Formats a value as an unsigned C hex literal.
pub fn c_hex(val: u64) -> String {
    format!("{val:#x}u")
}

/// Formats a value as a sized SystemVerilog hex literal, zero-padded to the
/// width and grouped in fours with underscores.
///
/// # Examples
/// ```
/// use registers_render::util::sv_hex;
/// assert_eq!(sv_hex(0x4000_0000, 32), "32'h4000_0000");
/// assert_eq!(sv_hex(0x20, 32), "32'h0000_0020");
/// assert_eq!(sv_hex(0x3, 8), "8'h03");
/// ```
pub fn sv_hex(val: u64, width: u32) -> String {
    let digits = width.div_ceil(4).max(1) as usize;
    let hex = format!("{val:0digits$x}");
    let mut grouped = String::new();
    for (i, c) in hex.chars().rev().enumerate() {
        if i % 4 == 0 && i != 0 {
            grouped.push('_');
        }
        grouped.push(c);
    }
    format!("{width}'h{}", grouped.chars().rev().collect::<String>())
}

/// The first line of an optional description, or an empty string.
pub fn first_line(desc: Option<&str>) -> &str {
    desc.and_then(|d| d.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("")
}
