// Licensed under the Apache-2.0 license

//! Register assembly: plain registers, multireg templates and windows.
//!
//! Everything produced here still has offset 0; the block allocator assigns
//! offsets once the entity's size and alignment are known.

use crate::access::{HwAccess, SwAccess};
use crate::error::{Location, RegError, RegResult};
use crate::field::{parse_resval, width_mask, Field, FieldContext};
use crate::params::Params;
use crate::tree::{
    check_int, check_keys, check_list, check_name, check_str_list, opt_bool, opt_int, opt_str,
    RawMap,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Block-level information registers are assembled against.
#[derive(Clone, Copy, Debug)]
pub struct RegContext<'a> {
    /// Location of the enclosing block.
    pub loc: &'a Location,
    pub regwidth: u32,
    pub mubi_width: u32,
    pub params: &'a Params,
}

impl RegContext<'_> {
    /// Size of one register in bytes.
    pub fn word_bytes(&self) -> u64 {
        u64::from(self.regwidth / 8)
    }
}

/// Where a register came from when it was produced by a multireg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiregIndex {
    /// Name of the template register.
    pub template: String,
    pub index: u64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub name: String,
    pub desc: Option<String>,
    /// Byte offset within the block.
    pub offset: u64,
    pub fields: Vec<Field>,
    /// Register whose value gates writes to this one.
    pub regwen: Option<String>,
    /// Storage lives outside the block (the "external" hardware access
    /// policy). Fields keep their `hwaccess` for the direction of the hardware
    /// port; this flag is the only record that the register is external.
    pub hwext: bool,
    pub hwqe: bool,
    pub hwre: bool,
    pub shadowed: bool,
    pub writes_ignore_errors: bool,
    pub tags: Vec<String>,
    pub multireg: Option<MultiregIndex>,
}

const REG_REQUIRED: &[&str] = &["name", "fields"];
const REG_OPTIONAL: &[&str] = &[
    "desc",
    "swaccess",
    "hwaccess",
    "resval",
    "regwen",
    "hwext",
    "hwqe",
    "hwre",
    "shadowed",
    "tags",
    "writes_ignore_errors",
    "offset",
];

impl Register {
    pub fn from_raw(raw: &Value, ctx: &RegContext) -> RegResult<Register> {
        let map = check_keys(raw, ctx.loc, "register", REG_REQUIRED, REG_OPTIONAL)?;
        Self::from_map(map, ctx)
    }

    fn from_map(map: &RawMap, ctx: &RegContext) -> RegResult<Register> {
        let name = check_name(&map["name"], ctx.loc, "register name")?;
        let loc = ctx.loc.register(&name);
        let what = format!("register {name}");

        let swaccess = map
            .get("swaccess")
            .map(|v| SwAccess::from_raw(v, &loc, "swaccess"))
            .transpose()?
            .unwrap_or(SwAccess::Rw);
        let hwaccess = map
            .get("hwaccess")
            .map(|v| HwAccess::from_raw(v, &loc, "hwaccess"))
            .transpose()?
            .unwrap_or(HwAccess::Hro);
        let reg_resval = opt_int(map, "resval", &loc, &what)?;
        if let Some(resval) = reg_resval {
            if resval & !width_mask(ctx.regwidth) != 0 {
                return Err(RegError::FieldRange {
                    loc,
                    msg: format!(
                        "register reset value {resval:#x} does not fit in {} bits",
                        ctx.regwidth
                    ),
                });
            }
        }

        let raw_fields = check_list(&map["fields"], &loc, "fields")?;
        if raw_fields.is_empty() {
            return Err(RegError::schema(&loc, "register has no fields"));
        }
        let field_ctx = FieldContext {
            loc: &loc,
            reg_name: &name,
            regwidth: ctx.regwidth,
            mubi_width: ctx.mubi_width,
            swaccess,
            hwaccess,
            reg_resval,
            only_field: raw_fields.len() == 1,
        };
        let mut fields = Vec::new();
        for raw in raw_fields {
            fields.extend(Field::from_raw(raw, &field_ctx)?);
        }

        let regwen = map
            .get("regwen")
            .map(|v| check_name(v, &loc, "regwen"))
            .transpose()?;
        let reg = Register {
            desc: opt_str(map, "desc", &loc, &what)?,
            offset: 0,
            fields,
            regwen,
            hwext: opt_bool(map, "hwext", &loc, &what)?,
            hwqe: opt_bool(map, "hwqe", &loc, &what)?,
            hwre: opt_bool(map, "hwre", &loc, &what)?,
            shadowed: opt_bool(map, "shadowed", &loc, &what)?,
            writes_ignore_errors: opt_bool(map, "writes_ignore_errors", &loc, &what)?,
            tags: map
                .get("tags")
                .map(|t| check_str_list(t, &loc, "tags"))
                .transpose()?
                .unwrap_or_default(),
            multireg: None,
            name,
        };
        reg.check_fields(ctx.regwidth, ctx.mubi_width, ctx.loc)?;

        if let Some(resval) = reg_resval {
            let stray = resval & !reg.mask();
            if stray != 0 {
                return Err(RegError::schema(
                    &loc,
                    format!("register reset value sets bits {stray:#x} that belong to no field"),
                ));
            }
        }
        Ok(reg)
    }

    /// Validate every field and check the fields are pairwise disjoint.
    pub fn check_fields(&self, regwidth: u32, mubi_width: u32, block_loc: &Location) -> RegResult<()> {
        let loc = block_loc.register(&self.name);
        for field in &self.fields {
            field.validate(regwidth, mubi_width, &loc)?;
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(RegError::schema(
                    &loc,
                    format!("duplicate field name {}", field.name),
                ));
            }
        }

        let mut sorted: Vec<&Field> = self.fields.iter().collect();
        sorted.sort_by_key(|f| f.bits.lsb);
        for pair in sorted.windows(2) {
            if pair[0].bits.overlaps(&pair[1].bits) {
                return Err(RegError::FieldOverlap {
                    loc,
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Composite reset value.
    pub fn resval(&self) -> u64 {
        self.fields
            .iter()
            .fold(0, |acc, f| acc | f.composite_resval())
    }

    /// Bits covered by any field.
    pub fn mask(&self) -> u64 {
        self.fields.iter().fold(0, |acc, f| acc | f.bits.mask())
    }

    /// Bits software can read back.
    pub fn read_mask(&self) -> u64 {
        self.fields
            .iter()
            .filter(|f| f.swaccess.allows_read())
            .fold(0, |acc, f| acc | f.bits.mask())
    }

    /// Bits a software write can change.
    pub fn write_mask(&self) -> u64 {
        self.fields
            .iter()
            .filter(|f| f.swaccess.allows_write())
            .fold(0, |acc, f| acc | f.bits.mask())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

//=============================================================================
// Multireg
//=============================================================================

/// A reset value replacing the template's for one field of one instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResvalOverride {
    pub index: u64,
    pub field: String,
    pub resval: u64,
}

/// A register template repeated `count` times.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Multireg {
    pub template: Register,
    pub count: u64,
    /// Distance between instances in bytes; one register word when absent.
    pub stride: Option<u64>,
    pub overrides: Vec<ResvalOverride>,
}

const MULTIREG_REQUIRED: &[&str] = &["name", "fields", "count"];
const MULTIREG_OPTIONAL: &[&str] = &[
    "desc",
    "swaccess",
    "hwaccess",
    "resval",
    "regwen",
    "hwext",
    "hwqe",
    "hwre",
    "shadowed",
    "tags",
    "writes_ignore_errors",
    "offset",
    "stride",
    "resval_overrides",
];

const OVERRIDE_KEYS: &[&str] = &["index", "field", "resval"];

impl Multireg {
    pub fn from_raw(raw: &Value, ctx: &RegContext) -> RegResult<Multireg> {
        let map = check_keys(raw, ctx.loc, "multireg", MULTIREG_REQUIRED, MULTIREG_OPTIONAL)?;
        let template = Register::from_map(map, ctx)?;
        let loc = ctx.loc.register(&template.name);
        let what = format!("multireg {}", template.name);

        let count = ctx.params.resolve(&map["count"], &loc, "count")?;
        if count == 0 {
            return Err(RegError::schema(&loc, "multireg count is zero"));
        }

        let stride = opt_int(map, "stride", &loc, &what)?;
        if let Some(stride) = stride {
            let word = ctx.word_bytes();
            if stride == 0 || stride % word != 0 {
                return Err(RegError::Alignment {
                    loc,
                    name: format!("stride of {}", template.name),
                    addr: stride,
                    align: word,
                });
            }
        }

        let mut overrides = Vec::new();
        if let Some(raw) = map.get("resval_overrides") {
            for entry in check_list(raw, &loc, "resval_overrides")? {
                let entry = check_keys(entry, &loc, "reset override", OVERRIDE_KEYS, &[])?;
                let index = check_int(&entry["index"], &loc, "override index")?;
                let field_name = check_name(&entry["field"], &loc, "override field")?;
                let field = template.field(&field_name).ok_or_else(|| {
                    RegError::schema(&loc, format!("override names unknown field {field_name}"))
                })?;
                let field_loc = loc.field(&field_name);
                let resval = parse_resval(&entry["resval"], &field.bits, field.mubi, &field_loc)?;
                overrides.push(ResvalOverride {
                    index,
                    field: field_name,
                    resval,
                });
            }
        }

        Ok(Multireg {
            template,
            count,
            stride,
            overrides,
        })
    }

    pub fn stride(&self, word_bytes: u64) -> u64 {
        self.stride.unwrap_or(word_bytes)
    }

    pub fn expand(&self, block_loc: &Location) -> RegResult<Vec<Register>> {
        expand_multireg(&self.template, self.count, &self.overrides, block_loc)
    }
}

/// Replicate `template` into `count` registers named `<template>_<i>`.
///
/// Instances share the template's field layout; `overrides` replace the
/// reset value of one field in one instance.
pub fn expand_multireg(
    template: &Register,
    count: u64,
    overrides: &[ResvalOverride],
    block_loc: &Location,
) -> RegResult<Vec<Register>> {
    let loc = block_loc.register(&template.name);
    if count == 0 {
        return Err(RegError::schema(&loc, "multireg count is zero"));
    }
    for ovr in overrides {
        if ovr.index >= count {
            return Err(RegError::schema(
                &loc,
                format!("override index {} is out of range for count {count}", ovr.index),
            ));
        }
        if template.field(&ovr.field).is_none() {
            return Err(RegError::schema(
                &loc,
                format!("override names unknown field {}", ovr.field),
            ));
        }
    }

    let mut regs = Vec::new();
    for index in 0..count {
        let mut reg = template.clone();
        reg.name = format!("{}_{index}", template.name);
        reg.multireg = Some(MultiregIndex {
            template: template.name.clone(),
            index,
            count,
        });
        for ovr in overrides.iter().filter(|o| o.index == index) {
            if let Some(field) = reg.fields.iter_mut().find(|f| f.name == ovr.field) {
                if ovr.resval & !field.bits.value_mask() != 0 {
                    return Err(RegError::FieldRange {
                        loc: block_loc.register(&reg.name).field(&field.name),
                        msg: format!(
                            "reset override {:#x} does not fit in {} bits",
                            ovr.resval,
                            field.bits.width()
                        ),
                    });
                }
                field.resval = ovr.resval;
            }
        }
        regs.push(reg);
    }
    Ok(regs)
}

//=============================================================================
// Window
//=============================================================================

/// An address range with no field layout, such as a FIFO port or memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub name: String,
    pub desc: Option<String>,
    pub offset: u64,
    pub items: u64,
    /// Meaningful bits per item.
    pub validbits: u32,
    /// Size in bytes.
    pub size: u64,
    pub swaccess: SwAccess,
    pub byte_write: bool,
    pub tags: Vec<String>,
}

const WINDOW_REQUIRED: &[&str] = &["name", "items"];
const WINDOW_OPTIONAL: &[&str] = &[
    "desc",
    "validbits",
    "size",
    "swaccess",
    "byte-write",
    "offset",
    "tags",
];

impl Window {
    pub fn from_raw(raw: &Value, ctx: &RegContext) -> RegResult<Window> {
        let map = check_keys(raw, ctx.loc, "window", WINDOW_REQUIRED, WINDOW_OPTIONAL)?;
        let name = check_name(&map["name"], ctx.loc, "window name")?;
        let loc = ctx.loc.register(&name);
        let what = format!("window {name}");

        let items = ctx.params.resolve(&map["items"], &loc, "items")?;
        let validbits = match opt_int(map, "validbits", &loc, &what)? {
            Some(bits) => u32::try_from(bits)
                .map_err(|_| RegError::schema(&loc, format!("validbits {bits} is out of range")))?,
            None => ctx.regwidth,
        };
        let size = match opt_int(map, "size", &loc, &what)? {
            Some(size) => size,
            None => items.checked_mul(ctx.word_bytes()).ok_or_else(|| {
                RegError::schema(&loc, format!("{items} items do not fit in the address space"))
            })?,
        };

        let window = Window {
            desc: opt_str(map, "desc", &loc, &what)?,
            offset: 0,
            items,
            validbits,
            size,
            swaccess: map
                .get("swaccess")
                .map(|v| SwAccess::from_raw(v, &loc, "swaccess"))
                .transpose()?
                .unwrap_or(SwAccess::Rw),
            byte_write: opt_bool(map, "byte-write", &loc, &what)?,
            tags: map
                .get("tags")
                .map(|t| check_str_list(t, &loc, "tags"))
                .transpose()?
                .unwrap_or_default(),
            name,
        };
        window.validate(ctx.regwidth, ctx.loc)?;
        Ok(window)
    }

    pub fn validate(&self, regwidth: u32, block_loc: &Location) -> RegResult<()> {
        let loc = block_loc.register(&self.name);
        let word = u64::from(regwidth / 8);
        if self.items == 0 {
            return Err(RegError::schema(&loc, "window has no items"));
        }
        if self.validbits == 0 || self.validbits > regwidth {
            return Err(RegError::schema(
                &loc,
                format!("validbits {} is not in 1..={regwidth}", self.validbits),
            ));
        }
        if self.size == 0 || self.size % word != 0 {
            return Err(RegError::Alignment {
                loc,
                name: format!("size of window {}", self.name),
                addr: self.size,
                align: word,
            });
        }
        if self.items.checked_mul(word).map_or(true, |need| self.size < need) {
            return Err(RegError::schema(
                &loc,
                format!(
                    "size {:#x} is too small for {} items of {word} bytes",
                    self.size, self.items
                ),
            ));
        }
        Ok(())
    }

    /// Alignment of the window's offset: its size rounded up to a power of two.
    pub fn align(&self) -> u64 {
        self.size.checked_next_power_of_two().unwrap_or(1 << 63)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_ctx<T>(f: impl FnOnce(&RegContext) -> T) -> T {
        let loc = Location::block("uart");
        let params = Params::from_raw(
            Some(&json!([{"name": "NumFifo", "default": 4}])),
            &loc,
        )
        .unwrap();
        let ctx = RegContext {
            loc: &loc,
            regwidth: 32,
            mubi_width: 4,
            params: &params,
        };
        f(&ctx)
    }

    #[test]
    fn test_uart_ctrl() {
        let reg = with_ctx(|ctx| {
            Register::from_raw(
                &json!({
                    "name": "CTRL",
                    "desc": "UART control",
                    "fields": [
                        {"name": "TX_EN", "bits": "0", "swaccess": "rw"},
                        {"name": "RX_EN", "bits": "1", "swaccess": "rw"},
                    ]
                }),
                ctx,
            )
        })
        .unwrap();
        assert_eq!(reg.offset, 0);
        assert_eq!(reg.resval(), 0);
        assert_eq!(reg.fields.len(), 2);
        assert!(!reg.fields[0].bits.overlaps(&reg.fields[1].bits));
        assert_eq!(reg.mask(), 0x3);
        assert_eq!(reg.write_mask(), 0x3);
    }

    #[test]
    fn test_field_overlap() {
        let err = with_ctx(|ctx| {
            Register::from_raw(
                &json!({
                    "name": "CTRL",
                    "fields": [
                        {"name": "A", "bits": "3:0"},
                        {"name": "B", "bits": "7:6"},
                        {"name": "C", "bits": "4:3"},
                    ]
                }),
                ctx,
            )
        })
        .unwrap_err();
        assert_eq!(
            err,
            RegError::FieldOverlap {
                loc: Location::block("uart").register("CTRL"),
                first: "A".into(),
                second: "C".into(),
            }
        );
    }

    #[test]
    fn test_register_defaults_and_masks() {
        let reg = with_ctx(|ctx| {
            Register::from_raw(
                &json!({
                    "name": "STATUS",
                    "swaccess": "ro",
                    "hwaccess": "hwo",
                    "resval": "0x81",
                    "hwext": "true",
                    "fields": [
                        {"name": "READY", "bits": "0"},
                        {"name": "LEVEL", "bits": "7:4", "swaccess": "rw1c"},
                        {"name": "SECRET", "bits": "8", "swaccess": "wo"},
                    ]
                }),
                ctx,
            )
        })
        .unwrap();
        assert!(reg.hwext);
        assert_eq!(reg.fields[0].hwaccess, HwAccess::Hwo);
        assert_eq!(reg.resval(), 0x81);
        assert_eq!(reg.field("LEVEL").unwrap().resval, 0x8);
        assert_eq!(reg.read_mask(), 0xf1);
        assert_eq!(reg.write_mask(), 0x1f0);
    }

    #[test]
    fn test_register_resval_outside_fields() {
        let err = with_ctx(|ctx| {
            Register::from_raw(
                &json!({"name": "R", "resval": "0x100", "fields": [{"name": "A", "bits": "7:0"}]}),
                ctx,
            )
        })
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");
    }

    #[test]
    fn test_duplicate_field_names() {
        let err = with_ctx(|ctx| {
            Register::from_raw(
                &json!({"name": "R", "fields": [
                    {"name": "A", "bits": "0"},
                    {"name": "A", "bits": "1"},
                ]}),
                ctx,
            )
        })
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");
    }

    #[test]
    fn test_multireg_expansion() {
        let mr = with_ctx(|ctx| {
            Multireg::from_raw(
                &json!({
                    "name": "FIFO_DATA",
                    "count": "NumFifo",
                    "stride": 4,
                    "fields": [{"name": "DATA", "bits": "7:0", "resval": "0x5"}],
                    "resval_overrides": [{"index": 2, "field": "DATA", "resval": "0xa"}],
                }),
                ctx,
            )
        })
        .unwrap();
        assert_eq!(mr.count, 4);
        assert_eq!(mr.stride(4), 4);
        let regs = mr.expand(&Location::block("uart")).unwrap();
        assert_eq!(regs.len(), 4);
        let names: Vec<&str> = regs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["FIFO_DATA_0", "FIFO_DATA_1", "FIFO_DATA_2", "FIFO_DATA_3"]);
        let resets: Vec<u64> = regs.iter().map(Register::resval).collect();
        assert_eq!(resets, [5, 5, 0xa, 5]);
        for (i, reg) in regs.iter().enumerate() {
            assert_eq!(reg.fields[0].bits, mr.template.fields[0].bits);
            let idx = reg.multireg.as_ref().unwrap();
            assert_eq!((idx.template.as_str(), idx.index, idx.count), ("FIFO_DATA", i as u64, 4));
        }
    }

    #[test]
    fn test_multireg_errors() {
        let base = |extra: Value| {
            let mut raw = json!({"name": "M", "count": 2, "fields": [{"name": "F", "bits": "1:0"}]});
            for (k, v) in extra.as_object().unwrap() {
                raw[k] = v.clone();
            }
            with_ctx(|ctx| Multireg::from_raw(&raw, ctx))
        };
        assert!(matches!(base(json!({"count": 0})), Err(RegError::Schema { .. })));
        assert!(matches!(base(json!({"count": "Nope"})), Err(RegError::Schema { .. })));
        assert!(matches!(base(json!({"stride": 6})), Err(RegError::Alignment { .. })));
        assert!(matches!(
            base(json!({"resval_overrides": [{"index": 0, "field": "G", "resval": 1}]})),
            Err(RegError::Schema { .. })
        ));
        assert!(matches!(
            base(json!({"resval_overrides": [{"index": 0, "field": "F", "resval": 4}]})),
            Err(RegError::FieldRange { .. })
        ));

        let mr = base(json!({"resval_overrides": [{"index": 5, "field": "F", "resval": 1}]})).unwrap();
        assert!(matches!(
            mr.expand(&Location::block("uart")),
            Err(RegError::Schema { .. })
        ));
    }

    #[test]
    fn test_window() {
        let win = with_ctx(|ctx| {
            Window::from_raw(
                &json!({"name": "MSG", "items": 6, "validbits": 8, "swaccess": "wo", "byte-write": true}),
                ctx,
            )
        })
        .unwrap();
        assert_eq!(win.size, 24);
        assert_eq!(win.align(), 32);
        assert_eq!(win.validbits, 8);
        assert!(win.byte_write);

        let err = with_ctx(|ctx| {
            Window::from_raw(&json!({"name": "W", "items": 2, "size": 6}), ctx)
        })
        .unwrap_err();
        assert!(matches!(err, RegError::Alignment { .. }), "{err}");

        let err = with_ctx(|ctx| {
            Window::from_raw(&json!({"name": "W", "items": 4, "size": 8}), ctx)
        })
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");

        let err = with_ctx(|ctx| {
            Window::from_raw(&json!({"name": "W", "items": 1, "validbits": 33}), ctx)
        })
        .unwrap_err();
        assert!(matches!(err, RegError::Schema { .. }), "{err}");
    }
}
