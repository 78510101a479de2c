// Licensed under the Apache-2.0 license

//! Field normalization.
//!
//! Turns one raw field description into validated [`Field`]s: parses the
//! bit range, resolves access policies against the register defaults,
//! computes the reset value (including multi-bit boolean encodings), checks
//! the enum table and expands `auto_split`.
//!
//! Overlap between fields is checked by the register assembler once every
//! field of a register has been normalized.

use crate::access::{HwAccess, SwAccess};
use crate::error::{Location, RegError, RegResult};
use crate::tree::{
    check_bool, check_int, check_keys, check_list, check_name, check_str_list, opt_bool, opt_str,
    parse_int,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

//=============================================================================
// Bits
//=============================================================================

/// An inclusive bit range `[lsb, msb]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bits {
    pub lsb: u32,
    pub msb: u32,
}

impl Bits {
    pub fn new(lsb: u32, msb: u32) -> Self {
        Self { lsb, msb }
    }

    pub fn width(&self) -> u32 {
        self.msb - self.lsb + 1
    }

    /// Mask of the field's bits in their unshifted position.
    pub fn value_mask(&self) -> u64 {
        width_mask(self.width())
    }

    /// Mask of the field's bits in register position.
    pub fn mask(&self) -> u64 {
        self.value_mask() << self.lsb
    }

    pub fn overlaps(&self, other: &Bits) -> bool {
        self.lsb <= other.msb && other.lsb <= self.msb
    }

    /// Parse `"N"`, `"M:L"` or a plain integer.
    pub fn from_raw(raw: &Value, loc: &Location) -> RegResult<Self> {
        let bad = |msg: String| RegError::FieldRange {
            loc: loc.clone(),
            msg,
        };
        let (msb, lsb) = match raw {
            Value::Number(_) => {
                let bit = check_int(raw, loc, "bits")?;
                (bit, bit)
            }
            Value::String(s) => match s.split_once(':') {
                Some((hi, lo)) => (
                    parse_int(hi).ok_or_else(|| bad(format!("cannot parse {s:?}")))?,
                    parse_int(lo).ok_or_else(|| bad(format!("cannot parse {s:?}")))?,
                ),
                None => {
                    let bit = parse_int(s).ok_or_else(|| bad(format!("cannot parse {s:?}")))?;
                    (bit, bit)
                }
            },
            _ => return Err(RegError::schema(loc, format!("bits is not a string: {raw}"))),
        };
        if msb < lsb {
            return Err(bad(format!("msb {msb} is below lsb {lsb}")));
        }
        let msb = u32::try_from(msb).map_err(|_| bad(format!("msb {msb} is out of range")))?;
        Ok(Bits::new(lsb as u32, msb))
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msb == self.lsb {
            write!(f, "{}", self.lsb)
        } else {
            write!(f, "{}:{}", self.msb, self.lsb)
        }
    }
}

/// All-ones mask of `width` bits.
pub fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Encoded value of a multi-bit boolean of `width` bits.
///
/// True alternates the nibbles `0x6` and `0x9` starting from the least
/// significant one (`0x6`, `0x96`, `0x696`, ...); false is its complement.
pub fn mubi_value(width: u32, value: bool) -> u64 {
    let mut true_val = 0u64;
    for nibble in 0..width / 4 {
        let n = if nibble % 2 == 0 { 0x6 } else { 0x9 };
        true_val |= n << (nibble * 4);
    }
    if value {
        true_val
    } else {
        !true_val & width_mask(width)
    }
}

//=============================================================================
// Field
//=============================================================================

/// One symbolic value of a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub value: u64,
    pub name: String,
    pub desc: Option<String>,
}

/// A validated bit field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub desc: Option<String>,
    pub bits: Bits,
    pub swaccess: SwAccess,
    pub hwaccess: HwAccess,
    /// Reset value, unshifted.
    pub resval: u64,
    pub enums: Vec<EnumValue>,
    pub mubi: bool,
    pub tags: Vec<String>,
}

/// Register-level information a field is normalized against.
#[derive(Clone, Debug)]
pub struct FieldContext<'a> {
    /// Location of the enclosing register.
    pub loc: &'a Location,
    pub reg_name: &'a str,
    pub regwidth: u32,
    pub mubi_width: u32,
    /// Register-level default software access.
    pub swaccess: SwAccess,
    /// Register-level default hardware access.
    pub hwaccess: HwAccess,
    /// Register-level reset value, if the register declares one.
    pub reg_resval: Option<u64>,
    /// Whether this is the register's only field (and so may be unnamed).
    pub only_field: bool,
}

const FIELD_REQUIRED: &[&str] = &["bits"];
const FIELD_OPTIONAL: &[&str] = &[
    "name",
    "desc",
    "swaccess",
    "hwaccess",
    "resval",
    "enum",
    "mubi",
    "auto_split",
    "tags",
];

impl Field {
    /// Normalize one raw field. Returns several fields when `auto_split` is set.
    pub fn from_raw(raw: &Value, ctx: &FieldContext) -> RegResult<Vec<Field>> {
        let map = check_keys(raw, ctx.loc, "field", FIELD_REQUIRED, FIELD_OPTIONAL)?;

        let name = match map.get("name") {
            Some(n) => check_name(n, ctx.loc, "field name")?,
            None if ctx.only_field => ctx.reg_name.to_string(),
            None => {
                return Err(RegError::schema(
                    ctx.loc,
                    "field without a name in a register with several fields",
                ))
            }
        };
        let loc = ctx.loc.field(&name);
        let what = format!("field {name}");

        let bits = Bits::from_raw(&map["bits"], &loc)?;
        let swaccess = map
            .get("swaccess")
            .map(|v| SwAccess::from_raw(v, &loc, "swaccess"))
            .transpose()?
            .unwrap_or(ctx.swaccess);
        let hwaccess = map
            .get("hwaccess")
            .map(|v| HwAccess::from_raw(v, &loc, "hwaccess"))
            .transpose()?
            .unwrap_or(ctx.hwaccess);
        let mubi = opt_bool(map, "mubi", &loc, &what)?;
        let auto_split = opt_bool(map, "auto_split", &loc, &what)?;
        let tags = map
            .get("tags")
            .map(|t| check_str_list(t, &loc, "tags"))
            .transpose()?
            .unwrap_or_default();

        check_width(&bits, mubi, ctx.regwidth, ctx.mubi_width, &loc)?;

        let resval = match map.get("resval") {
            Some(raw) => {
                let val = parse_resval(raw, &bits, mubi, &loc)?;
                if let Some(reg_resval) = ctx.reg_resval {
                    let from_reg = (reg_resval >> bits.lsb) & bits.value_mask();
                    if from_reg != val {
                        return Err(RegError::schema(
                            &loc,
                            format!(
                                "reset value {val:#x} disagrees with the register reset value \
                                 (which gives {from_reg:#x})"
                            ),
                        ));
                    }
                }
                val
            }
            None => ctx
                .reg_resval
                .map(|r| (r >> bits.lsb) & bits.value_mask())
                .unwrap_or(0),
        };

        let enums = map
            .get("enum")
            .map(|e| parse_enums(e, &bits, &loc))
            .transpose()?
            .unwrap_or_default();

        let field = Field {
            desc: opt_str(map, "desc", &loc, &what)?,
            name,
            bits,
            swaccess,
            hwaccess,
            resval,
            enums,
            mubi,
            tags,
        };
        field.validate(ctx.regwidth, ctx.mubi_width, ctx.loc)?;

        if !auto_split {
            return Ok(vec![field]);
        }
        if !field.enums.is_empty() {
            return Err(RegError::Enum {
                loc,
                msg: "auto_split fields cannot carry an enum".into(),
            });
        }
        if field.mubi {
            return Err(RegError::schema(&loc, "mubi fields cannot be auto_split"));
        }
        Ok(field.auto_split())
    }

    /// Split into one 1-bit field per bit, named `<name>_<i>`.
    pub fn auto_split(&self) -> Vec<Field> {
        (0..self.bits.width())
            .map(|i| Field {
                name: format!("{}_{i}", self.name),
                desc: self.desc.clone(),
                bits: Bits::new(self.bits.lsb + i, self.bits.lsb + i),
                swaccess: self.swaccess,
                hwaccess: self.hwaccess,
                resval: (self.resval >> i) & 1,
                enums: vec![],
                mubi: false,
                tags: self.tags.clone(),
            })
            .collect()
    }

    /// Reset value shifted into register position.
    pub fn composite_resval(&self) -> u64 {
        self.resval << self.bits.lsb
    }

    /// Check every per-field invariant. `reg_loc` is the enclosing register.
    pub fn validate(&self, regwidth: u32, mubi_width: u32, reg_loc: &Location) -> RegResult<()> {
        let loc = reg_loc.field(&self.name);
        if self.bits.msb < self.bits.lsb {
            return Err(RegError::FieldRange {
                loc,
                msg: format!("msb {} is below lsb {}", self.bits.msb, self.bits.lsb),
            });
        }
        check_width(&self.bits, self.mubi, regwidth, mubi_width, &loc)?;
        if self.resval & !self.bits.value_mask() != 0 {
            return Err(RegError::FieldRange {
                loc,
                msg: format!(
                    "reset value {:#x} does not fit in {} bits",
                    self.resval,
                    self.bits.width()
                ),
            });
        }
        check_enums(&self.enums, &self.bits, &loc)
    }
}

fn check_width(bits: &Bits, mubi: bool, regwidth: u32, mubi_width: u32, loc: &Location) -> RegResult<()> {
    if bits.msb >= regwidth {
        return Err(RegError::FieldWidth {
            loc: loc.clone(),
            msg: format!("bits {bits} do not fit in a {regwidth}-bit register"),
        });
    }
    if mubi && bits.width() != mubi_width {
        return Err(RegError::FieldWidth {
            loc: loc.clone(),
            msg: format!(
                "mubi field is {} bits wide but the mubi encoding is {mubi_width} bits",
                bits.width()
            ),
        });
    }
    Ok(())
}

pub(crate) fn parse_resval(raw: &Value, bits: &Bits, mubi: bool, loc: &Location) -> RegResult<u64> {
    let is_bool = matches!(raw, Value::Bool(_))
        || matches!(raw, Value::String(s) if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"));
    if mubi && is_bool {
        return Ok(mubi_value(bits.width(), check_bool(raw, loc, "resval")?));
    }
    let val = check_int(raw, loc, "resval")?;
    if val & !bits.value_mask() != 0 {
        return Err(RegError::FieldRange {
            loc: loc.clone(),
            msg: format!("reset value {val:#x} does not fit in {} bits", bits.width()),
        });
    }
    Ok(val)
}

const ENUM_REQUIRED: &[&str] = &["value", "name"];
const ENUM_OPTIONAL: &[&str] = &["desc"];

fn parse_enums(raw: &Value, bits: &Bits, loc: &Location) -> RegResult<Vec<EnumValue>> {
    let mut values = Vec::new();
    for entry in check_list(raw, loc, "enum")? {
        let map = check_keys(entry, loc, "enum entry", ENUM_REQUIRED, ENUM_OPTIONAL)?;
        let name = check_name(&map["name"], loc, "enum name")?;
        values.push(EnumValue {
            value: check_int(&map["value"], loc, &format!("value of enum {name}"))?,
            desc: opt_str(map, "desc", loc, "enum entry")?,
            name,
        });
    }
    check_enums(&values, bits, loc)?;
    Ok(values)
}

fn check_enums(values: &[EnumValue], bits: &Bits, loc: &Location) -> RegResult<()> {
    for (i, ev) in values.iter().enumerate() {
        if ev.value & !bits.value_mask() != 0 {
            return Err(RegError::Enum {
                loc: loc.clone(),
                msg: format!(
                    "value {:#x} of {} does not fit in {} bits",
                    ev.value,
                    ev.name,
                    bits.width()
                ),
            });
        }
        if let Some(prev) = values[..i].iter().find(|p| p.value == ev.value) {
            return Err(RegError::Enum {
                loc: loc.clone(),
                msg: format!("{} and {} share the value {:#x}", prev.name, ev.name, ev.value),
            });
        }
        if values[..i].iter().any(|p| p.name == ev.name) {
            return Err(RegError::Enum {
                loc: loc.clone(),
                msg: format!("duplicate name {}", ev.name),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(loc: &Location) -> FieldContext<'_> {
        FieldContext {
            loc,
            reg_name: "CTRL",
            regwidth: 32,
            mubi_width: 4,
            swaccess: SwAccess::Rw,
            hwaccess: HwAccess::Hro,
            reg_resval: None,
            only_field: false,
        }
    }

    fn one(raw: Value) -> RegResult<Field> {
        let loc = Location::block("uart").register("CTRL");
        Field::from_raw(&raw, &ctx(&loc)).map(|mut v| v.remove(0))
    }

    #[test]
    fn test_bits_parsing() {
        let loc = Location::top();
        assert_eq!(Bits::from_raw(&json!("3"), &loc).unwrap(), Bits::new(3, 3));
        assert_eq!(Bits::from_raw(&json!("7:4"), &loc).unwrap(), Bits::new(4, 7));
        assert_eq!(Bits::from_raw(&json!(0), &loc).unwrap(), Bits::new(0, 0));
        assert!(matches!(
            Bits::from_raw(&json!("4:7"), &loc),
            Err(RegError::FieldRange { .. })
        ));
        assert!(matches!(
            Bits::from_raw(&json!("a:b"), &loc),
            Err(RegError::FieldRange { .. })
        ));
        assert_eq!(Bits::new(4, 7).mask(), 0xf0);
        assert_eq!(Bits::new(4, 7).to_string(), "7:4");
        assert_eq!(Bits::new(0, 63).mask(), u64::MAX);
    }

    #[test]
    fn test_defaults_come_from_register() {
        let field = one(json!({"name": "TX_EN", "bits": "0"})).unwrap();
        assert_eq!(field.swaccess, SwAccess::Rw);
        assert_eq!(field.hwaccess, HwAccess::Hro);
        assert_eq!(field.resval, 0);
        assert!(!field.mubi);

        let field = one(json!({"name": "S", "bits": "1", "swaccess": "ro", "hwaccess": "hwo"})).unwrap();
        assert_eq!(field.swaccess, SwAccess::Ro);
        assert_eq!(field.hwaccess, HwAccess::Hwo);
    }

    #[test]
    fn test_field_past_register_width() {
        let err = one(json!({"name": "BIG", "bits": "32"})).unwrap_err();
        assert!(matches!(err, RegError::FieldWidth { .. }), "{err}");
        assert_eq!(err.location().field.as_deref(), Some("BIG"));
    }

    #[test]
    fn test_resval_must_fit() {
        let err = one(json!({"name": "A", "bits": "1:0", "resval": 4})).unwrap_err();
        assert!(matches!(err, RegError::FieldRange { .. }), "{err}");
        let field = one(json!({"name": "A", "bits": "1:0", "resval": "0x3"})).unwrap();
        assert_eq!(field.resval, 3);
        assert_eq!(field.composite_resval(), 3);
    }

    #[test]
    fn test_register_resval_fills_fields() {
        let loc = Location::block("b").register("R");
        let mut c = ctx(&loc);
        c.reg_resval = Some(0x50);
        let f = Field::from_raw(&json!({"name": "HI", "bits": "7:4"}), &c).unwrap();
        assert_eq!(f[0].resval, 0x5);
        assert!(Field::from_raw(&json!({"name": "HI", "bits": "7:4", "resval": 5}), &c).is_ok());
        assert!(matches!(
            Field::from_raw(&json!({"name": "HI", "bits": "7:4", "resval": 4}), &c),
            Err(RegError::Schema { .. })
        ));
    }

    #[test]
    fn test_unnamed_field() {
        let loc = Location::block("b").register("DATA");
        let mut c = ctx(&loc);
        c.reg_name = "DATA";
        assert!(Field::from_raw(&json!({"bits": "31:0"}), &c).is_err());
        c.only_field = true;
        let f = Field::from_raw(&json!({"bits": "31:0"}), &c).unwrap();
        assert_eq!(f[0].name, "DATA");
    }

    #[test]
    fn test_enum_validation() {
        let ok = one(json!({
            "name": "MODE", "bits": "1:0",
            "enum": [
                {"value": 0, "name": "off"},
                {"value": 3, "name": "on", "desc": "enabled"},
            ]
        }))
        .unwrap();
        assert_eq!(ok.enums.len(), 2);
        assert_eq!(ok.enums[1].desc.as_deref(), Some("enabled"));

        let dup_value = one(json!({
            "name": "MODE", "bits": "1:0",
            "enum": [{"value": 1, "name": "a"}, {"value": 1, "name": "b"}]
        }));
        assert!(matches!(dup_value, Err(RegError::Enum { .. })));

        let dup_name = one(json!({
            "name": "MODE", "bits": "1:0",
            "enum": [{"value": 1, "name": "a"}, {"value": 2, "name": "a"}]
        }));
        assert!(matches!(dup_name, Err(RegError::Enum { .. })));

        let too_wide = one(json!({
            "name": "MODE", "bits": "1:0",
            "enum": [{"value": 4, "name": "a"}]
        }));
        assert!(matches!(too_wide, Err(RegError::Enum { .. })));
    }

    #[test]
    fn test_mubi() {
        assert_eq!(mubi_value(4, true), 0x6);
        assert_eq!(mubi_value(4, false), 0x9);
        assert_eq!(mubi_value(8, true), 0x96);
        assert_eq!(mubi_value(8, false), 0x69);
        assert_eq!(mubi_value(16, true), 0x9696);

        let f = one(json!({"name": "EN", "bits": "3:0", "mubi": true, "resval": false})).unwrap();
        assert_eq!(f.resval, 0x9);
        let f = one(json!({"name": "EN", "bits": "7:4", "mubi": "true", "resval": "true"})).unwrap();
        assert_eq!(f.composite_resval(), 0x60);

        let err = one(json!({"name": "EN", "bits": "7:0", "mubi": true})).unwrap_err();
        assert!(matches!(err, RegError::FieldWidth { .. }), "{err}");
    }

    #[test]
    fn test_auto_split() {
        let loc = Location::block("gpio").register("INTR");
        let fields = Field::from_raw(
            &json!({"name": "PIN", "bits": "11:8", "resval": "0b1010", "swaccess": "rw1c", "auto_split": true}),
            &ctx(&loc),
        )
        .unwrap();
        assert_eq!(fields.len(), 4);
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["PIN_0", "PIN_1", "PIN_2", "PIN_3"]);
        let resets: Vec<u64> = fields.iter().map(|f| f.resval).collect();
        assert_eq!(resets, [0, 1, 0, 1]);
        for (i, f) in fields.iter().enumerate() {
            assert_eq!(f.bits, Bits::new(8 + i as u32, 8 + i as u32));
            assert_eq!(f.swaccess, SwAccess::Rw1c);
        }
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                assert!(!a.bits.overlaps(&b.bits));
            }
        }

        let err = Field::from_raw(
            &json!({"name": "P", "bits": "1:0", "auto_split": true,
                    "enum": [{"value": 0, "name": "z"}]}),
            &ctx(&loc),
        )
        .unwrap_err();
        assert!(matches!(err, RegError::Enum { .. }));
    }
}
