// Licensed under the Apache-2.0 license

//! Block address allocation.
//!
//! Walks a block's register list in declaration order, assembling each
//! entry and assigning it the next aligned offset. The list may also hold
//! layout directives: `{skipto: <offset>}` moves the cursor forward and
//! `{reserved: <words>}` leaves a gap.

use crate::config::BlockOptions;
use crate::error::{Location, RegError, RegResult};
use crate::ir::{check_regwidth, BlockMap, Entity};
use crate::params::Params;
use crate::register::{Multireg, RegContext, Register, Window};
use crate::tree::{check_int, check_keys, check_list, check_name, opt_int, require_keys};
use serde_json::Value;

const BLOCK_REQUIRED: &[&str] = &["name", "registers"];
const BLOCK_KNOWN: &[&str] = &["name", "registers", "regwidth", "param_list", "size"];

/// Offset cursor for one block.
struct OffsetCursor<'a> {
    loc: &'a Location,
    word: u64,
    /// First free offset.
    next: u64,
    /// Declared block size, if any.
    limit: Option<u64>,
    /// Most recently placed entity.
    last: Option<String>,
}

impl<'a> OffsetCursor<'a> {
    fn new(loc: &'a Location, word: u64, limit: Option<u64>) -> Self {
        Self {
            loc,
            word,
            next: 0,
            limit,
            last: None,
        }
    }

    fn overflow(&self, name: &str, offset: u64, size: u64) -> RegError {
        RegError::AddressOverflow {
            loc: self.loc.register(name),
            name: name.to_string(),
            offset,
            size,
            limit: self
                .limit
                .map_or(u128::from(u64::MAX) + 1, u128::from),
        }
    }

    /// Place `size` bytes aligned to `align`, at `requested` if given.
    fn place(&mut self, name: &str, requested: Option<u64>, size: u64, align: u64) -> RegResult<u64> {
        let offset = match requested {
            Some(offset) => {
                if offset % align != 0 {
                    return Err(RegError::Alignment {
                        loc: self.loc.register(name),
                        name: name.to_string(),
                        addr: offset,
                        align,
                    });
                }
                if offset < self.next {
                    return Err(RegError::AddressOverlap {
                        loc: self.loc.clone(),
                        first: self.last.clone().unwrap_or_else(|| name.to_string()),
                        second: name.to_string(),
                    });
                }
                offset
            }
            None => self
                .next
                .checked_next_multiple_of(align)
                .ok_or_else(|| self.overflow(name, self.next, size))?,
        };
        let end = offset
            .checked_add(size)
            .filter(|end| self.limit.map_or(true, |limit| *end <= limit))
            .ok_or_else(|| self.overflow(name, offset, size))?;
        log::debug!("{}: {name} at {offset:#x}, {size:#x} bytes", self.loc);
        self.next = end;
        self.last = Some(name.to_string());
        Ok(offset)
    }

    fn skip_to(&mut self, offset: u64) -> RegResult<()> {
        if offset % self.word != 0 {
            return Err(RegError::Alignment {
                loc: self.loc.clone(),
                name: "skipto".into(),
                addr: offset,
                align: self.word,
            });
        }
        if offset < self.next {
            return Err(RegError::schema(
                self.loc,
                format!("skipto {offset:#x} is below the next free offset {:#x}", self.next),
            ));
        }
        self.next = offset;
        Ok(())
    }

    fn reserve(&mut self, words: u64) -> RegResult<()> {
        self.next = words
            .checked_mul(self.word)
            .and_then(|bytes| self.next.checked_add(bytes))
            .ok_or_else(|| self.overflow("reserved", self.next, words))?;
        Ok(())
    }

    /// Total block size: the declared size, or the used span rounded up to a power of two.
    fn total_size(&self) -> RegResult<u64> {
        match self.limit {
            Some(limit) => Ok(limit),
            None => self
                .next
                .max(self.word)
                .checked_next_power_of_two()
                .ok_or_else(|| self.overflow("block", 0, self.next)),
        }
    }
}

impl BlockMap {
    /// Compile one block's raw tree.
    pub fn from_raw(raw: &Value, opts: &BlockOptions) -> RegResult<BlockMap> {
        let map = require_keys(raw, &Location::top(), "block", BLOCK_REQUIRED)?;
        let name = check_name(&map["name"], &Location::top(), "block name")?;
        let loc = Location::block(&name);
        for key in map.keys().filter(|k| !BLOCK_KNOWN.contains(&k.as_str())) {
            log::debug!("{loc}: ignoring key {key}");
        }

        let regwidth = match opt_int(map, "regwidth", &loc, "block")? {
            Some(width) => u32::try_from(width)
                .map_err(|_| RegError::schema(&loc, format!("regwidth {width} is out of range")))?,
            None => 32,
        };
        check_regwidth(regwidth, &loc)?;
        let word = u64::from(regwidth / 8);

        let mut params = Params::from_raw(map.get("param_list"), &loc)?;
        params.apply_overrides(&opts.param_overrides, &loc)?;

        let limit = opt_int(map, "size", &loc, "block")?;
        if let Some(size) = limit {
            if size == 0 || size % word != 0 {
                return Err(RegError::Alignment {
                    loc,
                    name: format!("size of block {name}"),
                    addr: size,
                    align: word,
                });
            }
        }

        let ctx = RegContext {
            loc: &loc,
            regwidth,
            mubi_width: opts.mubi_width,
            params: &params,
        };
        let mut cursor = OffsetCursor::new(&loc, word, limit);
        let mut entities = Vec::new();
        for entry in check_list(&map["registers"], &loc, "registers")? {
            let entry_map = entry
                .as_object()
                .ok_or_else(|| RegError::schema(&loc, "register list entry is not a mapping"))?;
            if let Some(target) = entry_map.get("skipto") {
                check_keys(entry, &loc, "skipto directive", &["skipto"], &[])?;
                cursor.skip_to(check_int(target, &loc, "skipto")?)?;
            } else if let Some(words) = entry_map.get("reserved") {
                check_keys(entry, &loc, "reserved directive", &["reserved"], &[])?;
                cursor.reserve(check_int(words, &loc, "reserved")?)?;
            } else if let Some(raw) = entry_map.get("multireg") {
                check_keys(entry, &loc, "multireg entry", &["multireg"], &[])?;
                let multireg = Multireg::from_raw(raw, &ctx)?;
                let requested = requested_offset(raw, &loc)?;
                let stride = multireg.stride(word);
                let template = &multireg.template.name;
                let span = multireg
                    .count
                    .checked_mul(stride)
                    .ok_or_else(|| cursor.overflow(template, cursor.next, u64::MAX))?;
                let base = cursor.place(template, requested, span, word)?;
                let mut last = None;
                for (i, mut reg) in multireg.expand(&loc)?.into_iter().enumerate() {
                    reg.offset = base + i as u64 * stride;
                    last = Some(reg.name.clone());
                    entities.push(Entity::Register(reg));
                }
                cursor.last = last;
            } else if let Some(raw) = entry_map.get("window") {
                check_keys(entry, &loc, "window entry", &["window"], &[])?;
                let mut window = Window::from_raw(raw, &ctx)?;
                let requested = requested_offset(raw, &loc)?;
                window.offset = cursor.place(&window.name, requested, window.size, window.align())?;
                entities.push(Entity::Window(window));
            } else {
                let mut reg = Register::from_raw(entry, &ctx)?;
                let requested = requested_offset(entry, &loc)?;
                reg.offset = cursor.place(&reg.name, requested, word, word)?;
                entities.push(Entity::Register(reg));
            }
        }

        let block = BlockMap {
            size: cursor.total_size()?,
            name,
            regwidth,
            mubi_width: opts.mubi_width,
            params,
            entities,
        };
        block.validate()?;
        block.warn_unused_regwens();
        log::debug!("{loc}: {} entities, {:#x} bytes", block.entities.len(), block.size);
        Ok(block)
    }

    fn warn_unused_regwens(&self) {
        for name in self.unused_regwens() {
            log::warn!("block {}: {name} is not used as a regwen by any register", self.name);
        }
    }
}

fn requested_offset(raw: &Value, loc: &Location) -> RegResult<Option<u64>> {
    match raw.as_object() {
        Some(map) => opt_int(map, "offset", loc, "entry"),
        None => Ok(None),
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
