// Licensed under the Apache-2.0 license

//! The compiler's output.
//!
//! A [`BlockMap`] or [`TopMap`] is fully validated and address-resolved when
//! the compiler hands it out, and renderers only ever read it. Both types
//! round-trip through serde; [`BlockMap::validate`] and [`TopMap::validate`]
//! re-check every layout rule on a deserialized value.

use crate::error::{Location, RegError, RegResult};
use crate::params::Params;
use crate::register::{Register, Window};
use crate::top::check_overlaps;
use crate::tree::check_name;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Register widths a block may declare.
pub const REGWIDTHS: [u32; 4] = [8, 16, 32, 64];

pub(crate) fn check_regwidth(regwidth: u32, loc: &Location) -> RegResult<()> {
    if !REGWIDTHS.contains(&regwidth) {
        return Err(RegError::schema(
            loc,
            format!("regwidth {regwidth} is not one of 8, 16, 32 or 64"),
        ));
    }
    Ok(())
}

/// The top-level alignment floor must be a nonzero power of two.
pub(crate) fn check_min_align(min_align: u64, loc: &Location) -> RegResult<()> {
    if !min_align.is_power_of_two() {
        return Err(RegError::schema(
            loc,
            format!("min_align {min_align:#x} is not a power of two"),
        ));
    }
    Ok(())
}

//=============================================================================
// Block
//=============================================================================

/// One addressable item of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Register(Register),
    Window(Window),
}

impl Entity {
    pub fn name(&self) -> &str {
        match self {
            Entity::Register(r) => &r.name,
            Entity::Window(w) => &w.name,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Entity::Register(r) => r.offset,
            Entity::Window(w) => w.offset,
        }
    }

    /// Size in bytes, given the block's register size.
    pub fn size(&self, word_bytes: u64) -> u64 {
        match self {
            Entity::Register(_) => word_bytes,
            Entity::Window(w) => w.size,
        }
    }

    /// Required alignment of the offset.
    pub fn align(&self, word_bytes: u64) -> u64 {
        match self {
            Entity::Register(_) => word_bytes,
            Entity::Window(w) => w.align(),
        }
    }
}

/// The compiled address map of one block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMap {
    pub name: String,
    pub regwidth: u32,
    pub mubi_width: u32,
    pub params: Params,
    /// Registers and windows in increasing offset order.
    pub entities: Vec<Entity>,
    /// Total address span in bytes.
    pub size: u64,
}

impl BlockMap {
    pub fn word_bytes(&self) -> u64 {
        u64::from(self.regwidth / 8)
    }

    pub fn registers(&self) -> impl Iterator<Item = &Register> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Register(r) => Some(r),
            Entity::Window(_) => None,
        })
    }

    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.entities.iter().filter_map(|e| match e {
            Entity::Window(w) => Some(w),
            Entity::Register(_) => None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// Re-check every layout rule.
    pub fn validate(&self) -> RegResult<()> {
        let loc = Location::block(&self.name);
        check_regwidth(self.regwidth, &loc)?;
        let word = self.word_bytes();
        if self.size == 0 || self.size % word != 0 {
            return Err(RegError::Alignment {
                loc,
                name: format!("size of block {}", self.name),
                addr: self.size,
                align: word,
            });
        }

        let mut by_name: HashMap<&str, &Entity> = HashMap::with_capacity(self.entities.len());
        let mut cursor = 0u64;
        let mut prev: Option<&str> = None;
        for entity in &self.entities {
            let name = entity.name();
            if by_name.insert(name, entity).is_some() {
                return Err(RegError::schema(&loc, format!("duplicate name {name}")));
            }
            match entity {
                Entity::Register(r) => r.check_fields(self.regwidth, self.mubi_width, &loc)?,
                Entity::Window(w) => w.validate(self.regwidth, &loc)?,
            }

            let offset = entity.offset();
            let size = entity.size(word);
            let align = entity.align(word);
            if offset % align != 0 {
                return Err(RegError::Alignment {
                    loc: loc.register(name),
                    name: name.to_string(),
                    addr: offset,
                    align,
                });
            }
            if offset < cursor {
                return Err(RegError::AddressOverlap {
                    loc,
                    first: prev.unwrap_or(name).to_string(),
                    second: name.to_string(),
                });
            }
            let end = offset
                .checked_add(size)
                .filter(|end| *end <= self.size)
                .ok_or_else(|| RegError::AddressOverflow {
                    loc: loc.register(name),
                    name: name.to_string(),
                    offset,
                    size,
                    limit: u128::from(self.size),
                })?;
            cursor = end;
            prev = Some(name);
        }
        self.check_regwens(&by_name, &loc)
    }

    fn check_regwens(&self, by_name: &HashMap<&str, &Entity>, loc: &Location) -> RegResult<()> {
        for reg in self.registers() {
            let Some(regwen) = &reg.regwen else {
                continue;
            };
            match by_name.get(regwen.as_str()) {
                Some(Entity::Register(_)) => {}
                Some(Entity::Window(_)) => {
                    return Err(RegError::schema(
                        &loc.register(&reg.name),
                        format!("regwen {regwen} is a window, not a register"),
                    ))
                }
                None => {
                    return Err(RegError::schema(
                        &loc.register(&reg.name),
                        format!("regwen {regwen} does not name a register of this block"),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Registers that look like write-enable gates but gate nothing.
    pub fn unused_regwens(&self) -> Vec<&str> {
        let used: HashSet<&str> = self
            .registers()
            .filter_map(|r| r.regwen.as_deref())
            .collect();
        self.registers()
            .map(|r| r.name.as_str())
            .filter(|name| name.contains("REGWEN") && !used.contains(name))
            .collect()
    }
}

//=============================================================================
// Top level
//=============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TopKind {
    /// An instance of a block.
    Module {
        /// Name of the block this module instantiates.
        target: String,
    },
    Memory {
        /// Memory type such as `rom` or `ram`, when declared.
        mem_type: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEntity {
    pub name: String,
    #[serde(flatten)]
    pub kind: TopKind,
    pub base: u64,
    pub size: u64,
    /// Whether the base address was given in the input.
    pub requested: bool,
}

impl TopEntity {
    /// First address past the entity.
    pub fn end(&self) -> u128 {
        u128::from(self.base) + u128::from(self.size)
    }

    pub fn align(&self, min_align: u64) -> u64 {
        natural_alignment(self.size, min_align)
    }

    pub fn is_module(&self) -> bool {
        matches!(self.kind, TopKind::Module { .. })
    }
}

/// The size itself when it is a power of two, `min_align` otherwise.
pub fn natural_alignment(size: u64, min_align: u64) -> u64 {
    if size.is_power_of_two() {
        size
    } else {
        min_align.max(1)
    }
}

/// The chip-wide address map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopMap {
    pub name: String,
    /// Modules in input order, followed by memories in input order.
    pub entities: Vec<TopEntity>,
    pub min_align: u64,
    pub addr_width: u32,
}

impl TopMap {
    pub fn modules(&self) -> impl Iterator<Item = &TopEntity> {
        self.entities.iter().filter(|e| e.is_module())
    }

    pub fn memories(&self) -> impl Iterator<Item = &TopEntity> {
        self.entities.iter().filter(|e| !e.is_module())
    }

    pub fn get(&self, name: &str) -> Option<&TopEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// First address past the end of the address space.
    pub fn limit(&self) -> u128 {
        1u128 << self.addr_width.min(64)
    }

    /// Re-check names, alignment, bounds and overlap.
    pub fn validate(&self) -> RegResult<()> {
        let loc = Location::top();
        check_name(&Value::from(self.name.as_str()), &loc, "top-level name")?;
        check_min_align(self.min_align, &loc)?;
        let mut seen = HashSet::with_capacity(self.entities.len());
        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(RegError::schema(
                    &loc,
                    format!("duplicate name {}", entity.name),
                ));
            }
            let align = entity.align(self.min_align);
            if entity.base % align != 0 {
                return Err(RegError::Alignment {
                    loc,
                    name: entity.name.clone(),
                    addr: entity.base,
                    align,
                });
            }
            if entity.size == 0 || entity.end() > self.limit() {
                return Err(RegError::AddressOverflow {
                    loc,
                    name: entity.name.clone(),
                    offset: entity.base,
                    size: entity.size,
                    limit: self.limit(),
                });
            }
        }
        check_overlaps(&self.entities)
    }
}
