// Licensed under the Apache-2.0 license

//! Top-level address allocation.
//!
//! Modules (block instances) and memories share one flat address space.
//! Entities with a requested base are placed first, in input order; the rest
//! are packed above the highest explicit placement, each aligned to its own
//! size (or to the configured floor when the size is not a power of two).
//! Placement state lives in an [`AddressSpace`] owned by the caller, so two
//! maps compiled in one process never share addresses.

use crate::config::TopOptions;
use crate::error::{Location, RegError, RegResult};
use crate::ir::{check_min_align, natural_alignment, BlockMap, TopEntity, TopKind, TopMap};
use crate::tree::{check_int, check_list, check_name, check_str, require_keys, RawMap};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// One entity waiting for a base address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub name: String,
    pub kind: TopKind,
    pub size: u64,
    pub base: Option<u64>,
}

/// Running state of a top-level allocation.
#[derive(Clone, Debug)]
pub struct AddressSpace {
    limit: u128,
    min_align: u64,
    /// Lowest address above every entity placed so far.
    next_free: u128,
}

impl AddressSpace {
    pub fn new(opts: &TopOptions) -> Self {
        Self {
            limit: opts.limit(),
            min_align: opts.min_align,
            next_free: 0,
        }
    }

    pub fn next_free(&self) -> u128 {
        self.next_free
    }

    fn overflow(&self, req: &Placement, base: u128) -> RegError {
        RegError::AddressOverflow {
            loc: Location::top(),
            name: req.name.clone(),
            offset: u64::try_from(base).unwrap_or(u64::MAX),
            size: req.size,
            limit: self.limit,
        }
    }

    /// Claim `[base, base + size)` and return the base as an address.
    fn claim(&mut self, req: &Placement, base: u128) -> RegResult<u64> {
        let end = base + u128::from(req.size);
        if end > self.limit {
            return Err(self.overflow(req, base));
        }
        self.next_free = self.next_free.max(end);
        u64::try_from(base).map_err(|_| self.overflow(req, base))
    }

    /// Place an entity at its requested base.
    pub fn place_fixed(&mut self, req: &Placement, base: u64) -> RegResult<u64> {
        let align = natural_alignment(req.size, self.min_align);
        if base % align != 0 {
            return Err(RegError::Alignment {
                loc: Location::top(),
                name: req.name.clone(),
                addr: base,
                align,
            });
        }
        self.claim(req, u128::from(base))
    }

    /// Place an entity at the lowest free aligned address.
    pub fn place_auto(&mut self, req: &Placement) -> RegResult<u64> {
        let align = u128::from(natural_alignment(req.size, self.min_align));
        let base = self.next_free.div_ceil(align) * align;
        self.claim(req, base)
    }
}

/// Resolve every placement's base address.
///
/// The result keeps the input order.
pub fn allocate(requests: &[Placement], space: &mut AddressSpace) -> RegResult<Vec<TopEntity>> {
    let mut bases = vec![0u64; requests.len()];
    for (i, req) in requests.iter().enumerate() {
        if let Some(base) = req.base {
            bases[i] = space.place_fixed(req, base)?;
            log::debug!("{}: requested base {:#x}", req.name, bases[i]);
        }
    }
    for (i, req) in requests.iter().enumerate() {
        if req.base.is_none() {
            bases[i] = space.place_auto(req)?;
            log::debug!("{}: assigned base {:#x}", req.name, bases[i]);
        }
    }

    let entities: Vec<TopEntity> = requests
        .iter()
        .zip(bases)
        .map(|(req, base)| TopEntity {
            name: req.name.clone(),
            kind: req.kind.clone(),
            base,
            size: req.size,
            requested: req.base.is_some(),
        })
        .collect();
    check_overlaps(&entities)?;
    Ok(entities)
}

/// Sort by base address and check each entity ends before the next begins.
pub fn check_overlaps(entities: &[TopEntity]) -> RegResult<()> {
    let mut sorted: Vec<&TopEntity> = entities.iter().collect();
    sorted.sort_by_key(|e| e.base);
    for pair in sorted.windows(2) {
        if pair[0].end() > u128::from(pair[1].base) {
            return Err(RegError::AddressOverlap {
                loc: Location::top(),
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }
    }
    Ok(())
}

/// `base_addr` is either an address or a map of address domains; the first
/// domain wins.
fn base_addr(map: &RawMap, loc: &Location, what: &str) -> RegResult<Option<u64>> {
    let Some(raw) = map.get("base_addr") else {
        return Ok(None);
    };
    let raw = match raw {
        Value::Object(domains) => domains.values().next().ok_or_else(|| {
            RegError::schema(loc, format!("base_addr of {what} has no address domains"))
        })?,
        other => other,
    };
    check_int(raw, loc, &format!("base_addr of {what}")).map(Some)
}

/// Block name a module instantiates. In order of preference: `type`, `ip`,
/// the file stem of `ip_hjson`, then the instance name without a trailing
/// instance number.
fn module_target(map: &RawMap, name: &str, loc: &Location) -> RegResult<String> {
    let what = format!("module {name}");
    for key in ["type", "ip"] {
        if let Some(t) = map.get(key) {
            return check_name(t, loc, &format!("{key} of {what}"));
        }
    }
    if let Some(path) = map.get("ip_hjson") {
        let path = check_str(path, loc, &format!("ip_hjson of {what}"))?;
        let stem = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| RegError::schema(loc, format!("ip_hjson of {what} has no file name")))?;
        return check_name(&Value::from(stem), loc, &format!("ip_hjson stem of {what}"));
    }
    Ok(name.trim_end_matches(|c: char| c.is_ascii_digit()).to_string())
}

impl TopMap {
    /// Assemble the top-level map from its raw tree and the compiled blocks.
    pub fn from_raw(raw: &Value, blocks: &[BlockMap], opts: &TopOptions) -> RegResult<TopMap> {
        let loc = Location::top();
        let map = require_keys(raw, &loc, "top level", &["name"])?;
        let name = check_name(&map["name"], &loc, "top-level name")?;
        check_min_align(opts.min_align, &loc)?;

        let mut requests = Vec::new();
        if let Some(modules) = map.get("module") {
            for raw in check_list(modules, &loc, "module")? {
                let m = require_keys(raw, &loc, "module", &["name"])?;
                let mod_name = check_name(&m["name"], &loc, "module name")?;
                let what = format!("module {mod_name}");
                let target = module_target(m, &mod_name, &loc)?;
                let declared = m
                    .get("size")
                    .map(|s| check_int(s, &loc, &format!("size of {what}")))
                    .transpose()?;
                let size = match (blocks.iter().find(|b| b.name == target), declared) {
                    (Some(block), Some(size)) if size < block.size => {
                        return Err(RegError::schema(
                            &loc,
                            format!(
                                "{what} declares size {size:#x} but block {target} needs {:#x}",
                                block.size
                            ),
                        ))
                    }
                    (_, Some(size)) => size,
                    (Some(block), None) => block.size,
                    (None, None) => {
                        return Err(RegError::schema(
                            &loc,
                            format!("{what} instantiates unknown block {target} and declares no size"),
                        ))
                    }
                };
                if size == 0 {
                    return Err(RegError::schema(&loc, format!("{what} has size zero")));
                }
                requests.push(Placement {
                    base: base_addr(m, &loc, &what)?,
                    kind: TopKind::Module { target },
                    name: mod_name,
                    size,
                });
            }
        }
        if let Some(memories) = map.get("memory") {
            for raw in check_list(memories, &loc, "memory")? {
                let m = require_keys(raw, &loc, "memory", &["name", "size"])?;
                let mem_name = check_name(&m["name"], &loc, "memory name")?;
                let what = format!("memory {mem_name}");
                let size = check_int(&m["size"], &loc, &format!("size of {what}"))?;
                if size == 0 {
                    return Err(RegError::schema(&loc, format!("{what} has size zero")));
                }
                let mem_type = m
                    .get("type")
                    .map(|t| check_str(t, &loc, &format!("type of {what}")).map(str::to_string))
                    .transpose()?;
                requests.push(Placement {
                    base: base_addr(m, &loc, &what)?,
                    kind: TopKind::Memory { mem_type },
                    name: mem_name,
                    size,
                });
            }
        }

        let mut seen = HashSet::new();
        for req in &requests {
            if !seen.insert(req.name.as_str()) {
                return Err(RegError::schema(
                    &loc,
                    format!("duplicate name {}", req.name),
                ));
            }
        }

        let mut space = AddressSpace::new(opts);
        let entities = allocate(&requests, &mut space)?;
        let top = TopMap {
            name,
            entities,
            min_align: opts.min_align,
            addr_width: opts.addr_width,
        };
        top.validate()?;
        Ok(top)
    }
}
