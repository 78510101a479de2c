// Licensed under the Apache-2.0 license

//! Register and address-map compiler.
//!
//! Takes per-block register descriptions and a top-level inventory of block
//! instances and memories, already loaded into [`serde_json::Value`] trees,
//! and produces validated, address-resolved maps:
//!
//! - [`BlockMap::from_raw`] normalizes fields, assembles registers, expands
//!   multiregs and windows, and assigns every entity a byte offset.
//! - [`TopMap::from_raw`] places every module and memory in one flat address
//!   space and checks alignment, bounds and overlap.
//!
//! Both results serialize with serde and are the only thing renderers read.
//!
//! ```
//! use registers_compiler::{BlockMap, BlockOptions, TopMap, TopOptions};
//! use serde_json::json;
//!
//! let uart = BlockMap::from_raw(
//!     &json!({
//!         "name": "uart",
//!         "registers": [{
//!             "name": "CTRL",
//!             "fields": [{"name": "TX_EN", "bits": "0"}, {"name": "RX_EN", "bits": "1"}],
//!         }],
//!     }),
//!     &BlockOptions::with_defaults(),
//! )
//! .unwrap();
//! assert_eq!(uart.get("CTRL").unwrap().offset(), 0);
//!
//! let top = TopMap::from_raw(
//!     &json!({
//!         "name": "chip",
//!         "module": [{"name": "uart", "base_addr": "0x4000_0000", "size": "0x1000"}],
//!         "memory": [{"name": "ram", "size": "0x10000"}],
//!     }),
//!     &[uart],
//!     &TopOptions::with_defaults(),
//! )
//! .unwrap();
//! assert_eq!(top.get("ram").unwrap().base, 0x4001_0000);
//! ```

pub mod access;
mod block;
pub mod config;
pub mod error;
pub mod field;
pub mod ir;
pub mod params;
pub mod register;
pub mod top;
pub mod tree;

pub use access::{HwAccess, SwAccess};
pub use config::{BlockOptions, TopOptions};
pub use error::{Location, RegError, RegResult};
pub use field::{Bits, EnumValue, Field};
pub use ir::{BlockMap, Entity, TopEntity, TopKind, TopMap};
pub use params::{Param, Params};
pub use register::{MultiregIndex, Register, Window};

use serde_json::Value;

/// Compile a batch of independent blocks.
///
/// Each block gets its own result, so one bad block does not hide the
/// diagnostics of the others. `opts` applies to every block; parameter
/// overrides must therefore name parameters every block declares.
pub fn compile_blocks(raws: &[Value], opts: &BlockOptions) -> Vec<RegResult<BlockMap>> {
    raws.iter()
        .map(|raw| {
            let result = BlockMap::from_raw(raw, opts);
            if let Err(err) = &result {
                log::debug!("block failed to compile: {err}");
            }
            result
        })
        .collect()
}
