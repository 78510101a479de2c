// Licensed under the Apache-2.0 license

//! Text renderers over the compiled register IR.
//!
//! Each output format implements [`Renderer`] for either a
//! [`BlockMap`](registers_compiler::BlockMap) or a
//! [`TopMap`](registers_compiler::TopMap). Renderers only format values the
//! compiler has already validated; they never re-check layout.
//!
//! ## Module Organization
//!
//! - [`cdefines`]: C `#define` header for one block
//! - [`doc`]: AsciiDoc register documentation for one block
//! - [`top`]: base-address header and package, linker script, register model
//!   package and address tables for a top level
//! - [`util`]: identifier and number formatting

pub mod cdefines;
pub mod doc;
pub mod top;
pub mod util;

pub use cdefines::CDefines;
pub use doc::RegisterDoc;
pub use top::{
    LinkerScript, TopAddressDoc, TopAddressHtml, TopCHeader, TopRalPackage, TopSvPackage,
};

use registers_compiler::{BlockMap, TopMap};
use std::fmt;

/// One output format.
pub trait Renderer {
    /// The IR this renderer reads.
    type Ir: ?Sized;

    /// Name of the file the output is conventionally written to.
    fn file_name(&self, ir: &Self::Ir) -> String;

    fn render(&self, ir: &Self::Ir) -> Result<String, fmt::Error>;
}

/// Every renderer that applies to a top-level map.
pub fn top_renderers() -> Vec<Box<dyn Renderer<Ir = TopMap>>> {
    vec![
        Box::new(TopCHeader),
        Box::new(TopSvPackage),
        Box::new(LinkerScript),
        Box::new(TopRalPackage),
        Box::new(TopAddressDoc),
        Box::new(TopAddressHtml),
    ]
}

/// Every renderer that applies to a single block.
pub fn block_renderers() -> Vec<Box<dyn Renderer<Ir = BlockMap>>> {
    vec![Box::new(CDefines), Box::new(RegisterDoc)]
}
