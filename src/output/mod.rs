//! Output writers for graph frames and flamegraphs.
//!
//! - JSON literal documents (read and write)
//! - Folded stacks and SVG flamegraphs

pub mod json;
pub mod svg;
pub mod writer;

// Re-export main functions
pub use json::{
    document_to_string, read_document, read_literal, write_document, write_literal,
    LiteralDocument,
};
pub use svg::{write_flamegraph, write_folded, write_svg};
