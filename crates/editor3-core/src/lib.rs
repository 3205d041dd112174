//! editor3-core - rich-text document model
//!
//! This crate provides the document structures shared by every editor3
//! conversion: blocks with inline style ranges, the entity table, the raw
//! JSON storage format and the inline range resolver.
//!
//! # Architecture
//!
//! ```text
//! raw JSON ──serde──▶ ┌──────────┐ ──resolve──▶ styled segments
//!                     │ Document │
//! HTML parser ──────▶ └──────────┘ ──emitter──▶ HTML
//! ```
//!
//! # Example
//!
//! ```rust
//! use editor3_core::{resolve_block, Block, BlockType, InlineStyle};
//!
//! let block = Block::new("a1b2c", BlockType::Unstyled, "abcdef")
//!     .with_style(0, 3, InlineStyle::Bold)
//!     .with_style(2, 3, InlineStyle::Italic);
//!
//! let segments = resolve_block(&block);
//! assert_eq!(segments.len(), 4);
//! assert_eq!(segments[1].styles.as_slice(), &[InlineStyle::Bold, InlineStyle::Italic]);
//! ```

mod model;
mod resolve;
mod style;
mod text;

pub use model::{
    Block, BlockType, Document, Entity, EntityData, EntityKey, EntityMap, EntityRange,
    EntityType, KeyGenerator, Mutability, StyleRange,
};
pub use resolve::{resolve, resolve_block, Segment, StyleSet};
pub use style::InlineStyle;
pub use text::{utf16_len, Utf16Index};

/// Error type for loading and storing documents
#[derive(Debug, thiserror::Error)]
pub enum RawError {
    #[error("Invalid raw document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entity payload is not a JSON object")]
    PayloadNotObject,
}

pub type Result<T> = std::result::Result<T, RawError>;
