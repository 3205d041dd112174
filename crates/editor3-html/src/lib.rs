//! # editor3-html
//!
//! Convert editor3 rich-text documents to HTML and back.
//!
//! ## Design
//!
//! Parsing works on a parser-agnostic [`Node`] tree. With the default `html`
//! feature, HTML strings are parsed with html5ever (via scraper); without
//! it, any DOM source can build [`Node`]s and call
//! [`HtmlConverter::from_node`].
//!
//! Embedded objects (images, embeds, tables, links, ...) are handled by
//! [`Rule`]s, one per entity type, which both recognize the element while
//! parsing and render the entity while emitting. Custom rules can be added
//! to handle further types.
//!
//! ## Example (document to HTML)
//!
//! ```rust
//! use editor3_core::{Block, BlockType, Document, InlineStyle};
//! use editor3_html::HtmlConverter;
//!
//! let mut document = Document::new();
//! document.push_block(
//!     Block::new("a1b2c", BlockType::Unstyled, "Hello World").with_style(6, 5, InlineStyle::Bold),
//! );
//!
//! let converter = HtmlConverter::new();
//! assert_eq!(converter.to_html(&document), "<p>Hello <strong>World</strong></p>");
//! ```
//!
//! ## Example (HTML string)
//!
//! ```rust
//! use editor3_core::BlockType;
//! use editor3_html::HtmlConverter;
//!
//! let converter = HtmlConverter::new();
//! let document = converter.from_html("<h2>Title</h2><ul><li>one</li></ul>");
//! assert_eq!(document.blocks[0].block_type, BlockType::header(2));
//! assert_eq!(document.blocks[1].block_type, BlockType::UnorderedListItem);
//! ```

mod emit;
#[cfg(feature = "html")]
pub mod html;
pub mod node;
mod options;
mod parse;
mod rules;
mod service;
mod utilities;

#[cfg(feature = "html")]
pub use html::{html_to_text, parse_html};
pub use node::{Node, NodeType};
pub use options::{ConverterOptions, EmbedPolicy, DEFAULT_EMBED_PROVIDERS};
pub use rules::{
    ArticleEmbedPayload, CustomBlockPayload, EmbedPayload, Filter, ImagePayload, LinkPayload,
    LinkTarget, MediaItem, MediaPayload, ParseFn, Parsed, Placement, RenderContext, RenderFn,
    Rendition, Rule, RuleContext, Rules, TablePayload,
};
pub use service::HtmlConverter;
pub use utilities::*;

/// Error type for conversions
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Input nests deeper than {limit} elements")]
    TooDeep { limit: usize },

    #[error("Unsupported entity: {entity_type}")]
    UnsupportedEntity { entity_type: String },

    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),

    #[error(transparent)]
    Raw(#[from] editor3_core::RawError),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
