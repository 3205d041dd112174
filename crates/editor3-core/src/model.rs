//! Rich-text document model
//!
//! A [`Document`] is an ordered list of [`Block`]s plus an entity table.
//! Blocks own their text and style ranges and refer to entities by
//! [`EntityKey`]. The serde representation is the editor's raw JSON format.

use std::fmt;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::style::InlineStyle;
use crate::text::utf16_len;
use crate::{RawError, Result};

/// Free-form JSON payload of an entity or block
pub type EntityData = Map<String, Value>;

/// Entity table of a document, in insertion order
pub type EntityMap = IndexMap<EntityKey, Entity>;

/// Key of an entity inside its document's entity map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub u32);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural type of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    /// Plain paragraph
    #[default]
    Unstyled,
    /// Heading, level 1-6
    Header(u8),
    UnorderedListItem,
    OrderedListItem,
    Blockquote,
    CodeBlock,
    /// Block holding a single embedded entity
    Atomic,
}

const HEADER_NAMES: [&str; 6] = [
    "header-one",
    "header-two",
    "header-three",
    "header-four",
    "header-five",
    "header-six",
];

impl BlockType {
    /// Parse a stored type name. Unknown names fall back to `Unstyled`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "unordered-list-item" => BlockType::UnorderedListItem,
            "ordered-list-item" => BlockType::OrderedListItem,
            "blockquote" => BlockType::Blockquote,
            "code-block" => BlockType::CodeBlock,
            "atomic" => BlockType::Atomic,
            _ => HEADER_NAMES
                .iter()
                .position(|h| *h == name)
                .map(|i| BlockType::Header(i as u8 + 1))
                .unwrap_or(BlockType::Unstyled),
        }
    }

    /// The stored type name
    pub fn name(&self) -> &'static str {
        match self {
            BlockType::Unstyled => "unstyled",
            BlockType::Header(level) => HEADER_NAMES[((*level).clamp(1, 6) - 1) as usize],
            BlockType::UnorderedListItem => "unordered-list-item",
            BlockType::OrderedListItem => "ordered-list-item",
            BlockType::Blockquote => "blockquote",
            BlockType::CodeBlock => "code-block",
            BlockType::Atomic => "atomic",
        }
    }

    /// Heading constructor that clamps the level into 1-6
    pub fn header(level: u8) -> Self {
        BlockType::Header(level.clamp(1, 6))
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockType::UnorderedListItem | BlockType::OrderedListItem)
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(BlockType::from_name(&name))
    }
}

/// An `(offset, length, style)` annotation over block text.
///
/// Offsets and lengths count UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: InlineStyle,
}

impl StyleRange {
    pub fn new(offset: usize, length: usize, style: InlineStyle) -> Self {
        Self {
            offset,
            length,
            style,
        }
    }

    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }
}

/// An `(offset, length, key)` reference from block text to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: EntityKey,
}

impl EntityRange {
    pub fn new(offset: usize, length: usize, key: EntityKey) -> Self {
        Self { offset, length, key }
    }

    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }
}

/// Kind of embedded object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    Image,
    /// An archived picture item, stored with its renditions
    Media,
    Embed,
    ArticleEmbed,
    CustomBlock,
    Link,
    Table,
    Other(String),
}

impl EntityType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "IMAGE" => EntityType::Image,
            "MEDIA" => EntityType::Media,
            "EMBED" => EntityType::Embed,
            "ARTICLE_EMBED" => EntityType::ArticleEmbed,
            "CUSTOM_BLOCK" => EntityType::CustomBlock,
            "LINK" => EntityType::Link,
            "TABLE" => EntityType::Table,
            other => EntityType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntityType::Image => "IMAGE",
            EntityType::Media => "MEDIA",
            EntityType::Embed => "EMBED",
            EntityType::ArticleEmbed => "ARTICLE_EMBED",
            EntityType::CustomBlock => "CUSTOM_BLOCK",
            EntityType::Link => "LINK",
            EntityType::Table => "TABLE",
            EntityType::Other(name) => name,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for EntityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for EntityType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(EntityType::from_name(&name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutability {
    #[default]
    Mutable,
    Immutable,
    Segmented,
}

/// An embedded object with an immutable payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub data: EntityData,
}

impl Entity {
    pub fn new(entity_type: EntityType, data: EntityData) -> Self {
        Self {
            entity_type,
            mutability: Mutability::Mutable,
            data,
        }
    }

    /// Build an entity from a typed payload
    pub fn from_payload<T: Serialize>(entity_type: EntityType, payload: &T) -> Result<Self> {
        match serde_json::to_value(payload)? {
            Value::Object(data) => Ok(Self::new(entity_type, data)),
            _ => Err(RawError::PayloadNotObject),
        }
    }

    /// Read the payload as a typed view. `None` when the data does not fit.
    pub fn payload<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(Value::Object(self.data.clone())).ok()
    }

    /// First string found under `href` or `url`, used when an entity has to
    /// degrade to a plain link.
    pub fn fallback_href(&self) -> Option<&str> {
        ["href", "url"]
            .iter()
            .find_map(|k| self.data.get(*k).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())
    }
}

/// One structural unit of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub key: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    #[serde(default)]
    pub depth: usize,
    #[serde(default)]
    pub inline_style_ranges: Vec<StyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<EntityRange>,
    #[serde(default)]
    pub data: EntityData,
}

impl Block {
    pub fn new(key: impl Into<String>, block_type: BlockType, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            block_type,
            depth: 0,
            inline_style_ranges: Vec::new(),
            entity_ranges: Vec::new(),
            data: EntityData::new(),
        }
    }

    /// Atomic block pointing at `entity`
    pub fn atomic(key: impl Into<String>, entity: EntityKey) -> Self {
        let mut block = Self::new(key, BlockType::Atomic, " ");
        block.entity_ranges.push(EntityRange::new(0, 1, entity));
        block
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_style(mut self, offset: usize, length: usize, style: InlineStyle) -> Self {
        self.inline_style_ranges
            .push(StyleRange::new(offset, length, style));
        self
    }

    pub fn with_entity(mut self, offset: usize, length: usize, key: EntityKey) -> Self {
        self.entity_ranges.push(EntityRange::new(offset, length, key));
        self
    }

    /// Text length in UTF-16 code units
    pub fn len_utf16(&self) -> usize {
        utf16_len(&self.text)
    }

    /// Entity of an atomic block
    pub fn atomic_entity(&self) -> Option<EntityKey> {
        if self.block_type != BlockType::Atomic {
            return None;
        }
        self.entity_ranges.first().map(|r| r.key)
    }

    /// A non-atomic block with nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.block_type != BlockType::Atomic && self.text.trim().is_empty()
    }

    /// Clip ranges to the text, drop empty ones, merge touching or
    /// overlapping ranges of the same style and sort by offset.
    pub fn normalize(&mut self) {
        let len = self.len_utf16();

        let mut ranges: Vec<StyleRange> = self
            .inline_style_ranges
            .drain(..)
            .filter_map(|r| {
                let end = r.end().min(len);
                (r.offset < end).then(|| StyleRange::new(r.offset, end - r.offset, r.style))
            })
            .collect();
        ranges.sort_by(|a, b| {
            a.style
                .priority_cmp(&b.style)
                .then(a.offset.cmp(&b.offset))
        });

        let mut merged: Vec<StyleRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if last.style == range.style && range.offset <= last.end() => {
                    let end = last.end().max(range.end());
                    last.length = end - last.offset;
                }
                _ => merged.push(range),
            }
        }
        merged.sort_by(|a, b| {
            a.offset
                .cmp(&b.offset)
                .then_with(|| a.style.priority_cmp(&b.style))
        });
        self.inline_style_ranges = merged;

        self.entity_ranges.retain(|r| r.length > 0 && r.offset < len);
        for range in &mut self.entity_ranges {
            range.length = range.length.min(len - range.offset);
        }
        self.entity_ranges.sort_by_key(|r| r.offset);
    }
}

/// Deterministic block key source. One generator per parse.
#[derive(Debug, Clone, Default)]
pub struct KeyGenerator {
    next: u64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next five character base-36 key
    pub fn next_key(&mut self) -> String {
        const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut n = self.next;
        self.next += 1;
        let mut key = [b'0'; 5];
        for slot in key.iter_mut().rev() {
            *slot = DIGITS[(n % 36) as usize];
            n /= 36;
        }
        key.iter().map(|&b| b as char).collect()
    }
}

/// An ordered sequence of blocks with the entities they reference
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub entity_map: EntityMap,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document holding `text` as a single paragraph
    pub fn from_plain_text(text: &str) -> Self {
        let mut keys = KeyGenerator::new();
        Self {
            blocks: vec![Block::new(keys.next_key(), BlockType::Unstyled, text)],
            entity_map: EntityMap::new(),
        }
    }

    /// Load the raw JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Store as raw JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Register an entity and return its newly assigned key
    pub fn add_entity(&mut self, entity: Entity) -> EntityKey {
        let key = self
            .entity_map
            .keys()
            .map(|k| k.0 + 1)
            .max()
            .map(EntityKey)
            .unwrap_or(EntityKey(0));
        self.entity_map.insert(key, entity);
        key
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entity_map.get(&key)
    }

    pub fn push_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Text of all non-atomic blocks, one block per line
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| b.block_type != BlockType::Atomic)
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Structural equality that ignores block keys and entity key numbers.
    ///
    /// Entities are compared through the ranges that reference them.
    pub fn content_eq(&self, other: &Document) -> bool {
        self.blocks.len() == other.blocks.len()
            && self
                .blocks
                .iter()
                .zip(&other.blocks)
                .all(|(a, b)| block_content_eq(self, a, other, b))
    }
}

fn block_content_eq(left: &Document, a: &Block, right: &Document, b: &Block) -> bool {
    if a.block_type != b.block_type
        || a.text != b.text
        || a.depth != b.depth
        || a.data != b.data
        || a.entity_ranges.len() != b.entity_ranges.len()
    {
        return false;
    }

    let mut a = a.clone();
    let mut b = b.clone();
    a.normalize();
    b.normalize();
    if a.inline_style_ranges != b.inline_style_ranges {
        return false;
    }

    a.entity_ranges
        .iter()
        .zip(&b.entity_ranges)
        .all(|(ra, rb)| {
            ra.offset == rb.offset
                && ra.length == rb.length
                && entity_content_eq(left.entity(ra.key), right.entity(rb.key))
        })
}

fn entity_content_eq(a: Option<&Entity>, b: Option<&Entity>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            if a.entity_type != b.entity_type || a.mutability != b.mutability {
                return false;
            }
            // Table cells are nested documents with their own key spaces.
            if a.entity_type == EntityType::Table {
                return table_content_eq(a, b);
            }
            a.data == b.data
        }
        (None, None) => true,
        _ => false,
    }
}

fn table_content_eq(a: &Entity, b: &Entity) -> bool {
    let cells = |e: &Entity| -> Option<Vec<Vec<Option<Document>>>> {
        serde_json::from_value(e.data.get("cells")?.clone()).ok()
    };
    let (Some(ca), Some(cb)) = (cells(a), cells(b)) else {
        return a.data == b.data;
    };
    let shape_eq = ["numRows", "numCols", "withHeader"]
        .iter()
        .all(|k| a.data.get(*k) == b.data.get(*k));

    shape_eq
        && ca.len() == cb.len()
        && ca.iter().zip(&cb).all(|(ra, rb)| {
            ra.len() == rb.len()
                && ra.iter().zip(rb).all(|(x, y)| match (x, y) {
                    (Some(x), Some(y)) => x.content_eq(y),
                    (None, None) => true,
                    _ => false,
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{"blocks":[{"key":"fcbn3","text":"The name of Highlaws","type":"unstyled","depth":0,"inlineStyleRanges":[{"offset":0,"length":3,"style":"BOLD"}],"entityRanges":[],"data":{"MULTIPLE_HIGHLIGHTS":{}}},{"key":"fi1d","text":" ","type":"atomic","depth":0,"inlineStyleRanges":[],"entityRanges":[{"offset":0,"length":1,"key":0}],"data":{}}],"entityMap":{"0":{"type":"IMAGE","mutability":"MUTABLE","data":{"href":"a.jpg","width":640,"height":480}}}}"#;

    #[test]
    fn test_load_raw_json() {
        let doc = Document::from_json(RAW).unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].block_type, BlockType::Unstyled);
        assert_eq!(
            doc.blocks[0].inline_style_ranges,
            vec![StyleRange::new(0, 3, InlineStyle::Bold)]
        );
        assert_eq!(doc.blocks[1].atomic_entity(), Some(EntityKey(0)));

        let image = doc.entity(EntityKey(0)).unwrap();
        assert_eq!(image.entity_type, EntityType::Image);
        assert_eq!(image.fallback_href(), Some("a.jpg"));
    }

    #[test]
    fn test_json_survives_store_and_load() {
        let doc = Document::from_json(RAW).unwrap();
        let again = Document::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(doc, again);
    }

    #[test]
    fn test_unknown_names_are_lenient() {
        let raw = r#"{"blocks":[{"key":"a","text":"x","type":"paragraph-ish"}],"entityMap":{"3":{"type":"POLL","data":{}}}}"#;
        let doc = Document::from_json(raw).unwrap();
        assert_eq!(doc.blocks[0].block_type, BlockType::Unstyled);
        assert_eq!(
            doc.entity(EntityKey(3)).unwrap().entity_type,
            EntityType::Other("POLL".to_string())
        );
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            Document::from_json("{\"blocks\": 1}"),
            Err(RawError::Json(_))
        ));
    }

    #[test]
    fn test_media_type_name() {
        assert_eq!(EntityType::from_name("MEDIA"), EntityType::Media);
        assert_eq!(EntityType::Media.name(), "MEDIA");
    }

    #[test]
    fn test_header_names() {
        assert_eq!(BlockType::from_name("header-three"), BlockType::Header(3));
        assert_eq!(BlockType::Header(6).name(), "header-six");
        assert_eq!(BlockType::header(9), BlockType::Header(6));
    }

    #[test]
    fn test_add_entity_assigns_fresh_keys() {
        let mut doc = Document::new();
        let a = doc.add_entity(Entity::new(EntityType::Link, EntityData::new()));
        let b = doc.add_entity(Entity::new(EntityType::Link, EntityData::new()));
        assert_eq!(a, EntityKey(0));
        assert_eq!(b, EntityKey(1));
    }

    #[test]
    fn test_key_generator_is_deterministic() {
        let mut keys = KeyGenerator::new();
        assert_eq!(keys.next_key(), "00000");
        assert_eq!(keys.next_key(), "00001");
        let mut keys = KeyGenerator { next: 36 };
        assert_eq!(keys.next_key(), "00010");
    }

    #[test]
    fn test_normalize_merges_and_clips() {
        let mut block = Block::new("k", BlockType::Unstyled, "abcdef")
            .with_style(4, 10, InlineStyle::Italic)
            .with_style(0, 2, InlineStyle::Bold)
            .with_style(2, 2, InlineStyle::Bold)
            .with_style(3, 0, InlineStyle::Code);
        block.normalize();
        assert_eq!(
            block.inline_style_ranges,
            vec![
                StyleRange::new(0, 4, InlineStyle::Bold),
                StyleRange::new(4, 2, InlineStyle::Italic),
            ]
        );
    }

    #[test]
    fn test_huge_lengths_are_clipped() {
        let raw = r#"{"blocks":[{"key":"a","text":"abc","type":"unstyled","depth":0,
            "inlineStyleRanges":[{"offset":1,"length":18446744073709551615,"style":"BOLD"}],
            "entityRanges":[{"offset":2,"length":18446744073709551615,"key":0}],"data":{}}],
            "entityMap":{"0":{"type":"LINK","data":{}}}}"#;
        let document = Document::from_json(raw).unwrap();
        assert_eq!(document.blocks[0].inline_style_ranges[0].end(), usize::MAX);
        assert!(document.content_eq(&document.clone()));

        let mut block = document.blocks[0].clone();
        block.normalize();
        assert_eq!(block.inline_style_ranges, vec![StyleRange::new(1, 2, InlineStyle::Bold)]);
        assert_eq!(block.entity_ranges, vec![EntityRange::new(2, 1, EntityKey(0))]);
    }

    #[test]
    fn test_content_eq_ignores_keys() {
        let mut a = Document::new();
        let ka = a.add_entity(Entity::new(EntityType::Link, EntityData::new()));
        a.push_block(Block::new("aaaaa", BlockType::Unstyled, "hi").with_entity(0, 2, ka));

        let mut b = Document::new();
        b.add_entity(Entity::new(EntityType::Image, EntityData::new()));
        let kb = b.add_entity(Entity::new(EntityType::Link, EntityData::new()));
        b.push_block(Block::new("bbbbb", BlockType::Unstyled, "hi").with_entity(0, 2, kb));

        assert!(a.content_eq(&b));

        b.blocks[0].text = "ho".to_string();
        assert!(!a.content_eq(&b));
    }
}
