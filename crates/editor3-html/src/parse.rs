//! HTML to document parsing.
//!
//! Walks a [`Node`] tree and builds blocks. Block elements open new blocks;
//! inline content accumulates in a [`BlockBuilder`] until the next block
//! boundary. Elements claimed by a block-placement rule are hoisted out of
//! the text around them, splitting it in two.

use editor3_core::{
    utf16_len, Block, BlockType, Document, Entity, EntityData, EntityKey, EntityRange,
    EntityType, InlineStyle, KeyGenerator, StyleRange,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{Node, NodeType};
use crate::options::ConverterOptions;
use crate::rules::{link_entity, Parsed, Placement, Rule, RuleContext, Rules};
use crate::utilities::{collapse_whitespace, is_block, style_declarations};
use crate::{ConvertError, Result};

static EMBED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*EMBED\s+(START|END)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Start,
    End,
}

fn embed_marker(node: &Node) -> Option<Marker> {
    if !node.is_comment() {
        return None;
    }
    let caps = EMBED_MARKER.captures(node.value())?;
    match &caps[1] {
        "START" => Some(Marker::Start),
        _ => Some(Marker::End),
    }
}

#[derive(Debug, Clone, Copy)]
struct ListContext {
    ordered: bool,
    depth: usize,
}

/// Where the walker currently is, as far as block types are concerned
#[derive(Debug, Clone, Copy, Default)]
struct BlockContext {
    quote: bool,
    list: Option<ListContext>,
}

impl BlockContext {
    fn quoted(self) -> Self {
        Self { quote: true, ..self }
    }

    fn in_list(self, ordered: bool) -> Self {
        let depth = self.list.map_or(0, |l| l.depth + 1);
        Self {
            list: Some(ListContext { ordered, depth }),
            ..self
        }
    }

    /// Type and depth of a text block opened here
    fn text_block(self) -> (BlockType, usize) {
        match self.list {
            Some(ListContext { ordered: true, depth }) => (BlockType::OrderedListItem, depth),
            Some(ListContext { ordered: false, depth }) => (BlockType::UnorderedListItem, depth),
            None if self.quote => (BlockType::Blockquote, 0),
            None => (BlockType::Unstyled, 0),
        }
    }
}

/// Text and ranges of the block being built
#[derive(Debug)]
struct BlockBuilder {
    block_type: BlockType,
    depth: usize,
    preformatted: bool,
    text: String,
    len: usize,
    styles: Vec<StyleRange>,
    open_styles: Vec<(InlineStyle, usize)>,
    entities: Vec<EntityRange>,
    open_entity: Option<(EntityKey, usize)>,
}

impl BlockBuilder {
    fn new(block_type: BlockType, depth: usize) -> Self {
        Self {
            preformatted: block_type == BlockType::CodeBlock,
            block_type,
            depth,
            text: String::new(),
            len: 0,
            styles: Vec::new(),
            open_styles: Vec::new(),
            entities: Vec::new(),
            open_entity: None,
        }
    }

    fn for_context(ctx: BlockContext) -> Self {
        let (block_type, depth) = ctx.text_block();
        Self::new(block_type, depth)
    }

    fn append(&mut self, text: &str) {
        self.len += utf16_len(text);
        self.text.push_str(text);
    }

    fn push_text(&mut self, raw: &str) {
        if self.preformatted {
            self.append(raw);
            return;
        }

        let collapsed = collapse_whitespace(raw);
        let mut text = collapsed.as_str();
        if text.starts_with(' ')
            && (self.text.is_empty() || self.text.ends_with(' ') || self.text.ends_with('\n'))
        {
            text = &text[1..];
        }
        self.append(text);
    }

    fn push_newline(&mut self) {
        self.append("\n");
    }

    fn open_style(&mut self, style: InlineStyle) {
        self.open_styles.push((style, self.len));
    }

    fn close_style(&mut self) {
        if let Some((style, start)) = self.open_styles.pop() {
            if self.len > start {
                self.styles.push(StyleRange::new(start, self.len - start, style));
            }
        }
    }

    /// Start an entity range. Entities do not nest; `false` when one is
    /// already open.
    fn open_entity(&mut self, key: EntityKey) -> bool {
        if self.open_entity.is_some() {
            return false;
        }
        self.open_entity = Some((key, self.len));
        true
    }

    fn close_entity(&mut self) {
        if let Some((key, start)) = self.open_entity.take() {
            if self.len > start {
                self.entities.push(EntityRange::new(start, self.len - start, key));
            }
        }
    }

    /// Take the content built so far, leaving a builder of the same kind
    /// that continues the open styles and entity.
    fn split(&mut self) -> BlockBuilder {
        let mut rest = BlockBuilder::new(self.block_type, self.depth);
        rest.open_styles = self.open_styles.iter().map(|(s, _)| (s.clone(), 0)).collect();
        rest.open_entity = self.open_entity.map(|(key, _)| (key, 0));
        std::mem::replace(self, rest)
    }

    /// Close everything still open and build the block; `None` when there
    /// is no visible text.
    fn finish(mut self, keys: &mut KeyGenerator) -> Option<Block> {
        while !self.open_styles.is_empty() {
            self.close_style();
        }
        self.close_entity();

        let mut text = self.text;
        if !self.preformatted {
            let trimmed = text.trim_end_matches(' ').len();
            text.truncate(trimmed);
        }
        if text.trim().is_empty() {
            return None;
        }

        let mut block = Block::new(keys.next_key(), self.block_type, text).with_depth(self.depth);
        if !self.preformatted {
            block.inline_style_ranges = self.styles;
            block.entity_ranges = self.entities;
        }
        block.normalize();
        Some(block)
    }
}

/// Styles an inline element applies to its content
fn inline_styles(node: &Node) -> Vec<InlineStyle> {
    let mut styles = Vec::new();
    let tag_style = match node.tag_name() {
        "b" | "strong" => Some(InlineStyle::Bold),
        "i" | "em" | "cite" | "dfn" | "var" => Some(InlineStyle::Italic),
        "u" | "ins" => Some(InlineStyle::Underline),
        "s" | "strike" | "del" => Some(InlineStyle::Strikethrough),
        "code" | "kbd" | "samp" | "tt" => Some(InlineStyle::Code),
        "sub" => Some(InlineStyle::Subscript),
        "sup" => Some(InlineStyle::Superscript),
        "mark" => Some(InlineStyle::Highlight),
        _ => None,
    };
    styles.extend(tag_style);

    if node.has_class("highlight") {
        styles.push(InlineStyle::Highlight);
    }
    if node.has_class("comment") {
        styles.push(InlineStyle::Comment);
    }

    if let Some(style) = node.attr("style") {
        for (property, value) in style_declarations(style) {
            match property.as_str() {
                "font-weight" => match value.as_str() {
                    "bold" | "bolder" | "600" | "700" | "800" | "900" => {
                        styles.push(InlineStyle::Bold)
                    }
                    // Google Docs wraps whole documents in <b style="font-weight:normal">
                    "normal" | "lighter" | "400" => styles.retain(|s| *s != InlineStyle::Bold),
                    _ => {}
                },
                "font-style" if value == "italic" || value == "oblique" => {
                    styles.push(InlineStyle::Italic)
                }
                "text-decoration" | "text-decoration-line" => {
                    if value.contains("underline") {
                        styles.push(InlineStyle::Underline);
                    }
                    if value.contains("line-through") {
                        styles.push(InlineStyle::Strikethrough);
                    }
                }
                "vertical-align" if value == "sub" => styles.push(InlineStyle::Subscript),
                "vertical-align" if value == "super" => styles.push(InlineStyle::Superscript),
                _ => {}
            }
        }
    }

    let mut unique: Vec<InlineStyle> = Vec::with_capacity(styles.len());
    for style in styles {
        if !unique.contains(&style) {
            unique.push(style);
        }
    }
    unique
}

fn has_block_children(node: &Node) -> bool {
    node.element_children().any(|c| is_block(c.tag_name()))
}

fn header_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', level @ b'1'..=b'6'] => Some(level - b'0'),
        _ => None,
    }
}

/// Builds a [`Document`] from a node tree
pub(crate) struct Parser<'a> {
    rules: &'a Rules,
    options: &'a ConverterOptions,
    document: Document,
    keys: KeyGenerator,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// `depth` is the nesting already consumed by enclosing parsers
    pub(crate) fn new(rules: &'a Rules, options: &'a ConverterOptions, depth: usize) -> Self {
        Self {
            rules,
            options,
            document: Document::new(),
            keys: KeyGenerator::new(),
            depth,
        }
    }

    /// Parse the children of `root`
    pub(crate) fn parse(mut self, root: &Node) -> Result<Document> {
        self.walk_container(root, BlockContext::default())?;
        Ok(self.document)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(ConvertError::TooDeep {
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn rule_context(&self) -> RuleContext<'a> {
        RuleContext {
            options: self.options,
            rules: self.rules,
            depth: self.depth,
        }
    }

    /// Finish the pending block and continue with a fresh one
    fn flush(&mut self, builder: &mut BlockBuilder) {
        if let Some(block) = builder.split().finish(&mut self.keys) {
            self.document.push_block(block);
        }
    }

    fn push_atomic(&mut self, entity: Entity) {
        let key = self.document.add_entity(entity);
        self.document.push_block(Block::atomic(self.keys.next_key(), key));
    }

    /// Walk mixed block and inline children. Loose inline content becomes
    /// blocks of the context's text type.
    fn walk_container(&mut self, node: &Node, ctx: BlockContext) -> Result<()> {
        let children: Vec<&Node> = node.children().collect();
        let mut pending = BlockBuilder::for_context(ctx);

        let mut i = 0;
        while i < children.len() {
            let child = children[i];
            i += 1;
            match child.node_type {
                NodeType::Text => pending.push_text(child.value()),
                NodeType::Comment => {
                    if embed_marker(child) != Some(Marker::Start) {
                        continue;
                    }
                    // An unpaired START is an ordinary comment
                    let Some(end) = children[i..]
                        .iter()
                        .position(|c| embed_marker(c) == Some(Marker::End))
                        .map(|p| i + p)
                    else {
                        continue;
                    };
                    self.flush(&mut pending);
                    self.embed_group(&children[i..end], ctx)?;
                    i = end + 1;
                }
                NodeType::Element if is_block(child.tag_name()) => {
                    self.flush(&mut pending);
                    self.walk_block(child, ctx)?;
                }
                NodeType::Element => self.walk_inline_node(child, &mut pending, ctx)?,
                NodeType::DocumentFragment => self.walk_container(child, ctx)?,
            }
        }

        self.flush(&mut pending);
        Ok(())
    }

    /// Content between `EMBED START` and `EMBED END` comments is one entity.
    /// A lone element some block rule claims (a figure, image, table, ...)
    /// goes through that rule; anything else is wrapped as an embed block.
    fn embed_group(&mut self, nodes: &[&Node], ctx: BlockContext) -> Result<()> {
        let mut elements = nodes.iter().filter(|n| n.is_element());
        let only_element = match (elements.next(), elements.next()) {
            (Some(element), None) => Some(*element),
            _ => None,
        };
        let loose_text = nodes
            .iter()
            .any(|n| n.is_text() && !n.value().trim().is_empty());
        let rules = self.rules;
        let claimed = only_element.filter(|element| {
            !loose_text
                && rules
                    .for_node(element, self.options)
                    .is_some_and(|rule| rule.placement == Placement::Block)
        });

        match claimed {
            Some(element) => self.walk_block(element, ctx),
            None => {
                let mut wrapper = Node::element_with_attrs("div", vec![("class", "embed-block")]);
                for node in nodes {
                    wrapper.add_child((*node).clone());
                }
                self.walk_block(&wrapper, ctx)
            }
        }
    }

    fn walk_block(&mut self, node: &Node, ctx: BlockContext) -> Result<()> {
        self.enter()?;
        let result = self.walk_block_inner(node, ctx);
        self.leave();
        result
    }

    fn walk_block_inner(&mut self, node: &Node, ctx: BlockContext) -> Result<()> {
        let rules = self.rules;
        if rules.should_remove(node, self.options) {
            tracing::trace!(tag = node.tag_name(), "removed");
            return Ok(());
        }
        if let Some(rule) = rules.for_node(node, self.options) {
            let mut pending = BlockBuilder::for_context(ctx);
            self.apply_rule(rule, node, &mut pending, ctx)?;
            self.flush(&mut pending);
            return Ok(());
        }
        if rules.should_keep(node, self.options) {
            self.keep(node);
            return Ok(());
        }

        let tag = node.tag_name();
        if let Some(level) = header_level(tag) {
            return self.leaf(node, BlockBuilder::new(BlockType::header(level), 0), ctx);
        }
        match tag {
            "p" => self.leaf(node, BlockBuilder::for_context(ctx), ctx),
            "blockquote" if has_block_children(node) => self.walk_container(node, ctx.quoted()),
            "blockquote" => {
                let ctx = ctx.quoted();
                self.leaf(node, BlockBuilder::for_context(ctx), ctx)
            }
            "pre" => self.leaf(node, BlockBuilder::new(BlockType::CodeBlock, 0), ctx),
            "ul" | "ol" => self.walk_container(node, ctx.in_list(tag == "ol")),
            "li" if ctx.list.is_none() => self.walk_container(node, ctx.in_list(false)),
            "hr" | "br" => Ok(()),
            _ => self.walk_container(node, ctx),
        }
    }

    /// An element holding one block's worth of inline content
    fn leaf(&mut self, node: &Node, mut builder: BlockBuilder, ctx: BlockContext) -> Result<()> {
        self.walk_inline(node, &mut builder, ctx)?;
        self.flush(&mut builder);
        Ok(())
    }

    fn walk_inline(&mut self, node: &Node, builder: &mut BlockBuilder, ctx: BlockContext) -> Result<()> {
        for child in node.children() {
            match child.node_type {
                NodeType::Text => builder.push_text(child.value()),
                NodeType::Element => self.walk_inline_node(child, builder, ctx)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn walk_inline_node(
        &mut self,
        node: &Node,
        builder: &mut BlockBuilder,
        ctx: BlockContext,
    ) -> Result<()> {
        self.enter()?;
        let result = self.walk_inline_node_inner(node, builder, ctx);
        self.leave();
        result
    }

    fn walk_inline_node_inner(
        &mut self,
        node: &Node,
        builder: &mut BlockBuilder,
        ctx: BlockContext,
    ) -> Result<()> {
        let rules = self.rules;
        if rules.should_remove(node, self.options) {
            return Ok(());
        }
        if let Some(rule) = rules.for_node(node, self.options) {
            return self.apply_rule(rule, node, builder, ctx);
        }
        if rules.should_keep(node, self.options) {
            self.flush(builder);
            self.keep(node);
            return Ok(());
        }

        let tag = node.tag_name();
        if tag == "br" {
            builder.push_newline();
            return Ok(());
        }
        if is_block(tag) {
            // Block inside inline content: split the text around it
            self.flush(builder);
            return self.walk_block_inner(node, ctx);
        }

        if builder.preformatted {
            return self.walk_inline(node, builder, ctx);
        }
        let styles = inline_styles(node);
        let count = styles.len();
        for style in styles {
            builder.open_style(style);
        }
        self.walk_inline(node, builder, ctx)?;
        for _ in 0..count {
            builder.close_style();
        }
        Ok(())
    }

    fn apply_rule(
        &mut self,
        rule: &Rule,
        node: &Node,
        builder: &mut BlockBuilder,
        ctx: BlockContext,
    ) -> Result<()> {
        let parsed = rule.parse_node(node, &self.rule_context());

        match (rule.placement, parsed) {
            (Placement::Block, Parsed::Entity(entity)) => {
                self.flush(builder);
                self.push_atomic(entity);
            }
            (Placement::Block, Parsed::Link { href, text }) => {
                self.flush(builder);
                let mut paragraph = BlockBuilder::for_context(ctx);
                let opened = match link_entity(&href) {
                    Some(link) => paragraph.open_entity(self.document.add_entity(link)),
                    None => false,
                };
                paragraph.push_text(&text);
                if opened {
                    paragraph.close_entity();
                }
                self.flush(&mut paragraph);
            }
            (Placement::Block, Parsed::Text(text)) => {
                self.flush(builder);
                let mut paragraph = BlockBuilder::for_context(ctx);
                paragraph.push_text(&text);
                self.flush(&mut paragraph);
            }
            (Placement::Inline, Parsed::Entity(entity)) => {
                let key = self.document.add_entity(entity);
                let opened = builder.open_entity(key);
                self.walk_inline(node, builder, ctx)?;
                if opened {
                    builder.close_entity();
                }
            }
            (Placement::Inline, Parsed::Link { .. } | Parsed::Text(_)) => {
                self.walk_inline(node, builder, ctx)?;
            }
            (_, Parsed::Strip) => {
                tracing::trace!(tag = node.tag_name(), "stripped");
            }
        }
        Ok(())
    }

    /// Preserve an element as an EMBED of its raw HTML
    fn keep(&mut self, node: &Node) {
        let mut data = EntityData::new();
        data.insert("html".to_string(), node.outer_html().into());
        self.push_atomic(Entity::new(EntityType::Embed, data));
    }
}

#[cfg(all(test, feature = "html"))]
mod tests {
    use super::*;
    use crate::html::parse_html;
    use editor3_core::Segment;

    fn parse(html: &str) -> Document {
        parse_with(html, &ConverterOptions::default())
    }

    fn parse_with(html: &str, options: &ConverterOptions) -> Document {
        let rules = Rules::new();
        let root = parse_html(html, options.max_depth).unwrap();
        Parser::new(&rules, options, 0).parse(&root).unwrap()
    }

    fn summary(document: &Document) -> Vec<(BlockType, usize, &str)> {
        document
            .blocks
            .iter()
            .map(|b| (b.block_type, b.depth, b.text.as_str()))
            .collect()
    }

    #[test]
    fn test_paragraphs_and_headings() {
        let document = parse("<h1>Title</h1>\n<p>First   line</p><h3>Sub</h3>");
        assert_eq!(
            summary(&document),
            vec![
                (BlockType::header(1), 0, "Title"),
                (BlockType::Unstyled, 0, "First line"),
                (BlockType::header(3), 0, "Sub"),
            ]
        );
        assert_eq!(document.blocks[0].key, "00000");
        assert_eq!(document.blocks[1].key, "00001");
    }

    #[test]
    fn test_unknown_tag_is_unwrapped() {
        let document = parse("<div><unknowntag>x</unknowntag></div>");
        assert_eq!(summary(&document), vec![(BlockType::Unstyled, 0, "x")]);
    }

    #[test]
    fn test_nested_lists() {
        let document = parse(
            "<ul><li>1</li><li>2<ol><li>a</li><li>b</li></ol></li><li>3</li></ul>",
        );
        assert_eq!(
            summary(&document),
            vec![
                (BlockType::UnorderedListItem, 0, "1"),
                (BlockType::UnorderedListItem, 0, "2"),
                (BlockType::OrderedListItem, 1, "a"),
                (BlockType::OrderedListItem, 1, "b"),
                (BlockType::UnorderedListItem, 0, "3"),
            ]
        );
    }

    #[test]
    fn test_inline_styles() {
        let document = parse("<p><b>ab<i>c</i></b><i>de</i>f</p>");
        let block = &document.blocks[0];
        assert_eq!(block.text, "abcdef");
        assert_eq!(
            block.inline_style_ranges,
            vec![
                StyleRange::new(0, 3, InlineStyle::Bold),
                StyleRange::new(2, 3, InlineStyle::Italic),
            ]
        );
    }

    #[test]
    fn test_style_attributes_and_classes() {
        let document = parse(
            "<p><b style=\"font-weight:normal\"><span style=\"font-style: italic\">x</span>\
             <span class=\"highlight\">y</span></b></p>",
        );
        let block = &document.blocks[0];
        assert_eq!(block.text, "xy");
        assert_eq!(
            block.inline_style_ranges,
            vec![
                StyleRange::new(0, 1, InlineStyle::Italic),
                StyleRange::new(1, 1, InlineStyle::Highlight),
            ]
        );
    }

    #[test]
    fn test_links() {
        let document = parse("<p>The name of <a href=\"https://h.test\">Highlaws</a></p>");
        let block = &document.blocks[0];
        assert_eq!(block.entity_ranges, vec![EntityRange::new(12, 8, EntityKey(0))]);
        let link = document.entity(EntityKey(0)).unwrap();
        assert_eq!(link.entity_type, EntityType::Link);
        assert_eq!(link.data["link"]["href"], "https://h.test");
    }

    #[test]
    fn test_breaks_and_whitespace() {
        let document = parse("<p>  one <br> two  </p><p>a&nbsp; b</p>");
        assert_eq!(document.blocks[0].text, "one \ntwo");
        assert_eq!(document.blocks[1].text, "a\u{a0} b");
    }

    #[test]
    fn test_figure_image_is_hoisted() {
        let document = parse(
            "<p>before<img src=\"a.jpg\">after</p>",
        );
        assert_eq!(
            summary(&document),
            vec![
                (BlockType::Unstyled, 0, "before"),
                (BlockType::Atomic, 0, " "),
                (BlockType::Unstyled, 0, "after"),
            ]
        );
        let key = document.blocks[1].atomic_entity().unwrap();
        assert_eq!(document.entity(key).unwrap().entity_type, EntityType::Image);
    }

    #[test]
    fn test_hoisting_keeps_styles_open() {
        let document = parse("<p><b>one<img src=\"a.jpg\">two</b></p>");
        assert_eq!(document.blocks.len(), 3);
        assert_eq!(
            document.blocks[2].inline_style_ranges,
            vec![StyleRange::new(0, 3, InlineStyle::Bold)]
        );
    }

    #[test]
    fn test_unsupported_provider_becomes_link() {
        let document = parse("<iframe src=\"https://unknown.example/v/1\"></iframe>");
        assert_eq!(
            summary(&document),
            vec![(BlockType::Unstyled, 0, "https://unknown.example/v/1")]
        );
        assert_eq!(document.blocks[0].entity_ranges.len(), 1);
    }

    #[test]
    fn test_embed_comment_group() {
        let document = parse(
            "<!-- EMBED START Embed {id: \"x\"} --><blockquote class=\"tweet\">hi</blockquote>\
             <script src=\"https://platform.twitter.com/widgets.js\"></script>\
             <!-- EMBED END Embed {id: \"x\"} --><p>after</p>",
        );
        assert_eq!(document.blocks.len(), 2);
        assert_eq!(document.blocks[0].block_type, BlockType::Atomic);
        let key = document.blocks[0].atomic_entity().unwrap();
        let embed = document.entity(key).unwrap();
        assert_eq!(embed.entity_type, EntityType::Embed);
        assert_eq!(
            embed.data["html"],
            "<blockquote class=\"tweet\">hi</blockquote><script src=\"https://platform.twitter.com/widgets.js\"></script>"
        );
        assert_eq!(document.blocks[1].text, "after");
    }

    #[test]
    fn test_unpaired_embed_start_is_ignored() {
        let document = parse("<!-- EMBED START Embed {id: \"x\"} --><p>one</p><p>two</p><h2>three</h2>");
        assert_eq!(
            summary(&document),
            vec![
                (BlockType::Unstyled, 0, "one"),
                (BlockType::Unstyled, 0, "two"),
                (BlockType::header(2), 0, "three"),
            ]
        );
        assert!(document.entity_map.is_empty());
    }

    #[test]
    fn test_embed_group_of_plain_markup() {
        let document = parse(
            "<!-- EMBED START Embed {id: \"x\"} -->\n<div class=\"infogram\"><p>Chart title</p></div>\n\
             <!-- EMBED END Embed {id: \"x\"} -->",
        );
        assert_eq!(document.blocks.len(), 1);
        let key = document.blocks[0].atomic_entity().unwrap();
        let embed = document.entity(key).unwrap();
        assert_eq!(embed.entity_type, EntityType::Embed);
        assert_eq!(
            embed.data["html"],
            "<div class=\"infogram\"><p>Chart title</p></div>"
        );
    }

    #[test]
    fn test_embed_group_of_one_figure() {
        let document = parse(
            "<!-- EMBED START Image {id: \"editor_0\"} --><figure><img src=\"a.jpg\" alt=\"A\">\
             <figcaption>Cap</figcaption></figure><!-- EMBED END Image {id: \"editor_0\"} -->",
        );
        let key = document.blocks[0].atomic_entity().unwrap();
        let image = document.entity(key).unwrap();
        assert_eq!(image.entity_type, EntityType::Image);
        assert_eq!(image.data["description"], "Cap");
    }

    #[test]
    fn test_table_cells_are_documents() {
        let document = parse(
            "<table><tr><th>A</th><th>B</th></tr><tr><td><b>1</b></td><td></td></tr></table>",
        );
        let key = document.blocks[0].atomic_entity().unwrap();
        let table: crate::rules::TablePayload = document.entity(key).unwrap().payload().unwrap();
        assert_eq!((table.num_rows, table.num_cols, table.with_header), (2, 2, true));
        assert_eq!(table.cells[0][1].as_ref().unwrap().plain_text(), "B");
        let bold = table.cells[1][0].as_ref().unwrap();
        assert_eq!(bold.blocks[0].inline_style_ranges.len(), 1);
        assert!(table.cells[1][1].is_none());
    }

    #[test]
    fn test_blockquote_and_code() {
        let document = parse("<blockquote><p>q1</p><p>q2</p></blockquote><pre>a  <b>b</b>\n c</pre>");
        assert_eq!(
            summary(&document),
            vec![
                (BlockType::Blockquote, 0, "q1"),
                (BlockType::Blockquote, 0, "q2"),
                (BlockType::CodeBlock, 0, "a  b\n c"),
            ]
        );
        assert!(document.blocks[2].inline_style_ranges.is_empty());
    }

    #[test]
    fn test_removed_elements() {
        let document = parse("<style>p { color: red }</style><p>kept</p>");
        assert_eq!(summary(&document), vec![(BlockType::Unstyled, 0, "kept")]);
    }

    #[test]
    fn test_depth_limit() {
        let options = ConverterOptions {
            max_depth: 8,
            ..ConverterOptions::default()
        };
        let rules = Rules::new();
        let html = "<span>".repeat(6) + "x" + &"</span>".repeat(6);
        let root = parse_html(&html, 64).unwrap();

        let shallow = Parser::new(&rules, &options, 0).parse(&root);
        assert!(shallow.is_ok());

        let deep = Parser::new(&rules, &options, 4).parse(&root);
        assert!(matches!(deep, Err(ConvertError::TooDeep { limit: 8 })));
    }

    #[test]
    fn test_offsets_count_utf16() {
        let document = parse("<p>😀 <b>x</b></p>");
        assert_eq!(
            document.blocks[0].inline_style_ranges,
            vec![StyleRange::new(3, 1, InlineStyle::Bold)]
        );
        let segments: Vec<Segment> = editor3_core::resolve_block(&document.blocks[0]);
        assert_eq!(segments.len(), 2);
    }
}
