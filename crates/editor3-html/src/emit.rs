//! Document to HTML emission.
//!
//! Blocks are written one per line. Consecutive list items share one list
//! element; deeper items nest inside the open `<li>` of their parent, each
//! level indented by two `list_indent` units.

use editor3_core::{
    resolve_block, Block, BlockType, Document, Entity, EntityKey, EntityType, InlineStyle,
    Segment, Utf16Index,
};

use crate::options::ConverterOptions;
use crate::rules::{Placement, RenderContext, Rules};
use crate::utilities::{escape_attr, escape_text};
use crate::ConvertError;

/// An open `<ul>`/`<ol>` and its currently open `<li>`
struct ListFrame {
    ordered: bool,
    /// The open `<li>` holds a nested list
    nested: bool,
}

pub(crate) struct Emitter<'a> {
    rules: &'a Rules,
    options: &'a ConverterOptions,
    document: &'a Document,
    out: String,
    lists: Vec<ListFrame>,
    embeds: usize,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(rules: &'a Rules, options: &'a ConverterOptions, document: &'a Document) -> Self {
        Self {
            rules,
            options,
            document,
            out: String::new(),
            lists: Vec::new(),
            embeds: 0,
        }
    }

    pub(crate) fn emit(mut self) -> String {
        let document = self.document;
        for block in &document.blocks {
            if block.is_blank() {
                continue;
            }
            if block.block_type.is_list_item() {
                self.list_item(block);
                continue;
            }

            self.close_lists(0);
            let html = self.block(block);
            if !html.is_empty() {
                self.separate();
                self.out.push_str(&html);
            }
        }
        self.close_lists(0);
        self.out
    }

    fn separate(&mut self) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push_str(&self.options.list_indent);
        }
    }

    fn list_item(&mut self, block: &Block) {
        let ordered = block.block_type == BlockType::OrderedListItem;
        // An item can nest at most one level below the previous one
        let depth = block.depth.min(self.lists.len());

        self.close_lists(depth + 1);
        if self.lists.len() == depth + 1 {
            if self.lists[depth].ordered == ordered {
                self.close_item(depth);
            } else {
                self.close_lists(depth);
            }
        }

        if self.lists.len() == depth {
            if let Some(parent) = self.lists.last_mut() {
                parent.nested = true;
            }
            self.separate();
            self.indent(2 * depth);
            self.out.push_str(if ordered { "<ol>" } else { "<ul>" });
            self.lists.push(ListFrame {
                ordered,
                nested: false,
            });
        }

        self.out.push('\n');
        self.indent(2 * depth + 1);
        self.out.push_str("<li>");
        let content = self.inline(block);
        self.out.push_str(&content);
    }

    fn close_item(&mut self, depth: usize) {
        if self.lists[depth].nested {
            self.out.push('\n');
            self.indent(2 * depth + 1);
        }
        self.out.push_str("</li>");
        self.lists[depth].nested = false;
    }

    /// Close open lists until `keep` remain
    fn close_lists(&mut self, keep: usize) {
        while self.lists.len() > keep {
            let depth = self.lists.len() - 1;
            self.close_item(depth);
            self.out.push('\n');
            self.indent(2 * depth);
            let ordered = self.lists[depth].ordered;
            self.out.push_str(if ordered { "</ol>" } else { "</ul>" });
            self.lists.pop();
        }
    }

    fn block(&mut self, block: &Block) -> String {
        match &block.block_type {
            BlockType::Unstyled => wrap("p", &self.inline(block)),
            BlockType::Header(level) => wrap(&format!("h{}", (*level).clamp(1, 6)), &self.inline(block)),
            BlockType::Blockquote => wrap("blockquote", &self.inline(block)),
            BlockType::CodeBlock => format!("<pre><code>{}</code></pre>", escape_text(&block.text)),
            BlockType::Atomic => self.atomic(block),
            BlockType::UnorderedListItem | BlockType::OrderedListItem => String::new(),
        }
    }

    fn atomic(&mut self, block: &Block) -> String {
        let Some(key) = block.atomic_entity() else {
            tracing::warn!(block = %block.key, "atomic block without entity");
            return String::new();
        };
        let document = self.document;
        let Some(entity) = document.entity(key) else {
            tracing::warn!(block = %block.key, %key, "atomic block references a missing entity");
            return String::new();
        };

        let rendered = match self.rules.for_entity(&entity.entity_type, Placement::Block) {
            Some(rule) => rule.render_entity(entity, &self.render_context(key, "")),
            None => Err(ConvertError::UnsupportedEntity {
                entity_type: entity.entity_type.name().to_string(),
            }),
        };

        match rendered {
            Ok(html) => self.with_markers(entity, html),
            Err(err) => {
                tracing::warn!(%err, %key, "degrading entity");
                entity
                    .fallback_href()
                    .map(|href| format!("<p><a href=\"{}\">{}</a></p>", escape_attr(href), escape_text(href)))
                    .unwrap_or_default()
            }
        }
    }

    fn with_markers(&mut self, entity: &Entity, html: String) -> String {
        let label = match entity.entity_type {
            EntityType::Image | EntityType::Media => "Image",
            EntityType::Embed => "Embed",
            _ => return html,
        };
        if !self.options.embed_markers {
            return html;
        }

        let id = format!("editor_{}", self.embeds);
        self.embeds += 1;
        format!(
            "<!-- EMBED START {label} {{id: \"{id}\"}} -->\n{html}\n<!-- EMBED END {label} {{id: \"{id}\"}} -->"
        )
    }

    fn render_context<'c>(&'c self, key: EntityKey, content: &'c str) -> RenderContext<'c> {
        RenderContext {
            options: self.options,
            rules: self.rules,
            key,
            content,
        }
    }

    /// Inline HTML of a block's text
    fn inline(&self, block: &Block) -> String {
        let index = Utf16Index::new(&block.text);
        let segments = resolve_block(block);

        let mut html = String::new();
        let mut start = 0;
        while start < segments.len() {
            let entity = segments[start].entity;
            let end = segments[start..]
                .iter()
                .position(|s| s.entity != entity)
                .map_or(segments.len(), |p| start + p);

            let styled = styled(&block.text, &index, &segments[start..end]);
            match entity {
                Some(key) => html.push_str(&self.inline_entity(key, &styled)),
                None => html.push_str(&styled),
            }
            start = end;
        }
        html
    }

    fn inline_entity(&self, key: EntityKey, content: &str) -> String {
        let Some(entity) = self.document.entity(key) else {
            tracing::warn!(%key, "text references a missing entity");
            return content.to_string();
        };
        let Some(rule) = self.rules.for_entity(&entity.entity_type, Placement::Inline) else {
            tracing::debug!(entity_type = %entity.entity_type, "no inline rule, keeping text");
            return content.to_string();
        };

        match rule.render_entity(entity, &self.render_context(key, content)) {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!(%err, %key, "keeping entity text only");
                content.to_string()
            }
        }
    }
}

/// Write segments with minimal tag churn: styles shared with the previous
/// segment stay open, since both are sorted by the same priority.
fn styled(text: &str, index: &Utf16Index, segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut open: Vec<&InlineStyle> = Vec::new();

    for segment in segments {
        let common = open
            .iter()
            .zip(segment.styles.iter())
            .take_while(|(a, b)| **a == *b)
            .count();
        while open.len() > common {
            if let Some(style) = open.pop() {
                out.push_str(style_tags(style).1);
            }
        }
        for style in &segment.styles[common..] {
            out.push_str(style_tags(style).0);
            open.push(style);
        }

        for c in index.slice(text, segment.start, segment.end).chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '\n' => out.push_str("<br>"),
                _ => out.push(c),
            }
        }
    }

    while let Some(style) = open.pop() {
        out.push_str(style_tags(style).1);
    }
    out
}

/// Opening and closing tag of a style. Unknown styles render bare.
fn style_tags(style: &InlineStyle) -> (&'static str, &'static str) {
    match style {
        InlineStyle::Bold => ("<strong>", "</strong>"),
        InlineStyle::Italic => ("<em>", "</em>"),
        InlineStyle::Underline => ("<u>", "</u>"),
        InlineStyle::Strikethrough => ("<s>", "</s>"),
        InlineStyle::Code => ("<code>", "</code>"),
        InlineStyle::Subscript => ("<sub>", "</sub>"),
        InlineStyle::Superscript => ("<sup>", "</sup>"),
        InlineStyle::Highlight => ("<span class=\"highlight\">", "</span>"),
        InlineStyle::Comment => ("<span class=\"comment\">", "</span>"),
        InlineStyle::Other(_) => ("", ""),
    }
}

fn wrap(tag: &str, content: &str) -> String {
    format!("<{tag}>{content}</{tag}>")
}
