//! HtmlConverter - the main entry point for document/HTML conversion.

use editor3_core::Document;

use crate::emit::Emitter;
use crate::node::{Node, NodeType};
use crate::options::ConverterOptions;
use crate::parse::Parser;
use crate::rules::{Filter, Rule, Rules};
use crate::utilities::collapse_whitespace;
use crate::{ConvertError, Result};

/// Converts documents to HTML and back
pub struct HtmlConverter {
    options: ConverterOptions,
    rules: Rules,
}

impl HtmlConverter {
    /// Create a new HtmlConverter with default options
    pub fn new() -> Self {
        Self::with_options(ConverterOptions::default())
    }

    /// Create an HtmlConverter with custom options
    pub fn with_options(options: ConverterOptions) -> Self {
        Self {
            options,
            rules: Rules::new(),
        }
    }

    /// Render a document as HTML.
    ///
    /// Never fails: entities that cannot be rendered degrade to a link or
    /// are left out, with a warning.
    #[tracing::instrument(skip_all, fields(blocks = document.blocks.len()))]
    pub fn to_html(&self, document: &Document) -> String {
        Emitter::new(&self.rules, &self.options, document).emit()
    }

    /// Parse HTML into a document.
    ///
    /// Never fails: input the parser rejects becomes a single paragraph of
    /// its visible text.
    #[cfg(feature = "html")]
    #[tracing::instrument(skip_all, fields(len = html.len()))]
    pub fn from_html(&self, html: &str) -> Document {
        match self.try_from_html(html) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(%err, "falling back to plain text");
                let text = collapse_whitespace(&crate::html::html_to_text(html));
                Document::from_plain_text(text.trim())
            }
        }
    }

    /// Parse HTML into a document, reporting input that cannot be parsed
    #[cfg(feature = "html")]
    pub fn try_from_html(&self, html: &str) -> Result<Document> {
        let root = crate::html::parse_html(html, self.options.max_depth)?;
        self.try_from_node(&root)
    }

    /// Build a document from an already parsed node tree.
    ///
    /// Like [`HtmlConverter::from_html`], falls back to plain text.
    pub fn from_node(&self, node: &Node) -> Document {
        match self.try_from_node(node) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(%err, "falling back to plain text");
                let text = collapse_whitespace(&node.text_content());
                Document::from_plain_text(text.trim())
            }
        }
    }

    /// Build a document from the children of `node`, an element or
    /// document fragment
    pub fn try_from_node(&self, node: &Node) -> Result<Document> {
        if !node.is_element() && node.node_type != NodeType::DocumentFragment {
            return Err(ConvertError::MalformedInput(format!(
                "cannot convert a {} node",
                node.node_name
            )));
        }
        let document = Parser::new(&self.rules, &self.options, 0).parse(node)?;
        if document.blocks.is_empty() {
            return Ok(Document::from_plain_text(""));
        }
        Ok(document)
    }

    /// Add a custom rule
    pub fn add_rule(&mut self, key: &str, rule: Rule) -> &mut Self {
        self.rules.add(key, rule);
        self
    }

    /// Keep elements matching the filter as raw HTML embeds
    pub fn keep(&mut self, filter: Filter) -> &mut Self {
        self.rules.keep(filter);
        self
    }

    /// Remove elements matching the filter
    pub fn remove(&mut self, filter: Filter) -> &mut Self {
        self.rules.remove(filter);
        self
    }

    /// Apply a plugin
    pub fn use_plugin<F>(&mut self, plugin: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        plugin(self);
        self
    }

    /// Get the current options
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut ConverterOptions {
        &mut self.options
    }
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Parsed;
    use editor3_core::{BlockType, Entity, EntityType};

    #[test]
    fn test_from_node() {
        let converter = HtmlConverter::new();

        let mut root = Node::document_fragment();
        let mut h1 = Node::element("h1");
        h1.add_child(Node::text("Hello World"));
        root.add_child(h1);

        let document = converter.from_node(&root);
        assert_eq!(document.blocks.len(), 1);
        assert_eq!(document.blocks[0].block_type, BlockType::header(1));
        assert_eq!(converter.to_html(&document), "<h1>Hello World</h1>");
    }

    #[test]
    fn test_empty_input_gives_one_empty_block() {
        let converter = HtmlConverter::new();
        let document = converter.from_node(&Node::document_fragment());
        assert_eq!(document.blocks.len(), 1);
        assert_eq!(document.blocks[0].block_type, BlockType::Unstyled);
        assert_eq!(document.blocks[0].text, "");
        assert_eq!(converter.to_html(&document), "");
    }

    #[test]
    fn test_text_root_is_malformed() {
        let converter = HtmlConverter::new();
        let root = Node::text("loose");
        assert!(matches!(
            converter.try_from_node(&root),
            Err(ConvertError::MalformedInput(_))
        ));
        assert_eq!(converter.from_node(&root).plain_text(), "loose");
    }

    #[test]
    fn test_too_deep_falls_back_to_text() {
        let mut converter = HtmlConverter::new();
        converter.options_mut().max_depth = 3;

        let mut node = Node::text("deep  text");
        for tag in ["em", "span", "b", "div", "p"] {
            let mut parent = Node::element(tag);
            parent.add_child(node);
            node = parent;
        }
        let mut root = Node::document_fragment();
        root.add_child(node);

        assert!(converter.try_from_node(&root).is_err());
        let document = converter.from_node(&root);
        assert_eq!(document.plain_text(), "deep text");
    }

    #[test]
    fn test_custom_rule_round_trip() {
        let mut converter = HtmlConverter::new();
        converter.use_plugin(|c| {
            c.add_rule(
                "poll",
                Rule::block(
                    EntityType::Other("POLL".into()),
                    Filter::predicate(|tag, node, _| tag == "div" && node.has_class("poll")),
                    |node, _| {
                        let mut data = editor3_core::EntityData::new();
                        data.insert("id".into(), node.attr("data-id").unwrap_or("").into());
                        Parsed::Entity(Entity::new(EntityType::Other("POLL".into()), data))
                    },
                    |entity, _| {
                        let id = entity.data.get("id").and_then(|v| v.as_str()).unwrap_or("");
                        Ok(format!("<div class=\"poll\" data-id=\"{id}\"></div>"))
                    },
                ),
            );
        });

        let html = "<p>Vote:</p>\n<div class=\"poll\" data-id=\"p1\"></div>";
        let document = converter.from_node(&{
            let mut root = Node::document_fragment();
            let mut p = Node::element("p");
            p.add_child(Node::text("Vote:"));
            root.add_child(p);
            root.add_child(Node::element_with_attrs(
                "div",
                vec![("class", "poll"), ("data-id", "p1")],
            ));
            root
        });
        assert_eq!(document.blocks[1].block_type, BlockType::Atomic);
        assert_eq!(converter.to_html(&document), html);
    }

    #[test]
    fn test_keep_and_remove() {
        let mut converter = HtmlConverter::new();
        converter.keep(Filter::tag("form")).remove(Filter::tag("aside"));

        let mut root = Node::document_fragment();
        let mut form = Node::element_with_attrs("form", vec![("action", "/go")]);
        form.add_child(Node::element_with_attrs("input", vec![("name", "q")]));
        root.add_child(form);
        let mut aside = Node::element("aside");
        aside.add_child(Node::text("gone"));
        root.add_child(aside);

        let document = converter.from_node(&root);
        assert_eq!(document.blocks.len(), 1);
        let key = document.blocks[0].atomic_entity().unwrap();
        let embed = document.entity(key).unwrap();
        assert_eq!(embed.entity_type, EntityType::Embed);
        assert_eq!(embed.data["html"], "<form action=\"/go\"><input name=\"q\"></form>");
    }
}
