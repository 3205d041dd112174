//! Rule system for entity conversion.
//!
//! A [`Rule`] recognizes an element while parsing and renders the matching
//! entity type while emitting. Custom rules take precedence over the
//! builtin ones, in insertion order.

mod builtin;
mod rule;

pub use builtin::{
    builtin_rules, ArticleEmbedPayload, CustomBlockPayload, EmbedPayload, ImagePayload,
    LinkPayload, LinkTarget, MediaItem, MediaPayload, Rendition, TablePayload,
};
pub(crate) use builtin::link_entity;
pub use rule::{Filter, ParseFn, Parsed, Placement, RenderContext, RenderFn, Rule, RuleContext};

use editor3_core::EntityType;
use indexmap::IndexMap;

use crate::node::Node;
use crate::options::ConverterOptions;

/// Elements dropped with their content unless a rule or keep filter wants them
const REMOVED_BY_DEFAULT: &[&str] = &[
    "head", "hr", "link", "meta", "noscript", "style", "template", "title",
];

/// Collection of rules for conversion
pub struct Rules {
    /// Custom rules added by the user (checked first)
    custom_rules: IndexMap<String, Rule>,
    /// Keep rules (preserve as an EMBED of the raw HTML)
    keep_rules: Vec<Filter>,
    /// Remove rules (remove entirely)
    remove_rules: Vec<Filter>,
    builtin_rules: Vec<Rule>,
}

impl Rules {
    /// Create a new Rules instance with the builtin entity rules
    pub fn new() -> Self {
        Self {
            custom_rules: IndexMap::new(),
            keep_rules: Vec::new(),
            remove_rules: vec![Filter::tags(REMOVED_BY_DEFAULT)],
            builtin_rules: builtin_rules(),
        }
    }

    /// Add a custom rule. A rule added under an existing key replaces it.
    pub fn add(&mut self, key: &str, rule: Rule) {
        self.custom_rules.insert(key.to_string(), rule);
    }

    /// Add a keep filter
    pub fn keep(&mut self, filter: Filter) {
        self.keep_rules.push(filter);
    }

    /// Add a remove filter
    pub fn remove(&mut self, filter: Filter) {
        self.remove_rules.push(filter);
    }

    fn all(&self) -> impl Iterator<Item = &Rule> {
        self.custom_rules.values().chain(self.builtin_rules.iter())
    }

    /// Find the rule that parses a node
    pub fn for_node(&self, node: &Node, options: &ConverterOptions) -> Option<&Rule> {
        self.all().find(|rule| rule.filter.matches(node, options))
    }

    /// Find the rule that renders an entity type at a placement
    pub fn for_entity(&self, entity_type: &EntityType, placement: Placement) -> Option<&Rule> {
        self.all().find(|rule| rule.renders(entity_type, placement))
    }

    /// Check if a node should be kept as raw HTML
    pub fn should_keep(&self, node: &Node, options: &ConverterOptions) -> bool {
        if self.for_node(node, options).is_some() {
            return false;
        }
        self.keep_rules.iter().any(|f| f.matches(node, options))
    }

    /// Check if a node should be removed
    pub fn should_remove(&self, node: &Node, options: &ConverterOptions) -> bool {
        if self.should_keep(node, options) || self.for_node(node, options).is_some() {
            return false;
        }
        self.remove_rules.iter().any(|f| f.matches(node, options))
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let rules = Rules::new();
        let options = ConverterOptions::default();

        let img = Node::element_with_attrs("img", vec![("src", "a.png")]);
        let rule = rules.for_node(&img, &options).unwrap();
        assert_eq!(rule.entity_type, Some(EntityType::Image));

        let p = Node::element("p");
        assert!(rules.for_node(&p, &options).is_none());

        assert!(rules.for_entity(&EntityType::Table, Placement::Block).is_some());
        assert!(rules.for_entity(&EntityType::Link, Placement::Inline).is_some());
        assert!(rules
            .for_entity(&EntityType::Other("POLL".into()), Placement::Block)
            .is_none());
    }

    #[test]
    fn test_custom_rules_take_precedence() {
        let mut rules = Rules::new();
        let options = ConverterOptions::default();
        rules.add(
            "gallery",
            Rule::block(
                EntityType::Other("GALLERY".into()),
                Filter::tag("img"),
                |_, _| Parsed::Strip,
                |_, _| Ok(String::new()),
            ),
        );

        let img = Node::element_with_attrs("img", vec![("src", "a.png")]);
        let rule = rules.for_node(&img, &options).unwrap();
        assert_eq!(rule.entity_type, Some(EntityType::Other("GALLERY".into())));
    }

    #[test]
    fn test_keep_and_remove() {
        let mut rules = Rules::new();
        let options = ConverterOptions::default();

        let style = Node::element("style");
        assert!(rules.should_remove(&style, &options));

        let form = Node::element("form");
        assert!(!rules.should_keep(&form, &options));
        rules.keep(Filter::tag("form"));
        assert!(rules.should_keep(&form, &options));

        // A builtin rule wins over keep
        rules.keep(Filter::tag("img"));
        let img = Node::element_with_attrs("img", vec![("src", "a.png")]);
        assert!(!rules.should_keep(&img, &options));

        // Keep wins over remove
        rules.keep(Filter::tag("style"));
        assert!(!rules.should_remove(&style, &options));
    }
}
