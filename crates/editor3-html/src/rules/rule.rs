//! Rule and Filter types for HTML conversion.

use editor3_core::{Document, Entity, EntityKey, EntityType};

use crate::emit::Emitter;
use crate::node::Node;
use crate::options::ConverterOptions;
use crate::parse::Parser;
use crate::rules::Rules;
use crate::utilities::escape_attr;
use crate::Result;

/// Type alias for node parsing functions
pub type ParseFn = Box<dyn Fn(&Node, &RuleContext) -> Parsed + Send + Sync>;

/// Type alias for entity rendering functions
pub type RenderFn = Box<dyn Fn(&Entity, &RenderContext) -> Result<String> + Send + Sync>;

/// Where an entity sits in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Alone in an atomic block
    Block,
    /// Over a range of text in a regular block
    Inline,
}

/// A filter determines which elements a rule applies to
pub enum Filter {
    /// Match a single tag name
    TagName(String),
    /// Match any of multiple tag names
    TagNames(Vec<String>),
    /// Match using a predicate function
    Predicate(Box<dyn Fn(&str, &Node, &ConverterOptions) -> bool + Send + Sync>),
}

impl Filter {
    /// Create a filter for a single tag
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_lowercase())
    }

    /// Create a filter for multiple tags
    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    /// Create a filter with a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str, &Node, &ConverterOptions) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Check if this filter matches an element
    pub fn matches(&self, node: &Node, options: &ConverterOptions) -> bool {
        if !node.is_element() {
            return false;
        }
        let tag = node.tag_name();
        match self {
            Filter::TagName(t) => tag == t,
            Filter::TagNames(tags) => tags.iter().any(|t| t == tag),
            Filter::Predicate(f) => f(tag, node, options),
        }
    }
}

/// What a rule made of a matched element
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// Recognized; becomes an entity at the rule's placement
    Entity(Entity),
    /// Recognized but not allowed; becomes a paragraph linking to `href`
    Link { href: String, text: String },
    /// Not recognized; block rules keep the text as a paragraph, inline
    /// rules keep the element's content unwrapped
    Text(String),
    /// Dropped without trace
    Strip,
}

/// State available to a rule while parsing
pub struct RuleContext<'a> {
    pub options: &'a ConverterOptions,
    pub rules: &'a Rules,
    pub(crate) depth: usize,
}

impl RuleContext<'_> {
    /// Parse the children of `node` as a separate document, for entities
    /// that nest documents (table cells).
    pub fn parse_fragment(&self, node: &Node) -> Result<Document> {
        Parser::new(self.rules, self.options, self.depth).parse(node)
    }
}

/// State available to a rule while rendering
pub struct RenderContext<'a> {
    pub options: &'a ConverterOptions,
    pub rules: &'a Rules,
    /// Key of the entity being rendered
    pub key: EntityKey,
    /// Rendered HTML of the text an inline entity covers; empty for blocks
    pub content: &'a str,
}

impl RenderContext<'_> {
    /// Render a nested document
    pub fn render_document(&self, document: &Document) -> String {
        Emitter::new(self.rules, self.options, document).emit()
    }

    /// ` data-entity-key=".." data-entity-type=".."`, the attributes that
    /// mark an element as an entity placeholder
    pub fn placeholder_attrs(&self, entity_type: &EntityType) -> String {
        format!(
            " data-entity-key=\"{}\" data-entity-type=\"{}\"",
            self.key,
            escape_attr(entity_type.name())
        )
    }
}

/// A rule ties an entity type to the HTML it is read from and written as
pub struct Rule {
    /// Entity type this rule renders; `None` renders any type at its placement
    pub entity_type: Option<EntityType>,
    pub placement: Placement,
    /// Filter to determine which elements this rule parses
    pub filter: Filter,
    pub parse: ParseFn,
    pub render: RenderFn,
}

impl Rule {
    /// Create a new rule
    pub fn new<P, R>(
        entity_type: Option<EntityType>,
        placement: Placement,
        filter: Filter,
        parse: P,
        render: R,
    ) -> Self
    where
        P: Fn(&Node, &RuleContext) -> Parsed + Send + Sync + 'static,
        R: Fn(&Entity, &RenderContext) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            entity_type,
            placement,
            filter,
            parse: Box::new(parse),
            render: Box::new(render),
        }
    }

    /// Create a rule for an atomic-block entity type
    pub fn block<P, R>(entity_type: EntityType, filter: Filter, parse: P, render: R) -> Self
    where
        P: Fn(&Node, &RuleContext) -> Parsed + Send + Sync + 'static,
        R: Fn(&Entity, &RenderContext) -> Result<String> + Send + Sync + 'static,
    {
        Self::new(Some(entity_type), Placement::Block, filter, parse, render)
    }

    /// Create a rule for an inline entity type
    pub fn inline<P, R>(entity_type: EntityType, filter: Filter, parse: P, render: R) -> Self
    where
        P: Fn(&Node, &RuleContext) -> Parsed + Send + Sync + 'static,
        R: Fn(&Entity, &RenderContext) -> Result<String> + Send + Sync + 'static,
    {
        Self::new(Some(entity_type), Placement::Inline, filter, parse, render)
    }

    /// Whether this rule renders entities of `entity_type` at `placement`
    pub fn renders(&self, entity_type: &EntityType, placement: Placement) -> bool {
        self.placement == placement
            && self.entity_type.as_ref().map_or(true, |t| t == entity_type)
    }

    pub fn parse_node(&self, node: &Node, ctx: &RuleContext) -> Parsed {
        (self.parse)(node, ctx)
    }

    pub fn render_entity(&self, entity: &Entity, ctx: &RenderContext) -> Result<String> {
        (self.render)(entity, ctx)
    }
}
