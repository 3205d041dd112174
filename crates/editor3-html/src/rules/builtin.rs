//! Builtin rules for the editor3 entity types.
//!
//! Block entities are written as `<figure data-entity-key data-entity-type>`
//! placeholders and read back from those, or from the plain markup pasted
//! content usually carries (`<img>`, `<iframe>`, `<table>`, ...).

use editor3_core::{Document, Entity, EntityType, Mutability};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Filter, Parsed, Placement, RenderContext, Rule, RuleContext};
use crate::node::Node;
use crate::utilities::{collapse_whitespace, escape_attr, escape_text};
use crate::{ConvertError, Result};

/// Elements that are embedded content on their own
const EMBED_TAGS: &[&str] = &["audio", "embed", "iframe", "object", "script", "video"];

/// Elements whose `src` is checked against the embed policy
const POLICED_TAGS: &[&str] = &["embed", "iframe", "script"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A picture item from the archive. Only the fields rendered are read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaPayload {
    pub media: MediaItem,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default)]
    pub renditions: IndexMap<String, Rendition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rendition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl MediaItem {
    /// The `original` rendition, else the first one with an address
    pub fn href(&self) -> Option<&str> {
        self.renditions
            .get("original")
            .and_then(|r| r.href.as_deref())
            .or_else(|| self.renditions.values().find_map(|r| r.href.as_deref()))
            .filter(|href| !href.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedPayload {
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// EMBED data as found in stored documents: flat, or the provider's
/// response nested under `data` with the caption beside it
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEmbed {
    Flat(EmbedPayload),
    Nested {
        data: EmbedHtml,
        #[serde(default)]
        description: Option<String>,
    },
}

#[derive(Deserialize)]
struct EmbedHtml {
    html: String,
}

impl From<StoredEmbed> for EmbedPayload {
    fn from(stored: StoredEmbed) -> Self {
        match stored {
            StoredEmbed::Flat(payload) => payload,
            StoredEmbed::Nested { data, description } => EmbedPayload {
                html: data.html,
                description,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleEmbedPayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomBlockPayload {
    pub vocabulary_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkPayload {
    pub link: LinkTarget,
}

impl LinkPayload {
    pub fn to(href: &str) -> Self {
        Self {
            link: LinkTarget {
                href: Some(href.to_string()),
                ..LinkTarget::default()
            },
        }
    }
}

/// Cells are whole documents; `None` marks an empty cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePayload {
    pub num_rows: usize,
    pub num_cols: usize,
    #[serde(default)]
    pub with_header: bool,
    #[serde(default)]
    pub cells: Vec<Vec<Option<Document>>>,
}

/// TABLE data is stored either flat or nested under `data`
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTable {
    Flat(TablePayload),
    Nested { data: TablePayload },
}

impl From<StoredTable> for TablePayload {
    fn from(stored: StoredTable) -> Self {
        match stored {
            StoredTable::Flat(payload) | StoredTable::Nested { data: payload } => payload,
        }
    }
}

/// Create all builtin rules, in lookup order
pub fn builtin_rules() -> Vec<Rule> {
    vec![
        link_rule(),
        inline_entity_rule(),
        table_rule(),
        image_rule(),
        media_rule(),
        article_embed_rule(),
        custom_block_rule(),
        embed_rule(),
    ]
}

fn link_rule() -> Rule {
    Rule::inline(
        EntityType::Link,
        Filter::predicate(|tag, node, _| {
            tag == "a" && (node.attr_non_empty("href").is_some() || node.has_attr("data-attachment"))
        }),
        |node, _| {
            let href = node.attr_non_empty("href");
            if href.is_some_and(is_script_url) {
                return Parsed::Text(node.text_content());
            }
            to_entity(
                EntityType::Link,
                &LinkPayload {
                    link: LinkTarget {
                        href: href.map(str::to_string),
                        target: node.attr_non_empty("target").map(str::to_string),
                        attachment: node.attr_non_empty("data-attachment").map(str::to_string),
                    },
                },
            )
        },
        |entity, ctx| {
            let LinkPayload { link } = payload(entity)?;
            if link.href.is_none() && link.attachment.is_none() {
                return Ok(ctx.content.to_string());
            }

            let mut html = String::from("<a");
            if let Some(href) = &link.href {
                html.push_str(&format!(" href=\"{}\"", escape_attr(href)));
            }
            if let Some(target) = &link.target {
                html.push_str(&format!(" target=\"{}\"", escape_attr(target)));
            }
            if let Some(attachment) = &link.attachment {
                html.push_str(&format!(" data-attachment=\"{}\"", escape_attr(attachment)));
            }
            html.push('>');
            html.push_str(ctx.content);
            html.push_str("</a>");
            Ok(html)
        },
    )
}

/// Any other inline entity travels as a `<span>` carrying its payload as JSON
fn inline_entity_rule() -> Rule {
    Rule::new(
        None,
        Placement::Inline,
        Filter::predicate(|tag, node, _| {
            tag == "span" && node.attr_non_empty("data-entity-type").is_some()
        }),
        |node, _| {
            let Some(name) = node.attr_non_empty("data-entity-type") else {
                return Parsed::Text(node.text_content());
            };
            let data = match node.attr("data-entity-data") {
                None => Map::new(),
                Some(raw) => match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(data)) => data,
                    _ => {
                        tracing::debug!(entity_type = name, "unreadable inline entity data");
                        return Parsed::Text(node.text_content());
                    }
                },
            };

            let mut entity = Entity::new(EntityType::from_name(name), data);
            if let Some(mutability) = node
                .attr_non_empty("data-entity-mutability")
                .and_then(|m| serde_json::from_value::<Mutability>(Value::String(m.to_string())).ok())
            {
                entity.mutability = mutability;
            }
            Parsed::Entity(entity)
        },
        |entity, ctx| {
            let data = serde_json::to_string(&entity.data).map_err(editor3_core::RawError::from)?;
            let mut html = format!("<span{}", ctx.placeholder_attrs(&entity.entity_type));
            if entity.mutability != Mutability::Mutable {
                if let Value::String(m) = serde_json::to_value(entity.mutability)
                    .map_err(editor3_core::RawError::from)?
                {
                    html.push_str(&format!(" data-entity-mutability=\"{m}\""));
                }
            }
            html.push_str(&format!(" data-entity-data=\"{}\">", escape_attr(&data)));
            html.push_str(ctx.content);
            html.push_str("</span>");
            Ok(html)
        },
    )
}

fn image_rule() -> Rule {
    Rule::block(
        EntityType::Image,
        Filter::predicate(|tag, node, _| {
            tag == "img"
                || is_placeholder(node, &EntityType::Image)
                || (is_bare_figure(node)
                    && node.find_tag("img").is_some()
                    && !has_embed_content(node))
        }),
        |node, _| parse_image(node),
        |entity, ctx| {
            let image: ImagePayload = payload(entity)?;
            let mut html = format!(
                "<figure{}><img src=\"{}\"",
                ctx.placeholder_attrs(&entity.entity_type),
                escape_attr(&image.href)
            );
            if let Some(width) = image.width {
                html.push_str(&format!(" width=\"{width}\""));
            }
            if let Some(height) = image.height {
                html.push_str(&format!(" height=\"{height}\""));
            }
            if let Some(alt) = &image.alt {
                html.push_str(&format!(" alt=\"{}\"", escape_attr(alt)));
            }
            html.push('>');
            html.push_str(&figcaption(image.description.as_deref()));
            html.push_str("</figure>");
            Ok(html)
        },
    )
}

fn parse_image(node: &Node) -> Parsed {
    let img = if node.tag_name() == "img" {
        Some(node)
    } else {
        node.find_tag("img")
    };
    let Some(img) = img else {
        return text_or_strip(node);
    };
    let Some(href) = img.attr_non_empty("src").or_else(|| img.attr_non_empty("data-src"))
    else {
        return text_or_strip(node);
    };

    to_entity(
        EntityType::Image,
        &ImagePayload {
            href: href.to_string(),
            width: img.attr("width").and_then(|w| w.trim().parse().ok()),
            height: img.attr("height").and_then(|h| h.trim().parse().ok()),
            alt: img.attr_non_empty("alt").map(str::to_string),
            description: caption(node),
        },
    )
}

/// Archived pictures are written like images and read back as IMAGE
fn media_rule() -> Rule {
    Rule::block(
        EntityType::Media,
        Filter::predicate(|_, node, _| is_placeholder(node, &EntityType::Media)),
        |node, _| parse_image(node),
        |entity, ctx| {
            let MediaPayload { media } = payload(entity)?;
            let href = media.href().ok_or_else(|| unsupported(entity))?;
            Ok(format!(
                "<figure{}><img src=\"{}\" alt=\"{}\">{}</figure>",
                ctx.placeholder_attrs(&entity.entity_type),
                escape_attr(href),
                escape_attr(media.alt_text.as_deref().unwrap_or_default()),
                figcaption(media.description_text.as_deref())
            ))
        },
    )
}

fn embed_rule() -> Rule {
    Rule::block(
        EntityType::Embed,
        Filter::predicate(|tag, node, _| {
            EMBED_TAGS.contains(&tag)
                || (tag == "div" && node.has_class("embed-block"))
                || is_placeholder(node, &EntityType::Embed)
                || (is_bare_figure(node) && has_embed_content(node))
        }),
        |node, ctx| {
            if let Some(src) = policed_source(node) {
                if !ctx.options.embed_policy.allows(src) {
                    tracing::debug!(src, "embed source not allowed, keeping a link");
                    return Parsed::Link {
                        href: src.to_string(),
                        text: src.to_string(),
                    };
                }
            }

            let html = embed_html(node);
            if html.is_empty() {
                return text_or_strip(node);
            }
            let description = if node.tag_name() == "figure" {
                caption(node)
            } else {
                None
            };
            to_entity(EntityType::Embed, &EmbedPayload { html, description })
        },
        |entity, ctx| {
            let embed: EmbedPayload = payload::<StoredEmbed>(entity)?.into();
            Ok(format!(
                "<figure{}><div class=\"embed-block\">{}</div>{}</figure>",
                ctx.placeholder_attrs(&entity.entity_type),
                embed.html,
                figcaption(embed.description.as_deref())
            ))
        },
    )
}

fn article_embed_rule() -> Rule {
    Rule::block(
        EntityType::ArticleEmbed,
        Filter::predicate(|_, node, _| is_placeholder(node, &EntityType::ArticleEmbed)),
        |node, _| {
            let Some(id) = node.attr_non_empty("data-article-id") else {
                return text_or_strip(node);
            };
            to_entity(
                EntityType::ArticleEmbed,
                &ArticleEmbedPayload {
                    id: id.to_string(),
                    headline: node.attr_non_empty("data-headline").map(str::to_string),
                    html: wrapped_html(node, "article-embed"),
                },
            )
        },
        |entity, ctx| {
            let article: ArticleEmbedPayload = payload(entity)?;
            let mut html = format!(
                "<figure{} data-article-id=\"{}\"",
                ctx.placeholder_attrs(&entity.entity_type),
                escape_attr(&article.id)
            );
            if let Some(headline) = &article.headline {
                html.push_str(&format!(" data-headline=\"{}\"", escape_attr(headline)));
            }
            html.push('>');
            if let Some(body) = &article.html {
                html.push_str(&format!("<div class=\"article-embed\">{body}</div>"));
            }
            html.push_str("</figure>");
            Ok(html)
        },
    )
}

fn custom_block_rule() -> Rule {
    Rule::block(
        EntityType::CustomBlock,
        Filter::predicate(|_, node, _| is_placeholder(node, &EntityType::CustomBlock)),
        |node, _| {
            let Some(vocabulary_id) = node.attr_non_empty("data-vocabulary-id") else {
                return text_or_strip(node);
            };
            to_entity(
                EntityType::CustomBlock,
                &CustomBlockPayload {
                    vocabulary_id: vocabulary_id.to_string(),
                    title: node.attr_non_empty("data-title").map(str::to_string),
                    html: wrapped_html(node, "custom-block"),
                },
            )
        },
        |entity, ctx| {
            let block: CustomBlockPayload = payload(entity)?;
            let mut html = format!(
                "<figure{} data-vocabulary-id=\"{}\"",
                ctx.placeholder_attrs(&entity.entity_type),
                escape_attr(&block.vocabulary_id)
            );
            if let Some(title) = &block.title {
                html.push_str(&format!(" data-title=\"{}\"", escape_attr(title)));
            }
            html.push('>');
            if let Some(body) = &block.html {
                html.push_str(&format!("<div class=\"custom-block\">{body}</div>"));
            }
            html.push_str("</figure>");
            Ok(html)
        },
    )
}

fn table_rule() -> Rule {
    Rule::block(
        EntityType::Table,
        Filter::predicate(|tag, node, _| {
            tag == "table" || is_placeholder(node, &EntityType::Table)
        }),
        |node, ctx| {
            let table = if node.tag_name() == "table" {
                Some(node)
            } else {
                node.find_tag("table")
            };
            let Some(table) = table else {
                return text_or_strip(node);
            };
            parse_table(table, ctx)
        },
        |entity, ctx| {
            let table: TablePayload = payload::<StoredTable>(entity)?.into();
            let header_rows = usize::from(table.with_header && table.num_rows > 0);

            let mut html = format!("<figure{}><table>", ctx.placeholder_attrs(&entity.entity_type));
            if header_rows > 0 {
                html.push_str("<thead>");
                html.push_str(&table_row(row_cells(&table, 0), table.num_cols, "th", ctx));
                html.push_str("</thead>");
            }
            if table.num_rows > header_rows {
                html.push_str("<tbody>");
                for row in header_rows..table.num_rows {
                    html.push_str(&table_row(row_cells(&table, row), table.num_cols, "td", ctx));
                }
                html.push_str("</tbody>");
            }
            html.push_str("</table></figure>");
            Ok(html)
        },
    )
}

fn parse_table(table: &Node, ctx: &RuleContext) -> Parsed {
    let rows: Vec<&Node> = table
        .element_children()
        .flat_map(|child| match child.tag_name() {
            "tr" => vec![child],
            "thead" | "tbody" | "tfoot" => {
                child.element_children().filter(|n| n.tag_name() == "tr").collect()
            }
            _ => Vec::new(),
        })
        .collect();
    if rows.is_empty() {
        return Parsed::Strip;
    }

    let first = cells_of(rows[0]);
    let with_header = !first.is_empty() && first.iter().all(|c| c.tag_name() == "th");
    let num_cols = rows.iter().map(|r| cells_of(r).len()).max().unwrap_or(0);

    let mut cells = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut parsed: Vec<Option<Document>> = cells_of(row)
            .into_iter()
            .map(|cell| match ctx.parse_fragment(cell) {
                Ok(doc) if !doc.blocks.is_empty() => Some(doc),
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!(%err, "dropping table cell");
                    None
                }
            })
            .collect();
        parsed.resize(num_cols, None);
        cells.push(parsed);
    }

    to_entity(
        EntityType::Table,
        &TablePayload {
            num_rows: rows.len(),
            num_cols,
            with_header,
            cells,
        },
    )
}

fn cells_of(row: &Node) -> Vec<&Node> {
    row.element_children()
        .filter(|n| matches!(n.tag_name(), "td" | "th"))
        .collect()
}

/// Stored cells of `row`; rows past the stored ones are empty
fn row_cells(table: &TablePayload, row: usize) -> &[Option<Document>] {
    table.cells.get(row).map(Vec::as_slice).unwrap_or_default()
}

fn table_row(row: &[Option<Document>], num_cols: usize, tag: &str, ctx: &RenderContext) -> String {
    let mut html = String::from("<tr>");
    for col in 0..num_cols {
        let content = row
            .get(col)
            .and_then(Option::as_ref)
            .map(|doc| ctx.render_document(doc))
            .unwrap_or_default();
        html.push_str(&format!("<{tag}>{content}</{tag}>"));
    }
    html.push_str("</tr>");
    html
}

/// Build a link entity for `href`
pub(crate) fn link_entity(href: &str) -> Option<Entity> {
    Entity::from_payload(EntityType::Link, &LinkPayload::to(href)).ok()
}

fn to_entity<T: Serialize>(entity_type: EntityType, payload: &T) -> Parsed {
    match Entity::from_payload(entity_type, payload) {
        Ok(entity) => Parsed::Entity(entity),
        Err(err) => {
            tracing::warn!(%err, "dropping entity");
            Parsed::Strip
        }
    }
}

fn payload<T: DeserializeOwned>(entity: &Entity) -> Result<T> {
    entity.payload().ok_or_else(|| unsupported(entity))
}

fn unsupported(entity: &Entity) -> ConvertError {
    ConvertError::UnsupportedEntity {
        entity_type: entity.entity_type.name().to_string(),
    }
}

fn is_placeholder(node: &Node, entity_type: &EntityType) -> bool {
    node.tag_name() == "figure" && node.attr("data-entity-type") == Some(entity_type.name())
}

fn is_bare_figure(node: &Node) -> bool {
    node.tag_name() == "figure" && !node.has_attr("data-entity-type")
}

fn has_embed_content(node: &Node) -> bool {
    node.find(|n| {
        EMBED_TAGS.contains(&n.tag_name()) || n.tag_name() == "blockquote" || n.has_class("embed-block")
    })
    .is_some()
}

/// `src` of the first element the embed policy applies to
fn policed_source(node: &Node) -> Option<&str> {
    let policed = |n: &Node| POLICED_TAGS.contains(&n.tag_name()) && n.has_attr("src");
    if policed(node) {
        return node.attr_non_empty("src");
    }
    node.find(policed).and_then(|n| n.attr_non_empty("src"))
}

fn embed_html(node: &Node) -> String {
    let html = match node.tag_name() {
        "figure" => match node.element_children().find(|c| c.has_class("embed-block")) {
            Some(block) => block.inner_html(),
            None => node
                .children()
                .filter(|c| c.tag_name() != "figcaption")
                .map(Node::outer_html)
                .collect(),
        },
        "div" if node.has_class("embed-block") => node.inner_html(),
        _ => node.outer_html(),
    };
    html.trim().to_string()
}

/// Inner HTML of the child `div` with class `class`
fn wrapped_html(node: &Node, class: &str) -> Option<String> {
    node.element_children()
        .find(|c| c.tag_name() == "div" && c.has_class(class))
        .map(|c| c.inner_html().trim().to_string())
        .filter(|html| !html.is_empty())
}

fn caption(node: &Node) -> Option<String> {
    node.find_tag("figcaption")
        .map(|c| collapse_whitespace(&c.text_content()).trim().to_string())
        .filter(|c| !c.is_empty())
}

fn figcaption(description: Option<&str>) -> String {
    description
        .map(|d| format!("<figcaption>{}</figcaption>", escape_text(d)))
        .unwrap_or_default()
}

fn text_or_strip(node: &Node) -> Parsed {
    let text = collapse_whitespace(&node.text_content()).trim().to_string();
    if text.is_empty() {
        Parsed::Strip
    } else {
        Parsed::Text(text)
    }
}

fn is_script_url(href: &str) -> bool {
    let href = href.trim().to_lowercase();
    ["javascript:", "vbscript:", "data:text/html"]
        .iter()
        .any(|scheme| href.starts_with(scheme))
}
