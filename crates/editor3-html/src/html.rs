//! HTML parsing support.
//!
//! Parses HTML strings with scraper/html5ever and converts the result to
//! the [`Node`] structure the converter walks. html5ever never rejects
//! input; the only failure is nesting deeper than the configured limit.

use scraper::{ElementRef, Html, Node as ScraperNode};

use crate::node::Node;
use crate::{ConvertError, Result};

/// Parse an HTML fragment into a [`Node`] tree.
///
/// The returned node is a document fragment holding the parsed top-level
/// nodes.
///
/// # Example
///
/// ```rust
/// use editor3_html::parse_html;
///
/// let fragment = parse_html("<h1>Hello <em>World</em></h1>", 64).unwrap();
/// assert_eq!(fragment.children[0].tag_name(), "h1");
/// ```
pub fn parse_html(html: &str, max_depth: usize) -> Result<Node> {
    let document = Html::parse_fragment(html);
    let mut fragment = Node::document_fragment();
    convert_children(document.root_element(), &mut fragment, 1, max_depth)?;
    Ok(fragment)
}

/// Visible text of an HTML fragment, without building a [`Node`] tree
pub fn html_to_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}

/// Convert the children of a scraper element into `parent`
fn convert_children(
    element: ElementRef,
    parent: &mut Node,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    for child in element.children() {
        match child.value() {
            ScraperNode::Text(text) => parent.add_child(Node::text(&text.text)),
            ScraperNode::Comment(comment) => parent.add_child(Node::comment(&comment.comment)),
            ScraperNode::Element(_) => {
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                if depth > max_depth {
                    return Err(ConvertError::TooDeep { limit: max_depth });
                }
                let attrs: Vec<(&str, &str)> = child_element.value().attrs().collect();
                let mut node = Node::element_with_attrs(child_element.value().name(), attrs);
                convert_children(child_element, &mut node, depth + 1, max_depth)?;
                parent.add_child(node);
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_html() {
        let fragment = parse_html("<p>Hello World</p>", 16).unwrap();
        assert_eq!(fragment.children.len(), 1);
        let p = &fragment.children[0];
        assert_eq!(p.tag_name(), "p");
        assert_eq!(p.text_content(), "Hello World");
    }

    #[test]
    fn test_keeps_comments_and_attributes() {
        let fragment =
            parse_html("<!-- EMBED START x --><figure data-entity-key=\"2\"></figure>", 16)
                .unwrap();
        assert!(fragment.children[0].is_comment());
        assert_eq!(fragment.children[0].value(), " EMBED START x ");
        assert_eq!(fragment.children[1].attr("data-entity-key"), Some("2"));
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let html = "<iframe src=\"https://www.youtube.com/embed/x\" width=\"560\" height=\"315\" \
                    allowfullscreen></iframe>";
        for _ in 0..50 {
            let fragment = parse_html(html, 16).unwrap();
            assert_eq!(
                fragment.children[0].outer_html(),
                "<iframe src=\"https://www.youtube.com/embed/x\" width=\"560\" height=\"315\" allowfullscreen></iframe>"
            );
        }
    }

    #[test]
    fn test_decodes_character_references() {
        let fragment = parse_html("<p>a &amp; b&nbsp;c</p>", 16).unwrap();
        assert_eq!(fragment.children[0].text_content(), "a & b\u{a0}c");
    }

    #[test]
    fn test_depth_limit() {
        let html = "<div>".repeat(40) + "deep" + &"</div>".repeat(40);
        assert!(matches!(
            parse_html(&html, 10),
            Err(ConvertError::TooDeep { limit: 10 })
        ));
        assert!(parse_html(&html, 64).is_ok());
        assert_eq!(html_to_text(&html), "deep");
    }
}
