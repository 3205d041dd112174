//! Inline styles and their fixed nesting priority.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An inline style applied over a range of block text.
///
/// Known styles use the editor's stored names (`"BOLD"`, `"ITALIC"`, ...).
/// Anything else is kept verbatim in [`InlineStyle::Other`] so stored
/// documents survive a load/save cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Subscript,
    Superscript,
    /// Editorial highlight marker
    Highlight,
    /// Editorial comment marker
    Comment,
    Other(String),
}

/// Nesting priority, outermost first. Styles not listed here sort after
/// every listed style, by name.
const PRIORITY: &[InlineStyle] = &[
    InlineStyle::Highlight,
    InlineStyle::Comment,
    InlineStyle::Bold,
    InlineStyle::Italic,
    InlineStyle::Underline,
    InlineStyle::Strikethrough,
    InlineStyle::Subscript,
    InlineStyle::Superscript,
    InlineStyle::Code,
];

impl InlineStyle {
    /// Parse a stored style name
    pub fn from_name(name: &str) -> Self {
        match name {
            "BOLD" => InlineStyle::Bold,
            "ITALIC" => InlineStyle::Italic,
            "UNDERLINE" => InlineStyle::Underline,
            "STRIKETHROUGH" => InlineStyle::Strikethrough,
            "CODE" => InlineStyle::Code,
            "SUBSCRIPT" => InlineStyle::Subscript,
            "SUPERSCRIPT" => InlineStyle::Superscript,
            "HIGHLIGHT" => InlineStyle::Highlight,
            "COMMENT" => InlineStyle::Comment,
            other => InlineStyle::Other(other.to_string()),
        }
    }

    /// The stored style name
    pub fn name(&self) -> &str {
        match self {
            InlineStyle::Bold => "BOLD",
            InlineStyle::Italic => "ITALIC",
            InlineStyle::Underline => "UNDERLINE",
            InlineStyle::Strikethrough => "STRIKETHROUGH",
            InlineStyle::Code => "CODE",
            InlineStyle::Subscript => "SUBSCRIPT",
            InlineStyle::Superscript => "SUPERSCRIPT",
            InlineStyle::Highlight => "HIGHLIGHT",
            InlineStyle::Comment => "COMMENT",
            InlineStyle::Other(name) => name,
        }
    }

    /// Position in the nesting order; lower ranks wrap higher ones.
    pub fn rank(&self) -> usize {
        PRIORITY
            .iter()
            .position(|s| s == self)
            .unwrap_or(PRIORITY.len())
    }

    /// Total order used wherever styles must be emitted deterministically.
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.name().cmp(other.name()))
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for InlineStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for InlineStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(InlineStyle::from_name(&name))
    }
}
