//! Converter configuration.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;

/// Hosts accepted by [`EmbedPolicy::default`]. Subdomains match too.
pub const DEFAULT_EMBED_PROVIDERS: &[&str] = &[
    "datawrapper.dwcdn.net",
    "facebook.com",
    "flourish.studio",
    "iframe.ly",
    "instagram.com",
    "soundcloud.com",
    "spotify.com",
    "tiktok.com",
    "twitter.com",
    "vimeo.com",
    "x.com",
    "youtu.be",
    "youtube-nocookie.com",
    "youtube.com",
];

/// Which third-party sources an EMBED may load from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmbedPolicy {
    /// Any source is accepted
    AllowAll,
    /// Only these hosts (and their subdomains) are accepted
    Allowlist(Vec<String>),
}

impl Default for EmbedPolicy {
    fn default() -> Self {
        EmbedPolicy::Allowlist(
            DEFAULT_EMBED_PROVIDERS
                .iter()
                .map(|host| host.to_string())
                .collect(),
        )
    }
}

impl EmbedPolicy {
    /// Whether content loaded from `src` may be embedded.
    ///
    /// Protocol-relative URLs are read as https. Sources without a host
    /// are rejected by an allowlist.
    pub fn allows(&self, src: &str) -> bool {
        let hosts = match self {
            EmbedPolicy::AllowAll => return true,
            EmbedPolicy::Allowlist(hosts) => hosts,
        };

        let src = src.trim();
        let parsed = if src.starts_with("//") {
            Url::parse(&format!("https:{src}"))
        } else {
            Url::parse(src)
        };
        let Some(host) = parsed.ok().and_then(|url| url.host_str().map(str::to_lowercase)) else {
            return false;
        };

        hosts.iter().any(|allowed| {
            let allowed = allowed.trim().trim_start_matches('.').to_lowercase();
            host == allowed || host.ends_with(&format!(".{allowed}"))
        })
    }
}

/// Options for [`crate::HtmlConverter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConverterOptions {
    /// Indentation unit for nested list markup
    pub list_indent: String,

    /// Wrap IMAGE and EMBED placeholders in `<!-- EMBED START -->` /
    /// `<!-- EMBED END -->` comments
    pub embed_markers: bool,

    pub embed_policy: EmbedPolicy,

    /// Deepest element nesting accepted when parsing
    pub max_depth: usize,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            list_indent: "  ".to_string(),
            embed_markers: false,
            embed_policy: EmbedPolicy::default(),
            max_depth: 256,
        }
    }
}

impl ConverterOptions {
    /// Load options from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
