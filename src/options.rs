//! Parse configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bounds on work done for pathological input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Open containers (block quotes, list items, ...) allowed on one line
    pub max_container_depth: usize,
    /// Unresolved `[` / `![` openers kept per leaf block
    pub max_bracket_depth: usize,
    /// Delimiter runs tracked per leaf block
    pub max_delimiters: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_container_depth: 100,
            max_bracket_depth: 1000,
            max_delimiters: 100_000,
        }
    }
}

/// Extension toggles and inline behaviour for one parse call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub gfm_table: bool,
    pub gfm_task_list_item: bool,
    pub gfm_strikethrough: bool,
    /// Treat a single `~` run as strikethrough instead of subscript
    pub gfm_strikethrough_single_tilde: bool,
    pub gfm_autolink: bool,
    pub footnotes: bool,
    /// Explicit `{id}` suffix on headings
    pub heading_id: bool,
    /// Slug ids for headings without an explicit one
    pub auto_heading_id: bool,
    pub setext: bool,
    pub yaml_front_matter: bool,
    pub math_block: bool,
    pub inline_math: bool,
    pub inline_math_allow_digit_after_open_marker: bool,
    pub emoji: bool,
    /// Extra `alias -> replacement` pairs for `:alias:`
    pub emoji_aliases: BTreeMap<String, String>,
    pub mark: bool,
    pub sup: bool,
    pub sub: bool,
    pub tag: bool,
    pub block_ref: bool,
    pub kramdown_block_ial: bool,
    pub kramdown_span_ial: bool,
    pub callout: bool,
    pub super_block: bool,
    pub custom_block: bool,
    pub git_conflict: bool,
    pub text_mark: bool,
    pub toc: bool,
    pub link_ref: bool,
    pub indented_code_block: bool,
    /// Insert a space between CJK and ASCII alphanumerics
    pub auto_space: bool,
    /// Prefix for relative link and image destinations
    pub link_base: String,
    /// Top-level domains accepted by bare-URL autolinking
    pub autolink_domain_suffixes: Vec<String>,
    pub limits: Limits,
}

pub const DEFAULT_DOMAIN_SUFFIXES: &[&str] = &[
    "top", "com", "net", "org", "edu", "gov", "cn", "io", "me", "biz", "co", "live", "pro",
    "xyz", "win", "club", "tv", "wiki", "site", "tech", "space", "cc", "name", "social", "run",
    "ai", "dev", "app", "info", "ink", "one", "uk", "us", "de", "fr", "jp", "ru", "localhost",
];

impl Default for Options {
    fn default() -> Self {
        Options {
            gfm_table: true,
            gfm_task_list_item: true,
            gfm_strikethrough: true,
            gfm_strikethrough_single_tilde: true,
            gfm_autolink: true,
            footnotes: true,
            heading_id: true,
            auto_heading_id: false,
            setext: true,
            yaml_front_matter: true,
            math_block: true,
            inline_math: true,
            inline_math_allow_digit_after_open_marker: false,
            emoji: true,
            emoji_aliases: BTreeMap::new(),
            mark: false,
            sup: false,
            sub: false,
            tag: false,
            block_ref: false,
            kramdown_block_ial: false,
            kramdown_span_ial: false,
            callout: true,
            super_block: false,
            custom_block: false,
            git_conflict: false,
            text_mark: false,
            toc: false,
            link_ref: true,
            indented_code_block: true,
            auto_space: false,
            link_base: String::new(),
            autolink_domain_suffixes: DEFAULT_DOMAIN_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            limits: Limits::default(),
        }
    }
}

impl Options {
    /// Plain CommonMark: every extension off
    pub fn commonmark() -> Self {
        Options {
            gfm_table: false,
            gfm_task_list_item: false,
            gfm_strikethrough: false,
            gfm_strikethrough_single_tilde: false,
            gfm_autolink: false,
            footnotes: false,
            heading_id: false,
            yaml_front_matter: false,
            math_block: false,
            inline_math: false,
            emoji: false,
            callout: false,
            ..Options::default()
        }
    }

    /// Every extension on, including the ones off by default
    pub fn all() -> Self {
        Options {
            auto_heading_id: true,
            mark: true,
            sup: true,
            sub: true,
            tag: true,
            block_ref: true,
            kramdown_block_ial: true,
            kramdown_span_ial: true,
            super_block: true,
            custom_block: true,
            git_conflict: true,
            text_mark: true,
            toc: true,
            gfm_strikethrough_single_tilde: false,
            ..Options::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options = Options::from_json(r#"{"mark": true, "limits": {"max_bracket_depth": 8}}"#)
            .unwrap();
        assert!(options.mark);
        assert!(options.gfm_table);
        assert_eq!(options.limits.max_bracket_depth, 8);
        assert_eq!(options.limits.max_container_depth, 100);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(Options::from_json("{\"mark\": 3}").is_err());
    }

    #[test]
    fn test_commonmark_turns_extensions_off() {
        let options = Options::commonmark();
        assert!(!options.gfm_table && !options.footnotes && !options.emoji);
        assert!(options.setext && options.link_ref && options.indented_code_block);
    }
}
