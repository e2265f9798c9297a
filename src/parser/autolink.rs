//! GFM bare-URL and email autolinking over text nodes

use std::sync::LazyLock;

use indextree::NodeId;
use log::trace;
use regex::Regex;

use super::link_ref::normalize_uri;
use crate::ast::{LinkData, LinkType, Node, NodeKind};
use crate::options::Options;
use crate::tree::Tree;
use crate::walk::{WalkStatus, walk};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.+_-]+@[a-zA-Z0-9_-]+(?:\.[a-zA-Z0-9_-]+)+").expect("valid email regex")
});

/// A link found inside a text run
#[derive(Debug, PartialEq, Eq)]
struct Found {
    start: usize,
    end: usize,
    destination: String,
}

fn is_url_start_boundary(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '*' | '_' | '~' | '(' | '"' | '\''),
    }
}

fn is_email_start_boundary(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => !(c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_' | '@' | '/')),
    }
}

/// Length of `scheme://` at the start of `text`, with the lowercased scheme
fn scheme_prefix(text: &str) -> Option<(usize, String)> {
    let bytes = text.as_bytes();
    if !bytes.first()?.is_ascii_alphabetic() {
        return None;
    }
    let scheme_len = bytes
        .iter()
        .position(|&b| !(b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-')))?;
    if !text[scheme_len..].starts_with("://") || scheme_len > 32 {
        return None;
    }
    Some((scheme_len + 3, text[..scheme_len].to_ascii_lowercase()))
}

/// Strip trailing punctuation, unbalanced `)` and a trailing entity reference
fn trim_url_end(url: &str) -> &str {
    let mut url = url;
    loop {
        let before = url.len();
        url = url.trim_end_matches(['?', '!', '.', ',', ':', '*', '_', '~']);
        if url.ends_with(')') {
            let opens = url.matches('(').count();
            let closes = url.matches(')').count();
            if closes > opens {
                url = &url[..url.len() - 1];
            }
        }
        if url.ends_with(';')
            && let Some(amp) = url.rfind('&')
        {
            let name = &url[amp + 1..url.len() - 1];
            if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric()) {
                url = &url[..amp];
            }
        }
        if url.len() == before {
            return url;
        }
    }
}

/// Domain checks for `www.`, http, https and ftp links
fn valid_web_domain(host: &str, suffixes: &[String]) -> bool {
    let segments: Vec<&str> = host.split('.').collect();
    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return false;
    }
    if segments[segments.len() - 2..].iter().any(|s| s.contains('_')) {
        return false;
    }
    let Some(last) = segments.last() else {
        return false;
    };
    last.bytes().all(|b| b.is_ascii_digit()) || suffixes.iter().any(|s| s.eq_ignore_ascii_case(last))
}

fn host_of(rest: &str) -> &str {
    let end = rest.find(['/', '?', '#', ':']).unwrap_or(rest.len());
    &rest[..end]
}

fn match_url(text: &str, options: &Options) -> Option<(usize, String)> {
    let www = text.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("www."));
    let scheme = if www { None } else { Some(scheme_prefix(text)?) };
    let body_end = text.find(|c: char| c.is_whitespace() || c == '<').unwrap_or(text.len());
    let candidate = trim_url_end(&text[..body_end]);

    let Some((prefix_len, scheme)) = scheme else {
        if candidate.len() <= 4 || !valid_web_domain(host_of(candidate), &options.autolink_domain_suffixes) {
            return None;
        }
        return Some((candidate.len(), format!("http://{}", candidate)));
    };

    let host = host_of(candidate.get(prefix_len..)?);
    if host.is_empty() {
        return None;
    }
    if matches!(scheme.as_str(), "http" | "https" | "ftp")
        && !valid_web_domain(host, &options.autolink_domain_suffixes)
    {
        return None;
    }
    Some((candidate.len(), candidate.to_string()))
}

fn match_email(text: &str) -> Option<(usize, String)> {
    let m = EMAIL.find(text)?;
    let address = m.as_str().trim_end_matches('.');
    if address.ends_with(['-', '_']) || !address.rsplit_once('@')?.1.contains('.') {
        return None;
    }
    Some((address.len(), format!("mailto:{}", address)))
}

fn scan(text: &str, options: &Options) -> Vec<Found> {
    let mut found = Vec::new();
    let mut prev: Option<char> = None;
    let mut indices = text.char_indices();
    while let Some((i, c)) = indices.next() {
        let rest = &text[i..];
        let hit = if c.is_ascii_alphabetic() && is_url_start_boundary(prev) {
            match_url(rest, options)
        } else {
            None
        }
        .or_else(|| {
            if (c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_')) && is_email_start_boundary(prev) {
                match_email(rest)
            } else {
                None
            }
        });

        match hit {
            Some((len, destination)) => {
                found.push(Found {
                    start: i,
                    end: i + len,
                    destination,
                });
                let end = i + len;
                prev = text[..end].chars().next_back();
                while indices.clone().next().is_some_and(|(j, _)| j < end) {
                    indices.next();
                }
            }
            None => prev = Some(c),
        }
    }
    found
}

/// Text nodes outside links and images, in document order
fn linkable_texts(tree: &Tree) -> Vec<NodeId> {
    let mut texts = Vec::new();
    walk(tree, tree.root(), |id, entering| {
        if !entering {
            return WalkStatus::Continue;
        }
        match tree.kind(id) {
            NodeKind::Link(_) | NodeKind::Image(_) => WalkStatus::SkipChildren,
            NodeKind::Text => {
                texts.push(id);
                WalkStatus::Continue
            }
            _ => WalkStatus::Continue,
        }
    });
    texts
}

fn new_closed(tree: &mut Tree, node: Node) -> NodeId {
    let mut node = node;
    node.open = false;
    tree.new_node_with(node)
}

/// Split text nodes around bare URLs and email addresses
pub(crate) fn link_bare_urls(tree: &mut Tree, options: &Options) {
    for text_node in linkable_texts(tree) {
        let text = tree.tokens(text_node).to_string();
        let found = scan(&text, options);
        if found.is_empty() {
            continue;
        }
        trace!("{} bare links in text run", found.len());

        let mut anchor = text_node;
        let mut last = 0;
        for link in found {
            if link.start > last {
                let before = new_closed(tree, Node::with_tokens(NodeKind::Text, &text[last..link.start]));
                tree.insert_after(anchor, before);
                anchor = before;
            }
            let node = new_closed(
                tree,
                Node::new(NodeKind::Link(LinkData {
                    link_type: LinkType::Autolink,
                    destination: normalize_uri(&link.destination),
                    title: String::new(),
                })),
            );
            let label = new_closed(tree, Node::with_tokens(NodeKind::Text, &text[link.start..link.end]));
            tree.append_child(node, label);
            tree.insert_after(anchor, node);
            anchor = node;
            last = link.end;
        }
        if last < text.len() {
            let after = new_closed(tree, Node::with_tokens(NodeKind::Text, &text[last..]));
            tree.insert_after(anchor, after);
        }
        tree.unlink(text_node);
    }
}
