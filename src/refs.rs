//! Session-scoped reference map: mints `@ref:N` tokens for elements during a
//! walk and resolves them back to live elements for follow-up commands.
//!
//! Entries are keyed by `NodeId`, so the map never owns element data and can
//! never keep a detached subtree reachable; liveness is re-checked on every
//! resolve by walking ancestors to the document root.

use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no element found for selector: {0}")]
    ElementNotFound(String),
    /// The selector was a ref token and resolution failed - callers should
    /// re-snapshot rather than retype a CSS selector.
    #[error("ref {0} has expired; take a new snapshot")]
    RefExpired(String),
    #[error("invalid selector syntax: {0}")]
    InvalidSelector(String),
}

/// Bidirectional token/element registry for one document.
#[derive(Debug, Default)]
pub struct RefMap {
    counter: u32,
    by_token: HashMap<String, NodeId>,
    by_node: HashMap<NodeId, String>,
}

impl RefMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token for an element, reusing the existing token if the element
    /// was already seen since the last `clear`. The counter only advances on
    /// a fresh mint.
    pub fn generate(&mut self, node: NodeId) -> String {
        if let Some(existing) = self.by_node.get(&node) {
            return existing.clone();
        }
        let token = format!("@ref:{}", self.counter);
        self.counter += 1;
        self.by_token.insert(token.clone(), node);
        self.by_node.insert(node, token.clone());
        token
    }

    /// Resolve a token (any accepted spelling) back to a live element.
    /// Disconnected elements are treated as absent and their entries dropped.
    pub fn resolve<'a>(&mut self, doc: &'a Html, token: &str) -> Option<ElementRef<'a>> {
        let canonical = parse_ref_token(token)?;
        let node = *self.by_token.get(&canonical)?;
        match connected_element(doc, node) {
            Some(el) => Some(el),
            None => {
                self.by_token.remove(&canonical);
                self.by_node.remove(&node);
                None
            }
        }
    }

    /// Register an explicit token/element pairing, accepting any token
    /// spelling. The counter advances past the token's number so later mints
    /// never collide with it.
    pub fn set(&mut self, token: &str, node: NodeId) {
        let Some(canonical) = parse_ref_token(token) else {
            return;
        };
        if let Some(n) = canonical
            .strip_prefix("@ref:")
            .and_then(|digits| digits.parse::<u32>().ok())
        {
            self.counter = self.counter.max(n + 1);
        }
        self.by_token.insert(canonical.clone(), node);
        self.by_node.insert(node, canonical);
    }

    /// Wipe all entries and reset the counter, as at the start of a snapshot
    /// pass or on navigation.
    pub fn clear(&mut self) {
        self.counter = 0;
        self.by_token.clear();
        self.by_node.clear();
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}

/// An element is live only while its ancestor chain reaches the document
/// root; a detached subtree dead-ends at its own top node.
fn connected_element(doc: &Html, node: NodeId) -> Option<ElementRef<'_>> {
    let node_ref = doc.tree.get(node)?;
    let root = doc.tree.root().id();
    let reaches_root = node_ref.ancestors().any(|a| a.id() == root);
    if !reaches_root {
        return None;
    }
    ElementRef::wrap(node_ref)
}

/// Normalize any accepted ref spelling (`@ref:N`, `eN`, `@eN`, `ref=eN`,
/// `[ref=eN]`) to the canonical `@ref:N`. Returns `None` for anything that is
/// not ref-shaped, such as a CSS selector.
pub fn parse_ref_token(input: &str) -> Option<String> {
    let s = input.trim();
    let s = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s);
    let s = s.strip_prefix("ref=").unwrap_or(s);
    let digits = if let Some(rest) = s.strip_prefix("@ref:") {
        rest
    } else if let Some(rest) = s.strip_prefix("@e") {
        rest
    } else if let Some(rest) = s.strip_prefix('e') {
        rest
    } else {
        return None;
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = digits.parse().ok()?;
    Some(format!("@ref:{n}"))
}

/// Resolve user input that may be a ref token or a CSS selector, mapping each
/// failure to the error kind the command layer needs.
pub fn resolve_selector<'a>(
    doc: &'a Html,
    refs: &mut RefMap,
    input: &str,
) -> Result<ElementRef<'a>, ResolveError> {
    if let Some(token) = parse_ref_token(input) {
        return refs
            .resolve(doc, &token)
            .ok_or(ResolveError::RefExpired(token));
    }

    let selector =
        Selector::parse(input).map_err(|_| ResolveError::InvalidSelector(input.to_string()))?;
    doc.select(&selector)
        .next()
        .ok_or_else(|| ResolveError::ElementNotFound(input.to_string()))
}
