use std::cell::RefCell;

use url::Url;

use super::history::{DEFAULT_HISTORY_CAPACITY, MemoryHistory};
use super::markup::{parse_markup, serialize};
use super::node::MemoryNode;
use super::selector::Selector;
use super::{Dom, Session};
use crate::error::{NavError, NavResult};

/// Headless document + session, driven entirely from memory.
pub struct MemoryHost {
    document: MemoryNode,
    title: RefCell<String>,
    history: RefCell<MemoryHistory>,
}

impl MemoryHost {
    pub fn new(address: &str, markup: &str) -> NavResult<Self> {
        Self::with_history_capacity(address, markup, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(address: &str, markup: &str, capacity: usize) -> NavResult<Self> {
        let location =
            Url::parse(address).map_err(|source| NavError::invalid_address(address, source))?;
        let document = parse_markup(markup);
        let title = document
            .descendants()
            .into_iter()
            .find(|node| node.tag() == Some("title"))
            .map(|node| node.text_content())
            .unwrap_or_default();

        Ok(Self {
            document,
            title: RefCell::new(title),
            history: RefCell::new(MemoryHistory::with_capacity(location, capacity)),
        })
    }

    pub fn document(&self) -> &MemoryNode {
        &self.document
    }

    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    /// Steps the session back; returns whether a pop should be dispatched.
    pub fn history_back(&self) -> bool {
        self.history.borrow_mut().back().is_some()
    }

    pub fn history_forward(&self) -> bool {
        self.history.borrow_mut().forward().is_some()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }
}

impl Dom for MemoryHost {
    type Node = MemoryNode;

    fn query_all(&self, selector: &str, scope: Option<&MemoryNode>) -> Vec<MemoryNode> {
        let Some(selector) = Selector::parse(selector) else {
            tracing::warn!(selector, "unsupported selector");
            return Vec::new();
        };
        scope
            .unwrap_or(&self.document)
            .descendants()
            .into_iter()
            .filter(|node| selector.matches(node))
            .collect()
    }

    fn closest(&self, node: &MemoryNode, selector: &str) -> Option<MemoryNode> {
        let selector = Selector::parse(selector)?;
        let mut cursor = Some(node.clone());
        while let Some(candidate) = cursor {
            if selector.matches(&candidate) {
                return Some(candidate);
            }
            cursor = candidate.parent();
        }
        None
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
        node.attribute(name).map(str::to_string)
    }

    fn text_content(&self, node: &MemoryNode) -> String {
        node.text_content()
    }

    fn parse_document(&self, markup: &str) -> MemoryNode {
        parse_markup(markup)
    }

    fn append_child(&self, parent: &MemoryNode, child: MemoryNode) {
        parent.append_child(child);
    }

    fn remove(&self, node: &MemoryNode) {
        node.detach();
    }

    fn set_title(&self, title: &str) {
        *self.title.borrow_mut() = title.to_string();
    }

    fn serialize_document(&self) -> String {
        serialize(&self.document)
    }
}

impl Session for MemoryHost {
    fn location(&self) -> Url {
        self.history.borrow().current().clone()
    }

    fn push_history(&self, url: &Url) {
        self.history.borrow_mut().push(url.clone());
    }
}
