//! Capability interfaces over the host document and session history, plus an
//! in-memory implementation used by the CLI and the test suites.

mod history;
mod markup;
mod memory;
mod node;
mod selector;

use std::fmt;

use url::Url;

pub use history::MemoryHistory;
pub use markup::{parse_markup, serialize};
pub use memory::MemoryHost;
pub use node::{MemoryNode, NodeData};
pub use selector::Selector;

/// Query and mutation primitives over a document tree.
///
/// Selectors are compound: an optional tag name followed by `[attr]` presence
/// tests, e.g. `a[href]` or `[a-page]`. A `scope` of `None` means the live
/// document.
pub trait Dom {
    type Node: Clone + fmt::Debug + 'static;

    fn query_all(&self, selector: &str, scope: Option<&Self::Node>) -> Vec<Self::Node>;

    fn query(&self, selector: &str, scope: Option<&Self::Node>) -> Option<Self::Node> {
        self.query_all(selector, scope).into_iter().next()
    }

    /// The node itself or its nearest ancestor matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn text_content(&self, node: &Self::Node) -> String;

    /// Parses a detached document; its nodes can later be appended to the live tree.
    fn parse_document(&self, markup: &str) -> Self::Node;

    fn append_child(&self, parent: &Self::Node, child: Self::Node);

    fn remove(&self, node: &Self::Node);

    fn set_title(&self, title: &str);

    fn serialize_document(&self) -> String;
}

/// Session location and history stack.
pub trait Session {
    fn location(&self) -> Url;

    fn push_history(&self, url: &Url);
}

pub trait Host: Dom + Session + 'static {}

impl<T> Host for T where T: Dom + Session + 'static {}
