use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

struct NodeCell {
    data: NodeData,
    parent: RefCell<Weak<NodeCell>>,
    children: RefCell<Vec<MemoryNode>>,
}

/// Shared handle to a node of an in-memory document tree.
///
/// Equality is identity: two handles are equal when they point at the same node.
#[derive(Clone)]
pub struct MemoryNode(Rc<NodeCell>);

impl MemoryNode {
    fn new(data: NodeData) -> Self {
        Self(Rc::new(NodeCell {
            data,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    pub fn document() -> Self {
        Self::new(NodeData::Document)
    }

    pub fn element(tag: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self::new(NodeData::Element {
            tag: tag.into().to_ascii_lowercase(),
            attrs,
        })
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeData::Text(content.into()))
    }

    pub fn data(&self) -> &NodeData {
        &self.0.data
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.0.data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match &self.0.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn parent(&self) -> Option<MemoryNode> {
        self.0.parent.borrow().upgrade().map(MemoryNode)
    }

    pub fn children(&self) -> Vec<MemoryNode> {
        self.0.children.borrow().clone()
    }

    /// Moves `child` under `self`, detaching it from any previous parent first.
    pub fn append_child(&self, child: MemoryNode) {
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child);
    }

    pub fn detach(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        parent
            .0
            .children
            .borrow_mut()
            .retain(|sibling| !Rc::ptr_eq(&sibling.0, &self.0));
        *self.0.parent.borrow_mut() = Weak::new();
    }

    /// Descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<MemoryNode> {
        let mut out = Vec::new();
        let mut stack: Vec<MemoryNode> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    pub fn text_content(&self) -> String {
        if let NodeData::Text(content) = &self.0.data {
            return content.clone();
        }
        self.descendants()
            .iter()
            .filter_map(|node| match node.data() {
                NodeData::Text(content) => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MemoryNode {}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.data {
            NodeData::Document => f.write_str("#document"),
            NodeData::Text(content) => write!(f, "#text({content:?})"),
            NodeData::Element { tag, attrs } => {
                write!(f, "<{tag}")?;
                for (key, value) in attrs {
                    if value.is_empty() {
                        write!(f, " {key}")?;
                    } else {
                        write!(f, " {key}={value:?}")?;
                    }
                }
                f.write_str(">")
            }
        }
    }
}
