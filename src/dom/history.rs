use std::collections::VecDeque;

use url::Url;

pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// Bounded back/forward session history.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    current: Url,
    back_stack: VecDeque<Url>,
    forward_stack: VecDeque<Url>,
    capacity: usize,
}

impl MemoryHistory {
    pub fn new(current: Url) -> Self {
        Self::with_capacity(current, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(current: Url, capacity: usize) -> Self {
        Self {
            current,
            back_stack: VecDeque::new(),
            forward_stack: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> &Url {
        &self.current
    }

    pub fn push(&mut self, url: Url) {
        let previous = std::mem::replace(&mut self.current, url);
        self.push_back(previous);
        self.forward_stack.clear();
    }

    /// Moves one entry back; the caller is expected to dispatch a pop.
    pub fn back(&mut self) -> Option<&Url> {
        let target = self.back_stack.pop_back()?;
        let previous = std::mem::replace(&mut self.current, target);
        self.push_forward(previous);
        Some(&self.current)
    }

    pub fn forward(&mut self) -> Option<&Url> {
        let target = self.forward_stack.pop_back()?;
        let previous = std::mem::replace(&mut self.current, target);
        self.push_back(previous);
        Some(&self.current)
    }

    pub fn len(&self) -> usize {
        self.back_stack.len() + 1 + self.forward_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn push_back(&mut self, url: Url) {
        if self.back_stack.len() >= self.capacity {
            self.back_stack.pop_front();
        }
        self.back_stack.push_back(url);
    }

    fn push_forward(&mut self, url: Url) {
        if self.forward_stack.len() >= self.capacity {
            self.forward_stack.pop_front();
        }
        self.forward_stack.push_back(url);
    }
}
