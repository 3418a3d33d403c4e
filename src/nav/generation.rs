/// Monotonic per-navigation token source.
///
/// Every `go` takes a fresh generation; a phase that resumes after a
/// suspension point only proceeds while its generation is still current.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GenerationTracker {
    current: u64,
}

impl GenerationTracker {
    pub(crate) fn advance(&mut self) -> u64 {
        self.current = self.current.saturating_add(1);
        self.current
    }

    pub(crate) fn current(&self) -> u64 {
        self.current
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.current == generation
    }
}

#[cfg(test)]
mod tests {
    use super::GenerationTracker;

    #[test]
    fn advance_invalidates_previous_generation() {
        let mut tracker = GenerationTracker::default();
        assert_eq!(tracker.current(), 0);

        let first = tracker.advance();
        assert!(tracker.is_current(first));

        let second = tracker.advance();
        assert_eq!(second, first + 1);
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }
}
