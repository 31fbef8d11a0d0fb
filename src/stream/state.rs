//! Per-run mutable stage state.

/// A piece of mutable state scoped to one `(stage instance, pipeline run)`
/// pair: a lazily-built label lookup, a duplicate-detection set, an
/// accumulation buffer.
///
/// Stages keep `ProcessState` fields and clear them in their `reset()`
/// implementation; the pipeline executor resets every component both
/// before and after each run, so the same stage instance can be reused
/// across independent runs without state leaking between them.
#[derive(Debug)]
pub struct ProcessState<T> {
    slot: Option<T>,
}

impl<T> ProcessState<T> {
    /// Creates an unset slot.
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Returns true if the slot holds a value.
    pub fn is_set(&self) -> bool {
        self.slot.is_some()
    }

    /// Returns the value, initializing it on first use.
    pub fn get_or_init(&mut self, init: impl FnOnce() -> T) -> &mut T {
        self.slot.get_or_insert_with(init)
    }

    /// Returns the value if set.
    pub fn get(&self) -> Option<&T> {
        self.slot.as_ref()
    }

    /// Returns the value mutably if set.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.slot.as_mut()
    }

    /// Replaces the value.
    pub fn set(&mut self, value: T) {
        self.slot = Some(value);
    }

    /// Removes and returns the value, leaving the slot unset.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Returns the slot to its initial, unset condition.
    pub fn reset(&mut self) {
        self.slot = None;
    }
}

impl<T> Default for ProcessState<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_initialization() {
        let mut state: ProcessState<Vec<u32>> = ProcessState::new();
        assert!(!state.is_set());
        state.get_or_init(Vec::new).push(1);
        state.get_or_init(Vec::new).push(2);
        assert_eq!(state.get(), Some(&vec![1, 2]));
    }

    #[test]
    fn test_reset_clears_the_slot() {
        let mut state = ProcessState::new();
        state.set(42);
        assert!(state.is_set());
        state.reset();
        assert!(!state.is_set());
        assert_eq!(state.get(), None);
    }

    #[test]
    fn test_take_leaves_unset() {
        let mut state = ProcessState::new();
        state.set("hello");
        assert_eq!(state.take(), Some("hello"));
        assert!(!state.is_set());
    }
}
