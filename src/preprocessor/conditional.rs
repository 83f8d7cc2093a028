//! Conditional visibility stack for `#ifdef` / `#ifndef` / `#else` / `#endif`.

/// One visibility flag per open conditional scope.
///
/// The root entry is always `true` and can never be popped, so
/// `depth() - 1` equals the directive nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionStack {
    states: Vec<bool>,
}

impl Default for ConditionStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionStack {
    #[must_use]
    pub fn new() -> Self {
        Self { states: vec![true] }
    }

    /// Whether lines in the current scope reach the output.
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.states.last().copied().unwrap_or(true)
    }

    /// Number of entries, including the root.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.states.len()
    }

    /// Open a scope that is visible when its parent is and `condition` holds.
    pub fn push(&mut self, condition: bool) {
        let parent = self.is_visible();
        self.states.push(parent && condition);
    }

    /// Switch to the `#else` branch. Returns `false` at the root.
    pub fn flip(&mut self) -> bool {
        if self.states.len() <= 1 {
            return false;
        }

        let current = self.states.pop().unwrap_or(false);
        let parent = self.is_visible();
        self.states.push(parent && !current);
        true
    }

    /// Close the current scope. Returns `false` at the root.
    pub fn pop(&mut self) -> bool {
        if self.states.len() <= 1 {
            return false;
        }

        self.states.pop();
        true
    }
}
