//! Draw-call profiling tree.
//!
//! Grounded on the original's per-stage timing accumulators (clipping,
//! compacting, viewport/project transform, tile dispatch, rasterization),
//! generalized per this core's redesign note into an explicit
//! `(name, inclusive_ns, exclusive_ns, children)` tree with a visitor,
//! rather than the original's `property_tree`/`any`-typed profiling sink.

use std::time::{Duration, Instant};

pub struct ProfileNode {
    pub name: &'static str,
    pub inclusive: Duration,
    pub children: Vec<ProfileNode>,
}

impl ProfileNode {
    pub fn exclusive(&self) -> Duration {
        let children_total: Duration = self.children.iter().map(|c| c.inclusive).sum();
        self.inclusive.saturating_sub(children_total)
    }

    /// Depth-first visit of this node and all descendants, passing each
    /// node's depth so a visitor can render indentation.
    pub fn visit(&self, depth: usize, f: &mut dyn FnMut(&ProfileNode, usize)) {
        f(self, depth);
        for child in &self.children {
            child.visit(depth + 1, f);
        }
    }
}

/// Accumulates a stack of in-progress stages for a single draw call; call
/// [`Self::enter`]/scope-drop (via [`StageGuard`]) to time a stage, then
/// [`Self::finish`] to get the completed tree.
pub struct Profiler {
    stack: Vec<(&'static str, Instant, Vec<ProfileNode>)>,
    root_children: Vec<ProfileNode>,
}

impl Default for Profiler {
    fn default() -> Self {
        Self { stack: Vec::new(), root_children: Vec::new() }
    }
}

impl Profiler {
    pub fn enter(&mut self, name: &'static str) {
        self.stack.push((name, Instant::now(), Vec::new()));
    }

    pub fn exit(&mut self) {
        let (name, start, children) = self.stack.pop().expect("profiler exit without matching enter");
        let node = ProfileNode { name, inclusive: start.elapsed(), children };
        match self.stack.last_mut() {
            Some((_, _, siblings)) => siblings.push(node),
            None => self.root_children.push(node),
        }
    }

    pub fn finish(self) -> Vec<ProfileNode> {
        debug_assert!(self.stack.is_empty(), "profiler finished with unclosed stages");
        self.root_children
    }
}

/// RAII helper so a stage's `exit()` happens even if the caller returns
/// early or panics mid-stage.
pub struct StageGuard<'a> {
    profiler: &'a mut Profiler,
}

impl Profiler {
    pub fn stage(&mut self, name: &'static str) -> StageGuard<'_> {
        self.enter(name);
        StageGuard { profiler: self }
    }
}

impl Drop for StageGuard<'_> {
    fn drop(&mut self) {
        self.profiler.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_stages_build_a_tree() {
        let mut profiler = Profiler::default();
        {
            let _outer = profiler.stage("draw");
            {
                let _inner = profiler.stage("bin");
            }
        }
        let tree = profiler.finish();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "draw");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].name, "bin");
    }
}
