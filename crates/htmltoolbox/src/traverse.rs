//! Restartable depth-first cursor over an arena subtree.
//!
//! Each tag that is descended yields an entry step (`exit == false`) and, after its body, an
//! exit step. Leaves, and tags that are not descended, yield a single step with `exit == true`.
//! The cursor reads bodies live, so callers may splice the container of the last step before
//! asking for the next one (see [`Traversal::resume_at`]).
use crate::arena::Arena;
use crate::types::{NodeData, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub node: NodeId,
    pub container: NodeId,
    pub index: usize,
    pub exit: bool,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    container: NodeId,
    index: usize,
}

#[derive(Clone, Debug)]
pub(crate) struct Traversal {
    frames: Vec<Frame>,
    descend_non_rendered: bool,
}

impl Traversal {
    /// Walks the body of `root`; `root` itself is not reported.
    pub(crate) fn new(root: NodeId) -> Self {
        Self {
            frames: vec![Frame {
                container: root,
                index: 0,
            }],
            descend_non_rendered: true,
        }
    }

    /// Treat comments, declarations, `script` and `style` as leaves.
    pub(crate) fn rendered_only(mut self) -> Self {
        self.descend_non_rendered = false;
        self
    }

    /// Continue the current container at `index` instead of after the last reported leaf.
    pub(crate) fn resume_at(&mut self, index: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.index = index;
        }
    }

    pub(crate) fn next_step(&mut self, arena: &Arena) -> Option<Step> {
        let frame = *self.frames.last()?;
        let body = arena.body(frame.container);
        let Some(&node) = body.get(frame.index) else {
            self.frames.pop();
            let parent = self.frames.last_mut()?;
            let step = Step {
                node: frame.container,
                container: parent.container,
                index: parent.index,
                exit: true,
            };
            parent.index += 1;
            return Some(step);
        };
        let descend = match &arena.get(node).data {
            NodeData::Tag(tag) => self.descend_non_rendered || tag.is_rendered(),
            NodeData::Document { .. } => true,
            NodeData::Text(_) | NodeData::Sep(_) => false,
        };
        if descend {
            self.frames.push(Frame {
                container: node,
                index: 0,
            });
            return Some(Step {
                node,
                container: frame.container,
                index: frame.index,
                exit: false,
            });
        }
        if let Some(top) = self.frames.last_mut() {
            top.index += 1;
        }
        Some(Step {
            node,
            container: frame.container,
            index: frame.index,
            exit: true,
        })
    }
}

/// Read-only iterator adapter over a [`Traversal`].
pub struct Walk<'a> {
    arena: &'a Arena,
    cursor: Traversal,
}

impl<'a> Walk<'a> {
    pub(crate) fn all(arena: &'a Arena, root: NodeId) -> Self {
        Self {
            arena,
            cursor: Traversal::new(root),
        }
    }

    pub(crate) fn rendered(arena: &'a Arena, root: NodeId) -> Self {
        Self {
            arena,
            cursor: Traversal::new(root).rendered_only(),
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        self.cursor.next_step(self.arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CloseMarker, Tag};

    fn tree() -> (Arena, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut arena = Arena::new();
        let root = arena.alloc(None, NodeData::Document { body: Vec::new() });
        let p = arena.alloc(None, NodeData::Tag(Tag::new("p", "p", CloseMarker::Tag)));
        let text = arena.alloc(None, NodeData::Text("hi".to_string()));
        let script = arena.alloc(None, NodeData::Tag(Tag::new("script", "script", CloseMarker::Tag)));
        let code = arena.alloc(None, NodeData::Text("x".to_string()));
        arena.insert_children(root, 0, &[p, script]);
        arena.insert_children(p, 0, &[text]);
        arena.insert_children(script, 0, &[code]);
        (arena, root, p, text, script, code)
    }

    #[test]
    fn walk_reports_entry_and_exit_steps() {
        let (arena, root, p, text, script, code) = tree();
        let steps: Vec<(NodeId, bool)> = Walk::all(&arena, root).map(|s| (s.node, s.exit)).collect();
        assert_eq!(
            steps,
            vec![
                (p, false),
                (text, true),
                (p, true),
                (script, false),
                (code, true),
                (script, true),
            ]
        );
    }

    #[test]
    fn rendered_walk_treats_script_as_leaf() {
        let (arena, root, p, text, script, _) = tree();
        let steps: Vec<Step> = Walk::rendered(&arena, root).collect();
        assert_eq!(steps.len(), 4);
        assert_eq!(
            steps[3],
            Step {
                node: script,
                container: root,
                index: 1,
                exit: true
            }
        );
        assert_eq!(steps[1].node, text);
        assert_eq!(steps[1].container, p);
    }

    #[test]
    fn resume_at_skips_spliced_siblings() {
        let (mut arena, root, p, text, _, _) = tree();
        let extra = arena.alloc(None, NodeData::Text("!".to_string()));
        let mut cursor = Traversal::new(root);
        assert_eq!(cursor.next_step(&arena).map(|s| s.node), Some(p));
        let leaf = cursor.next_step(&arena).map(|s| s.node);
        assert_eq!(leaf, Some(text));
        arena.insert_children(p, 1, &[extra]);
        cursor.resume_at(2);
        let exit = cursor.next_step(&arena).expect("exit step");
        assert_eq!((exit.node, exit.exit), (p, true));
    }
}
