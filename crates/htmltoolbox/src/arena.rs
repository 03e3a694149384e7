//! Node storage plus the two relations threaded through it: the tree (`parent`/`body`) and
//! the rendered order (`prev`/`next` over `Text` and `Sep` nodes).
use crate::error::{ToolboxError, ToolboxResult};
use crate::traverse::Walk;
use crate::types::{Node, NodeData, NodeId, Tag};

#[derive(Debug, Default)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn alloc(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(parent, data));
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn try_get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn body(&self, id: NodeId) -> &[NodeId] {
        self.get(id).body()
    }

    pub(crate) fn tag(&self, id: NodeId) -> Option<&Tag> {
        self.get(id).tag()
    }

    pub(crate) fn tag_mut(&mut self, id: NodeId) -> Option<&mut Tag> {
        self.get_mut(id).tag_mut()
    }

    pub(crate) fn value(&self, id: NodeId) -> Option<&str> {
        self.get(id).value()
    }

    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub(crate) fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_text()
    }

    pub(crate) fn is_sep(&self, id: NodeId) -> bool {
        self.get(id).is_sep()
    }

    /// Name of the parent tag, if the parent is a tag.
    pub(crate) fn parent_tag_name(&self, id: NodeId) -> Option<&str> {
        self.parent(id)
            .and_then(|parent| self.tag(parent))
            .map(|tag| tag.name.as_str())
    }

    pub(crate) fn set_value(&mut self, id: NodeId, value: String) {
        if let Some(slot) = self.get_mut(id).value_mut() {
            *slot = value;
        }
    }

    pub(crate) fn position(&self, id: NodeId) -> ToolboxResult<(NodeId, usize)> {
        let parent = self.parent(id).ok_or(ToolboxError::Detached { node: id })?;
        self.body(parent)
            .iter()
            .position(|child| *child == id)
            .map(|index| (parent, index))
            .ok_or(ToolboxError::NodeNotInParent { node: id, parent })
    }

    /// Inserts `children` into `parent`'s body at `at`, adopting them.
    pub(crate) fn insert_children(&mut self, parent: NodeId, at: usize, children: &[NodeId]) {
        for child in children {
            self.get_mut(*child).parent = Some(parent);
        }
        if let Some(body) = self.get_mut(parent).body_mut() {
            let at = at.min(body.len());
            body.splice(at..at, children.iter().copied());
        }
    }

    /// Removes `id` from its parent's body; returns the parent and the index it occupied.
    pub(crate) fn detach(&mut self, id: NodeId) -> ToolboxResult<(NodeId, usize)> {
        let (parent, index) = self.position(id)?;
        if let Some(body) = self.get_mut(parent).body_mut() {
            body.remove(index);
        }
        self.get_mut(id).parent = None;
        Ok((parent, index))
    }

    /// Empties the body of `id`, returning the former children (still pointing at `id`).
    pub(crate) fn take_body(&mut self, id: NodeId) -> Vec<NodeId> {
        self.get_mut(id)
            .body_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub(crate) fn link(&mut self, prev: Option<NodeId>, next: Option<NodeId>) {
        if let Some(prev) = prev {
            self.get_mut(prev).next = next;
        }
        if let Some(next) = next {
            self.get_mut(next).prev = prev;
        }
    }

    pub(crate) fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Renderable nodes of `id` in rendered order (`id` itself if it is renderable).
    pub(crate) fn renderables(&self, id: NodeId) -> Vec<NodeId> {
        let node = self.get(id);
        if node.is_renderable() {
            return vec![id];
        }
        if node.tag().is_some_and(|tag| !tag.is_rendered()) {
            return Vec::new();
        }
        Walk::rendered(self, id)
            .filter(|step| self.get(step.node).is_renderable())
            .map(|step| step.node)
            .collect()
    }

    pub(crate) fn first_renderable(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id);
        if node.is_renderable() {
            return Some(id);
        }
        if node.tag().is_some_and(|tag| !tag.is_rendered()) {
            return None;
        }
        Walk::rendered(self, id)
            .map(|step| step.node)
            .find(|node| self.get(*node).is_renderable())
    }

    pub(crate) fn last_renderable(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id);
        if node.is_renderable() {
            return Some(id);
        }
        if node.tag().is_some_and(|tag| !tag.is_rendered()) {
            return None;
        }
        node.body()
            .iter()
            .rev()
            .find_map(|child| self.last_renderable(*child))
    }

    /// Unthreads every renderable node of `id` from the rendered order.
    pub(crate) fn unlink_rendered(&mut self, id: NodeId) {
        for node in self.renderables(id) {
            let (prev, next) = {
                let n = self.get(node);
                (n.prev, n.next)
            };
            self.link(prev, next);
            let n = self.get_mut(node);
            n.prev = None;
            n.next = None;
        }
    }

    /// Threads the renderable nodes under `roots` between `prev` and `next`.
    pub(crate) fn relink(&mut self, prev: Option<NodeId>, roots: &[NodeId], next: Option<NodeId>) {
        let mut last = prev;
        for root in roots {
            for node in self.renderables(*root) {
                self.link(last, Some(node));
                last = Some(node);
            }
        }
        self.link(last, next);
    }

    /// True if `a` comes no later than `b` in rendered order.
    pub(crate) fn precedes(&self, a: NodeId, b: NodeId) -> bool {
        let limit = self.get(b).str_index;
        let mut current = Some(a);
        while let Some(id) = current {
            if id == b {
                return true;
            }
            if self.get(id).str_index > limit {
                return false;
            }
            current = self.get(id).next;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CloseMarker;

    fn sample() -> (Arena, NodeId, NodeId, NodeId, NodeId) {
        let mut arena = Arena::new();
        let root = arena.alloc(None, NodeData::Document { body: Vec::new() });
        let tag = arena.alloc(Some(root), NodeData::Tag(Tag::new("b", "b", CloseMarker::Tag)));
        let a = arena.alloc(Some(tag), NodeData::Text("a".to_string()));
        let b = arena.alloc(Some(tag), NodeData::Text("b".to_string()));
        arena.insert_children(root, 0, &[tag]);
        arena.insert_children(tag, 0, &[a, b]);
        (arena, root, tag, a, b)
    }

    #[test]
    fn position_reports_detached_and_missing_children() {
        let (mut arena, root, tag, a, _) = sample();
        assert_eq!(arena.position(a), Ok((tag, 0)));
        assert_eq!(arena.position(root), Err(ToolboxError::Detached { node: root }));
        if let Some(t) = arena.tag_mut(tag) {
            t.body.clear();
        }
        assert_eq!(
            arena.position(a),
            Err(ToolboxError::NodeNotInParent { node: a, parent: tag })
        );
    }

    #[test]
    fn relink_threads_renderables_in_tree_order() {
        let (mut arena, root, tag, a, b) = sample();
        arena.relink(Some(root), &[tag], None);
        assert_eq!(arena.get(root).next(), Some(a));
        assert_eq!(arena.get(a).next(), Some(b));
        assert_eq!(arena.get(b).prev(), Some(a));
        assert_eq!(arena.first_renderable(tag), Some(a));
        assert_eq!(arena.last_renderable(tag), Some(b));

        arena.unlink_rendered(a);
        assert_eq!(arena.get(root).next(), Some(b));
        assert_eq!(arena.get(a).next(), None);
    }

    #[test]
    fn detach_clears_parent() {
        let (mut arena, _, tag, a, b) = sample();
        assert_eq!(arena.detach(a), Ok((tag, 0)));
        assert_eq!(arena.body(tag), &[b]);
        assert_eq!(arena.parent(a), None);
        assert!(arena.is_ancestor(tag, b));
        assert!(!arena.is_ancestor(tag, a));
    }
}
