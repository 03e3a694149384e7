//! Replay of queued edits against the arena.
//!
//! Every splice updates both relations: the tree (`parent`/`body`) and the rendered order
//! (`prev`/`next`). Offsets (`str_index`) of nodes touched here are only approximate until
//! the toolbox re-flattens after the whole queue has been replayed.
//!
//! Insertion points are tree slots `(container, index)`. A slot never lands inside a
//! line-break element, and never between a tag and its own boundary separators.
use crate::arena::Arena;
use crate::config::ToolboxConfig;
use crate::edit::{Anchor, Edit, Target};
use crate::entities::{decode_entities, encode_attribute};
use crate::error::{ToolboxError, ToolboxResult};
use crate::flatten::{Anchors, flatten_patch};
use crate::locate::clamp_offset;
use crate::tree_builder::{alloc_segments, decode_options, line_break_body, parse};
use crate::types::{AttrValue, Attribute, CloseMarker, NodeData, NodeId, Quote, Tag};

type Slot = (NodeId, usize);

/// Rendered neighbours of a cut or insertion point.
#[derive(Clone, Copy, Debug)]
struct Gap {
    before: Option<NodeId>,
    after: Option<NodeId>,
}

#[derive(Debug)]
struct Removal {
    gap: Gap,
    /// Containers that may have been left empty; pruned once the edit is done.
    prune: Vec<NodeId>,
}

pub(crate) struct Editor<'a> {
    arena: &'a mut Arena,
    root: NodeId,
    config: &'a ToolboxConfig,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(arena: &'a mut Arena, root: NodeId, config: &'a ToolboxConfig) -> Self {
        Self {
            arena,
            root,
            config,
        }
    }

    pub(crate) fn apply(&mut self, edit: Edit) -> ToolboxResult<()> {
        log::trace!(target: "htmltoolbox.edit", "{} {:?}", edit.label(), edit);
        match edit {
            Edit::Remove { target } => self.remove(target),
            Edit::Replace {
                target,
                html,
                anchor,
            } => self.replace(target, &html, anchor),
            Edit::Insert {
                target,
                html,
                anchor,
            } => self.insert(target, &html, anchor),
            Edit::InsertAt { node, html, anchor } => self.insert_at(node, &html, anchor),
            Edit::Wrap { target, envelope } => self.wrap(target, &envelope),
            Edit::SetTag { node, tag } => self.set_tag(node, &tag),
            Edit::SetAttribute { node, name, value } => self.set_attribute(node, &name, &value),
        }
    }

    // ----- target checks -------------------------------------------------------------

    fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.arena.parent(id).is_some()
    }

    /// Text targets must still be attached text; anything else was consumed by an earlier
    /// edit in the same flush.
    fn usable(&self, target: Target, op: &str) -> bool {
        let ok = match target {
            Target::Text {
                start_node,
                end_node,
                ..
            } => [start_node, end_node]
                .iter()
                .all(|id| self.arena.is_text(*id) && self.is_attached(*id)),
            Target::Element(id) => self.arena.tag(id).is_some() && self.is_attached(id),
        };
        if !ok {
            log::warn!(target: "htmltoolbox.edit", "{op}: target {target:?} no longer usable; skipped");
        }
        ok
    }

    fn parent_is_line_break(&self, id: NodeId) -> bool {
        self.arena
            .parent_tag_name(id)
            .is_some_and(|name| self.config.is_line_break(name))
    }

    fn renders_value_of(&self, id: NodeId) -> bool {
        self.arena
            .tag(id)
            .is_some_and(|tag| self.config.renders_value(&tag.name) && !tag.is_hidden_input())
    }

    /// Line-break and rendered `input` elements are edited as a whole.
    fn atomic_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.arena.parent(id)?;
        let name = self.arena.tag(parent)?.name.as_str();
        (self.config.is_line_break(name) || self.renders_value_of(parent)).then_some(parent)
    }

    fn in_rendered_context(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.arena.tag(node).is_some_and(|tag| !tag.is_rendered()) {
                return false;
            }
            current = self.arena.parent(node);
        }
        true
    }

    // ----- offsets and splitting ---------------------------------------------------------

    /// Translates a match offset into the node's current value.
    fn local_offset(&self, id: NodeId, offset: usize) -> usize {
        let node = self.arena.get(id);
        let value = node.value().unwrap_or_default();
        clamp_offset(value, offset.saturating_sub(node.mod_offset))
    }

    /// Moves the part of `id` before `offset` into a new node inserted just before it.
    ///
    /// `id` keeps the suffix and records how much was cut from its front, so offsets of
    /// later queued matches on the same node stay valid.
    fn split_before(&mut self, id: NodeId, offset: usize) -> ToolboxResult<NodeId> {
        let local = self.local_offset(id, offset);
        let (parent, index) = self.arena.position(id)?;
        let (head, tail) = {
            let value = self.arena.value(id).unwrap_or_default();
            (value[..local].to_string(), value[local..].to_string())
        };
        let prefix = self.arena.alloc(Some(parent), NodeData::Text(head));
        self.arena.insert_children(parent, index, &[prefix]);
        self.arena.set_value(id, tail);

        let (prev, str_index) = {
            let node = self.arena.get_mut(id);
            let str_index = node.str_index;
            node.mod_offset += local;
            node.str_index += local;
            (node.prev, str_index)
        };
        self.arena.get_mut(prefix).str_index = str_index;
        self.arena.link(prev, Some(prefix));
        self.arena.link(Some(prefix), Some(id));
        Ok(prefix)
    }

    /// Drops the first `len` bytes of the current value of `id`.
    fn cut_front(&mut self, id: NodeId, len: usize) {
        let tail = {
            let value = self.arena.value(id).unwrap_or_default();
            value[clamp_offset(value, len)..].to_string()
        };
        let cut = self.arena.value(id).map_or(0, str::len) - tail.len();
        self.arena.set_value(id, tail);
        let node = self.arena.get_mut(id);
        node.mod_offset += cut;
        node.str_index += cut;
    }

    fn truncate(&mut self, id: NodeId, len: usize) {
        let head = {
            let value = self.arena.value(id).unwrap_or_default();
            value[..clamp_offset(value, len)].to_string()
        };
        self.arena.set_value(id, head);
    }

    /// Gap at a single point; line-break elements are never split.
    fn point_gap(&mut self, id: NodeId, offset: usize) -> ToolboxResult<Gap> {
        if self.parent_is_line_break(id) {
            let Some(tag) = self.arena.parent(id) else {
                return Err(ToolboxError::Detached { node: id });
            };
            return Ok(if self.local_offset(id, offset) == 0 {
                let first = self.arena.first_renderable(tag);
                Gap {
                    before: first.and_then(|n| self.arena.get(n).prev),
                    after: first,
                }
            } else {
                let last = self.arena.last_renderable(tag);
                Gap {
                    before: last,
                    after: last.and_then(|n| self.arena.get(n).next),
                }
            });
        }
        let prefix = self.split_before(id, offset)?;
        Ok(Gap {
            before: Some(prefix),
            after: Some(id),
        })
    }

    // ----- slots -----------------------------------------------------------------------

    /// Slot right after `id` in the tree.
    fn slot_after(&self, id: NodeId) -> ToolboxResult<Slot> {
        let mut node = id;
        loop {
            if self.arena.get(node).parent.is_none() {
                return Ok((node, 0));
            }
            let (parent, index) = self.arena.position(node)?;
            let closing = self.arena.is_sep(node) && index + 1 == self.arena.body(parent).len();
            if closing || self.parent_is_line_break(node) {
                node = parent;
                continue;
            }
            return Ok((parent, index + 1));
        }
    }

    /// Slot right before `id` in the tree.
    fn slot_before(&self, id: NodeId) -> ToolboxResult<Slot> {
        let mut node = id;
        loop {
            if self.arena.get(node).parent.is_none() {
                return Ok((node, self.arena.body(node).len()));
            }
            let (parent, index) = self.arena.position(node)?;
            let opening = self.arena.is_sep(node) && index == 0;
            if opening || self.parent_is_line_break(node) {
                node = parent;
                continue;
            }
            return Ok((parent, index));
        }
    }

    fn gap_slot(&self, gap: Gap, anchor: Anchor) -> ToolboxResult<Slot> {
        match (anchor, gap.before, gap.after) {
            (Anchor::End, _, Some(after)) => self.slot_before(after),
            (_, Some(before), _) => self.slot_after(before),
            (_, None, Some(after)) => self.slot_before(after),
            (_, None, None) => Ok((self.root, self.arena.body(self.root).len())),
        }
    }

    /// Last renderable node before `slot` in rendered order; the document root when the
    /// slot is at the very start.
    fn renderable_before(&self, (container, index): Slot) -> Option<NodeId> {
        let mut container = container;
        let mut index = index;
        loop {
            let body = self.arena.body(container);
            let found = body[..index.min(body.len())]
                .iter()
                .rev()
                .find_map(|child| self.arena.last_renderable(*child));
            if found.is_some() {
                return found;
            }
            if self.arena.parent(container).is_none() {
                return Some(container);
            }
            (container, index) = self.arena.position(container).ok()?;
        }
    }

    fn renderable_after(&self, (container, index): Slot) -> Option<NodeId> {
        let mut container = container;
        let mut index = index;
        loop {
            let body = self.arena.body(container);
            let found = body[index.min(body.len())..]
                .iter()
                .find_map(|child| self.arena.first_renderable(*child));
            if found.is_some() {
                return found;
            }
            self.arena.parent(container)?;
            let (parent, at) = self.arena.position(container).ok()?;
            container = parent;
            index = at + 1;
        }
    }

    // ----- deletion --------------------------------------------------------------------

    fn delete(&mut self, id: NodeId) -> ToolboxResult<NodeId> {
        self.arena.unlink_rendered(id);
        let (parent, _) = self.arena.detach(id)?;
        Ok(parent)
    }

    fn is_empty_container(&self, id: NodeId) -> bool {
        let Some(tag) = self.arena.tag(id) else {
            return false;
        };
        if !tag.is_rendered() {
            return false;
        }
        let body = &tag.body;
        if self.config.delete_empty {
            body.is_empty() || (body.len() == 2 && body.iter().all(|c| self.arena.is_sep(*c)))
        } else {
            self.config.is_line_break(&tag.name) && !body.iter().any(|c| self.arena.is_text(*c))
        }
    }

    /// True when `id` is the only non-separator child of a prunable element.
    fn is_sole_content(&self, id: NodeId) -> bool {
        if !self.config.delete_empty || self.atomic_parent(id).is_some() {
            return false;
        }
        let Some(parent) = self.arena.parent(id) else {
            return false;
        };
        self.arena.tag(parent).is_some()
            && self
                .arena
                .body(parent)
                .iter()
                .all(|c| *c == id || self.arena.is_sep(*c))
    }

    /// Removes emptied containers, walking upwards; the document root is never removed.
    fn prune(&mut self, candidates: &[NodeId]) -> ToolboxResult<()> {
        for &candidate in candidates {
            let mut current = candidate;
            while self.arena.parent(current).is_some() && self.is_empty_container(current) {
                log::trace!(target: "htmltoolbox.edit", "pruning empty {current}");
                current = self.delete(current)?;
            }
        }
        Ok(())
    }

    fn remove_text(
        &mut self,
        start: NodeId,
        start_offset: usize,
        end: NodeId,
        end_offset: usize,
    ) -> ToolboxResult<Removal> {
        if start == end {
            let local_start = self.local_offset(start, start_offset);
            let local_end = self.local_offset(end, end_offset).max(local_start);
            if self.parent_is_line_break(start) {
                if local_start == local_end {
                    let gap = self.point_gap(start, start_offset)?;
                    return Ok(Removal {
                        gap,
                        prune: Vec::new(),
                    });
                }
                let gap = Gap {
                    before: self.arena.get(start).prev,
                    after: self.arena.get(start).next,
                };
                let parent = self.delete(start)?;
                return Ok(Removal {
                    gap,
                    prune: vec![parent],
                });
            }
            let prefix = self.split_before(start, start_offset)?;
            self.cut_front(start, local_end - local_start);
            return Ok(Removal {
                gap: Gap {
                    before: Some(prefix),
                    after: Some(start),
                },
                prune: Vec::new(),
            });
        }

        let local_start = self.local_offset(start, start_offset);
        let local_end = self.local_offset(end, end_offset);
        let mut between = Vec::new();
        let mut current = self.arena.get(start).next;
        while let Some(id) = current.filter(|id| *id != end) {
            between.push(id);
            current = self.arena.get(id).next;
        }
        self.truncate(start, local_start);
        self.cut_front(end, local_end);

        let mut prune = Vec::new();
        for id in between {
            if let Some(parent) = self.arena.parent(id) {
                prune.push(parent);
            }
            if self.arena.is_text(id) {
                self.delete(id)?;
            }
        }
        let mut gap = Gap {
            before: Some(start),
            after: Some(end),
        };
        for (id, is_start) in [(start, true), (end, false)] {
            let emptied = self.arena.value(id).is_some_and(str::is_empty);
            if emptied && (self.parent_is_line_break(id) || self.is_sole_content(id)) {
                if is_start {
                    gap.before = self.arena.get(id).prev;
                } else {
                    gap.after = self.arena.get(id).next;
                }
                prune.push(self.delete(id)?);
            }
        }
        Ok(Removal { gap, prune })
    }

    fn remove_element(&mut self, id: NodeId) -> ToolboxResult<()> {
        let parent = self.delete(id)?;
        self.prune(&[parent])
    }

    // ----- operations ------------------------------------------------------------------

    fn remove(&mut self, target: Target) -> ToolboxResult<()> {
        if !self.usable(target, "remove") {
            return Ok(());
        }
        match target {
            Target::Element(id) => self.remove_element(id),
            Target::Text {
                start_node,
                start_offset,
                end_node,
                end_offset,
            } => {
                let removal = self.remove_text(start_node, start_offset, end_node, end_offset)?;
                self.prune(&removal.prune)
            }
        }
    }

    fn replace(&mut self, target: Target, html: &str, anchor: Anchor) -> ToolboxResult<()> {
        if !self.usable(target, "replace") {
            return Ok(());
        }
        match target {
            Target::Element(id) => {
                let slot = self.slot_before(id)?;
                self.insert_fragment(slot, html)?;
                self.remove_element(id)
            }
            Target::Text {
                start_node,
                start_offset,
                end_node,
                end_offset,
            } => {
                let removal = self.remove_text(start_node, start_offset, end_node, end_offset)?;
                let slot = self.gap_slot(removal.gap, anchor)?;
                self.insert_fragment(slot, html)?;
                self.prune(&removal.prune)
            }
        }
    }

    fn insert(&mut self, target: Target, html: &str, anchor: Anchor) -> ToolboxResult<()> {
        if !self.usable(target, "insert") {
            return Ok(());
        }
        let slot = match target {
            Target::Element(id) => self.anchored_slot(id, anchor)?,
            Target::Text {
                start_node,
                start_offset,
                end_node,
                end_offset,
            } => {
                let gap = match anchor {
                    Anchor::Begin => self.point_gap(start_node, start_offset)?,
                    Anchor::End => self.point_gap(end_node, end_offset)?,
                };
                self.gap_slot(gap, anchor)?
            }
        };
        self.insert_fragment(slot, html).map(|_| ())
    }

    fn anchored_slot(&self, id: NodeId, anchor: Anchor) -> ToolboxResult<Slot> {
        match anchor {
            Anchor::Begin => self.slot_after(id),
            Anchor::End => self.slot_before(id),
        }
    }

    fn insert_at(&mut self, node: NodeId, html: &str, anchor: Anchor) -> ToolboxResult<()> {
        if !self.is_attached(node) {
            log::warn!(target: "htmltoolbox.edit", "insert_at: {node} is detached; skipped");
            return Ok(());
        }
        let slot = self.anchored_slot(node, anchor)?;
        self.insert_fragment(slot, html).map(|_| ())
    }

    /// Parses `html` and splices its top-level nodes in at `slot`.
    fn insert_fragment(&mut self, slot: Slot, html: &str) -> ToolboxResult<Vec<NodeId>> {
        let (parent, at) = slot;
        let at = at.min(self.arena.body(parent).len());
        if self.renders_value_of(parent) {
            return Ok(self.fold_into_value(parent, at, html));
        }
        let anchors = Anchors {
            prev: self.renderable_before((parent, at)),
            next: self.renderable_after((parent, at)),
        };
        let fragment = parse(self.arena, html, self.config);
        let flat = flatten_patch(self.arena, fragment, anchors, false);
        let children = self.arena.take_body(fragment);
        self.arena.insert_children(parent, at, &children);
        if self.in_rendered_context(parent) {
            if let Some(first) = flat.first {
                self.arena.link(anchors.prev, Some(first));
            }
            if let Some(last) = flat.last {
                self.arena.link(Some(last), anchors.next);
            }
        }
        log::trace!(
            target: "htmltoolbox.edit",
            "inserted {} node(s) into {parent} at {at}",
            children.len()
        );
        Ok(children)
    }

    /// Text inserted inside a rendered `input` becomes part of its value.
    fn fold_into_value(&mut self, input: NodeId, at: usize, html: &str) -> Vec<NodeId> {
        let len = self.arena.body(input).len();
        let at = at.clamp(1, len.saturating_sub(1).max(1));
        let prev = self.renderable_before((input, at));
        let next = self.renderable_after((input, at));
        let text = decode_entities(html, decode_options(self.config));
        let segments = alloc_segments(self.arena, input, &text);
        self.arena.insert_children(input, at, &segments);
        self.arena.relink(prev, &segments, next);
        segments
    }

    fn wrap(&mut self, target: Target, envelope: &str) -> ToolboxResult<()> {
        if !self.usable(target, "wrap") {
            return Ok(());
        }
        let (start_node, start_offset, end_node, end_offset) = match target {
            Target::Element(id) => return self.wrap_run(&[id], envelope, false),
            Target::Text {
                start_node,
                start_offset,
                end_node,
                end_offset,
            } => (start_node, start_offset, end_node, end_offset),
        };

        if start_node == end_node
            && self.local_offset(start_node, start_offset) >= self.local_offset(end_node, end_offset)
        {
            log::trace!(target: "htmltoolbox.edit", "wrap: empty span at {start_node}; skipped");
            return Ok(());
        }
        let mut start = start_node;
        let mut end = end_node;
        if self.atomic_parent(start).is_none() && self.local_offset(start, start_offset) > 0 {
            self.split_before(start, start_offset)?;
        }
        if self.atomic_parent(end).is_none() {
            let local = self.local_offset(end, end_offset);
            if local < self.arena.value(end).map_or(0, str::len) {
                let piece = self.split_before(end, end_offset)?;
                if end == start {
                    start = piece;
                }
                end = piece;
            }
        }

        let units = self.wrap_units(start, end)?;
        let mut runs: Vec<Vec<NodeId>> = Vec::new();
        for unit in units {
            let parent = self.arena.parent(unit);
            match runs.last_mut() {
                Some(run) if self.arena.parent(run[0]) == parent => run.push(unit),
                _ => runs.push(vec![unit]),
            }
        }
        for run in &runs {
            self.wrap_run(run, envelope, true)?;
        }
        Ok(())
    }

    /// Outermost nodes covering `start..=end` in rendered order.
    ///
    /// A tag whose opening separator is reached and that does not contain `end` is taken
    /// whole; atomic elements are taken whole; closing separators are skipped.
    fn wrap_units(&self, start: NodeId, end: NodeId) -> ToolboxResult<Vec<NodeId>> {
        let mut units: Vec<NodeId> = Vec::new();
        let mut current = Some(start);
        while let Some(id) = current {
            let mut unit = None;
            let mut resume = id;
            if self.arena.is_sep(id) {
                let (parent, index) = self.arena.position(id)?;
                if index == 0 && !self.arena.is_ancestor(parent, end) {
                    unit = Some(parent);
                    resume = self.arena.last_renderable(parent).unwrap_or(id);
                }
            } else if let Some(parent) = self.atomic_parent(id) {
                unit = Some(parent);
                resume = self.arena.last_renderable(parent).unwrap_or(id);
            } else {
                unit = Some(id);
            }
            if let Some(unit) = unit {
                if units.last() != Some(&unit) {
                    units.push(unit);
                }
            }
            let done = id == end
                || resume == end
                || unit.is_some_and(|u| u == end || self.arena.is_ancestor(u, end));
            if done {
                break;
            }
            current = self.arena.get(resume).next;
        }
        Ok(units)
    }

    /// Moves the sibling run `first..=last` of `run` into the envelope's wrap site.
    fn wrap_run(&mut self, run: &[NodeId], envelope: &str, collapse: bool) -> ToolboxResult<()> {
        let (Some(&first), Some(&last)) = (run.first(), run.last()) else {
            return Ok(());
        };
        let (mut container, mut start) = self.arena.position(first)?;
        let (_, end) = self.arena.position(last)?;
        let mut members: Vec<NodeId> = self.arena.body(container)[start..=end.max(start)].to_vec();

        if collapse && self.covers_content(container, &members) {
            log::trace!(target: "htmltoolbox.edit", "wrap run covers {container}; wrapping it whole");
            members = vec![container];
            (container, start) = self.arena.position(container)?;
        }

        let anchors = Anchors {
            prev: self.renderable_before((container, start)),
            next: self.renderable_after((container, start + members.len())),
        };
        let fragment = parse(self.arena, envelope, self.config);
        let flat = flatten_patch(self.arena, fragment, anchors, true);
        let &[site] = flat.wrap_sites.as_slice() else {
            return Err(ToolboxError::InvalidEnvelope {
                placeholders: flat.wrap_sites.len(),
            });
        };

        if let Some(body) = self.arena.get_mut(container).body_mut() {
            body.drain(start..start + members.len());
        }
        if let Some(body) = self.arena.get_mut(site.container).body_mut() {
            body.splice(site.index..=site.index, members.iter().copied());
        }
        for member in &members {
            self.arena.get_mut(*member).parent = Some(site.container);
        }
        self.arena.get_mut(site.node).parent = None;

        let children = self.arena.take_body(fragment);
        self.arena.insert_children(container, start, &children);
        self.arena.relink(anchors.prev, &children, anchors.next);
        Ok(())
    }

    /// True if `members` hold all rendered content of the tag `container`.
    fn covers_content(&self, container: NodeId, members: &[NodeId]) -> bool {
        let Some(tag) = self.arena.tag(container) else {
            return false;
        };
        if !tag.is_rendered() {
            return false;
        }
        let content = |ids: &[NodeId]| -> Vec<NodeId> {
            ids.iter()
                .copied()
                .filter(|id| {
                    !self.arena.is_sep(*id) && self.arena.value(*id).is_none_or(|v| !v.is_empty())
                })
                .collect()
        };
        let all = content(&tag.body);
        !all.is_empty() && all == content(members)
    }

    fn set_tag(&mut self, node: NodeId, tag: &str) -> ToolboxResult<()> {
        if self.arena.parent(node).is_none() {
            log::warn!(target: "htmltoolbox.edit", "set_tag: {node} is detached; skipped");
            return Ok(());
        }
        let name = tag.to_ascii_lowercase();
        if name.is_empty() || name.starts_with('!') {
            log::warn!(target: "htmltoolbox.edit", "set_tag: refusing tag name {tag:?}");
            return Ok(());
        }
        let is_text = self.arena.is_text(node);
        let is_element = self.arena.tag(node).is_some_and(Tag::is_rendered);
        if is_text {
            self.retag_text(node, &name, tag)
        } else if is_element {
            self.retag_element(node, &name, tag)
        } else {
            log::trace!(target: "htmltoolbox.edit", "set_tag: {node} cannot be retagged");
            Ok(())
        }
    }

    fn retag_text(&mut self, node: NodeId, name: &str, raw_name: &str) -> ToolboxResult<()> {
        if self.atomic_parent(node).is_some() {
            log::warn!(target: "htmltoolbox.edit", "set_tag: text {node} belongs to an atomic element");
            return Ok(());
        }
        let (parent, index) = self.arena.position(node)?;
        let (prev, next) = {
            let n = self.arena.get(node);
            (n.prev, n.next)
        };
        let close = if self.config.is_no_close(name) {
            CloseMarker::None
        } else {
            CloseMarker::Tag
        };
        let id = self
            .arena
            .alloc(Some(parent), NodeData::Tag(Tag::new(name, raw_name, close)));
        let separator = self.config.separator_for(name).to_string();
        let body = if self.config.is_line_break(name) {
            let n = self.arena.get_mut(node);
            n.parent = None;
            n.prev = None;
            n.next = None;
            line_break_body(self.arena, id, &separator)
        } else {
            let open = self.arena.alloc(Some(id), NodeData::Sep(separator.clone()));
            let close = self.arena.alloc(Some(id), NodeData::Sep(separator));
            vec![open, node, close]
        };
        if let Some(children) = self.arena.get_mut(parent).body_mut() {
            children[index] = id;
        }
        self.arena.insert_children(id, 0, &body);
        self.arena.relink(prev, &[id], next);
        Ok(())
    }

    fn retag_element(&mut self, node: NodeId, name: &str, raw_name: &str) -> ToolboxResult<()> {
        let prev = self
            .arena
            .first_renderable(node)
            .and_then(|first| self.arena.get(first).prev);
        let next = self
            .arena
            .last_renderable(node)
            .and_then(|last| self.arena.get(last).next);
        let old_name = self.arena.tag(node).map(|t| t.name.clone()).unwrap_or_default();
        let separator = self.config.separator_for(name).to_string();

        if self.config.is_line_break(name) {
            self.arena.unlink_rendered(node);
            for child in self.arena.take_body(node) {
                self.arena.get_mut(child).parent = None;
            }
            let body = line_break_body(self.arena, node, &separator);
            self.arena.insert_children(node, 0, &body);
            self.rename(node, name, raw_name, CloseMarker::None);
            self.arena.relink(prev, &[node], next);
            return Ok(());
        }

        let leaving_input = self.renders_value_of(node) && name != old_name;
        if self.config.is_line_break(&old_name) || leaving_input {
            let texts: Vec<NodeId> = self
                .arena
                .body(node)
                .iter()
                .copied()
                .filter(|c| self.arena.is_text(*c))
                .collect();
            for text in texts {
                self.delete(text)?;
            }
        }
        let close = if self.config.is_no_close(name) {
            CloseMarker::None
        } else {
            CloseMarker::Tag
        };
        self.rename(node, name, raw_name, close);
        let body = self.arena.body(node).to_vec();
        for sep in [body.first(), body.last()].into_iter().flatten() {
            if self.arena.is_sep(*sep) {
                self.arena.set_value(*sep, separator.clone());
            }
        }
        Ok(())
    }

    fn rename(&mut self, node: NodeId, name: &str, raw_name: &str, close: CloseMarker) {
        if let Some(tag) = self.arena.tag_mut(node) {
            tag.name = name.to_string();
            tag.raw_name = raw_name.to_string();
            tag.close = close;
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> ToolboxResult<()> {
        let valid = self
            .arena
            .tag(node)
            .is_some_and(|tag| !tag.name.is_empty() && !tag.name.starts_with('!'));
        if !valid || !self.is_attached(node) {
            log::trace!(target: "htmltoolbox.edit", "set_attribute: {node} is not an element");
            return Ok(());
        }
        let name = name.to_ascii_lowercase();
        let raw = encode_attribute(value).into_owned();
        if let Some(tag) = self.arena.tag_mut(node) {
            match tag.attributes.iter_mut().find(|attr| attr.name == name) {
                Some(attr) => {
                    let (quote, start) = attr
                        .value
                        .as_ref()
                        .map_or((Quote::Double, 0), |v| (v.quote, v.start));
                    let quote = if quote == Quote::None { Quote::Double } else { quote };
                    attr.value = Some(AttrValue {
                        end: start + raw.len(),
                        raw: raw.clone(),
                        quote,
                        start,
                    });
                }
                None => tag.attributes.push(Attribute {
                    name: name.clone(),
                    value: Some(AttrValue {
                        end: raw.len(),
                        raw: raw.clone(),
                        quote: Quote::Double,
                        start: 0,
                    }),
                }),
            }
        }
        if name == "value" && self.renders_value_of(node) {
            self.regenerate_value(node, &raw)?;
        }
        Ok(())
    }

    fn regenerate_value(&mut self, input: NodeId, raw: &str) -> ToolboxResult<()> {
        let texts: Vec<NodeId> = self
            .arena
            .body(input)
            .iter()
            .copied()
            .filter(|c| self.arena.is_text(*c))
            .collect();
        for text in texts {
            self.delete(text)?;
        }
        let at = self.arena.body(input).len().saturating_sub(1);
        let prev = self.renderable_before((input, at));
        let next = self.renderable_after((input, at));
        let decoded = decode_entities(raw, decode_options(self.config));
        let segments = alloc_segments(self.arena, input, &decoded);
        self.arena.insert_children(input, at, &segments);
        self.arena.relink(prev, &segments, next);
        Ok(())
    }
}
