//! Projection of a (sub)tree into rendered text plus the rendered-order list.
//!
//! The projection starts with one sentinel newline so offset 0 never addresses content.
//! Whitespace collapses: whitespace after whitespace contributes nothing, except that a
//! newline replaces a trailing space (last newline wins). One trailing whitespace
//! character is trimmed.
use crate::arena::Arena;
use crate::traverse::{Step, Traversal};
use crate::tree_builder::{is_space, is_space_run};
use crate::types::{NodeData, NodeId, WRAP_SITE};

pub(crate) const SENTINEL: char = '\n';

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Anchors {
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WrapSite {
    pub container: NodeId,
    pub index: usize,
    pub node: NodeId,
}

#[derive(Debug)]
pub(crate) struct Flattened {
    pub text: String,
    pub first: Option<NodeId>,
    pub last: Option<NodeId>,
    pub wrap_sites: Vec<WrapSite>,
}

/// Flattens the whole document; `root.next` becomes the head of the rendered order.
pub(crate) fn flatten_document(arena: &mut Arena, root: NodeId) -> String {
    let flat = flatten(arena, root, None, false);
    log::debug!(
        target: "htmltoolbox.flatten",
        "flattened document into {} bytes",
        flat.text.len()
    );
    flat.text
}

/// Flattens a detached fragment that will be spliced between `anchors`.
///
/// The fragment's first and last renderable nodes point at the anchors; the anchors' own
/// links are left for the caller to update.
pub(crate) fn flatten_patch(
    arena: &mut Arena,
    root: NodeId,
    anchors: Anchors,
    detect_wraps: bool,
) -> Flattened {
    flatten(arena, root, Some(anchors), detect_wraps)
}

fn contributed_len(value: &str) -> usize {
    if is_space_run(value) { 1 } else { value.len() }
}

fn flatten(
    arena: &mut Arena,
    root: NodeId,
    anchors: Option<Anchors>,
    detect_wraps: bool,
) -> Flattened {
    let patch = anchors.is_some();
    let anchors = anchors.unwrap_or_default();
    // Patch offsets continue after the anchor; the sentinel is not part of them.
    let base = anchors
        .prev
        .filter(|_| patch)
        .map(|prev| {
            let node = arena.get(prev);
            node.str_index + node.value().map_or(0, contributed_len)
        })
        .unwrap_or(0)
        .saturating_sub(SENTINEL.len_utf8());

    let mut out = Flattened {
        text: String::from(SENTINEL),
        first: None,
        last: None,
        wrap_sites: Vec::new(),
    };
    let mut prev = if patch { anchors.prev } else { Some(root) };
    let mut cursor = Traversal::new(root).rendered_only();

    while let Some(step) = cursor.next_step(arena) {
        let sep = match &arena.get(step.node).data {
            NodeData::Tag(tag) => {
                if detect_wraps && step.exit && tag.name == WRAP_SITE {
                    out.wrap_sites.push(WrapSite {
                        container: step.container,
                        index: step.index,
                        node: step.node,
                    });
                }
                continue;
            }
            NodeData::Document { .. } => continue,
            NodeData::Text(_) => false,
            NodeData::Sep(_) => true,
        };
        if !sep {
            merge_following(arena, step);
        }

        let id = step.node;
        let str_index = base + out.text.len();
        {
            let node = arena.get_mut(id);
            node.str_index = str_index;
            node.mod_offset = 0;
            node.prev = prev;
        }
        if let Some(p) = prev {
            if !(patch && out.first.is_none()) {
                arena.get_mut(p).next = Some(id);
            }
        }
        out.first.get_or_insert(id);
        out.last = Some(id);
        prev = Some(id);

        if let Some(value) = arena.value(id) {
            push_collapsed(&mut out.text, value, sep);
        }
        log::trace!(target: "htmltoolbox.flatten", "{id} at {str_index}");
    }

    match out.last {
        Some(last) => arena.get_mut(last).next = anchors.next,
        None if !patch => arena.get_mut(root).next = None,
        None => {}
    }
    if out.text.len() > SENTINEL.len_utf8() && out.text.ends_with(is_space) {
        out.text.pop();
    }
    out
}

/// Absorbs following text siblings with the same whitespace-ness (or empty ones).
fn merge_following(arena: &mut Arena, step: Step) {
    loop {
        let Some(&next) = arena.body(step.container).get(step.index + 1) else {
            return;
        };
        let Some(next_value) = arena.get(next).is_text().then(|| arena.value(next)).flatten()
        else {
            return;
        };
        let value = arena.value(step.node).unwrap_or_default();
        let mergeable = value.is_empty()
            || next_value.is_empty()
            || is_space_run(value) == is_space_run(next_value);
        if !mergeable {
            return;
        }
        let merged = format!("{value}{next_value}");
        arena.set_value(step.node, merged);
        if let Some(body) = arena.get_mut(step.container).body_mut() {
            body.remove(step.index + 1);
        }
        let gone = arena.get_mut(next);
        gone.parent = None;
        gone.prev = None;
        gone.next = None;
    }
}

fn push_collapsed(text: &mut String, value: &str, sep: bool) {
    let Some(first) = value.chars().next() else {
        return;
    };
    let incoming_space = is_space(first);
    if incoming_space && text.ends_with(is_space) {
        if first == '\n' && !text.ends_with('\n') {
            text.pop();
            text.push('\n');
        }
        return;
    }
    if incoming_space && !sep {
        text.push(first);
    } else {
        text.push_str(value);
    }
}
