use crate::arena::Arena;
use crate::traverse::Walk;
use crate::types::{NodeData, NodeId, Tag};
use std::fmt::Write;

const INDENT_STEP: &str = "  ";
const PREVIEW_CHARS: usize = 40;

fn push_preview(out: &mut String, s: &str) {
    let mut chars = s.chars();
    for ch in chars.by_ref().take(PREVIEW_CHARS) {
        out.extend(ch.escape_debug());
    }
    if chars.next().is_some() {
        out.push('…');
    }
}

fn push_open_tag(line: &mut String, tag: &Tag) {
    line.push('<');
    line.push_str(&tag.name);
    for attr in &tag.attributes {
        line.push(' ');
        line.push_str(&attr.name);
        if let Some(value) = &attr.value {
            line.push_str("=\"");
            push_preview(line, &value.raw);
            line.push('"');
        }
    }
    line.push('>');
}

/// One line per node, indented by depth. Renderable nodes show their projection offset.
pub(crate) fn outline(arena: &Arena, root: NodeId) -> Vec<String> {
    let mut out = vec!["#document".to_string()];
    let mut indent = String::from(INDENT_STEP);
    for step in Walk::all(arena, root) {
        let node = arena.get(step.node);
        if step.exit && node.tag().is_some() {
            let new_len = indent.len().saturating_sub(INDENT_STEP.len());
            indent.truncate(new_len);
            continue;
        }
        let mut line = String::with_capacity(indent.len() + 64);
        line.push_str(&indent);
        match node.data() {
            NodeData::Tag(tag) => {
                push_open_tag(&mut line, tag);
                indent.push_str(INDENT_STEP);
            }
            NodeData::Text(value) => {
                line.push('"');
                push_preview(&mut line, value);
                let _ = write!(line, "\" @{}", node.str_index());
            }
            NodeData::Sep(value) => {
                line.push_str("sep \"");
                push_preview(&mut line, value);
                let _ = write!(line, "\" @{}", node.str_index());
            }
            NodeData::Document { .. } => line.push_str("#document"),
        }
        out.push(line);
    }
    out
}

/// The rendered-order list, head to tail.
pub(crate) fn traverse_lines(arena: &Arena, root: NodeId) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = arena.get(root).next();
    while let Some(id) = current {
        let node = arena.get(id);
        let mut line = format!("{} {id} @{} \"", node.kind(), node.str_index());
        push_preview(&mut line, node.value().unwrap_or_default());
        line.push('"');
        out.push(line);
        current = node.next();
    }
    out
}
