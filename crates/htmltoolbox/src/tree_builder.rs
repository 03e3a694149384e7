//! Normalization of the raw parse tree into the renderable node model.
//!
//! One traversal over the tree:
//! - every rendered tag gets a `Sep` prepended on entry and appended on exit;
//! - line-break tags get the fixed body `[Sep, Text("\n"), Sep]`;
//! - rendered `input` elements get their decoded value as text before the trailing `Sep`;
//! - text is entity decoded (unless under a raw tag) and split into alternating
//!   whitespace / non-whitespace runs;
//! - attribute names are lowercased and value offsets made element-relative.
//!
//! Comments, declarations, `script` and `style` are kept as-is and never descended into.
use crate::arena::Arena;
use crate::config::ToolboxConfig;
use crate::dom_builder::build_raw_tree;
use crate::entities::{DecodeOptions, decode_entities};
use crate::tokenizer::tokenize;
use crate::traverse::{Step, Traversal};
use crate::types::{NodeData, NodeId};

/// Whitespace as far as rendering is concerned. U+00A0 is content.
pub(crate) fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

pub(crate) fn is_space_run(s: &str) -> bool {
    s.chars().next().is_some_and(is_space)
}

/// Splits `s` into maximal runs that are all whitespace or all non-whitespace.
pub(crate) fn split_space_runs(s: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current = None;
    for (i, c) in s.char_indices() {
        let space = is_space(c);
        if current.is_some_and(|prev| prev != space) {
            runs.push(&s[start..i]);
            start = i;
        }
        current = Some(space);
    }
    if start < s.len() {
        runs.push(&s[start..]);
    }
    runs
}

pub(crate) fn decode_options(config: &ToolboxConfig) -> DecodeOptions {
    DecodeOptions {
        strict: false,
        nbsp_as_space: config.convert_nbsp_to_space,
    }
}

/// Tokenizes, builds and normalizes `html`; returns the new document root.
pub(crate) fn parse(arena: &mut Arena, html: &str, config: &ToolboxConfig) -> NodeId {
    let stream = tokenize(html);
    let root = build_raw_tree(arena, &stream, config);
    normalize(arena, root, config);
    root
}

pub(crate) fn normalize(arena: &mut Arena, root: NodeId, config: &ToolboxConfig) {
    let mut cursor = Traversal::new(root).rendered_only();
    let mut segments = 0usize;
    while let Some(step) = cursor.next_step(arena) {
        arena.get_mut(step.node).parent = Some(step.container);
        let Some(rendered) = arena.tag(step.node).map(|tag| tag.is_rendered()) else {
            if arena.is_text(step.node) {
                let count = segment_text(arena, step, config);
                segments += count;
                cursor.resume_at(step.index + count);
            }
            continue;
        };
        if !step.exit || !rendered {
            normalize_attributes(arena, step.node);
        }
        if !rendered {
            continue;
        }
        if step.exit {
            close_tag(arena, step.node, config);
        } else {
            open_tag(arena, step.node, config);
        }
    }
    log::trace!(target: "htmltoolbox.tree_builder", "normalized tree under {root}: {segments} text segments");
}

fn alloc_sep(arena: &mut Arena, parent: NodeId, value: &str) -> NodeId {
    arena.alloc(Some(parent), NodeData::Sep(value.to_string()))
}

/// Builds the fixed line-break body `[Sep, Text("\n"), Sep]` for `id`.
pub(crate) fn line_break_body(arena: &mut Arena, id: NodeId, separator: &str) -> Vec<NodeId> {
    let open = alloc_sep(arena, id, separator);
    let newline = arena.alloc(Some(id), NodeData::Text("\n".to_string()));
    let close = alloc_sep(arena, id, separator);
    vec![open, newline, close]
}

/// Allocates whitespace-segmented text nodes for `value` under `parent`.
pub(crate) fn alloc_segments(arena: &mut Arena, parent: NodeId, value: &str) -> Vec<NodeId> {
    split_space_runs(value)
        .into_iter()
        .map(|run| arena.alloc(Some(parent), NodeData::Text(run.to_string())))
        .collect()
}

fn open_tag(arena: &mut Arena, id: NodeId, config: &ToolboxConfig) {
    let Some(name) = arena.tag(id).map(|tag| tag.name.clone()) else {
        return;
    };
    let separator = config.separator_for(&name);
    if config.is_line_break(&name) {
        for child in arena.take_body(id) {
            arena.get_mut(child).parent = None;
        }
        let body = line_break_body(arena, id, separator);
        arena.insert_children(id, 0, &body);
        return;
    }
    let sep = alloc_sep(arena, id, separator);
    arena.insert_children(id, 0, &[sep]);
}

fn close_tag(arena: &mut Arena, id: NodeId, config: &ToolboxConfig) {
    let Some(tag) = arena.tag(id) else {
        return;
    };
    if config.is_line_break(&tag.name) {
        return;
    }
    let name = tag.name.clone();
    let value = if config.renders_value(&name) && !tag.is_hidden_input() {
        tag.attribute_value("value")
            .map(|raw| decode_entities(raw, decode_options(config)))
    } else {
        None
    };
    let end = arena.body(id).len();
    if let Some(value) = value {
        let segments = alloc_segments(arena, id, &value);
        arena.insert_children(id, end, &segments);
    }
    let sep = alloc_sep(arena, id, config.separator_for(&name));
    arena.insert_children(id, usize::MAX, &[sep]);
}

/// Replaces the text node at `step` by its whitespace runs; returns how many runs remain.
fn segment_text(arena: &mut Arena, step: Step, config: &ToolboxConfig) -> usize {
    let raw_parent = arena
        .tag(step.container)
        .is_some_and(|tag| config.is_raw(&tag.name));
    let value = arena.value(step.node).unwrap_or_default();
    let decoded = if raw_parent {
        value.to_string()
    } else {
        decode_entities(value, decode_options(config))
    };
    let runs = split_space_runs(&decoded);
    let Some((first, rest)) = runs.split_first() else {
        if let Some(body) = arena.get_mut(step.container).body_mut() {
            body.remove(step.index);
        }
        arena.get_mut(step.node).parent = None;
        return 0;
    };
    let extra: Vec<NodeId> = rest
        .iter()
        .map(|run| arena.alloc(Some(step.container), NodeData::Text(run.to_string())))
        .collect();
    arena.set_value(step.node, first.to_string());
    arena.insert_children(step.container, step.index + 1, &extra);
    runs.len()
}

fn normalize_attributes(arena: &mut Arena, id: NodeId) {
    let Some(tag) = arena.tag_mut(id) else {
        return;
    };
    let base = tag.source_start.take();
    for attr in &mut tag.attributes {
        attr.name.make_ascii_lowercase();
        if let (Some(value), Some(base)) = (attr.value.as_mut(), base) {
            value.start = value.start.saturating_sub(base);
            value.end = value.end.saturating_sub(base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeKind, Quote};

    fn describe(arena: &Arena, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                let node = arena.get(*id);
                match node.kind() {
                    NodeKind::Tag => format!("<{}>", node.name().unwrap_or_default()),
                    NodeKind::Text => format!("{:?}", node.value().unwrap_or_default()),
                    NodeKind::Sep => format!("sep{:?}", node.value().unwrap_or_default()),
                    NodeKind::Document => "doc".to_string(),
                }
            })
            .collect()
    }

    fn parse_default(html: &str) -> (Arena, NodeId) {
        let mut arena = Arena::new();
        let root = parse(&mut arena, html, &ToolboxConfig::default());
        (arena, root)
    }

    #[test]
    fn splits_space_runs() {
        assert_eq!(split_space_runs("a  b\nc"), vec!["a", "  ", "b", "\n", "c"]);
        assert_eq!(split_space_runs(" x "), vec![" ", "x", " "]);
        assert_eq!(split_space_runs("a\u{00A0}b"), vec!["a\u{00A0}b"]);
        assert!(split_space_runs("").is_empty());
    }

    #[test]
    fn rendered_tags_get_boundary_separators() {
        let (arena, root) = parse_default("<p>one two</p>");
        let p = arena.body(root)[0];
        assert_eq!(
            describe(&arena, arena.body(p)),
            vec!["sep\"\\n\"", "\"one\"", "\" \"", "\"two\"", "sep\"\\n\""]
        );
        for child in arena.body(p) {
            assert_eq!(arena.parent(*child), Some(p));
        }
    }

    #[test]
    fn line_break_tags_get_fixed_body() {
        let (arena, root) = parse_default("a<br>b");
        let br = arena.body(root)[1];
        assert_eq!(describe(&arena, arena.body(br)), vec!["sep\"\"", "\"\\n\"", "sep\"\""]);
    }

    #[test]
    fn input_value_is_injected_unless_hidden() {
        let (arena, root) = parse_default("<input value='a &amp; b'><input type=hidden value=x>");
        let body = arena.body(root);
        assert_eq!(
            describe(&arena, arena.body(body[0])),
            vec!["sep\" \"", "\"a\"", "\" \"", "\"&\"", "\" \"", "\"b\"", "sep\" \""]
        );
        assert_eq!(describe(&arena, arena.body(body[1])), vec!["sep\" \"", "sep\" \""]);
    }

    #[test]
    fn raw_and_comment_text_is_untouched() {
        let (arena, root) = parse_default("<script>a &amp;  b</script><!-- x  y -->");
        let body = arena.body(root);
        assert_eq!(describe(&arena, arena.body(body[0])), vec!["\"a &amp;  b\""]);
        assert_eq!(describe(&arena, arena.body(body[1])), vec!["\" x  y \""]);
    }

    #[test]
    fn text_is_decoded_before_segmenting() {
        let (arena, root) = parse_default("x&lt;y&nbsp;z &amp;");
        let values: Vec<&str> = arena
            .body(root)
            .iter()
            .filter_map(|id| arena.value(*id))
            .collect();
        assert_eq!(values, vec!["x<y\u{00A0}z", " ", "&"]);
    }

    #[test]
    fn attributes_are_lowercased_and_offsets_relative() {
        let html = "xx<a HREF=\"/p\" Title=t>y</a>";
        let (arena, root) = parse_default(html);
        let a = arena.body(root)[1];
        let tag = arena.tag(a).expect("anchor tag");
        assert_eq!(tag.attributes[0].name, "href");
        assert_eq!(tag.attributes[1].name, "title");
        let href = tag.attributes[0].value.as_ref().expect("href value");
        assert_eq!(href.quote, Quote::Double);
        assert_eq!(&html[2 + href.start..2 + href.end], "/p");
        assert_eq!(tag.attributes[1].value.as_ref().map(|v| v.quote), Some(Quote::None));
        assert!(tag.source_start.is_none());
    }
}
