use crate::arena::Arena;
use crate::config::ToolboxConfig;
use crate::tokenizer::is_void_element;
use crate::types::{CloseMarker, NodeData, NodeId, Tag, Token, TokenStream, COMMENT, WRAP_SITE};

/// Builds the raw parse tree for `stream` under a fresh document root.
///
/// End tags close the nearest open element of the same name; end tags with no open match are
/// ignored. Void, no-close and self-closed elements never receive children.
pub(crate) fn build_raw_tree(arena: &mut Arena, stream: &TokenStream, config: &ToolboxConfig) -> NodeId {
    let root = arena.alloc(None, NodeData::Document { body: Vec::new() });
    let mut open_elements: Vec<NodeId> = Vec::new();

    for token in stream.iter() {
        let parent = open_elements.last().copied().unwrap_or(root);
        match token {
            Token::Declaration(content) => {
                let name = declaration_name(content);
                let raw_name = format!("!{content}");
                add_child(
                    arena,
                    parent,
                    NodeData::Tag(Tag::new(&name, &raw_name, CloseMarker::None)),
                );
            }
            Token::Comment(text) => {
                let comment = add_child(
                    arena,
                    parent,
                    NodeData::Tag(Tag::new(COMMENT, COMMENT, CloseMarker::Tag)),
                );
                add_child(arena, comment, NodeData::Text(text.clone()));
            }
            Token::Text(text) => {
                if !text.is_empty() {
                    add_child(arena, parent, NodeData::Text(text.clone()));
                }
            }
            Token::StartTag {
                name,
                raw_name,
                attributes,
                self_closing,
                start,
            } => {
                let close = if *self_closing {
                    CloseMarker::SelfClosing
                } else if is_void_element(name) || config.is_no_close(name) {
                    CloseMarker::None
                } else {
                    CloseMarker::Tag
                };
                let mut tag = Tag::new(name, raw_name, close);
                tag.attributes = attributes.clone();
                tag.source_start = Some(*start);
                let id = add_child(arena, parent, NodeData::Tag(tag));
                if close == CloseMarker::Tag {
                    open_elements.push(id);
                }
            }
            Token::EndTag(name) => {
                let open = open_elements
                    .iter()
                    .rposition(|id| arena.tag(*id).is_some_and(|tag| tag.name == *name));
                if let Some(index) = open {
                    open_elements.truncate(index);
                }
            }
        }
    }

    root
}

fn add_child(arena: &mut Arena, parent: NodeId, data: NodeData) -> NodeId {
    let id = arena.alloc(Some(parent), data);
    arena.insert_children(parent, usize::MAX, &[id]);
    id
}

/// `<!DOCTYPE html>` becomes `!doctype`; the wrap-site marker `<!/>` becomes `!`.
fn declaration_name(content: &str) -> String {
    if content == "/" {
        return WRAP_SITE.to_string();
    }
    let keyword: String = content
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if keyword.is_empty() {
        "!?".to_string()
    } else {
        format!("!{keyword}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn build(input: &str) -> (Arena, NodeId) {
        let mut arena = Arena::new();
        let root = build_raw_tree(&mut arena, &tokenize(input), &ToolboxConfig::default());
        (arena, root)
    }

    fn names(arena: &Arena, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| match arena.get(*id).data() {
                NodeData::Tag(tag) => tag.name.clone(),
                NodeData::Text(text) => format!("{text:?}"),
                _ => "?".to_string(),
            })
            .collect()
    }

    #[test]
    fn builds_nested_elements_and_text() {
        let (arena, root) = build("<div>a<b>c</b>d</div>e");
        let body = arena.body(root);
        assert_eq!(names(&arena, body), vec!["div", "\"e\""]);
        let div = body[0];
        assert_eq!(names(&arena, arena.body(div)), vec!["\"a\"", "b", "\"d\""]);
        assert_eq!(arena.parent(div), Some(root));
    }

    #[test]
    fn stray_end_tag_is_ignored() {
        let (arena, root) = build("<p>a</b>c</p>");
        let p = arena.body(root)[0];
        assert_eq!(names(&arena, arena.body(p)), vec!["\"a\"", "\"c\""]);
    }

    #[test]
    fn void_and_self_closing_elements_take_no_children() {
        let (arena, root) = build("<br>a<img src=x>b<x-y/>c");
        assert_eq!(
            names(&arena, arena.body(root)),
            vec!["br", "\"a\"", "img", "\"b\"", "x-y", "\"c\""]
        );
        let close: Vec<CloseMarker> = arena
            .body(root)
            .iter()
            .filter_map(|id| arena.tag(*id).map(|t| t.close))
            .collect();
        assert_eq!(
            close,
            vec![CloseMarker::None, CloseMarker::None, CloseMarker::SelfClosing]
        );
    }

    #[test]
    fn comments_and_declarations_become_tags() {
        let (arena, root) = build("<!DOCTYPE html><!--note--><!/>");
        let body = arena.body(root);
        assert_eq!(names(&arena, body), vec!["!doctype", "!--", "!"]);
        let doctype = arena.tag(body[0]).expect("doctype tag");
        assert_eq!(doctype.raw_name, "!DOCTYPE html");
        assert_eq!(names(&arena, arena.body(body[1])), vec!["\"note\""]);
    }
}
