//! Searching the projection and mapping text ranges back onto nodes.
use crate::arena::Arena;
use crate::flatten::SENTINEL;
use crate::traverse::Walk;
use crate::types::NodeId;
use regex::Regex;

/// What [`HtmlToolbox::search`](crate::HtmlToolbox::search) looks for.
#[derive(Clone, Debug)]
pub enum Query {
    /// Every non-overlapping match of a pattern; capture groups are exposed on the match.
    Pattern(Regex),
    /// Every non-overlapping occurrence of a literal string.
    Literal(String),
    /// Every element, in document order.
    Elements,
}

impl Query {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Query::Pattern)
    }
}

impl From<Regex> for Query {
    fn from(re: Regex) -> Self {
        Query::Pattern(re)
    }
}

impl From<&str> for Query {
    fn from(literal: &str) -> Self {
        Query::Literal(literal.to_string())
    }
}

impl From<String> for Query {
    fn from(literal: String) -> Self {
        Query::Literal(literal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    /// A range of rendered text.
    Text,
    /// A whole element found by [`Query::Elements`]; `start_node == end_node` is the tag.
    Element,
}

/// A located range of rendered text (or an element).
///
/// Offsets are byte offsets into the original value of the boundary nodes; they stay valid
/// while edits are queued because every node records how much of its front was cut.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    /// Byte offset of the match in [`HtmlToolbox::text`](crate::HtmlToolbox::text).
    pub index: usize,
    pub text: String,
    /// Capture groups, group 0 first. Empty for literal and element queries.
    pub groups: Vec<Option<String>>,
    pub start_node: NodeId,
    pub start_offset: usize,
    pub end_node: NodeId,
    pub end_offset: usize,
    pub kind: MatchKind,
}

impl Match {
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

/// Node span of a text range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub start_node: NodeId,
    pub start_offset: usize,
    pub end_node: NodeId,
    pub end_offset: usize,
}

/// Text occurrence in projection coordinates (sentinel included).
pub(crate) struct Hit {
    pub index: usize,
    pub len: usize,
    pub text: String,
    pub groups: Vec<Option<String>>,
}

pub(crate) fn find_hits(query: &Query, flat: &str) -> Vec<Hit> {
    let offset = SENTINEL.len_utf8();
    let haystack = flat.get(offset..).unwrap_or_default();
    match query {
        Query::Pattern(re) => re
            .captures_iter(haystack)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(Hit {
                    index: whole.start() + offset,
                    len: whole.len(),
                    text: whole.as_str().to_string(),
                    groups: caps
                        .iter()
                        .map(|g| g.map(|m| m.as_str().to_string()))
                        .collect(),
                })
            })
            .collect(),
        Query::Literal(literal) if literal.is_empty() => Vec::new(),
        Query::Literal(literal) => haystack
            .match_indices(literal.as_str())
            .map(|(at, text)| Hit {
                index: at + offset,
                len: text.len(),
                text: text.to_string(),
                groups: Vec::new(),
            })
            .collect(),
        Query::Elements => Vec::new(),
    }
}

/// Element matches for every tag entry step, skipping comments and declarations.
pub(crate) fn element_matches(arena: &Arena, root: NodeId) -> Vec<Match> {
    Walk::all(arena, root)
        .filter(|step| !step.exit)
        .filter(|step| {
            arena
                .tag(step.node)
                .is_some_and(|tag| !tag.name.is_empty() && !tag.name.starts_with('!'))
        })
        .map(|step| {
            let index = arena
                .first_renderable(step.node)
                .map_or(0, |n| arena.get(n).str_index.saturating_sub(SENTINEL.len_utf8()));
            Match {
                index,
                text: String::new(),
                groups: Vec::new(),
                start_node: step.node,
                start_offset: 0,
                end_node: step.node,
                end_offset: 0,
                kind: MatchKind::Element,
            }
        })
        .collect()
}

/// Forward-resuming locator; reset it whenever the projection is rebuilt.
#[derive(Debug, Default)]
pub(crate) struct Locator {
    cursor: Option<NodeId>,
}

/// Clamps `offset` into `value`, rounding down to a char boundary.
pub(crate) fn clamp_offset(value: &str, offset: usize) -> usize {
    let mut offset = offset.min(value.len());
    while !value.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

impl Locator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Maps `[index, index + len)` of the projection onto boundary text nodes.
    pub(crate) fn locate(&mut self, arena: &Arena, root: NodeId, index: usize, len: usize) -> Option<Span> {
        let resume = self
            .cursor
            .filter(|c| arena.parent(*c).is_some() && arena.get(*c).str_index <= index);
        let mut anchor = resume.or(arena.get(root).next)?;
        while let Some(next) = arena.get(anchor).next {
            if arena.get(next).str_index > index {
                break;
            }
            anchor = next;
        }
        self.cursor = Some(anchor);

        let mut start = anchor;
        while arena.is_sep(start) {
            match arena.get(start).next {
                Some(next) => start = next,
                None => break,
            }
        }
        let start_value = arena.value(start).unwrap_or_default();
        let mut start_offset = clamp_offset(
            start_value,
            index.saturating_sub(arena.get(start).str_index),
        );
        if arena.is_sep(start) {
            // No text follows; attach to the end of the closest text before.
            let mut back = start;
            while arena.is_sep(back) {
                match arena.get(back).prev {
                    Some(prev) if prev != root => back = prev,
                    _ => break,
                }
            }
            if arena.is_text(back) {
                start = back;
                start_offset = arena.value(back).map_or(0, str::len);
            }
        }
        if len == 0 {
            return Some(Span {
                start_node: start,
                start_offset,
                end_node: start,
                end_offset: start_offset,
            });
        }

        let target = index + len;
        let mut end = anchor;
        while let Some(next) = arena.get(end).next {
            if arena.get(next).str_index >= target {
                break;
            }
            end = next;
        }
        while arena.is_sep(end) {
            match arena.get(end).prev {
                Some(prev) if prev != root => end = prev,
                _ => break,
            }
        }
        if start != end && !arena.precedes(start, end) {
            // Only separators were matched; collapse onto the start boundary.
            return Some(Span {
                start_node: start,
                start_offset,
                end_node: start,
                end_offset: start_offset,
            });
        }
        let end_value = arena.value(end).unwrap_or_default();
        let end_offset = clamp_offset(end_value, target.saturating_sub(arena.get(end).str_index));
        Some(Span {
            start_node: start,
            start_offset,
            end_node: end,
            end_offset,
        })
    }
}
