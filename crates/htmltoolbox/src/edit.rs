//! Queued edit commands.
//!
//! Edits are recorded against match spans and node handles captured at call time and
//! replayed in order by the toolbox flush.
//!
//! Invariants:
//! - Replay is strictly FIFO; each edit observes the tree left by the ones before it.
//! - Text offsets held by an edit are offsets into the node's value as it was when the
//!   match was produced; `Node::mod_offset` translates them to the current value.
//! - A wrap envelope has been checked for exactly one placeholder before it is queued.

use crate::locate::{Match, MatchKind};
use crate::types::NodeId;

/// Which side of the target an insertion attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// After the start boundary (the match start, or the node itself for `insert_at`).
    Begin,
    /// Before the end boundary.
    End,
}

/// Node span an edit applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Target {
    /// Text range between two renderable nodes.
    Text {
        start_node: NodeId,
        start_offset: usize,
        end_node: NodeId,
        end_offset: usize,
    },
    /// A whole element.
    Element(NodeId),
}

impl From<&Match> for Target {
    fn from(m: &Match) -> Self {
        match m.kind {
            MatchKind::Element => Target::Element(m.start_node),
            MatchKind::Text => Target::Text {
                start_node: m.start_node,
                start_offset: m.start_offset,
                end_node: m.end_node,
                end_offset: m.end_offset,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Edit {
    Remove {
        target: Target,
    },
    Replace {
        target: Target,
        html: String,
        anchor: Anchor,
    },
    Insert {
        target: Target,
        html: String,
        anchor: Anchor,
    },
    InsertAt {
        node: NodeId,
        html: String,
        anchor: Anchor,
    },
    Wrap {
        target: Target,
        envelope: String,
    },
    SetTag {
        node: NodeId,
        tag: String,
    },
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
}

impl Edit {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Edit::Remove { .. } => "remove",
            Edit::Replace { .. } => "replace",
            Edit::Insert { .. } => "insert",
            Edit::InsertAt { .. } => "insert_at",
            Edit::Wrap { .. } => "wrap",
            Edit::SetTag { .. } => "set_tag",
            Edit::SetAttribute { .. } => "set_attribute",
        }
    }
}
