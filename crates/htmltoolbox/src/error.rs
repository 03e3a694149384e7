use crate::types::NodeId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolboxError {
    /// A match-anchored edit was requested while no match is bound.
    NoActiveMatch { op: &'static str },
    /// A wrap envelope must contain exactly one `<!/>` placeholder.
    InvalidEnvelope { placeholders: usize },
    /// `node` claims `parent` as its parent but is not among its children.
    NodeNotInParent { node: NodeId, parent: NodeId },
    /// A splice needed the position of a node that is no longer attached to the tree.
    Detached { node: NodeId },
}

pub type ToolboxResult<T> = Result<T, ToolboxError>;

impl ToolboxError {
    /// Structural errors leave the tree in an unknown state; the toolbox refuses further work.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ToolboxError::NodeNotInParent { .. } | ToolboxError::Detached { .. }
        )
    }
}

impl std::fmt::Display for ToolboxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolboxError::NoActiveMatch { op } => write!(f, "{op}: no active match"),
            ToolboxError::InvalidEnvelope { placeholders } => write!(
                f,
                "wrap envelope must contain exactly one <!/> placeholder, found {placeholders}"
            ),
            ToolboxError::NodeNotInParent { node, parent } => {
                write!(f, "node {node} not found in body of parent {parent}")
            }
            ToolboxError::Detached { node } => write!(f, "node {node} is detached"),
        }
    }
}

impl std::error::Error for ToolboxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_are_flagged() {
        let err = ToolboxError::NodeNotInParent {
            node: NodeId(4),
            parent: NodeId(1),
        };
        assert!(err.is_structural());
        assert_eq!(err.to_string(), "node #4 not found in body of parent #1");
        assert!(!ToolboxError::NoActiveMatch { op: "remove" }.is_structural());
    }
}
