//! Rendered-text projection of HTML with offset mapping and queued structural edits.
//!
//! ```
//! use htmltoolbox::HtmlToolbox;
//!
//! let mut tb = HtmlToolbox::new("<div>1 and 2</div>");
//! tb.wrap_all(htmltoolbox::Query::pattern(r"\d").unwrap(), "<b><!/></b>").unwrap();
//! assert_eq!(tb.html(None).unwrap(), "<div><b>1</b> and <b>2</b></div>");
//! assert_eq!(tb.text().unwrap(), "1 and 2");
//! ```
mod arena;
mod config;
mod debug;
mod dom_builder;
mod edit;
mod entities;
mod error;
mod flatten;
mod locate;
mod mutate;
mod serialize;
mod tokenizer;
mod toolbox;
mod traverse;
mod tree_builder;
mod types;

pub use crate::config::ToolboxConfig;
pub use crate::edit::Anchor;
pub use crate::entities::{DecodeOptions, decode_entities, encode_attribute, encode_text};
pub use crate::error::{ToolboxError, ToolboxResult};
pub use crate::locate::{Match, MatchKind, Query};
pub use crate::tokenizer::tokenize;
pub use crate::toolbox::HtmlToolbox;
pub use crate::traverse::{Step, Walk};
pub use crate::types::{
    AttrValue, Attribute, CloseMarker, Node, NodeData, NodeId, NodeKind, Quote, Tag, Token,
    TokenStream,
};
