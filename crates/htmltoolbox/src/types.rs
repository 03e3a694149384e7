use std::fmt;

/// Stable handle of a node inside one toolbox arena.
///
/// Handles are never reused; a node removed by an edit keeps its slot but is detached
/// (`parent() == None`) and no longer reachable from the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quote {
    None,
    Double,
    Single,
}

impl Quote {
    pub fn as_str(self) -> &'static str {
        match self {
            Quote::None => "",
            Quote::Double => "\"",
            Quote::Single => "'",
        }
    }
}

/// Attribute value as written in the source (entities are not decoded).
///
/// `start`/`end` are byte offsets of the value text. The tokenizer emits absolute source
/// offsets; after tree building they are relative to the start of the owning element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrValue {
    pub raw: String,
    pub quote: Quote,
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<AttrValue>,
}

/// How an element is closed when serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseMarker {
    /// Written as `<name/>`.
    SelfClosing,
    /// Written with an explicit `</name>`.
    Tag,
    /// Void or line-break element, written as `<name>`.
    None,
}

#[derive(Clone, Debug)]
pub struct Tag {
    pub name: String,
    pub raw_name: String,
    pub attributes: Vec<Attribute>,
    pub body: Vec<NodeId>,
    pub close: CloseMarker,
    pub(crate) source_start: Option<usize>,
}

/// Tag name given to the wrap-site placeholder `<!/>`.
pub(crate) const WRAP_SITE: &str = "!";
pub(crate) const COMMENT: &str = "!--";

impl Tag {
    pub(crate) fn new(name: &str, raw_name: &str, close: CloseMarker) -> Self {
        Self {
            name: name.to_string(),
            raw_name: raw_name.to_string(),
            attributes: Vec::new(),
            body: Vec::new(),
            close,
            source_start: None,
        }
    }

    /// Comments, declarations, `script`, `style` and nameless tags contribute nothing to the
    /// rendered text.
    pub fn is_rendered(&self) -> bool {
        !(self.name.is_empty()
            || self.name.starts_with('!')
            || self.name == "script"
            || self.name == "style")
    }

    pub fn is_comment(&self) -> bool {
        self.name == COMMENT
    }

    pub fn is_declaration(&self) -> bool {
        self.name.starts_with('!') && !self.is_comment()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Raw (undecoded) value of the first attribute named `name`.
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .and_then(|attr| attr.value.as_ref())
            .map(|value| value.raw.as_str())
    }

    pub(crate) fn is_hidden_input(&self) -> bool {
        self.attribute_value("type")
            .is_some_and(|ty| ty.trim().eq_ignore_ascii_case("hidden"))
    }
}

#[derive(Clone, Debug)]
pub enum NodeData {
    /// Synthetic root of a parsed document or fragment; renders no separators.
    Document { body: Vec<NodeId> },
    Tag(Tag),
    Text(String),
    Sep(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Tag,
    Text,
    Sep,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Document => "document",
            NodeKind::Tag => "tag",
            NodeKind::Text => "text",
            NodeKind::Sep => "sep",
        })
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) str_index: usize,
    pub(crate) mod_offset: usize,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(parent: Option<NodeId>, data: NodeData) -> Self {
        Self {
            parent,
            prev: None,
            next: None,
            str_index: 0,
            mod_offset: 0,
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Document { .. } => NodeKind::Document,
            NodeData::Tag(_) => NodeKind::Tag,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Sep(_) => NodeKind::Sep,
        }
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Previous node in rendered order.
    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    /// Next node in rendered order. On a document root this is the first renderable node.
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// Offset of this node's first rendered character in the projection (sentinel included).
    pub fn str_index(&self) -> usize {
        self.str_index
    }

    pub fn mod_offset(&self) -> usize {
        self.mod_offset
    }

    pub fn tag(&self) -> Option<&Tag> {
        match &self.data {
            NodeData::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub(crate) fn tag_mut(&mut self) -> Option<&mut Tag> {
        match &mut self.data {
            NodeData::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.tag().map(|tag| tag.name.as_str())
    }

    /// Value of a `Text` or `Sep` node.
    pub fn value(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(value) | NodeData::Sep(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn value_mut(&mut self) -> Option<&mut String> {
        match &mut self.data {
            NodeData::Text(value) | NodeData::Sep(value) => Some(value),
            _ => None,
        }
    }

    pub fn body(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Document { body } => body,
            NodeData::Tag(tag) => &tag.body,
            NodeData::Text(_) | NodeData::Sep(_) => &[],
        }
    }

    pub(crate) fn body_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.data {
            NodeData::Document { body } => Some(body),
            NodeData::Tag(tag) => Some(&mut tag.body),
            NodeData::Text(_) | NodeData::Sep(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn is_sep(&self) -> bool {
        matches!(self.data, NodeData::Sep(_))
    }

    pub fn is_renderable(&self) -> bool {
        self.is_text() || self.is_sep()
    }
}

/// Token emitted by the markup tokenizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `<!...>` other than a comment; content is trimmed and excludes `<!` and `>`.
    Declaration(String),
    StartTag {
        name: String,
        raw_name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
        start: usize,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

#[derive(Debug, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }
}
