//! Markup output.
//!
//! `indent == None` writes the tree compactly with no whitespace of its own. `Some(unit)`
//! puts every element and text run on its own line, indented by `unit` per level;
//! whitespace-only text is dropped and text runs are trimmed. Comments, declarations and
//! raw-text elements are always written compactly.
use crate::arena::Arena;
use crate::config::ToolboxConfig;
use crate::entities::{encode_attribute, encode_text};
use crate::types::{CloseMarker, NodeData, NodeId, Quote, Tag};
use std::fmt::Write;

pub(crate) fn serialize(
    arena: &Arena,
    root: NodeId,
    config: &ToolboxConfig,
    indent: Option<&str>,
) -> String {
    let mut writer = Serializer {
        arena,
        config,
        indent,
        out: String::new(),
    };
    writer.write_children(root, 0);
    writer.out
}

struct Serializer<'a> {
    arena: &'a Arena,
    config: &'a ToolboxConfig,
    indent: Option<&'a str>,
    out: String,
}

impl Serializer<'_> {
    fn new_line(&mut self, depth: usize) {
        let Some(unit) = self.indent else {
            return;
        };
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        for _ in 0..depth {
            self.out.push_str(unit);
        }
    }

    /// Writes the body of `id`; returns true if anything was written.
    fn write_children(&mut self, id: NodeId, depth: usize) -> bool {
        let arena = self.arena;
        let body = arena.body(id);
        let mut wrote = false;
        let mut i = 0;
        while i < body.len() {
            let child = body[i];
            match arena.get(child).data() {
                NodeData::Sep(_) => i += 1,
                NodeData::Text(_) => {
                    let run = body[i..].iter().take_while(|c| arena.is_text(**c)).count();
                    wrote |= self.write_text_run(&body[i..i + run], depth);
                    i += run;
                }
                NodeData::Tag(tag) => {
                    self.write_tag(child, tag, depth);
                    wrote = true;
                    i += 1;
                }
                NodeData::Document { .. } => {
                    wrote |= self.write_children(child, depth);
                    i += 1;
                }
            }
        }
        wrote
    }

    fn write_text_run(&mut self, run: &[NodeId], depth: usize) -> bool {
        let mut text = String::new();
        for id in run {
            if let Some(value) = self.arena.value(*id) {
                text.push_str(&encode_text(value));
            }
        }
        if self.indent.is_none() {
            self.out.push_str(&text);
            return !text.is_empty();
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.new_line(depth);
        self.out.push_str(trimmed);
        true
    }

    fn write_tag(&mut self, id: NodeId, tag: &Tag, depth: usize) {
        self.new_line(depth);
        if tag.is_comment() {
            self.out.push_str("<!--");
            self.write_raw_body(tag);
            self.out.push_str("-->");
            return;
        }
        if tag.is_declaration() {
            let _ = write!(self.out, "<{}>", tag.raw_name);
            return;
        }

        let _ = write!(self.out, "<{}", tag.raw_name);
        self.write_attributes(id, tag);
        match tag.close {
            CloseMarker::SelfClosing => self.out.push_str("/>"),
            CloseMarker::None => {
                self.out.push('>');
                if !self.config.is_line_break(&tag.name) && !self.renders_value(tag) {
                    self.write_children(id, depth + 1);
                }
            }
            CloseMarker::Tag => {
                self.out.push('>');
                let wrote = if self.config.is_raw(&tag.name) {
                    self.write_raw_body(tag);
                    false
                } else if self.config.is_line_break(&tag.name) || self.renders_value(tag) {
                    false
                } else {
                    self.write_children(id, depth + 1)
                };
                if wrote {
                    self.new_line(depth);
                }
                let _ = write!(self.out, "</{}>", tag.raw_name);
            }
        }
    }

    fn write_raw_body(&mut self, tag: &Tag) {
        for child in &tag.body {
            if let Some(value) = self.arena.value(*child) {
                self.out.push_str(value);
            }
        }
    }

    fn renders_value(&self, tag: &Tag) -> bool {
        self.config.renders_value(&tag.name) && !tag.is_hidden_input()
    }

    /// Current value of a rendered `input`, rebuilt from its text children.
    fn input_value(&self, id: NodeId, tag: &Tag) -> Option<String> {
        if !self.renders_value(tag) {
            return None;
        }
        let texts: Vec<&str> = self
            .arena
            .body(id)
            .iter()
            .filter(|c| self.arena.is_text(**c))
            .filter_map(|c| self.arena.value(*c))
            .collect();
        if texts.is_empty() && tag.attribute("value").is_none() {
            return None;
        }
        Some(encode_attribute(&texts.concat()).into_owned())
    }

    fn write_attributes(&mut self, id: NodeId, tag: &Tag) {
        let mut value_override = self.input_value(id, tag);
        for attr in &tag.attributes {
            let _ = write!(self.out, " {}", attr.name);
            let rebuilt = if attr.name == "value" {
                value_override.take()
            } else {
                None
            };
            match (&attr.value, rebuilt) {
                (Some(value), Some(raw)) => {
                    let quote = match value.quote {
                        Quote::None => Quote::Double,
                        quote => quote,
                    };
                    let q = quote.as_str();
                    let _ = write!(self.out, "={q}{raw}{q}");
                }
                (None, Some(raw)) => {
                    let _ = write!(self.out, "=\"{raw}\"");
                }
                (Some(value), None) => {
                    let q = value.quote.as_str();
                    let _ = write!(self.out, "={q}{}{q}", value.raw);
                }
                (None, None) => {}
            }
        }
        if let Some(raw) = value_override {
            let _ = write!(self.out, " value=\"{raw}\"");
        }
    }
}
