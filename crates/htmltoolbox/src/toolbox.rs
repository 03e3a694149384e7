//! The engine facade: one document, its projection, a match cursor and an edit queue.
//!
//! Edits are queued and replayed lazily. Every read (`text`, `html`, `search`, and the
//! exhaustion of the match cursor) flushes the queue first, then re-flattens the whole
//! document so offsets are exact again.
use crate::arena::Arena;
use crate::config::ToolboxConfig;
use crate::debug;
use crate::edit::{Anchor, Edit, Target};
use crate::error::{ToolboxError, ToolboxResult};
use crate::flatten::{SENTINEL, flatten_document};
use crate::locate::{Locator, Match, MatchKind, Query, element_matches, find_hits};
use crate::mutate::Editor;
use crate::serialize::serialize;
use crate::tokenizer::tokenize;
use crate::traverse::Walk;
use crate::tree_builder::parse;
use crate::types::{Node, NodeId, Token};
use std::collections::VecDeque;

#[derive(Debug)]
pub struct HtmlToolbox {
    config: ToolboxConfig,
    arena: Arena,
    root: NodeId,
    flat: String,
    queue: Vec<Edit>,
    dirty: bool,
    matches: VecDeque<Match>,
    current: Option<Match>,
    failure: Option<ToolboxError>,
}

/// Counts `<!/>` placeholders in a wrap envelope.
fn wrap_sites(envelope: &str) -> usize {
    tokenize(envelope)
        .iter()
        .filter(|token| matches!(token, Token::Declaration(content) if content == "/"))
        .count()
}

impl HtmlToolbox {
    pub fn new(html: &str) -> Self {
        Self::with_config(html, ToolboxConfig::default())
    }

    pub fn with_config(html: &str, config: ToolboxConfig) -> Self {
        let mut arena = Arena::new();
        let root = parse(&mut arena, html, &config);
        let flat = flatten_document(&mut arena, root);
        log::debug!(
            target: "htmltoolbox.apply",
            "built document: {} nodes, {} projected bytes",
            arena.len(),
            flat.len()
        );
        Self {
            config,
            arena,
            root,
            flat,
            queue: Vec::new(),
            dirty: false,
            matches: VecDeque::new(),
            current: None,
            failure: None,
        }
    }

    pub fn config(&self) -> &ToolboxConfig {
        &self.config
    }

    /// True while edits are queued and not yet replayed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The structural error that stopped this toolbox, if any.
    pub fn failure(&self) -> Option<&ToolboxError> {
        self.failure.as_ref()
    }

    fn check(&self) -> ToolboxResult<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn enqueue(&mut self, edit: Edit) -> ToolboxResult<()> {
        self.check()?;
        log::trace!(target: "htmltoolbox.edit", "queued {}", edit.label());
        self.queue.push(edit);
        self.dirty = true;
        Ok(())
    }

    fn current_target(&self, op: &'static str) -> ToolboxResult<Target> {
        self.current
            .as_ref()
            .map(Target::from)
            .ok_or(ToolboxError::NoActiveMatch { op })
    }

    /// Replays queued edits in order and re-flattens the document.
    ///
    /// A structural error stops the replay and leaves the toolbox failed: this and every
    /// later call that needs a consistent tree returns the same error.
    pub fn apply(&mut self) -> ToolboxResult<()> {
        self.check()?;
        if !self.dirty {
            return Ok(());
        }
        let edits = std::mem::take(&mut self.queue);
        let count = edits.len();
        let mut outcome = Ok(());
        let mut editor = Editor::new(&mut self.arena, self.root, &self.config);
        for edit in edits {
            if let Err(err) = editor.apply(edit) {
                outcome = Err(err);
                break;
            }
        }
        if let Err(err) = &outcome {
            if err.is_structural() {
                log::error!(target: "htmltoolbox.apply", "edit replay failed: {err}");
                self.failure = Some(err.clone());
                return outcome;
            }
        }
        self.flat = flatten_document(&mut self.arena, self.root);
        self.dirty = false;
        self.matches.clear();
        self.current = None;
        log::debug!(
            target: "htmltoolbox.apply",
            "applied {count} edit(s); projection is {} bytes",
            self.flat.len()
        );
        outcome
    }

    // ----- matching ----------------------------------------------------------------------

    /// Flushes, then collects every match of `query`. Returns the number of matches.
    ///
    /// Matches are consumed with [`next_match`](Self::next_match).
    pub fn search(&mut self, query: impl Into<Query>) -> ToolboxResult<usize> {
        self.apply()?;
        let query = query.into();
        self.current = None;
        self.matches = match &query {
            Query::Elements => element_matches(&self.arena, self.root).into(),
            _ => {
                let mut locator = Locator::new();
                find_hits(&query, &self.flat)
                    .into_iter()
                    .filter_map(|hit| {
                        let span = locator.locate(&self.arena, self.root, hit.index, hit.len)?;
                        Some(Match {
                            index: hit.index - SENTINEL.len_utf8(),
                            text: hit.text,
                            groups: hit.groups,
                            start_node: span.start_node,
                            start_offset: span.start_offset,
                            end_node: span.end_node,
                            end_offset: span.end_offset,
                            kind: MatchKind::Text,
                        })
                    })
                    .collect()
            }
        };
        log::debug!(target: "htmltoolbox.apply", "search found {} match(es)", self.matches.len());
        Ok(self.matches.len())
    }

    /// Binds the next match as the current one. When the matches are exhausted the queued
    /// edits are applied and `None` is returned.
    pub fn next_match(&mut self) -> ToolboxResult<Option<Match>> {
        self.check()?;
        match self.matches.pop_front() {
            Some(m) => {
                self.current = Some(m.clone());
                Ok(Some(m))
            }
            None => {
                self.current = None;
                self.apply()?;
                Ok(None)
            }
        }
    }

    pub fn current_match(&self) -> Option<&Match> {
        self.current.as_ref()
    }

    // ----- edits ---------------------------------------------------------------------------

    /// Removes the current match.
    pub fn remove(&mut self) -> ToolboxResult<()> {
        let target = self.current_target("remove")?;
        self.enqueue(Edit::Remove { target })
    }

    /// Replaces the current match with `html`, attached to the start (`Begin`) or the end
    /// (`End`) of the removed range.
    pub fn replace(&mut self, html: &str, anchor: Anchor) -> ToolboxResult<()> {
        let target = self.current_target("replace")?;
        self.enqueue(Edit::Replace {
            target,
            html: html.to_string(),
            anchor,
        })
    }

    /// Inserts `html` at the start (`Begin`) or end (`End`) of the current match. For an
    /// element match, `Begin` inserts after the element and `End` before it.
    pub fn insert(&mut self, html: &str, anchor: Anchor) -> ToolboxResult<()> {
        let target = self.current_target("insert")?;
        self.enqueue(Edit::Insert {
            target,
            html: html.to_string(),
            anchor,
        })
    }

    /// Inserts `html` right after (`Begin`) or right before (`End`) `node`.
    pub fn insert_at(&mut self, node: NodeId, html: &str, anchor: Anchor) -> ToolboxResult<()> {
        self.enqueue(Edit::InsertAt {
            node,
            html: html.to_string(),
            anchor,
        })
    }

    /// Wraps the current match in `envelope`, which must contain exactly one `<!/>`.
    pub fn wrap(&mut self, envelope: &str) -> ToolboxResult<()> {
        let target = self.current_target("wrap")?;
        let placeholders = wrap_sites(envelope);
        if placeholders != 1 {
            return Err(ToolboxError::InvalidEnvelope { placeholders });
        }
        self.enqueue(Edit::Wrap {
            target,
            envelope: envelope.to_string(),
        })
    }

    /// Renames an element, or wraps a text node in a new element. Other nodes are left alone.
    pub fn set_tag(&mut self, node: NodeId, tag: &str) -> ToolboxResult<()> {
        self.enqueue(Edit::SetTag {
            node,
            tag: tag.to_string(),
        })
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> ToolboxResult<()> {
        self.enqueue(Edit::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn remove_all(&mut self, query: impl Into<Query>) -> ToolboxResult<usize> {
        let count = self.search(query)?;
        while self.next_match()?.is_some() {
            self.remove()?;
        }
        Ok(count)
    }

    pub fn replace_all(
        &mut self,
        query: impl Into<Query>,
        html: &str,
        anchor: Anchor,
    ) -> ToolboxResult<usize> {
        let count = self.search(query)?;
        while self.next_match()?.is_some() {
            self.replace(html, anchor)?;
        }
        Ok(count)
    }

    pub fn wrap_all(&mut self, query: impl Into<Query>, envelope: &str) -> ToolboxResult<usize> {
        let placeholders = wrap_sites(envelope);
        if placeholders != 1 {
            return Err(ToolboxError::InvalidEnvelope { placeholders });
        }
        let count = self.search(query)?;
        while self.next_match()?.is_some() {
            self.wrap(envelope)?;
        }
        Ok(count)
    }

    // ----- output ------------------------------------------------------------------------

    /// The rendered text of the document.
    pub fn text(&mut self) -> ToolboxResult<&str> {
        self.apply()?;
        Ok(self.flat.get(SENTINEL.len_utf8()..).unwrap_or_default())
    }

    /// Serialized markup. `None` writes compactly; `Some(unit)` puts every node on its own
    /// line indented by `unit` per level.
    pub fn html(&mut self, indent: Option<&str>) -> ToolboxResult<String> {
        self.apply()?;
        Ok(serialize(&self.arena, self.root, &self.config, indent))
    }

    // ----- inspection (state as of the last flush) -------------------------------------

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.try_get(id)
    }

    /// Depth-first steps over the whole tree.
    pub fn steps(&self) -> Walk<'_> {
        Walk::all(&self.arena, self.root)
    }

    /// Renderable nodes in rendered order.
    pub fn rendered(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        std::iter::successors(self.arena.get(self.root).next(), |id| {
            self.arena.get(*id).next()
        })
        .map(|id| (id, self.arena.get(id)))
    }

    pub fn outline(&self) -> Vec<String> {
        debug::outline(&self.arena, self.root)
    }

    pub fn traverse_lines(&self) -> Vec<String> {
        debug::traverse_lines(&self.arena, self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_need_an_active_match() {
        let mut tb = HtmlToolbox::new("abc");
        assert_eq!(tb.remove(), Err(ToolboxError::NoActiveMatch { op: "remove" }));
        assert_eq!(
            tb.replace("x", Anchor::Begin),
            Err(ToolboxError::NoActiveMatch { op: "replace" })
        );
        assert_eq!(tb.search("b"), Ok(1));
        assert_eq!(tb.wrap("<i><!/></i>"), Err(ToolboxError::NoActiveMatch { op: "wrap" }));
    }

    #[test]
    fn cursor_binds_matches_and_flushes_when_exhausted() {
        let mut tb = HtmlToolbox::new("<p>one two one</p>");
        assert_eq!(tb.search("one"), Ok(2));
        let first = tb.next_match().expect("cursor").expect("first match");
        assert_eq!((first.index, first.text.as_str()), (0, "one"));
        assert_eq!(tb.current_match(), Some(&first));
        tb.remove().expect("queued");
        assert!(tb.is_dirty());
        assert!(tb.next_match().expect("cursor").is_some());
        assert_eq!(tb.next_match(), Ok(None));
        assert!(!tb.is_dirty());
        assert_eq!(tb.current_match(), None);
        assert_eq!(tb.text(), Ok("two one"));
    }

    #[test]
    fn wrap_validates_the_envelope_up_front() {
        let mut tb = HtmlToolbox::new("abc");
        assert_eq!(tb.search("b"), Ok(1));
        assert!(tb.next_match().expect("cursor").is_some());
        assert_eq!(
            tb.wrap("<i></i>"),
            Err(ToolboxError::InvalidEnvelope { placeholders: 0 })
        );
        assert_eq!(
            tb.wrap("<i><!/><!/></i>"),
            Err(ToolboxError::InvalidEnvelope { placeholders: 2 })
        );
        assert!(!tb.is_dirty());
    }

    #[test]
    fn structural_failure_poisons_the_toolbox() {
        let mut tb = HtmlToolbox::new("abc");
        assert_eq!(tb.search("b"), Ok(1));
        assert!(tb.next_match().expect("cursor").is_some());
        tb.remove().expect("queued");
        let root = tb.root;
        if let Some(body) = tb.arena.get_mut(root).body_mut() {
            body.clear();
        }
        let err = tb.apply();
        assert!(matches!(err, Err(ToolboxError::NodeNotInParent { .. })));
        assert_eq!(tb.failure().cloned(), err.err());
        assert!(tb.text().is_err());
        assert!(tb.set_tag(root, "p").is_err());
    }

    #[test]
    fn element_query_yields_every_element() {
        let mut tb = HtmlToolbox::new("<div><p>a</p><!-- c --><img></div>");
        assert_eq!(tb.search(Query::Elements), Ok(3));
        let kinds: Vec<MatchKind> = std::iter::from_fn(|| tb.next_match().ok().flatten())
            .map(|m| m.kind)
            .collect();
        assert_eq!(kinds, vec![MatchKind::Element; 3]);
    }

    #[test]
    fn rendered_iterator_follows_projection_order() {
        let tb = HtmlToolbox::new("a<b>c</b>");
        let values: Vec<&str> = tb
            .rendered()
            .filter_map(|(_, node)| node.value())
            .collect();
        assert_eq!(values, vec!["a", "", "c", ""]);
        assert!(tb.node(tb.root()).is_some());
        assert!(tb.steps().count() > 0);
    }
}
