use std::collections::{BTreeMap, BTreeSet};

/// Rendering and editing policy for one toolbox.
///
/// Tag names are compared in ASCII lowercase. The defaults render block-like tags with a
/// newline, table cells with a tab, inline tags with nothing and everything else with a space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolboxConfig {
    /// Separator rendered at the start and end of each listed tag.
    pub separators: BTreeMap<String, String>,
    /// Separator for tags missing from `separators`.
    pub default_separator: String,
    /// Tags represented as `[Sep, Text("\n"), Sep]`.
    pub line_break_tags: BTreeSet<String>,
    /// Tags serialized without a closing tag.
    pub no_close_tags: BTreeSet<String>,
    /// Tags whose text is neither entity decoded nor encoded.
    pub raw_tags: BTreeSet<String>,
    /// Remove containers emptied by an edit.
    pub delete_empty: bool,
    /// Decode non-breaking spaces as plain spaces.
    pub convert_nbsp_to_space: bool,
    /// Render `input` values as text content.
    pub process_input_values: bool,
}

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdo", "big", "br", "cite", "dfn", "em", "hr", "i", "kbd",
    "span", "sub", "sup", "script", "style",
];
const BLOCK_TAGS: &[&str] = &["div", "h1", "h2", "h3", "h4", "quote", "p", "tr"];
const LINE_BREAK_TAGS: &[&str] = &["br", "hr"];
const VOID_TAGS: &[&str] = &["img", "input"];
const RAW_TAGS: &[&str] = &["script", "style"];

impl Default for ToolboxConfig {
    fn default() -> Self {
        let mut separators = BTreeMap::new();
        for tag in INLINE_TAGS {
            separators.insert((*tag).to_string(), String::new());
        }
        for tag in BLOCK_TAGS {
            separators.insert((*tag).to_string(), "\n".to_string());
        }
        separators.insert("q".to_string(), "\"".to_string());
        separators.insert("td".to_string(), "\t".to_string());

        let line_break_tags: BTreeSet<String> =
            LINE_BREAK_TAGS.iter().map(|t| t.to_string()).collect();
        let mut no_close_tags = line_break_tags.clone();
        no_close_tags.extend(VOID_TAGS.iter().map(|t| t.to_string()));

        Self {
            separators,
            default_separator: " ".to_string(),
            line_break_tags,
            no_close_tags,
            raw_tags: RAW_TAGS.iter().map(|t| t.to_string()).collect(),
            delete_empty: true,
            convert_nbsp_to_space: false,
            process_input_values: true,
        }
    }
}

impl ToolboxConfig {
    pub fn with_separator(mut self, tag: &str, separator: &str) -> Self {
        self.separators
            .insert(tag.to_ascii_lowercase(), separator.to_string());
        self
    }

    pub fn with_default_separator(mut self, separator: &str) -> Self {
        self.default_separator = separator.to_string();
        self
    }

    /// Registers a line-break tag; line-break tags are never closed.
    pub fn with_line_break_tag(mut self, tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        self.no_close_tags.insert(tag.clone());
        self.line_break_tags.insert(tag);
        self
    }

    pub fn with_raw_tag(mut self, tag: &str) -> Self {
        self.raw_tags.insert(tag.to_ascii_lowercase());
        self
    }

    pub fn with_delete_empty(mut self, on: bool) -> Self {
        self.delete_empty = on;
        self
    }

    pub fn with_convert_nbsp_to_space(mut self, on: bool) -> Self {
        self.convert_nbsp_to_space = on;
        self
    }

    pub fn with_process_input_values(mut self, on: bool) -> Self {
        self.process_input_values = on;
        self
    }

    pub fn separator_for(&self, tag: &str) -> &str {
        self.separators
            .get(tag)
            .map(String::as_str)
            .unwrap_or(&self.default_separator)
    }

    pub fn is_line_break(&self, tag: &str) -> bool {
        self.line_break_tags.contains(tag)
    }

    pub fn is_no_close(&self, tag: &str) -> bool {
        self.no_close_tags.contains(tag)
    }

    pub fn is_raw(&self, tag: &str) -> bool {
        self.raw_tags.contains(tag)
    }

    /// `input` elements whose value is rendered as text.
    pub(crate) fn renders_value(&self, tag: &str) -> bool {
        self.process_input_values && tag == "input"
    }
}
