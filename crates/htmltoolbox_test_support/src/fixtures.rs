//! Data-driven projection and edit cases stored as TOML.
//!
//! ```toml
//! format = "htmltoolbox-projection-v1"
//!
//! [[cases]]
//! id = "remove-digits"
//! input = "<div>1 and 2</div>"
//! edits = [{ op = "remove", pattern = '\d' }]
//! text = "and"
//! html = "<div> and </div>"
//! ```
use crate::{diff_lines, escaped_lines};
use htmltoolbox::{Anchor, HtmlToolbox, Query, ToolboxConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const PROJECTION_FORMAT_V1: &str = "htmltoolbox-projection-v1";

#[derive(Clone, Debug, Deserialize)]
struct FixtureFile {
    format: String,
    cases: Vec<FixtureCase>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FixtureCase {
    pub id: String,
    pub input: String,
    #[serde(default)]
    pub config: FixtureConfig,
    #[serde(default)]
    pub edits: Vec<FixtureEdit>,
    /// Expected rendered text after all edits.
    pub text: Option<String>,
    /// Expected markup after all edits, serialized with `indent`.
    pub html: Option<String>,
    pub indent: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixtureConfig {
    pub delete_empty: Option<bool>,
    pub convert_nbsp_to_space: Option<bool>,
    pub process_input_values: Option<bool>,
    pub default_separator: Option<String>,
    #[serde(default)]
    pub separators: BTreeMap<String, String>,
    #[serde(default)]
    pub line_break_tags: Vec<String>,
}

impl FixtureConfig {
    pub fn build(&self) -> ToolboxConfig {
        let mut config = ToolboxConfig::default();
        if let Some(on) = self.delete_empty {
            config = config.with_delete_empty(on);
        }
        if let Some(on) = self.convert_nbsp_to_space {
            config = config.with_convert_nbsp_to_space(on);
        }
        if let Some(on) = self.process_input_values {
            config = config.with_process_input_values(on);
        }
        if let Some(separator) = &self.default_separator {
            config = config.with_default_separator(separator);
        }
        for (tag, separator) in &self.separators {
            config = config.with_separator(tag, separator);
        }
        for tag in &self.line_break_tags {
            config = config.with_line_break_tag(tag);
        }
        config
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureAnchor {
    #[default]
    Begin,
    End,
}

impl From<FixtureAnchor> for Anchor {
    fn from(anchor: FixtureAnchor) -> Self {
        match anchor {
            FixtureAnchor::Begin => Anchor::Begin,
            FixtureAnchor::End => Anchor::End,
        }
    }
}

/// One bulk edit applied to every match of `pattern` (a regular expression).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FixtureEdit {
    Remove {
        pattern: String,
    },
    Replace {
        pattern: String,
        html: String,
        #[serde(default)]
        anchor: FixtureAnchor,
    },
    Insert {
        pattern: String,
        html: String,
        #[serde(default)]
        anchor: FixtureAnchor,
    },
    Wrap {
        pattern: String,
        envelope: String,
    },
}

pub fn load_fixtures(path: &Path) -> Vec<FixtureCase> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read fixture file {path:?}: {err}"));
    let file: FixtureFile = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse fixture file {path:?}: {err}"));
    assert_eq!(
        file.format, PROJECTION_FORMAT_V1,
        "unsupported fixture format in {path:?}"
    );
    let mut seen = std::collections::BTreeSet::new();
    for case in &file.cases {
        assert!(
            seen.insert(case.id.as_str()),
            "duplicate fixture id in {path:?}: {}",
            case.id
        );
        assert!(
            case.text.is_some() || case.html.is_some(),
            "fixture '{}' in {path:?} checks neither text nor html",
            case.id
        );
    }
    file.cases
}

fn query(pattern: &str) -> Result<Query, String> {
    Query::pattern(pattern).map_err(|err| format!("invalid pattern {pattern:?}: {err}"))
}

fn apply_edit(tb: &mut HtmlToolbox, edit: &FixtureEdit) -> Result<(), String> {
    let outcome = match edit {
        FixtureEdit::Remove { pattern } => tb.remove_all(query(pattern)?),
        FixtureEdit::Replace {
            pattern,
            html,
            anchor,
        } => tb.replace_all(query(pattern)?, html, (*anchor).into()),
        FixtureEdit::Insert {
            pattern,
            html,
            anchor,
        } => {
            let result = tb.search(query(pattern)?);
            if let Ok(count) = result {
                for _ in 0..count {
                    tb.next_match().map_err(|err| err.to_string())?;
                    tb.insert(html, (*anchor).into())
                        .map_err(|err| err.to_string())?;
                }
            }
            result
        }
        FixtureEdit::Wrap { pattern, envelope } => tb.wrap_all(query(pattern)?, envelope),
    };
    outcome.map(|_| ()).map_err(|err| err.to_string())
}

/// Runs `case` and compares its outputs; the error describes every mismatch.
pub fn run_case(case: &FixtureCase) -> Result<(), String> {
    let mut tb = HtmlToolbox::with_config(&case.input, case.config.build());
    for edit in &case.edits {
        apply_edit(&mut tb, edit).map_err(|err| format!("[{}] edit failed: {err}", case.id))?;
    }
    let mut report = String::new();
    if let Some(expected) = &case.text {
        let actual = tb
            .text()
            .map_err(|err| format!("[{}] text failed: {err}", case.id))?;
        if actual != expected.as_str() {
            report.push_str(&format!(
                "[{}] text mismatch\n{}",
                case.id,
                diff_lines(&escaped_lines(expected), &escaped_lines(actual))
            ));
        }
    }
    if let Some(expected) = &case.html {
        let actual = tb
            .html(case.indent.as_deref())
            .map_err(|err| format!("[{}] html failed: {err}", case.id))?;
        if actual != *expected {
            report.push_str(&format!(
                "[{}] html mismatch\n{}",
                case.id,
                diff_lines(&escaped_lines(expected), &escaped_lines(&actual))
            ));
        }
    }
    if report.is_empty() { Ok(()) } else { Err(report) }
}
