//! Closed-slot SQL templates
//!
//! Templates use `$`-placeholders: `${name}` or `$name`, with `$$` for a
//! literal dollar sign. Each template kind accepts a fixed set of slots; any
//! other placeholder is rejected when the template is parsed, and rendering
//! fails unless every slot used by the template has a value.

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Slot name -> rendered text
pub type Substitutions = IndexMap<String, String>;

/// Slot names
pub mod slot {
    pub const SOURCE: &str = "source";
    pub const DERIVED_COLUMNS: &str = "derived_columns";
    pub const HASHED_HUBS_PRIMARY_KEY: &str = "hashed_hubs_primary_key";
    pub const ALIAS_COLUMNS: &str = "alias_columns";
    pub const HASHED_LINKS: &str = "hashed_links";
    pub const HASHDIFF: &str = "hashdiff";

    pub const HASHDIFF_NAME: &str = "hashdiff_name";
    pub const COLUMNS: &str = "columns";
}

const STAGING_SLOTS: &[&str] = &[
    slot::SOURCE,
    slot::DERIVED_COLUMNS,
    slot::HASHED_HUBS_PRIMARY_KEY,
    slot::ALIAS_COLUMNS,
    slot::HASHED_LINKS,
    slot::HASHDIFF,
];

const SAT_HASHDIFF_SLOTS: &[&str] = &[slot::HASHDIFF_NAME, slot::COLUMNS];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$(?:(?P<escaped>\$)|\{(?P<braced>[_A-Za-z][_A-Za-z0-9]*)\}|(?P<named>[_A-Za-z][_A-Za-z0-9]*)|(?P<invalid>))",
    )
    .unwrap()
});

/// The templates the generator knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Staging model (stg_*.sql)
    Staging,

    /// One satellite hash diff entry
    SatHashdiff,
}

impl TemplateKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::SatHashdiff => "sat_hashdiff",
        }
    }

    /// Slots this template kind accepts
    pub fn slots(&self) -> &'static [&'static str] {
        match self {
            Self::Staging => STAGING_SLOTS,
            Self::SatHashdiff => SAT_HASHDIFF_SLOTS,
        }
    }

    fn slot(&self, name: &str) -> Option<&'static str> {
        self.slots().iter().copied().find(|slot| *slot == name)
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(&'static str),
}

/// A parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    kind: TemplateKind,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text, rejecting placeholders the kind does not define
    pub fn parse(kind: TemplateKind, text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            literal.push_str(&text[last..whole.start()]);
            last = whole.end();

            if caps.name("escaped").is_some() {
                literal.push('$');
                continue;
            }

            let Some(name) = caps.name("braced").or_else(|| caps.name("named")) else {
                let (line, column) = line_and_column(text, whole.start());
                return Err(TemplateError::InvalidPlaceholder { kind, line, column });
            };

            let slot = kind.slot(name.as_str()).ok_or_else(|| TemplateError::UnknownPlaceholder {
                kind,
                placeholder: name.as_str().to_string(),
            })?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Slot(slot));
        }

        literal.push_str(&text[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { kind, segments })
    }

    /// Slots referenced by this template, in order of first use
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for segment in &self.segments {
            if let Segment::Slot(name) = segment {
                if !seen.contains(name) {
                    seen.push(*name);
                }
            }
        }
        seen
    }

    /// Fill every slot from `substitutions`
    pub fn render(&self, substitutions: &Substitutions) -> Result<String, TemplateError> {
        if let Some(unknown) = substitutions.keys().find(|key| self.kind.slot(key).is_none()) {
            return Err(TemplateError::UnknownSubstitution {
                kind: self.kind,
                name: unknown.clone(),
            });
        }

        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Slot(name) => {
                    let value = substitutions.get(*name).ok_or(TemplateError::MissingSubstitution {
                        kind: self.kind,
                        name: *name,
                    })?;
                    rendered.push_str(value);
                }
            }
        }

        Ok(rendered)
    }
}

/// 1-indexed line and column of a byte offset
fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map(|newline| before[newline + 1..].chars().count())
        .unwrap_or_else(|| before.chars().count())
        + 1;
    (line, column)
}

/// Template errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown placeholder '${{{placeholder}}}' in {kind} template")]
    UnknownPlaceholder { kind: TemplateKind, placeholder: String },

    #[error("Invalid placeholder in {kind} template at line {line}, column {column}")]
    InvalidPlaceholder { kind: TemplateKind, line: usize, column: usize },

    #[error("No value for placeholder '{name}' in {kind} template")]
    MissingSubstitution { kind: TemplateKind, name: &'static str },

    #[error("'{name}' is not a placeholder of the {kind} template")]
    UnknownSubstitution { kind: TemplateKind, name: String },
}
