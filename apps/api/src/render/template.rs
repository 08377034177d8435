//! Portfolio template: a strict set of named slots and named repeat regions.
//!
//! Surface syntax:
//! - `{{ name }}` is a scalar slot.
//! - `{% for item in name %} ... {% endfor %}` is a repeat region named `name`. Its body
//!   is only a design-time placeholder; rendering replaces the whole region with the
//!   fragments supplied for `name`.
//!
//! Anything else inside `{{ }}` / `{% %}` at the top level is an error, and every slot and
//! region must be resolvable at render time. There is no expression evaluation.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated tag starting at byte {0}")]
    Unterminated(usize),

    #[error("unsupported tag '{0}'")]
    UnsupportedTag(String),

    #[error("'endfor' without a matching 'for' at byte {0}")]
    UnmatchedEndFor(usize),

    #[error("repeat region '{0}' is never closed")]
    UnclosedRegion(String),

    #[error("repeat region '{inner}' is nested inside '{outer}'")]
    NestedRegion { outer: String, inner: String },

    #[error("template references unknown slot '{0}'")]
    UnknownSlot(String),

    #[error("template references unknown repeat region '{0}'")]
    UnknownRegion(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
    Region(String),
}

/// A parsed template, ready to be rendered any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

/// Lookup table of values for one render.
#[derive(Debug, Default, Clone)]
pub struct RenderContext {
    slots: HashMap<String, String>,
    regions: HashMap<String, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(mut self, name: &str, value: impl Into<String>) -> Self {
        self.slots.insert(name.to_string(), value.into());
        self
    }

    /// Sets a repeat region's replacement to the concatenation of `fragments`.
    pub fn region<I, S>(mut self, name: &str, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = fragments
            .into_iter()
            .fold(String::new(), |mut acc, fragment| {
                acc.push_str(fragment.as_ref());
                acc
            });
        self.regions.insert(name.to_string(), joined);
        self
    }
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut open_region: Option<String> = None;
        let mut text = String::new();
        let mut cursor = 0;

        while let Some(found) = next_tag(source, cursor) {
            let (start, kind) = found;
            let close = match kind {
                TagKind::Slot => "}}",
                TagKind::Block => "%}",
            };
            let inner_start = start + 2;
            let inner_len = source[inner_start..]
                .find(close)
                .ok_or(TemplateError::Unterminated(start))?;
            let inner = source[inner_start..inner_start + inner_len].trim();
            let end = inner_start + inner_len + close.len();

            if open_region.is_none() {
                text.push_str(&source[cursor..start]);
            }

            match kind {
                // Slots inside a region body belong to the placeholder body and are dropped.
                TagKind::Slot if open_region.is_some() => {}
                TagKind::Slot => {
                    flush_text(&mut segments, &mut text);
                    segments.push(Segment::Slot(inner.to_string()));
                }
                TagKind::Block => match parse_block(inner)? {
                    Block::For(name) => {
                        if let Some(outer) = open_region.take() {
                            return Err(TemplateError::NestedRegion { outer, inner: name });
                        }
                        flush_text(&mut segments, &mut text);
                        open_region = Some(name);
                    }
                    Block::EndFor => match open_region.take() {
                        Some(name) => segments.push(Segment::Region(name)),
                        None => return Err(TemplateError::UnmatchedEndFor(start)),
                    },
                },
            }

            cursor = end;
        }

        if let Some(name) = open_region {
            return Err(TemplateError::UnclosedRegion(name));
        }

        text.push_str(&source[cursor..]);
        flush_text(&mut segments, &mut text);

        Ok(Self { segments })
    }

    /// Names of all scalar slots, sorted.
    pub fn slot_names(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Slot(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Names of all repeat regions, sorted.
    pub fn region_names(&self) -> BTreeSet<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Region(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn render(&self, context: &RenderContext) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => out.push_str(
                    context
                        .slots
                        .get(name)
                        .ok_or_else(|| TemplateError::UnknownSlot(name.clone()))?,
                ),
                Segment::Region(name) => out.push_str(
                    context
                        .regions
                        .get(name)
                        .ok_or_else(|| TemplateError::UnknownRegion(name.clone()))?,
                ),
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy)]
enum TagKind {
    Slot,
    Block,
}

enum Block {
    For(String),
    EndFor,
}

fn next_tag(source: &str, from: usize) -> Option<(usize, TagKind)> {
    let slot = source[from..].find("{{").map(|i| (from + i, TagKind::Slot));
    let block = source[from..].find("{%").map(|i| (from + i, TagKind::Block));
    match (slot, block) {
        (Some(s), Some(b)) => Some(if s.0 < b.0 { s } else { b }),
        (s, b) => s.or(b),
    }
}

fn parse_block(inner: &str) -> Result<Block, TemplateError> {
    let words: Vec<&str> = inner.split_whitespace().collect();
    match words.as_slice() {
        ["for", _item, "in", name] => Ok(Block::For((*name).to_string())),
        ["endfor"] => Ok(Block::EndFor),
        _ => Err(TemplateError::UnsupportedTag(inner.to_string())),
    }
}

fn flush_text(segments: &mut Vec<Segment>, text: &mut String) {
    if !text.is_empty() {
        segments.push(Segment::Text(std::mem::take(text)));
    }
}
