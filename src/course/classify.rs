//! Message classification
//!
//! Decides what role a single channel message plays in the course outline.
//! Pure: no state, no I/O.

use super::structure::Lesson;
use super::title::{normalize_title, strip_leading_separators};
use crate::config::IndexerConfig;
use crate::connector::Message;
use crate::error::{Error, Result};
use regex::Regex;

/// Role of a message in the course outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Starts a new module with the given name
    ModuleHeader(String),
    /// A playable lesson
    VideoLesson(Lesson),
    /// Anything else
    Ignored,
}

/// Heuristics used to recognize module headers
#[derive(Debug, Clone)]
pub struct HeaderRules {
    marker: Option<Regex>,
    max_len: usize,
}

impl HeaderRules {
    /// Build rules from the indexer configuration
    pub fn new(config: &IndexerConfig) -> Result<Self> {
        let marker = config.module_marker.trim();
        let marker = if marker.is_empty() {
            None
        } else {
            // Anchor on a word boundary so "Submodule:" keeps its text.
            let boundary = if marker.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
                r"\b"
            } else {
                ""
            };
            let pattern = format!("(?i){}{}", boundary, regex::escape(marker));
            Some(Regex::new(&pattern).map_err(|e| {
                Error::Config(format!("Invalid module marker '{}': {}", marker, e))
            })?)
        };

        Ok(Self {
            marker,
            max_len: config.header_max_len,
        })
    }

    fn has_marker(&self, text: &str) -> bool {
        self.marker.as_ref().is_some_and(|m| m.is_match(text))
    }

    fn is_short_note(&self, text: &str) -> bool {
        text.chars().count() < self.max_len && !looks_like_url(text)
    }

    /// Module name carried by a header text, if the text is a header
    fn header_name(&self, text: &str) -> Option<String> {
        if !(self.has_marker(text) || self.is_short_note(text)) {
            return None;
        }
        let without_marker = match &self.marker {
            Some(marker) => marker.replace_all(text, "").into_owned(),
            None => text.to_string(),
        };
        let name = strip_leading_separators(&without_marker).trim().to_string();
        (!name.is_empty()).then_some(name)
    }
}

fn looks_like_url(text: &str) -> bool {
    text.get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"))
}

/// Classify one message. Media is checked before text.
pub fn classify(message: &Message, rules: &HeaderRules) -> Classification {
    if let Some(media) = &message.media {
        if !media.is_video() {
            return Classification::Ignored;
        }
        let raw_name = media
            .file_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Lesson {}", message.id));
        return Classification::VideoLesson(Lesson {
            id: message.id,
            title: normalize_title(Some(&raw_name)),
        });
    }

    let text = match message.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return Classification::Ignored,
    };

    match rules.header_name(text) {
        Some(name) => Classification::ModuleHeader(name),
        None => Classification::Ignored,
    }
}
