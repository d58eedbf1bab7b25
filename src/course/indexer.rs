//! Content indexer
//!
//! Folds the chronological message stream into a [`CourseStructure`]. The
//! traversal state (current module cursor and partial structure) lives in
//! a local [`CourseBuilder`] and the result is returned frozen.

use super::classify::{classify, Classification, HeaderRules};
use super::structure::{CourseBuilder, CourseStructure};
use crate::config::IndexerConfig;
use crate::connector::{ChannelConnector, Message};
use crate::error::Result;

/// Builds course structures from channel history
#[derive(Debug, Clone)]
pub struct Indexer {
    rules: HeaderRules,
    default_module: String,
}

impl Indexer {
    pub fn new(config: &IndexerConfig) -> Result<Self> {
        Ok(Self {
            rules: HeaderRules::new(config)?,
            default_module: config.default_module.clone(),
        })
    }

    /// Name of the module receiving lessons seen before any header
    pub fn default_module(&self) -> &str {
        &self.default_module
    }

    /// Index messages already in chronological (oldest first) order
    pub fn index<'a, I>(&self, messages: I) -> CourseStructure
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut builder = CourseBuilder::new(self.default_module.clone());

        for message in messages {
            match classify(message, &self.rules) {
                Classification::ModuleHeader(name) => {
                    tracing::trace!(id = message.id, module = %name, "Module header");
                    builder.start_module(name);
                }
                Classification::VideoLesson(lesson) => {
                    tracing::trace!(
                        id = lesson.id,
                        module = builder.current_module(),
                        title = %lesson.title,
                        "Lesson"
                    );
                    builder.push_lesson(lesson);
                }
                Classification::Ignored => {
                    tracing::trace!(id = message.id, "Skipped message");
                }
            }
        }

        builder.finish()
    }

    /// Fetch the full channel history once and index it
    pub async fn build(&self, connector: &dyn ChannelConnector) -> Result<CourseStructure> {
        let mut messages = connector.fetch_messages().await?;
        // Connectors promise oldest-first; ids increase with arrival order.
        messages.sort_by_key(|m| m.id);

        let course = self.index(&messages);
        tracing::info!(
            messages = messages.len(),
            modules = course.module_count(),
            lessons = course.lesson_count(),
            "Indexed course"
        );
        Ok(course)
    }
}
