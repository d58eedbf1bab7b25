//! Course outline reconstruction
//!
//! Rebuilds modules and lessons from the flat channel history:
//! [`classify`] tags each message, [`Indexer`] folds the tags into a
//! [`CourseStructure`], and [`normalize_title`] cleans lesson names.

mod classify;
mod indexer;
mod structure;
mod title;

pub use classify::{classify, Classification, HeaderRules};
pub use indexer::Indexer;
pub use structure::{CourseBuilder, CourseStructure, Lesson, Module};
pub use title::{normalize_title, FALLBACK_TITLE};
