//! Local course library
//!
//! Keeps the list of known courses in `courses.json`, keyed by a short id.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A course registered in the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseEntry {
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// Where the course channel is read from
    pub source: SourceConfig,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

/// Course library backed by a JSON file
#[derive(Debug)]
pub struct CourseLibrary {
    path: PathBuf,
    courses: BTreeMap<String, CourseEntry>,
}

impl CourseLibrary {
    /// Load the library; a missing file is an empty library
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let courses = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, courses })
    }

    /// Write the library back to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.courses)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a course under `key`
    pub fn add(&mut self, key: &str, entry: CourseEntry) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::Library("Course id is required".to_string()));
        }
        if self.courses.contains_key(key) {
            return Err(Error::Library(format!("Course '{}' already exists", key)));
        }
        self.courses.insert(key.to_string(), entry);
        Ok(())
    }

    /// Remove a course, returning it if it existed
    pub fn remove(&mut self, key: &str) -> Option<CourseEntry> {
        self.courses.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&CourseEntry> {
        self.courses.get(key)
    }

    /// All courses, sorted by id
    pub fn list(&self) -> impl Iterator<Item = (&str, &CourseEntry)> {
        self.courses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Courses whose id, title or author contains `keyword` (case-insensitive)
    pub fn search(&self, keyword: &str) -> Vec<(&str, &CourseEntry)> {
        let keyword = keyword.trim().to_lowercase();
        self.list()
            .filter(|(key, entry)| {
                format!("{} {} {}", key, entry.title, entry.author)
                    .to_lowercase()
                    .contains(&keyword)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}
