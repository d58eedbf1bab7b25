//! Course structure: modules of ordered lessons

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A playable lesson backed by one channel message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Source message id, used to re-fetch the media
    pub id: i64,
    /// Display title
    pub title: String,
}

/// A named group of lessons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub lessons: Vec<Lesson>,
}

/// Immutable, insertion-ordered mapping from module name to module.
///
/// Built once by [`CourseBuilder::finish`]; no module is empty and lessons
/// keep the arrival order of their messages.
#[derive(Debug, Clone, Default)]
pub struct CourseStructure {
    modules: IndexMap<String, Module>,
    lesson_index: HashMap<i64, usize>,
}

impl CourseStructure {
    /// Modules in insertion order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Module by name
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Look up a lesson and the module containing it
    pub fn lesson(&self, id: i64) -> Option<(&Module, &Lesson)> {
        let (_, module) = self.modules.get_index(*self.lesson_index.get(&id)?)?;
        let lesson = module.lessons.iter().find(|l| l.id == id)?;
        Some((module, lesson))
    }

    pub fn contains_lesson(&self, id: i64) -> bool {
        self.lesson_index.contains_key(&id)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn lesson_count(&self) -> usize {
        self.lesson_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// True when the whole course sits in a single module called `default_module`
    /// (the channel had no recognizable headers)
    pub fn is_flat(&self, default_module: &str) -> bool {
        self.modules.len() == 1 && self.modules.contains_key(default_module)
    }
}

impl Serialize for CourseStructure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.modules.values())
    }
}

/// Accumulator folding classified messages into a course structure
#[derive(Debug)]
pub struct CourseBuilder {
    current: String,
    modules: IndexMap<String, Vec<Lesson>>,
}

impl CourseBuilder {
    /// Start with the cursor on `default_module`
    pub fn new(default_module: impl Into<String>) -> Self {
        let current = default_module.into();
        let mut modules = IndexMap::new();
        modules.insert(current.clone(), Vec::new());
        Self { current, modules }
    }

    /// Move the cursor to `name`, creating the module if it is new
    pub fn start_module(&mut self, name: String) {
        self.modules.entry(name.clone()).or_default();
        self.current = name;
    }

    /// Append a lesson to the current module
    pub fn push_lesson(&mut self, lesson: Lesson) {
        self.modules
            .entry(self.current.clone())
            .or_default()
            .push(lesson);
    }

    /// Name of the module that receives the next lesson
    pub fn current_module(&self) -> &str {
        &self.current
    }

    /// Prune empty modules and freeze
    pub fn finish(self) -> CourseStructure {
        let modules: IndexMap<String, Module> = self
            .modules
            .into_iter()
            .filter(|(_, lessons)| !lessons.is_empty())
            .map(|(name, lessons)| (name.clone(), Module { name, lessons }))
            .collect();

        let lesson_index = modules
            .values()
            .enumerate()
            .flat_map(|(idx, module)| module.lessons.iter().map(move |l| (l.id, idx)))
            .collect();

        CourseStructure {
            modules,
            lesson_index,
        }
    }
}
