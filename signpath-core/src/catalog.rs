//! Immutable lesson catalog, loaded once at startup.
//!
//! ```toml
//! [[lessons]]
//! id = 1
//! title = "Alphabet A-E"
//! category = "alphabet"
//! experience_points = 15
//! estimated_minutes = 5
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("lesson {0} is defined more than once")]
    DuplicateLesson(u32),
}

fn default_experience_points() -> u32 {
    10
}

fn default_estimated_minutes() -> u32 {
    5
}

fn default_total_points() -> u32 {
    100
}

/// A lesson as far as progress tracking is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: u32,
    pub title: String,
    pub category: String,
    #[serde(default = "default_experience_points")]
    pub experience_points: u32,
    #[serde(default = "default_estimated_minutes")]
    pub estimated_minutes: u32,
    /// Maximum achievable score.
    #[serde(default = "default_total_points")]
    pub total_points: u32,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    lessons: Vec<Lesson>,
}

/// Lessons keyed by id.
#[derive(Debug, Clone, Default)]
pub struct LessonCatalog {
    lessons: BTreeMap<u32, Lesson>,
}

impl LessonCatalog {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a list, rejecting duplicate ids.
    pub fn from_lessons(lessons: impl IntoIterator<Item = Lesson>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for lesson in lessons {
            let id = lesson.id;
            if map.insert(id, lesson).is_some() {
                return Err(CatalogError::DuplicateLesson(id));
            }
        }
        Ok(Self { lessons: map })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_lessons(file.lessons)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Lesson> {
        self.lessons.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lesson> {
        self.lessons.values()
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Lesson> {
        self.lessons.values().filter(move |l| l.category == category)
    }

    /// Distinct category names, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.lessons.values().map(|l| l.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[lessons]]
id = 1
title = "Alphabet A-E"
category = "alphabet"
experience_points = 15
estimated_minutes = 6

[[lessons]]
id = 2
title = "Hello and goodbye"
category = "greetings"

[[lessons]]
id = 3
title = "Alphabet F-J"
category = "alphabet"
total_points = 50
"#;

    #[test]
    fn parses_lessons_with_defaults() {
        let catalog = LessonCatalog::from_toml_str(SAMPLE).unwrap();

        assert_eq!(catalog.len(), 3);
        let first = catalog.get(1).unwrap();
        assert_eq!(first.experience_points, 15);
        assert_eq!(first.estimated_minutes, 6);
        assert_eq!(first.total_points, 100);

        let second = catalog.get(2).unwrap();
        assert_eq!(second.experience_points, 10);
        assert_eq!(second.estimated_minutes, 5);

        assert_eq!(catalog.get(3).unwrap().total_points, 50);
        assert!(catalog.get(99).is_none());
    }

    #[test]
    fn groups_by_category() {
        let catalog = LessonCatalog::from_toml_str(SAMPLE).unwrap();

        assert_eq!(catalog.categories(), vec!["alphabet", "greetings"]);
        let ids: Vec<u32> = catalog.by_category("alphabet").map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let toml = r#"
[[lessons]]
id = 1
title = "a"
category = "x"

[[lessons]]
id = 1
title = "b"
category = "y"
"#;
        let err = LessonCatalog::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateLesson(1)));
    }

    #[test]
    fn empty_document_is_an_empty_catalog() {
        let catalog = LessonCatalog::from_toml_str("").unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let catalog = LessonCatalog::load(file.path()).unwrap();

        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = LessonCatalog::load(Path::new("/nonexistent/lessons.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
