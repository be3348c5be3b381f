//! JSON catalog loading for projects and templates.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use super::{Project, Template};
use crate::error::CatalogError;

/// Load the project catalog from a JSON array file.
pub fn load_projects(path: &Path) -> Result<Vec<Project>, CatalogError> {
    let projects: Vec<Project> = load_catalog(path)?;
    check_unique_ids(projects.iter().map(|p| p.id.as_str()))?;
    tracing::info!(path = %path.display(), count = projects.len(), "Project catalog loaded");
    Ok(projects)
}

/// Load the template catalog from a JSON array file.
pub fn load_templates(path: &Path) -> Result<Vec<Template>, CatalogError> {
    let templates: Vec<Template> = load_catalog(path)?;
    check_unique_ids(templates.iter().map(|t| t.id.as_str()))?;
    tracing::info!(path = %path.display(), count = templates.len(), "Template catalog loaded");
    Ok(templates)
}

fn load_catalog<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    let raw = fs::read_to_string(path)?;
    let entries: Vec<T> = serde_json::from_str(&raw)?;
    if entries.is_empty() {
        return Err(CatalogError::Empty(path.display().to_string()));
    }
    Ok(entries)
}

fn check_unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId(id.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_projects() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "projects.json",
            r#"[
                {"id": "p1", "name": "Project One", "description": "First"},
                {"id": "p2", "name": "Project Two"}
            ]"#,
        );

        let projects = load_projects(&path).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "p1");
        assert_eq!(projects[1].description, "");
    }

    #[test]
    fn test_load_templates_with_aux_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "templates.json",
            r#"[
                {"id": "t1", "prompt": "Write a spec", "aux_prompt": "Write an API sketch",
                 "display_names": {"en": "Spec"}},
                {"id": "t2", "prompt": "Write guidelines"}
            ]"#,
        );

        let templates = load_templates(&path).unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].aux_prompt.as_deref(), Some("Write an API sketch"));
        assert!(templates[1].aux_prompt.is_none());
    }

    #[test]
    fn test_load_rejects_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "projects.json", "[]");

        let err = load_projects(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Empty(_)));
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "templates.json",
            r#"[
                {"id": "t1", "prompt": "a"},
                {"id": "t1", "prompt": "b"}
            ]"#,
        );

        let err = load_templates(&path).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "t1"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_projects(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
