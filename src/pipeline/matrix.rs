//! Task matrix construction.
//!
//! The matrix is the projects × templates cross product in stable
//! project-major, template-minor order, so resumed runs continue from the
//! same logical point instead of reshuffling work.

use crate::catalog::{Project, TaskId, Template};
use crate::store::ProgressStore;

/// One (project, template) unit of generation work.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub project: Project,
    pub template: Template,
}

impl GenerationTask {
    pub fn id(&self) -> TaskId {
        TaskId::new(self.project.id.clone(), self.template.id.clone())
    }
}

/// Pure builder over immutable catalogs. No side effects.
pub struct TaskMatrixBuilder {
    projects: Vec<Project>,
    templates: Vec<Template>,
}

impl TaskMatrixBuilder {
    pub fn new(projects: Vec<Project>, templates: Vec<Template>) -> Self {
        Self {
            projects,
            templates,
        }
    }

    /// The full ordered cross product.
    pub fn full_matrix(&self) -> Vec<GenerationTask> {
        let mut tasks = Vec::with_capacity(self.projects.len() * self.templates.len());
        for project in &self.projects {
            for template in &self.templates {
                tasks.push(GenerationTask {
                    project: project.clone(),
                    template: template.clone(),
                });
            }
        }
        tasks
    }

    /// The cross product minus tasks already marked complete.
    ///
    /// Completed ids that no longer appear in the catalogs are simply never
    /// consulted, which tolerates catalog shrinkage between runs.
    pub fn remaining(&self, progress: &ProgressStore) -> Vec<GenerationTask> {
        self.full_matrix()
            .into_iter()
            .filter(|task| !progress.contains(&task.id()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str) -> Project {
        Project {
            id: id.to_string(),
            name: format!("Project {}", id),
            description: String::new(),
        }
    }

    fn template(id: &str) -> Template {
        Template {
            id: id.to_string(),
            display_names: Default::default(),
            prompt: format!("Prompt for {}", id),
            aux_prompt: None,
        }
    }

    fn ids(tasks: &[GenerationTask]) -> Vec<String> {
        tasks.iter().map(|t| t.id().to_string()).collect()
    }

    #[test]
    fn test_matrix_order_is_project_major() {
        let builder = TaskMatrixBuilder::new(
            vec![project("p1"), project("p2")],
            vec![template("t1"), template("t2")],
        );

        assert_eq!(
            ids(&builder.full_matrix()),
            vec!["p1::t1", "p1::t2", "p2::t1", "p2::t2"]
        );
    }

    #[test]
    fn test_matrix_is_deterministic() {
        let builder = TaskMatrixBuilder::new(
            vec![project("p2"), project("p1")],
            vec![template("t2"), template("t1")],
        );

        // Catalog order is preserved as-is, and repeated calls agree.
        let first = ids(&builder.full_matrix());
        let second = ids(&builder.full_matrix());
        assert_eq!(first, second);
        assert_eq!(first, vec!["p2::t2", "p2::t1", "p1::t2", "p1::t1"]);
    }

    #[test]
    fn test_remaining_filters_completed() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = ProgressStore::load(dir.path().join("progress.json"));
        progress.mark_complete(TaskId::new("p1", "t1"));

        let builder = TaskMatrixBuilder::new(
            vec![project("p1"), project("p2")],
            vec![template("t1"), template("t2")],
        );

        assert_eq!(
            ids(&builder.remaining(&progress)),
            vec!["p1::t2", "p2::t1", "p2::t2"]
        );
    }

    #[test]
    fn test_remaining_ignores_unknown_completed_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = ProgressStore::load(dir.path().join("progress.json"));
        progress.mark_complete(TaskId::new("removed-project", "t1"));

        let builder = TaskMatrixBuilder::new(vec![project("p1")], vec![template("t1")]);

        assert_eq!(ids(&builder.remaining(&progress)), vec!["p1::t1"]);
    }

    #[test]
    fn test_remaining_empty_when_all_complete() {
        let dir = tempfile::tempdir().unwrap();
        let mut progress = ProgressStore::load(dir.path().join("progress.json"));
        progress.mark_complete(TaskId::new("p1", "t1"));

        let builder = TaskMatrixBuilder::new(vec![project("p1")], vec![template("t1")]);

        assert!(builder.remaining(&progress).is_empty());
    }
}
