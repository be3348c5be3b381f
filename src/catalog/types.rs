//! Core catalog types: projects, templates, and the task identity key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A project from the external catalog.
///
/// Projects are immutable for the duration of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier within the catalog.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Free-text description supplied to generation prompts.
    #[serde(default)]
    pub description: String,
}

/// A reusable document template from the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier within the catalog.
    pub id: String,
    /// Display names keyed by language code (e.g. "en", "es").
    #[serde(default)]
    pub display_names: BTreeMap<String, String>,
    /// Primary generation prompt.
    pub prompt: String,
    /// Optional auxiliary-spec prompt. When absent, the auxiliary stages
    /// are skipped entirely.
    #[serde(default)]
    pub aux_prompt: Option<String>,
}

impl Template {
    /// Display name for the given language, falling back to the template id.
    pub fn display_name(&self, language: &str) -> &str {
        self.display_names
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Identity of one (project, template) unit of work.
///
/// The durable textual form is `"project::template"`, used inside progress
/// snapshots. In memory the pair stays fully typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    pub project: String,
    pub template: String,
}

impl TaskId {
    pub fn new(project: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            template: template.into(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.project, self.template)
    }
}

/// Error parsing a durable task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTaskIdError(String);

impl fmt::Display for ParseTaskIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid task id '{}': expected 'project::template'", self.0)
    }
}

impl std::error::Error for ParseTaskIdError {}

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("::") {
            Some((project, template)) if !project.is_empty() && !template.is_empty() => {
                Ok(Self::new(project, template))
            }
            _ => Err(ParseTaskIdError(s.to_string())),
        }
    }
}
