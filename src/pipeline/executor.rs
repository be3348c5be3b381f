//! Per-task stage execution.
//!
//! Runs one task's ordered generation stages, assembles the record, and
//! persists it. Fatal failures are converted into structured results at
//! this boundary; nothing propagates past the executor to abort the run.

use std::sync::Arc;

use chrono::Utc;

use crate::error::LlmError;
use crate::llm::{GenerationClient, GenerationRequest, Message, Usage};
use crate::store::{RecordStore, TaskRecord};

use super::config::PipelineConfig;
use super::matrix::GenerationTask;
use super::rate_limit::RateLimiter;
use super::stats::TaskFailure;

/// System prompt for the main document stages.
const DOCUMENT_SYSTEM_PROMPT: &str = "You are a senior technical writer producing project \
documentation. Write complete, well-structured Markdown documents. Respond with the document \
body only, without commentary.";

/// System prompt for the auxiliary-spec stages.
const AUX_SYSTEM_PROMPT: &str = "You are a software architect writing concise supplementary \
specifications for project documentation. Respond with the specification body only.";

/// Successful outcome of one task.
#[derive(Debug)]
pub struct TaskOutcome {
    /// Id of the persisted record.
    pub record_id: i64,
    /// Token usage summed across all stages that ran.
    pub usage: Usage,
    /// True when the secondary-language stage fell back to primary content.
    pub degraded: bool,
}

/// Executes tasks stage by stage, gated by the rate limiter.
pub struct PipelineExecutor {
    client: Arc<dyn GenerationClient>,
    records: Arc<dyn RecordStore>,
    limiter: RateLimiter,
    config: PipelineConfig,
}

impl PipelineExecutor {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        records: Arc<dyn RecordStore>,
        config: PipelineConfig,
    ) -> Self {
        let limiter = RateLimiter::new(config.call_interval, config.failure_cooldown);
        Self {
            client,
            records,
            limiter,
            config,
        }
    }

    /// Execute one task to completion or isolated failure.
    ///
    /// Stage order is fixed: primary content, secondary-language content,
    /// then the two auxiliary-spec stages when the template defines an
    /// auxiliary prompt. Only a primary-stage or record-save failure is
    /// fatal for the task.
    pub async fn execute(&mut self, task: &GenerationTask) -> Result<TaskOutcome, TaskFailure> {
        let id = task.id();
        let primary_lang = self.config.primary_language.clone();
        let secondary_lang = self.config.secondary_language.clone();

        // Stage 1: primary generation. Fatal on failure; nothing partial is
        // written.
        let (content_primary, mut usage) = match self
            .run_stage(DOCUMENT_SYSTEM_PROMPT, document_prompt(task, &primary_lang))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                return Err(TaskFailure {
                    id,
                    message: format!("primary generation failed: {}", e),
                });
            }
        };

        // Stage 2: secondary-language regeneration. Degrades to the primary
        // content verbatim on failure.
        let mut degraded = false;
        let content_secondary = match self
            .run_stage(DOCUMENT_SYSTEM_PROMPT, document_prompt(task, &secondary_lang))
            .await
        {
            Ok((text, stage_usage)) => {
                usage.add(&stage_usage);
                text
            }
            Err(e) => {
                tracing::warn!(
                    task = %id,
                    language = secondary_lang.as_str(),
                    error = %e,
                    "Secondary-language generation failed, reusing primary content"
                );
                degraded = true;
                content_primary.clone()
            }
        };

        // Stages 3-4: auxiliary specs, only when the template defines one.
        // Failures leave the field empty and never fail the task.
        let (aux_primary, aux_secondary) = if let Some(aux_prompt) = &task.template.aux_prompt {
            let aux_primary = match self
                .run_stage(AUX_SYSTEM_PROMPT, aux_prompt_text(task, aux_prompt, &primary_lang, ""))
                .await
            {
                Ok((text, stage_usage)) => {
                    usage.add(&stage_usage);
                    text
                }
                Err(e) => {
                    tracing::warn!(
                        task = %id,
                        language = primary_lang.as_str(),
                        error = %e,
                        "Auxiliary-spec generation failed, storing empty field"
                    );
                    String::new()
                }
            };

            let aux_secondary = match self
                .run_stage(
                    AUX_SYSTEM_PROMPT,
                    aux_prompt_text(task, aux_prompt, &secondary_lang, &aux_primary),
                )
                .await
            {
                Ok((text, stage_usage)) => {
                    usage.add(&stage_usage);
                    text
                }
                Err(e) => {
                    tracing::warn!(
                        task = %id,
                        language = secondary_lang.as_str(),
                        error = %e,
                        "Auxiliary-spec generation failed, storing empty field"
                    );
                    String::new()
                }
            };

            (aux_primary, aux_secondary)
        } else {
            (String::new(), String::new())
        };

        let record = TaskRecord {
            project_id: task.project.id.clone(),
            template_id: task.template.id.clone(),
            content_primary,
            content_secondary,
            aux_primary,
            aux_secondary,
            created_at: Utc::now(),
            active: true,
        };

        // Record-save failure is fatal: the task stays incomplete and will
        // be retried on the next resumed run.
        let record_id = self.records.save(&record).await.map_err(|e| TaskFailure {
            id: id.clone(),
            message: format!("record save failed: {}", e),
        })?;

        Ok(TaskOutcome {
            record_id,
            usage,
            degraded,
        })
    }

    /// Extended wait after a task failure before the next task starts.
    pub async fn cooldown(&mut self) {
        self.limiter.cooldown().await;
    }

    /// One throttled generation call.
    async fn run_stage(
        &mut self,
        system_prompt: &str,
        user_prompt: String,
    ) -> Result<(String, Usage), LlmError> {
        self.limiter.throttle().await;

        let request = GenerationRequest::new(
            self.config.model.clone(),
            vec![Message::system(system_prompt), Message::user(user_prompt)],
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let response = self.client.generate(request).await?;
        Ok((response.content, response.usage))
    }
}

/// User prompt for the primary and secondary document stages.
fn document_prompt(task: &GenerationTask, language: &str) -> String {
    format!(
        "{}\n\nDocument type: {}\nProject: {}\n{}\n\nWrite the document in {}.",
        task.template.prompt,
        task.template.display_name(language),
        task.project.name,
        task.project.description,
        language
    )
}

/// User prompt for the auxiliary-spec stages. When primary-language
/// auxiliary output exists, the secondary stage receives it as reference.
fn aux_prompt_text(
    task: &GenerationTask,
    aux_prompt: &str,
    language: &str,
    reference: &str,
) -> String {
    let mut prompt = format!(
        "{}\n\nProject: {}\n{}\n\nWrite the specification in {}.",
        aux_prompt, task.project.name, task.project.description, language
    );
    if !reference.is_empty() {
        prompt.push_str("\n\nKeep it consistent with this reference specification:\n");
        prompt.push_str(reference);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Project, Template};
    use crate::error::StoreError;
    use crate::llm::GenerationResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Client that replays a scripted sequence of stage results.
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<GenerationResponse, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<&'static str, LlmError>>) -> Self {
            let responses = script
                .into_iter()
                .map(|r| {
                    r.map(|text| GenerationResponse {
                        model: "scripted".to_string(),
                        content: text.to_string(),
                        usage: Usage::new(10, 5),
                    })
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    /// Record store that keeps saved records in memory.
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<TaskRecord>>,
        next_id: AtomicI64,
    }

    impl MemoryStore {
        fn records(&self) -> Vec<TaskRecord> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryStore {
        async fn save(&self, record: &TaskRecord) -> Result<i64, StoreError> {
            self.saved.lock().unwrap().push(record.clone());
            Ok(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
        }
    }

    /// Record store that always fails.
    struct FailStore;

    #[async_trait]
    impl RecordStore for FailStore {
        async fn save(&self, _record: &TaskRecord) -> Result<i64, StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            call_interval: Duration::ZERO,
            failure_cooldown: Duration::ZERO,
            ..Default::default()
        }
    }

    fn task(aux: bool) -> GenerationTask {
        GenerationTask {
            project: Project {
                id: "p1".to_string(),
                name: "Project One".to_string(),
                description: "A test project".to_string(),
            },
            template: Template {
                id: "t1".to_string(),
                display_names: Default::default(),
                prompt: "Write a technical spec".to_string(),
                aux_prompt: aux.then(|| "Write an API sketch".to_string()),
            },
        }
    }

    fn err() -> Result<&'static str, LlmError> {
        Err(LlmError::RequestFailed("connection reset".to_string()))
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("primary"),
            Ok("secondary"),
            Ok("aux-a"),
            Ok("aux-b"),
        ]));
        let store = Arc::new(MemoryStore::default());
        let mut executor =
            PipelineExecutor::new(client.clone(), store.clone(), test_config());

        let outcome = executor.execute(&task(true)).await.unwrap();

        assert!(!outcome.degraded);
        assert_eq!(outcome.usage, Usage::new(40, 20));
        assert_eq!(client.calls(), 4);

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content_primary, "primary");
        assert_eq!(records[0].content_secondary, "secondary");
        assert_eq!(records[0].aux_primary, "aux-a");
        assert_eq!(records[0].aux_secondary, "aux-b");
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal_and_writes_nothing() {
        let client = Arc::new(ScriptedClient::new(vec![err()]));
        let store = Arc::new(MemoryStore::default());
        let mut executor =
            PipelineExecutor::new(client.clone(), store.clone(), test_config());

        let failure = executor.execute(&task(true)).await.unwrap_err();

        assert_eq!(failure.id.to_string(), "p1::t1");
        assert!(failure.message.contains("primary generation failed"));
        // The remaining stages never run and no partial record is written.
        assert_eq!(client.calls(), 1);
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_secondary_failure_degrades_to_primary() {
        let client = Arc::new(ScriptedClient::new(vec![Ok("primary"), err()]));
        let store = Arc::new(MemoryStore::default());
        let mut executor = PipelineExecutor::new(client, store.clone(), test_config());

        let outcome = executor.execute(&task(false)).await.unwrap();

        assert!(outcome.degraded);
        let records = store.records();
        assert_eq!(records[0].content_secondary, records[0].content_primary);
        assert_eq!(records[0].content_secondary, "primary");
    }

    #[tokio::test]
    async fn test_aux_failures_store_empty_fields() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("primary"),
            Ok("secondary"),
            err(),
            err(),
        ]));
        let store = Arc::new(MemoryStore::default());
        let mut executor = PipelineExecutor::new(client, store.clone(), test_config());

        let outcome = executor.execute(&task(true)).await.unwrap();

        assert!(!outcome.degraded);
        let records = store.records();
        assert_eq!(records[0].aux_primary, "");
        assert_eq!(records[0].aux_secondary, "");
    }

    #[tokio::test]
    async fn test_aux_stages_skipped_without_aux_prompt() {
        let client = Arc::new(ScriptedClient::new(vec![Ok("primary"), Ok("secondary")]));
        let store = Arc::new(MemoryStore::default());
        let mut executor =
            PipelineExecutor::new(client.clone(), store.clone(), test_config());

        executor.execute(&task(false)).await.unwrap();

        assert_eq!(client.calls(), 2);
        let records = store.records();
        assert_eq!(records[0].aux_primary, "");
    }

    #[tokio::test]
    async fn test_record_save_failure_is_fatal() {
        let client = Arc::new(ScriptedClient::new(vec![Ok("primary"), Ok("secondary")]));
        let mut executor = PipelineExecutor::new(client, Arc::new(FailStore), test_config());

        let failure = executor.execute(&task(false)).await.unwrap_err();

        assert!(failure.message.contains("record save failed"));
    }

    #[test]
    fn test_aux_prompt_includes_reference_when_present() {
        let with_ref = aux_prompt_text(&task(true), "Sketch the API", "es", "the reference");
        assert!(with_ref.contains("reference specification"));
        assert!(with_ref.contains("the reference"));

        let without_ref = aux_prompt_text(&task(true), "Sketch the API", "en", "");
        assert!(!without_ref.contains("reference specification"));
    }

    #[test]
    fn test_document_prompt_contains_project_context() {
        let prompt = document_prompt(&task(false), "en");
        assert!(prompt.contains("Write a technical spec"));
        assert!(prompt.contains("Project One"));
        assert!(prompt.contains("A test project"));
        assert!(prompt.contains("in en"));
    }
}
