//! inkstep: a personal creative-writing practice studio.
//!
//! Works, personas, topics, study cards and multi-step training sessions
//! live in a local SQLite database; prompts for an external chat service
//! are built from string templates; and the completion bridge submits a
//! prompt to that service's rendered page and brings back exactly the
//! newly generated answer.

pub mod bridge;
pub mod db;
pub mod prompts;
pub mod settings;

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use bridge::{BridgeController, CompletionResult, ContentHost, PromptSpec};
use db::models::{Persona, TrainingStatus, Work};
use db::Database;
use settings::SettingsStore;

/// Everything an embedding needs: the store, the user's settings and the
/// bridge. One instance per data directory.
pub struct App {
    pub db: Database,
    pub settings: SettingsStore,
    pub bridge: BridgeController,
}

impl App {
    /// Open (or create) the application state under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("inkstep.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        info!("inkstep opened at {}", data_dir.display());
        Ok(Self {
            db,
            settings,
            bridge: BridgeController::new(),
        })
    }

    /// Run the current step of a training session against `host`: build
    /// the step's prompt, drive one bridge session, and on success store
    /// the extracted answer on the step and advance the session.
    ///
    /// The bridge outcome is returned as a value either way. An
    /// input-not-found outcome is not retried here; the caller is
    /// expected to offer a manual paste fallback instead.
    pub async fn complete_training_step<H>(
        &self,
        host: H,
        training_session_id: &str,
    ) -> Result<CompletionResult>
    where
        H: ContentHost + 'static,
    {
        let session = self
            .db
            .get_training_session(training_session_id)
            .await?
            .ok_or_else(|| anyhow!("training session {training_session_id} not found"))?;
        if session.status != TrainingStatus::InProgress {
            bail!(
                "training session {} is {}",
                session.id,
                session.status.as_str()
            );
        }

        let steps = self.db.get_training_steps(&session.id).await?;
        let step = steps
            .iter()
            .find(|step| step.step_index == session.current_step)
            .ok_or_else(|| anyhow!("training session {} has no remaining steps", session.id))?;

        let (work, persona) = self.current_practice_piece().await?;
        let topic = match session.topic_id {
            Some(topic_id) => self.db.get_topic(topic_id).await?,
            None => None,
        };

        let prompt_text =
            prompts::build_for_step(step.kind, work.as_ref(), persona.as_ref(), topic.as_ref())?;

        let result = self.run_bridge(host, prompt_text).await?;

        if let Some(answer) = &result.answer_text {
            self.db
                .record_step_result(&session.id, step.step_index, answer.clone())
                .await?;
            info!(
                "training session {} step {} recorded ({} chars)",
                session.id,
                step.step_index,
                answer.chars().count()
            );
        }

        Ok(result)
    }

    /// Ask the remote service for a critique of one work, in the voice
    /// of its persona when it has one. Persisting the answer is left to
    /// the caller.
    pub async fn critique_work<H>(&self, host: H, work_id: &str) -> Result<CompletionResult>
    where
        H: ContentHost + 'static,
    {
        let work = self
            .db
            .get_work(work_id)
            .await?
            .ok_or_else(|| anyhow!("work {work_id} not found"))?;
        let persona = match work.persona_id {
            Some(persona_id) => self.db.get_persona(persona_id).await?,
            None => None,
        };

        let prompt_text = prompts::critique_prompt(&work, persona.as_ref());
        self.run_bridge(host, prompt_text).await
    }

    /// The piece currently being practiced on: the most recently touched
    /// work, with its persona when one is linked.
    async fn current_practice_piece(&self) -> Result<(Option<Work>, Option<Persona>)> {
        let work = match self.db.list_works().await?.first() {
            Some(summary) => self.db.get_work(&summary.id).await?,
            None => None,
        };
        let persona = match work.as_ref().and_then(|work| work.persona_id) {
            Some(persona_id) => self.db.get_persona(persona_id).await?,
            None => None,
        };
        Ok((work, persona))
    }

    async fn run_bridge<H>(&self, host: H, prompt_text: String) -> Result<CompletionResult>
    where
        H: ContentHost + 'static,
    {
        let bridge_settings = self.settings.bridge();
        let options = bridge_settings.session_options();
        self.bridge
            .run_session(
                host,
                PromptSpec::new(prompt_text),
                bridge_settings.target_url,
                options,
            )
            .await
    }
}

/// Install the process-wide logger (reads RUST_LOG).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use tempfile::tempdir;

    use super::*;
    use crate::bridge::{CompletionOutcome, InjectionAck};
    use crate::db::models::{PersonaInput, TopicInput, WorkInput};
    use crate::prompts::{OperationKind, COMPLETION_MARKER};

    /// Echoes the injected prompt and streams a canned answer under it,
    /// the way a live chat page would.
    struct EchoingHost {
        answer: String,
        injected: Option<String>,
    }

    impl EchoingHost {
        fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                injected: None,
            }
        }
    }

    #[async_trait]
    impl ContentHost for EchoingHost {
        async fn load(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn inject_and_submit(&mut self, text: &str) -> Result<InjectionAck> {
            self.injected = Some(text.to_string());
            Ok(InjectionAck::Submitted)
        }

        async fn probe_visible_text(&mut self) -> Result<String> {
            let echo = self.injected.clone().unwrap_or_default();
            Ok(format!("{echo}\n{}\n{COMPLETION_MARKER}", self.answer))
        }

        async fn dispose(&mut self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn training_step_runs_end_to_end() {
        let dir = tempdir().unwrap();
        let app = App::open(dir.path()).unwrap();

        let topic = app
            .db
            .create_topic(TopicInput {
                name: "Weather as mood".into(),
                seed: "let the sky do the emotional work".into(),
            })
            .await
            .unwrap();
        let persona = app
            .db
            .create_persona(PersonaInput {
                name: "Laconic Reporter".into(),
                voice: "short declaratives".into(),
                sample: None,
            })
            .await
            .unwrap();
        app.db
            .create_work(WorkInput {
                title: "Sleet".into(),
                body: "The forecast lied again.".into(),
                persona_id: Some(persona.id),
                topic_id: Some(topic.id),
            })
            .await
            .unwrap();

        let session = app
            .db
            .create_training_session(
                "Morning drill".into(),
                Some(topic.id),
                vec![OperationKind::TopicExercise, OperationKind::Critique],
            )
            .await
            .unwrap();

        let host = EchoingHost::new("Exercise: describe the sky without naming a color.");
        let result = app
            .complete_training_step(host, &session.id)
            .await
            .unwrap();
        assert_eq!(result.outcome, CompletionOutcome::Success);
        assert_eq!(
            result.answer_text.as_deref(),
            Some("Exercise: describe the sky without naming a color.")
        );

        let reloaded = app
            .db
            .get_training_session(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.current_step, 1);

        let steps = app.db.get_training_steps(&session.id).await.unwrap();
        assert_eq!(
            steps[0].response_text.as_deref(),
            Some("Exercise: describe the sky without naming a color.")
        );
        assert!(steps[1].response_text.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn critique_returns_the_result_without_persisting() {
        let dir = tempdir().unwrap();
        let app = App::open(dir.path()).unwrap();

        let work = app
            .db
            .create_work(WorkInput {
                title: "Sleet".into(),
                body: "The forecast lied again.".into(),
                persona_id: None,
                topic_id: None,
            })
            .await
            .unwrap();

        let host = EchoingHost::new("The opening line carries the whole piece.");
        let result = app.critique_work(host, &work.id).await.unwrap();
        assert_eq!(result.outcome, CompletionOutcome::Success);
        assert_eq!(
            result.answer_text.as_deref(),
            Some("The opening line carries the whole piece.")
        );
    }
}
