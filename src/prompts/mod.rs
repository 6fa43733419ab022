//! Prompt construction for the external chat service.
//!
//! Plain string templates keyed by an operation kind. Every template
//! ends with the completion footer, which instructs the remote model to
//! emit the completion marker once at the end of its answer; the bridge
//! counts occurrences of the same literal to detect completion, so the
//! marker is shared by agreement between this module and `bridge`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::db::models::{Persona, Topic, Work};

/// Fixed completion sentinel. Unusual enough that it never occurs in
/// ordinary prose, and every template mentions it exactly once.
pub const COMPLETION_MARKER: &str = "###COMPLETE###";

/// The operation a prompt is built for. Stored on training steps, so the
/// string form is part of the schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Critique,
    ContinueDraft,
    RewriteInVoice,
    TopicExercise,
    GenerateStudyCards,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Critique => "Critique",
            OperationKind::ContinueDraft => "ContinueDraft",
            OperationKind::RewriteInVoice => "RewriteInVoice",
            OperationKind::TopicExercise => "TopicExercise",
            OperationKind::GenerateStudyCards => "GenerateStudyCards",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Critique" => Ok(OperationKind::Critique),
            "ContinueDraft" => Ok(OperationKind::ContinueDraft),
            "RewriteInVoice" => Ok(OperationKind::RewriteInVoice),
            "TopicExercise" => Ok(OperationKind::TopicExercise),
            "GenerateStudyCards" => Ok(OperationKind::GenerateStudyCards),
            other => bail!("unknown operation kind '{other}'"),
        }
    }
}

// The marker is the last thing in every prompt, so the echoed prompt
// contributes nothing after its marker and extraction starts clean at
// the answer.
fn completion_footer() -> String {
    format!(
        "\n\nWhen your answer is complete, end it with this marker on its own line, \
         writing nothing after it:\n{COMPLETION_MARKER}"
    )
}

fn persona_clause(persona: &Persona) -> String {
    let mut clause = format!(
        "Judge it against the voice of \"{}\": {}.",
        persona.name, persona.voice
    );
    if let Some(sample) = &persona.sample {
        clause.push_str(&format!(" A sample of that voice:\n\n{sample}\n"));
    }
    clause
}

/// Ask for a craft critique of a work, optionally against a persona's
/// voice.
pub fn critique_prompt(work: &Work, persona: Option<&Persona>) -> String {
    let mut prompt = format!(
        "You are a patient writing coach. Critique the piece below: name what works, \
         what drags, and the three most useful revisions, citing short quotes.\n\n\
         Title: {}\n\n{}\n",
        work.title, work.body
    );
    if let Some(persona) = persona {
        prompt.push('\n');
        prompt.push_str(&persona_clause(persona));
    }
    prompt.push_str(&completion_footer());
    prompt
}

/// Ask for a continuation of a draft, keeping its voice and momentum.
pub fn continue_draft_prompt(work: &Work) -> String {
    format!(
        "Continue the draft below for two to four paragraphs. Keep the narrator's \
         voice, tense and momentum; do not summarize or restart.\n\n\
         Title: {}\n\n{}\n{}",
        work.title,
        work.body,
        completion_footer()
    )
}

/// Ask for the work rewritten in a persona's voice.
pub fn rewrite_in_voice_prompt(work: &Work, persona: &Persona) -> String {
    format!(
        "Rewrite the piece below in the voice of \"{}\": {}. Preserve the events and \
         images; change only diction, rhythm and attitude.\n\n{}\n\n{}\n{}",
        persona.name,
        persona.voice,
        persona
            .sample
            .as_deref()
            .map(|sample| format!("A sample of that voice:\n\n{sample}"))
            .unwrap_or_default(),
        work.body,
        completion_footer()
    )
}

/// Ask for a short writing exercise grown from a topic seed.
pub fn topic_exercise_prompt(topic: &Topic) -> String {
    format!(
        "Design one short writing exercise (15-20 minutes) about \"{}\". Seed: {}. \
         Give the exercise as a single instruction followed by one concrete example \
         opening line.\n{}",
        topic.name,
        topic.seed,
        completion_footer()
    )
}

/// Ask for a handful of craft flashcards about a topic.
pub fn study_cards_prompt(topic: &Topic) -> String {
    format!(
        "Write five flashcards about the craft of \"{}\" (seed: {}). Format each as \
         'Q: ...' on one line and 'A: ...' on the next, with a blank line between \
         cards.\n{}",
        topic.name,
        topic.seed,
        completion_footer()
    )
}

/// Build the prompt for a training step. Which inputs are required
/// depends on the operation; a missing one is a caller error.
pub fn build_for_step(
    kind: OperationKind,
    work: Option<&Work>,
    persona: Option<&Persona>,
    topic: Option<&Topic>,
) -> Result<String> {
    match kind {
        OperationKind::Critique => {
            let work = work.ok_or_else(|| missing(kind, "work"))?;
            Ok(critique_prompt(work, persona))
        }
        OperationKind::ContinueDraft => {
            let work = work.ok_or_else(|| missing(kind, "work"))?;
            Ok(continue_draft_prompt(work))
        }
        OperationKind::RewriteInVoice => {
            let work = work.ok_or_else(|| missing(kind, "work"))?;
            let persona = persona.ok_or_else(|| missing(kind, "persona"))?;
            Ok(rewrite_in_voice_prompt(work, persona))
        }
        OperationKind::TopicExercise => {
            let topic = topic.ok_or_else(|| missing(kind, "topic"))?;
            Ok(topic_exercise_prompt(topic))
        }
        OperationKind::GenerateStudyCards => {
            let topic = topic.ok_or_else(|| missing(kind, "topic"))?;
            Ok(study_cards_prompt(topic))
        }
    }
}

fn missing(kind: OperationKind, input: &str) -> anyhow::Error {
    anyhow::anyhow!("{} step requires a {input}", kind.as_str())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::bridge::sentinel;

    fn work() -> Work {
        Work {
            id: "w-1".into(),
            title: "Night Ferry".into(),
            body: "The ferry left at dusk. Nobody spoke on the lower deck.".into(),
            persona_id: None,
            topic_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn persona() -> Persona {
        Persona {
            id: 1,
            name: "The Laconic Reporter".into(),
            voice: "short declaratives, no adverbs, weather first".into(),
            sample: Some("Rain again. The docks were empty by six.".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn topic() -> Topic {
        Topic {
            id: 2,
            name: "Thresholds".into(),
            seed: "doorways, borders, the moment before entering".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn every_template_carries_the_marker_exactly_once() {
        let prompts = [
            critique_prompt(&work(), Some(&persona())),
            critique_prompt(&work(), None),
            continue_draft_prompt(&work()),
            rewrite_in_voice_prompt(&work(), &persona()),
            topic_exercise_prompt(&topic()),
            study_cards_prompt(&topic()),
        ];
        for prompt in prompts {
            assert_eq!(sentinel::count(&prompt, COMPLETION_MARKER), 1);
        }
    }

    #[test]
    fn templates_embed_their_inputs() {
        let prompt = critique_prompt(&work(), Some(&persona()));
        assert!(prompt.contains("Night Ferry"));
        assert!(prompt.contains("The Laconic Reporter"));
        assert!(prompt.contains("Rain again."));

        let prompt = topic_exercise_prompt(&topic());
        assert!(prompt.contains("Thresholds"));
        assert!(prompt.contains("the moment before entering"));
    }

    #[test]
    fn step_builder_requires_the_right_inputs() {
        let built =
            build_for_step(OperationKind::TopicExercise, None, None, Some(&topic())).unwrap();
        assert!(built.contains("Thresholds"));

        let err = build_for_step(OperationKind::RewriteInVoice, Some(&work()), None, None)
            .unwrap_err();
        assert!(err.to_string().contains("persona"));

        let err = build_for_step(OperationKind::Critique, None, None, Some(&topic())).unwrap_err();
        assert!(err.to_string().contains("work"));
    }

    #[test]
    fn operation_kind_round_trips_through_strings() {
        for kind in [
            OperationKind::Critique,
            OperationKind::ContinueDraft,
            OperationKind::RewriteInVoice,
            OperationKind::TopicExercise,
            OperationKind::GenerateStudyCards,
        ] {
            assert_eq!(OperationKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(OperationKind::parse("Summarize").is_err());
    }
}
