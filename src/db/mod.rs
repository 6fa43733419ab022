pub mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::models::{PersonaInput, StudyCardInput, TopicInput, TrainingStatus, WorkInput};
    use super::Database;
    use crate::prompts::OperationKind;

    fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::new(dir.path().join("inkstep-test.sqlite3")).unwrap()
    }

    #[tokio::test]
    async fn personas_round_trip() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let persona = db
            .create_persona(PersonaInput {
                name: "Dry Diarist".into(),
                voice: "flat affect, precise nouns".into(),
                sample: None,
            })
            .await
            .unwrap();
        assert_eq!(persona.name, "Dry Diarist");

        // Duplicate names are refused.
        let duplicate = db
            .create_persona(PersonaInput {
                name: "Dry Diarist".into(),
                voice: "different".into(),
                sample: None,
            })
            .await;
        assert!(duplicate.is_err());

        db.update_persona(
            persona.id,
            PersonaInput {
                name: "Dry Diarist".into(),
                voice: "flat affect, precise nouns, weather last".into(),
                sample: Some("The kettle had been on for an hour.".into()),
            },
        )
        .await
        .unwrap();

        let reloaded = db.get_persona(persona.id).await.unwrap().unwrap();
        assert!(reloaded.voice.ends_with("weather last"));
        assert!(reloaded.sample.is_some());

        db.delete_persona(persona.id).await.unwrap();
        assert!(db.get_persona(persona.id).await.unwrap().is_none());
        assert!(db.get_personas().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn works_soft_delete_and_listing() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let work = db
            .create_work(WorkInput {
                title: "Harbor Notes".into(),
                body: "Gulls first. Then the horns, then the rain.".into(),
                persona_id: None,
                topic_id: None,
            })
            .await
            .unwrap();

        let listed = db.list_works().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].word_count, 8);

        db.delete_work(&work.id).await.unwrap();
        assert!(db.get_work(&work.id).await.unwrap().is_none());
        assert!(db.list_works().await.unwrap().is_empty());

        // Deleting twice is an error, not a silent success.
        assert!(db.delete_work(&work.id).await.is_err());
    }

    #[tokio::test]
    async fn study_cards_batch_and_review() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let topic = db
            .create_topic(TopicInput {
                name: "Dialogue".into(),
                seed: "subtext, interruption, what is not said".into(),
            })
            .await
            .unwrap();

        let cards = db
            .insert_study_cards(vec![
                StudyCardInput {
                    topic_id: Some(topic.id),
                    front: "What does an interruption signal?".into(),
                    back: "Competing wants surfacing mid-line.".into(),
                },
                StudyCardInput {
                    topic_id: Some(topic.id),
                    front: "Where does subtext live?".into(),
                    back: "In the gap between the line and the want.".into(),
                },
            ])
            .await
            .unwrap();
        assert_eq!(cards.len(), 2);

        db.mark_card_reviewed(cards[0].id).await.unwrap();
        let reloaded = db.get_study_cards(Some(topic.id)).await.unwrap();
        assert_eq!(reloaded[0].review_count, 1);
        assert!(reloaded[0].last_reviewed_at.is_some());
        assert_eq!(reloaded[1].review_count, 0);
    }

    #[tokio::test]
    async fn training_session_advances_and_completes() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir);

        let session = db
            .create_training_session(
                "Evening drill".into(),
                None,
                vec![OperationKind::TopicExercise, OperationKind::Critique],
            )
            .await
            .unwrap();
        assert_eq!(session.status, TrainingStatus::InProgress);
        assert_eq!(session.current_step, 0);

        let steps = db.get_training_steps(&session.id).await.unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].kind, OperationKind::TopicExercise);
        assert!(steps[0].response_text.is_none());

        let after_first = db
            .record_step_result(&session.id, 0, "exercise answer".into())
            .await
            .unwrap();
        assert_eq!(after_first.current_step, 1);
        assert_eq!(after_first.status, TrainingStatus::InProgress);

        let after_last = db
            .record_step_result(&session.id, 1, "critique answer".into())
            .await
            .unwrap();
        assert_eq!(after_last.status, TrainingStatus::Completed);

        let steps = db.get_training_steps(&session.id).await.unwrap();
        assert!(steps.iter().all(|step| step.completed_at.is_some()));

        // A finished session cannot be abandoned.
        assert!(db.abandon_training_session(&session.id).await.is_err());
    }
}
