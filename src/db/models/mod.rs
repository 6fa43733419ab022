mod persona;
mod study_card;
mod topic;
mod training;
mod work;

pub use persona::{Persona, PersonaInput};
pub use study_card::{StudyCard, StudyCardInput};
pub use topic::{Topic, TopicInput};
pub use training::{TrainingSession, TrainingStatus, TrainingStep};
pub use work::{Work, WorkInput, WorkSummary};
