mod personas;
mod study_cards;
mod topics;
mod trainings;
mod works;
