mod emotion_logs;
mod interventions;
mod study_sessions;
