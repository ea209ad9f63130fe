//! services/web/src/adapters/tutor.rs
//!
//! This module contains the adapter that stands in for a real tutoring model.
//! It implements the `TutorService` port from the `core` crate.

use async_trait::async_trait;
use tracing::debug;
use unbound_core::{
    domain::SCRIPTED_REPLY,
    ports::{PortResult, TutorService},
};

/// Answers every question with the same canned reply.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTutor;

impl ScriptedTutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TutorService for ScriptedTutor {
    async fn answer_question(&self, question: &str, document: &str) -> PortResult<String> {
        debug!(
            "Scripted answer for '{}' ({} chars of question)",
            document,
            question.chars().count()
        );
        Ok(SCRIPTED_REPLY.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_returns_the_scripted_reply() {
        let tutor = ScriptedTutor::new();
        let answer = tutor.answer_question("What is osmosis?", "Biology.pdf").await.unwrap();
        assert_eq!(answer, SCRIPTED_REPLY);
    }
}
