//! Persona-augmented conversations.

use crate::Message;

/// A conversation split into prior context and the turn being submitted.
///
/// The persona prompt and its scripted acknowledgment always lead the
/// history, so the visitor never sees them as literal instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Every turn except the last.
    pub history: Vec<Message>,
    /// The final turn, submitted to provoke a new reply.
    pub prompt: Message,
}

impl Conversation {
    /// Builds `[persona, acknowledgment, ...messages]` and splits off the last turn.
    ///
    /// With no client messages the acknowledgment becomes the submitted turn.
    pub fn with_persona(persona: &str, acknowledgment: &str, messages: Vec<Message>) -> Self {
        let mut turns = Vec::with_capacity(messages.len() + 2);
        turns.push(Message::user(persona));
        turns.push(Message::assistant(acknowledgment));
        turns.extend(messages);

        // Never empty: the two persona turns are always present.
        let prompt = turns.pop().unwrap_or_else(|| Message::assistant(acknowledgment));

        Self { history: turns, prompt }
    }

    /// All turns in order, the submitted one last.
    pub fn turns(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().chain(std::iter::once(&self.prompt))
    }
}
