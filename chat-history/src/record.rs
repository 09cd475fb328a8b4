use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One persisted chat message, tagged with its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatRecord {
    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session_id, Role::User, content)
    }

    pub fn assistant(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session_id, Role::Assistant, content)
    }

    fn new(session_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A (question, answer) pair. Serializes as a two-element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn(pub String, pub String);

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self(question.into(), answer.into())
    }

    pub fn question(&self) -> &str {
        &self.0
    }

    pub fn answer(&self) -> &str {
        &self.1
    }
}

/// Folds a message log into turns.
///
/// Each user message opens a turn that the next assistant message closes. A
/// user message without a reply (e.g. the process died between the two
/// appends) is dropped, as is an assistant message with no question.
pub fn turns_from_records(records: &[ChatRecord]) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(records.len() / 2);
    let mut pending: Option<&str> = None;
    for r in records {
        match r.role {
            Role::User => pending = Some(&r.content),
            Role::Assistant => {
                if let Some(q) = pending.take() {
                    turns.push(Turn::new(q, r.content.as_str()));
                }
            }
        }
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_serializes_as_pair() {
        let t = Turn::new("hola", "¡Hola! ¿En qué te ayudo?");
        assert_eq!(
            serde_json::to_string(&t).unwrap(),
            r#"["hola","¡Hola! ¿En qué te ayudo?"]"#
        );
    }

    #[test]
    fn record_roles_are_snake_case() {
        let r = ChatRecord::assistant("s1", "ok");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["role"], "assistant");
        assert_eq!(v["session_id"], "s1");
    }

    #[test]
    fn folds_records_into_turns() {
        let recs = vec![
            ChatRecord::assistant("s", "orphan answer"),
            ChatRecord::user("s", "q1"),
            ChatRecord::assistant("s", "a1"),
            ChatRecord::user("s", "lost question"),
            ChatRecord::user("s", "q2"),
            ChatRecord::assistant("s", "a2"),
            ChatRecord::user("s", "unanswered"),
        ];
        let turns = turns_from_records(&recs);
        assert_eq!(turns, vec![Turn::new("q1", "a1"), Turn::new("q2", "a2")]);
    }
}
