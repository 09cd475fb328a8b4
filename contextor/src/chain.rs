//! Retrieval-augmented chain: documents → prompt → one completion.

use std::{sync::Arc, time::Instant};

use ai_llm_service::{ChatMessage, ChatModel};
use chat_history::Turn;
use search_retriever::Retriever;
use tracing::{debug, info, instrument};

use crate::{
    cfg::ChainSettings,
    error::ContextorError,
    prompt::build_context,
};

/// One configured pipeline instance. Cheap to build per request.
pub struct RagChain {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn ChatModel>,
    settings: ChainSettings,
}

impl RagChain {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        model: Arc<dyn ChatModel>,
        settings: ChainSettings,
    ) -> Self {
        Self {
            retriever,
            model,
            settings,
        }
    }

    /// Answers `question` given the prior turns of the conversation.
    ///
    /// Only the last `history_window` turns are replayed. The result is the
    /// model's text, unmodified.
    ///
    /// # Errors
    /// [`ContextorError::Retrieval`] or [`ContextorError::Llm`]; nothing is
    /// retried.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn run(&self, question: &str, history: &[Turn]) -> Result<String, ContextorError> {
        let t0 = Instant::now();

        let docs = self.retriever.retrieve(question).await?;
        let context = build_context(&docs, self.settings.max_context_chars);
        debug!(
            docs = docs.len(),
            context_chars = context.len(),
            "context assembled"
        );

        let messages = self.messages_for(question, &context, history);
        let answer = self.model.complete(&messages).await?;

        info!(
            docs = docs.len(),
            messages = messages.len(),
            answer_chars = answer.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "chain completed"
        );
        Ok(answer)
    }

    /// Chat messages for one call: windowed history, then the rendered prompt.
    pub fn messages_for(&self, question: &str, context: &str, history: &[Turn]) -> Vec<ChatMessage> {
        let skip = history.len().saturating_sub(self.settings.history_window);
        let recent = &history[skip..];

        let mut messages = Vec::with_capacity(recent.len() * 2 + 1);
        for turn in recent {
            messages.push(ChatMessage::user(turn.question()));
            messages.push(ChatMessage::assistant(turn.answer()));
        }
        messages.push(ChatMessage::user(
            self.settings.template.render(context, question),
        ));
        messages
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ai_llm_service::{AiLlmError, ChatRole};
    use async_trait::async_trait;
    use search_retriever::{Document, RetrieverError};

    use super::*;
    use crate::prompt::PromptTemplate;

    struct Docs(Vec<&'static str>);

    #[async_trait]
    impl Retriever for Docs {
        async fn retrieve(&self, _q: &str) -> Result<Vec<Document>, RetrieverError> {
            Ok(self.0.iter().map(|s| Document::new(*s)).collect())
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for Recorder {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok("respuesta".into())
        }
    }

    fn chain(window: usize, model: Arc<Recorder>) -> RagChain {
        let tpl = PromptTemplate::parse("C[{context}] Q[{question}]").unwrap();
        RagChain::new(
            Arc::new(Docs(vec!["uno", "dos"])),
            model,
            ChainSettings::query(tpl, window),
        )
    }

    #[tokio::test]
    async fn renders_context_and_question_into_last_message() {
        let model = Arc::new(Recorder::default());
        let answer = chain(5, model.clone()).run("¿qué?", &[]).await.unwrap();
        assert_eq!(answer, "respuesta");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0][0].role, ChatRole::User);
        assert_eq!(seen[0][0].content, "C[uno\n\ndos] Q[¿qué?]");
    }

    #[tokio::test]
    async fn replays_only_the_last_turns() {
        let model = Arc::new(Recorder::default());
        let history: Vec<Turn> = (1..=4)
            .map(|i| Turn::new(format!("q{i}"), format!("a{i}")))
            .collect();
        chain(2, model.clone()).run("q5", &history).await.unwrap();

        let seen = model.seen.lock().unwrap();
        let contents: Vec<_> = seen[0].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[..4], ["q3", "a3", "q4", "a4"]);
        assert_eq!(seen[0][1].role, ChatRole::Assistant);
        assert!(contents[4].ends_with("Q[q5]"));
    }

    #[test]
    fn zero_window_sends_prompt_only() {
        let c = chain(0, Arc::new(Recorder::default()));
        let msgs = c.messages_for("q", "ctx", &[Turn::new("old", "reply")]);
        assert_eq!(msgs, vec![ChatMessage::user("C[ctx] Q[q]")]);
    }
}
