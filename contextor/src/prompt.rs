//! Prompt templates: support-agent instructions with `{context}` and
//! `{question}` slots.
//!
//! Template text lives in `templates/*.txt` and is compiled in; a directory
//! given at startup can replace it without a rebuild. `{{` and `}}` render as
//! literal braces.

use std::path::Path;

use search_retriever::Document;
use tracing::info;

use crate::error::TemplateError;

pub const CONTEXT_VAR: &str = "context";
pub const QUESTION_VAR: &str = "question";

pub const QUERY_TEMPLATE_FILE: &str = "query.txt";
pub const MESSAGES_TEMPLATE_FILE: &str = "messages.txt";

const BUILTIN_QUERY: &str = include_str!("../templates/query.txt");
const BUILTIN_MESSAGES: &str = include_str!("../templates/messages.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Context,
    Question,
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parses template text.
    ///
    /// # Errors
    /// - [`TemplateError::UnknownVariable`] for a placeholder other than
    ///   `{context}` / `{question}`
    /// - [`TemplateError::MissingVariable`] when either placeholder is absent
    ///
    /// # Example
    /// ```
    /// use contextor::PromptTemplate;
    /// let t = PromptTemplate::parse("Info: {context}\nQ: {question}").unwrap();
    /// assert_eq!(t.render("a", "b"), "Info: a\nQ: b");
    /// ```
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut buf = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    buf.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    buf.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for n in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        // unterminated brace is plain text
                        buf.push('{');
                        buf.push_str(&name);
                        continue;
                    }
                    let seg = match name.trim() {
                        CONTEXT_VAR => Segment::Context,
                        QUESTION_VAR => Segment::Question,
                        other => return Err(TemplateError::UnknownVariable(other.to_string())),
                    };
                    if !buf.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut buf)));
                    }
                    segments.push(seg);
                }
                _ => buf.push(c),
            }
        }
        if !buf.is_empty() {
            segments.push(Segment::Text(buf));
        }

        for (var, seg) in [(CONTEXT_VAR, Segment::Context), (QUESTION_VAR, Segment::Question)] {
            if !segments.contains(&seg) {
                return Err(TemplateError::MissingVariable(var));
            }
        }
        Ok(Self { segments })
    }

    /// Substitutes both placeholders.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(
            self.segments
                .iter()
                .map(|s| match s {
                    Segment::Text(t) => t.len(),
                    Segment::Context => context.len(),
                    Segment::Question => question.len(),
                })
                .sum(),
        );
        for seg in &self.segments {
            match seg {
                Segment::Text(t) => out.push_str(t),
                Segment::Context => out.push_str(context),
                Segment::Question => out.push_str(question),
            }
        }
        out
    }
}

/// Templates for both endpoints.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    /// Ephemeral-history endpoint persona.
    pub query: PromptTemplate,
    /// Persistent-history endpoint persona (few-shot, feedback, data handling).
    pub messages: PromptTemplate,
}

impl PromptTemplates {
    /// The compiled-in templates.
    ///
    /// # Errors
    /// Only if a bundled template file is malformed.
    pub fn builtin() -> Result<Self, TemplateError> {
        Ok(Self {
            query: PromptTemplate::parse(BUILTIN_QUERY)?,
            messages: PromptTemplate::parse(BUILTIN_MESSAGES)?,
        })
    }

    /// Reads `query.txt` and `messages.txt` from `dir`. A file that does not
    /// exist falls back to its built-in version.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let builtin = Self::builtin()?;
        let query = read_override(dir, QUERY_TEMPLATE_FILE)?.unwrap_or(builtin.query);
        let messages = read_override(dir, MESSAGES_TEMPLATE_FILE)?.unwrap_or(builtin.messages);
        Ok(Self { query, messages })
    }
}

fn read_override(dir: &Path, file: &str) -> Result<Option<PromptTemplate>, TemplateError> {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!(path = %path.display(), "prompt template override loaded");
            PromptTemplate::parse(&text).map(Some)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TemplateError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Joins retrieved snippets into the `{context}` value, in retrieval order,
/// separated by blank lines. Empty snippets are skipped.
///
/// `max_chars` caps the total; the snippet that would overflow it is cut at a
/// char boundary and later ones are dropped. `0` disables the cap.
pub fn build_context(docs: &[Document], max_chars: usize) -> String {
    let mut out = String::new();
    for d in docs {
        let text = d.page_content.trim();
        if text.is_empty() {
            continue;
        }
        let sep = if out.is_empty() { 0 } else { 2 };
        if max_chars > 0 {
            let budget = max_chars.saturating_sub(out.len() + sep);
            if budget == 0 {
                break;
            }
            if text.len() > budget {
                if sep > 0 {
                    out.push_str("\n\n");
                }
                out.push_str(safe_truncate(text, budget));
                break;
            }
        }
        if sep > 0 {
            out.push_str("\n\n");
        }
        out.push_str(text);
    }
    out
}

/// UTF-8 safe truncate by byte length.
fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
