use chatstream::answer::StructuredAnswer;
use chatstream::types::MessageType;
use chatstream::{FormattedMessage, SessionUpdate};
use std::io::{self, Write};

/// Writes revealed answer text as it grows; progress goes to `status`.
pub struct Renderer<O: Write, E: Write> {
    out: O,
    status: E,
    printed: String,
    thinking_printed: usize,
    show_thinking: bool,
}

impl<O: Write, E: Write> Renderer<O, E> {
    pub fn new(out: O, status: E, show_thinking: bool) -> Self {
        Self {
            out,
            status,
            printed: String::new(),
            thinking_printed: 0,
            show_thinking,
        }
    }

    pub fn apply(&mut self, update: &SessionUpdate) -> io::Result<()> {
        match update {
            SessionUpdate::Streaming(state) => {
                if self.show_thinking && state.thinking.len() > self.thinking_printed {
                    if let Some(delta) = state.thinking.get(self.thinking_printed..) {
                        write!(self.status, "{}", delta)?;
                    }
                    self.thinking_printed = state.thinking.len();
                }
                if state.is_active {
                    self.write_content(&state.content)?;
                }
            }
            SessionUpdate::Status { status, message } => {
                writeln!(self.status, "· {}", message.as_deref().unwrap_or(status))?;
            }
            SessionUpdate::ConversationAssigned(id) => {
                tracing::info!(conversation_id = %id, "Conversation assigned");
            }
            SessionUpdate::TitleChanged(title) => {
                writeln!(self.status, "· title: {}", title)?;
            }
            SessionUpdate::Finalized { message, .. } => {
                if message.message_type == MessageType::Error {
                    writeln!(self.status, "error: {}", message.content)?;
                } else {
                    self.write_content(&message.content)?;
                }
            }
            SessionUpdate::Aborted => {
                writeln!(self.status, "\n[aborted]")?;
            }
            _ => {}
        }
        self.out.flush()
    }

    /// Print only what is new; restart the line if the final text diverged
    fn write_content(&mut self, content: &str) -> io::Result<()> {
        match content.strip_prefix(self.printed.as_str()) {
            Some(delta) => write!(self.out, "{}", delta)?,
            None => write!(self.out, "\n{}", content)?,
        }
        self.printed = content.to_string();
        Ok(())
    }

    /// Trailing newline plus the numbered sources of the final answer
    pub fn finish(&mut self, answer: Option<&FormattedMessage>) -> io::Result<()> {
        writeln!(self.out)?;
        let Some(answer) = answer.filter(|m| m.is_bot() && !m.citations.is_empty()) else {
            return self.out.flush();
        };

        let structured = StructuredAnswer::build(&answer.content, &answer.citations);
        let cited = structured.cited_sources();
        let sources = if cited.is_empty() {
            structured.sources.iter().collect()
        } else {
            cited
        };

        writeln!(self.out, "\nSources:")?;
        for (i, source) in sources.iter().enumerate() {
            write!(self.out, "[{}] {} ({}", i + 1, source.label, source.origin_label)?;
            if let Some(url) = &source.url {
                write!(self.out, ", {}", url)?;
            }
            writeln!(self.out, ")")?;
        }
        self.out.flush()
    }
}
