//! Human confirmation of individual tool invocations.
//!
//! A [`ConfirmationHandler`] turns a [`ToolConfirmationRequest`] into a
//! [`ConfirmationDecision`]. Decisions are per invocation attempt: there is
//! no "approve all", so every gated call asks again.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// The question asked before every gated tool call.
pub const CONFIRMATION_PROMPT: &str = "Do you approve this tool call? [y/N] ";

/// Request for human confirmation before tool execution.
#[derive(Debug, Clone)]
pub struct ToolConfirmationRequest {
    /// Identifier of this invocation attempt.
    pub id: String,
    /// The tool name.
    pub name: String,
    /// The tool arguments as JSON.
    pub arguments: Value,
    /// Human-readable description of what the tool will do.
    pub description: String,
}

impl ToolConfirmationRequest {
    /// Create a new confirmation request.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        let name = name.into();
        let description = format!(
            "Tool '{}' wants to execute with arguments: {}",
            name,
            serde_json::to_string_pretty(&arguments).unwrap_or_else(|_| arguments.to_string())
        );
        Self {
            id: id.into(),
            name,
            arguments,
            description,
        }
    }
}

/// The operator's answer to one confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationDecision {
    /// Execute this invocation.
    Approved,
    /// Do not execute this invocation.
    Denied,
}

impl ConfirmationDecision {
    /// Check if the decision approves execution.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Interpret a line of operator input.
    ///
    /// `y`/`yes` approve, `n`/`no` or an empty line deny, anything else is
    /// unrecognised. Case and surrounding whitespace are ignored.
    #[must_use]
    pub fn parse_answer(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Self::Approved),
            "" | "n" | "no" => Some(Self::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for ConfirmationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Handler for tool execution confirmation requests.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    /// Request confirmation for a tool execution.
    async fn confirm(&self, request: &ToolConfirmationRequest) -> ConfirmationDecision;
}

/// A boxed confirmation handler for dynamic dispatch.
pub type BoxedConfirmationHandler = Box<dyn ConfirmationHandler>;

/// A shared confirmation handler, as held by the gate.
pub type SharedConfirmationHandler = Arc<dyn ConfirmationHandler>;

/// Confirmation handler that approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApproveHandler;

#[async_trait]
impl ConfirmationHandler for AutoApproveHandler {
    async fn confirm(&self, _request: &ToolConfirmationRequest) -> ConfirmationDecision {
        ConfirmationDecision::Approved
    }
}

/// Confirmation handler that denies every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDenyHandler;

#[async_trait]
impl ConfirmationHandler for AlwaysDenyHandler {
    async fn confirm(&self, _request: &ToolConfirmationRequest) -> ConfirmationDecision {
        ConfirmationDecision::Denied
    }
}

/// A line source shared between the console handler and the conversation
/// loop, so neither reads ahead into the other's input.
pub type SharedLineReader<R> = Arc<Mutex<R>>;

/// Standard input behind a [`SharedLineReader`].
#[must_use]
pub fn shared_stdin() -> SharedLineReader<BufReader<tokio::io::Stdin>> {
    Arc::new(Mutex::new(BufReader::new(tokio::io::stdin())))
}

/// Interactive confirmation over a line-oriented reader and writer.
///
/// End of input and I/O errors deny the call. The reader is locked only
/// while an answer line is read.
pub struct ConsoleConfirmation<R, W> {
    reader: SharedLineReader<R>,
    writer: Mutex<W>,
}

impl<R, W> ConsoleConfirmation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a console handler that owns its reader.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self::shared(Arc::new(Mutex::new(reader)), writer)
    }

    /// Create a console handler reading answers from a shared line source.
    #[must_use]
    pub fn shared(reader: SharedLineReader<R>, writer: W) -> Self {
        Self {
            reader,
            writer: Mutex::new(writer),
        }
    }

    /// The line source answers are read from.
    #[must_use]
    pub const fn reader(&self) -> &SharedLineReader<R> {
        &self.reader
    }

    /// Consume the handler and return the line source and writer.
    #[must_use]
    pub fn into_inner(self) -> (SharedLineReader<R>, W) {
        (self.reader, self.writer.into_inner())
    }

    async fn ask(&self, request: &ToolConfirmationRequest) -> std::io::Result<ConfirmationDecision> {
        let mut writer = self.writer.lock().await;

        writer
            .write_all(format!("\n{}\n", request.description).as_bytes())
            .await?;

        let mut line = String::new();
        loop {
            writer.write_all(CONFIRMATION_PROMPT.as_bytes()).await?;
            writer.flush().await?;

            line.clear();
            if self.reader.lock().await.read_line(&mut line).await? == 0 {
                writer.write_all(b"\n").await?;
                return Ok(ConfirmationDecision::Denied);
            }
            if let Some(decision) = ConfirmationDecision::parse_answer(&line) {
                return Ok(decision);
            }
            writer.write_all(b"Please answer 'y' or 'n'.\n").await?;
        }
    }
}

impl ConsoleConfirmation<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Bind to the process standard input and output.
    ///
    /// Use [`ConsoleConfirmation::shared`] with [`shared_stdin`] when a
    /// conversation loop reads the same terminal.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> ConfirmationHandler for ConsoleConfirmation<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn confirm(&self, request: &ToolConfirmationRequest) -> ConfirmationDecision {
        match self.ask(request).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(tool = %request.name, error = %e, "Confirmation prompt failed, denying");
                ConfirmationDecision::Denied
            }
        }
    }
}

impl<R, W> fmt::Debug for ConsoleConfirmation<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleConfirmation").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn request() -> ToolConfirmationRequest {
        ToolConfirmationRequest::new(
            "call_1",
            "Gmail_SendEmail",
            serde_json::json!({"recipient": "sre@example.com", "subject": "RCA"}),
        )
    }

    fn console(input: &str) -> ConsoleConfirmation<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleConfirmation::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    mod tool_confirmation_request {
        use super::*;

        #[test]
        fn new_creates_request() {
            let req = request();
            assert_eq!(req.id, "call_1");
            assert_eq!(req.name, "Gmail_SendEmail");
            assert!(req.description.contains("Gmail_SendEmail"));
            assert!(req.description.contains("sre@example.com"));
        }

        #[test]
        fn description_is_pretty_printed() {
            let req = request();
            assert!(req.description.contains("\n  \"recipient\""));
        }
    }

    mod confirmation_decision {
        use super::*;

        #[test]
        fn parse_answer_accepts_yes_forms() {
            for input in ["y", "Y", "yes", "YES\n", "  yes  "] {
                assert_eq!(
                    ConfirmationDecision::parse_answer(input),
                    Some(ConfirmationDecision::Approved),
                    "{input:?}"
                );
            }
        }

        #[test]
        fn parse_answer_accepts_no_forms_and_empty() {
            for input in ["n", "No", "\n", ""] {
                assert_eq!(
                    ConfirmationDecision::parse_answer(input),
                    Some(ConfirmationDecision::Denied),
                    "{input:?}"
                );
            }
        }

        #[test]
        fn parse_answer_rejects_other_input() {
            assert_eq!(ConfirmationDecision::parse_answer("maybe"), None);
            assert_eq!(ConfirmationDecision::parse_answer("yess"), None);
        }

        #[test]
        fn is_approved_and_display() {
            assert!(ConfirmationDecision::Approved.is_approved());
            assert!(!ConfirmationDecision::Denied.is_approved());
            assert_eq!(ConfirmationDecision::Denied.to_string(), "denied");
        }
    }

    mod handlers {
        use super::*;

        #[tokio::test]
        async fn auto_approve_handler_approves() {
            assert_eq!(
                AutoApproveHandler.confirm(&request()).await,
                ConfirmationDecision::Approved
            );
        }

        #[tokio::test]
        async fn always_deny_handler_denies() {
            assert_eq!(
                AlwaysDenyHandler.confirm(&request()).await,
                ConfirmationDecision::Denied
            );
        }
    }

    mod console_confirmation {
        use super::*;

        #[tokio::test]
        async fn yes_approves_and_prompt_is_written() {
            let handler = console("yes\n");
            assert_eq!(
                handler.confirm(&request()).await,
                ConfirmationDecision::Approved
            );
            let (_, out) = handler.into_inner();
            let out = String::from_utf8(out).unwrap();
            assert!(out.contains("Gmail_SendEmail"));
            assert!(out.contains("sre@example.com"));
            assert!(out.contains(CONFIRMATION_PROMPT));
        }

        #[tokio::test]
        async fn no_denies() {
            let handler = console("n\n");
            assert_eq!(
                handler.confirm(&request()).await,
                ConfirmationDecision::Denied
            );
        }

        #[tokio::test]
        async fn empty_line_denies() {
            let handler = console("\n");
            assert_eq!(
                handler.confirm(&request()).await,
                ConfirmationDecision::Denied
            );
        }

        #[tokio::test]
        async fn end_of_input_denies() {
            let handler = console("");
            assert_eq!(
                handler.confirm(&request()).await,
                ConfirmationDecision::Denied
            );
        }

        #[tokio::test]
        async fn unrecognised_input_reprompts() {
            let handler = console("maybe\nperhaps\ny\n");
            assert_eq!(
                handler.confirm(&request()).await,
                ConfirmationDecision::Approved
            );
            let (_, out) = handler.into_inner();
            let out = String::from_utf8(out).unwrap();
            assert_eq!(out.matches(CONFIRMATION_PROMPT).count(), 3);
            assert_eq!(out.matches("Please answer").count(), 2);
        }

        #[tokio::test]
        async fn shared_reader_is_consumed_one_line_per_answer() {
            let lines = Arc::new(Mutex::new(BufReader::new(Cursor::new(
                b"y\nnext question\n".to_vec(),
            ))));
            let handler = ConsoleConfirmation::shared(Arc::clone(&lines), Vec::new());
            assert!(handler.confirm(&request()).await.is_approved());

            let mut rest = String::new();
            lines.lock().await.read_line(&mut rest).await.unwrap();
            assert_eq!(rest, "next question\n");
            assert!(Arc::ptr_eq(handler.reader(), &lines));
        }

        #[tokio::test]
        async fn each_request_reads_its_own_answer() {
            let handler = console("y\nn\n");
            assert!(handler.confirm(&request()).await.is_approved());
            assert!(!handler.confirm(&request()).await.is_approved());
            assert!(!handler.confirm(&request()).await.is_approved());
        }
    }
}
