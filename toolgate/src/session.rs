//! Conversation loop between an operator and an agent runtime.
//!
//! [`Session`] keeps the history, forwards each user turn to an
//! [`AgentRuntime`] together with the gated [`ToolBox`], and recovers from
//! denied tool calls by recording the cancellation in the history instead
//! of failing the conversation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::callback::{NoopAgentHooks, RunContext, SharedAgentHooks};
use crate::error::Result;
use crate::message::Message;
use crate::tool::ToolBox;

/// REPL prompt.
pub const USER_PROMPT: &str = "You: ";

/// User turn recorded after a denied tool call.
pub const CHANGED_MIND: &str = "I changed my mind, please don't do it!";

/// What the runtime hands back after a successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// The full conversation after the turn, replacing the previous one.
    pub history: Vec<Message>,
    /// Text shown to the operator.
    pub final_output: String,
}

impl RunOutput {
    /// Create a run output.
    #[must_use]
    pub fn new(history: Vec<Message>, final_output: impl Into<String>) -> Self {
        Self {
            history,
            final_output: final_output.into(),
        }
    }
}

/// An agent framework that plans, calls tools and answers.
///
/// Tool calls must go through `tools` so the gate stays in the path. A
/// [`ToolError::Denied`](crate::ToolError::Denied) raised by a tool should
/// be propagated, not swallowed.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run one turn over `history`, whose last entry is the new user turn.
    async fn run(&self, ctx: &RunContext, tools: &ToolBox, history: &[Message])
    -> Result<RunOutput>;
}

/// A shared agent runtime.
pub type SharedAgentRuntime = Arc<dyn AgentRuntime>;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The runtime answered.
    Completed(String),
    /// A tool call was denied and the turn was cancelled.
    Cancelled {
        /// The denied tool.
        tool_name: String,
        /// The cancellation reply recorded in the history.
        reply: String,
    },
}

impl TurnOutcome {
    /// Text to show the operator.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Completed(text) | Self::Cancelled { reply: text, .. } => text,
        }
    }
}

/// Assistant turn asking to confirm a tool call.
#[must_use]
pub fn confirm_request_message(tool_name: &str) -> String {
    format!("Please confirm the call to {tool_name}")
}

/// Assistant turn acknowledging a cancelled tool call.
#[must_use]
pub fn cancelled_message(tool_name: &str) -> String {
    format!("Sure, I cancelled the call to {tool_name}. What else can I do for you today?")
}

/// A conversation with one agent runtime.
pub struct Session {
    runtime: SharedAgentRuntime,
    tools: Arc<ToolBox>,
    hooks: SharedAgentHooks,
    ctx: RunContext,
    history: Vec<Message>,
}

impl Session {
    /// Create a session with an empty history.
    #[must_use]
    pub fn new(runtime: SharedAgentRuntime, tools: Arc<ToolBox>, ctx: RunContext) -> Self {
        Self {
            runtime,
            tools,
            hooks: Arc::new(NoopAgentHooks),
            ctx,
            history: Vec::new(),
        }
    }

    /// Attach lifecycle hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: SharedAgentHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Start from an existing history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    /// The conversation so far.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The run context.
    #[must_use]
    pub const fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// The toolbox exposed to the runtime.
    #[must_use]
    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }

    /// Run one user turn.
    ///
    /// A denied tool call is not an error: the history gains the
    /// confirmation request, the user's change of mind and the cancellation
    /// reply, and the reply is returned as [`TurnOutcome::Cancelled`].
    ///
    /// # Errors
    ///
    /// Any other runtime error is returned after removing the unanswered
    /// user turn from the history.
    pub async fn respond(&mut self, input: &str) -> Result<TurnOutcome> {
        self.ctx.advance_turn();
        self.history.push(Message::user(input));
        self.hooks.on_start(&self.ctx).await;

        match self.runtime.run(&self.ctx, &self.tools, &self.history).await {
            Ok(output) => {
                self.history = output.history;
                self.hooks.on_end(&self.ctx, &output.final_output).await;
                Ok(TurnOutcome::Completed(output.final_output))
            }
            Err(err) => {
                self.hooks.on_error(&self.ctx, &err).await;
                if let Some(tool_name) = err.denied_tool() {
                    tracing::info!(tool = tool_name, turn = self.ctx.turn(), "Tool call cancelled");
                    let reply = cancelled_message(tool_name);
                    self.history.extend([
                        Message::assistant(confirm_request_message(tool_name)),
                        Message::user(CHANGED_MIND),
                        Message::assistant(reply.clone()),
                    ]);
                    return Ok(TurnOutcome::Cancelled {
                        tool_name: tool_name.to_owned(),
                        reply,
                    });
                }
                self.history.pop();
                Err(err)
            }
        }
    }

    /// Read user turns from `reader` until `exit` or end of input.
    ///
    /// Blank lines are skipped. Turn failures are logged and reported as
    /// `Error: ...` without ending the loop.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing fails.
    pub async fn run_repl<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let reader = Mutex::new(reader);
        self.run_repl_shared(&reader, writer).await
    }

    /// Like [`Session::run_repl`], reading from a line source the
    /// confirmation handler also reads from.
    ///
    /// The reader is locked only while a user turn is read, so a
    /// [`ConsoleConfirmation`](crate::confirm::ConsoleConfirmation) built
    /// over the same source gets the next line as its answer.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing fails.
    pub async fn run_repl_shared<R, W>(
        &mut self,
        reader: &Mutex<R>,
        writer: &mut W,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut line = String::new();
        loop {
            writer.write_all(USER_PROMPT.as_bytes()).await?;
            writer.flush().await?;

            line.clear();
            if reader.lock().await.read_line(&mut line).await? == 0 {
                writer.write_all(b"\n").await?;
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input.eq_ignore_ascii_case("exit") {
                writer.write_all(b"Goodbye!\n").await?;
                break;
            }

            let text = match self.respond(input).await {
                Ok(outcome) => outcome.text().to_owned(),
                Err(err) => {
                    tracing::error!(error = %err, turn = self.ctx.turn(), "Turn failed");
                    format!("Error: {err}")
                }
            };
            writer.write_all(format!("{text}\n").as_bytes()).await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("ctx", &self.ctx)
            .field("history_len", &self.history.len())
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    use crate::error::{Error, ToolError};
    use crate::message::Role;

    /// Runtime whose behavior depends on the user text.
    #[derive(Default)]
    struct KeywordRuntime {
        seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl AgentRuntime for KeywordRuntime {
        async fn run(
            &self,
            ctx: &RunContext,
            _tools: &ToolBox,
            history: &[Message],
        ) -> Result<RunOutput> {
            self.seen.lock().unwrap().push(ctx.turn());
            let last = history.last().map(|m| m.content.as_str()).unwrap_or_default();
            if last.contains("email") {
                return Err(ToolError::denied("Gmail_SendEmail").into());
            }
            if last.contains("crash") {
                return Err(Error::agent("model unavailable"));
            }
            let mut history = history.to_vec();
            let reply = format!("echo: {last}");
            history.push(Message::assistant(reply.clone()));
            Ok(RunOutput::new(history, reply))
        }
    }

    fn session() -> (Session, Arc<KeywordRuntime>) {
        let runtime = Arc::new(KeywordRuntime::default());
        let session = Session::new(
            Arc::clone(&runtime) as SharedAgentRuntime,
            Arc::new(ToolBox::new()),
            RunContext::new("ops"),
        );
        (session, runtime)
    }

    mod respond {
        use super::*;

        #[tokio::test]
        async fn completed_turn_replaces_history() {
            let (mut session, runtime) = session();
            let outcome = session.respond("list incidents").await.unwrap();
            assert_eq!(outcome, TurnOutcome::Completed("echo: list incidents".to_owned()));
            assert_eq!(session.history().len(), 2);
            assert_eq!(session.history()[1].role, Role::Assistant);
            assert_eq!(*runtime.seen.lock().unwrap(), vec![1]);
        }

        #[tokio::test]
        async fn denial_appends_three_turns() {
            let (mut session, _) = session();
            let outcome = session.respond("send the email").await.unwrap();
            let expected_reply =
                "Sure, I cancelled the call to Gmail_SendEmail. What else can I do for you today?";
            assert_eq!(outcome.text(), expected_reply);
            assert!(
                matches!(outcome, TurnOutcome::Cancelled { ref tool_name, .. } if tool_name == "Gmail_SendEmail")
            );

            let history = session.history();
            assert_eq!(history.len(), 4);
            assert_eq!(history[0], Message::user("send the email"));
            assert_eq!(
                history[1],
                Message::assistant("Please confirm the call to Gmail_SendEmail")
            );
            assert_eq!(history[2], Message::user(CHANGED_MIND));
            assert_eq!(history[3], Message::assistant(expected_reply));
        }

        #[tokio::test]
        async fn other_errors_drop_the_user_turn() {
            let (mut session, _) = session();
            session.respond("hello").await.unwrap();
            let err = session.respond("crash now").await.unwrap_err();
            assert!(matches!(err, Error::Agent(_)));
            assert_eq!(session.history().len(), 2);
            assert_eq!(session.context().turn(), 2);
        }

        #[tokio::test]
        async fn with_history_is_forwarded() {
            let (session, _) = session();
            let mut session = session.with_history(vec![Message::system("be terse")]);
            session.respond("hi").await.unwrap();
            assert_eq!(session.history()[0], Message::system("be terse"));
            assert_eq!(session.history().len(), 3);
        }
    }

    mod repl {
        use super::*;

        async fn run(input: &str) -> (Session, String) {
            let (mut session, _) = session();
            let mut reader = Cursor::new(input.as_bytes().to_vec());
            let mut writer = Vec::new();
            session.run_repl(&mut reader, &mut writer).await.unwrap();
            (session, String::from_utf8(writer).unwrap())
        }

        #[tokio::test]
        async fn exit_says_goodbye() {
            let (session, out) = run("hello\nEXIT\nignored\n").await;
            assert!(out.contains("echo: hello"));
            assert!(out.ends_with("Goodbye!\n"));
            assert!(!out.contains("ignored"));
            assert_eq!(session.context().turn(), 1);
        }

        #[tokio::test]
        async fn end_of_input_stops() {
            let (session, out) = run("hello\n").await;
            assert_eq!(out.matches(USER_PROMPT).count(), 2);
            assert!(!out.contains("Goodbye!"));
            assert_eq!(session.history().len(), 2);
        }

        #[tokio::test]
        async fn blank_lines_are_skipped() {
            let (session, _) = run("\n   \nhello\nexit\n").await;
            assert_eq!(session.context().turn(), 1);
        }

        #[tokio::test]
        async fn denial_and_errors_keep_the_loop_running() {
            let (session, out) = run("send email\ncrash\nhello\nexit\n").await;
            assert!(out.contains("Sure, I cancelled the call to Gmail_SendEmail."));
            assert!(out.contains("Error: Agent error: model unavailable"));
            assert!(out.contains("echo: hello"));
            assert_eq!(session.context().turn(), 3);
        }
    }
}
