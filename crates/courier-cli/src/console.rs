//! Line-oriented console.
//!
//! Reads commands from stdin and prints the message log to stdout as it
//! changes. Logs go to stderr, so stdout stays a clean chat transcript.

use std::io::{self, Write};

use courier_app::RuntimeError;
use courier_client::{ChatMessage, Client, RoomId};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{ChatHandle, CliError};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `/room <uuid>`
    SwitchRoom(RoomId),
    /// `/older`
    Older,
    /// `/login`
    Login,
    /// `/logout`
    Logout,
    /// `/quit`
    Quit,
    /// Anything that is not a command.
    Post(String),
    /// Blank line.
    Empty,
}

/// Parse one input line.
///
/// A line starting with `/` is a command; `//` escapes a leading slash in a
/// message.
pub fn parse_line(line: &str) -> Result<Input, CliError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Input::Empty);
    }

    if let Some(escaped) = line.strip_prefix("//") {
        return Ok(Input::Post(format!("/{escaped}")));
    }

    let Some(command) = line.strip_prefix('/') else {
        return Ok(Input::Post(line.to_string()));
    };

    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("room"), Some(id)) => id
            .parse()
            .map(Input::SwitchRoom)
            .map_err(|e: uuid::Error| CliError::InvalidRoom { input: id.to_string(), reason: e.to_string() }),
        (Some("room"), None) => Err(CliError::InvalidRoom {
            input: String::new(),
            reason: "missing room id".into(),
        }),
        (Some("older"), None) => Ok(Input::Older),
        (Some("login"), None) => Ok(Input::Login),
        (Some("logout"), None) => Ok(Input::Logout),
        (Some("quit"), None) => Ok(Input::Quit),
        _ => Err(CliError::UnknownCommand(line.to_string())),
    }
}

/// Renders message log snapshots as transcript lines.
///
/// Remembers how many messages it has shown plus the first and last of them,
/// and prints only the difference: new messages at the end, an older page at
/// the start, or the whole history after a reset. A snapshot that keeps the
/// shown messages as its head is rendered as an append, whichever frame
/// produced it.
#[derive(Debug, Default)]
pub struct LogPrinter {
    len: usize,
    first: Option<ChatMessage>,
    last: Option<ChatMessage>,
}

impl LogPrinter {
    /// Printer that has shown nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for the transition to `next`.
    pub fn render(&mut self, next: &[ChatMessage]) -> Vec<String> {
        let shown = self.len;
        let matches_shown = |run: &[ChatMessage]| {
            run.first() == self.first.as_ref() && run.last() == self.last.as_ref()
        };

        let lines = if shown == 0 && next.is_empty() {
            Vec::new()
        } else if shown > 0 && next.len() >= shown && matches_shown(&next[..shown]) {
            next[shown..].iter().map(format_message).collect()
        } else if shown > 0 && next.len() > shown && matches_shown(&next[next.len() - shown..]) {
            let older = &next[..next.len() - shown];
            let mut lines = vec![format!("-- {} older message(s) --", older.len())];
            lines.extend(older.iter().map(format_message));
            lines.push("-- end of older messages --".to_string());
            lines
        } else {
            let mut lines = vec![format!("== history: {} message(s) ==", next.len())];
            lines.extend(next.iter().map(format_message));
            lines
        };

        self.len = next.len();
        self.first = next.first().cloned();
        self.last = next.last().cloned();
        lines
    }
}

fn format_message(message: &ChatMessage) -> String {
    format!("[{}] {}: {}", message.sat, message.nickname, message.content)
}

fn write_lines(lines: &[String]) {
    let mut out = io::stdout().lock();
    for line in lines {
        if let Err(e) = writeln!(out, "{line}") {
            tracing::warn!(error = %e, "stdout write failed");
            return;
        }
    }
}

/// Subscribe transcript printers to the client's log and pagination gate.
pub fn attach(client: &mut Client) {
    let mut printer = LogPrinter::new();
    client.messages_mut().subscribe(move |messages| write_lines(&printer.render(messages)));

    let mut last_blocked: Option<bool> = None;
    client.pagination_mut().subscribe(move |blocked| {
        if last_blocked == Some(*blocked) {
            return;
        }
        last_blocked = Some(*blocked);
        let line = if *blocked {
            "-- no older messages --"
        } else {
            "-- older messages available, type /older --"
        };
        write_lines(&[line.to_string()]);
    });
}

/// Read stdin until `/quit` or EOF, forwarding commands to the runtime.
///
/// `/login` and `/logout` drive the auth signal directly.
pub async fn run(handle: ChatHandle, auth: mpsc::UnboundedSender<bool>) -> Result<(), CliError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let input = match parse_line(&line) {
            Ok(input) => input,
            Err(e) => {
                write_lines(&[format!("!! {e}")]);
                continue;
            },
        };

        match input {
            Input::SwitchRoom(room_id) => handle.switch_room(room_id).await?,
            Input::Older => handle.request_older().await?,
            Input::Login => auth.send(true).map_err(|_| RuntimeError::Stopped)?,
            Input::Logout => auth.send(false).map_err(|_| RuntimeError::Stopped)?,
            Input::Quit => break,
            Input::Post(content) => handle.post_message(content).await?,
            Input::Empty => {},
        }
    }

    handle.shutdown().await?;
    Ok(())
}
