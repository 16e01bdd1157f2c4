//! Picking player chat out of the server's log file.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use log::{info, warn};
use time::Time;
use tokio::fs::File;
use tokio::io::{self, AsyncReadExt, AsyncSeekExt};

use crate::CHAT_LOG_TARGET;

/// At most this many lines are returned from a single `LogTail::poll`
pub const MAX_LINES_PER_POLL: usize = 50;

/// An incomplete line longer than this is dropped, along with the rest of it
pub const MAX_PARTIAL_LINE: usize = 64 * 1024;

/// A line of server console output, e.g.
/// `[19:33:43] [Server thread/INFO]: Starting minecraft server version 1.20.4`
#[derive(Debug, PartialEq)]
pub struct ConsoleLine {
    pub timestamp: Time,
    pub thread_name: String,
    pub level: ConsoleLevel,
    pub msg: String,
}

impl ConsoleLine {
    /// Parses a line of console output
    ///
    /// Returns `None` if the line isn't in the usual format.
    pub fn try_parse_from(raw: &str) -> Option<Self> {
        let raw = raw.strip_prefix('[')?;
        let (timestamp, remain) = raw.split_once("] [")?;
        let (source, msg) = remain.split_once("]: ")?;
        let (thread_name, level) = source.rsplit_once('/')?;

        let mut hms = timestamp.splitn(3, ':').map(|part| part.parse::<u8>().ok());
        let timestamp = Time::from_hms(hms.next()??, hms.next()??, hms.next()??).ok()?;

        Some(Self {
            timestamp,
            thread_name: thread_name.into(),
            level: ConsoleLevel::parse_from(level),
            msg: msg.into(),
        })
    }
}

/// The log level of a `ConsoleLine`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConsoleLevel {
    Info,
    Warn,
    Error,
    /// An unknown type of message
    Unknown,
}

impl ConsoleLevel {
    fn parse_from(raw: &str) -> Self {
        match raw {
            "INFO" => ConsoleLevel::Info,
            "WARN" => ConsoleLevel::Warn,
            "ERROR" => ConsoleLevel::Error,
            _ => ConsoleLevel::Unknown,
        }
    }
}

/// A chat message sent by a player
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ChatMessage {
    pub name: String,
    pub msg: String,
}

impl ChatMessage {
    /// Finds a `<name> message` chat message in a log line
    ///
    /// Works on raw lines so that both vanilla (`Server thread`) and Paper
    /// (`Async Chat Thread - #0`) chat is picked up.
    pub fn try_parse_from(line: &str) -> Option<Self> {
        line.match_indices(": <").find_map(|(idx, marker)| {
            let after = &line[idx + marker.len()..];
            let end = after.find('>')?;
            let (name, rest) = after.split_at(end);

            // Skip the '>' and require whitespace before the message
            let mut rest = rest[1..].chars();
            if name.is_empty() || !rest.next()?.is_whitespace() {
                return None;
            }

            Some(Self {
                name: name.into(),
                msg: rest.as_str().into(),
            })
        })
    }

    /// Logs this message under the chat log target
    pub fn log(&self) {
        info!(
            target: *CHAT_LOG_TARGET.get().unwrap_or(&"chat"),
            "<{}> {}", self.name, self.msg
        );
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}> {}", self.name, self.msg)
    }
}

/// Follows a growing log file, handing out complete lines
///
/// The first poll only records where the file currently ends, so history
/// isn't replayed. If the file shrinks (log rotation) it is read again from
/// the start.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    /// Byte offset up to which the file has been read, once known
    offset: Option<u64>,
    /// Bytes of an incomplete trailing line
    partial: Vec<u8>,
    /// Set while skipping the remainder of an overlong line
    skipping: bool,
}

impl LogTail {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            offset: None,
            partial: Vec::new(),
            skipping: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads whatever was appended since the last poll
    ///
    /// Only the last `MAX_LINES_PER_POLL` complete lines are returned, and a
    /// line that grows past `MAX_PARTIAL_LINE` bytes is skipped entirely.
    pub async fn poll(&mut self) -> io::Result<Vec<String>> {
        let mut file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();

        let offset = match self.offset {
            None => {
                self.offset = Some(len);
                return Ok(Vec::new());
            }
            Some(offset) if len < offset => {
                info!("{:?} was rotated or truncated; reading from the start", self.path);
                self.partial.clear();
                self.skipping = false;
                0
            }
            Some(offset) => offset,
        };

        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = Vec::new();
        (&mut file).take(len - offset).read_to_end(&mut buf).await?;
        self.offset = Some(offset + buf.len() as u64);

        let mut fresh = &buf[..];
        if self.skipping {
            match fresh.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    fresh = &fresh[pos + 1..];
                    self.skipping = false;
                }
                None => return Ok(Vec::new()),
            }
        }
        self.partial.extend_from_slice(fresh);

        let complete = match self.partial.iter().rposition(|b| *b == b'\n') {
            Some(pos) => self.partial.drain(..=pos).collect::<Vec<_>>(),
            None => Vec::new(),
        };

        if self.partial.len() > MAX_PARTIAL_LINE {
            warn!(
                "{:?} has a line longer than {} bytes; skipping it",
                self.path, MAX_PARTIAL_LINE
            );
            self.partial.clear();
            self.skipping = true;
        }

        let mut lines: Vec<String> = String::from_utf8_lossy(&complete)
            .lines()
            .map(String::from)
            .collect();
        if lines.len() > MAX_LINES_PER_POLL {
            lines.drain(..lines.len() - MAX_LINES_PER_POLL);
        }

        Ok(lines)
    }
}
