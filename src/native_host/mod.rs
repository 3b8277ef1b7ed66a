//! Chrome native messaging host.
//!
//! Each message is a 4-byte little-endian length followed by that many
//! bytes of JSON. Handlers are thin: they call the synchronizer and turn
//! whatever comes back, success or failure, into exactly one reply.

use crate::compiler::MatcherRule;
use crate::constants::MAX_MESSAGE_SIZE;
use crate::engine::RuleEngine;
use crate::error::AppError;
use crate::models::{EntryType, InterstitialSettings, Presentation};
use crate::projection::{StatusMessage, Views};
use crate::store::KeyValueStore;
use crate::sync::{Operation, Outcome, Synchronizer};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, Read, Write};

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    #[serde(rename = "add_domain")]
    AddDomain { value: String },
    #[serde(rename = "add_keyword")]
    AddKeyword { value: String },
    #[serde(rename = "remove_entry")]
    RemoveEntry { id: i64 },
    #[serde(rename = "install_defaults")]
    InstallDefaults,
    #[serde(rename = "request_lists")]
    RequestLists,
    #[serde(rename = "request_rules")]
    RequestRules,
    #[serde(rename = "get_settings")]
    GetSettings,
    #[serde(rename = "save_settings")]
    SaveSettings { settings: InterstitialSettings },
    #[serde(rename = "preview_settings")]
    PreviewSettings { payload: Value },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    #[serde(rename = "lists")]
    Lists {
        #[serde(flatten)]
        views: Views,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<StatusMessage>,
    },
    #[serde(rename = "rules")]
    Rules { rules: Vec<MatcherRule> },
    #[serde(rename = "settings")]
    Settings { settings: InterstitialSettings },
    #[serde(rename = "presentation")]
    Presentation(Presentation),
    #[serde(rename = "error")]
    Error { message: String },
}

/// Read one frame. A closed input surfaces as `UnexpectedEof`.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = usize::try_from(u32::from_le_bytes(len_bytes))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Message too large: {len} bytes (max: {MAX_MESSAGE_SIZE} bytes)"),
        ));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

pub fn write_message<W: Write>(writer: &mut W, message: &OutgoingMessage) -> io::Result<()> {
    let json = serde_json::to_vec(message)?;
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Reply too large: {} bytes (max: {MAX_MESSAGE_SIZE} bytes)", json.len()),
        ));
    }
    let len = u32::try_from(json.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()
}

pub struct NativeHost<S, E> {
    sync: Synchronizer<S, E>,
}

impl<S: KeyValueStore, E: RuleEngine> NativeHost<S, E> {
    pub fn new(sync: Synchronizer<S, E>) -> Self {
        Self { sync }
    }

    pub fn synchronizer(&self) -> &Synchronizer<S, E> {
        &self.sync
    }

    /// Serve stdin/stdout until the browser closes the pipe.
    pub fn run(&self) -> io::Result<()> {
        self.serve(&mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// Serve frames from `reader` until it is exhausted. Ends with
    /// `UnexpectedEof` when the peer disconnects between frames.
    pub fn serve<R: Read, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        loop {
            let frame = read_frame(reader)?;
            let response = match serde_json::from_slice::<IncomingMessage>(&frame) {
                Ok(message) => self.handle_message(message),
                Err(e) => {
                    warn!("Ignoring malformed message: {e}");
                    OutgoingMessage::Error { message: format!("Malformed message: {e}") }
                }
            };
            write_message(writer, &response)?;
        }
    }

    pub fn handle_message(&self, message: IncomingMessage) -> OutgoingMessage {
        debug!("Handling {message:?}");
        match message {
            IncomingMessage::AddDomain { value } => {
                self.lists_reply(Operation::Add(EntryType::Domain), self.sync.add_domain(&value))
            }
            IncomingMessage::AddKeyword { value } => {
                self.lists_reply(Operation::Add(EntryType::Keyword), self.sync.add_keyword(&value))
            }
            IncomingMessage::RemoveEntry { id } => self.lists_reply(Operation::Remove, self.sync.remove(id)),
            IncomingMessage::InstallDefaults => {
                self.lists_reply(Operation::InstallDefaults, self.sync.install_catalog_entries())
            }
            IncomingMessage::RequestLists => match self.sync.render() {
                Ok(views) => OutgoingMessage::Lists { views, status: None },
                Err(e) => error_reply("load lists", &e),
            },
            IncomingMessage::RequestRules => match self.sync.compiled_rules() {
                Ok(rules) => OutgoingMessage::Rules { rules },
                Err(e) => error_reply("load rules", &e),
            },
            IncomingMessage::GetSettings => match self.sync.load_settings() {
                Ok(settings) => OutgoingMessage::Settings { settings },
                Err(e) => error_reply("load settings", &e),
            },
            IncomingMessage::SaveSettings { settings } => match self.sync.save_settings(&settings) {
                Ok(settings) => OutgoingMessage::Settings { settings },
                Err(e) => error_reply("save settings", &e),
            },
            IncomingMessage::PreviewSettings { payload } => {
                OutgoingMessage::Presentation(InterstitialSettings::from_preview(&payload).resolve())
            }
        }
    }

    /// Success carries the new views. Failure carries the unchanged views
    /// and the error status.
    fn lists_reply(&self, op: Operation, result: Result<Outcome, AppError>) -> OutgoingMessage {
        match result {
            Ok(outcome) => OutgoingMessage::Lists { views: outcome.views, status: Some(outcome.status) },
            Err(e) => {
                let status = op.failure_status(&e);
                match self.sync.render() {
                    Ok(views) => OutgoingMessage::Lists { views, status: Some(status) },
                    Err(render_err) => {
                        error!("Could not render lists after failure: {render_err}");
                        OutgoingMessage::Error { message: status.text }
                    }
                }
            }
        }
    }
}

fn error_reply(action: &str, e: &AppError) -> OutgoingMessage {
    error!("Failed to {action}: {e}");
    OutgoingMessage::Error { message: e.status_text(action) }
}
