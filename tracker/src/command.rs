//! Generic command surface of the tracker service.
//!
//! Requests arrive as JSON objects whose keys name commands; values are
//! ignored. Every key is validated before any command runs, so a request
//! with one unknown key changes nothing. Commands run in request order.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::controller::TrackingController;
use crate::error::{TrackerError, TrackerResult};

/// A command accepted by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enter Running
    Start,
    /// Enter Idle and stop the base
    Stop,
    /// Anything else; rejected with [`TrackerError::UnknownCommand`]
    Unknown(String),
}

impl Command {
    pub fn parse(key: &str) -> Self {
        match key {
            "start" => Command::Start,
            "stop" => Command::Stop,
            other => Command::Unknown(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Unknown(key) => key,
        }
    }
}

/// Routes commands to a [`TrackingController`].
#[derive(Clone)]
pub struct CommandDispatcher {
    controller: Arc<TrackingController>,
}

impl CommandDispatcher {
    pub fn new(controller: Arc<TrackingController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<TrackingController> {
        &self.controller
    }

    /// Run a single command.
    pub async fn dispatch(&self, command: &Command) -> TrackerResult<()> {
        match command {
            Command::Start => self.controller.start().await,
            Command::Stop => self.controller.stop().await,
            Command::Unknown(key) => {
                warn!("{}: unknown command {:?}", self.controller.name(), key);
                Err(TrackerError::UnknownCommand(key.clone()))
            }
        }
    }

    /// Handle a JSON request such as `{"start": {}}`.
    ///
    /// Returns an object mapping each executed command to `true`.
    pub async fn do_command(&self, request: &Value) -> TrackerResult<Value> {
        let keys = match request.as_object() {
            Some(map) if !map.is_empty() => map.keys(),
            _ => {
                warn!(
                    "{}: command request is not a non-empty object: {}",
                    self.controller.name(),
                    request
                );
                return Err(TrackerError::UnknownCommand(String::new()));
            }
        };

        let commands: Vec<Command> = keys.map(|key| Command::parse(key)).collect();
        if let Some(Command::Unknown(key)) =
            commands.iter().find(|c| matches!(c, Command::Unknown(_)))
        {
            warn!("{}: unknown command {:?}", self.controller.name(), key);
            return Err(TrackerError::UnknownCommand(key.clone()));
        }

        let mut result = Map::new();
        for command in &commands {
            info!("{}: do_command {}", self.controller.name(), command.key());
            self.dispatch(command).await?;
            result.insert(command.key().to_string(), Value::Bool(true));
        }
        Ok(Value::Object(result))
    }
}
