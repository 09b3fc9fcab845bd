use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::warn;

/// State owned by a single parse call and threaded through every stage.
#[derive(Debug, Default)]
pub struct ParseContext {
    warnings: Vec<String>,
    game_info: JsonMap<String, JsonValue>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recoverable problem.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    pub fn set_game_info(&mut self, game_info: &JsonMap<String, JsonValue>) {
        self.game_info = game_info.clone();
    }

    /// Header JSON of the save being parsed, empty before the header is read.
    pub fn game_info(&self) -> &JsonMap<String, JsonValue> {
        &self.game_info
    }
}
