use serde::{Deserialize, Serialize};
use serde_json::Value;

use offgate_classifier::ClassificationResult;
use offgate_stats::{LogEntry, StatsSnapshot};

use crate::state::SharedState;

/// Default number of log entries returned when the command names no limit.
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// Commands accepted over the control channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ControlCommand {
    GetStats,
    GetLogs {
        #[serde(default)]
        limit: Option<usize>,
    },
    ResetStats,
    TestUrl {
        url: String,
    },
}

/// Responses paired with the commands above.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ControlResponse {
    #[serde(rename = "STATS")]
    Stats { data: StatsSnapshot },
    #[serde(rename = "LOGS")]
    Logs { data: Vec<LogEntry> },
    #[serde(rename = "RESET_OK")]
    ResetOk,
    #[serde(rename = "TEST_RESULT")]
    TestResult { data: ClassificationResult },
}

/// Execute one control command.
///
/// Returns `None` for malformed or unknown commands: they are logged and
/// ignored without closing the channel or producing an error response.
pub fn dispatch(state: &SharedState, raw: Value) -> Option<ControlResponse> {
    let command: ControlCommand = match serde_json::from_value(raw) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed control command");
            return None;
        }
    };

    match command {
        ControlCommand::GetStats => Some(ControlResponse::Stats {
            data: state.stats.snapshot(),
        }),
        ControlCommand::GetLogs { limit } => Some(ControlResponse::Logs {
            data: state.log.recent(limit.unwrap_or(DEFAULT_LOG_LIMIT)),
        }),
        ControlCommand::ResetStats => {
            state.stats.reset();
            tracing::info!("stats reset via control channel");
            Some(ControlResponse::ResetOk)
        }
        // Pure classifier passthrough; never touches the stats counters.
        ControlCommand::TestUrl { url } => Some(ControlResponse::TestResult {
            data: state.classifier.classify(&url, None),
        }),
    }
}
