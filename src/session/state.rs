//! Session state machine.
//!
//! [`transition`] is pure: it takes the current state and one event and
//! returns the next state plus at most one command for the driver to run.
//! All I/O lives in the driver.

use std::sync::Arc;

use crate::error::AnalysisError;
use crate::model::{AnalysisResult, EncodedAudio};

/// Identifies one request. Tokens only ever increase, so an event carrying
/// anything but the live token is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    fn next(self) -> Self {
        RequestToken(self.0 + 1)
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    Idle,
    Uploading { token: RequestToken },
    AwaitingResponse { token: RequestToken },
    Rendered { result: Arc<AnalysisResult> },
    Failed { error: AnalysisError },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Uploading { .. } => "uploading",
            Phase::AwaitingResponse { .. } => "awaiting_response",
            Phase::Rendered { .. } => "rendered",
            Phase::Failed { .. } => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub file_name: Option<String>,
    last_token: RequestToken,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            file_name: None,
            last_token: RequestToken(0),
        }
    }
}

impl SessionState {
    /// Token of the request currently in flight, if any.
    pub fn live_token(&self) -> Option<RequestToken> {
        match self.phase {
            Phase::Uploading { token } | Phase::AwaitingResponse { token } => Some(token),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.live_token().is_some()
    }

    pub fn result(&self) -> Option<&Arc<AnalysisResult>> {
        match &self.phase {
            Phase::Rendered { result } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match &self.phase {
            Phase::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Start a fresh request for `file_name`, dropping any prior result,
    /// error or in-flight request.
    fn begin(self, file_name: String) -> (SessionState, Option<Command>) {
        let token = self.last_token.next();
        let command = Command::ReadAndEncode {
            token,
            file_name: file_name.clone(),
        };
        let state = SessionState {
            phase: Phase::Uploading { token },
            file_name: Some(file_name),
            last_token: token,
        };
        (state, Some(command))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// `None` when the picker closed without a file.
    SelectFile(Option<String>),
    /// Re-run the last selection after a failure.
    Retry,
    EncodeComplete {
        token: RequestToken,
        audio: EncodedAudio,
    },
    EncodeFailed {
        token: RequestToken,
        error: AnalysisError,
    },
    ResponseOk {
        token: RequestToken,
        result: AnalysisResult,
    },
    ResponseErr {
        token: RequestToken,
        error: AnalysisError,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Read the file and encode it (first suspension point).
    ReadAndEncode {
        token: RequestToken,
        file_name: String,
    },
    /// Send encoded audio to the backend (second suspension point).
    Submit {
        token: RequestToken,
        audio: EncodedAudio,
    },
    /// Run normalize, order and render on a complete result.
    Render {
        token: RequestToken,
        result: Arc<AnalysisResult>,
    },
    /// Tell the user an action was ignored. State is unchanged.
    Notify(AnalysisError),
}

pub fn transition(state: SessionState, event: Event) -> (SessionState, Option<Command>) {
    match event {
        Event::SelectFile(None) => (state, Some(Command::Notify(AnalysisError::NoFileSelected))),
        Event::SelectFile(Some(file_name)) => state.begin(file_name),

        Event::Retry => {
            if let (Phase::Failed { .. }, Some(file_name)) = (&state.phase, &state.file_name) {
                let file_name = file_name.clone();
                return state.begin(file_name);
            }
            log::debug!("retry ignored in phase {}", state.phase.name());
            (state, None)
        }

        Event::EncodeComplete { token, audio } => match state.phase {
            Phase::Uploading { token: live } if live == token => {
                let next = SessionState {
                    phase: Phase::AwaitingResponse { token },
                    ..state
                };
                (next, Some(Command::Submit { token, audio }))
            }
            _ => stale(state, token, "encode result"),
        },

        Event::EncodeFailed { token, error } => match state.phase {
            Phase::Uploading { token: live } if live == token => fail(state, error),
            _ => stale(state, token, "encode failure"),
        },

        Event::ResponseOk { token, result } => match state.phase {
            Phase::AwaitingResponse { token: live } if live == token => {
                let result = Arc::new(result);
                let next = SessionState {
                    phase: Phase::Rendered {
                        result: Arc::clone(&result),
                    },
                    ..state
                };
                (next, Some(Command::Render { token, result }))
            }
            _ => stale(state, token, "response"),
        },

        Event::ResponseErr { token, error } => match state.phase {
            Phase::AwaitingResponse { token: live } if live == token => fail(state, error),
            _ => stale(state, token, "error response"),
        },
    }
}

fn fail(state: SessionState, error: AnalysisError) -> (SessionState, Option<Command>) {
    let next = SessionState {
        phase: Phase::Failed { error },
        ..state
    };
    (next, None)
}

fn stale(state: SessionState, token: RequestToken, what: &str) -> (SessionState, Option<Command>) {
    log::debug!(
        "discarding stale {} for {} (live: {:?})",
        what,
        token,
        state.live_token()
    );
    (state, None)
}
