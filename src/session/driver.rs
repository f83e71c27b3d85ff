use super::source::AudioSource;
use super::state::{transition, Command, Event, Phase, SessionState};
use crate::error::AnalysisError;
use crate::pipeline::{render_analysis, RenderOptions, Scene};
use crate::transport::client::Backend;
use crate::transport::codec::AudioCodec;

/// Runs the state machine's commands against real collaborators.
///
/// Events are handled one at a time on the caller's thread; the file read
/// and the backend call are the only places it blocks.
pub struct Session<'a> {
    state: SessionState,
    codec: AudioCodec,
    source: &'a dyn AudioSource,
    backend: &'a dyn Backend,
    options: RenderOptions,
    scene: Option<Scene>,
}

impl<'a> Session<'a> {
    pub fn new(
        source: &'a dyn AudioSource,
        backend: &'a dyn Backend,
        codec: AudioCodec,
        options: RenderOptions,
    ) -> Self {
        Self {
            state: SessionState::default(),
            codec,
            source,
            backend,
            options,
            scene: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Scene for the current result; `None` unless the session is rendered.
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn select(&mut self, file_name: Option<&str>) -> Option<AnalysisError> {
        self.dispatch(Event::SelectFile(file_name.map(str::to_string)))
    }

    pub fn retry(&mut self) -> Option<AnalysisError> {
        self.dispatch(Event::Retry)
    }

    /// Feed one event and run every command it leads to. Returns the
    /// notice for an ignored action, if there was one.
    pub fn dispatch(&mut self, event: Event) -> Option<AnalysisError> {
        let mut pending = Some(event);
        let mut notice = None;

        while let Some(event) = pending.take() {
            let (state, command) = transition(std::mem::take(&mut self.state), event);
            if !matches!(state.phase, Phase::Rendered { .. }) {
                self.scene = None;
            }
            self.state = state;

            pending = match command {
                Some(Command::Notify(err)) => {
                    log::warn!("Ignored: {}", err);
                    notice = Some(err);
                    None
                }
                Some(command) => self.execute(command),
                None => None,
            };
        }

        log::debug!("Session settled in {}", self.state.phase.name());
        notice
    }

    fn execute(&mut self, command: Command) -> Option<Event> {
        match command {
            Command::ReadAndEncode { token, file_name } => {
                log::info!("Reading {} (request {})", file_name, token);
                let encoded = self.source.read(&file_name).and_then(|bytes| {
                    if bytes.is_empty() {
                        log::warn!("{} is empty; sending it anyway", file_name);
                    }
                    let audio = self.codec.encode(&bytes)?;
                    log::info!("Encoded {} bytes into {} characters", bytes.len(), audio.len());
                    if log::log_enabled!(log::Level::Trace) {
                        let round_trip = self.codec.decode(&audio).map(|back| back == bytes);
                        log::trace!("Payload round trip for request {}: {:?}", token, round_trip);
                    }
                    Ok(audio)
                });
                Some(match encoded {
                    Ok(audio) => Event::EncodeComplete { token, audio },
                    Err(error) => Event::EncodeFailed { token, error },
                })
            }
            Command::Submit { token, audio } => {
                log::info!("Submitting request {}", token);
                Some(match self.backend.analyze(&audio) {
                    Ok(result) => Event::ResponseOk { token, result },
                    Err(error) => Event::ResponseErr { token, error },
                })
            }
            Command::Render { token, result } => {
                if result.layers.is_empty() {
                    log::warn!("Request {} returned no layer activations", token);
                }
                let scene = render_analysis(&result, &self.options);
                log::info!(
                    "Rendered request {}: {} predictions, {} layers in {} groups, spectrogram {}x{}, {} waveform points",
                    token,
                    scene.predictions.len(),
                    scene.layer_count(),
                    scene.layers.len(),
                    scene.spectrogram.rows,
                    scene.spectrogram.cols,
                    scene.waveform.points.len()
                );
                self.scene = Some(scene);
                None
            }
            Command::Notify(_) => None,
        }
    }
}
