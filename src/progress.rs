use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::AnalysisError;
use crate::model::{AnalysisResult, EncodedAudio};
use crate::transport::client::Backend;

/// Shows a spinner while the wrapped backend is working.
///
/// The spinner ticks on indicatif's own thread and only draws; session
/// state is still touched from the caller's thread alone.
pub struct Spinning<B> {
    inner: B,
}

impl<B: Backend> Spinning<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

impl<B: Backend> Backend for Spinning<B> {
    fn analyze(&self, audio: &EncodedAudio) -> Result<AnalysisResult, AnalysisError> {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message("Analysing...");
        pb.enable_steady_tick(Duration::from_millis(100));

        let outcome = self.inner.analyze(audio);

        match &outcome {
            Ok(_) => pb.finish_with_message("Analysis received"),
            Err(err) => pb.abandon_with_message(format!("Analysis failed: {}", err.kind())),
        }
        outcome
    }
}
