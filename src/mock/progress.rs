//! Progress sink that remembers what it was told

use std::sync::Mutex;

use crate::progress::{ProgressSink, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    pub step: Step,
    pub message: String,
    pub warning: bool,
}

#[derive(Debug, Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<ProgressLine>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ProgressLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Messages reported for `step`, warnings included.
    pub fn messages(&self, step: Step) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.step == step)
            .map(|l| l.message)
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.warning)
            .map(|l| l.message)
            .collect()
    }

    fn push(&self, step: Step, message: &str, warning: bool) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ProgressLine {
                step,
                message: message.to_string(),
                warning,
            });
    }
}

impl ProgressSink for RecordingProgress {
    fn step(&self, step: Step, message: &str) {
        self.push(step, message, false);
    }

    fn warn(&self, step: Step, message: &str) {
        self.push(step, message, true);
    }
}
