//! In-memory state of the single detection page.

use crate::diagnosis::DiagnosisResult;
use crate::encoder::ImagePayload;
use crate::error::Result;

/// Shown for every failed detection, whatever went wrong underneath.
pub const DETECT_FAILED_NOTICE: &str = "Failed to detect crop disease.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Ready,
    Detecting,
    ResultPositive,
    ResultNegative,
}

#[derive(Debug, Default)]
pub struct Page {
    image: Option<ImagePayload>,
    result: Option<DiagnosisResult>,
    is_loading: bool,
    notice: Option<String>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn result(&self) -> Option<&DiagnosisResult> {
        self.result.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Replaces the held image. Any earlier result stays until the next detection overwrites it.
    pub fn select_image(&mut self, image: ImagePayload) {
        self.image = Some(image);
    }

    pub fn can_detect(&self) -> bool {
        self.image.is_some() && !self.is_loading
    }

    /// Marks a detection as in flight and hands back the image to send.
    /// Returns `None` without touching the loading flag when there is no image.
    pub fn begin_detect(&mut self) -> Option<ImagePayload> {
        let image = self.image.clone()?;
        self.is_loading = true;
        Some(image)
    }

    /// Applies the outcome of a detection. A failure keeps the previous result and queues a notice.
    pub fn finish_detect(&mut self, outcome: Result<DiagnosisResult>) {
        self.is_loading = false;
        match outcome {
            Ok(result) => self.result = Some(result),
            Err(_) => self.notice = Some(DETECT_FAILED_NOTICE.to_string()),
        }
    }

    /// Removes the pending notice so it is shown exactly once.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn view_state(&self) -> ViewState {
        if self.is_loading {
            return ViewState::Detecting;
        }
        match (&self.result, &self.image) {
            (Some(result), _) if result.is_negative() => ViewState::ResultNegative,
            (Some(_), _) => ViewState::ResultPositive,
            (None, Some(_)) => ViewState::Ready,
            (None, None) => ViewState::Idle,
        }
    }
}
