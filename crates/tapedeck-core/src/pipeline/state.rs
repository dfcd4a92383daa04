use crate::audio::{CaptureBuffer, CaptureState, GainControl};

/// Mutable pipeline settings and the capture state machine, owned by one
/// [`Recorder`](crate::Recorder).
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Input to open on the next arm; `None` is the default input.
    pub selected_device: Option<String>,
    /// Gain shared with the open input.
    pub gain: GainControl,
    /// Idle, Armed or Capturing.
    pub capture: CaptureBuffer,
}

impl PipelineState {
    /// State for `selected_device` at `gain`.
    pub fn new(selected_device: Option<String>, gain: f32) -> Self {
        Self {
            selected_device,
            gain: GainControl::new(gain),
            capture: CaptureBuffer::new(),
        }
    }

    /// Name of the capture state.
    pub fn mode(&self) -> &'static str {
        self.capture.state().name()
    }

    /// Whether monitoring without recording.
    pub fn is_armed(&self) -> bool {
        matches!(self.capture.state(), CaptureState::Armed)
    }
}
