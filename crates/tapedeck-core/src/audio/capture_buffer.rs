//! Capture state machine and sample accumulation.

use crate::{AudioError, CoreResult, audio::SampleBlock};

use std::panic::Location;

use chrono::{DateTime, Utc};
use error_location::ErrorLocation;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Where the pipeline is in a recording cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    /// No stream open.
    Idle,
    /// Stream open and metered, nothing accumulated.
    Armed,
    /// Stream open and every block is being kept.
    Capturing(CaptureSession),
}

impl CaptureState {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Armed => "armed",
            CaptureState::Capturing(_) => "capturing",
        }
    }
}

/// Blocks kept between "recording started" and "recording stopped".
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    /// Log correlation id.
    pub session_id: Uuid,
    /// Wall-clock start of capture.
    pub started_at: DateTime<Utc>,
    /// Sample rate of every block in the session.
    pub sample_rate: u32,
    blocks: Vec<SampleBlock>,
}

impl CaptureSession {
    fn new(sample_rate: u32) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            sample_rate,
            blocks: Vec::new(),
        }
    }

    /// Blocks in arrival order.
    pub fn blocks(&self) -> &[SampleBlock] {
        &self.blocks
    }

    /// Total samples held.
    pub fn sample_count(&self) -> usize {
        self.blocks.iter().map(SampleBlock::len).sum()
    }

    /// Concatenate post-gain samples in arrival order.
    pub fn into_samples(self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.sample_count());
        for block in &self.blocks {
            samples.extend_from_slice(block.samples());
        }
        samples
    }
}

/// A finished session flattened into one contiguous array.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushedCapture {
    /// Id of the session the samples came from.
    pub session_id: Uuid,
    /// Wall-clock start of capture.
    pub started_at: DateTime<Utc>,
    /// Sample rate of `samples`.
    pub sample_rate: u32,
    /// Post-gain samples in arrival order.
    pub samples: Vec<f32>,
}

/// Owns the capture state machine: Idle → Armed → Capturing → Idle.
#[derive(Debug)]
pub struct CaptureBuffer {
    state: CaptureState,
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBuffer {
    /// Buffer in the Idle state.
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Whether blocks are currently being kept.
    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing(_))
    }

    /// Whether a stream should be open (Armed or Capturing).
    pub fn is_active(&self) -> bool {
        !matches!(self.state, CaptureState::Idle)
    }

    /// Idle → Armed.
    #[track_caller]
    pub fn arm(&mut self) -> CoreResult<()> {
        match self.state {
            CaptureState::Idle => {
                self.state = CaptureState::Armed;
                debug!("Capture buffer armed");
                Ok(())
            }
            _ => Err(self.invalid("arm")),
        }
    }

    /// Armed → Capturing. Starts a new session.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn start(&mut self, sample_rate: u32) -> CoreResult<Uuid> {
        match self.state {
            CaptureState::Armed => {
                let session = CaptureSession::new(sample_rate);
                let session_id = session.session_id;
                self.state = CaptureState::Capturing(session);
                info!(session_id = %session_id, sample_rate, "Capture started");
                Ok(session_id)
            }
            _ => Err(self.invalid("start capture")),
        }
    }

    /// Armed → Idle without keeping anything.
    #[track_caller]
    pub fn disarm(&mut self) -> CoreResult<()> {
        match self.state {
            CaptureState::Armed => {
                self.state = CaptureState::Idle;
                debug!("Capture buffer disarmed");
                Ok(())
            }
            _ => Err(self.invalid("disarm")),
        }
    }

    /// Keep `block` if Capturing; otherwise ignore it. Returns whether it was kept.
    pub fn accept(&mut self, block: SampleBlock) -> bool {
        match &mut self.state {
            CaptureState::Capturing(session) => {
                session.blocks.push(block);
                true
            }
            _ => false,
        }
    }

    /// Capturing → Idle. Flattens and discards the session.
    ///
    /// Any other state also ends in Idle; `None` is returned when there was
    /// no session to flush.
    #[instrument(skip(self))]
    pub fn stop(&mut self) -> Option<FlushedCapture> {
        match std::mem::replace(&mut self.state, CaptureState::Idle) {
            CaptureState::Capturing(session) => {
                let session_id = session.session_id;
                let started_at = session.started_at;
                let sample_rate = session.sample_rate;
                let block_count = session.blocks.len();
                let samples = session.into_samples();

                info!(
                    session_id = %session_id,
                    block_count,
                    sample_count = samples.len(),
                    "Capture flushed"
                );

                Some(FlushedCapture {
                    session_id,
                    started_at,
                    sample_rate,
                    samples,
                })
            }
            _ => None,
        }
    }

    #[track_caller]
    fn invalid(&self, action: &'static str) -> AudioError {
        AudioError::InvalidTransition {
            action,
            state: self.state.name(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
