use error_location::ErrorLocation;
use thiserror::Error;

/// Audio pipeline and storage errors with source location tracking.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No matching input device, or permission to use it was denied.
    #[error("Audio input unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Why the device could not be opened.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio device operation failed after the device was found.
    #[error("Audio device error: {reason} {location}")]
    DeviceError {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Encoded audio could not be decoded.
    #[error("Encoding failure: {reason} {location}")]
    EncodingFailure {
        /// Description of the decode problem.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The durable store is missing or could not be opened.
    #[error("Durable store unavailable: {reason} {location}")]
    DurableStoreUnavailable {
        /// Description of the open failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A durable write did not complete.
    #[error("Durable write failed: {reason} {location}")]
    DurableWriteFailure {
        /// Description of the write failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A durable delete did not complete.
    #[error("Durable delete failed for key {storage_key}: {reason} {location}")]
    DurableDeleteFailure {
        /// Key of the entry that could not be removed.
        storage_key: u64,
        /// Description of the delete failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording name was empty after trimming.
    #[error("Recording name must not be empty {location}")]
    InvalidName {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No recording exists with the given id.
    #[error("Recording {id} not found {location}")]
    NotFound {
        /// Requested recording id.
        id: u64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The capture state machine was asked for a transition it does not have.
    #[error("Cannot {action} while {state} {location}")]
    InvalidTransition {
        /// Requested action.
        action: &'static str,
        /// Current state name.
        state: &'static str,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Building or writing an export archive failed.
    #[error("Export failed: {reason} {location}")]
    ExportFailure {
        /// Description of the export failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`AudioError`].
pub type Result<T> = std::result::Result<T, AudioError>;
