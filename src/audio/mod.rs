//! Local audio capture
//!
//! The session controller treats the microphone as an exclusively owned
//! resource: acquired once per connect, streamed to the transport, and
//! released exactly once on every exit path. [`CaptureGrant`] carries that
//! ownership; releasing a grant twice is a safe no-op.

mod capture;
mod file;

pub use capture::{
    AudioCapture, AudioCaptureConfig, AudioCaptureFactory, AudioFrame, AudioSource, CaptureError,
    CaptureGrant,
};
pub use file::FileCapture;
