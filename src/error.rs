// MotionPlayer — Initialization Error Taxonomy
//
// Only setup can fail; every variant here is terminal and sends the firmware
// into the fail-stop blink state.  Runtime soft conditions (file enumeration
// unsupported) degrade to sequential mode instead and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    /// The playback module never answered the reset handshake.
    #[error("playback module handshake failed: {0}")]
    Handshake(#[source] anyhow::Error),

    /// Volume/output/EQ configuration could not be delivered.
    #[error("playback module configuration failed: {0}")]
    Configure(#[source] anyhow::Error),

    /// The module answered the handshake but never became ready for queries.
    #[error("playback module not available after {attempts} readiness probes")]
    ReadyTimeout { attempts: u32 },

    /// Storage is reachable but holds zero playable files.
    #[error("storage reports no playable audio files")]
    NoAudioFiles,
}
