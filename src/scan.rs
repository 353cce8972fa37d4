//! Scanning state machine for animated UR transfers.
//!
//! Frames from the camera loop are fed in one at a time; once the fountain
//! decoder completes, the reassembled payload is dispatched through the
//! type registry and comes back as a structured wallet artifact.

use tracing::debug;

use crate::fountain;
use crate::ur::{self, Artifact};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Fountain(#[from] fountain::FountainError),

    #[error(transparent)]
    Ur(#[from] ur::UrError),
}

/// Result of feeding one frame to a scan in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanResult {
    /// Transfer complete, payload parsed.
    Complete(Artifact),
    /// More frames needed; fraction of pure fragments resolved so far.
    InProgress { progress: f64 },
}

/// An in-flight animated UR scan.
///
/// The UR type string comes from the enclosing text transport and is fixed
/// for the duration of one transfer.
#[derive(Debug)]
pub struct UrScan {
    ur_type: String,
    decoder: fountain::Decoder,
}

impl UrScan {
    pub fn new(ur_type: impl Into<String>) -> Self {
        Self { ur_type: ur_type.into(), decoder: fountain::Decoder::new() }
    }

    pub fn ur_type(&self) -> &str {
        &self.ur_type
    }

    /// Feed one received frame.
    pub fn receive(&mut self, frame: &[u8]) -> Result<ScanResult, ScanError> {
        self.decoder.add(frame)?;

        match self.decoder.result()? {
            Some(payload) => {
                debug!(ur_type = %self.ur_type, len = payload.len(), "transfer complete");
                Ok(ScanResult::Complete(ur::parse(&self.ur_type, &payload)?))
            }
            None => {
                let progress = self.decoder.progress();
                debug!(ur_type = %self.ur_type, progress, "transfer in progress");
                Ok(ScanResult::InProgress { progress })
            }
        }
    }
}
