use tokio_util::sync::CancellationToken;

use crate::status::Status;

/// Per-call state handed to every operation.
#[derive(Debug, Clone)]
pub struct CallContext {
    peer_id: String,
    call_id: u32,
    cancel: CancellationToken,
}

impl CallContext {
    pub fn new(peer_id: impl Into<String>, call_id: u32, cancel: CancellationToken) -> Self {
        Self {
            peer_id: peer_id.into(),
            call_id,
            cancel,
        }
    }

    /// A context not tied to any connection, for in-process calls.
    pub fn detached() -> Self {
        Self::new("local", 0, CancellationToken::new())
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn call_id(&self) -> u32 {
        self.call_id
    }

    /// Token cancelled when the caller disconnects or the server shuts down.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once the call has been cancelled.
    ///
    /// Long-running hook logic should call this between stages.
    pub fn ensure_active(&self) -> Result<(), Status> {
        if self.is_cancelled() {
            return Err(Status::cancelled(format!(
                "call {} from {} was cancelled",
                self.call_id, self.peer_id
            )));
        }
        Ok(())
    }
}
