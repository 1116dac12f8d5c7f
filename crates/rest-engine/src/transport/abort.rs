use tokio_util::sync::CancellationToken;

/// Cancellation handle for in-flight requests.
///
/// `Clone` shares the underlying token: aborting any clone aborts them all.
/// Use [`DeepClone`](crate::options::DeepClone) for an independent handle.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Read-only view handed to transports.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
        }
    }
}

/// Observes an [`AbortController`] without being able to trigger it.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the controller is aborted.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
