//! The seam between the queue (scheduling) and the actual work an
//! operation does (§4.10). The engine facade supplies one
//! [`OperationDispatcher`] wired to the scanner/organizer/resolution/dedup
//! modules; tests supply a fake.

use crate::error::Result;
use crate::models::OperationKind;
use crate::operations::reporter::RateLimitedReporter;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a running operation needs from the queue: its id, a
/// cancellation signal to poll at well-defined yield points (§5
/// "Suspension points"), and a reporter that's already rate-limited.
#[derive(Clone)]
pub struct OperationContext {
    pub operation_id: String,
    pub cancellation: CancellationToken,
    pub reporter: Arc<RateLimitedReporter>,
}

impl OperationContext {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Executes the work behind one [`OperationKind`].
#[async_trait]
pub trait OperationDispatcher: Send + Sync {
    async fn dispatch(&self, kind: &OperationKind, ctx: OperationContext) -> Result<()>;
}
