//! Verification seam: compile gate plus optional functional test.

use async_trait::async_trait;

use crate::domain::VerificationReport;

/// Checks whatever the artifact sink last wrote.
///
/// Implementations never fail: missing tools and timeouts are reported as
/// failure text inside the returned [`VerificationReport`].
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self) -> VerificationReport;
}
