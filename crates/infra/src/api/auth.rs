//! Bearer tokens for hosted backend requests

use async_trait::async_trait;

/// Trait for providing the signed-in user's access token
///
/// REST requests carry it so row-level security sees the user; without one
/// they fall back to the public key.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Access token of the current session, if any
    async fn access_token(&self) -> Option<String>;
}
