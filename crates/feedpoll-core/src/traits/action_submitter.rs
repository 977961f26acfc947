// # Action Submitter Trait
//
// The "submit action" capability handlers use to reply, post or message.
// The monitor engine itself never calls it.

use async_trait::async_trait;

/// Trait for submitting form-encoded account actions
#[async_trait]
pub trait ActionSubmitter: Send + Sync {
    /// Submit `form` to the action endpoint at `path`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The platform accepted the action
    /// - `Err(Error)`: Transport, authentication or rejection error
    async fn submit(&self, path: &str, form: &[(&str, &str)]) -> Result<(), crate::Error>;
}
