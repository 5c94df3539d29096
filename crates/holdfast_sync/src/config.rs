//! Configuration for the drain engine.

/// Configuration for sync behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Abandon a journal entry whose retry count has reached this cap.
    ///
    /// `None` (the default) retries forever: a change never leaves the
    /// journal just because the remote keeps rejecting it. Setting a cap
    /// trades that guarantee for a bounded journal; abandoned entries are
    /// counted in the drain report and logged.
    pub max_retries: Option<u32>,
}

impl SyncConfig {
    /// Creates the default configuration (unbounded retries).
    pub fn new() -> Self {
        Self { max_retries: None }
    }

    /// Sets the retry cap.
    pub fn with_max_retries(mut self, cap: u32) -> Self {
        self.max_retries = Some(cap);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded() {
        assert_eq!(SyncConfig::default().max_retries, None);
        assert_eq!(SyncConfig::new().with_max_retries(5).max_retries, Some(5));
    }
}
