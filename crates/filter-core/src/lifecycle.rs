//! Exchange lifecycle tracking.

/// Lifecycle states of a single request/response exchange.
///
/// `Created -> HeadersResolving -> {Matched | Unmatched} -> BodyProcessing -> StreamDone`.
/// Once `Unmatched`, an exchange never reaches `Matched` and no user callback
/// fires for it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Context allocated, no header signal seen yet.
    Created,
    /// Request headers arrived, configuration is being resolved.
    HeadersResolving,
    /// A configuration was attached to the exchange.
    Matched,
    /// No configuration applies; every later phase passes through.
    Unmatched,
    /// At least one body signal has been processed for a matched exchange.
    BodyProcessing,
    /// The stream-done signal was delivered.
    StreamDone,
}

impl ExchangeState {
    /// Check if a configuration is attached in this state.
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched | Self::BodyProcessing)
    }

    /// Check if the exchange is finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamDone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matched_states() {
        assert!(ExchangeState::Matched.is_matched());
        assert!(ExchangeState::BodyProcessing.is_matched());
        assert!(!ExchangeState::Unmatched.is_matched());
        assert!(!ExchangeState::Created.is_matched());
    }

    #[test]
    fn test_terminal_state() {
        assert!(ExchangeState::StreamDone.is_terminal());
        assert!(!ExchangeState::HeadersResolving.is_terminal());
    }
}
