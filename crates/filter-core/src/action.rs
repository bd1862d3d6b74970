//! Signal results and traffic direction.

use std::fmt;

/// Result handed back to the host for a header or body signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Let the host keep processing the exchange.
    #[default]
    Continue,
    /// Hold the exchange until the next signal for it.
    Pause,
}

impl Action {
    /// Check if this action pauses the exchange.
    pub fn is_pause(&self) -> bool {
        matches!(self, Self::Pause)
    }
}

/// Which half of the exchange a signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Downstream request flowing to the upstream.
    Request,
    /// Upstream response flowing back downstream.
    Response,
}

impl Direction {
    /// Both directions, request first.
    pub const ALL: [Direction; 2] = [Direction::Request, Direction::Response];

    /// Lowercase name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_default_is_continue() {
        assert_eq!(Action::default(), Action::Continue);
        assert!(!Action::Continue.is_pause());
        assert!(Action::Pause.is_pause());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Request.to_string(), "request");
        assert_eq!(format!("{}", Direction::Response), "response");
    }
}
