use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one load request. Tokens increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The most recently issued token. A request whose token is no longer the
/// latest has been superseded or cancelled.
#[derive(Debug, Default)]
pub struct LatestRequest(AtomicU64);

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding every earlier one.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.0.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Supersede the current request without starting another.
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.0.load(Ordering::Acquire) == token.0
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}
