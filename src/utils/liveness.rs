//! Guard for asynchronous continuations that may outlive the view that
//! started them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner side of the guard. Retired when the owning view goes away; every
/// token handed out before that turns into a no-op witness.
#[derive(Debug, Clone)]
pub struct Liveness {
    live: Arc<AtomicBool>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn token(&self) -> LivenessToken {
        LivenessToken {
            live: self.live.clone(),
        }
    }

    pub fn retire(&self) {
        self.live.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Captured by an async continuation and checked immediately before the
/// continuation produces any observable effect.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    live: Arc<AtomicBool>,
}

impl LivenessToken {
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_start_live() {
        let liveness = Liveness::new();
        assert!(liveness.token().is_live());
    }

    #[test]
    fn retire_reaches_every_token() {
        let liveness = Liveness::new();
        let token = liveness.token();
        let clone = token.clone();

        liveness.retire();

        assert!(!token.is_live());
        assert!(!clone.is_live());
        assert!(!liveness.token().is_live());
    }
}
