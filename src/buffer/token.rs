//! Change tokens for cache coherence.
//!
//! A buffer's token is dropped on every mutation and lazily re-issued the
//! next time someone asks for it. Token equality is the only validity test.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide token source; tokens are never reused.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of one buffer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeToken(NonZeroU64);

impl ChangeToken {
    fn fresh() -> Self {
        let raw = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 mutations to wrap.
        ChangeToken(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }
}

/// Holds the current token of a buffer, `0` meaning "invalidated".
#[derive(Debug, Default)]
pub(crate) struct TokenCell(AtomicU64);

impl TokenCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Drop the current token. Called with the storage write lock held.
    #[inline]
    pub(crate) fn invalidate(&self) {
        self.0.store(0, Ordering::Release);
    }

    /// Current token, issuing a new one if the last was invalidated.
    pub(crate) fn current(&self) -> ChangeToken {
        let raw = self.0.load(Ordering::Acquire);
        if let Some(existing) = NonZeroU64::new(raw) {
            return ChangeToken(existing);
        }

        let fresh = ChangeToken::fresh();
        match self
            .0
            .compare_exchange(0, fresh.0.get(), Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => fresh,
            // Another reader issued one first; everyone must agree on it.
            Err(other) => NonZeroU64::new(other).map(ChangeToken).unwrap_or(fresh),
        }
    }

    #[inline]
    pub(crate) fn is_valid(&self, token: ChangeToken) -> bool {
        self.0.load(Ordering::Acquire) == token.0.get()
    }
}
