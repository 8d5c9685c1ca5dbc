//! Inbound request throttling for the HTTP surface (§10 ambient resilience).
//!
//! A single global [`governor`] token bucket protects the coordinator from
//! abusive request volume; this mirrors the venue-facing limiter in the
//! adapters crates, turned around to face inbound traffic instead of
//! outbound venue calls.

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;

#[derive(Clone)]
pub struct RateLimiter {
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl RateLimiter {
    /// `requests_per_minute == 0` disables throttling entirely.
    pub fn new(requests_per_minute: u32) -> Self {
        let limiter = NonZeroU32::try_from(requests_per_minute)
            .ok()
            .map(|rate| Arc::new(DefaultDirectRateLimiter::direct(Quota::per_minute(rate))));
        Self { limiter }
    }

    pub fn check(&self) -> bool {
        self.limiter.as_ref().map(|l| l.check().is_ok()).unwrap_or(true)
    }
}
