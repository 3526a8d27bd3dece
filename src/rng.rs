//! Process-global cryptographically secure random source.
//!
//! The generator is seeded once from OS entropy. Two instrumentations
//! exist for callers and tests: monotonic begin/end counters around each
//! draw (observable entropy starvation shows up as a persistent gap),
//! and at most one installed interceptor observing every sampled value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

const LOG_TARGET: &str = "verivote::rng";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RngError {
    #[error("an interceptor is already installed")]
    InterceptorAlreadyInstalled,
    #[error("empty range: low {low} >= high {high}")]
    EmptyRange { low: String, high: String },
}

pub type Interceptor = Box<dyn Fn(&BigUint) + Send + Sync>;

static GENERATOR: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_entropy()));
static INTERCEPTOR: Lazy<Mutex<Option<Interceptor>>> = Lazy::new(|| Mutex::new(None));
static DRAWS_BEGUN: AtomicU64 = AtomicU64::new(0);
static DRAWS_FINISHED: AtomicU64 = AtomicU64::new(0);

/// Number of draws begun and finished so far.
pub fn draw_counters() -> (u64, u64) {
    (
        DRAWS_BEGUN.load(Ordering::SeqCst),
        DRAWS_FINISHED.load(Ordering::SeqCst),
    )
}

/// Install an interceptor observing every sampled value. Installing a
/// second one is a hard error.
pub fn install_interceptor(interceptor: Interceptor) -> Result<(), RngError> {
    let mut slot = INTERCEPTOR.lock().expect("rng interceptor lock");
    if slot.is_some() {
        return Err(RngError::InterceptorAlreadyInstalled);
    }
    *slot = Some(interceptor);
    Ok(())
}

/// Remove the installed interceptor, if any. Idempotent.
pub fn remove_interceptor() {
    let mut slot = INTERCEPTOR.lock().expect("rng interceptor lock");
    *slot = None;
}

fn observe(value: &BigUint) {
    let slot = INTERCEPTOR.lock().expect("rng interceptor lock");
    if let Some(interceptor) = slot.as_ref() {
        interceptor(value);
    }
}

/// Uniform integer in `[0, bound)`. `bound` must be nonzero.
pub fn random_below(bound: &BigUint) -> BigUint {
    debug_assert!(!bound.is_zero(), "random_below requires a nonzero bound");
    DRAWS_BEGUN.fetch_add(1, Ordering::SeqCst);
    let value = {
        let mut rng = GENERATOR.lock().expect("rng lock");
        rng.gen_biguint_below(bound)
    };
    observe(&value);
    DRAWS_FINISHED.fetch_add(1, Ordering::SeqCst);
    value
}

/// Uniform integer in `[low, high)`.
pub fn random_in_range(low: &BigUint, high: &BigUint) -> Result<BigUint, RngError> {
    if low >= high {
        return Err(RngError::EmptyRange {
            low: low.to_string(),
            high: high.to_string(),
        });
    }
    let width = high - low;
    Ok(low + random_below(&width))
}

/// Uniform index in `[0, n)`, for permutation sampling.
pub fn random_usize(n: usize) -> usize {
    let drawn = random_below(&BigUint::from(n));
    // the draw is strictly below n, so a single u64 digit holds it
    let out = drawn.to_u64_digits().first().copied().unwrap_or(0) as usize;
    tracing::trace!(target: LOG_TARGET, n, out, "sampled index");
    out
}
