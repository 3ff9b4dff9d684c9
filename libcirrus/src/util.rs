use std::sync::atomic::{AtomicBool, Ordering};

use lazy_static::lazy_static;

#[cfg(test)]
#[ctor::ctor]
fn init_test_env() {
    color_backtrace::install();
    init_logsum();
}

pub trait LogAbuse {
    fn ln_or_inf(self) -> f32;
}

impl LogAbuse for f32 {
    fn ln_or_inf(self) -> f32 {
        if self == 0.0 {
            -f32::INFINITY
        } else {
            self.ln()
        }
    }
}

pub const LOGSUM_SCALE: f32 = 1000.0;
pub const LOGSUM_TABLE_SIZE: usize = 16000;
/// Past this difference the smaller term no longer moves an f32 sum.
const LOGSUM_CUTOFF: f32 = 15.7;

lazy_static! {
    pub static ref LOGSUM_LOOKUP: Vec<f32> = (0..LOGSUM_TABLE_SIZE)
        .map(|i| (1.0 + (-(i as f64) / LOGSUM_SCALE as f64).exp()).ln() as f32)
        .collect();
}

// LOGSUM_LOOKUP builds itself on first touch, so reading the table never fails.
// This flag is what makes the DP entry points refuse to run before init_logsum().
static LOGSUM_READY: AtomicBool = AtomicBool::new(false);

/// Build the log-sum lookup table.
///
/// This must run before any of the DP entry points are called. It is
/// safe to call more than once and from more than one thread.
pub fn init_logsum() {
    lazy_static::initialize(&LOGSUM_LOOKUP);
    LOGSUM_READY.store(true, Ordering::Release);
}

pub fn logsum_initialized() -> bool {
    LOGSUM_READY.load(Ordering::Acquire)
}

/// A fast, table driven approximation of the sum of two floats in log space.
#[inline(always)]
pub fn log_add(a: f32, b: f32) -> f32 {
    let min = f32::min(a, b);
    let max = f32::max(a, b);

    debug_assert!(!a.is_nan());
    debug_assert!(!b.is_nan());
    debug_assert!(!a.is_sign_positive() || a.is_finite());
    debug_assert!(!b.is_sign_positive() || b.is_finite());

    if min == -f32::INFINITY || max - min >= LOGSUM_CUTOFF {
        max
    } else {
        max + LOGSUM_LOOKUP[((max - min) * LOGSUM_SCALE) as usize]
    }
}

/// The exact ln(e^a + e^b), used to validate the lookup table.
pub fn logsum_exact(a: f32, b: f32) -> f32 {
    let min = f32::min(a, b);
    let max = f32::max(a, b);

    if min == -f32::INFINITY {
        max
    } else {
        max + ((min - max) as f64).exp().ln_1p() as f32
    }
}

#[macro_export]
macro_rules! log_sum {
    // Base case:
    ($x:expr) => ($x);
    // `$x` followed by at least one `$y,`
    ($x:expr, $($y:expr),+) => (
        // Call `log_sum!` on the tail `$y`
        $crate::util::log_add($x, $crate::log_sum!($($y),+))
    )
}

#[macro_export]
macro_rules! max_f32 {
    // Base case:
    ($x:expr) => ($x);
    // `$x` followed by at least one `$y,`
    ($x:expr, $($y:expr),+) => (
        // Call `max_f32!` on the tail `$y`
        f32::max($x, $crate::max_f32!($($y),+))
    )
}
