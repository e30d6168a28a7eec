//! Randomized, non-repeating selection across equivalent backend targets.
//!
//! A pool is a set of interchangeable hosts or credentials. One logical
//! request shuffles the pool into a queue, consumes it from the front, and
//! tries each target at most once, strictly sequentially. The first success
//! wins; retryable failures rotate to the next target; a fatal failure
//! aborts the whole pool with the target's error surfaced verbatim.
//!
//! No health state survives the call — every request re-shuffles from
//! scratch, and there is no backoff between targets.

use crate::error::PoolError;
use rand::Rng;
use rand::seq::SliceRandom;
use std::future::Future;

/// Outcome of trying a single target.
#[derive(Debug)]
pub enum Attempt<T> {
    /// Usable response; the pool stops here.
    Success(T),
    /// The target is saturated. Skip it and try another.
    RateLimited(String),
    /// The target could not be reached. Skip it and try another.
    Unreachable(String),
    /// The target is broken, not saturated. Abort the pool.
    Fatal { status: u16, message: String },
}

/// Which non-success HTTP statuses rotate to the next target instead of
/// aborting the pool. One policy per pool, applied uniformly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Rotate on the listed statuses; anything else is fatal.
    Statuses(Vec<u16>),
    /// Rotate on every non-success status, same as a connection failure.
    AllStatuses,
}

impl RetryPolicy {
    /// Classify a non-success response under this policy.
    pub fn classify<T>(&self, status: u16, message: String) -> Attempt<T> {
        match self {
            RetryPolicy::Statuses(retryable) if retryable.contains(&status) => {
                Attempt::RateLimited(format!("{status}: {message}"))
            }
            RetryPolicy::Statuses(_) => Attempt::Fatal { status, message },
            RetryPolicy::AllStatuses => Attempt::Unreachable(format!("{status}: {message}")),
        }
    }
}

/// Try targets in shuffled order until one succeeds or the pool is exhausted.
///
/// Targets are cloned into a queue, shuffled with the caller's RNG, and
/// consumed from the front — each target is attempted at most once, and the
/// loop terminates in at most `targets.len()` attempts. Attempts run one at
/// a time; a target's request completes fully before the next is chosen.
///
/// The RNG is injected so tests can seed a deterministic order.
pub async fn run_pool<T, P, R, F, Fut>(
    targets: &[T],
    rng: &mut R,
    mut attempt: F,
) -> Result<P, PoolError>
where
    T: Clone,
    R: Rng + ?Sized,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Attempt<P>>,
{
    let mut queue: Vec<T> = targets.to_vec();
    queue.shuffle(rng);

    let mut last = String::from("no targets configured");
    for target in queue {
        match attempt(target).await {
            Attempt::Success(payload) => return Ok(payload),
            Attempt::RateLimited(reason) => {
                tracing::debug!(reason = %reason, "target rate limited, rotating");
                last = reason;
            }
            Attempt::Unreachable(reason) => {
                tracing::debug!(reason = %reason, "target unreachable, rotating");
                last = reason;
            }
            Attempt::Fatal { status, message } => {
                return Err(PoolError::Fatal { status, message });
            }
        }
    }

    Err(PoolError::Exhausted { last })
}

#[cfg(test)]
mod tests {
    use super::{Attempt, RetryPolicy, run_pool};
    use crate::error::PoolError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;

    #[tokio::test]
    async fn rate_limited_pool_tries_every_target_exactly_once() {
        let targets = vec![0usize, 1, 2, 3, 4];
        let tried = Mutex::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(7);

        let result: Result<(), PoolError> = run_pool(&targets, &mut rng, |t| {
            tried.lock().unwrap().push(t);
            async move { Attempt::RateLimited(format!("target {t} throttled")) }
        })
        .await;

        assert!(matches!(result, Err(PoolError::Exhausted { .. })));
        let mut order = tried.into_inner().unwrap();
        assert_eq!(order.len(), 5);
        order.sort_unstable();
        assert_eq!(order, targets);
    }

    #[tokio::test]
    async fn single_healthy_target_is_found_wherever_it_lands() {
        // Different seeds shuffle the healthy target into different slots.
        for seed in 0..16 {
            let targets = vec![0usize, 1, 2, 3];
            let mut rng = StdRng::seed_from_u64(seed);
            let result = run_pool(&targets, &mut rng, |t| async move {
                if t == 2 {
                    Attempt::Success("payload")
                } else {
                    Attempt::Unreachable(format!("target {t} down"))
                }
            })
            .await;
            assert_eq!(result.unwrap(), "payload");
        }
    }

    #[tokio::test]
    async fn fatal_error_halts_remaining_targets() {
        let targets = vec![0usize, 1, 2];
        let tried = Mutex::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(3);

        let result: Result<(), PoolError> = run_pool(&targets, &mut rng, |t| {
            tried.lock().unwrap().push(t);
            let fatal = tried.lock().unwrap().len() == 2;
            async move {
                if fatal {
                    Attempt::Fatal { status: 400, message: "bad request".into() }
                } else {
                    Attempt::RateLimited("throttled".into())
                }
            }
        })
        .await;

        match result {
            Err(PoolError::Fatal { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad request");
            }
            other => panic!("expected fatal, got {other:?}"),
        }
        assert_eq!(tried.into_inner().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn exhaustion_carries_last_observed_error() {
        let targets = vec!["a", "b"];
        let mut rng = StdRng::seed_from_u64(0);
        let result: Result<(), PoolError> = run_pool(&targets, &mut rng, |t| async move {
            Attempt::Unreachable(format!("{t} refused connection"))
        })
        .await;
        match result {
            Err(PoolError::Exhausted { last }) => assert!(last.contains("refused connection")),
            other => panic!("expected exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_pool_exhausts_immediately() {
        let targets: Vec<String> = Vec::new();
        let mut rng = StdRng::seed_from_u64(0);
        let result: Result<(), PoolError> =
            run_pool(&targets, &mut rng, |_| async move { Attempt::Success(()) }).await;
        match result {
            Err(PoolError::Exhausted { last }) => assert!(last.contains("no targets")),
            other => panic!("expected exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn seeded_rng_yields_deterministic_order() {
        let targets = vec![0usize, 1, 2, 3, 4, 5];
        let targets = &targets;
        let order_for = |seed| async move {
            let tried = Mutex::new(Vec::new());
            let mut rng = StdRng::seed_from_u64(seed);
            let _: Result<(), PoolError> = run_pool(targets, &mut rng, |t| {
                tried.lock().unwrap().push(t);
                async move { Attempt::Unreachable("down".into()) }
            })
            .await;
            tried.into_inner().unwrap()
        };
        assert_eq!(order_for(42).await, order_for(42).await);
    }

    #[test]
    fn policy_classification() {
        let gemini_style = RetryPolicy::Statuses(vec![429]);
        assert!(matches!(
            gemini_style.classify::<()>(429, "quota".into()),
            Attempt::RateLimited(_)
        ));
        assert!(matches!(
            gemini_style.classify::<()>(500, "boom".into()),
            Attempt::Fatal { status: 500, .. }
        ));

        let pool_style = RetryPolicy::AllStatuses;
        assert!(matches!(
            pool_style.classify::<()>(500, "boom".into()),
            Attempt::Unreachable(_)
        ));
    }
}
