//! The `RateExecutor`: simulated users paced by a stage-driven token bucket.
//!
//! # High-level flow
//! 1. A shared execution context holds the start and shutdown signals and the
//!    token pool (a `tokio::sync::Semaphore`).
//! 2. The governor task adds tokens to the pool every `tick`, following the
//!    configured `Stage`s.
//! 3. `users` tasks are spawned. Each one waits for the start signal, then
//!    repeatedly takes a token, runs one workflow iteration, and folds the
//!    result into its own `Tally`.
//! 4. When the governor finishes its last stage (or the process receives
//!    Ctrl-C) shutdown is broadcast. In-flight iterations are dropped where
//!    they stand and the per-user tallies are merged.
//!
//! # Rate interpolation
//! Within a stage running from `start_rate` to `end_rate` over `duration`:
//!
//! ```text
//! t = elapsed / duration
//! r(t) = start_rate + (end_rate - start_rate) * t
//! add_f = r(t) * tick_seconds
//! add_total = floor(add_f + fractional)
//! fractional = (add_f + fractional) - add_total
//! ```
//!
//! Carrying `fractional` between ticks keeps the long-run average exact when a
//! tick's share is not a whole number of tokens.

use futures::future::join_all;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    sync::{
        Semaphore,
        watch::{Receiver, Sender, channel},
    },
    task::JoinHandle,
    time::Instant,
};
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{error::ExecutorError, scenario::Scenario, tally::Tally, workflow::Iteration};
use internals::*;

/// A stage defines a target rate (workflow iterations per second) and how long
/// to ramp to it.
///
/// A zero `duration` jumps to `target` instantly without adding tokens itself;
/// follow it with a non-zero stage to hold that rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stage {
    pub duration: Duration,
    pub target: f64,
}

impl Stage {
    pub fn new(duration: Duration, target: f64) -> Self {
        Self { duration, target }
    }
}

/// Hard ceiling of the semaphore backing the token pool.
const MAX_TOKENS: usize = Semaphore::MAX_PERMITS;

/// Executor running `users` concurrent simulated users under a token-bucket
/// rate governor.
///
/// - `tick`: how often the governor tops up the bucket. Smaller is smoother
///   but wakes more often.
/// - `bucket_capacity`: most tokens that may be banked for a burst.
/// - `users`: concurrent simulated users, one Tokio task each.
#[derive(TypedBuilder)]
pub struct RateExecutor {
    pub stages: Vec<Stage>,
    #[builder(default = Duration::from_millis(100))]
    pub tick: Duration,
    #[builder(default = MAX_TOKENS)]
    pub bucket_capacity: usize,
    #[builder(default = num_cpus::get())]
    pub users: usize,
}

impl<F, Fut> Executor<F, Fut> for RateExecutor
where
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Iteration> + Send + 'static,
{
    type Error = ExecutorError;

    async fn exec(&self, scenario: &Scenario<F, Fut>) -> Result<Tally, Self::Error> {
        let (ctx, controls) = ExecutionContext::new();
        tracing::info!("Spawning token governor task...");
        let governor = tokio::spawn(token_governor_task(
            ctx.clone(),
            self.stages.clone(),
            self.tick,
            self.bucket_capacity.min(MAX_TOKENS),
        ));

        tracing::info!("Spawning {} simulated users...", self.users);
        let handles = spawn_users(ctx, self.users, scenario.action.clone());

        tracing::info!("Running scenario: {}!", scenario.name);
        controls.start.send(true).map_err(|_| ExecutorError::Start)?;

        tokio::select! {
            result = governor => {
                if let Err(e) = result {
                    tracing::error!("Token governor task failed: {e}");
                }
                tracing::info!("Governor finished, signaling shutdown...");
            }
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, stopping simulated users...");
            }
        }
        controls.shutdown.send_replace(true);

        let mut tally = Tally::new();
        for result in join_all(handles).await {
            match result {
                Ok(user_tally) => tally.merge(user_tally),
                // One lost user should not cost the whole run its numbers.
                Err(e) => tracing::error!("Simulated user panicked: {e}"),
            }
        }

        tracing::info!(
            "Done running scenario: {} ({} iterations, {} aborted)",
            scenario.name,
            tally.iterations,
            tally.aborted
        );
        Ok(tally)
    }
}

mod internals {
    use super::*;

    /// State shared by the governor and every user task.
    #[derive(Clone)]
    pub struct ExecutionContext {
        pub start: Receiver<bool>,
        pub shutdown: Receiver<bool>,
        /// Users take permits, the governor adds them.
        pub tokens: Arc<Semaphore>,
    }

    /// Sending halves of the start and shutdown signals, kept by the executor.
    pub struct Controls {
        pub start: Sender<bool>,
        pub shutdown: Sender<bool>,
    }

    impl ExecutionContext {
        pub fn new() -> (Self, Controls) {
            let (start_tx, start_rx) = channel(false);
            let (shutdown_tx, shutdown_rx) = channel(false);
            (
                Self {
                    start: start_rx,
                    shutdown: shutdown_rx,
                    tokens: Arc::new(Semaphore::new(0)),
                },
                Controls {
                    start: start_tx,
                    shutdown: shutdown_tx,
                },
            )
        }
    }

    /// Adds tokens to the pool according to `stages`, then returns.
    pub async fn token_governor_task(
        ctx: ExecutionContext,
        stages: Vec<Stage>,
        tick: Duration,
        bucket_capacity: usize,
    ) {
        let ExecutionContext {
            mut start,
            mut shutdown,
            tokens,
        } = ctx;

        let main_task = async {
            if start.wait_for(|s| *s).await.is_err() {
                return;
            }
            tracing::debug!("Governor task started.");

            let mut rate = 0.0;
            let mut fractional = 0.0;
            let total = stages.len();
            for (i, stage) in stages.iter().enumerate() {
                tracing::info!("Starting stage: {}/{total}", i + 1);
                if stage.duration.is_zero() {
                    rate = stage.target;
                    continue;
                }

                let stage_start = Instant::now();
                let mut next_tick = stage_start;
                let start_rate = rate;
                let end_rate = stage.target;

                loop {
                    let elapsed = Instant::now().duration_since(stage_start);
                    if elapsed >= stage.duration {
                        break;
                    }
                    next_tick += tick;

                    let (add_total, f) = calc_token_limit(
                        elapsed,
                        stage.duration,
                        start_rate,
                        end_rate,
                        fractional,
                        tick,
                    );
                    fractional = f;

                    let available = tokens.available_permits();
                    if add_total > 0 && available < bucket_capacity {
                        let add = add_total.min(bucket_capacity - available);
                        tokens.add_permits(add);
                    }
                    tokio::time::sleep_until(next_tick).await;
                }
                // Start the next stage from this stage's exact target.
                rate = end_rate;
            }
        };

        tokio::select! {
            _ = main_task => {
                tracing::debug!("Governor task finished all stages.");
            }
            _ = shutdown.wait_for(|b| *b) => {
                tracing::debug!("Governor received shutdown signal.");
            }
        };
    }

    /// Tokens to add this tick, and the fractional remainder to carry.
    pub fn calc_token_limit(
        elapsed: Duration,
        stage_duration: Duration,
        start_rate: f64,
        end_rate: f64,
        fractional: f64,
        tick: Duration,
    ) -> (usize, f64) {
        let t = (elapsed.as_secs_f64() / stage_duration.as_secs_f64()).min(1.0);
        let tick_rate = start_rate + (end_rate - start_rate) * t;
        let add_f = tick_rate * tick.as_secs_f64();

        let add_total_f = (add_f + fractional).floor();
        let fractional = (add_f + fractional) - add_total_f;

        let add_total = if add_total_f >= MAX_TOKENS as f64 {
            MAX_TOKENS
        } else if add_total_f < 0.0 {
            0
        } else {
            add_total_f as usize
        };

        (add_total, fractional)
    }

    /// Spawn `users` tasks. Each waits for the start signal, then runs
    /// `action` once per token until shutdown.
    pub fn spawn_users<F, Fut>(ctx: ExecutionContext, users: usize, action: F) -> Vec<JoinHandle<Tally>>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Iteration> + Send + 'static,
    {
        (0..users)
            .map(|i| {
                let ExecutionContext {
                    mut start,
                    mut shutdown,
                    tokens,
                } = ctx.clone();
                let action = action.clone();
                tokio::spawn(async move {
                    let mut tally = Tally::new();

                    let main_task = async {
                        if start.wait_for(|s| *s).await.is_err() {
                            return;
                        }
                        tracing::debug!("User {i} started.");
                        loop {
                            let Ok(permit) = tokens.clone().acquire_owned().await else {
                                tracing::debug!("User {i} found the token pool closed.");
                                break;
                            };
                            // Only the governor returns tokens to the pool.
                            permit.forget();

                            let iteration = action().await;
                            tally.consume(&iteration);
                        }
                    };

                    tokio::select! {
                        _ = main_task => {}
                        _ = shutdown.wait_for(|b| *b) => {}
                    };

                    tracing::debug!("User {i} shutting down.");
                    tally
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Workflow;

    fn instant_iteration() -> Iteration {
        Iteration {
            workflow: Workflow::CollectionBrowse,
            elapsed: Duration::from_millis(1),
            aborted: None,
        }
    }

    #[tokio::test]
    async fn spawn_expected_number_of_users() {
        let n = 10;
        let (ctx, _controls) = ExecutionContext::new();
        let action = || async { instant_iteration() };
        let users = spawn_users(ctx, n, action);

        assert_eq!(users.len(), n);
        for user in users {
            user.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn users_stop_on_shutdown_and_return_their_tally() {
        let (ctx, controls) = ExecutionContext::new();
        let users = spawn_users(ctx.clone(), 3, || async { instant_iteration() });

        controls.start.send(true).unwrap();
        ctx.tokens.add_permits(9);
        tokio::time::sleep(Duration::from_millis(50)).await;
        controls.shutdown.send(true).unwrap();

        let mut total = Tally::new();
        for user in join_all(users).await {
            total.merge(user.unwrap());
        }
        assert_eq!(total.iterations, 9);
        assert_eq!(total.workflows["get_collections"].completed, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn exec_runs_until_the_last_stage_ends() {
        let executor = RateExecutor::builder()
            .stages(vec![
                Stage::new(Duration::ZERO, 200.0),
                Stage::new(Duration::from_millis(300), 200.0),
            ])
            .tick(Duration::from_millis(10))
            .users(4)
            .build();
        let scenario = Scenario::builder()
            .name("steady")
            .action(|| async { instant_iteration() })
            .build();

        let started = Instant::now();
        let tally = executor.exec(&scenario).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(300));
        // 30 ticks of 2 tokens each.
        assert_eq!(tally.iterations, 60);
        assert_eq!(tally.aborted, 0);
    }

    mod calc_token_limit {
        use super::*;

        #[test]
        fn linearity() {
            let mut end_rate = 100.;
            let mut expected_t = 1;
            for _ in 0..10 {
                let (t, _) = calc_token_limit(
                    Duration::from_secs(1),
                    Duration::from_secs(10),
                    0.,
                    end_rate,
                    0.,
                    Duration::from_millis(100),
                );
                assert_eq!(t, expected_t);
                end_rate *= 10.;
                expected_t *= 10;
            }
        }

        #[test]
        fn fractional_part_is_carried() {
            let mut carry = 0.;
            let mut added = 0;
            for _ in 0..8 {
                let (t, f) = calc_token_limit(
                    Duration::from_secs(1),
                    Duration::from_secs(10),
                    2.5,
                    2.5,
                    carry,
                    Duration::from_millis(100),
                );
                carry = f;
                added += t;
            }
            // 0.25 tokens per tick over 8 ticks.
            assert_eq!(added, 2);
            assert_eq!(carry, 0.);
        }

        #[test]
        fn ramp_down() {
            let stage_duration = Duration::from_secs(10);
            let tick = Duration::from_millis(100);
            for i in 0..10 {
                let (t, _) = calc_token_limit(
                    Duration::from_secs(i),
                    stage_duration,
                    100.0,
                    0.0,
                    0.0,
                    tick,
                );
                assert_eq!(t, (10 - i) as usize);
            }
        }

        #[test]
        fn elapsed_past_duration_holds_end_rate() {
            for extra in 0..10 {
                let (t, _) = calc_token_limit(
                    Duration::from_secs(10 + extra),
                    Duration::from_secs(10),
                    0.,
                    100.,
                    0.,
                    Duration::from_millis(100),
                );
                assert_eq!(t, 10);
            }
        }

        #[test]
        fn negative_rate_adds_nothing() {
            let (t, _) = calc_token_limit(
                Duration::from_secs(1),
                Duration::from_secs(10),
                -100.,
                -100.,
                0.,
                Duration::from_millis(100),
            );
            assert_eq!(t, 0);
        }

        #[test]
        fn unlimited_rate_caps_at_max_tokens() {
            let (t, _) = calc_token_limit(
                Duration::from_secs(1),
                Duration::from_secs(1),
                f64::MAX,
                f64::MAX,
                0.,
                Duration::from_secs(1),
            );
            assert_eq!(t, MAX_TOKENS);
        }
    }
}
