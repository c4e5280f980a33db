//! Adaptive tick pacing.
//!
//! Two cooperating timers: the pacing loop checks wall-clock time against the
//! target interval and fires the tick when due; the tick's measured cost
//! feeds an exponential moving average that stretches the interval under
//! sustained load. The tick is never re-armed before the prior one finished.

use crate::game::Game;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Margin below which the pacing loop stops sleeping and starts yielding.
const YIELD_MARGIN: Duration = Duration::from_millis(5);
/// Headroom added on top of the smoothed tick cost.
const COST_HEADROOM_MS: u64 = 5;

/// What the pacing loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Far from due: park for this long.
    Sleep(Duration),
    /// Within a few milliseconds of due: yield and re-check.
    Yield,
    /// Due now: run the simulation step.
    Tick,
}

/// Pacing state machine. Pure with respect to time: callers pass `now` in,
/// which keeps the schedule testable against a simulated clock.
#[derive(Debug)]
pub struct TickScheduler {
    min_interval: Duration,
    /// Wall-clock anchor of the last fired tick; advances by exactly one
    /// interval per tick so overruns never accumulate as debt.
    origin: Option<Instant>,
    /// Exponentially smoothed tick cost in milliseconds.
    update_time_avg: f64,
    /// Most recent measured tick cost in milliseconds.
    last_cost_ms: f64,
}

impl TickScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            origin: None,
            update_time_avg: 0.0,
            last_cost_ms: 0.0,
        }
    }

    /// Current target interval: smoothed cost plus headroom, floored at the
    /// configured minimum. The loop never runs faster than the floor.
    pub fn interval(&self) -> Duration {
        let adaptive = Duration::from_millis(self.update_time_avg as u64 + COST_HEADROOM_MS);
        self.min_interval.max(adaptive)
    }

    /// Smoothed tick cost in milliseconds.
    pub fn average_cost_ms(&self) -> f64 {
        self.update_time_avg
    }

    /// Record the measured cost of the tick that just ran.
    pub fn record_cost(&mut self, cost: Duration) {
        self.last_cost_ms = cost.as_secs_f64() * 1000.0;
    }

    /// Decide what to do at `now`.
    pub fn poll(&mut self, now: Instant) -> Pacing {
        let step = self.interval();
        let Some(origin) = self.origin else {
            // first tick establishes the time origin
            self.origin = Some(now);
            self.smooth();
            return Pacing::Tick;
        };

        let due = origin + step;
        if now + YIELD_MARGIN < due {
            return Pacing::Sleep(due - now - YIELD_MARGIN);
        }
        if now < due {
            return Pacing::Yield;
        }

        self.smooth();
        self.origin = Some(origin + step);
        Pacing::Tick
    }

    fn smooth(&mut self) {
        self.update_time_avg += 0.5 * (self.last_cost_ms - self.update_time_avg);
    }
}

/// Drive the simulation with the adaptive scheduler. The stop flag on the
/// game is consulted inside `tick` only between simulation steps.
pub async fn run_game_loop(state: Arc<RwLock<Game>>, mut scheduler: TickScheduler) {
    loop {
        match scheduler.poll(Instant::now()) {
            Pacing::Sleep(duration) => tokio::time::sleep(duration).await,
            Pacing::Yield => tokio::task::yield_now().await,
            Pacing::Tick => {
                let mut game = state.write().await;
                let start = Instant::now();
                game.tick();
                let cost = start.elapsed();
                scheduler.record_cost(cost);
                game.update_time_avg = scheduler.average_cost_ms();

                let budget = scheduler.interval().as_secs_f64() * 1000.0 * 0.9;
                let cost_ms = cost.as_secs_f64() * 1000.0;
                if cost_ms > budget {
                    warn!(
                        "Slow tick #{}: {:.2}ms (interval {:?}), {} cells",
                        game.tick_count,
                        cost_ms,
                        scheduler.interval(),
                        game.world.cell_count()
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the state machine against a simulated clock, returning the
    /// instants at which ticks fired.
    fn simulate(scheduler: &mut TickScheduler, cost: Duration, ticks: usize) -> Vec<Instant> {
        let start = Instant::now();
        let mut now = start;
        let mut fired = Vec::new();
        while fired.len() < ticks {
            match scheduler.poll(now) {
                Pacing::Sleep(d) => now += d,
                Pacing::Yield => now += Duration::from_millis(1),
                Pacing::Tick => {
                    fired.push(now);
                    scheduler.record_cost(cost);
                }
            }
        }
        fired
    }

    #[test]
    fn interval_never_drops_below_floor() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(40));
        assert_eq!(scheduler.interval(), Duration::from_millis(40));

        // cheap ticks keep the interval at the floor
        let fired = simulate(&mut scheduler, Duration::from_millis(1), 20);
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(40));
        }
    }

    #[test]
    fn average_converges_to_constant_cost() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(40));
        simulate(&mut scheduler, Duration::from_millis(60), 30);
        assert!((scheduler.average_cost_ms() - 60.0).abs() < 0.5);
        // sustained 60ms ticks stretch the interval to roughly cost + headroom
        // (the average approaches 60 from below, so truncation may shave 1ms)
        let interval_ms = scheduler.interval().as_millis();
        assert!(interval_ms == 64 || interval_ms == 65, "got {interval_ms}ms");
    }

    #[test]
    fn heavy_load_slows_pacing_gracefully() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(40));
        let fired = simulate(&mut scheduler, Duration::from_millis(100), 20);
        // once the average has caught up, spacing tracks the adapted interval
        let late = &fired[10..];
        for pair in late.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[test]
    fn origin_advances_one_interval_per_tick() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(40));
        let start = Instant::now();
        assert_eq!(scheduler.poll(start), Pacing::Tick);

        // show up very late: exactly one tick fires, then pacing resumes
        // from the advanced origin rather than replaying the missed time
        let late = start + Duration::from_millis(400);
        assert_eq!(scheduler.poll(late), Pacing::Tick);
        assert_eq!(scheduler.poll(late), Pacing::Tick);
        // origin has only advanced by whole intervals
        let origin = scheduler.origin.expect("origin set");
        assert_eq!(origin - start, Duration::from_millis(80));
    }

    #[test]
    fn near_due_yields_instead_of_sleeping() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(40));
        let start = Instant::now();
        assert_eq!(scheduler.poll(start), Pacing::Tick);

        match scheduler.poll(start + Duration::from_millis(10)) {
            Pacing::Sleep(d) => assert_eq!(d, Duration::from_millis(25)),
            other => panic!("expected sleep, got {other:?}"),
        }
        assert_eq!(scheduler.poll(start + Duration::from_millis(37)), Pacing::Yield);
        assert_eq!(scheduler.poll(start + Duration::from_millis(40)), Pacing::Tick);
    }
}
