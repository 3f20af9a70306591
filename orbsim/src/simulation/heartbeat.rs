//! Per-step heartbeat: checkpointing and progress reports
//!
//! The driver calls the heartbeat after every step. Work is gated by
//! [`IntervalSchedule`], which compares boundary indices
//! `floor(t / interval)` instead of accumulating a float counter, so
//! detection does not drift over billions of steps and costs one division
//! when nothing is due.

use std::time::{Duration, Instant};

use tracing::info;

use crate::archive::ArchiveWriter;
use crate::error::Result;
use crate::simulation::driver::Heartbeat;
use crate::simulation::engine::Simulation;

/// Fires once each time simulation time crosses a multiple of `interval`
#[derive(Debug, Clone)]
pub struct IntervalSchedule {
    interval: f64,
    last: i64, // index of the last boundary seen
}

impl IntervalSchedule {
    /// Boundaries at or before `t0` count as already handled
    pub fn new(interval: f64, t0: f64) -> Self {
        Self {
            interval,
            last: (t0 / interval).floor() as i64,
        }
    }

    /// Boundary index if `t` has crossed a new boundary since the last call
    pub fn due(&mut self, t: f64) -> Option<i64> {
        let k = (t / self.interval).floor() as i64;
        if k > self.last {
            self.last = k;
            Some(k)
        } else {
            None
        }
    }
}

/// Wall-clock vs simulation-time progress
pub struct ProgressReporter {
    end_time: f64,
    started: Instant,
    t_started: f64,
    last_wall: Instant,
    last_t: f64,
}

/// One progress line
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub t: f64,
    pub fraction: f64, // of end_time
    pub elapsed: Duration,
    pub wall_per_sim: f64, // wall seconds per unit sim time, since last report
    pub eta: Option<Duration>,
}

impl ProgressReporter {
    pub fn new(t_started: f64, end_time: f64) -> Self {
        let now = Instant::now();
        Self {
            end_time,
            started: now,
            t_started,
            last_wall: now,
            last_t: t_started,
        }
    }

    /// Measure progress at `t` and reset the rate window
    pub fn measure(&mut self, t: f64) -> Progress {
        let now = Instant::now();
        let dt_sim = t - self.last_t;
        let dt_wall = now.duration_since(self.last_wall).as_secs_f64();
        let wall_per_sim = if dt_sim > 0.0 { dt_wall / dt_sim } else { 0.0 };

        let elapsed = now.duration_since(self.started);
        let done = t - self.t_started;
        let remaining = self.end_time - t;
        let eta = (done > 0.0 && remaining > 0.0)
            .then(|| elapsed.as_secs_f64() * remaining / done)
            .filter(|s| s.is_finite())
            .map(Duration::from_secs_f64);

        self.last_wall = now;
        self.last_t = t;

        Progress {
            t,
            fraction: if self.end_time > 0.0 { t / self.end_time } else { 1.0 },
            elapsed,
            wall_per_sim,
            eta,
        }
    }

    pub fn report(&mut self, sim: &Simulation) {
        let p = self.measure(sim.t());
        info!(
            steps = sim.steps(),
            "t = {:.6e} ({:.4}%), elapsed {:.1} s, {:.3e} s per unit time, eta {}",
            p.t,
            100.0 * p.fraction,
            p.elapsed.as_secs_f64(),
            p.wall_per_sim,
            p.eta.map_or_else(|| "-".to_string(), |d| format!("{:.0} s", d.as_secs_f64())),
        );
    }
}

/// The run's heartbeat: checkpoint on one cadence, report on another
pub struct CheckpointHeartbeat {
    writer: ArchiveWriter,
    checkpoints: IntervalSchedule,
    reports: IntervalSchedule,
    reporter: ProgressReporter,
}

impl CheckpointHeartbeat {
    /// Schedules start from `sim.t()`, so resuming at a checkpoint does not
    /// write it again
    pub fn new(
        writer: ArchiveWriter,
        sim: &Simulation,
        checkpoint_interval: f64,
        report_interval: f64,
        end_time: f64,
    ) -> Self {
        Self {
            writer,
            checkpoints: IntervalSchedule::new(checkpoint_interval, sim.t()),
            reports: IntervalSchedule::new(report_interval, sim.t()),
            reporter: ProgressReporter::new(sim.t(), end_time),
        }
    }
}

impl Heartbeat for CheckpointHeartbeat {
    fn beat(&mut self, sim: &Simulation) -> Result<()> {
        if self.checkpoints.due(sim.t()).is_some() {
            // a failed write ends the run
            self.writer.append(sim)?;
        }
        if self.reports.due(sim.t()).is_some() {
            self.reporter.report(sim);
        }
        Ok(())
    }
}
