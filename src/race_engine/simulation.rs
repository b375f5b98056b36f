//! Simulation - Race session and tick loop
//!
//! The session is the scheduler the engine runs under: it starts ticking on
//! reset, stops when the engine reports completion, keeps ticking (without
//! effect) while paused, and forwards every engine event to the render and
//! audio collaborators.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::race_engine::control::{ControlAction, ControlLabel, ControlToggle};
use crate::race_engine::error::RaceError;
use crate::race_engine::events::{dispatch, AudioSink, FinishCounters, RaceEvent, RenderSink};
use crate::race_engine::race::{Phase, RaceEngine, RaceSnapshot};

/// Number of tick samples kept for averaging
const TICK_SAMPLES: usize = 60;

/// Longest wall-clock wait between two ticks
pub const MAX_TICK_PERIOD: Duration = Duration::from_secs(60);

/// Decides how long the loop waits between ticks
pub trait Pacer {
    fn wait(&mut self, tick_interval: f64);
}

/// Steps as fast as possible
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Pacer for Immediate {
    fn wait(&mut self, _tick_interval: f64) {}
}

/// Sleeps so ticks land on a fixed wall-clock grid.
///
/// Tick units are milliseconds divided by `time_scale`. Deadlines advance
/// from the previous deadline, not from when the sleep returned, so slow
/// ticks do not accumulate drift.
#[derive(Debug, Clone)]
pub struct RealtimePacer {
    time_scale: f64,
    next_deadline: Option<Instant>,
}

impl RealtimePacer {
    pub fn new(time_scale: f64) -> Self {
        // Non-positive or non-finite scales run at wall-clock speed.
        Self {
            time_scale: if time_scale.is_finite() && time_scale > 0.0 {
                time_scale
            } else {
                1.0
            },
            next_deadline: None,
        }
    }

    /// Wall-clock length of one tick, capped at [`MAX_TICK_PERIOD`]
    fn period(&self, tick_interval: f64) -> Duration {
        Duration::try_from_secs_f64(tick_interval / 1000.0 / self.time_scale)
            .map_or(MAX_TICK_PERIOD, |period| period.min(MAX_TICK_PERIOD))
    }
}

impl Default for RealtimePacer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Pacer for RealtimePacer {
    fn wait(&mut self, tick_interval: f64) {
        let period = self.period(tick_interval);
        let now = Instant::now();
        let deadline = match self.next_deadline.and_then(|d| d.checked_add(period)) {
            // Fell more than a period behind, restart the grid.
            Some(deadline) if deadline >= now => Some(deadline),
            _ => now.checked_add(period),
        };
        self.next_deadline = deadline;

        if let Some(remaining) = deadline.and_then(|d| d.checked_duration_since(now)) {
            std::thread::sleep(remaining);
        }
    }
}

/// Session statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub tick_interval: f64,
    pub ticks: u64,
    pub avg_tick_time_ms: f32,
    pub token_count: usize,
    pub phase: Phase,
    pub scheduled: bool,
}

/// Main race session
pub struct RaceSession {
    engine: RaceEngine,
    render: Box<dyn RenderSink>,
    audio: Box<dyn AudioSink>,
    /// Scheduler period
    tick_interval: f64,
    /// Duration and count applied at the next reset
    next_duration: f64,
    next_token_count: usize,
    /// Whether the scheduler is ticking
    scheduled: bool,
    ticks: u64,
    tick_times: VecDeque<f32>,
}

impl RaceSession {
    /// Create an idle session; duration and count default to the engine config
    pub fn new(engine: RaceEngine, render: Box<dyn RenderSink>, audio: Box<dyn AudioSink>) -> Self {
        let config = engine.config();
        Self {
            tick_interval: config.tick_interval,
            next_duration: config.race_duration,
            next_token_count: config.token_count,
            engine,
            render,
            audio,
            scheduled: false,
            ticks: 0,
            tick_times: VecDeque::with_capacity(TICK_SAMPLES),
        }
    }

    /// Set the duration and token count used by the next reset
    pub fn configure(&mut self, duration: f64, token_count: usize) {
        self.next_duration = duration;
        self.next_token_count = token_count;
    }

    /// Start a fresh race and the scheduler
    pub fn reset(&mut self) -> Result<(), RaceError> {
        self.engine.reset(self.next_duration, self.next_token_count)?;

        self.scheduled = true;
        self.tick_times.clear();
        self.render.cleared();
        self.render.counters_updated(FinishCounters::default());
        self.render.phase_changed(Phase::Running);
        Ok(())
    }

    pub fn pause(&mut self) -> bool {
        let changed = self.engine.pause();
        if changed {
            self.render.phase_changed(Phase::Paused);
        }
        changed
    }

    pub fn resume(&mut self) -> bool {
        let changed = self.engine.resume();
        if changed {
            self.render.phase_changed(Phase::Running);
        }
        changed
    }

    /// Press the control button
    pub fn press(&mut self) -> Result<ControlAction, RaceError> {
        let action = ControlToggle::action(self.engine.phase());
        match action {
            ControlAction::Reset => self.reset()?,
            ControlAction::Pause => {
                self.pause();
            }
            ControlAction::Resume => {
                self.resume();
            }
        }
        Ok(action)
    }

    pub fn label(&self) -> ControlLabel {
        ControlToggle::label(self.engine.phase())
    }

    /// One scheduler tick. Returns whether the scheduler is still running.
    pub fn step(&mut self) -> bool {
        if !self.scheduled {
            return false;
        }

        let tick_start = Instant::now();
        let events = self.engine.tick(self.tick_interval);
        for event in &events {
            dispatch(event, self.render.as_mut(), self.audio.as_mut());
            if let RaceEvent::PhaseChanged(Phase::Complete) = event {
                self.scheduled = false;
            }
        }
        self.ticks += 1;

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        if self.tick_times.len() == TICK_SAMPLES {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(tick_time);

        self.scheduled
    }

    /// Tick until the scheduler stops
    pub fn run(&mut self, pacer: &mut dyn Pacer) {
        while self.step() {
            pacer.wait(self.tick_interval);
        }
    }

    /// Check if the scheduler is ticking
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn tick_interval(&self) -> f64 {
        self.tick_interval
    }

    pub fn engine(&self) -> &RaceEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        self.engine.snapshot()
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        SessionStats {
            tick_interval: self.tick_interval,
            ticks: self.ticks,
            avg_tick_time_ms: avg_tick_time,
            token_count: self.engine.token_count(),
            phase: self.engine.phase(),
            scheduled: self.scheduled,
        }
    }
}
