//! Race - Race configuration and engine state machine
//!
//! Handles batch setup, staggered admission, motion, finish detection and
//! the Idle/Running/Paused/Complete phase machine.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::race_engine::error::RaceError;
use crate::race_engine::events::{FinishCounters, RaceEvent, TokenCreated};
use crate::race_engine::generator::{
    ColorBands, TokenGenerator, DEFAULT_LANE_OFFSET_MAX, DEFAULT_LANE_OFFSET_MIN,
};
use crate::race_engine::token::{ColorClass, Motion, Token, TokenSnapshot};

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Total race duration (time units, milliseconds when paced in real time)
    pub race_duration: f64,
    /// Number of tokens per race
    pub token_count: usize,
    /// Smallest label (inclusive)
    pub min_label: i64,
    /// Largest label (inclusive)
    pub max_label: i64,
    /// Distance to the finish line
    pub lane_length: f64,
    /// Scheduler period
    pub tick_interval: f64,
    /// Cosmetic lane offset bounds
    pub lane_offset_min: f64,
    pub lane_offset_max: f64,
    /// Colors, one contiguous label band each
    pub palette: Vec<ColorClass>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            race_duration: 3000.0,
            token_count: 30,
            min_label: 1,
            max_label: 60,
            lane_length: 300.0,
            tick_interval: 10.0,
            lane_offset_min: DEFAULT_LANE_OFFSET_MIN,
            lane_offset_max: DEFAULT_LANE_OFFSET_MAX,
            palette: ColorClass::DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl RaceConfig {
    /// Parse a JSON config; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check the lane and scheduler geometry
    pub fn validate(&self) -> Result<(), RaceError> {
        if !self.lane_length.is_finite() || self.lane_length <= 0.0 {
            return Err(RaceError::invalid(format!(
                "lane length must be positive, got {}",
                self.lane_length
            )));
        }
        if !self.tick_interval.is_finite() || self.tick_interval <= 0.0 {
            return Err(RaceError::invalid(format!(
                "tick interval must be positive, got {}",
                self.tick_interval
            )));
        }
        if self.palette.is_empty() {
            return Err(RaceError::EmptyPalette);
        }
        validate_race(self.race_duration, self.token_count)
    }
}

fn validate_race(duration: f64, token_count: usize) -> Result<(), RaceError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(RaceError::invalid(format!(
            "race duration must be positive, got {duration}"
        )));
    }
    if token_count == 0 {
        return Err(RaceError::invalid("a race needs at least one token"));
    }
    Ok(())
}

/// Engine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Complete,
}

/// The race simulation
pub struct RaceEngine {
    config: RaceConfig,
    generator: TokenGenerator,
    bands: ColorBands,
    rng: StdRng,
    phase: Phase,
    /// Not yet admitted, generation order
    pending: VecDeque<Token>,
    /// Admitted, admission order
    active: Vec<Token>,
    elapsed: f64,
    race_duration: f64,
    token_count: usize,
    counters: FinishCounters,
}

impl RaceEngine {
    /// Create an idle engine with an entropy-seeded generator
    pub fn new(config: RaceConfig) -> Result<Self, RaceError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an idle engine whose batches are reproducible from `seed`
    pub fn with_seed(config: RaceConfig, seed: u64) -> Result<Self, RaceError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: RaceConfig, rng: StdRng) -> Result<Self, RaceError> {
        config.validate()?;
        let generator = TokenGenerator::new(config.lane_offset_min, config.lane_offset_max)?;
        let bands = ColorBands::new(config.min_label, config.max_label, config.palette.clone())?;

        Ok(Self {
            race_duration: config.race_duration,
            token_count: config.token_count,
            config,
            generator,
            bands,
            rng,
            phase: Phase::Idle,
            pending: VecDeque::new(),
            active: Vec::new(),
            elapsed: 0.0,
            counters: FinishCounters::default(),
        })
    }

    /// Discard the current race and start a fresh batch.
    ///
    /// On error nothing changes, including the phase.
    pub fn reset(&mut self, duration: f64, token_count: usize) -> Result<(), RaceError> {
        validate_race(duration, token_count)?;
        let batch = self.generator.generate(
            &mut self.rng,
            token_count,
            self.config.min_label,
            self.config.max_label,
            &self.bands,
        )?;

        self.race_duration = duration;
        self.token_count = token_count;
        self.elapsed = 0.0;
        self.counters = FinishCounters::default();
        self.pending = batch.into();
        self.active.clear();
        self.phase = Phase::Running;

        log::info!(
            "race reset: {} tokens over {} ({} prime)",
            token_count,
            duration,
            self.prime_count()
        );
        Ok(())
    }

    /// Running -> Paused. Returns whether the phase changed.
    pub fn pause(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.phase = Phase::Paused;
        log::info!("race paused at {}", self.elapsed);
        true
    }

    /// Paused -> Running. Returns whether the phase changed.
    pub fn resume(&mut self) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.phase = Phase::Running;
        log::info!("race resumed at {}", self.elapsed);
        true
    }

    /// Advance simulation time by `delta`.
    ///
    /// Does nothing unless running. Returns the events produced by this tick
    /// in order: admissions, per-token motion/finish, counters, and a phase
    /// change on completion.
    pub fn tick(&mut self, delta: f64) -> Vec<RaceEvent> {
        let mut events = Vec::new();
        if self.phase != Phase::Running || !delta.is_finite() || delta <= 0.0 {
            return events;
        }

        self.elapsed += delta;
        let stagger = self.stagger_interval();

        // The first tick always admits one token.
        let due = ((self.elapsed / stagger).floor() as usize)
            .saturating_add(1)
            .min(self.token_count);
        while self.active.len() < due {
            let Some(mut token) = self.pending.pop_front() else {
                break;
            };
            Motion::start(&mut token);
            log::debug!("admitted token {} (label {})", token.id, token.label);
            events.push(RaceEvent::Created(TokenCreated::from(&token)));
            self.active.push(token);
        }

        let lane_length = self.config.lane_length;
        let velocity = lane_length / stagger;
        for token in self.active.iter_mut().filter(|t| t.is_running()) {
            if Motion::advance(token, velocity, delta, lane_length) {
                self.counters.total_finished += 1;
                if token.is_prime {
                    self.counters.prime_finished += 1;
                }
                log::debug!("token {} finished at {}", token.id, self.elapsed);
                events.push(RaceEvent::Hidden { id: token.id });
                events.push(RaceEvent::Cue {
                    is_prime: token.is_prime,
                });
            } else {
                events.push(RaceEvent::Moved {
                    id: token.id,
                    position: token.position,
                });
            }
        }
        events.push(RaceEvent::Counters(self.counters));

        // Grace window of one stagger lets the last admitted token finish.
        if self.elapsed > self.race_duration + stagger {
            self.phase = Phase::Complete;
            log::info!(
                "race complete: {} finished, {} prime",
                self.counters.total_finished,
                self.counters.prime_finished
            );
            events.push(RaceEvent::PhaseChanged(Phase::Complete));
        }

        events
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn race_duration(&self) -> f64 {
        self.race_duration
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Time between successive admissions
    pub fn stagger_interval(&self) -> f64 {
        self.race_duration / self.token_count as f64
    }

    pub fn counters(&self) -> FinishCounters {
        self.counters
    }

    /// All tokens of the current batch, admitted ones first
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.active.iter().chain(self.pending.iter())
    }

    pub fn token(&self, id: u32) -> Option<&Token> {
        self.tokens().find(|t| t.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of prime labels in the current batch
    pub fn prime_count(&self) -> usize {
        self.tokens().filter(|t| t.is_prime).count()
    }

    /// Get compact snapshot, tokens ordered by id
    pub fn snapshot(&self) -> RaceSnapshot {
        let mut tokens: Vec<TokenSnapshot> = self.tokens().map(TokenSnapshot::from).collect();
        tokens.sort_by_key(|t| t.id);

        RaceSnapshot {
            phase: self.phase,
            elapsed: self.elapsed,
            race_duration: self.race_duration,
            token_count: self.token_count,
            total_finished: self.counters.total_finished,
            prime_finished: self.counters.prime_finished,
            tokens,
        }
    }
}

/// Compact race snapshot for observers and JSON output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub phase: Phase,
    pub elapsed: f64,
    pub race_duration: f64,
    pub token_count: usize,
    pub total_finished: u32,
    pub prime_finished: u32,
    pub tokens: Vec<TokenSnapshot>,
}
