//! Events - What the engine reports to its collaborators
//!
//! The engine never talks to a renderer or speaker directly. Each tick yields
//! a list of [`RaceEvent`]s which the session fans out to a [`RenderSink`] and
//! an [`AudioSink`].

use serde::{Deserialize, Serialize};

use crate::race_engine::race::Phase;
use crate::race_engine::token::{ColorClass, Token};

/// Emitted when a token is admitted to the lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCreated {
    pub id: u32,
    pub label: i64,
    pub color: ColorClass,
    pub initial_position: f64,
    pub lane_offset: f64,
}

impl From<&Token> for TokenCreated {
    fn from(token: &Token) -> Self {
        Self {
            id: token.id,
            label: token.label,
            color: token.color,
            initial_position: token.position,
            lane_offset: token.lane_offset,
        }
    }
}

/// Aggregate finish counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishCounters {
    pub total_finished: u32,
    pub prime_finished: u32,
}

/// Something observers need to know about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    Created(TokenCreated),
    Moved { id: u32, position: f64 },
    Hidden { id: u32 },
    Cue { is_prime: bool },
    Counters(FinishCounters),
    PhaseChanged(Phase),
}

/// Draws tokens and counters
pub trait RenderSink {
    fn token_created(&mut self, event: &TokenCreated);
    fn position_updated(&mut self, id: u32, position: f64);
    fn token_hidden(&mut self, id: u32);
    fn counters_updated(&mut self, counters: FinishCounters);
    fn phase_changed(&mut self, _phase: Phase) {}
    /// Drop every token of the previous batch; ids restart after this
    fn cleared(&mut self) {}
}

/// Plays a cue when a token finishes
pub trait AudioSink {
    fn cue(&mut self, is_prime: bool);
}

/// Route one event to the matching collaborator
pub fn dispatch(event: &RaceEvent, render: &mut dyn RenderSink, audio: &mut dyn AudioSink) {
    match event {
        RaceEvent::Created(created) => render.token_created(created),
        RaceEvent::Moved { id, position } => render.position_updated(*id, *position),
        RaceEvent::Hidden { id } => render.token_hidden(*id),
        RaceEvent::Cue { is_prime } => audio.cue(*is_prime),
        RaceEvent::Counters(counters) => render.counters_updated(*counters),
        RaceEvent::PhaseChanged(phase) => render.phase_changed(*phase),
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn token_created(&mut self, _event: &TokenCreated) {}
    fn position_updated(&mut self, _id: u32, _position: f64) {}
    fn token_hidden(&mut self, _id: u32) {}
    fn counters_updated(&mut self, _counters: FinishCounters) {}
}

impl AudioSink for NullSink {
    fn cue(&mut self, _is_prime: bool) {}
}

/// Renders through the `log` facade
#[derive(Debug, Default, Clone)]
pub struct LogRenderer {
    last: FinishCounters,
}

impl RenderSink for LogRenderer {
    fn token_created(&mut self, event: &TokenCreated) {
        log::debug!(
            "token {} (label {}, {}) enters at offset {}",
            event.id,
            event.label,
            event.color.name(),
            event.lane_offset
        );
    }

    fn position_updated(&mut self, id: u32, position: f64) {
        log::trace!("token {} at {:.1}", id, position);
    }

    fn token_hidden(&mut self, id: u32) {
        log::debug!("token {} crossed the finish line", id);
    }

    fn counters_updated(&mut self, counters: FinishCounters) {
        // Only report changes, counters are pushed every tick.
        if counters != self.last {
            log::info!(
                "finished: {} (prime: {})",
                counters.total_finished,
                counters.prime_finished
            );
            self.last = counters;
        }
    }

    fn phase_changed(&mut self, phase: Phase) {
        log::info!("race phase: {:?}", phase);
    }

    fn cleared(&mut self) {
        log::debug!("lane cleared");
        self.last = FinishCounters::default();
    }
}

/// Announces cues through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn cue(&mut self, is_prime: bool) {
        if is_prime {
            log::debug!("cue: prime");
        } else {
            log::debug!("cue: normal");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl RenderSink for Recorder {
        fn token_created(&mut self, event: &TokenCreated) {
            self.calls.push(format!("created {}", event.id));
        }
        fn position_updated(&mut self, id: u32, position: f64) {
            self.calls.push(format!("moved {id} {position}"));
        }
        fn token_hidden(&mut self, id: u32) {
            self.calls.push(format!("hidden {id}"));
        }
        fn counters_updated(&mut self, counters: FinishCounters) {
            self.calls.push(format!(
                "counters {} {}",
                counters.total_finished, counters.prime_finished
            ));
        }
    }

    impl AudioSink for Recorder {
        fn cue(&mut self, is_prime: bool) {
            self.calls.push(format!("cue {is_prime}"));
        }
    }

    #[test]
    fn dispatch_routes_by_kind() {
        let mut render = Recorder::default();
        let mut audio = Recorder::default();
        let events = [
            RaceEvent::Moved { id: 2, position: 30.0 },
            RaceEvent::Hidden { id: 2 },
            RaceEvent::Cue { is_prime: true },
            RaceEvent::Counters(FinishCounters {
                total_finished: 1,
                prime_finished: 1,
            }),
            RaceEvent::PhaseChanged(Phase::Complete),
        ];
        for event in &events {
            dispatch(event, &mut render, &mut audio);
        }

        assert_eq!(
            render.calls,
            ["moved 2 30", "hidden 2", "counters 1 1"]
        );
        assert_eq!(audio.calls, ["cue true"]);
    }
}
