//! Race Engine Module
//!
//! Tick-driven simulation of a staggered token race with prime tracking.
//! Rendering, audio and the control button are collaborators reached through
//! traits; the engine itself holds no external resources.

pub mod control;
pub mod error;
pub mod events;
pub mod generator;
pub mod race;
pub mod simulation;
pub mod token;

pub use control::{ControlAction, ControlLabel, ControlToggle};
pub use error::RaceError;
pub use events::{
    AudioSink, FinishCounters, LogAudio, LogRenderer, NullSink, RaceEvent, RenderSink, TokenCreated,
};
pub use generator::{is_prime, ColorBands, TokenGenerator};
pub use race::{Phase, RaceConfig, RaceEngine, RaceSnapshot};
pub use simulation::{Immediate, Pacer, RaceSession, RealtimePacer, SessionStats};
pub use token::{ColorClass, Token, TokenSnapshot};
