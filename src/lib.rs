//! Prime Race - staggered token race engine
//!
//! Tokens with unique random labels cross a fixed lane one stagger interval
//! apart; finishes are counted in total and for prime labels separately.

pub mod race_engine;

pub use race_engine::{
    is_prime, AudioSink, ColorClass, ControlAction, ControlLabel, FinishCounters, Immediate,
    LogAudio, LogRenderer, NullSink, Pacer, Phase, RaceConfig, RaceEngine, RaceError, RaceEvent,
    RaceSession, RaceSnapshot, RealtimePacer, RenderSink, SessionStats, Token, TokenSnapshot,
};

/// Install the `log` backend.
///
/// `RUST_LOG` takes precedence over `level` when set. Safe to call more than
/// once; later calls are ignored.
pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
