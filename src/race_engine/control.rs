//! Control - The single three-state race button
//!
//! The label is derived from the engine phase, never stored.

use serde::{Deserialize, Serialize};

use crate::race_engine::race::Phase;

/// What one press of the button does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlAction {
    Reset,
    Pause,
    Resume,
}

/// Button face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlLabel {
    Play,
    Pause,
    Resume,
}

impl ControlLabel {
    pub fn text(self) -> &'static str {
        match self {
            ControlLabel::Play => "PLAY",
            ControlLabel::Pause => "PAUSE",
            ControlLabel::Resume => "RESUME",
        }
    }
}

pub struct ControlToggle;

impl ControlToggle {
    pub fn label(phase: Phase) -> ControlLabel {
        match phase {
            Phase::Idle | Phase::Complete => ControlLabel::Play,
            Phase::Running => ControlLabel::Pause,
            Phase::Paused => ControlLabel::Resume,
        }
    }

    pub fn action(phase: Phase) -> ControlAction {
        match Self::label(phase) {
            ControlLabel::Play => ControlAction::Reset,
            ControlLabel::Pause => ControlAction::Pause,
            ControlLabel::Resume => ControlAction::Resume,
        }
    }
}
