//! Token - Individual race participant state and motion
//!
//! Each token carries a unique label, derived attributes (color class and
//! primality) and its motion state along the lane.

use serde::{Deserialize, Serialize};

/// Color class assigned to a token from its label band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    Blue,
    Green,
    Gray,
    LightBlue,
    Orange,
    Pink,
}

impl ColorClass {
    /// Default palette, one band per entry in this order
    pub const DEFAULT_PALETTE: [ColorClass; 6] = [
        ColorClass::Blue,
        ColorClass::Green,
        ColorClass::Gray,
        ColorClass::LightBlue,
        ColorClass::Orange,
        ColorClass::Pink,
    ];

    /// CSS-style color name for renderers
    pub fn name(self) -> &'static str {
        match self {
            ColorClass::Blue => "blue",
            ColorClass::Green => "green",
            ColorClass::Gray => "gray",
            ColorClass::LightBlue => "lightblue",
            ColorClass::Orange => "orange",
            ColorClass::Pink => "pink",
        }
    }
}

/// Token state flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFlags {
    pub started: bool,
    pub finished: bool,
}

/// Complete state for a single token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Stable id within the batch (generation index)
    pub id: u32,
    /// Unique label drawn from the configured range
    pub label: i64,
    /// Whether the label is prime
    pub is_prime: bool,
    /// Color band of the label
    pub color: ColorClass,
    /// Distance traveled along the lane
    pub position: f64,
    /// Cosmetic offset across the lane
    pub lane_offset: f64,
    /// Status flags
    pub flags: TokenFlags,
}

impl Token {
    /// Create a token at the start line
    pub fn new(id: u32, label: i64, is_prime: bool, color: ColorClass, lane_offset: f64) -> Self {
        Self {
            id,
            label,
            is_prime,
            color,
            position: 0.0,
            lane_offset,
            flags: TokenFlags::default(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.flags.started
    }

    pub fn is_finished(&self) -> bool {
        self.flags.finished
    }

    /// Still on the lane and moving
    pub fn is_running(&self) -> bool {
        self.flags.started && !self.flags.finished
    }
}

/// Token motion logic
pub struct Motion;

impl Motion {
    /// Mark a token as admitted to the lane. Returns false if it already was.
    pub fn start(token: &mut Token) -> bool {
        if token.flags.started {
            return false;
        }
        token.flags.started = true;
        true
    }

    /// Advance a running token for one tick.
    ///
    /// Returns true on the tick the token crosses the finish line. The
    /// reported position never exceeds `lane_length`.
    pub fn advance(token: &mut Token, velocity: f64, delta: f64, lane_length: f64) -> bool {
        if !token.is_running() {
            return false;
        }

        let next = token.position + velocity * delta;
        if next >= lane_length {
            token.position = lane_length;
            token.flags.finished = true;
            true
        } else {
            token.position = next;
            false
        }
    }
}

/// Compact token state for observers and JSON output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub id: u32,
    pub label: i64,
    pub is_prime: bool,
    pub color: ColorClass,
    pub position: f64,
    pub lane_offset: f64,
    pub started: bool,
    pub finished: bool,
}

impl From<&Token> for TokenSnapshot {
    fn from(token: &Token) -> Self {
        Self {
            id: token.id,
            label: token.label,
            is_prime: token.is_prime,
            color: token.color,
            position: token.position,
            lane_offset: token.lane_offset,
            started: token.flags.started,
            finished: token.flags.finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> Token {
        Token::new(0, 7, true, ColorClass::Blue, 50.0)
    }

    #[test]
    fn pending_token_does_not_move() {
        let mut t = token();
        assert!(!Motion::advance(&mut t, 3.0, 10.0, 300.0));
        assert_eq!(t.position, 0.0);
    }

    #[test]
    fn start_is_one_shot() {
        let mut t = token();
        assert!(Motion::start(&mut t));
        assert!(!Motion::start(&mut t));
        assert!(t.is_started());
    }

    #[test]
    fn crossing_clamps_and_finishes_once() {
        let mut t = token();
        Motion::start(&mut t);
        t.position = 290.0;

        assert!(Motion::advance(&mut t, 3.0, 10.0, 300.0));
        assert_eq!(t.position, 300.0);
        assert!(t.is_finished());

        assert!(!Motion::advance(&mut t, 3.0, 10.0, 300.0));
        assert_eq!(t.position, 300.0);
        assert!(t.is_finished());
    }

    #[test]
    fn color_names_are_css() {
        let names: Vec<_> = ColorClass::DEFAULT_PALETTE.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["blue", "green", "gray", "lightblue", "orange", "pink"]);
        assert_eq!(
            serde_json::to_string(&ColorClass::LightBlue).unwrap(),
            "\"lightblue\""
        );
    }
}
