//! Board geometry: colors, the shared loop, home lanes and the position model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Cells on the shared loop (numbered 1..=52)
pub const MAIN_LOOP_CELLS: u8 = 52;

/// Cells in each color's private home lane; the last one is the finish
pub const HOME_LANE_CELLS: u8 = 6;

/// Tokens owned by each color
pub const TOKENS_PER_COLOR: usize = 4;

/// Shared-loop cells a token visits, start and home entrance included
pub const MAIN_PATH_LENGTH: u8 = 51;

/// Die face that releases a token from base and grants a bonus turn
pub const SIX: u8 = 6;

/// Cells where no capture may occur
pub const SAFE_SPOTS: [u8; 8] = [1, 9, 14, 22, 27, 35, 40, 48];

/// Wire code for a token in base
pub const BASE_CODE: i16 = -1;

/// Wire code for a finished token
pub const FINISHED_CODE: i16 = -2;

// ============================================================================
// COLORS
// ============================================================================

/// Player color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red = 0,
    Green = 1,
    Yellow = 2,
    Blue = 3,
}

/// Fixed relative turn order
pub const TURN_ORDER: [Color; 4] = [Color::Red, Color::Green, Color::Yellow, Color::Blue];

struct ColorConstants {
    start: u8,
    home_entrance: u8,
    lane_prefix: i16,
}

/// Canonical per-color layout, indexed by `Color as usize`
const COLOR_TABLE: [ColorConstants; 4] = [
    ColorConstants { start: 1, home_entrance: 51, lane_prefix: 100 },
    ColorConstants { start: 14, home_entrance: 12, lane_prefix: 200 },
    ColorConstants { start: 27, home_entrance: 25, lane_prefix: 300 },
    ColorConstants { start: 40, home_entrance: 38, lane_prefix: 400 },
];

impl Color {
    fn constants(self) -> &'static ColorConstants {
        &COLOR_TABLE[self as usize]
    }

    /// Shared-loop cell a token lands on when it leaves base
    pub fn start_position(self) -> u8 {
        self.constants().start
    }

    /// Last shared-loop cell before the turn into the home lane
    pub fn home_entrance(self) -> u8 {
        self.constants().home_entrance
    }

    /// Numeric namespace of this color's lane cells in the wire encoding
    pub fn home_path_prefix(self) -> i16 {
        self.constants().lane_prefix
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Blue => "blue",
        }
    }

    fn from_lane_prefix(prefix: i16) -> Option<Color> {
        TURN_ORDER.into_iter().find(|c| c.home_path_prefix() == prefix)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown color: {0}")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "yellow" => Ok(Color::Yellow),
            "blue" => Ok(Color::Blue),
            _ => Err(ParseColorError(s.to_string())),
        }
    }
}

// ============================================================================
// POSITIONS
// ============================================================================

/// Where a token is.
///
/// Serialized as the numeric wire code: `-1` for base, `1..=52` for the
/// shared loop, `prefix + index` for a lane cell and `-2` once finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum Position {
    Base,
    /// Absolute shared-loop cell, 1..=52
    Main(u8),
    /// Lane cell of the given color, 1..=5
    Lane(Color, u8),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid position code: {0}")]
pub struct PositionCodeError(pub i16);

impl Position {
    pub fn code(self) -> i16 {
        match self {
            Position::Base => BASE_CODE,
            Position::Main(cell) => cell as i16,
            Position::Lane(color, index) => color.home_path_prefix() + index as i16,
            Position::Finished => FINISHED_CODE,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, PositionCodeError> {
        match code {
            BASE_CODE => Ok(Position::Base),
            FINISHED_CODE => Ok(Position::Finished),
            1..=52 => Ok(Position::Main(code as u8)),
            _ if code > 100 => {
                let color = Color::from_lane_prefix(code / 100 * 100).ok_or(PositionCodeError(code))?;
                let index = (code % 100) as u8;
                if (1..HOME_LANE_CELLS).contains(&index) {
                    Ok(Position::Lane(color, index))
                } else {
                    Err(PositionCodeError(code))
                }
            }
            _ => Err(PositionCodeError(code)),
        }
    }

    pub fn is_base(self) -> bool {
        self == Position::Base
    }

    pub fn is_finished(self) -> bool {
        self == Position::Finished
    }

    pub fn is_in_lane(self) -> bool {
        matches!(self, Position::Lane(..))
    }

    /// Shared-loop cell, if on the loop
    pub fn main_cell(self) -> Option<u8> {
        match self {
            Position::Main(cell) => Some(cell),
            _ => None,
        }
    }
}

impl From<Position> for i16 {
    fn from(pos: Position) -> i16 {
        pos.code()
    }
}

impl TryFrom<i16> for Position {
    type Error = PositionCodeError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        Position::from_code(code)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Base => f.write_str("base"),
            Position::Main(cell) => write!(f, "cell {}", cell),
            Position::Lane(color, index) => write!(f, "{} lane {}", color, index),
            Position::Finished => f.write_str("finished"),
        }
    }
}

// ============================================================================
// LOOP ARITHMETIC
// ============================================================================

/// Check if a shared-loop cell is a safe spot
pub fn is_safe_spot(cell: u8) -> bool {
    SAFE_SPOTS.contains(&cell)
}

/// Forward distance from `from` to `to` around the loop, 0..=51
pub fn circular_distance(from: u8, to: u8) -> u8 {
    ((to as u16 + MAIN_LOOP_CELLS as u16 - from as u16) % MAIN_LOOP_CELLS as u16) as u8
}

/// Cells travelled along `color`'s route from its start to `cell`
pub fn steps_from_start(color: Color, cell: u8) -> u8 {
    circular_distance(color.start_position(), cell)
}

/// Wrap a forward move on the shared loop
fn wrap_cell(cell: u8, steps: u8) -> u8 {
    ((cell as u16 - 1 + steps as u16) % MAIN_LOOP_CELLS as u16 + 1) as u8
}

/// Ordered shared-loop cells a token of `color` visits before its lane
pub fn main_loop_path(color: Color) -> Vec<u8> {
    (0..MAIN_PATH_LENGTH)
        .map(|i| wrap_cell(color.start_position(), i))
        .collect()
}

/// Lane index (1..=6) reached after `steps_into_home` steps, or illegal
fn lane_destination(color: Color, steps_into_home: u8) -> Option<Position> {
    match steps_into_home {
        s if s > HOME_LANE_CELLS => None,
        HOME_LANE_CELLS => Some(Position::Finished),
        s => Some(Position::Lane(color, s)),
    }
}

/// Destination of a token of `color` at `current` moving `steps`.
///
/// Returns `None` when the move is illegal: leaving base without a six,
/// overshooting the end of the home lane, moving a finished token, or
/// starting from a cell outside the loop.
pub fn calculate_new_position(color: Color, current: Position, steps: u8) -> Option<Position> {
    match current {
        Position::Base => (steps == SIX).then(|| Position::Main(color.start_position())),
        Position::Finished => None,
        Position::Lane(lane_color, index) => {
            if lane_color != color {
                return None;
            }
            lane_destination(color, index.saturating_add(steps))
        }
        Position::Main(cell) if !(1..=MAIN_LOOP_CELLS).contains(&cell) => None,
        Position::Main(cell) => {
            let to_entrance = circular_distance(cell, color.home_entrance());
            if to_entrance < steps {
                lane_destination(color, steps - to_entrance)
            } else {
                Some(Position::Main(wrap_cell(cell, steps)))
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
