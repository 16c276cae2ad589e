use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::GameError;

pub const BOARD_SIZE: u8 = 8;
pub const NUM_SQUARES: usize = (BOARD_SIZE as usize) * (BOARD_SIZE as usize);

/// One of the two sides. Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Black,
    White,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    /// Cell code used on the JS side: 1=black, 2=white.
    pub fn code(self) -> u8 {
        match self {
            Self::Black => 1,
            Self::White => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, GameError> {
        match code {
            1 => Ok(Self::Black),
            2 => Ok(Self::White),
            _ => Err(GameError::UnknownColor),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => f.write_str("Black"),
            Self::White => f.write_str("White"),
        }
    }
}

impl FromStr for Player {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" | "x" | "1" => Ok(Self::Black),
            "white" | "o" | "2" => Ok(Self::White),
            _ => Err(GameError::UnknownColor),
        }
    }
}

/// Contents of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Piece {
    Empty,
    Black,
    White,
}

impl From<Player> for Piece {
    fn from(player: Player) -> Self {
        match player {
            Player::Black => Self::Black,
            Player::White => Self::White,
        }
    }
}

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Returns `None` when either coordinate is outside `0..8`.
    pub fn new(row: u8, col: u8) -> Option<Self> {
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Self { row, col })
    }

    pub fn from_index(idx: usize) -> Self {
        debug_assert!(idx < NUM_SQUARES);
        Self {
            row: (idx / BOARD_SIZE as usize) as u8,
            col: (idx % BOARD_SIZE as usize) as u8,
        }
    }

    pub fn index(self) -> usize {
        self.row as usize * BOARD_SIZE as usize + self.col as usize
    }

    pub(crate) fn bit(self) -> u64 {
        1u64 << self.index()
    }

    pub fn is_corner(self) -> bool {
        let last = BOARD_SIZE - 1;
        (self.row == 0 || self.row == last) && (self.col == 0 || self.col == last)
    }

    /// Border cell that is not a corner.
    pub fn is_edge(self) -> bool {
        let last = BOARD_SIZE - 1;
        !self.is_corner() && (self.row == 0 || self.row == last || self.col == 0 || self.col == last)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Public game state returned from WASM APIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameState {
    /// 64 cells, row-major: 0=empty, 1=black, 2=white.
    pub board: Vec<u8>,
    pub phase: &'static str,
    pub current_player: Player,
    pub black_count: u8,
    pub white_count: u8,
    pub black_time: f64,
    pub white_time: f64,
    pub legal_moves: Vec<Position>,
    /// Non-empty only while a returned piece must be chosen.
    pub return_candidates: Vec<Position>,
    pub last_move: Option<Position>,
    pub can_undo: bool,
    /// `true` when the current player has no move and must pass.
    pub must_pass: bool,
    pub is_computer_turn: bool,
    pub history_len: usize,
}

/// Result of `submitMove` as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub applied: bool,
    pub entered_return_mode: bool,
    pub game_ended: bool,
    pub rejection: Option<&'static str>,
}

/// Result of `submitReturnSelection`, `passTurn` and `undo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub applied: bool,
    pub game_ended: bool,
    pub rejection: Option<&'static str>,
}

/// Final result after game over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameResult {
    /// `None` on a draw.
    pub winner: Option<Player>,
    pub black_count: u8,
    pub white_count: u8,
    pub black_time: f64,
    pub white_time: f64,
    pub decided_by: &'static str,
    /// Black count minus white count.
    pub score_diff: i32,
}

/// Diagnostics of one computer decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub row: u8,
    pub col: u8,
    pub captured: Vec<Position>,
    pub depth_reached: u8,
    pub positions_evaluated: u64,
    pub elapsed_ms: f64,
    pub best_score: f32,
    pub randomized: bool,
}

/// What the computer did on its turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputerTurnReport {
    pub applied: bool,
    pub passed: bool,
    pub played: Option<Position>,
    pub returned: Option<Position>,
    pub search: Option<SearchReport>,
    pub game_ended: bool,
    pub rejection: Option<&'static str>,
}
