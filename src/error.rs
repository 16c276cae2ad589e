use thiserror::Error;

/// Rejection returned by every state-changing operation.
///
/// A rejected call leaves the board, turn and history untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("no game is in progress")]
    NotPlaying,
    #[error("game is already over")]
    GameOver,
    #[error("a returned piece must be selected first")]
    ReturnPending,
    #[error("there is no pending return selection")]
    NoPendingReturn,
    #[error("row/col out of range")]
    OutOfRange,
    #[error("illegal move")]
    IllegalMove,
    #[error("cell is not one of the captured pieces")]
    NotAReturnCandidate,
    #[error("cannot pass while legal moves exist")]
    MovesAvailable,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("it is not the player's turn")]
    NotHumanTurn,
    #[error("it is not the computer's turn")]
    NotComputerTurn,
    #[error("board data must be 64 cells of 0, 1 or 2")]
    InvalidBoard,
    #[error("unknown difficulty")]
    UnknownDifficulty,
    #[error("unknown game mode")]
    UnknownMode,
    #[error("unknown color")]
    UnknownColor,
}

impl GameError {
    /// Stable identifier handed to the JS side.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotPlaying => "not_playing",
            Self::GameOver => "game_over",
            Self::ReturnPending => "return_pending",
            Self::NoPendingReturn => "no_pending_return",
            Self::OutOfRange => "out_of_range",
            Self::IllegalMove => "illegal_move",
            Self::NotAReturnCandidate => "not_a_return_candidate",
            Self::MovesAvailable => "moves_available",
            Self::NothingToUndo => "nothing_to_undo",
            Self::NotHumanTurn => "not_human_turn",
            Self::NotComputerTurn => "not_computer_turn",
            Self::InvalidBoard => "invalid_board",
            Self::UnknownDifficulty => "unknown_difficulty",
            Self::UnknownMode => "unknown_mode",
            Self::UnknownColor => "unknown_color",
        }
    }
}
