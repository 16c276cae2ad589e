use wasm_bindgen::prelude::*;

pub mod ai;
pub mod api;
pub mod board;
pub mod error;
pub mod game;
pub mod types;

pub use ai::difficulty::{Difficulty, DifficultyConfig, Evaluation};
pub use ai::eval::evaluate;
pub use ai::search::SearchResult;
pub use ai::{ComputerPlayer, MoveSelector, compute_move, compute_return_selection};
pub use board::{Board, Move};
pub use error::GameError;
pub use game::{GameEngine, GameMode, GameStatus, Outcome};
pub use types::{Piece, Player, Position};

#[wasm_bindgen(js_name = wasmReady)]
pub fn wasm_ready() -> bool {
    true
}
