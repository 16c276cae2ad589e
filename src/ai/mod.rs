pub mod difficulty;
pub mod eval;
pub mod search;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use web_time::Instant;

use crate::board::{Board, Move};
use crate::types::{Player, Position};
use difficulty::{Difficulty, DifficultyConfig};
use search::{SearchResult, Searcher, best_return_cell};

/// Decides moves for the computer side of a game.
pub trait MoveSelector: Send {
    /// Chooses a move for `player`, or `None` when it has no legal move.
    fn select_move(&mut self, board: &Board, player: Player) -> Option<SearchResult>;

    /// Chooses which captured cell of `mv` to hand back. `board` is the
    /// position before `mv` was played.
    fn select_return(&mut self, board: &Board, mv: &Move, player: Player) -> Option<Position>;
}

/// Computer opponent: a difficulty configuration plus its random source.
///
/// The random source is a type parameter so tests can pin it with a seeded
/// generator.
#[derive(Debug, Clone)]
pub struct ComputerPlayer<R = StdRng> {
    config: DifficultyConfig,
    rng: R,
}

impl ComputerPlayer<StdRng> {
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_rng(difficulty.into(), StdRng::from_entropy())
    }

    pub fn seeded(config: DifficultyConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> ComputerPlayer<R> {
    pub fn with_rng(config: DifficultyConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &DifficultyConfig {
        &self.config
    }

    /// Runs to completion (or budget exhaustion) and returns the chosen move
    /// with diagnostics. `board` is only read; the search works on copies.
    pub fn compute_move(&mut self, board: &Board, player: Player) -> Option<SearchResult> {
        let moves = board.legal_moves(player);
        if moves.is_empty() {
            return None;
        }

        if self.rng.gen_bool(self.config.override_probability()) {
            let start = Instant::now();
            let chosen = moves.choose(&mut self.rng)?.clone();
            debug!("random move for {player}: {}", chosen.position());
            return Some(SearchResult {
                chosen_move: chosen,
                depth_reached: 0,
                positions_evaluated: 0,
                elapsed: start.elapsed(),
                best_score: 0.0,
                randomized: true,
            });
        }

        Searcher::new(self.config, &mut self.rng).search(board, player)
    }

    /// Picks the returned piece for a multi-capture `mv` by `player`.
    ///
    /// Random with the tier's override probability, otherwise the candidate
    /// whose return scores best one ply ahead.
    pub fn compute_return_selection(
        &mut self,
        board: &Board,
        mv: &Move,
        player: Player,
    ) -> Option<Position> {
        if mv.captured().is_empty() {
            return None;
        }

        if self.rng.gen_bool(self.config.override_probability()) {
            return mv.captured().choose(&mut self.rng).copied();
        }

        best_return_cell(board, mv, player, self.config.evaluation, &mut self.rng)
    }
}

impl<R: Rng + Send> MoveSelector for ComputerPlayer<R> {
    fn select_move(&mut self, board: &Board, player: Player) -> Option<SearchResult> {
        self.compute_move(board, player)
    }

    fn select_return(&mut self, board: &Board, mv: &Move, player: Player) -> Option<Position> {
        self.compute_return_selection(board, mv, player)
    }
}

/// One-shot form of [`ComputerPlayer::compute_move`] with a fresh random source.
pub fn compute_move(board: &Board, player: Player, difficulty: Difficulty) -> Option<SearchResult> {
    ComputerPlayer::new(difficulty).compute_move(board, player)
}

/// One-shot form of [`ComputerPlayer::compute_return_selection`].
pub fn compute_return_selection(
    board: &Board,
    mv: &Move,
    player: Player,
    difficulty: Difficulty,
) -> Option<Position> {
    ComputerPlayer::new(difficulty).compute_return_selection(board, mv, player)
}
