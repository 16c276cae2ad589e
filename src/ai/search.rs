use std::cmp::Reverse;

use log::{debug, info};
use rand::Rng;
use web_time::{Duration, Instant};

use crate::ai::difficulty::{DifficultyConfig, Evaluation};
use crate::ai::eval::evaluate_with;
use crate::board::{Board, Move};
use crate::types::{Player, Position};

const MIN_SCORE: f32 = f32::NEG_INFINITY;
const MAX_SCORE: f32 = f32::INFINITY;

/// Outcome of one computer decision. Diagnostics besides `chosen_move` do
/// not affect play.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chosen_move: Move,
    /// Deepest fully completed iteration; 0 when no search ran.
    pub depth_reached: u8,
    pub positions_evaluated: u64,
    pub elapsed: Duration,
    pub best_score: f32,
    /// `true` when the move came from the random override instead of search.
    pub randomized: bool,
}

pub struct Searcher<'a, R: Rng> {
    config: DifficultyConfig,
    rng: &'a mut R,
    start_time: Instant,
    positions_evaluated: u64,
}

impl<'a, R: Rng> Searcher<'a, R> {
    pub fn new(config: DifficultyConfig, rng: &'a mut R) -> Self {
        Self {
            config,
            rng,
            start_time: Instant::now(),
            positions_evaluated: 0,
        }
    }

    /// Searches the best move for `player` on a private copy of `board`.
    ///
    /// Returns `None` only when `player` has no legal move.
    pub fn search(&mut self, board: &Board, player: Player) -> Option<SearchResult> {
        self.start_time = Instant::now();
        self.positions_evaluated = 0;

        let moves = order_moves(board.legal_moves(player));
        let first = moves.first()?.clone();

        if moves.len() == 1 {
            return Some(SearchResult {
                chosen_move: first,
                depth_reached: 0,
                positions_evaluated: 0,
                elapsed: self.start_time.elapsed(),
                best_score: 0.0,
                randomized: false,
            });
        }

        let mut best_idx = 0;
        let mut best_score = MIN_SCORE;
        let mut depth_reached = 0;

        for depth in 1..=self.config.max_depth.max(1) {
            let (idx, score) = self.search_root(board, player, &moves, depth);
            best_idx = idx;
            best_score = score;
            depth_reached = depth;

            debug!(
                "depth {depth} done: best {} score {score:.2}, {} positions",
                moves[idx].position(),
                self.positions_evaluated
            );

            if self.start_time.elapsed() > self.config.time_budget {
                debug!("time budget spent after depth {depth}");
                break;
            }
        }

        let elapsed = self.start_time.elapsed();
        info!(
            "search for {player}: {} at depth {depth_reached}, {} positions in {:.1} ms",
            moves[best_idx].position(),
            self.positions_evaluated,
            elapsed.as_secs_f64() * 1000.0
        );

        Some(SearchResult {
            chosen_move: moves[best_idx].clone(),
            depth_reached,
            positions_evaluated: self.positions_evaluated,
            elapsed,
            best_score,
            randomized: false,
        })
    }

    /// One full iteration at `depth`. Ties keep the earlier move.
    fn search_root(&mut self, board: &Board, player: Player, moves: &[Move], depth: u8) -> (usize, f32) {
        let mut best_idx = 0;
        let mut best_score = MIN_SCORE;
        let mut alpha = MIN_SCORE;

        for (idx, mv) in moves.iter().enumerate() {
            let next = self.child(board, mv, player);
            let score = -self.negamax(&next, player.opponent(), depth - 1, -MAX_SCORE, -alpha);

            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
            if score > alpha {
                alpha = score;
            }
        }

        (best_idx, best_score)
    }

    fn negamax(&mut self, board: &Board, player: Player, depth: u8, alpha: f32, beta: f32) -> f32 {
        if depth == 0 || board.is_full() {
            return self.score(board, player);
        }

        let moves = board.legal_moves(player);
        if moves.is_empty() {
            if !board.has_legal_move(player.opponent()) {
                return self.score(board, player);
            }
            // Forced pass: same depth, other side to move.
            return -self.negamax(board, player.opponent(), depth, -beta, -alpha);
        }

        let mut best_score = MIN_SCORE;
        let mut alpha = alpha;

        for mv in order_moves(moves) {
            let next = self.child(board, &mv, player);
            let score = -self.negamax(&next, player.opponent(), depth - 1, -beta, -alpha);

            if score > best_score {
                best_score = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                break;
            }
        }

        best_score
    }

    /// Board after `player` plays `mv`, with the return cell baked in when
    /// return optimization is enabled.
    fn child(&mut self, board: &Board, mv: &Move, player: Player) -> Board {
        let returned = if self.config.use_return_optimization && mv.requires_return() {
            self.positions_evaluated += mv.captured().len() as u64;
            best_return_cell(board, mv, player, self.config.evaluation, &mut *self.rng)
        } else {
            None
        };

        let mut next = *board;
        next.place(mv, player, returned);
        next
    }

    fn score(&mut self, board: &Board, player: Player) -> f32 {
        self.positions_evaluated += 1;
        evaluate_with(board, player, self.config.evaluation, &mut *self.rng)
    }
}

/// Static ordering: corners, then edges, then more captures first.
///
/// The sort is stable, so equal keys keep row-major order.
pub fn order_moves(mut moves: Vec<Move>) -> Vec<Move> {
    moves.sort_by_key(|mv| {
        let pos = mv.position();
        let class = if pos.is_corner() {
            0u8
        } else if pos.is_edge() {
            1
        } else {
            2
        };
        (class, Reverse(mv.captured().len()))
    });
    moves
}

/// Picks the captured cell whose return leaves `board` best for `player`
/// after one ply. The first candidate wins ties.
///
/// `board` is the position before `mv` is played.
pub fn best_return_cell<R: Rng>(
    board: &Board,
    mv: &Move,
    player: Player,
    evaluation: Evaluation,
    rng: &mut R,
) -> Option<Position> {
    let mut best = None;
    let mut best_score = MIN_SCORE;

    for &cell in mv.captured() {
        let mut next = *board;
        next.place(mv, player, Some(cell));
        let score = evaluate_with(&next, player, evaluation, rng);
        if best.is_none() || score > best_score {
            best = Some(cell);
            best_score = score;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::ai::difficulty::Difficulty;
    use crate::ai::eval::evaluate;
    use crate::types::Piece;

    fn pos(row: u8, col: u8) -> Position {
        Position { row, col }
    }

    fn mask(cells: &[(u8, u8)]) -> u64 {
        cells.iter().fold(0, |acc, &(r, c)| acc | (1u64 << pos(r, c).index()))
    }

    fn config(max_depth: u8) -> DifficultyConfig {
        DifficultyConfig {
            max_depth,
            time_budget: Duration::from_secs(600),
            ..DifficultyConfig::from(Difficulty::Hard)
        }
    }

    #[test]
    fn search_returns_none_without_legal_moves() {
        let mut rng = StdRng::seed_from_u64(1);
        let board = Board::from_bitboards(u64::MAX ^ 1, 0);

        assert!(Searcher::new(config(4), &mut rng).search(&board, Player::White).is_none());
    }

    #[test]
    fn search_returns_single_legal_move_immediately() {
        let mut rng = StdRng::seed_from_u64(1);
        let black = mask(&[(0, 1)]);
        let white = u64::MAX ^ 1 ^ black;
        let board = Board::from_bitboards(black, white);

        let result = Searcher::new(config(6), &mut rng)
            .search(&board, Player::White)
            .unwrap();

        assert_eq!(result.chosen_move.position(), pos(0, 0));
        assert_eq!(result.depth_reached, 0);
        assert_eq!(result.positions_evaluated, 0);
    }

    #[test]
    fn prefers_corner_capture_at_depth_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let black = mask(&[(2, 2), (2, 5)]);
        let white = mask(&[(1, 1), (2, 4)]);
        let board = Board::from_bitboards(black, white);
        assert_eq!(board.legal_move_count(Player::Black), 2);

        let result = Searcher::new(config(1), &mut rng)
            .search(&board, Player::Black)
            .unwrap();

        assert_eq!(result.chosen_move.position(), pos(0, 0));
        assert_eq!(result.depth_reached, 1);
        assert!(result.positions_evaluated >= 2);
    }

    #[test]
    fn search_is_deterministic_without_random_paths() {
        let normal = DifficultyConfig {
            time_budget: Duration::from_secs(600),
            ..DifficultyConfig::from(Difficulty::Normal).deterministic()
        };
        let mut board = Board::new();
        let opening = board.move_at(pos(2, 4), Player::Black).unwrap();
        board.apply(&opening, Player::Black, None).unwrap();

        let first = Searcher::new(normal, &mut StdRng::seed_from_u64(1))
            .search(&board, Player::White)
            .unwrap();
        let second = Searcher::new(normal, &mut StdRng::seed_from_u64(99))
            .search(&board, Player::White)
            .unwrap();

        assert_eq!(first.chosen_move, second.chosen_move);
        assert_eq!(first.depth_reached, 4);
        assert_eq!(first.best_score, second.best_score);
        assert_eq!(first.positions_evaluated, second.positions_evaluated);
    }

    #[test]
    fn depth_one_completes_even_with_zero_budget() {
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = DifficultyConfig {
            time_budget: Duration::ZERO,
            ..config(6)
        };
        let board = Board::new();

        let result = Searcher::new(cfg, &mut rng).search(&board, Player::Black).unwrap();

        assert_eq!(result.depth_reached, 1);
        assert!(board.move_at(result.chosen_move.position(), Player::Black).is_some());
    }

    #[test]
    fn search_never_touches_the_input_board() {
        let mut rng = StdRng::seed_from_u64(3);
        let board = Board::new();
        let snapshot = board;

        let _ = Searcher::new(config(3), &mut rng).search(&board, Player::Black);

        assert_eq!(board, snapshot);
    }

    fn played(board: &Board, moves: &[(u8, u8)]) -> Board {
        let mut next = *board;
        for &(row, col) in moves {
            let mv = next.move_at(pos(row, col), Player::Black).unwrap();
            next.apply(&mv, Player::Black, None).unwrap();
        }
        next
    }

    #[test]
    fn opponent_pass_keeps_the_remaining_depth() {
        // Three corner pockets: black can take each white piece, white never
        // has a reply, so every black move is followed by a forced pass.
        let black = mask(&[(0, 0), (0, 7), (7, 7)]);
        let white = mask(&[(0, 1), (0, 6), (7, 6)]);
        let board = Board::from_bitboards(black, white);
        let roots = [(0, 2), (0, 5), (7, 5)];
        assert_eq!(board.legal_move_count(Player::Black), 3);
        for &root in &roots {
            assert!(!played(&board, &[root]).has_legal_move(Player::White));
        }

        let result = Searcher::new(config(2), &mut StdRng::seed_from_u64(1))
            .search(&board, Player::Black)
            .unwrap();

        // Depth 1 scores the 3 children; depth 2 scores 2 black replies under
        // each pass, never cut since the window above a pass is open.
        assert_eq!(result.depth_reached, 2);
        assert_eq!(result.positions_evaluated, 3 + 3 * 2);

        let expected = [
            [(0, 2), (0, 5)],
            [(0, 2), (7, 5)],
            [(0, 5), (7, 5)],
        ]
        .iter()
        .map(|pair| -evaluate(&played(&board, pair), Player::White))
        .fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(result.best_score, expected);
    }

    #[test]
    fn no_moves_for_either_side_is_scored_as_terminal() {
        // Either black move captures the only white piece.
        let board = Board::from_bitboards(mask(&[(3, 4), (4, 4)]), mask(&[(3, 3)]));
        assert_eq!(board.legal_move_count(Player::Black), 2);

        let result = Searcher::new(config(3), &mut StdRng::seed_from_u64(1))
            .search(&board, Player::Black)
            .unwrap();

        // One evaluation per child at every depth.
        assert_eq!(result.depth_reached, 3);
        assert_eq!(result.positions_evaluated, 2 * 3);

        let expected = [(3, 2), (2, 2)]
            .iter()
            .map(|&mv| -evaluate(&played(&board, &[mv]), Player::White))
            .fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(result.best_score, expected);
    }

    #[test]
    fn ordering_puts_corners_then_edges_then_bigger_captures() {
        // (0,0) corner, (0,3) edge, (3,3) interior x2 captures, (5,5) interior x1.
        let black = mask(&[(2, 2), (0, 5), (3, 5), (5, 3), (7, 7)]);
        let white = mask(&[(1, 1), (0, 4), (3, 4), (4, 3), (6, 6)]);
        let board = Board::from_bitboards(black, white);

        let ordered: Vec<Position> = order_moves(board.legal_moves(Player::Black))
            .iter()
            .map(Move::position)
            .collect();

        assert_eq!(ordered[0], pos(0, 0));
        assert_eq!(ordered[1], pos(0, 3));
        assert_eq!(ordered[2], pos(3, 3));
        assert_eq!(ordered[3], pos(5, 5));
    }

    #[test]
    fn ordering_keeps_scan_order_for_ties() {
        let board = Board::new();
        let ordered: Vec<Position> = order_moves(board.legal_moves(Player::Black))
            .iter()
            .map(Move::position)
            .collect();

        assert_eq!(ordered, vec![pos(2, 4), pos(3, 5), pos(4, 2), pos(5, 3)]);
    }

    #[test]
    fn best_return_cell_keeps_the_edge_piece() {
        // Black plays (0,2): captures (0,3) along the top edge and (1,2) below.
        let black = mask(&[(0, 4), (2, 2)]);
        let white = mask(&[(0, 3), (1, 2)]);
        let board = Board::from_bitboards(black, white);
        let mv = board.move_at(pos(0, 2), Player::Black).unwrap();
        assert_eq!(mv.captured(), &[pos(0, 3), pos(1, 2)]);

        let mut rng = StdRng::seed_from_u64(5);
        let cell = best_return_cell(&board, &mv, Player::Black, Evaluation::Weighted, &mut rng);

        assert_eq!(cell, Some(pos(1, 2)));
    }

    #[test]
    fn best_return_cell_falls_back_to_first_candidate_on_ties() {
        let black = mask(&[(0, 4), (2, 2)]);
        let white = mask(&[(0, 3), (1, 2)]);
        let board = Board::from_bitboards(black, white);
        let mv = board.move_at(pos(0, 2), Player::Black).unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let flat = Evaluation::MaterialWithJitter { amplitude: 0.0 };
        let cell = best_return_cell(&board, &mv, Player::Black, flat, &mut rng);

        assert_eq!(cell, Some(pos(0, 3)));
    }

    #[test]
    fn child_bakes_in_return_only_with_optimization() {
        let black = mask(&[(0, 4), (2, 2)]);
        let white = mask(&[(0, 3), (1, 2)]);
        let board = Board::from_bitboards(black, white);
        let mv = board.move_at(pos(0, 2), Player::Black).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let hard = config(2);
        let next = Searcher::new(hard, &mut rng).child(&board, &mv, Player::Black);
        assert_eq!(next.piece_at(pos(1, 2)), Piece::White);
        assert_eq!(next.piece_at(pos(0, 3)), Piece::Black);

        let plain = DifficultyConfig {
            use_return_optimization: false,
            ..hard
        };
        let next = Searcher::new(plain, &mut rng).child(&board, &mv, Player::Black);
        assert_eq!(next.piece_at(pos(1, 2)), Piece::Black);
        assert_eq!(next.piece_at(pos(0, 3)), Piece::Black);
    }
}
