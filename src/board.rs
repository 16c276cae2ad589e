use serde::Serialize;

use crate::error::GameError;
use crate::types::{BOARD_SIZE, NUM_SQUARES, Piece, Player, Position};

/// Scan order for captures: E, SE, S, SW, W, NW, N, NE as `(d_row, d_col)`.
/// It fixes the order of `Move::captured`, which in turn fixes the order of
/// return candidates.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// A legal placement together with the cells it flips.
///
/// Only [`Board`] builds moves. `captured` is computed once against the board
/// the move was generated from, and [`Board::apply`] refuses it on a board
/// where those cells are not the opponent's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Move {
    row: u8,
    col: u8,
    captured: Vec<Position>,
    #[serde(skip)]
    captured_mask: u64,
}

impl Move {
    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    pub fn position(&self) -> Position {
        Position {
            row: self.row,
            col: self.col,
        }
    }

    /// Flipped cells in scan order, nearest first within a direction.
    pub fn captured(&self) -> &[Position] {
        &self.captured
    }

    pub fn captures(&self, pos: Position) -> bool {
        (self.captured_mask & pos.bit()) != 0
    }

    /// `true` when applying this move triggers the return rule.
    pub fn requires_return(&self) -> bool {
        self.captured.len() >= 2
    }
}

/// Reversi board state represented by two bitboards.
///
/// The board is `Copy`; every copy owns its own masks, so history snapshots
/// and search nodes never share storage with the live board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    /// Creates the initial board: (3,3) and (4,4) black, (3,4) and (4,3) white.
    pub fn new() -> Self {
        Self {
            black: bit(27) | bit(36),
            white: bit(28) | bit(35),
        }
    }

    /// Builds a board from raw masks. Overlapping bits are resolved in favour of black.
    pub fn from_bitboards(black: u64, white: u64) -> Self {
        Self {
            black,
            white: white & !black,
        }
    }

    /// Parses the row-major `[u8; 64]` form produced by [`Board::to_array`].
    pub fn from_cells(cells: &[u8]) -> Result<Self, GameError> {
        if cells.len() != NUM_SQUARES {
            return Err(GameError::InvalidBoard);
        }

        let mut board = Self {
            black: 0,
            white: 0,
        };
        for (pos, &cell) in cells.iter().enumerate() {
            match cell {
                0 => {}
                1 => board.black |= bit(pos),
                2 => board.white |= bit(pos),
                _ => return Err(GameError::InvalidBoard),
            }
        }
        Ok(board)
    }

    pub fn piece_at(&self, pos: Position) -> Piece {
        let square = pos.bit();
        if (self.black & square) != 0 {
            Piece::Black
        } else if (self.white & square) != 0 {
            Piece::White
        } else {
            Piece::Empty
        }
    }

    /// Returns every legal move for `player` in row-major order.
    pub fn legal_moves(&self, player: Player) -> Vec<Move> {
        let (me, opp) = self.sides(player);
        let occupied = me | opp;

        (0..NUM_SQUARES)
            .filter(|&pos| (occupied & bit(pos)) == 0)
            .filter_map(|pos| Self::collect_flips(pos, me, opp))
            .collect()
    }

    /// Returns the legal move mask for `player`.
    pub fn legal_mask(&self, player: Player) -> u64 {
        let (me, opp) = self.sides(player);
        let occupied = me | opp;
        let mut legal = 0u64;

        for pos in 0..NUM_SQUARES {
            let move_bit = bit(pos);
            if (occupied & move_bit) != 0 {
                continue;
            }
            if Self::flip_mask(pos, me, opp) != 0 {
                legal |= move_bit;
            }
        }

        legal
    }

    pub fn legal_move_count(&self, player: Player) -> u32 {
        self.legal_mask(player).count_ones()
    }

    pub fn has_legal_move(&self, player: Player) -> bool {
        self.legal_mask(player) != 0
    }

    /// Returns the move `player` would make at `pos`, if it is legal.
    pub fn move_at(&self, pos: Position, player: Player) -> Option<Move> {
        let (me, opp) = self.sides(player);
        if ((me | opp) & pos.bit()) != 0 {
            return None;
        }
        Self::collect_flips(pos.index(), me, opp)
    }

    /// Places `mv` for `player` and flips its captured cells.
    ///
    /// Rejects a move whose origin is taken or whose captured cells are not
    /// all the opponent's on this board. When `returned` is given, that
    /// captured cell ends up with the opponent's color instead. It must be one
    /// of `mv.captured()`.
    pub fn apply(
        &mut self,
        mv: &Move,
        player: Player,
        returned: Option<Position>,
    ) -> Result<(), GameError> {
        let (_, opp) = self.sides(player);
        let origin = mv.position();
        if self.piece_at(origin) != Piece::Empty
            || mv.captured_mask == 0
            || (mv.captured_mask & !opp) != 0
        {
            return Err(GameError::IllegalMove);
        }
        if let Some(cell) = returned
            && !mv.captures(cell)
        {
            return Err(GameError::NotAReturnCandidate);
        }

        self.place(mv, player, returned);
        Ok(())
    }

    /// Unchecked form of [`Board::apply`] for moves generated from this board.
    pub(crate) fn place(&mut self, mv: &Move, player: Player, returned: Option<Position>) {
        let (me, opp) = self.sides(player);
        let returned_bit = returned.map_or(0, Position::bit) & mv.captured_mask;
        let flips = mv.captured_mask & !returned_bit;

        let next_me = me | mv.position().bit() | flips;
        let next_opp = (opp & !flips) | returned_bit;

        match player {
            Player::Black => {
                self.black = next_me;
                self.white = next_opp;
            }
            Player::White => {
                self.white = next_me;
                self.black = next_opp;
            }
        }
    }

    /// Returns `(black_count, white_count)`.
    pub fn count(&self) -> (u8, u8) {
        (self.black.count_ones() as u8, self.white.count_ones() as u8)
    }

    pub fn is_full(&self) -> bool {
        (self.black | self.white) == u64::MAX
    }

    pub(crate) fn occupied(&self) -> u64 {
        self.black | self.white
    }

    /// Returns `(player's mask, opponent's mask)`.
    pub(crate) fn sides(&self, player: Player) -> (u64, u64) {
        match player {
            Player::Black => (self.black, self.white),
            Player::White => (self.white, self.black),
        }
    }

    /// Converts board to `[u8; 64]` where 0=empty, 1=black, 2=white.
    pub fn to_array(&self) -> [u8; NUM_SQUARES] {
        let mut board = [0u8; NUM_SQUARES];
        for (pos, cell) in board.iter_mut().enumerate() {
            let square = bit(pos);
            *cell = if (self.black & square) != 0 {
                1
            } else if (self.white & square) != 0 {
                2
            } else {
                0
            };
        }
        board
    }

    fn collect_flips(pos: usize, me: u64, opp: u64) -> Option<Move> {
        let (row, col) = pos_to_row_col(pos);
        let mut captured = Vec::new();
        let mut captured_mask = 0u64;

        for (dr, dc) in DIRECTIONS {
            let run = closed_run(row, col, dr, dc, me, opp);
            if run == 0 {
                continue;
            }
            captured_mask |= run;

            let mut r = row + dr;
            let mut c = col + dc;
            while in_bounds(r, c) && (run & bit(square_index(r, c))) != 0 {
                captured.push(Position::from_index(square_index(r, c)));
                r += dr;
                c += dc;
            }
        }

        if captured.is_empty() {
            return None;
        }

        let origin = Position::from_index(pos);
        Some(Move {
            row: origin.row,
            col: origin.col,
            captured,
            captured_mask,
        })
    }

    fn flip_mask(pos: usize, me: u64, opp: u64) -> u64 {
        let (row, col) = pos_to_row_col(pos);
        DIRECTIONS
            .iter()
            .fold(0, |flips, &(dr, dc)| flips | closed_run(row, col, dr, dc, me, opp))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}

/// Opponent run starting next to `(row, col)` in direction `(dr, dc)`, if the
/// mover's piece closes it; otherwise 0.
fn closed_run(row: i32, col: i32, dr: i32, dc: i32, me: u64, opp: u64) -> u64 {
    let mut r = row + dr;
    let mut c = col + dc;
    let mut line = 0u64;

    while in_bounds(r, c) {
        let square = bit(square_index(r, c));
        if (opp & square) != 0 {
            line |= square;
        } else if (me & square) != 0 {
            return line;
        } else {
            return 0;
        }
        r += dr;
        c += dc;
    }

    0
}

fn square_index(row: i32, col: i32) -> usize {
    row as usize * BOARD_SIZE as usize + col as usize
}

fn pos_to_row_col(pos: usize) -> (i32, i32) {
    (
        (pos / BOARD_SIZE as usize) as i32,
        (pos % BOARD_SIZE as usize) as i32,
    )
}

pub(crate) fn in_bounds(row: i32, col: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: u8, col: u8) -> Position {
        Position { row, col }
    }

    fn mask(cells: &[(u8, u8)]) -> u64 {
        cells.iter().fold(0, |acc, &(r, c)| acc | pos(r, c).bit())
    }

    #[test]
    fn initial_board_layout() {
        let board = Board::new();

        assert_eq!(board.piece_at(pos(3, 3)), Piece::Black);
        assert_eq!(board.piece_at(pos(4, 4)), Piece::Black);
        assert_eq!(board.piece_at(pos(3, 4)), Piece::White);
        assert_eq!(board.piece_at(pos(4, 3)), Piece::White);
        assert_eq!(board.count(), (2, 2));
    }

    #[test]
    fn t01_initial_black_legal_moves_are_four_expected_squares() {
        let board = Board::new();
        let cells: Vec<Position> = board
            .legal_moves(Player::Black)
            .iter()
            .map(Move::position)
            .collect();

        assert_eq!(cells, vec![pos(2, 4), pos(3, 5), pos(4, 2), pos(5, 3)]);
        assert_eq!(board.legal_move_count(Player::Black), 4);
        assert_eq!(
            board.legal_mask(Player::Black),
            mask(&[(2, 4), (3, 5), (4, 2), (5, 3)])
        );
    }

    #[test]
    fn legal_moves_only_target_empty_cells_with_captures() {
        let mut board = Board::new();
        let mut player = Player::Black;

        for _ in 0..20 {
            let moves = board.legal_moves(player);
            if moves.is_empty() {
                player = player.opponent();
                continue;
            }
            for mv in &moves {
                assert_eq!(board.piece_at(mv.position()), Piece::Empty);
                assert!(!mv.captured().is_empty());
                for cell in mv.captured() {
                    assert_eq!(board.piece_at(*cell), Piece::from(player.opponent()));
                }
            }
            let mv = moves.last().unwrap().clone();
            board.apply(&mv, player, None).unwrap();
            player = player.opponent();
        }
    }

    #[test]
    fn run_reaching_edge_without_anchor_captures_nothing() {
        let black = mask(&[(5, 5)]);
        let white = mask(&[(0, 0), (0, 1)]);
        let board = Board::from_bitboards(black, white);

        assert!(board.move_at(pos(0, 2), Player::Black).is_none());
        assert_eq!(board.legal_move_count(Player::Black), 0);
    }

    #[test]
    fn captured_cells_follow_direction_order() {
        // Black to play (3,3): east run (3,4) anchored by (3,5), south run (4,3)
        // anchored by (5,3), west run (3,2) anchored by (3,1).
        let black = mask(&[(3, 5), (5, 3), (3, 1)]);
        let white = mask(&[(3, 4), (4, 3), (3, 2)]);
        let board = Board::from_bitboards(black, white);

        let mv = board.move_at(pos(3, 3), Player::Black).unwrap();

        assert_eq!(mv.captured(), &[pos(3, 4), pos(4, 3), pos(3, 2)]);
        assert!(mv.requires_return());
    }

    #[test]
    fn place_flips_opponent_stones_and_updates_counts() {
        let mut board = Board::new();
        let mv = board.move_at(pos(2, 4), Player::Black).unwrap();

        assert_eq!(mv.captured(), &[pos(3, 4)]);
        board.apply(&mv, Player::Black, None).unwrap();

        assert_eq!(board.count(), (4, 1));

        let cells = board.to_array();
        assert_eq!(cells[pos(2, 4).index()], 1);
        assert_eq!(cells[pos(3, 4).index()], 1);
        assert_eq!(cells[pos(4, 3).index()], 2);
    }

    #[test]
    fn apply_adds_exactly_one_piece() {
        let black = mask(&[(3, 5), (5, 3), (3, 1)]);
        let white = mask(&[(3, 4), (4, 3), (3, 2)]);
        let mut board = Board::from_bitboards(black, white);
        let before = board.count();
        let mv = board.move_at(pos(3, 3), Player::Black).unwrap();

        board.apply(&mv, Player::Black, Some(pos(4, 3))).unwrap();
        let after = board.count();

        assert_eq!(
            (after.0 + after.1) as u32,
            (before.0 + before.1) as u32 + 1
        );
    }

    #[test]
    fn returned_cell_ends_up_with_the_opponent() {
        let black = mask(&[(3, 5), (5, 3), (3, 1)]);
        let white = mask(&[(3, 4), (4, 3), (3, 2)]);
        let mut board = Board::from_bitboards(black, white);
        let mv = board.move_at(pos(3, 3), Player::Black).unwrap();

        board.apply(&mv, Player::Black, Some(pos(4, 3))).unwrap();

        assert_eq!(board.piece_at(pos(3, 3)), Piece::Black);
        assert_eq!(board.piece_at(pos(3, 4)), Piece::Black);
        assert_eq!(board.piece_at(pos(3, 2)), Piece::Black);
        assert_eq!(board.piece_at(pos(4, 3)), Piece::White);
        assert_eq!(board.count(), (6, 1));
    }

    #[test]
    fn returned_cell_outside_captures_is_rejected() {
        let mut board = Board::new();
        let before = board;
        let mv = board.move_at(pos(2, 4), Player::Black).unwrap();

        let err = board.apply(&mv, Player::Black, Some(pos(4, 3))).unwrap_err();

        assert_eq!(err, GameError::NotAReturnCandidate);
        assert_eq!(board, before);
    }

    #[test]
    fn move_from_another_board_is_rejected() {
        // (2,4) on the opening board captures (3,4), which is empty here.
        let stale = Board::new().move_at(pos(2, 4), Player::Black).unwrap();
        let mut board = Board::from_bitboards(mask(&[(3, 3)]), mask(&[(4, 3)]));
        let before = board;

        assert_eq!(
            board.apply(&stale, Player::Black, None),
            Err(GameError::IllegalMove)
        );
        assert_eq!(board, before);
        assert_eq!(board.count(), (1, 1));
    }

    #[test]
    fn move_for_the_other_color_is_rejected() {
        let mut board = Board::new();
        let mv = board.move_at(pos(2, 4), Player::Black).unwrap();

        assert_eq!(
            board.apply(&mv, Player::White, None),
            Err(GameError::IllegalMove)
        );
        assert_eq!(board, Board::new());
    }

    #[test]
    fn applying_onto_occupied_cell_is_rejected() {
        let mut board = Board::new();
        let mv = board.move_at(pos(2, 4), Player::Black).unwrap();
        board.apply(&mv, Player::Black, None).unwrap();
        let after_first = board;

        assert_eq!(
            board.apply(&mv, Player::Black, None),
            Err(GameError::IllegalMove)
        );
        assert_eq!(board, after_first);
    }

    #[test]
    fn mutating_a_copy_leaves_the_source_untouched() {
        let source = Board::new();
        let mut copy = source;
        let mv = copy.move_at(pos(5, 3), Player::Black).unwrap();

        copy.apply(&mv, Player::Black, None).unwrap();

        assert_ne!(copy, source);
        assert_eq!(source, Board::new());
        assert_eq!(source.count(), (2, 2));
    }

    #[test]
    fn is_full_only_when_every_cell_is_taken() {
        assert!(!Board::new().is_full());
        assert!(Board::from_bitboards(u64::MAX, 0).is_full());
        assert!(Board::from_bitboards(0xFFFF_FFFF, 0xFFFF_FFFF_0000_0000).is_full());
        assert!(!Board::from_bitboards(u64::MAX ^ 1, 0).is_full());
    }

    #[test]
    fn from_cells_round_trips_and_validates() {
        let board = Board::new();
        assert_eq!(Board::from_cells(&board.to_array()), Ok(board));
        assert_eq!(Board::from_cells(&[0; 10]), Err(GameError::InvalidBoard));

        let mut cells = [0u8; NUM_SQUARES];
        cells[5] = 3;
        assert_eq!(Board::from_cells(&cells), Err(GameError::InvalidBoard));
    }
}
