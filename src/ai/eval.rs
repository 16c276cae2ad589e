use rand::Rng;

use crate::ai::difficulty::Evaluation;
use crate::board::{Board, in_bounds};
use crate::types::{BOARD_SIZE, NUM_SQUARES, Player};

const CORNER_VALUE: f32 = 30.0;
const EDGE_VALUE: f32 = 5.0;
const MOBILITY_SCALE: f32 = 10.0;
const STABLE_VALUE: f32 = 10.0;

const CORNERS: u64 = 1 | (1 << 7) | (1 << 56) | (1 << 63);
const EDGES: u64 = edge_mask();

/// The four lines through a cell; each is checked in both directions.
const AXES: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

const fn edge_mask() -> u64 {
    let mut mask = 0u64;
    let mut i = 1;
    while i < 7 {
        mask |= 1 << i;
        mask |= 1 << (56 + i);
        mask |= 1 << (i * 8);
        mask |= 1 << (i * 8 + 7);
        i += 1;
    }
    mask
}

/// Game phase derived from how full the board is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Midgame,
    Endgame,
}

impl Phase {
    pub fn of(board: &Board) -> Self {
        let (black, white) = board.count();
        let fill_rate = (black as f32 + white as f32) / NUM_SQUARES as f32;
        if fill_rate < 0.3 {
            Self::Opening
        } else if fill_rate < 0.7 {
            Self::Midgame
        } else {
            Self::Endgame
        }
    }

    pub fn weights(self) -> Weights {
        match self {
            Self::Opening => Weights {
                material: 0.5,
                corner: 3.0,
                edge: 1.0,
                mobility: 2.0,
                stability: 1.0,
            },
            Self::Midgame => Weights {
                material: 1.0,
                corner: 2.5,
                edge: 1.0,
                mobility: 1.5,
                stability: 1.5,
            },
            Self::Endgame => Weights {
                material: 2.0,
                corner: 2.0,
                edge: 1.0,
                mobility: 0.5,
                stability: 2.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub material: f32,
    pub corner: f32,
    pub edge: f32,
    pub mobility: f32,
    pub stability: f32,
}

/// Unweighted heuristic terms, each from `player`'s point of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terms {
    pub material: f32,
    pub corner: f32,
    pub edge: f32,
    pub mobility: f32,
    pub stability: f32,
}

impl Terms {
    pub fn of(board: &Board, player: Player) -> Self {
        let (me, opp) = board.sides(player);
        let stable = stable_cells(board);

        let player_moves = board.legal_move_count(player) as f32;
        let opponent_moves = board.legal_move_count(player.opponent()) as f32;
        let mobility = if player_moves + opponent_moves > 0.0 {
            MOBILITY_SCALE * (player_moves - opponent_moves) / (player_moves + opponent_moves)
        } else {
            0.0
        };

        Self {
            material: diff(me, opp, u64::MAX),
            corner: CORNER_VALUE * diff(me, opp, CORNERS),
            edge: EDGE_VALUE * diff(me, opp, EDGES),
            mobility,
            stability: STABLE_VALUE * diff(me, opp, stable),
        }
    }

    pub fn weighted(&self, weights: Weights) -> f32 {
        weights.material * self.material
            + weights.corner * self.corner
            + weights.edge * self.edge
            + weights.mobility * self.mobility
            + weights.stability * self.stability
    }
}

/// Scores `board` for `player`; higher is better for `player`.
///
/// Antisymmetric: `evaluate(b, p) == -evaluate(b, p.opponent())`.
pub fn evaluate(board: &Board, player: Player) -> f32 {
    Terms::of(board, player).weighted(Phase::of(board).weights())
}

/// Scores `board` with the given evaluation style.
pub fn evaluate_with<R: Rng>(
    board: &Board,
    player: Player,
    evaluation: Evaluation,
    rng: &mut R,
) -> f32 {
    match evaluation {
        Evaluation::Weighted => evaluate(board, player),
        Evaluation::MaterialWithJitter { amplitude } => {
            let (me, opp) = board.sides(player);
            diff(me, opp, u64::MAX) + rng.gen_range(0.0..=amplitude.max(0.0))
        }
    }
}

/// Returns the mask of pieces judged unflippable.
///
/// Fixed-point closure seeded by the occupied corners. An occupied cell joins
/// when, on every axis through it, one direction crosses only occupied cells
/// until it reaches the edge or a stable piece of the cell's own color.
pub fn stable_cells(board: &Board) -> u64 {
    let occupied = board.occupied();
    let mut stable = CORNERS & occupied;

    loop {
        let mut grew = false;
        for idx in 0..NUM_SQUARES {
            let square = 1u64 << idx;
            if (occupied & square) == 0 || (stable & square) != 0 {
                continue;
            }
            if is_stable(board, idx, stable) {
                stable |= square;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    stable
}

fn is_stable(board: &Board, idx: usize, stable: u64) -> bool {
    let square = 1u64 << idx;
    let (black, white) = board.sides(Player::Black);
    let own = if (black & square) != 0 { black } else { white };
    let anchors = own & stable;
    let occupied = black | white;
    let row = (idx / BOARD_SIZE as usize) as i32;
    let col = (idx % BOARD_SIZE as usize) as i32;

    AXES.iter().all(|&(dr, dc)| {
        anchored(row, col, dr, dc, occupied, anchors)
            || anchored(row, col, -dr, -dc, occupied, anchors)
    })
}

/// Walks from `(row, col)` over occupied cells; `true` on reaching the edge
/// or an anchor, `false` on the first empty cell.
fn anchored(row: i32, col: i32, dr: i32, dc: i32, occupied: u64, anchors: u64) -> bool {
    let mut r = row + dr;
    let mut c = col + dc;
    while in_bounds(r, c) {
        let square = 1u64 << (r as usize * BOARD_SIZE as usize + c as usize);
        if (occupied & square) == 0 {
            return false;
        }
        if (anchors & square) != 0 {
            return true;
        }
        r += dr;
        c += dc;
    }
    true
}

fn diff(me: u64, opp: u64, region: u64) -> f32 {
    (me & region).count_ones() as f32 - (opp & region).count_ones() as f32
}
