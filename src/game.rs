use log::{debug, info};
use web_time::Instant;

use crate::ai::difficulty::Difficulty;
use crate::ai::search::SearchResult;
use crate::ai::{ComputerPlayer, MoveSelector};
use crate::board::{Board, Move};
use crate::error::GameError;
use crate::types::{GameResult, GameState, Piece, Player, Position};

/// Who is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    PlayerVsPlayer,
    PlayerVsComputer { human: Player, difficulty: Difficulty },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Menu,
    Playing,
    /// A multi-capture move is on the board; one captured cell must be handed back.
    AwaitingReturnSelection,
    Ended,
}

impl GameStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Playing => "playing",
            Self::AwaitingReturnSelection => "awaiting_return_selection",
            Self::Ended => "ended",
        }
    }
}

/// Accumulated thinking time per side, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Times {
    pub black: f64,
    pub white: f64,
}

impl Times {
    pub fn of(&self, player: Player) -> f64 {
        match player {
            Player::Black => self.black,
            Player::White => self.white,
        }
    }

    fn add(&mut self, player: Player, seconds: f64) {
        match player {
            Player::Black => self.black += seconds,
            Player::White => self.white += seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyAction {
    Move {
        position: Position,
        returned: Option<Position>,
    },
    Pass,
}

/// One committed ply. `board` and `times` are the state before the ply.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub board: Board,
    pub player: Player,
    pub times: Times,
    pub action: PlyAction,
}

#[derive(Debug, Clone)]
struct PendingReturn {
    mv: Move,
    board_before: Board,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub entered_return_mode: bool,
    pub game_ended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOutcome {
    pub game_ended: bool,
}

/// What the computer did in [`GameEngine::play_computer_turn`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComputerTurn {
    pub action: PlyAction,
    pub search: Option<SearchResult>,
    pub game_ended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecidedBy {
    Pieces,
    Time,
    Draw,
}

impl DecidedBy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pieces => "pieces",
            Self::Time => "time",
            Self::Draw => "draw",
        }
    }
}

/// Final result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub winner: Option<Player>,
    pub black_count: u8,
    pub white_count: u8,
    pub times: Times,
    pub decided_by: DecidedBy,
}

impl Outcome {
    /// More pieces wins; equal counts go to the side that used strictly less
    /// time; equal counts and equal time is a draw.
    pub fn decide(black_count: u8, white_count: u8, times: Times) -> Self {
        let (winner, decided_by) = if black_count > white_count {
            (Some(Player::Black), DecidedBy::Pieces)
        } else if white_count > black_count {
            (Some(Player::White), DecidedBy::Pieces)
        } else if times.black < times.white {
            (Some(Player::Black), DecidedBy::Time)
        } else if times.white < times.black {
            (Some(Player::White), DecidedBy::Time)
        } else {
            (None, DecidedBy::Draw)
        };

        Self {
            winner,
            black_count,
            white_count,
            times,
            decided_by,
        }
    }

    /// Black count minus white count.
    pub fn score_diff(&self) -> i32 {
        self.black_count as i32 - self.white_count as i32
    }
}

/// Owns the canonical board and drives turns, the return rule, passes,
/// undo and game end.
pub struct GameEngine {
    board: Board,
    current_player: Player,
    status: GameStatus,
    mode: Option<GameMode>,
    history: Vec<HistoryEntry>,
    pending: Option<PendingReturn>,
    times: Times,
    turn_started: Instant,
    last_move: Option<Position>,
    outcome: Option<Outcome>,
    selector: Option<Box<dyn MoveSelector>>,
}

impl GameEngine {
    /// Creates an engine sitting in the menu.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Player::Black,
            status: GameStatus::Menu,
            mode: None,
            history: Vec::new(),
            pending: None,
            times: Times::default(),
            turn_started: Instant::now(),
            last_move: None,
            outcome: None,
            selector: None,
        }
    }

    /// Starts a fresh game. A computer game gets a computer player for its
    /// difficulty.
    pub fn start(&mut self, mode: GameMode) {
        let selector: Option<Box<dyn MoveSelector>> = match mode {
            GameMode::PlayerVsPlayer => None,
            GameMode::PlayerVsComputer { difficulty, .. } => {
                Some(Box::new(ComputerPlayer::new(difficulty)))
            }
        };
        self.start_with(mode, selector);
    }

    /// Starts a fresh game with a caller-supplied computer player.
    pub fn start_with_selector(&mut self, mode: GameMode, selector: Box<dyn MoveSelector>) {
        self.start_with(mode, Some(selector));
    }

    fn start_with(&mut self, mode: GameMode, selector: Option<Box<dyn MoveSelector>>) {
        self.mode = Some(mode);
        self.selector = selector;
        self.reset();
        info!("new game: {mode:?}");
    }

    /// Starts over with the same mode and colors.
    pub fn restart(&mut self) -> Result<(), GameError> {
        if self.mode.is_none() {
            return Err(GameError::NotPlaying);
        }
        self.reset();
        Ok(())
    }

    /// Starts over; against the computer the human switches colors.
    pub fn rematch(&mut self) -> Result<(), GameError> {
        let mode = self.mode.ok_or(GameError::NotPlaying)?;
        if let GameMode::PlayerVsComputer { human, difficulty } = mode {
            self.mode = Some(GameMode::PlayerVsComputer {
                human: human.opponent(),
                difficulty,
            });
        }
        self.reset();
        info!("rematch: {:?}", self.mode);
        Ok(())
    }

    pub fn back_to_menu(&mut self) {
        self.status = GameStatus::Menu;
        self.pending = None;
    }

    fn reset(&mut self) {
        self.board = Board::new();
        self.current_player = Player::Black;
        self.status = GameStatus::Playing;
        self.history.clear();
        self.pending = None;
        self.times = Times::default();
        self.turn_started = Instant::now();
        self.last_move = None;
        self.outcome = None;
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn times(&self) -> Times {
        self.times
    }

    pub fn last_move(&self) -> Option<Position> {
        self.last_move
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Cells the pending return may hand back; empty when nothing is pending.
    pub fn return_candidates(&self) -> &[Position] {
        self.pending
            .as_ref()
            .map_or(&[][..], |p| p.mv.captured())
    }

    /// Legal moves for the side to move; empty unless the game is in `Playing`.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.status != GameStatus::Playing {
            return Vec::new();
        }
        self.board.legal_moves(self.current_player)
    }

    pub fn has_legal_moves_for_current(&self) -> bool {
        self.board.has_legal_move(self.current_player)
    }

    /// `true` when the computer, not a person, is to move.
    pub fn is_computer_turn(&self) -> bool {
        matches!(
            self.mode,
            Some(GameMode::PlayerVsComputer { human, .. }) if human != self.current_player
        )
    }

    pub fn can_undo(&self) -> bool {
        self.status == GameStatus::Playing && !self.history.is_empty()
    }

    /// Human move at `(row, col)`.
    ///
    /// Captures of two or more pieces leave the game in
    /// `AwaitingReturnSelection` without advancing the turn.
    pub fn submit_move(&mut self, row: u8, col: u8) -> Result<MoveOutcome, GameError> {
        self.ensure_playing()?;
        if self.is_computer_turn() {
            return Err(GameError::NotHumanTurn);
        }
        let pos = Position::new(row, col).ok_or(GameError::OutOfRange)?;
        let mv = self
            .board
            .move_at(pos, self.current_player)
            .ok_or(GameError::IllegalMove)?;

        Ok(self.play_move(mv))
    }

    /// Hands `(row, col)` back to the opponent and completes the pending move.
    pub fn submit_return_selection(&mut self, row: u8, col: u8) -> Result<TurnOutcome, GameError> {
        match self.status {
            GameStatus::AwaitingReturnSelection => {}
            GameStatus::Menu => return Err(GameError::NotPlaying),
            GameStatus::Ended => return Err(GameError::GameOver),
            GameStatus::Playing => return Err(GameError::NoPendingReturn),
        }
        if self.is_computer_turn() {
            return Err(GameError::NotHumanTurn);
        }
        let cell = Position::new(row, col).ok_or(GameError::OutOfRange)?;
        self.resolve_return(cell)
    }

    /// Passes the turn. Only allowed when the side to move has no legal move.
    pub fn pass(&mut self) -> Result<TurnOutcome, GameError> {
        self.ensure_playing()?;
        if self.is_computer_turn() {
            return Err(GameError::NotHumanTurn);
        }
        if self.has_legal_moves_for_current() {
            return Err(GameError::MovesAvailable);
        }
        Ok(self.commit_pass())
    }

    /// Steps back exactly one committed ply.
    pub fn undo(&mut self) -> Result<(), GameError> {
        self.ensure_playing()?;
        let entry = self.history.pop().ok_or(GameError::NothingToUndo)?;

        self.board = entry.board;
        self.current_player = entry.player;
        self.times = entry.times;
        self.turn_started = Instant::now();
        self.last_move = None;
        debug!("undo: {} to move, {} plies left", entry.player, self.history.len());
        Ok(())
    }

    /// Lets the computer play its whole turn: a pass when it has no move,
    /// otherwise a move plus, if required, the returned piece.
    pub fn play_computer_turn(&mut self) -> Result<ComputerTurn, GameError> {
        self.ensure_playing()?;
        if !self.is_computer_turn() {
            return Err(GameError::NotComputerTurn);
        }
        let mut selector = self.selector.take().ok_or(GameError::NotComputerTurn)?;
        let result = self.run_computer_turn(selector.as_mut());
        self.selector = Some(selector);
        result
    }

    fn run_computer_turn(&mut self, selector: &mut dyn MoveSelector) -> Result<ComputerTurn, GameError> {
        let player = self.current_player;

        if !self.has_legal_moves_for_current() {
            let TurnOutcome { game_ended } = self.commit_pass();
            return Ok(ComputerTurn {
                action: PlyAction::Pass,
                search: None,
                game_ended,
            });
        }

        let board = self.board;
        let search = selector
            .select_move(&board, player)
            .ok_or(GameError::IllegalMove)?;
        let position = search.chosen_move.position();
        let mv = board.move_at(position, player).ok_or(GameError::IllegalMove)?;

        let MoveOutcome {
            entered_return_mode,
            mut game_ended,
        } = self.play_move(mv);

        let mut returned = None;
        if entered_return_mode {
            let (mv, board_before) = match &self.pending {
                Some(pending) => (pending.mv.clone(), pending.board_before),
                None => return Err(GameError::NoPendingReturn),
            };
            let cell = selector
                .select_return(&board_before, &mv, player)
                .filter(|cell| mv.captures(*cell))
                .unwrap_or(mv.captured()[0]);
            game_ended = self.resolve_return(cell)?.game_ended;
            returned = Some(cell);
        }

        Ok(ComputerTurn {
            action: PlyAction::Move { position, returned },
            search: Some(search),
            game_ended,
        })
    }

    /// Numbered, human-readable move list.
    pub fn history_log(&self) -> Vec<String> {
        self.history
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let action = match entry.action {
                    PlyAction::Pass => "pass".to_string(),
                    PlyAction::Move {
                        position,
                        returned: None,
                    } => position.to_string(),
                    PlyAction::Move {
                        position,
                        returned: Some(cell),
                    } => format!("{position} return {cell}"),
                };
                format!("{}. {}: {}", idx + 1, entry.player, action)
            })
            .collect()
    }

    pub fn to_game_state(&self) -> GameState {
        let (black_count, white_count) = self.board.count();
        let legal_moves: Vec<Position> = self.legal_moves().iter().map(Move::position).collect();
        GameState {
            board: self.board.to_array().to_vec(),
            phase: self.status.name(),
            current_player: self.current_player,
            black_count,
            white_count,
            black_time: self.times.black,
            white_time: self.times.white,
            must_pass: self.status == GameStatus::Playing && legal_moves.is_empty(),
            legal_moves,
            return_candidates: self.return_candidates().to_vec(),
            last_move: self.last_move,
            can_undo: self.can_undo(),
            is_computer_turn: self.is_computer_turn(),
            history_len: self.history.len(),
        }
    }

    /// Final result, once the game has ended.
    pub fn to_game_result(&self) -> Option<GameResult> {
        self.outcome.as_ref().map(|outcome| GameResult {
            winner: outcome.winner,
            black_count: outcome.black_count,
            white_count: outcome.white_count,
            black_time: outcome.times.black,
            white_time: outcome.times.white,
            decided_by: outcome.decided_by.name(),
            score_diff: outcome.score_diff(),
        })
    }

    fn ensure_playing(&self) -> Result<(), GameError> {
        match self.status {
            GameStatus::Playing => Ok(()),
            GameStatus::Menu => Err(GameError::NotPlaying),
            GameStatus::AwaitingReturnSelection => Err(GameError::ReturnPending),
            GameStatus::Ended => Err(GameError::GameOver),
        }
    }

    /// Plays an already validated move for the side to move.
    fn play_move(&mut self, mv: Move) -> MoveOutcome {
        let player = self.current_player;
        let position = mv.position();
        let before = self.board;

        self.board.place(&mv, player, None);
        self.last_move = Some(position);

        if mv.requires_return() {
            debug!("{player} plays {position}, {} captured: awaiting return", mv.captured().len());
            self.pending = Some(PendingReturn {
                mv,
                board_before: before,
            });
            self.status = GameStatus::AwaitingReturnSelection;
            return MoveOutcome {
                entered_return_mode: true,
                game_ended: false,
            };
        }

        self.history.push(HistoryEntry {
            board: before,
            player,
            times: self.times,
            action: PlyAction::Move {
                position,
                returned: None,
            },
        });
        debug!("{player} plays {position}");

        MoveOutcome {
            entered_return_mode: false,
            game_ended: self.finish_turn(),
        }
    }

    fn resolve_return(&mut self, cell: Position) -> Result<TurnOutcome, GameError> {
        let pending = self.pending.as_ref().ok_or(GameError::NoPendingReturn)?;
        if !pending.mv.captures(cell) {
            return Err(GameError::NotAReturnCandidate);
        }

        let player = self.current_player;
        let mut board = pending.board_before;
        board.apply(&pending.mv, player, Some(cell))?;

        self.history.push(HistoryEntry {
            board: pending.board_before,
            player,
            times: self.times,
            action: PlyAction::Move {
                position: pending.mv.position(),
                returned: Some(cell),
            },
        });
        debug!("{player} returns {cell}");

        self.board = board;
        self.pending = None;
        self.status = GameStatus::Playing;
        Ok(TurnOutcome {
            game_ended: self.finish_turn(),
        })
    }

    fn commit_pass(&mut self) -> TurnOutcome {
        self.history.push(HistoryEntry {
            board: self.board,
            player: self.current_player,
            times: self.times,
            action: PlyAction::Pass,
        });
        debug!("{} passes", self.current_player);
        TurnOutcome {
            game_ended: self.finish_turn(),
        }
    }

    /// Books the mover's time and hands the turn over. Ends the game when
    /// neither side can move; a side that alone is stuck must pass instead.
    fn finish_turn(&mut self) -> bool {
        let now = Instant::now();
        self.times
            .add(self.current_player, (now - self.turn_started).as_secs_f64());
        self.turn_started = now;
        self.current_player = self.current_player.opponent();

        let stuck = !self.board.has_legal_move(self.current_player)
            && !self.board.has_legal_move(self.current_player.opponent());
        if stuck {
            self.end_game();
        }
        stuck
    }

    fn end_game(&mut self) {
        let (black_count, white_count) = self.board.count();
        let outcome = Outcome::decide(black_count, white_count, self.times);
        info!(
            "game over: black {black_count}, white {white_count}, winner {:?} by {}",
            outcome.winner,
            outcome.decided_by.name()
        );
        self.outcome = Some(outcome);
        self.status = GameStatus::Ended;
    }

    pub fn piece_at(&self, row: u8, col: u8) -> Option<Piece> {
        Position::new(row, col).map(|pos| self.board.piece_at(pos))
    }

    #[cfg(test)]
    fn set_board_for_test(&mut self, board: Board, current_player: Player) {
        self.board = board;
        self.current_player = current_player;
        self.status = GameStatus::Playing;
        self.pending = None;
        self.outcome = None;
    }

    #[cfg(test)]
    fn set_times_for_test(&mut self, times: Times) {
        self.times = times;
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}
