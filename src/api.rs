//! JS-facing exports. One engine lives behind a mutex; every call locks it,
//! runs one operation and hands back a plain serde object.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use once_cell::sync::Lazy;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::ai::difficulty::Difficulty;
use crate::ai::search::SearchResult;
use crate::ai::{compute_move, compute_return_selection};
use crate::board::Board;
use crate::error::GameError;
use crate::game::{ComputerTurn, GameEngine, GameMode, MoveOutcome, PlyAction, TurnOutcome};
use crate::types::{
    ComputerTurnReport, MoveReport, Player, Position, SearchReport, TurnReport,
};

static ENGINE: Lazy<Mutex<GameEngine>> = Lazy::new(|| Mutex::new(GameEngine::new()));

fn engine() -> MutexGuard<'static, GameEngine> {
    ENGINE.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    Ok(serde_wasm_bindgen::to_value(value)?)
}

fn js_error(err: GameError) -> JsValue {
    JsValue::from_str(err.code())
}

fn rejected(op: &str, err: GameError) -> &'static str {
    warn!("{op} rejected: {err}");
    err.code()
}

/// Parses the menu selection into a game mode. `mode` is `"pvp"` or `"pvc"`;
/// the color and difficulty only matter against the computer.
pub(crate) fn parse_mode(mode: &str, human_color: &str, difficulty: &str) -> Result<GameMode, GameError> {
    match mode.trim().to_ascii_lowercase().as_str() {
        "pvp" | "player_vs_player" => Ok(GameMode::PlayerVsPlayer),
        "pvc" | "pvai" | "player_vs_computer" => Ok(GameMode::PlayerVsComputer {
            human: human_color.parse::<Player>()?,
            difficulty: difficulty.parse::<Difficulty>()?,
        }),
        _ => Err(GameError::UnknownMode),
    }
}

pub(crate) fn move_report(result: Result<MoveOutcome, GameError>) -> MoveReport {
    match result {
        Ok(outcome) => MoveReport {
            applied: true,
            entered_return_mode: outcome.entered_return_mode,
            game_ended: outcome.game_ended,
            rejection: None,
        },
        Err(err) => MoveReport {
            applied: false,
            entered_return_mode: false,
            game_ended: false,
            rejection: Some(rejected("move", err)),
        },
    }
}

pub(crate) fn turn_report(op: &str, result: Result<TurnOutcome, GameError>) -> TurnReport {
    match result {
        Ok(outcome) => TurnReport {
            applied: true,
            game_ended: outcome.game_ended,
            rejection: None,
        },
        Err(err) => TurnReport {
            applied: false,
            game_ended: false,
            rejection: Some(rejected(op, err)),
        },
    }
}

pub(crate) fn search_report(result: &SearchResult) -> SearchReport {
    SearchReport {
        row: result.chosen_move.row(),
        col: result.chosen_move.col(),
        captured: result.chosen_move.captured().to_vec(),
        depth_reached: result.depth_reached,
        positions_evaluated: result.positions_evaluated,
        elapsed_ms: result.elapsed.as_secs_f64() * 1000.0,
        best_score: result.best_score,
        randomized: result.randomized,
    }
}

pub(crate) fn computer_turn_report(result: Result<ComputerTurn, GameError>) -> ComputerTurnReport {
    match result {
        Ok(turn) => {
            let (passed, played, returned) = match turn.action {
                PlyAction::Pass => (true, None, None),
                PlyAction::Move { position, returned } => (false, Some(position), returned),
            };
            ComputerTurnReport {
                applied: true,
                passed,
                played,
                returned,
                search: turn.search.as_ref().map(search_report),
                game_ended: turn.game_ended,
                rejection: None,
            }
        }
        Err(err) => ComputerTurnReport {
            applied: false,
            passed: false,
            played: None,
            returned: None,
            search: None,
            game_ended: false,
            rejection: Some(rejected("computer turn", err)),
        },
    }
}

/// Stateless move query on an arbitrary position.
pub(crate) fn search_cells(
    cells: &[u8],
    player: u8,
    difficulty: &str,
) -> Result<Option<SearchReport>, GameError> {
    let board = Board::from_cells(cells)?;
    let player = Player::from_code(player)?;
    let difficulty = difficulty.parse::<Difficulty>()?;
    Ok(compute_move(&board, player, difficulty).map(|result| search_report(&result)))
}

/// Stateless return-cell query: `cells` is the board before `player` plays `(row, col)`.
pub(crate) fn return_for_cells(
    cells: &[u8],
    player: u8,
    row: u8,
    col: u8,
    difficulty: &str,
) -> Result<Option<Position>, GameError> {
    let board = Board::from_cells(cells)?;
    let player = Player::from_code(player)?;
    let difficulty = difficulty.parse::<Difficulty>()?;
    let pos = Position::new(row, col).ok_or(GameError::OutOfRange)?;
    let mv = board.move_at(pos, player).ok_or(GameError::IllegalMove)?;
    if !mv.requires_return() {
        return Ok(None);
    }
    Ok(compute_return_selection(&board, &mv, player, difficulty))
}

#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        // A second call finds the logger already installed.
        console_log::init_with_level(log::Level::Debug).ok();
    }
}

#[wasm_bindgen(js_name = newGame)]
pub fn new_game(mode: &str, human_color: &str, difficulty: &str) -> Result<JsValue, JsValue> {
    let mode = parse_mode(mode, human_color, difficulty).map_err(js_error)?;
    let mut engine = engine();
    engine.start(mode);
    to_js(&engine.to_game_state())
}

#[wasm_bindgen(js_name = getState)]
pub fn get_state() -> Result<JsValue, JsValue> {
    to_js(&engine().to_game_state())
}

#[wasm_bindgen(js_name = getLegalMoves)]
pub fn get_legal_moves() -> Result<JsValue, JsValue> {
    let moves: Vec<Position> = engine().legal_moves().iter().map(|mv| mv.position()).collect();
    to_js(&moves)
}

#[wasm_bindgen(js_name = submitMove)]
pub fn submit_move(row: u8, col: u8) -> Result<JsValue, JsValue> {
    to_js(&move_report(engine().submit_move(row, col)))
}

#[wasm_bindgen(js_name = submitReturnSelection)]
pub fn submit_return_selection(row: u8, col: u8) -> Result<JsValue, JsValue> {
    to_js(&turn_report("return selection", engine().submit_return_selection(row, col)))
}

#[wasm_bindgen(js_name = passTurn)]
pub fn pass_turn() -> Result<JsValue, JsValue> {
    to_js(&turn_report("pass", engine().pass()))
}

#[wasm_bindgen]
pub fn undo() -> Result<JsValue, JsValue> {
    let result = engine().undo().map(|()| TurnOutcome { game_ended: false });
    to_js(&turn_report("undo", result))
}

#[wasm_bindgen]
pub fn rematch() -> Result<JsValue, JsValue> {
    let result = engine().rematch().map(|()| TurnOutcome { game_ended: false });
    to_js(&turn_report("rematch", result))
}

#[wasm_bindgen]
pub fn restart() -> Result<JsValue, JsValue> {
    let result = engine().restart().map(|()| TurnOutcome { game_ended: false });
    to_js(&turn_report("restart", result))
}

#[wasm_bindgen(js_name = backToMenu)]
pub fn back_to_menu() {
    engine().back_to_menu();
    info!("back to menu");
}

#[wasm_bindgen(js_name = playComputerTurn)]
pub fn play_computer_turn() -> Result<JsValue, JsValue> {
    to_js(&computer_turn_report(engine().play_computer_turn()))
}

#[wasm_bindgen(js_name = getOutcome)]
pub fn get_outcome() -> Result<JsValue, JsValue> {
    match engine().to_game_result() {
        Some(result) => to_js(&result),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen(js_name = getHistory)]
pub fn get_history() -> Result<JsValue, JsValue> {
    to_js(&engine().history_log())
}

#[wasm_bindgen(js_name = computeMove)]
pub fn compute_move_js(cells: &[u8], player: u8, difficulty: &str) -> Result<JsValue, JsValue> {
    match search_cells(cells, player, difficulty).map_err(js_error)? {
        Some(report) => to_js(&report),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen(js_name = computeReturnSelection)]
pub fn compute_return_selection_js(
    cells: &[u8],
    player: u8,
    row: u8,
    col: u8,
    difficulty: &str,
) -> Result<JsValue, JsValue> {
    match return_for_cells(cells, player, row, col, difficulty).map_err(js_error)? {
        Some(cell) => to_js(&cell),
        None => Ok(JsValue::NULL),
    }
}
