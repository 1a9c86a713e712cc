pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{best_move, decide, AiDecision};
pub use game::{
    Board, GameEvent, GameState, GameStatus, IntegrityError, Mark, MoveAction, RuleEngine,
    RuleResolution, CELL_COUNT, WINNING_LINES,
};

/// 机器方延迟落子的默认等待时间（毫秒）。
const DEFAULT_THINK_DELAY_MS: u32 = 500;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: IntegrityError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn resolution_from_events(state: &GameState, events: Vec<GameEvent>) -> RuleResolution {
    RuleResolution::new(state.clone(), events)
}

fn parse_mark(value: &str) -> Result<Mark, JsValue> {
    Mark::from_str(value).map_err(|_| JsValue::from_str(&format!("unknown mark: {value}")))
}

fn ensure_cell_index(index: usize) -> Result<usize, JsValue> {
    if index >= CELL_COUNT {
        return Err(JsValue::from_str(&format!(
            "cell index out of range: {index}"
        )));
    }
    Ok(index)
}

#[derive(Serialize)]
struct AiMoveResponse {
    decision: AiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<RuleResolution>,
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(initial_state_json: Option<String>) -> Result<GameEngine, JsValue> {
        let state = if let Some(json) = initial_state_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            GameState::new()
        };
        Ok(GameEngine { state })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.state = state;
        Ok(())
    }

    pub fn apply_move(&mut self, index: u8, mark: &str) -> Result<String, JsValue> {
        let action = MoveAction {
            index: ensure_cell_index(index as usize)?,
            mark: parse_mark(mark)?,
        };
        let mut engine = RuleEngine::new();
        let events = engine
            .apply_move(&mut self.state, action)
            .map_err(to_js_error)?;
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn computer_move(&mut self, mark: &str) -> Result<String, JsValue> {
        let mark = parse_mark(mark)?;

        // 先在棋盘副本上完成搜索，再经规则引擎的守卫落子。
        let mut scratch = self.state.board.clone();
        let decision = decide(&mut scratch, mark);

        let mut engine = RuleEngine::new();
        let events = engine
            .computer_move(&mut self.state, mark)
            .map_err(to_js_error)?;
        let applied = if events.is_empty() {
            None
        } else {
            Some(resolution_from_events(&self.state, events))
        };

        let response = AiMoveResponse { decision, applied };
        serde_json::to_string(&response).map_err(serde_to_js_error)
    }

    pub fn think(&self, mark: &str, delay_ms: Option<u32>) -> Promise {
        let state = self.state.clone();
        let mark = parse_mark(mark);
        let delay = delay_ms.unwrap_or(DEFAULT_THINK_DELAY_MS);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            // 决策在克隆的棋盘上进行；真正落子仍要走 computer_move 的守卫。
            let mark = mark?;
            let mut board = state.board.clone();
            let decision = decide(&mut board, mark);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        let mut engine = RuleEngine::new();
        let events = engine.reset(&mut self.state);
        make_resolution_json(resolution_from_events(&self.state, events))
    }

    pub fn game_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn current_turn(&self) -> String {
        self.state.turn.to_string()
    }

    pub fn announcement(&self) -> Option<String> {
        self.state.status().announcement()
    }

    pub fn legal_moves(&self) -> Vec<u8> {
        if !self.state.is_active() {
            return Vec::new();
        }
        self.state
            .board
            .empty_cells()
            .map(|index| index as u8)
            .collect()
    }
}

/// 返回一局全新对局的初始状态。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::new()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "applyMove")]
pub fn apply_move(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let mut state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: MoveAction = from_value(action).map_err(JsValue::from)?;
    ensure_cell_index(action.index)?;
    let mut engine = RuleEngine::new();
    match engine.apply_move(&mut state, action) {
        Ok(events) => to_value(&RuleResolution::new(state, events)).map_err(JsValue::from),
        Err(error) => Err(to_js_error(error)),
    }
}

/// 在传入状态上计算指定一方的最优落子，不修改原状态。
#[wasm_bindgen(js_name = "computeBestMove")]
pub fn compute_best_move(state: JsValue, mark: Option<String>) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let mark = match mark.as_deref() {
        Some(value) => parse_mark(value)?,
        None => state.turn,
    };
    let mut board = state.board.clone();
    let decision = decide(&mut board, mark);
    to_value(&decision).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "checkStatus")]
pub fn check_status(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    to_value(&RuleEngine::check_status(&state)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state.integrity_check().map_err(to_js_error)?;
    Ok(())
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
