//! 游戏核心逻辑模块（棋盘状态、规则引擎等）。

pub mod rules;
pub mod state;

pub use state::{
    Board,
    GameEvent,
    GameState,
    GameStatus,
    IntegrityError,
    Mark,
    CELL_COUNT,
    WINNING_LINES,
};
pub use rules::{MoveAction, RuleEngine, RuleResolution};
