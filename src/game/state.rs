use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const CELL_COUNT: usize = 9;

/// 8 条获胜线（3 横、3 竖、2 斜），按固定顺序扫描。
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 玩家棋子标记。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl FromStr for Mark {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Mark::X),
            "o" => Ok(Mark::O),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// 对局状态，由评估器从棋盘推导。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameStatus {
    InProgress,
    Won { winner: Mark },
    Draw,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    pub fn announcement(&self) -> Option<String> {
        match self {
            GameStatus::InProgress => None,
            GameStatus::Won { winner } => Some(format!("Player {winner} has won!")),
            GameStatus::Draw => Some("Game is a draw!".to_string()),
        }
    }
}

/// 3x3 棋盘，9 个格子按行优先索引 0–8。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Mark>; CELL_COUNT],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [None; CELL_COUNT],
        }
    }

    pub fn from_cells(cells: [Option<Mark>; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Option<Mark>; CELL_COUNT] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<Mark> {
        self.cells[index]
    }

    pub fn is_empty(&self, index: usize) -> bool {
        self.cells[index].is_none()
    }

    pub fn place(&mut self, index: usize, mark: Mark) {
        debug_assert!(self.cells[index].is_none(), "cell {index} already marked");
        self.cells[index] = Some(mark);
    }

    pub fn clear(&mut self, index: usize) {
        self.cells[index] = None;
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    pub fn mark_count(&self, mark: Mark) -> usize {
        self.cells
            .iter()
            .filter(|cell| **cell == Some(mark))
            .count()
    }

    pub fn status(&self) -> GameStatus {
        for line in &WINNING_LINES {
            let [a, b, c] = *line;
            if let Some(mark) = self.cells[a] {
                if self.cells[b] == Some(mark) && self.cells[c] == Some(mark) {
                    return GameStatus::Won { winner: mark };
                }
            }
        }

        if self.is_full() {
            GameStatus::Draw
        } else {
            GameStatus::InProgress
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    CellMarked { index: usize, mark: Mark },
    GameWon { winner: Mark },
    GameDrawn,
    GameReset,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    MarkCountSkewed { x_count: usize, o_count: usize },
    OutcomeMismatch {
        declared: GameStatus,
        derived: GameStatus,
    },
}

/// 对局整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    #[serde(default)]
    pub board: Board,
    pub turn: Mark,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<GameEvent>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Mark::X,
            outcome: None,
            event_log: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event: GameEvent) {
        self.event_log.push(event);
    }

    pub fn is_active(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn status(&self) -> GameStatus {
        self.outcome.unwrap_or(GameStatus::InProgress)
    }

    pub fn declare_outcome(&mut self, status: GameStatus) -> GameStatus {
        if self.outcome.is_none() && status.is_terminal() {
            let event = match status {
                GameStatus::Won { winner } => GameEvent::GameWon { winner },
                _ => GameEvent::GameDrawn,
            };
            self.record_event(event);
            self.outcome = Some(status);
        }
        status
    }

    pub fn settle_outcome(&mut self) -> Option<GameStatus> {
        match self.board.status() {
            GameStatus::InProgress => None,
            status => Some(self.declare_outcome(status)),
        }
    }

    pub fn reset(&mut self) {
        self.board = Board::new();
        self.turn = Mark::X;
        self.outcome = None;
        self.event_log.clear();
        self.record_event(GameEvent::GameReset);
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let x_count = self.board.mark_count(Mark::X);
        let o_count = self.board.mark_count(Mark::O);
        if x_count.abs_diff(o_count) > 1 {
            return Err(IntegrityError::MarkCountSkewed { x_count, o_count });
        }

        if let Some(declared) = self.outcome {
            let derived = self.board.status();
            if derived != declared {
                return Err(IntegrityError::OutcomeMismatch { declared, derived });
            }
        }

        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
