use serde::{Deserialize, Serialize};

use crate::game::{Board, GameStatus, Mark, CELL_COUNT};

const WIN_SCORE: i32 = 10;
const LOSS_SCORE: i32 = -10;
const DRAW_SCORE: i32 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    pub score: i32,
    pub nodes: u64,
}

pub fn best_move(board: &mut Board, mark: Mark) -> Option<usize> {
    decide(board, mark).position
}

pub fn decide(board: &mut Board, mark: Mark) -> AiDecision {
    let mut nodes = 0;

    if let Some(score) = terminal_score(board, mark) {
        return AiDecision {
            position: None,
            score,
            nodes,
        };
    }

    let mut best_score = i32::MIN;
    let mut best_position = None;

    for index in 0..CELL_COUNT {
        if !board.is_empty(index) {
            continue;
        }
        board.place(index, mark);
        let score = search(board, mark, false, &mut nodes);
        board.clear(index);
        // Strict greater keeps the first index on ties.
        if score > best_score {
            best_score = score;
            best_position = Some(index);
        }
    }

    AiDecision {
        position: best_position,
        score: best_score,
        nodes,
    }
}

fn terminal_score(board: &Board, mark: Mark) -> Option<i32> {
    match board.status() {
        GameStatus::Won { winner } if winner == mark => Some(WIN_SCORE),
        GameStatus::Won { .. } => Some(LOSS_SCORE),
        GameStatus::Draw => Some(DRAW_SCORE),
        GameStatus::InProgress => None,
    }
}

fn search(board: &mut Board, mark: Mark, maximizing: bool, nodes: &mut u64) -> i32 {
    *nodes += 1;

    if let Some(score) = terminal_score(board, mark) {
        return score;
    }

    let mover = if maximizing { mark } else { mark.opponent() };

    if maximizing {
        let mut best = i32::MIN;
        for index in 0..CELL_COUNT {
            if !board.is_empty(index) {
                continue;
            }
            board.place(index, mover);
            best = best.max(search(board, mark, false, nodes));
            board.clear(index);
        }
        best
    } else {
        let mut best = i32::MAX;
        for index in 0..CELL_COUNT {
            if !board.is_empty(index) {
                continue;
            }
            board.place(index, mover);
            best = best.min(search(board, mark, true, nodes));
            board.clear(index);
        }
        best
    }
}
