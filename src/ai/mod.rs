//! AI 算法模块（穷举极小极大搜索）。

pub mod minimax;

pub use minimax::{best_move, decide, AiDecision};
