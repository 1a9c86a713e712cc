use serde::{Deserialize, Serialize};

use crate::ai;

use super::state::{GameEvent, GameState, GameStatus, IntegrityError, Mark};

/// 落子动作，格子索引 0–8。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveAction {
    pub index: usize,
    pub mark: Mark,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GameStatus>,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome;
        if let Some(status) = outcome {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::GameWon { .. } | GameEvent::GameDrawn));
            if !has_event {
                events.push(match status {
                    GameStatus::Won { winner } => GameEvent::GameWon { winner },
                    _ => GameEvent::GameDrawn,
                });
            }
        }

        Self {
            state,
            events,
            outcome,
        }
    }
}

#[derive(Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply_move(
        &mut self,
        state: &mut GameState,
        action: MoveAction,
    ) -> Result<Vec<GameEvent>, IntegrityError> {
        state.integrity_check()?;

        // 占用格或已终局：按约定静默忽略，不产生事件。
        if !state.is_active() || !state.board.is_empty(action.index) {
            return Ok(Vec::new());
        }

        Ok(self.mark_cell(state, action.index, action.mark))
    }

    pub fn computer_move(
        &mut self,
        state: &mut GameState,
        mark: Mark,
    ) -> Result<Vec<GameEvent>, IntegrityError> {
        state.integrity_check()?;

        // 延迟调度可能在重置之后才触发：除活跃状态外还要求轮到机器方。
        if !state.is_active() || state.turn != mark {
            return Ok(Vec::new());
        }

        let Some(index) = ai::best_move(&mut state.board, mark) else {
            return Ok(Vec::new());
        };

        Ok(self.mark_cell(state, index, mark))
    }

    pub fn reset(&mut self, state: &mut GameState) -> Vec<GameEvent> {
        state.reset();
        vec![GameEvent::GameReset]
    }

    pub fn check_status(state: &GameState) -> GameStatus {
        state.board.status()
    }

    fn mark_cell(&mut self, state: &mut GameState, index: usize, mark: Mark) -> Vec<GameEvent> {
        state.board.place(index, mark);
        let marked = GameEvent::CellMarked { index, mark };
        state.record_event(marked.clone());
        let mut events = vec![marked];

        match state.settle_outcome() {
            Some(GameStatus::Won { winner }) => events.push(GameEvent::GameWon { winner }),
            Some(_) => events.push(GameEvent::GameDrawn),
            None => state.turn = mark.opponent(),
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(
        engine: &mut RuleEngine,
        state: &mut GameState,
        index: usize,
        mark: Mark,
    ) -> Vec<GameEvent> {
        engine
            .apply_move(state, MoveAction { index, mark })
            .expect("move on a healthy state should pass the integrity check")
    }

    #[test]
    fn human_move_marks_cell_and_passes_turn() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();

        let events = play(&mut engine, &mut state, 4, Mark::X);

        assert_eq!(state.board.cell(4), Some(Mark::X));
        assert_eq!(state.turn, Mark::O, "turn should pass to the other mark");
        assert_eq!(
            events,
            vec![GameEvent::CellMarked {
                index: 4,
                mark: Mark::X
            }]
        );
    }

    #[test]
    fn occupied_cell_is_silently_ignored() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        play(&mut engine, &mut state, 4, Mark::X);
        let snapshot = state.clone();

        let events = play(&mut engine, &mut state, 4, Mark::O);

        assert!(events.is_empty(), "no events for an ignored move");
        assert_eq!(state, snapshot, "an ignored move must not change anything");
    }

    #[test]
    fn winning_move_emits_terminal_event_and_freezes() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        play(&mut engine, &mut state, 0, Mark::X);
        play(&mut engine, &mut state, 3, Mark::O);
        play(&mut engine, &mut state, 1, Mark::X);
        play(&mut engine, &mut state, 4, Mark::O);

        let events = play(&mut engine, &mut state, 2, Mark::X);

        assert_eq!(
            events,
            vec![
                GameEvent::CellMarked {
                    index: 2,
                    mark: Mark::X
                },
                GameEvent::GameWon { winner: Mark::X },
            ]
        );
        assert!(!state.is_active());
        assert_eq!(state.status(), GameStatus::Won { winner: Mark::X });
        assert_eq!(state.turn, Mark::X, "turn must not advance past a win");
    }

    #[test]
    fn moves_after_the_game_ends_are_ignored() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        play(&mut engine, &mut state, 0, Mark::X);
        play(&mut engine, &mut state, 3, Mark::O);
        play(&mut engine, &mut state, 1, Mark::X);
        play(&mut engine, &mut state, 4, Mark::O);
        play(&mut engine, &mut state, 2, Mark::X);

        let events = play(&mut engine, &mut state, 5, Mark::O);

        assert!(events.is_empty());
        assert_eq!(state.board.cell(5), None, "frozen board must stay frozen");
    }

    #[test]
    fn filling_the_board_without_a_line_is_a_draw() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        for (index, mark) in [
            (0, Mark::X),
            (1, Mark::O),
            (2, Mark::X),
            (4, Mark::O),
            (3, Mark::X),
            (5, Mark::O),
            (7, Mark::X),
            (6, Mark::O),
        ] {
            play(&mut engine, &mut state, index, mark);
        }

        let events = play(&mut engine, &mut state, 8, Mark::X);

        assert_eq!(
            events,
            vec![
                GameEvent::CellMarked {
                    index: 8,
                    mark: Mark::X
                },
                GameEvent::GameDrawn,
            ]
        );
        assert_eq!(state.status(), GameStatus::Draw);
    }

    #[test]
    fn computer_completes_its_winning_line() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        state.board.place(3, Mark::X);
        state.board.place(4, Mark::X);
        state.board.place(6, Mark::O);
        state.board.place(7, Mark::O);
        state.turn = Mark::O;

        let events = engine
            .computer_move(&mut state, Mark::O)
            .expect("computer move should pass the integrity check");

        assert_eq!(state.board.cell(8), Some(Mark::O), "winning beats blocking");
        assert_eq!(
            events,
            vec![
                GameEvent::CellMarked {
                    index: 8,
                    mark: Mark::O
                },
                GameEvent::GameWon { winner: Mark::O },
            ]
        );
    }

    #[test]
    fn computer_move_requires_its_own_turn() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();

        let events = engine
            .computer_move(&mut state, Mark::O)
            .expect("computer move should pass the integrity check");

        assert!(events.is_empty(), "it is X to move, O must not act");
        assert_eq!(state.board, GameState::new().board);
    }

    #[test]
    fn stale_computer_move_after_reset_is_a_no_op() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        play(&mut engine, &mut state, 0, Mark::X);
        engine.reset(&mut state);

        let events = engine
            .computer_move(&mut state, Mark::O)
            .expect("computer move should pass the integrity check");

        assert!(events.is_empty(), "a stale deferral must not touch a reset board");
        assert!(state.board.empty_cells().count() == 9);
        assert_eq!(state.turn, Mark::X);
    }

    #[test]
    fn computer_move_on_finished_game_is_ignored() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        play(&mut engine, &mut state, 0, Mark::X);
        play(&mut engine, &mut state, 3, Mark::O);
        play(&mut engine, &mut state, 1, Mark::X);
        play(&mut engine, &mut state, 4, Mark::O);
        play(&mut engine, &mut state, 2, Mark::X);
        let snapshot = state.clone();

        let events = engine
            .computer_move(&mut state, Mark::X)
            .expect("computer move should pass the integrity check");

        assert!(events.is_empty());
        assert_eq!(state, snapshot);
    }

    #[test]
    fn reset_returns_the_board_to_start() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        play(&mut engine, &mut state, 0, Mark::X);
        play(&mut engine, &mut state, 3, Mark::O);
        play(&mut engine, &mut state, 1, Mark::X);
        play(&mut engine, &mut state, 4, Mark::O);
        play(&mut engine, &mut state, 2, Mark::X);

        let events = engine.reset(&mut state);

        assert_eq!(events, vec![GameEvent::GameReset]);
        assert!(state.is_active());
        assert_eq!(state.turn, Mark::X);
        assert!(state.board.empty_cells().count() == 9);
    }

    #[test]
    fn corrupted_states_are_rejected() {
        let mut engine = RuleEngine::new();
        let mut state = GameState::new();
        state.board.place(0, Mark::X);
        state.board.place(1, Mark::X);
        state.board.place(4, Mark::X);

        let error = engine
            .apply_move(
                &mut state,
                MoveAction {
                    index: 8,
                    mark: Mark::O,
                },
            )
            .expect_err("skewed mark counts should be rejected");

        assert!(matches!(error, IntegrityError::MarkCountSkewed { .. }));
    }

    #[test]
    fn resolution_backfills_a_missing_terminal_event() {
        let mut state = GameState::new();
        state.board.place(0, Mark::O);
        state.board.place(4, Mark::O);
        state.board.place(8, Mark::O);
        state.board.place(1, Mark::X);
        state.board.place(2, Mark::X);
        state.settle_outcome().expect("diagonal is complete");

        let resolution = RuleResolution::new(state, Vec::new());

        assert_eq!(resolution.outcome, Some(GameStatus::Won { winner: Mark::O }));
        assert!(
            resolution
                .events
                .iter()
                .any(|event| matches!(event, GameEvent::GameWon { winner: Mark::O })),
            "terminal event should be filled in"
        );
    }
}
