//! Collaborator hooks called by the driver
//!
//! Presenters see every settle step together with the board state it left
//! behind. Session listeners see the board's session events (score, rewards,
//! win and loss). Both run inside the driver task and must not block.

use match3_core::{BoardEvent, BoardSnapshot, CoreError, SettleReport};

/// Receives every settle step so it can animate it
pub trait Presenter: Send {
    fn on_settle(&mut self, report: &SettleReport, snapshot: &BoardSnapshot);

    /// The board was replaced wholesale (restart)
    fn on_reset(&mut self, _snapshot: &BoardSnapshot) {}
}

impl<F> Presenter for F
where
    F: FnMut(&SettleReport, &BoardSnapshot) + Send,
{
    fn on_settle(&mut self, report: &SettleReport, snapshot: &BoardSnapshot) {
        self(report, snapshot)
    }
}

/// Session/meta collaborator.
///
/// Override only the hooks you need; [`SessionListener::on_event`] routes
/// each [`BoardEvent`] to the matching method.
pub trait SessionListener: Send {
    fn on_event(&mut self, event: &BoardEvent) {
        match *event {
            BoardEvent::ScoreChanged { score, delta } => self.on_score_changed(score, delta),
            BoardEvent::BombsChanged { bombs } => self.on_bombs_changed(bombs),
            BoardEvent::MoveConsumed { remaining } => self.on_move_consumed(remaining),
            BoardEvent::StageWon { score, coins } => self.on_stage_win(score, coins),
            BoardEvent::GameOver { score } => self.on_game_over(score),
            BoardEvent::BoardReseeded => self.on_reseeded(),
        }
    }

    fn on_score_changed(&mut self, _score: u32, _delta: u32) {}

    fn on_bombs_changed(&mut self, _bombs: u32) {}

    fn on_move_consumed(&mut self, _remaining: u32) {}

    fn on_stage_win(&mut self, _score: u32, _coins: u32) {}

    fn on_game_over(&mut self, _score: u32) {}

    fn on_reseeded(&mut self) {}

    /// A settle step failed; the board is idle with its previous grid
    fn on_failure(&mut self, _error: &CoreError) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tally {
        scores: Vec<(u32, u32)>,
        won: Option<(u32, u32)>,
        over: Option<u32>,
    }

    impl SessionListener for Tally {
        fn on_score_changed(&mut self, score: u32, delta: u32) {
            self.scores.push((score, delta));
        }

        fn on_stage_win(&mut self, score: u32, coins: u32) {
            self.won = Some((score, coins));
        }

        fn on_game_over(&mut self, score: u32) {
            self.over = Some(score);
        }
    }

    #[test]
    fn on_event_routes_to_hooks() {
        let mut tally = Tally::default();
        tally.on_event(&BoardEvent::ScoreChanged { score: 30, delta: 30 });
        tally.on_event(&BoardEvent::MoveConsumed { remaining: 4 });
        tally.on_event(&BoardEvent::StageWon { score: 30, coins: 115 });
        tally.on_event(&BoardEvent::GameOver { score: 12 });

        assert_eq!(tally.scores, vec![(30, 30)]);
        assert_eq!(tally.won, Some((30, 115)));
        assert_eq!(tally.over, Some(12));
    }

    #[test]
    fn closures_are_presenters() {
        let mut calls = 0;
        {
            let mut presenter = |_: &SettleReport, _: &BoardSnapshot| calls += 1;
            let snapshot = match3_core::Board::with_seed(
                Default::default(),
                match3_core::types::EngineConfig {
                    max_generation_tries: 1000,
                    ..Default::default()
                },
                3,
            )
            .unwrap()
            .snapshot();
            Presenter::on_settle(&mut presenter, &SettleReport::default(), &snapshot);
            Presenter::on_settle(&mut presenter, &SettleReport::default(), &snapshot);
        }
        assert_eq!(calls, 2);
    }
}
