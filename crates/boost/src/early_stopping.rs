//! Patience-based early stopping on a higher-is-better validation metric

/// What the training loop should do after a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyStopAction {
    Improved,
    Continue,
    Stop,
}

/// Tracks the best round and stops after `patience` rounds without improvement
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: Option<usize>,
    best_value: Option<f64>,
    best_round: usize,
    rounds_without_improvement: usize,
}

impl EarlyStopping {
    /// `None` tracks the best round but never requests a stop
    pub fn new(patience: Option<usize>) -> Self {
        Self {
            patience,
            best_value: None,
            best_round: 0,
            rounds_without_improvement: 0,
        }
    }

    pub fn update(&mut self, round: usize, value: f64) -> EarlyStopAction {
        let improved = match self.best_value {
            None => true,
            Some(best) => value > best,
        };

        if improved {
            self.best_value = Some(value);
            self.best_round = round;
            self.rounds_without_improvement = 0;
            return EarlyStopAction::Improved;
        }

        self.rounds_without_improvement += 1;
        match self.patience {
            Some(patience) if self.rounds_without_improvement >= patience => EarlyStopAction::Stop,
            _ => EarlyStopAction::Continue,
        }
    }

    pub fn best_round(&self) -> usize {
        self.best_round
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }
}
