use crate::shared::expression::{BestExpression, Expression, ExpressionScores};

/// Exponential moving average over expression scores.
///
/// Formula: `ema[t] = alpha * ema[t-1] + (1 - alpha) * observed`
///
/// `alpha` weights history, so 1 freezes the state and 0 follows the latest
/// observation. It is supplied per update and is not validated: values
/// outside [0, 1] extrapolate.
#[derive(Clone, Debug, Default)]
pub struct ExpressionSmoother {
    ema: ExpressionScores,
}

impl ExpressionSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blends `observed` into the running average for every label.
    pub fn update(&mut self, observed: &ExpressionScores, alpha: f64) {
        for label in Expression::ALL {
            let blended = alpha * self.ema.get(label) + (1.0 - alpha) * observed.get(label);
            self.ema.set(label, blended);
        }
    }

    /// Pulls every label toward neutral; used when no face is visible.
    pub fn decay_to_neutral(&mut self, alpha: f64) {
        self.update(&ExpressionScores::only(Expression::Neutral, 1.0), alpha);
    }

    /// Highest smoothed score, scanning labels in declaration order.
    ///
    /// Starts from `neutral` at 0 and only moves on a strictly greater score,
    /// so ties keep the earlier label.
    pub fn select_best(&self) -> BestExpression {
        let mut best = BestExpression::default();
        for (expression, score) in self.ema.iter() {
            if score > best.score {
                best = BestExpression { expression, score };
            }
        }
        best
    }

    pub fn scores(&self) -> &ExpressionScores {
        &self.ema
    }
}
