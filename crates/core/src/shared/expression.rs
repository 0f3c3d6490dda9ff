use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Emoji shown when a label has no dedicated glyph.
pub const DEFAULT_EMOJI: &str = "😐";

/// The closed set of facial expression labels.
///
/// Declaration order is significant: it is the scan order used when
/// selecting the best expression, so ties resolve toward earlier labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Expression {
    pub const COUNT: usize = 7;

    pub const ALL: [Expression; Self::COUNT] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Sad,
        Expression::Angry,
        Expression::Fearful,
        Expression::Disgusted,
        Expression::Surprised,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Fearful => "fearful",
            Expression::Disgusted => "disgusted",
            Expression::Surprised => "surprised",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Expression::Neutral => "😐",
            Expression::Happy => "😀",
            Expression::Sad => "😢",
            Expression::Angry => "😠",
            Expression::Fearful => "😨",
            Expression::Disgusted => "🤢",
            Expression::Surprised => "😮",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown expression label: {0}")]
pub struct UnknownExpression(pub String);

impl FromStr for Expression {
    type Err = UnknownExpression;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| UnknownExpression(s.to_string()))
    }
}

/// Looks up the emoji for a label name, falling back to [`DEFAULT_EMOJI`].
pub fn emoji_for_label(label: &str) -> &'static str {
    label
        .parse::<Expression>()
        .map(Expression::emoji)
        .unwrap_or(DEFAULT_EMOJI)
}

/// One confidence value per expression label.
///
/// Backed by a fixed array so every label is always present.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExpressionScores {
    values: [f64; Expression::COUNT],
}

impl ExpressionScores {
    pub fn zero() -> Self {
        Self::default()
    }

    /// A partial observation: `label` at `value`, every other label at 0.
    pub fn only(label: Expression, value: f64) -> Self {
        let mut scores = Self::zero();
        scores.set(label, value);
        scores
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Expression, f64)>,
    {
        let mut scores = Self::zero();
        for (label, value) in pairs {
            scores.set(label, value);
        }
        scores
    }

    pub fn get(&self, label: Expression) -> f64 {
        self.values[label.index()]
    }

    pub fn set(&mut self, label: Expression, value: f64) {
        self.values[label.index()] = value;
    }

    /// Iterates `(label, score)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Expression, f64)> + '_ {
        Expression::ALL.into_iter().map(|e| (e, self.get(e)))
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// The `(label, score)` pair currently on top of the smoothed scores.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestExpression {
    pub expression: Expression,
    pub score: f64,
}

impl BestExpression {
    pub fn emoji(&self) -> &'static str {
        self.expression.emoji()
    }

    /// Text shown next to the face, e.g. `happy (0.40)`.
    pub fn label(&self) -> String {
        format!("{} ({:.2})", self.expression, self.score)
    }
}

impl Default for BestExpression {
    fn default() -> Self {
        Self {
            expression: Expression::Neutral,
            score: 0.0,
        }
    }
}
