use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use web_time::Duration;

use crate::error::GameError;

/// Named strength tier offered to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// How leaf positions are scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Phase-weighted material, corners, edges, mobility and stability.
    Weighted,
    /// Material difference plus uniform noise in `[0, amplitude]`.
    MaterialWithJitter { amplitude: f32 },
}

/// Everything the computer player needs to know about its strength.
///
/// Tiers are plain data; a custom tier is just another value of this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyConfig {
    pub max_depth: u8,
    /// Checked between iterative-deepening depths.
    pub time_budget: Duration,
    /// Chance of replacing the searched choice with a uniformly random one.
    /// `1.0` skips the search entirely.
    pub random_override_probability: f64,
    /// Bake the one-ply best return cell into multi-capture moves while searching.
    pub use_return_optimization: bool,
    pub evaluation: Evaluation,
}

impl DifficultyConfig {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                max_depth: 2,
                time_budget: Duration::from_millis(500),
                random_override_probability: 1.0,
                use_return_optimization: false,
                evaluation: Evaluation::MaterialWithJitter { amplitude: 5.0 },
            },
            Difficulty::Normal => Self {
                max_depth: 4,
                time_budget: Duration::from_millis(1000),
                random_override_probability: 0.1,
                use_return_optimization: false,
                evaluation: Evaluation::Weighted,
            },
            Difficulty::Hard => Self {
                max_depth: 6,
                time_budget: Duration::from_millis(3000),
                random_override_probability: 0.0,
                use_return_optimization: true,
                evaluation: Evaluation::Weighted,
            },
        }
    }

    /// Same tier with every random path disabled.
    pub fn deterministic(self) -> Self {
        Self {
            random_override_probability: 0.0,
            evaluation: match self.evaluation {
                Evaluation::MaterialWithJitter { .. } => Evaluation::MaterialWithJitter {
                    amplitude: 0.0,
                },
                weighted => weighted,
            },
            ..self
        }
    }

    pub(crate) fn override_probability(&self) -> f64 {
        self.random_override_probability.clamp(0.0, 1.0)
    }
}

impl From<Difficulty> for DifficultyConfig {
    fn from(difficulty: Difficulty) -> Self {
        Self::for_difficulty(difficulty)
    }
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self::for_difficulty(Difficulty::default())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => f.write_str("easy"),
            Self::Normal => f.write_str("normal"),
            Self::Hard => f.write_str("hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" | "medium" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            _ => Err(GameError::UnknownDifficulty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_table_matches_documented_limits() {
        let easy = DifficultyConfig::from(Difficulty::Easy);
        let normal = DifficultyConfig::from(Difficulty::Normal);
        let hard = DifficultyConfig::from(Difficulty::Hard);

        assert_eq!((easy.max_depth, easy.time_budget), (2, Duration::from_millis(500)));
        assert_eq!((normal.max_depth, normal.time_budget), (4, Duration::from_millis(1000)));
        assert_eq!((hard.max_depth, hard.time_budget), (6, Duration::from_millis(3000)));

        assert_eq!(easy.random_override_probability, 1.0);
        assert_eq!(normal.random_override_probability, 0.1);
        assert_eq!(hard.random_override_probability, 0.0);
        assert!(hard.use_return_optimization);
        assert!(!normal.use_return_optimization);
    }

    #[test]
    fn deterministic_clears_random_paths_only() {
        let easy = DifficultyConfig::from(Difficulty::Easy).deterministic();

        assert_eq!(easy.random_override_probability, 0.0);
        assert_eq!(easy.evaluation, Evaluation::MaterialWithJitter { amplitude: 0.0 });
        assert_eq!(easy.max_depth, 2);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!("medium".parse::<Difficulty>(), Ok(Difficulty::Normal));
        assert_eq!("impossible".parse::<Difficulty>(), Err(GameError::UnknownDifficulty));
    }
}
