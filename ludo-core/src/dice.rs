//! Die rolling

use std::collections::VecDeque;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::board::SIX;
use crate::game::MAX_CONSECUTIVE_SIXES;

/// Source of die values for one match
#[derive(Clone, Debug)]
pub enum Dice {
    /// Uniform rolls from a seedable generator
    Random(ChaCha8Rng),
    /// Predetermined values, replayed in order (then falls back to 1).
    /// Values above the allowed face are clamped to it.
    Scripted(VecDeque<u8>),
}

impl Dice {
    pub fn seeded(seed: u64) -> Self {
        Dice::Random(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Dice::Random(ChaCha8Rng::from_entropy())
    }

    /// Seeded when a seed is given, otherwise from entropy
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Dice::seeded(s),
            None => Dice::from_entropy(),
        }
    }

    pub fn scripted(values: impl IntoIterator<Item = u8>) -> Self {
        Dice::Scripted(values.into_iter().collect())
    }

    /// Roll for a player who has rolled `consecutive_sixes` sixes in a row.
    ///
    /// After two sixes the die only shows 1..=5.
    pub fn roll(&mut self, consecutive_sixes: u8) -> u8 {
        let max_face = if consecutive_sixes >= MAX_CONSECUTIVE_SIXES {
            SIX - 1
        } else {
            SIX
        };

        match self {
            Dice::Random(rng) => rng.gen_range(1..=max_face),
            Dice::Scripted(values) => values.pop_front().unwrap_or(1).clamp(1, max_face),
        }
    }
}
