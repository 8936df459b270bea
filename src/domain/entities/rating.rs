use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceRating {
    pub rating: u8,
    pub prompt_tokens: u64,
}

impl RelevanceRating {
    pub const INVALID: u8 = 0;
    pub const MAX: u8 = 10;

    pub fn new(rating: i64, prompt_tokens: u64) -> Self {
        let rating = if (1..=Self::MAX as i64).contains(&rating) {
            rating as u8
        } else {
            Self::INVALID
        };
        Self {
            rating,
            prompt_tokens,
        }
    }

    pub fn invalid(prompt_tokens: u64) -> Self {
        Self {
            rating: Self::INVALID,
            prompt_tokens,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.rating != Self::INVALID
    }
}
