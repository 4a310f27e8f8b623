//! Placeholder text shown while a completion is in flight.

use rand::seq::SliceRandom;

const EMPTY_PLACEHOLDER: &str = "...";

/// Chooses one phrase from a list.
pub trait PlaceholderPicker: Send + Sync {
    fn pick<'a>(&self, phrases: &'a [String]) -> Option<&'a str>;
}

/// Uniform random choice.
pub struct RandomPicker;

impl PlaceholderPicker for RandomPicker {
    fn pick<'a>(&self, phrases: &'a [String]) -> Option<&'a str> {
        phrases.choose(&mut rand::thread_rng()).map(String::as_str)
    }
}

/// Always the phrase at a given index (wrapping), for deterministic tests.
pub struct FixedPicker(pub usize);

impl PlaceholderPicker for FixedPicker {
    fn pick<'a>(&self, phrases: &'a [String]) -> Option<&'a str> {
        if phrases.is_empty() {
            return None;
        }
        Some(phrases[self.0 % phrases.len()].as_str())
    }
}

pub struct Placeholders {
    phrases: Vec<String>,
    picker: Box<dyn PlaceholderPicker>,
}

impl Placeholders {
    pub fn new(phrases: Vec<String>, picker: impl PlaceholderPicker + 'static) -> Self {
        Self {
            phrases,
            picker: Box::new(picker),
        }
    }

    pub fn random(phrases: Vec<String>) -> Self {
        Self::new(phrases, RandomPicker)
    }

    /// Next placeholder; `"..."` when no phrases are configured.
    pub fn next(&self) -> &str {
        self.picker.pick(&self.phrases).unwrap_or(EMPTY_PLACEHOLDER)
    }
}
