use std::collections::HashSet;

use crate::error::SampleError;

/// Bag of words read from the visible document region at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    words: Vec<String>,
}

impl Sample {
    pub fn new(words: impl IntoIterator<Item = String>) -> Self {
        Self {
            words: words.into_iter().filter(|w| !w.is_empty()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Words of `self` that do not occur anywhere in `previous`, duplicates included
    pub fn count_new_against(&self, previous: &Sample) -> usize {
        let seen: HashSet<&str> = previous.words.iter().map(String::as_str).collect();
        self.words
            .iter()
            .filter(|w| !seen.contains(w.as_str()))
            .count()
    }
}

/// Source of visibility samples, provided by whatever owns the document
pub trait VisibilitySampler: Send + Sync {
    fn sample(&self) -> Result<Sample, SampleError>;
}
