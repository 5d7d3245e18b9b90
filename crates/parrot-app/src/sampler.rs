use parrot_core::error::SampleError;
use parrot_core::preprocess::{DefaultPreprocessor, Preprocessor};
use parrot_core::sample::{Sample, VisibilitySampler};

/// Latest visible text reported by the attached page
#[derive(Default)]
pub struct PageSampler {
    text: Option<String>,
    preprocessor: DefaultPreprocessor,
}

impl PageSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, text: String) {
        self.text = Some(text);
    }

    /// No document until the page reports visible text again
    pub fn clear(&mut self) {
        self.text = None;
    }

    /// Visible words suitable for word selection
    pub fn selection_context(&self, max_words: usize) -> String {
        self.text
            .as_deref()
            .map(|text| self.preprocessor.selection_context(text, max_words))
            .unwrap_or_default()
    }
}

impl VisibilitySampler for PageSampler {
    fn sample(&self) -> Result<Sample, SampleError> {
        let text = self.text.as_deref().ok_or(SampleError::NoDocument)?;
        Ok(self.preprocessor.tokenize(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_document_until_text_arrives() {
        let mut sampler = PageSampler::new();
        assert!(matches!(sampler.sample(), Err(SampleError::NoDocument)));

        sampler.update("Der schnelle braune Fuchs".into());
        assert_eq!(sampler.sample().unwrap().len(), 4);
        assert_eq!(sampler.selection_context(2), "Der schnelle");

        sampler.clear();
        assert!(matches!(sampler.sample(), Err(SampleError::NoDocument)));
        assert_eq!(sampler.selection_context(10), "");
    }
}
