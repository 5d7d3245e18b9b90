pub(crate) const SYSTEM_PROMPT: &str = "You are a helpful language professor.";

pub(crate) fn select_word(context: &str) -> String {
    format!(
        "You are an educational tool to help people learn a new language. \
         You will be given a body of text; select one word from it that is ideal \
         to learn in a new language. Output ONLY that single word, capitalized, \
         and no other text. Here is the text:\n{context}\n"
    )
}

pub(crate) fn test(word: &str, language: &str) -> String {
    format!(
        "Make a multiple choice quiz asking how to say \"{word}\" in {language}. \
         Output exactly one JSON object and nothing else, with the keys \
         option1, option2, option3, option4, correct. The four options are \
         {language} words with the first letter capitalized and no accents or \
         special characters. `correct` must equal one of the four options and be \
         the translation of \"{word}\". Optionally add option1Pronunciation .. \
         option4Pronunciation describing how each option sounds. Do not wrap the \
         JSON in code fences."
    )
}

pub(crate) fn practice(word: &str, language: &str) -> String {
    format!(
        "Create a flashcard for the word \"{word}\" translated to {language}. \
         Output exactly one JSON object and nothing else, with these keys: \
         originalWord (\"{word}\" unchanged), translatedWord (the {language} \
         translation), translatedWordPronunciation (how the translation sounds, \
         written with the spelling conventions of the original language), \
         originalWordDef (definition in the original language), exampleOriginal \
         (an example sentence in the original language), exampleTranslated (that \
         sentence in {language}), exampleTranslatedPronunciation (how the \
         translated sentence sounds, written with the original language's \
         spelling). Do not wrap the JSON in code fences."
    )
}
