//! Tokenization and per-text counts shared by the readability formulas.

/// Counts computed in one pass over a text blob.
///
/// All counts are zero for empty or whitespace-only input. The `*_or_one`
/// accessors guard the formula denominators so short or degenerate text
/// degrades to a defined value instead of dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    pub sentences: usize,
    pub words: usize,
    pub syllables: usize,
    /// Alphabetic characters across all words.
    pub letters: usize,
    /// Words with three or more syllables.
    pub complex_words: usize,
}

impl TextStats {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut words = 0usize;
        let mut syllables = 0usize;
        let mut letters = 0usize;
        let mut complex_words = 0usize;

        for token in text.split_whitespace() {
            let word: String = token
                .chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            words += 1;
            letters += word.chars().count();
            let s = syllable_count(&word);
            syllables += s;
            if s >= 3 {
                complex_words += 1;
            }
        }

        let sentences = if words == 0 { 0 } else { sentence_count(text) };

        Self {
            sentences,
            words,
            syllables,
            letters,
            complex_words,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    #[must_use]
    pub fn sentences_or_one(&self) -> f64 {
        cast(self.sentences.max(1))
    }

    #[must_use]
    pub fn words_or_one(&self) -> f64 {
        cast(self.words.max(1))
    }

    #[must_use]
    pub fn syllables_f(&self) -> f64 {
        cast(self.syllables)
    }

    #[must_use]
    pub fn letters_f(&self) -> f64 {
        cast(self.letters)
    }

    #[must_use]
    pub fn complex_words_f(&self) -> f64 {
        cast(self.complex_words)
    }
}

#[allow(clippy::cast_precision_loss)]
fn cast(n: usize) -> f64 {
    n as f64
}

/// Count sentence terminators, treating runs like `?!` or `...` as one.
/// Text with words but no terminator counts as one sentence.
fn sentence_count(text: &str) -> usize {
    let mut count = 0usize;
    let mut in_terminator = false;
    for c in text.chars() {
        if matches!(c, '.' | '!' | '?') {
            if !in_terminator {
                count += 1;
            }
            in_terminator = true;
        } else {
            in_terminator = false;
        }
    }
    count.max(1)
}

/// Vowel-group heuristic syllable counter.
///
/// Counts runs of vowels (`aeiouy`), drops a trailing silent `e` when the
/// word has another syllable, and floors at one. Input must be lowercase
/// alphabetic.
fn syllable_count(word: &str) -> usize {
    let chars: Vec<char> = word.chars().collect();
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');

    let mut groups = 0usize;
    let mut prev_vowel = false;
    for &c in &chars {
        let v = is_vowel(c);
        if v && !prev_vowel {
            groups += 1;
        }
        prev_vowel = v;
    }

    // Silent trailing 'e' ("make", "brave"), but keep "-le" endings ("table").
    if groups > 1 && chars.len() >= 2 {
        let last = chars[chars.len() - 1];
        let second_last = chars[chars.len() - 2];
        if last == 'e' && second_last != 'l' && !is_vowel(second_last) {
            groups -= 1;
        }
    }

    groups.max(1)
}
