/// Upper bound on characters handed to an engine in one pass.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 400;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
const CLOSING_PUNCTUATION: [char; 6] = ['.', '!', '?', ',', ';', ':'];

/// Splits text into sentence-sized chunks of at most `max_chars` characters.
///
/// Runs of `.`, `!` and `?` end a sentence and are dropped; over-long
/// sentences are word-wrapped. Every chunk ends in punctuation so engines
/// close the phrase. A single word longer than `max_chars` stays whole.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();

    for sentence in text.split(&SENTENCE_TERMINATORS[..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if sentence.chars().count() <= max_chars {
            chunks.push(ensure_punctuation(sentence));
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0;
        for word in sentence.split_whitespace() {
            let word_len = word.chars().count();
            if current.is_empty() {
                current.push_str(word);
                current_len = word_len;
            } else if current_len + word_len + 1 <= max_chars {
                current.push(' ');
                current.push_str(word);
                current_len += word_len + 1;
            } else {
                chunks.push(ensure_punctuation(&current));
                current = word.to_owned();
                current_len = word_len;
            }
        }
        if !current.is_empty() {
            chunks.push(ensure_punctuation(&current));
        }
    }

    chunks
}

fn ensure_punctuation(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.chars().last() {
        Some(c) if CLOSING_PUNCTUATION.contains(&c) => trimmed.to_owned(),
        Some(_) => format!("{trimmed},"),
        None => String::new(),
    }
}
