//! Hook handlers: turn a resolved hook and its files into process runs.

mod command;

pub use command::CommandHandler;

use thiserror::Error;

use crate::result::FailureKind;

/// Upper bound on the summed length of all arguments in one invocation.
pub const MAX_BATCH_BYTES: usize = 64 * 1024;

/// Errors from building an invocation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The entry string is empty or has unbalanced quotes.
    #[error("invalid entry '{entry}': {message}")]
    InvalidEntry {
        /// The entry text.
        entry: String,
        /// What is wrong.
        message: &'static str,
    },
}

/// Result type for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// What running a hook against its files produced.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// First failure across all batches, `None` when every batch passed.
    pub failure: Option<FailureKind>,
    /// Combined output of every batch, in order.
    pub output: String,
    /// Number of processes started.
    pub batches: usize,
}

/// Split an entry string into words.
///
/// Whitespace separates words. Single quotes keep everything literal,
/// double quotes allow `\"` and `\\` escapes, and a backslash outside quotes
/// escapes the next character.
///
/// # Errors
///
/// Returns [`HandlerError::InvalidEntry`] for an unterminated quote or a
/// trailing backslash.
pub fn split_words(entry: &str) -> HandlerResult<Vec<String>> {
    let invalid = |message| HandlerError::InvalidEntry {
        entry: entry.to_string(),
        message,
    };

    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = entry.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            },
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(invalid("unterminated single quote")),
                    }
                }
            },
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            },
                            None => return Err(invalid("unterminated double quote")),
                        },
                        Some(c) => current.push(c),
                        None => return Err(invalid("unterminated double quote")),
                    }
                }
            },
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(invalid("trailing backslash")),
                }
            },
            c => {
                in_word = true;
                current.push(c);
            },
        }
    }
    if in_word {
        words.push(current);
    }
    if words.is_empty() {
        return Err(invalid("entry is empty"));
    }
    Ok(words)
}

/// Bytes a set of command words takes on a command line, one separator each.
#[must_use]
pub fn command_bytes<'a, S>(words: impl IntoIterator<Item = &'a S>) -> usize
where
    S: AsRef<str> + ?Sized + 'a,
{
    words
        .into_iter()
        .map(|w| w.as_ref().len().saturating_add(1))
        .fold(0, usize::saturating_add)
}

/// Partition files into batches whose summed length (plus one separator per
/// file) stays under `limit`. A file longer than `limit` gets a batch of its
/// own. Order is preserved.
#[must_use]
pub fn partition<'a>(files: &[&'a str], limit: usize) -> Vec<Vec<&'a str>> {
    let mut batches = Vec::new();
    let mut current: Vec<&'a str> = Vec::new();
    let mut size = 0usize;

    for file in files {
        let cost = file.len().saturating_add(1);
        if !current.is_empty() && size.saturating_add(cost) > limit {
            batches.push(std::mem::take(&mut current));
            size = 0;
        }
        current.push(file);
        size = size.saturating_add(cost);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
