//! Greedy word wrapping against a pixel-width budget.
//!
//! The wrapper never measures text itself: callers pass a width function,
//! typically bound to a font and pixel size through a
//! [`TextBackend`](super::backend::TextBackend). Tests use synthetic width
//! functions.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WrapError {
    /// A single word is wider than the whole budget; the font is too large.
    #[error(
        "no valid split: word '{word}' is {width}px wide but only {max_width}px are available (character size too big)"
    )]
    NoValidSplit {
        word: String,
        width: f64,
        max_width: f64,
    },
}

/// Wrap `text` into lines no wider than `max_width` under `measure`.
///
/// Newlines are removed and the rest is split on whitespace. Each output
/// line starts as all remaining words and drops trailing words until it
/// fits. Lines are joined with `\n`. Quadratic in the word count, which is
/// fine for captions.
///
/// ```
/// # use simple_caption::imaging::wrap_text;
/// let width = |s: &str| s.chars().count() as f64 * 10.0;
/// assert_eq!(wrap_text("Hello world", 60.0, width).unwrap(), "Hello\nworld");
/// ```
pub fn wrap_text<F>(text: &str, max_width: f64, measure: F) -> Result<String, WrapError>
where
    F: Fn(&str) -> f64,
{
    let stripped = text.replace('\n', "");
    let words: Vec<&str> = stripped.split_whitespace().collect();
    let mut lines: Vec<String> = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let mut end = words.len();
        let mut candidate = words[start..end].join(" ");
        let mut width = measure(&candidate);

        while width > max_width && end - start > 1 {
            end -= 1;
            candidate = words[start..end].join(" ");
            width = measure(&candidate);
        }

        if width > max_width {
            return Err(WrapError::NoValidSplit {
                word: candidate,
                width,
                max_width,
            });
        }

        lines.push(candidate);
        start = end;
    }

    Ok(lines.join("\n"))
}
