//! Markdown-to-speech text cleaning.
//!
//! Chat replies arrive as markdown; speech synthesizers want flat prose.
//! [`clean_for_speech`] runs a fixed sequence of rewrites: structural
//! markdown goes first (fenced blocks before inline code, so a fence's body
//! never leaks through as "code"), then leftover markup characters, then
//! spoken substitutions for symbols, and finally whitespace and punctuation
//! normalization for natural pauses.

use regex::Regex;
use std::sync::LazyLock;

static STEPS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // HTML tags and entities
        (r"<[^>]+>", ""),
        (r"&[a-zA-Z]+;", ""),
        (r"&#?\w+;", ""),
        // Headers
        (r"(?m)^#{1,6}\s+", ""),
        // Links: keep the label, drop the URL
        (r"\[([^\]]+)\]\([^\)]+\)", "$1"),
        // Bold and italic: keep the content
        (r"\*\*([^*]+?)\*\*", "$1"),
        (r"\*([^*]+?)\*", "$1"),
        (r"__([^_]+?)__", "$1"),
        (r"_([^_]+?)_", "$1"),
        // Fenced code blocks vanish whole; inline code keeps its content
        (r"```[\s\S]*?```", ""),
        (r"`([^`]+?)`", "$1"),
        // List markers and quotes
        (r"(?m)^[-*+]\s+", ""),
        (r"(?m)^\s*\d+\.\s+", ""),
        (r"(?m)^>\s*", ""),
        // Horizontal rules
        (r"(?m)^[-_*]{3,}$", ""),
        // Leftover markup characters
        (r"[*_`~^]", ""),
        (r"[<>]", ""),
        (r"[{}]", ""),
        (r"[\[\]]", ""),
        (r"[|\\]", ""),
        (r"#+", ""),
        // Symbols a synthesizer cannot pronounce
        (r"&", " and "),
        (r"@", " at "),
        (r"%", " percent "),
        (r"\$", " dollars "),
        (r"€", " euros "),
        // Emoji
        (
            r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}\x{2600}-\x{27BF}\x{1F900}-\x{1F9FF}]",
            "",
        ),
        // Whitespace and repeated punctuation
        (r"\n+", " "),
        (r"\s+", " "),
        (r"\s*[.]{2,}\s*", ". "),
        (r"\s*[!]{2,}\s*", "! "),
        (r"\s*[?]{2,}\s*", "? "),
        // Natural pauses after sentence and clause punctuation
        (r"([.!?])\s*([A-Z])", "$1 $2"),
        (r"([,;:])", "$1 "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (Regex::new(pattern).expect("static pattern"), replacement)
    })
    .collect()
});

/// Flatten a markdown reply into synthesizer-friendly prose.
pub fn clean_for_speech(text: &str) -> String {
    let mut text = text.to_string();
    for (pattern, replacement) in STEPS.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text.trim().to_string()
}
