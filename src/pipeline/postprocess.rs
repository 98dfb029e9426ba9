//! Post-processing: pull the JSON document out of raw model output.
//!
//! Models asked for "only JSON" still wrap it in ` ```json ` fences, lead
//! with a sentence of prose, or emit a byte-order mark. These passes are
//! deterministic string rules applied before deserialization; they never
//! rewrite the JSON itself.
//!
//! ## Rule Order
//!
//! Invisible characters go first so the fence regex sees a clean start of
//! input. The object-span fallback runs last, only when the fenced or
//! trimmed text still does not start with `{`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule and return the candidate JSON text.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (BOM, zero-width spaces)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip outer code fences, with or without a `json` tag
/// 4. Fall back to the outermost `{ … }` span when prose surrounds it
pub fn extract_json_text(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = normalise_line_endings(&s);
    let s = strip_code_fences(&s);
    outermost_object(&s).to_string()
}

// ── Rule 1: Invisible characters ─────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'))
        .collect()
}

// ── Rule 2: Line endings ─────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Outer fences ─────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:json|JSON)?[ \t]*\n(.*?)\n?```\s*$").unwrap());

/// Fence anywhere in the text, for answers that lead with prose.
static RE_INNER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\n(.*?)\n?```").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input) {
        return caps[1].trim().to_string();
    }
    let trimmed = input.trim();
    if !trimmed.starts_with('{') {
        if let Some(caps) = RE_INNER_FENCE.captures(trimmed) {
            return caps[1].trim().to_string();
        }
    }
    trimmed.to_string()
}

// ── Rule 4: Outermost object ─────────────────────────────────────────────────

fn outermost_object(input: &str) -> &str {
    if input.starts_with('{') {
        return input;
    }
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => &input[start..=end],
        _ => input,
    }
}
