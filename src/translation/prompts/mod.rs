/*!
 * Prompt construction and response parsing for translation requests.
 *
 * This module provides:
 * - System prompt templates
 * - The numbered batch prompt builder
 * - The numbered-list response parser
 */

pub mod templates;

pub use templates::{build_text_prompt, PromptTemplate, TranslationPromptBuilder};

/// Line break marker inside numbered prompt items
pub const LINE_BREAK: &str = "\\N";

/// Write a multi-line text as one prompt line
pub fn encode_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', LINE_BREAK)
}

/// Undo [`encode_line_breaks`] on a translation
pub fn decode_line_breaks(text: &str) -> String {
    text.replace(LINE_BREAK, "\n")
}

/// Align a numbered-list response with `expected` single-line items.
///
/// For each index `i` the first trimmed line starting with `"<i>. "` or
/// `"<i>."` supplies the translation, taken as the text after the first `.`.
/// Indices with no such line, or with nothing after the dot, yield `None`.
pub fn parse_numbered_response(response: &str, expected: usize) -> Vec<Option<String>> {
    parse_numbered_blocks(response, &vec![1; expected])
}

/// Align a numbered-list response with items spanning `line_limits[i]` lines.
///
/// After the numbered line of item `i`, up to `line_limits[i] - 1` following
/// lines are kept as continuation lines. A blank line or another numbered
/// line ends the block.
pub fn parse_numbered_blocks(response: &str, line_limits: &[usize]) -> Vec<Option<String>> {
    let lines: Vec<&str> = response.lines().map(str::trim).collect();

    line_limits
        .iter()
        .enumerate()
        .map(|(position, &limit)| {
            let prefix = format!("{}.", position + 1);
            let start = lines.iter().position(|line| line.starts_with(&prefix))?;
            let (_, first) = lines[start].split_once('.')?;

            let mut block = vec![first.trim()];
            block.extend(
                lines[start + 1..]
                    .iter()
                    .take_while(|line| !line.is_empty() && !is_numbered(line))
                    .take(limit.saturating_sub(1))
                    .copied(),
            );
            Some(block.join("\n").trim().to_string()).filter(|translation| !translation.is_empty())
        })
        .collect()
}

fn is_numbered(line: &str) -> bool {
    line.split_once('.')
        .is_some_and(|(number, _)| !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()))
}
