use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Codes given on the command line, in config files and in spreadsheet headers
/// are resolved here. Prompts use English language names, so every code the
/// tool accepts must map to one.

/// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Chinese language names accepted as column headers, with their ISO 639-1 code
const CHINESE_NAMES: &[(&str, &str)] = &[
    ("中文", "zh"),
    ("英语", "en"),
    ("法语", "fr"),
    ("德语", "de"),
    ("西班牙语", "es"),
    ("意大利语", "it"),
    ("日语", "ja"),
    ("韩语", "ko"),
    ("俄语", "ru"),
    ("葡萄牙语", "pt"),
    ("阿拉伯语", "ar"),
    ("荷兰语", "nl"),
    ("波兰语", "pl"),
    ("土耳其语", "tr"),
    ("瑞典语", "sv"),
    ("丹麦语", "da"),
    ("芬兰语", "fi"),
    ("希腊语", "el"),
    ("捷克语", "cs"),
    ("匈牙利语", "hu"),
    ("罗马尼亚语", "ro"),
    ("保加利亚语", "bg"),
    ("印尼语", "id"),
    ("泰语", "th"),
    ("越南语", "vi"),
];

/// Resolve a language code (2 or 3 letters), English name or native name
pub fn resolve_language(input: &str) -> Result<Language> {
    let normalized = input.trim().to_lowercase();

    let found = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == normalized)
                .map(|(_, terminology)| *terminology)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(part2t)
        }
        _ => None,
    };

    found
        .or_else(|| Language::from_name(input.trim()))
        .or_else(|| Language::from_name(&capitalize(&normalized)))
        .or_else(|| resolve_native_name(input.trim(), &normalized))
        .ok_or_else(|| anyhow!("Invalid language code: {}", input))
}

/// Autonyms such as `français` or `Deutsch`, then the Chinese names table
fn resolve_native_name(trimmed: &str, normalized: &str) -> Option<Language> {
    Language::from_autonym(trimmed)
        .or_else(|| Language::from_autonym(normalized))
        .or_else(|| Language::from_autonym(&capitalize(normalized)))
        .or_else(|| {
            CHINESE_NAMES
                .iter()
                .find(|(name, _)| *name == trimmed)
                .and_then(|(_, code)| Language::from_639_1(code))
        })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    Ok(resolve_language(code)?.to_639_3().to_string())
}

/// Normalize to ISO 639-1 if the language has one, else ISO 639-2/T
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let language = resolve_language(code)?;
    Ok(language
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| language.to_639_3().to_string()))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (resolve_language(code1), resolve_language(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    Ok(resolve_language(code)?.to_name().to_string())
}

/// English name for prompts, falling back to the raw input for unknown codes
pub fn language_display_name(code: &str) -> String {
    get_language_name(code).unwrap_or_else(|_| code.trim().to_string())
}

/// Whether a spreadsheet header names the given language.
///
/// Headers match by code, English name, autonym or Chinese name, ignoring
/// case and surrounding whitespace.
pub fn header_matches_language(header: &str, language: &str) -> bool {
    let header = header.trim();
    if header.is_empty() {
        return false;
    }
    if header.eq_ignore_ascii_case(language.trim()) {
        return true;
    }
    language_codes_match(header, language)
}
