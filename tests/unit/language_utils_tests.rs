/*!
 * Tests for language code utilities
 */

use lingobatch::language_utils::{
    get_language_name, header_matches_language, language_codes_match, language_display_name,
    normalize_to_part1_or_part2t, normalize_to_part2t,
};

#[test]
fn test_normalizeToPart2t_withVariousInputs_shouldReturnTerminologyCode() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("German").unwrap(), "deu");
}

#[test]
fn test_normalizeToPart1OrPart2t_shouldPreferTwoLetterCode() {
    assert_eq!(normalize_to_part1_or_part2t("fra").unwrap(), "fr");
    assert_eq!(normalize_to_part1_or_part2t("Japanese").unwrap(), "ja");
}

#[test]
fn test_languageCodesMatch_shouldCompareAcrossStandards() {
    assert!(language_codes_match("zh", "chi"));
    assert!(language_codes_match("es", "spa"));
    assert!(!language_codes_match("es", "pt"));
    assert!(!language_codes_match("xx", "xx"));
}

#[test]
fn test_languageDisplayName_withUnknownCode_shouldFallBackToInput() {
    assert_eq!(language_display_name("ko"), "Korean");
    assert_eq!(language_display_name(" Xyzzy "), "Xyzzy");
    assert!(get_language_name("zz").is_err());
}

#[test]
fn test_headerMatchesLanguage_shouldIgnoreCaseAndForm() {
    assert!(header_matches_language("SPANISH", "es"));
    assert!(header_matches_language("deu", "German"));
    assert!(!header_matches_language("", "en"));
    assert!(!header_matches_language("Notes", "en"));
}

#[test]
fn test_headerMatchesLanguage_withNativeNames_shouldMatch() {
    assert!(header_matches_language("中文", "zh"));
    assert!(header_matches_language("Français", "fr"));
    assert!(header_matches_language(" DEUTSCH ", "German"));
    assert!(header_matches_language("西班牙语", "spa"));
    assert!(!header_matches_language("Français", "es"));
}
