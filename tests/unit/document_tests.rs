/*!
 * Tests for spreadsheet and subtitle document adapters
 */

use lingobatch::document::{load_reference_map, DocumentAdapter, Spreadsheet, SubtitleDocument, SubtitleFormat};
use lingobatch::errors::DocumentError;

use crate::common::{create_temp_dir, create_test_file, create_test_subtitle};

#[test]
fn test_fromPath_withBom_shouldMatchFirstHeader() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "bom.csv", "\u{feff}English,French\nHello,\n").unwrap();

    let sheet = Spreadsheet::from_path(&path).unwrap();
    assert_eq!(sheet.source_column("en").unwrap(), 0);
    assert_eq!(sheet.find_column("fr"), Some(1));
}

#[test]
fn test_fromPath_withTsv_shouldRoundTripDelimiter() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "data.tsv", "en\tde\nHello, world\t\n").unwrap();

    let mut sheet = Spreadsheet::from_path(&path).unwrap();
    assert_eq!(sheet.read_cell(0, 0), Some("Hello, world"));
    sheet.write_cell(0, 1, "Hallo, Welt").unwrap();

    let out = dir.path().join("out.tsv");
    sheet.save(&out).unwrap();
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("Hello, world\tHallo, Welt"));
    assert_eq!(sheet.extension(), "tsv");
}

#[test]
fn test_loadReferenceMap_shouldKeepFirstDuplicate() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        dir.path(),
        "refs.csv",
        "English,Spanish\nHello,Hola\n Hello ,Buenas\nBye,\n,Nada\n",
    )
    .unwrap();

    let map = load_reference_map(&path, "en", "es").unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("Hello").map(String::as_str), Some("Hola"));
}

#[test]
fn test_loadReferenceMap_withoutReferenceColumn_shouldReportMissingColumn() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "refs.csv", "English\nHello\n").unwrap();

    let result = load_reference_map(&path, "en", "es");
    assert!(matches!(result, Err(DocumentError::MissingColumn(_))));
}

#[test]
fn test_subtitleFromPath_shouldPickParserFromExtension() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_subtitle(dir.path(), "movie.en.srt").unwrap();

    let document = SubtitleDocument::from_path(&path).unwrap();
    assert_eq!(document.format(), SubtitleFormat::Srt);
    assert_eq!(document.entries().len(), 3);
    assert_eq!(document.entries()[1].text, "It contains multiple entries.");
    assert_eq!(document.entries()[2].start_time_ms, 10_000);

    let unknown = create_test_file(dir.path(), "movie.vtt", "WEBVTT\n").unwrap();
    assert!(matches!(SubtitleDocument::from_path(&unknown), Err(DocumentError::Unsupported(_))));
}

#[test]
fn test_subtitleDocument_asAdapter_shouldRenderTranslatedSrt() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_subtitle(dir.path(), "movie.srt").unwrap();
    let mut document = SubtitleDocument::from_path(&path).unwrap();

    let column = document.target_column("fr").unwrap();
    assert_eq!(document.target_column("French").unwrap(), column);
    document.write_cell(0, column, "Ceci est un sous-titre de test.").unwrap();

    let rendered = String::from_utf8(document.render().unwrap()).unwrap();
    assert!(rendered.starts_with("1\n00:00:01,000 --> 00:00:04,000\nCeci est un sous-titre de test.\n\n"));
    assert!(rendered.contains("For testing purposes."));
}

#[test]
fn test_parseAss_shouldReadCentisecondTimestamps() {
    let content = "[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.50,0:00:03.00,Default,,0,0,0,,Hello\n";
    let document = SubtitleDocument::parse_ass(content).unwrap();

    assert_eq!(document.entries().len(), 1);
    assert_eq!(document.entries()[0].start_time_ms, 1_500);
    assert_eq!(document.entries()[0].end_time_ms, 3_000);
    assert_eq!(document.entries()[0].text, "Hello");
}

#[test]
fn test_fromPath_withNativeNameHeaders_shouldLocateColumns() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(dir.path(), "native.csv", "中文,Français,德语\n你好,,\n").unwrap();

    let mut sheet = Spreadsheet::from_path(&path).unwrap();
    assert_eq!(sheet.source_column("zh").unwrap(), 0);
    assert_eq!(sheet.find_column("fr"), Some(1));
    assert_eq!(sheet.target_column("German").unwrap(), 2);
    assert_eq!(sheet.headers().len(), 3);
}
