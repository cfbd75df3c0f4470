//! Document-level language identification.
//!
//! Detection runs once per document on the full extracted text; the resulting
//! ISO-639-1 code is attached to every chunk of that document. Texts too short
//! for statistical identification default to English.

/// Minimum trimmed length before statistical detection is attempted.
const MIN_DETECTABLE_CHARS: usize = 10;

/// Fallback code used for short, undetermined, or unmapped input.
const FALLBACK: &str = "en";

/// Identify the dominant language of `text`, returning an ISO-639-1 code.
///
/// Texts shorter than 10 characters after trimming skip detection and return
/// `"en"`. Detection output (ISO-639-3) is mapped through a fixed table;
/// languages outside the table also fall back to `"en"`.
pub fn detect_language(text: &str) -> &'static str {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_DETECTABLE_CHARS {
        return FALLBACK;
    }

    match whatlang::detect(trimmed) {
        Some(info) => iso639_1(info.lang().code()).unwrap_or(FALLBACK),
        None => FALLBACK,
    }
}

/// Map an ISO-639-3 code to ISO-639-1 for the languages this service stores.
fn iso639_1(code: &str) -> Option<&'static str> {
    let mapped = match code {
        "eng" => "en",
        "spa" => "es",
        "fra" => "fr",
        "deu" => "de",
        "ita" => "it",
        "por" => "pt",
        "rus" => "ru",
        "jpn" => "ja",
        "kor" => "ko",
        "cmn" => "zh",
        "ara" => "ar",
        "hin" => "hi",
        "ben" => "bn",
        "nld" => "nl",
        "swe" => "sv",
        "nob" => "no",
        "dan" => "da",
        "fin" => "fi",
        "pol" => "pl",
        "ces" => "cs",
        "slk" => "sk",
        "hun" => "hu",
        "ron" => "ro",
        "bul" => "bg",
        "ell" => "el",
        "tur" => "tr",
        "heb" => "he",
        "tha" => "th",
        "vie" => "vi",
        "ind" => "id",
        "ukr" => "uk",
        "cat" => "ca",
        "hrv" => "hr",
        "srp" => "sr",
        "lit" => "lt",
        "lav" => "lv",
        "est" => "et",
        _ => return None,
    };
    Some(mapped)
}
