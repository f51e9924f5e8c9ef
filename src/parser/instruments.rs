use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Instrument, PageText};
use crate::parser::rules::TagRule;

/// Measured variable, `I`, then a modifier or an alarm suffix.
static INSTRUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([TFPLSA]I(?:A[HL]|[CTRASHLV])?)-(\d{4,5})\b").unwrap());

/// Letter combinations that collide with other abbreviations on the sheet.
const NOISE_TAGS: &[&str] = &["PID", "TIC", "SIC"];

const FUNCTION_TYPES: &[(&str, &str)] = &[
    ("FI", "Flow Indicator"),
    ("FIC", "Flow Indicating Controller"),
    ("FIT", "Flow Indicating Transmitter"),
    ("TI", "Temperature Indicator"),
    ("TIC", "Temperature Indicating Controller"),
    ("TIT", "Temperature Indicating Transmitter"),
    ("PI", "Pressure Indicator"),
    ("PIC", "Pressure Indicating Controller"),
    ("PIT", "Pressure Indicating Transmitter"),
    ("LI", "Level Indicator"),
    ("LIC", "Level Indicating Controller"),
    ("LIT", "Level Indicating Transmitter"),
    ("AI", "Analyzer Indicator"),
    ("AIC", "Analyzer Indicating Controller"),
    ("AIT", "Analyzer Indicating Transmitter"),
    ("SI", "Speed Indicator"),
    ("SIC", "Speed Indicating Controller"),
    ("PIAH", "Pressure Indicator Alarm High"),
    ("PIAL", "Pressure Indicator Alarm Low"),
    ("LIAH", "Level Indicator Alarm High"),
    ("LIAL", "Level Indicator Alarm Low"),
    ("TIAH", "Temperature Indicator Alarm High"),
];

pub static INSTRUMENT_RULE: TagRule = TagRule {
    pattern: &INSTRUMENT_RE,
    noise: NOISE_TAGS,
    classes: FUNCTION_TYPES,
    fallback: "Instrument",
    max_unmapped_len: None,
};

pub fn extract(pages: &[PageText]) -> Vec<Instrument> {
    INSTRUMENT_RULE
        .scan(pages)
        .into_iter()
        .map(|hit| Instrument {
            tag_no: hit.tag,
            function_type: hit.class,
            source_pages: hit.pages,
            unit_id: None,
        })
        .collect()
}
