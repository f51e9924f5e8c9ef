use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Equipment, PageText};
use crate::parser::rules::TagRule;

/// `<prefix>-<number>[suffix][/train]`, e.g. `P-10001A/B`.
static EQUIPMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{1,3})-(\d{4,5}[A-Z]?(?:/[A-Z])?)\b").unwrap());

/// Document and reference codes that share the tag shape.
const NOISE_PREFIXES: &[&str] = &[
    "PID", "DWG", "REV", "REF", "ISO", "TAG", "SHT", "CHT", "PRC", "DRG", "DOC", "JOB", "PKG",
    "SYS", "GEN", "ENG", "PRO",
];

const EQUIPMENT_TYPES: &[(&str, &str)] = &[
    ("V", "Vessel"),
    ("E", "Heat Exchanger"),
    ("P", "Pump"),
    ("C", "Compressor"),
    ("T", "Tower"),
    ("D", "Drum"),
    ("F", "Furnace"),
    ("R", "Reactor"),
    ("AE", "Air Exchanger"),
    ("AD", "Air Dryer"),
    ("AG", "Agitator"),
    ("BL", "Blower"),
    ("EJ", "Ejector"),
    ("FI", "Filter"),
    ("HT", "Heater"),
    ("MX", "Mixer"),
    ("ST", "Stack"),
    ("TK", "Tank"),
];

pub static EQUIPMENT_RULE: TagRule = TagRule {
    pattern: &EQUIPMENT_RE,
    noise: NOISE_PREFIXES,
    classes: EQUIPMENT_TYPES,
    fallback: "Unknown",
    max_unmapped_len: Some(2),
};

pub fn extract(pages: &[PageText]) -> Vec<Equipment> {
    EQUIPMENT_RULE
        .scan(pages)
        .into_iter()
        .map(|hit| Equipment {
            tag_no: hit.tag,
            equip_type: hit.class,
            source_pages: hit.pages,
            unit_id: None,
        })
        .collect()
}
