use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DrawingMetadata, PageSet, PageText};
use crate::parser::rules::Accumulator;

/// `<site>-<discipline>-<unit>-<tag>-PID-<sheet>[-<sub>]`, e.g. `A8RX-CHT-2000-PRC-PID-001`.
static DRAWING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z0-9]{2,6}-[A-Z]{2,4}-(\d{4})-[A-Z]{2,4}-PID-(\d{3})(?:-(\d{2}))?").unwrap()
});

static REVISION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bISSUED\s+FOR\s+(\w+)(?:\s*\(([^)]+)\))?|\bREV(?:ISION)?(?:\.\s*|\s*:\s*|\s+)([A-Z0-9]{1,3})\b",
    )
    .unwrap()
});

static REV_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2}[-/][A-Z]{3}[-/]\d{2,4})\b").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataResult {
    pub drawings: Vec<DrawingMetadata>,
    /// Distinct unit codes, sorted.
    pub unit_codes: Vec<String>,
    /// Page → unit code of the drawing governing that page.
    pub page_units: BTreeMap<u32, String>,
}

/// Byte spans of every drawing number in `text`.
pub fn drawing_spans(text: &str) -> Vec<Range<usize>> {
    DRAWING_RE.find_iter(text).map(|m| m.range()).collect()
}

struct DrawingAcc {
    drawing_no: String,
    unit_code: String,
    revision: Option<String>,
    rev_date: Option<String>,
    pages: PageSet,
}

/// The first drawing number on a page governs it; revision and date found
/// there go to that drawing, first value wins.
pub fn extract(pages: &[PageText]) -> MetadataResult {
    let mut acc: Accumulator<DrawingAcc> = Accumulator::new();
    let mut page_units = BTreeMap::new();

    for page in pages {
        let Some(caps) = DRAWING_RE.captures(&page.raw_text) else {
            continue;
        };
        let drawing_no = caps[0].to_string();
        let unit_code = caps[1].to_string();
        page_units.insert(page.page_number, unit_code.clone());

        let drawing = acc.entry(&drawing_no, || DrawingAcc {
            drawing_no: drawing_no.clone(),
            unit_code,
            revision: None,
            rev_date: None,
            pages: PageSet::new(),
        });
        drawing.pages.insert(page.page_number);

        if drawing.revision.is_none() {
            drawing.revision = find_revision(&page.raw_text);
        }
        if drawing.rev_date.is_none() {
            drawing.rev_date = REV_DATE_RE
                .captures(&page.raw_text)
                .map(|c| c[1].to_string());
        }
    }

    let drawings: Vec<DrawingMetadata> = acc
        .into_vec()
        .into_iter()
        .filter_map(|d| {
            let page_start = *d.pages.first()?;
            let page_end = *d.pages.last()?;
            Some(DrawingMetadata {
                drawing_no: d.drawing_no,
                unit_code: d.unit_code,
                title: None,
                revision: d.revision,
                rev_date: d.rev_date,
                page_start,
                page_end,
            })
        })
        .collect();

    let unit_codes: BTreeSet<String> = drawings.iter().map(|d| d.unit_code.clone()).collect();

    MetadataResult {
        drawings,
        unit_codes: unit_codes.into_iter().collect(),
        page_units,
    }
}

fn find_revision(text: &str) -> Option<String> {
    let caps = REVISION_RE.captures(text)?;
    caps.get(3)
        .or_else(|| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}
