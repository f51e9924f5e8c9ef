use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::model::{LineStatus, PageSet, PageText, PipeLine};
use crate::parser::metadata::drawing_spans;
use crate::parser::rules::Accumulator;

const MAX_SIZE: u32 = 60;
const MAX_SERVICE_LEN: usize = 4;

/// Tolerates OCR'd inch marks, a missing hyphen after the size and a spec
/// class set off by whitespace only (`6"-CW-1234 A1B2`).
static LINE_PRIMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d{1,2})\s*["'”″]\s*-?\s*([A-Z]{1,4})\s*-\s*(\d{3,5})(?:\s*-?\s*([A-Z0-9]{2,10}))?"#)
        .unwrap()
});

/// Inch mark right after the size and hyphens on every segment. Never takes
/// a following word as the spec class.
static LINE_STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d{1,2})["']\s*-\s*([A-Z]{1,4})\s*-\s*(\d{3,5})(?:\s*-\s*([A-Z0-9]{2,10}))?"#)
        .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineId {
    pub size: String,
    pub service: String,
    pub number: String,
    pub spec: Option<String>,
}

impl LineId {
    fn from_captures(caps: &Captures) -> Self {
        LineId {
            size: caps[1].to_string(),
            service: caps[2].to_string(),
            number: caps[3].to_string(),
            spec: caps.get(4).map(|m| m.as_str().to_string()),
        }
    }

    pub fn nominal_size(&self) -> String {
        format!("{}\"", self.size)
    }

    /// Canonical key used for dedup.
    pub fn canonical(&self) -> String {
        match &self.spec {
            Some(spec) => format!("{}\"-{}-{}-{}", self.size, self.service, self.number, spec),
            None => format!("{}\"-{}-{}", self.size, self.service, self.number),
        }
    }

    fn is_plausible(&self) -> bool {
        let size_ok = matches!(self.size.parse::<u32>(), Ok(n) if n > 0 && n <= MAX_SIZE);
        size_ok && self.service.len() <= MAX_SERVICE_LEN
    }
}

/// Line-shaped tokens in `text`, in order of appearance, without size or
/// drawing-number checks. Used for golden joint annotations.
pub fn loose_line_ids(text: &str) -> Vec<LineId> {
    LINE_STRICT_RE
        .captures_iter(text)
        .map(|c| LineId::from_captures(&c))
        .collect()
}

/// `<size>"-<service>-<number>[-<spec>]`. The strict grammar only adds hits
/// starting where the primary one found nothing, e.g. a line whose size the
/// primary took as the previous spec.
pub fn extract(pages: &[PageText]) -> Vec<PipeLine> {
    let mut acc: Accumulator<PipeLine> = Accumulator::new();

    for page in pages {
        let text = &page.raw_text;
        let drawings = drawing_spans(text);

        let primary: Vec<Captures> = LINE_PRIMARY_RE.captures_iter(text).collect();
        let starts: HashSet<usize> = primary
            .iter()
            .filter_map(|c| c.get(0))
            .map(|m| m.start())
            .collect();
        let strict = LINE_STRICT_RE
            .captures_iter(text)
            .filter(|c| c.get(0).is_some_and(|m| !starts.contains(&m.start())));

        for caps in primary.into_iter().chain(strict) {
            let span = caps.get(0).map(|m| m.range()).unwrap_or_default();
            if overlaps_any(&span, &drawings) {
                continue;
            }
            let id = LineId::from_captures(&caps);
            if !id.is_plausible() {
                continue;
            }
            let key = id.canonical();
            acc.entry(&key, || PipeLine {
                line_number: key.clone(),
                nominal_size: id.nominal_size(),
                service_code: id.service.clone(),
                spec_class: id.spec.clone(),
                source_pages: PageSet::new(),
                status: LineStatus::Extracted,
                unit_id: None,
            })
            .source_pages
            .insert(page.page_number);
        }
    }

    acc.into_vec()
}

fn overlaps_any(span: &Range<usize>, others: &[Range<usize>]) -> bool {
    others.iter().any(|o| span.start < o.end && o.start < span.end)
}
