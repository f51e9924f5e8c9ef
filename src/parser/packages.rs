use std::sync::LazyLock;

use regex::Regex;

use crate::model::{PackageStatus, PageText, TestMedium, TestPackage};
use crate::parser::rules::Accumulator;

static PACKAGE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)Package\s*no\.?\s*:?\s*([\w-]+).*?Test\s*Pressure\s*:?\s*([\d.]+\s*(?:barg|bar|psig|kPa|NA)?)\s*.*?Test\s*Medium\s*:?\s*([HVPS])",
    )
    .unwrap()
});

static PACKAGE_NO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Package\s*(?:number|no|#)\.?\s*:?\s*(\w+-\w+-\w+)").unwrap()
});

static MEDIUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Test\s*Medium\s*:?\s*([HVPS])").unwrap());

static PRESSURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Test\s*Pressure\s*:?\s*([\d.]+\s*(?:barg|bar|psig|kPa|NA)?)").unwrap()
});

/// A full `Package No .. Test Pressure .. Test Medium` block per page, else a
/// bare package number with the page's first pressure and medium.
pub fn extract(pages: &[PageText]) -> Vec<TestPackage> {
    let mut acc: Accumulator<TestPackage> = Accumulator::new();

    for page in pages {
        let text = &page.raw_text;
        let mut found_block = false;

        for caps in PACKAGE_BLOCK_RE.captures_iter(text) {
            found_block = true;
            let package_no = caps[1].trim().to_string();
            let Some(medium) = TestMedium::from_code(&caps[3]) else {
                continue;
            };
            let pressure = non_empty(caps[2].trim());
            acc.insert_first(
                &package_no,
                new_package(&package_no, pressure, medium, page.page_number),
            );
        }

        if found_block {
            continue;
        }

        let medium_code = MEDIUM_RE
            .captures(text)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| TestMedium::Hydrostatic.as_str().to_string());
        let pressure = PRESSURE_RE
            .captures(text)
            .and_then(|c| non_empty(c[1].trim()));

        for caps in PACKAGE_NO_RE.captures_iter(text) {
            let package_no = caps[1].trim().to_string();
            if acc.contains(&package_no) {
                continue;
            }
            let Some(medium) = TestMedium::from_code(&medium_code) else {
                continue;
            };
            acc.insert_first(
                &package_no,
                new_package(&package_no, pressure.clone(), medium, page.page_number),
            );
        }
    }

    acc.into_vec()
}

fn new_package(
    package_no: &str,
    test_pressure: Option<String>,
    test_medium: TestMedium,
    source_page: u32,
) -> TestPackage {
    TestPackage {
        package_no: package_no.to_string(),
        system_code: system_code(package_no),
        test_pressure,
        test_medium,
        source_page,
        status: PackageStatus::Draft,
    }
}

/// Second `-` segment when it is 1-3 uppercase letters: `2000E-P-0003` → `P`.
pub fn system_code(package_no: &str) -> Option<String> {
    let code = package_no.split('-').nth(1)?;
    let is_code = !code.is_empty() && code.len() <= 3 && code.chars().all(|c| c.is_ascii_uppercase());
    is_code.then(|| code.to_string())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
