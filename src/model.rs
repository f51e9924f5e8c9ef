use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Pages an entity was sighted on. Sorted and deduplicated by construction.
pub type PageSet = BTreeSet<u32>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub raw_text: String,
}

impl PageText {
    pub fn new(page_number: u32, raw_text: impl Into<String>) -> Self {
        PageText {
            page_number,
            raw_text: raw_text.into(),
        }
    }

    /// Scanned pages come back from text extraction nearly empty.
    pub fn has_text(&self) -> bool {
        self.raw_text.trim().chars().count() > 100
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawingMetadata {
    pub drawing_no: String,
    pub unit_code: String,
    pub title: Option<String>,
    pub revision: Option<String>,
    pub rev_date: Option<String>,
    pub page_start: u32,
    pub page_end: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipeLine {
    pub line_number: String,
    pub nominal_size: String,
    pub service_code: String,
    pub spec_class: Option<String>,
    pub source_pages: PageSet,
    pub status: LineStatus,
    pub unit_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Equipment {
    pub tag_no: String,
    pub equip_type: String,
    pub source_pages: PageSet,
    pub unit_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instrument {
    pub tag_no: String,
    pub function_type: String,
    pub source_pages: PageSet,
    pub unit_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestPackage {
    pub package_no: String,
    pub system_code: Option<String>,
    pub test_pressure: Option<String>,
    pub test_medium: TestMedium,
    pub source_page: u32,
    pub status: PackageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoldenJoint {
    pub source_page: u32,
    pub related_lines: Vec<String>,
    pub status: GoldenJointStatus,
    /// Package declared on the same page, if any.
    pub package_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upload {
    pub id: i64,
    pub project_id: i64,
    pub filename: String,
    pub storage_path: String,
    pub status: ParseStatus,
    pub progress: u8,
    pub error_message: Option<String>,
    pub total_pages: Option<u32>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

// ── Status enums ──

/// Declares a string-backed enum with `as_str`, `FromStr` and `Display`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => anyhow::bail!("unknown {} value: {:?}", stringify!($name), other),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(LineStatus {
    Extracted => "extracted",
    Verified => "verified",
    Modified => "modified",
});

string_enum!(PackageStatus {
    Draft => "draft",
    Ready => "ready",
    InProgress => "in_progress",
    Completed => "completed",
    Approved => "approved",
});

string_enum!(GoldenJointStatus {
    Identified => "identified",
    Welding => "welding",
    Nde => "nde",
    Pwht => "pwht",
    Approved => "approved",
});

string_enum!(ParseStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

string_enum!(
    /// Pressure test medium, stored as its single-letter code.
    TestMedium {
        Hydrostatic => "H",
        Vacuum => "V",
        Pneumatic => "P",
        Service => "S",
    }
);

impl TestMedium {
    /// Case-insensitive lookup of a one-letter medium code.
    pub fn from_code(code: &str) -> Option<Self> {
        code.trim().to_ascii_uppercase().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_codes() {
        assert_eq!(TestMedium::from_code("h"), Some(TestMedium::Hydrostatic));
        assert_eq!(TestMedium::from_code("S"), Some(TestMedium::Service));
        assert_eq!(TestMedium::from_code("X"), None);
        assert_eq!(TestMedium::Pneumatic.as_str(), "P");
    }

    #[test]
    fn status_round_trip_through_text() {
        for s in ["draft", "ready", "in_progress", "completed", "approved"] {
            assert_eq!(s.parse::<PackageStatus>().unwrap().as_str(), s);
        }
        assert!("done".parse::<ParseStatus>().is_err());
    }

    #[test]
    fn has_text_threshold() {
        assert!(!PageText::new(1, "   short   ").has_text());
        assert!(PageText::new(1, "x".repeat(101)).has_text());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&GoldenJointStatus::Identified).unwrap();
        assert_eq!(json, "\"identified\"");
    }
}
