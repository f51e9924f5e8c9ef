use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{PageSet, PageText};

/// Keyed accumulation for one extraction call. Keeps first-seen order.
pub struct Accumulator<T> {
    index: HashMap<String, usize>,
    items: Vec<T>,
}

impl<T> Default for Accumulator<T> {
    fn default() -> Self {
        Accumulator {
            index: HashMap::new(),
            items: Vec::new(),
        }
    }
}

impl<T> Accumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Existing entry for `key`, or a fresh one built by `make`.
    pub fn entry(&mut self, key: &str, make: impl FnOnce() -> T) -> &mut T {
        let idx = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.items.push(make());
                let i = self.items.len() - 1;
                self.index.insert(key.to_string(), i);
                i
            }
        };
        &mut self.items[idx]
    }

    /// Inserts only if `key` is unseen. Returns whether it was inserted.
    pub fn insert_first(&mut self, key: &str, item: T) -> bool {
        if self.contains(key) {
            return false;
        }
        self.index.insert(key.to_string(), self.items.len());
        self.items.push(item);
        true
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

/// A tag grammar plus the data that filters and classifies its matches.
///
/// `pattern` must capture the letter code as group 1 and the numeric part as
/// group 2; the tag is rebuilt as `<code>-<number>`.
pub struct TagRule {
    pub pattern: &'static LazyLock<Regex>,
    /// Codes that match the grammar but are never tags.
    pub noise: &'static [&'static str],
    /// Code → category.
    pub classes: &'static [(&'static str, &'static str)],
    /// Label used as `"<label> (<code>)"` for unmapped codes.
    pub fallback: &'static str,
    /// Unmapped codes longer than this are dropped instead of labelled.
    pub max_unmapped_len: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHit {
    pub tag: String,
    pub class: String,
    pub pages: PageSet,
}

impl TagRule {
    /// `None` means the code is noise.
    pub fn classify(&self, code: &str) -> Option<String> {
        if self.noise.contains(&code) {
            return None;
        }
        if let Some((_, class)) = self.classes.iter().find(|(c, _)| *c == code) {
            return Some(class.to_string());
        }
        match self.max_unmapped_len {
            Some(max) if code.len() > max => None,
            _ => Some(format!("{} ({})", self.fallback, code)),
        }
    }

    /// Run the rule over every page, merging repeat sightings by tag.
    pub fn scan(&self, pages: &[PageText]) -> Vec<TagHit> {
        let mut acc: Accumulator<TagHit> = Accumulator::new();
        for page in pages {
            for caps in self.pattern.captures_iter(&page.raw_text) {
                let code = &caps[1];
                let Some(class) = self.classify(code) else {
                    continue;
                };
                let tag = format!("{}-{}", code, &caps[2]);
                acc.entry(&tag, || TagHit {
                    tag: tag.clone(),
                    class,
                    pages: PageSet::new(),
                })
                .pages
                .insert(page.page_number);
            }
        }
        acc.into_vec()
    }
}
