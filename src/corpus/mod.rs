
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{RagError, Result};

/// A single one-day class listing from the VisitJeju corpus.
///
/// The upstream feed is inconsistent about field names, so every known alias
/// is modeled as its own optional field and resolved through the accessor
/// methods. Unknown fields are kept in `extra` so listings survive a
/// build/load round trip byte-for-byte in meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "titleKo", skip_serializing_if = "Option::is_none")]
    pub title_ko: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction: Option<String>,
    #[serde(
        default,
        rename = "introductionKo",
        skip_serializing_if = "Option::is_none"
    )]
    pub introduction_ko: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sumary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alltag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadaddress: Option<String>,
    #[serde(default, rename = "addressKo", skip_serializing_if = "Option::is_none")]
    pub address_ko: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Returns the first candidate that is present and not blank, or "".
fn first_present<'a>(candidates: &[Option<&'a str>]) -> &'a str {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|value| !value.trim().is_empty())
        .unwrap_or("")
}

impl Listing {
    #[inline]
    pub fn title(&self) -> &str {
        first_present(&[self.title.as_deref(), self.title_ko.as_deref()])
    }

    #[inline]
    pub fn introduction(&self) -> &str {
        first_present(&[
            self.introduction.as_deref(),
            self.introduction_ko.as_deref(),
            self.sumary.as_deref(),
        ])
    }

    #[inline]
    pub fn tags(&self) -> &str {
        first_present(&[self.tag.as_deref(), self.alltag.as_deref()])
    }

    #[inline]
    pub fn address(&self) -> &str {
        first_present(&[
            self.address.as_deref(),
            self.roadaddress.as_deref(),
            self.address_ko.as_deref(),
        ])
    }

    /// Canonical document string used as embedding input.
    ///
    /// Labeled fields in fixed order, blank fields skipped.
    #[inline]
    pub fn document_text(&self) -> String {
        let parts = [
            ("이름", self.title()),
            ("소개", self.introduction()),
            ("태그", self.tags()),
            ("주소", self.address()),
        ];

        let lines: Vec<String> = parts
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(label, value)| format!("{label}: {value}"))
            .collect();

        lines.join("\n")
    }
}

/// Write listings as a pretty-printed JSON array, the format [`load_corpus`]
/// reads back. Korean text stays unescaped.
#[inline]
pub fn save_corpus<P: AsRef<Path>>(listings: &[Listing], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(listings)
        .map_err(|e| RagError::Corpus(format!("Failed to serialize corpus: {e}")))?;
    fs::write(path, content)?;

    debug!("Saved {} listings to {}", listings.len(), path.display());
    Ok(())
}

/// Load the corpus file: a JSON array of listings.
#[inline]
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Listing>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        RagError::Corpus(format!("Failed to read corpus file {}: {e}", path.display()))
    })?;

    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        RagError::Corpus(format!(
            "Failed to parse corpus file {}: {e}",
            path.display()
        ))
    })?;

    if !value.is_array() {
        return Err(RagError::Corpus(format!(
            "Corpus file {} must contain a top-level JSON array",
            path.display()
        )));
    }

    let listings: Vec<Listing> = serde_json::from_value(value)
        .map_err(|e| RagError::Corpus(format!("Failed to decode corpus records: {e}")))?;

    debug!("Loaded {} listings from {}", listings.len(), path.display());
    Ok(listings)
}
