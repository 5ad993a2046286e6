//! Availability parsing.
//!
//! Turns a [`RawDocument`] into an [`AvailabilityRecord`]. Two document shapes
//! are understood, chosen by content type:
//!
//! - structured API payloads (JSON with an `availability` object), judged by
//!   a strict four-flag rule
//! - rendered product pages (HTML), judged by configurable phrase heuristics
//!   and the state of the purchase button
//!
//! The two policies are never mixed for one document.

mod config;
pub mod html;
mod markup;
mod structured;

pub use config::ParserConfig;

use crate::app::{ReupError, Result};
use crate::domain::AvailabilityRecord;
use crate::fetcher::RawDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    Structured,
    Markup,
}

impl DocumentShape {
    /// Decide from the `Content-Type` header, sniffing the body only when the
    /// header is missing or unhelpful.
    pub fn detect(doc: &RawDocument) -> Option<Self> {
        if let Some(content_type) = &doc.content_type {
            let media = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if media.ends_with("/json") || media.ends_with("+json") {
                return Some(Self::Structured);
            }
            if media.ends_with("/html") || media.ends_with("/xhtml+xml") {
                return Some(Self::Markup);
            }
        }

        match doc.body.trim_start().chars().next() {
            Some('{') => Some(Self::Structured),
            Some('<') => Some(Self::Markup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn parse(&self, doc: &RawDocument) -> Result<AvailabilityRecord> {
        match DocumentShape::detect(doc) {
            Some(DocumentShape::Structured) => structured::parse_structured(doc),
            Some(DocumentShape::Markup) => markup::parse_markup(doc, &self.config),
            None => Err(ReupError::ParseFailure(format!(
                "unrecognized document from {} ({})",
                doc.url,
                doc.content_type.as_deref().unwrap_or("no content type")
            ))),
        }
    }
}
