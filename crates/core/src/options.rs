//! Conversion options forwarded to the engine.
//!
//! Every field is optional. The orchestrator never fills in defaults: an
//! absent value is simply not passed to the engine, which applies its own.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

/// Page orientation of the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

/// Citation style for reference lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceStyle {
    Apa,
    Mla,
    Chicago,
    Harvard,
}

impl ReferenceStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apa => "apa",
            Self::Mla => "mla",
            Self::Chicago => "chicago",
            Self::Harvard => "harvard",
        }
    }
}

/// Whether images are embedded into the document or linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageHandling {
    Embed,
    Link,
}

impl ImageHandling {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embed => "embed",
            Self::Link => "link",
        }
    }
}

/// How code blocks are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeBlockStyle {
    Fenced,
    Indented,
}

impl CodeBlockStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fenced => "fenced",
            Self::Indented => "indented",
        }
    }
}

/// Formatting options for a conversion job.
///
/// Ranges mirror what the engine accepts in practice: font size in points,
/// line height as a multiplier, margins in centimetres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 8, max = 72))]
    pub font_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 128))]
    pub font_family: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.5, max = 3.0))]
    pub line_height: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub margin_top: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub margin_bottom: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub margin_left: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 10.0))]
    pub margin_right: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_toc: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_style: Option<ReferenceStyle>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_handling: Option<ImageHandling>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_block_style: Option<CodeBlockStyle>,
}

impl ConversionOptions {
    /// Validate the option ranges, mapping failures to [`CoreError::Validation`].
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(CoreError::from)
    }

    /// `true` when a table of contents was explicitly requested.
    pub fn wants_toc(&self) -> bool {
        self.generate_toc.unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
