//! Tool-resource categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Functional grouping under which an attachment is made available to the
/// downstream agent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Indexed for retrieval-augmented search.
    Search,
    /// Available to the code execution sandbox.
    CodeExecution,
    /// Available to image editing tools.
    ImageEdit,
    /// Queued for text extraction (OCR).
    TextExtraction,
}

impl ResourceCategory {
    /// Wire name used in persisted tool-resource maps and upload forms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::CodeExecution => "code_execution",
            Self::ImageEdit => "image_edit",
            Self::TextExtraction => "text_extraction",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "search" => Ok(Self::Search),
            "code_execution" => Ok(Self::CodeExecution),
            "image_edit" => Ok(Self::ImageEdit),
            "text_extraction" => Ok(Self::TextExtraction),
            other => Err(Error::InvalidInput(format!(
                "Unknown resource category: {other}"
            ))),
        }
    }
}
