//! JSON compile report.

use pins_codegen::{Image, ListingLine};
use pins_layout::Layout;
use pins_types::mem::Frame;
use pins_types::PinsError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Activation-record summary of one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub name: String,
    pub depth: u32,
    pub pars_size: i32,
    pub vars_size: i32,
}

impl From<&Frame> for FrameSummary {
    fn from(frame: &Frame) -> Self {
        Self {
            name: frame.name.clone(),
            depth: frame.depth,
            pars_size: frame.pars_size,
            vars_size: frame.vars_size,
        }
    }
}

/// Outcome of compiling one program, serialisable for hosts and tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    pub success: bool,
    /// Frames sorted by label.
    #[serde(default)]
    pub frames: Vec<FrameSummary>,
    #[serde(default)]
    pub code_size: i32,
    #[serde(default)]
    pub data_size: i32,
    #[serde(default)]
    pub listing: Vec<ListingLine>,
    #[serde(default)]
    pub errors: Vec<PinsError>,
    /// SHA-256 of the program listing, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
}

impl CompileResult {
    pub(crate) fn failure(error: PinsError) -> Self {
        Self {
            success: false,
            frames: Vec::new(),
            code_size: 0,
            data_size: 0,
            listing: Vec::new(),
            errors: vec![error],
            image_hash: None,
        }
    }

    pub(crate) fn success(layout: &Layout, image: &Image) -> Self {
        let mut frames: Vec<FrameSummary> = layout
            .frames()
            .map(|(_, frame)| FrameSummary::from(&**frame))
            .collect();
        frames.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            success: true,
            frames,
            code_size: image.code_size(),
            data_size: image.data_size(),
            listing: image.listing(),
            errors: Vec::new(),
            image_hash: Some(image_hash(image)),
        }
    }

    /// Serialise to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// SHA-256 of the textual listing. Equal programs give equal hashes.
pub fn image_hash(image: &Image) -> String {
    format!("{:x}", Sha256::digest(image.listing_text().as_bytes()))
}
