use crate::config::render::RenderConfig;
use crate::foundation::error::{WyrError, WyrResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where an option image comes from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    /// Encoded image bytes delivered with the request.
    Uploaded {
        /// Encoded bytes (PNG, JPEG, ...), serialized as a byte array.
        bytes: Arc<Vec<u8>>,
    },
    /// Image file on disk.
    Referenced {
        /// File path.
        path: PathBuf,
    },
}

impl ImageSource {
    /// Wrap uploaded bytes.
    pub fn uploaded(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Uploaded {
            bytes: Arc::new(bytes.into()),
        }
    }

    /// Reference a file on disk.
    pub fn referenced(path: impl Into<PathBuf>) -> Self {
        Self::Referenced { path: path.into() }
    }

    /// Load the encoded bytes.
    pub fn load(&self) -> WyrResult<Arc<Vec<u8>>> {
        match self {
            Self::Uploaded { bytes } => Ok(bytes.clone()),
            Self::Referenced { path } => std::fs::read(path).map(Arc::new).map_err(|e| {
                WyrError::decode(format!("failed to read image '{}': {e}", path.display()))
            }),
        }
    }

    fn check_present(&self, which: &str) -> WyrResult<()> {
        match self {
            Self::Uploaded { bytes } if bytes.is_empty() => Err(WyrError::validation(format!(
                "{which} image upload is empty"
            ))),
            Self::Referenced { path } if path.as_os_str().is_empty() => Err(
                WyrError::validation(format!("{which} image path is empty")),
            ),
            _ => Ok(()),
        }
    }
}

/// One would-you-rather option.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptionInput {
    /// Option picture.
    pub image: ImageSource,
    /// Option caption.
    pub caption: String,
}

/// How result percentages are obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PercentageSpec {
    /// Generate a random complementary pair.
    Auto,
    /// Use caller-provided values; they must add up to 100.
    Manual {
        /// Upper option percentage.
        value1: u8,
        /// Lower option percentage.
        value2: u8,
    },
}

/// Narration options.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NarrationSpec {
    /// Synthesize a spoken narration track.
    pub enabled: bool,
    /// Fail the job if narration cannot be synthesized.
    pub required: bool,
    /// Engine-specific voice identifier.
    pub voice: Option<String>,
}

/// Declarative description of one video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoRequest {
    /// Upper option.
    pub upper: OptionInput,
    /// Lower option.
    pub lower: OptionInput,
    /// Results overlay, if any.
    #[serde(default)]
    pub percentages: Option<PercentageSpec>,
    /// Narration, if any.
    #[serde(default)]
    pub narration: Option<NarrationSpec>,
    /// Per-request render config; the orchestrator default is used when absent.
    #[serde(default)]
    pub render: Option<RenderConfig>,
}

impl VideoRequest {
    /// Build a request with two options and no extras.
    pub fn new(upper: OptionInput, lower: OptionInput) -> Self {
        Self {
            upper,
            lower,
            percentages: None,
            narration: None,
            render: None,
        }
    }

    /// Parse a request from a JSON file on disk.
    ///
    /// Relative image paths are resolved against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> WyrResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            WyrError::validation(format!("open request JSON '{}': {e}", path.display()))
        })?;
        let mut req: VideoRequest = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| WyrError::serde(format!("parse request JSON: {e}")))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for opt in [&mut req.upper, &mut req.lower] {
            if let ImageSource::Referenced { path } = &mut opt.image
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        }
        Ok(req)
    }

    /// Whether narration was asked for.
    pub fn narration_enabled(&self) -> bool {
        self.narration.as_ref().is_some_and(|n| n.enabled)
    }

    /// Cheap synchronous validation run before a job is accepted.
    ///
    /// Image decoding is deferred to the job; this only checks what can be checked without
    /// touching pixel data.
    pub fn validate(&self) -> WyrResult<()> {
        for (which, opt) in [("upper", &self.upper), ("lower", &self.lower)] {
            if opt.caption.trim().is_empty() {
                return Err(WyrError::validation(format!("{which} caption is empty")));
            }
            opt.image.check_present(which)?;
        }
        if let Some(spec) = self.percentages {
            crate::results::percentages::validate_spec(spec)?;
        }
        if let Some(cfg) = &self.render {
            cfg.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/request/model.rs"]
mod tests;
