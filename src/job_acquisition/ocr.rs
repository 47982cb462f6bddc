// src/job_acquisition/ocr.rs
//! Screenshot text recognition for postings that cannot be fetched at all.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::OcrSettings;
use crate::error::ReasonCode;
use crate::utils::{char_len, normalize_lines};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("invalid image data: {0}")]
    InvalidImage(String),

    #[error("image is {bytes} bytes, the limit is {max}")]
    TooLarge { bytes: usize, max: usize },

    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("recognized only {chars} characters, at least {min} are required")]
    Insufficient { chars: usize, min: usize },
}

impl OcrError {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Self::InvalidImage(_) | Self::TooLarge { .. } => ReasonCode::InvalidImage,
            Self::Insufficient { .. } => ReasonCode::OcrInsufficient,
            Self::Engine(_) | Self::Timeout(_) => ReasonCode::Internal,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Insufficient { .. } => "Could not read enough text from the image. \
                Please upload a clearer screenshot or paste the job description manually."
                .to_string(),
            Self::InvalidImage(_) | Self::TooLarge { .. } => self.to_string(),
            Self::Engine(_) | Self::Timeout(_) => {
                "Text recognition failed. Please paste the job description manually.".to_string()
            }
        }
    }
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn create(&self, languages: &str) -> Result<Box<dyn OcrWorker>, OcrError>;
}

#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError>;

    async fn terminate(self: Box<Self>);
}

/// Runs the `tesseract` CLI against a scratch copy of the image.
pub struct TesseractEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(settings: &OcrSettings) -> Self {
        Self {
            binary: settings.tesseract_path.clone(),
            timeout: settings.timeout(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn create(&self, languages: &str) -> Result<Box<dyn OcrWorker>, OcrError> {
        let scratch = tempfile::Builder::new()
            .prefix("cvenom-ocr-")
            .tempdir()
            .map_err(|e| OcrError::Engine(format!("cannot create scratch dir: {}", e)))?;
        Ok(Box::new(TesseractWorker {
            binary: self.binary.clone(),
            languages: languages.to_string(),
            timeout: self.timeout,
            scratch: Some(scratch),
        }))
    }
}

pub struct TesseractWorker {
    binary: PathBuf,
    languages: String,
    timeout: Duration,
    scratch: Option<TempDir>,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, image: &[u8]) -> Result<String, OcrError> {
        let scratch = self
            .scratch
            .as_ref()
            .ok_or_else(|| OcrError::Engine("worker already terminated".to_string()))?;
        let input = scratch.path().join(format!("capture.{}", image_extension(image)));
        tokio::fs::write(&input, image)
            .await
            .map_err(|e| OcrError::Engine(format!("cannot write image: {}", e)))?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OcrError::Engine(format!("{} not found", self.binary.display()))
            } else {
                OcrError::Engine(e.to_string())
            }
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))?
            .map_err(|e| OcrError::Engine(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn terminate(mut self: Box<Self>) {
        if let Some(scratch) = self.scratch.take() {
            if let Err(e) = scratch.close() {
                warn!("Failed to remove OCR scratch dir: {}", e);
            }
        }
    }
}

/// Accepts a data URL, bare base64, or the raw image bytes.
pub fn decode_image_payload(payload: &[u8]) -> Result<Vec<u8>, OcrError> {
    if payload.is_empty() {
        return Err(OcrError::InvalidImage("empty payload".to_string()));
    }
    if sniff_format(payload).is_some() {
        return Ok(payload.to_vec());
    }

    let text = std::str::from_utf8(payload)
        .map_err(|_| OcrError::InvalidImage("unrecognized binary format".to_string()))?
        .trim();
    let encoded = match text.strip_prefix("data:") {
        Some(rest) => {
            let (_, data) = rest
                .split_once(',')
                .ok_or_else(|| OcrError::InvalidImage("malformed data URL".to_string()))?;
            data
        }
        None => text,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| OcrError::InvalidImage(format!("bad base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(OcrError::InvalidImage("empty image".to_string()));
    }
    Ok(bytes)
}

fn sniff_format(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "png"),
        (b"\xff\xd8\xff", "jpg"),
        (b"GIF87a", "gif"),
        (b"GIF89a", "gif"),
        (b"II*\x00", "tif"),
        (b"MM\x00*", "tif"),
    ];
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("webp");
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, ext)| *ext)
}

fn image_extension(bytes: &[u8]) -> &'static str {
    sniff_format(bytes).unwrap_or("img")
}

/// Recognizes job text in a screenshot.
pub struct OcrExtractor {
    engine: Arc<dyn OcrEngine>,
    languages: String,
    min_chars: usize,
    max_image_bytes: usize,
}

impl OcrExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, settings: &OcrSettings) -> Self {
        Self {
            engine,
            languages: settings.languages.clone(),
            min_chars: settings.min_chars,
            max_image_bytes: settings.max_image_bytes,
        }
    }

    pub async fn extract_text_from_payload(&self, payload: &[u8]) -> Result<String, OcrError> {
        let image = decode_image_payload(payload)?;
        self.extract_text_from_image(&image).await
    }

    pub async fn extract_text_from_image(&self, image: &[u8]) -> Result<String, OcrError> {
        if image.len() > self.max_image_bytes {
            return Err(OcrError::TooLarge {
                bytes: image.len(),
                max: self.max_image_bytes,
            });
        }

        info!("Running OCR ({} bytes, languages {})", image.len(), self.languages);
        let mut worker = self.engine.create(&self.languages).await?;
        let recognized = worker.recognize(image).await;
        worker.terminate().await;

        let text = normalize_lines(&recognized?);
        let chars = char_len(&text);
        debug!("OCR recognized {} chars", chars);
        if chars < self.min_chars {
            return Err(OcrError::Insufficient {
                chars,
                min: self.min_chars,
            });
        }
        Ok(text)
    }
}
