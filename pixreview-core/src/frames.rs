//! Screenshot decoding and lazily decoded frame sequences.

use std::path::{Path, PathBuf};

use image::RgbaImage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("cannot decode {path}: {reason}")]
    Decode { path: String, reason: String },
    #[error("frame {index} out of range ({len} frames)")]
    OutOfRange { index: usize, len: usize },
}

/// Decodes the image at `path` into RGBA8.
pub fn decode_rgba(path: &Path) -> Result<RgbaImage, FrameError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|e| FrameError::Decode { path: path.display().to_string(), reason: e.to_string() })
}

#[derive(Debug)]
enum Slot {
    Deferred,
    Decoded(RgbaImage),
    Failed(FrameError),
}

#[derive(Debug)]
struct Frame {
    path: PathBuf,
    slot: Slot,
}

/// Ordered frames of a multi-screenshot capture.
///
/// Frames start deferred and are decoded the first time they are shown. A
/// frame that fails to decode keeps its error; it is not retried on every draw.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn deferred<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let frames = paths
            .into_iter()
            .map(|p| Frame { path: p.into(), slot: Slot::Deferred })
            .collect();
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[cfg(test)]
    pub fn is_decoded(&self, index: usize) -> bool {
        matches!(self.frames.get(index), Some(Frame { slot: Slot::Decoded(_), .. }))
    }

    /// Returns frame `index`, decoding it first if it was deferred.
    pub fn show(&mut self, index: usize) -> Result<&RgbaImage, FrameError> {
        let len = self.frames.len();
        let frame = self
            .frames
            .get_mut(index)
            .ok_or(FrameError::OutOfRange { index, len })?;

        if matches!(frame.slot, Slot::Deferred) {
            frame.slot = match decode_rgba(&frame.path) {
                Ok(img) => Slot::Decoded(img),
                Err(e) => {
                    tracing::warn!(path = %frame.path.display(), error = %e, "frame decode failed");
                    Slot::Failed(e)
                }
            };
        }

        match &frame.slot {
            Slot::Decoded(img) => Ok(img),
            Slot::Failed(e) => Err(e.clone()),
            Slot::Deferred => Err(FrameError::Decode {
                path: frame.path.display().to_string(),
                reason: "frame was not decoded".to_owned(),
            }),
        }
    }

    /// Returns frame `index` only if it has already been decoded.
    pub fn peek(&self, index: usize) -> Option<&RgbaImage> {
        match self.frames.get(index) {
            Some(Frame { slot: Slot::Decoded(img), .. }) => Some(img),
            _ => None,
        }
    }
}
