//! Owned messages exchanged with the loader thread.
//!
//! Everything here is `Send` and free of borrowed lifetimes so it can cross
//! from the loader thread to the main loop inside an `AppEvent`.

use std::path::PathBuf;

use image::RgbaImage;
use pixreview_core::frames::FrameError;

use crate::event::PageId;

/// Asks the loader to decode one recorded/actual pair for `page`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub page: PageId,
    pub recorded: PathBuf,
    pub actual: PathBuf,
}

/// Both images of a pair, decoded to RGBA8, in diff input order.
#[derive(Debug)]
pub struct DecodedPair {
    pub recorded: RgbaImage,
    pub actual: RgbaImage,
}

/// Loader reply. The page id lets the receiver drop results for pages the
/// user has already left.
#[derive(Debug)]
pub struct LoadedPair {
    pub page: PageId,
    pub images: Result<DecodedPair, FrameError>,
}
