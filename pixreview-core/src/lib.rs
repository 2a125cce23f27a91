//! Core of `pixreview`, the visual-regression screenshot review tool.
//!
//! Nothing in this crate touches the terminal. It holds the perceptual pixel
//! diff ([`diff`]), the durable review-state store ([`db`]), next-case
//! navigation ([`nav`]), the frame playback state machine ([`playback`],
//! [`frames`]), the test-runner documents ([`document`]) and the
//! classification transaction ([`review`], [`promote`]).

pub mod db;
pub mod diff;
pub mod document;
pub mod frames;
pub mod nav;
pub mod playback;
pub mod promote;
pub mod review;
pub mod schema;
pub mod types;

pub use db::{ReviewStore, StoreError};
pub use types::{ClassificationState, IndexEntry, ResetPolicy, ResetReport, ResetScope, ReviewKey};
