//! Baseline promotion: asking the fixtures endpoint to adopt the current
//! actual screenshot as the new recorded one.

use std::future::Future;

use serde::Serialize;

use crate::document::case_stem;
use crate::types::ReviewKey;

/// JSON body posted to the fixtures endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionRequest {
    /// Test name: the locator's last path segment without extension.
    pub test: String,
    pub hash: String,
}

impl PromotionRequest {
    pub fn for_key(key: &ReviewKey) -> Result<Self, PromoteError> {
        let test = case_stem(&key.locator).ok_or_else(|| PromoteError::NoCaseName(key.locator.clone()))?;
        Ok(Self { test, hash: key.actual_hash.clone() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoteError {
    #[error("cannot derive a test name from '{0}'")]
    NoCaseName(String),
    #[error("baseline update request failed: {0}")]
    Transport(String),
    #[error("baseline update rejected with HTTP {0}")]
    Status(u16),
}

/// Something that can promote an actual screenshot to baseline.
pub trait BaselinePromoter {
    fn promote(&self, request: &PromotionRequest) -> impl Future<Output = Result<(), PromoteError>> + Send;
}
