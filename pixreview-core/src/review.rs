//! The classification transaction behind the accept / reject / update actions.

use crate::db::{ReviewStore, StoreError};
use crate::promote::{BaselinePromoter, PromoteError, PromotionRequest};
use crate::types::{ClassificationState, ReviewKey};

/// Where the reviewer goes after a successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Open the case at this locator.
    Advance(String),
    /// No next case: end the review session.
    Close,
}

#[derive(Debug, thiserror::Error)]
pub enum MarkError {
    #[error("'{0}' is not a classification action")]
    InvalidAction(ClassificationState),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The previous state has been restored; the reviewer stays on the page.
    #[error(transparent)]
    Promotion(#[from] PromoteError),
}

/// Records `state` for `key` and decides where to go next.
///
/// `Accepted` and `Rejected` are plain writes. `PendingUpdate` is written
/// while the promoter runs; on success it becomes `Accepted`, on failure the
/// previous state is put back and the error returned, so nothing is committed
/// and navigation does not advance.
pub async fn mark_state<P>(
    store: &ReviewStore,
    promoter: &P,
    key: &ReviewKey,
    state: ClassificationState,
    next: Option<&str>,
) -> Result<MarkOutcome, MarkError>
where
    P: BaselinePromoter,
{
    match state {
        ClassificationState::Unset => return Err(MarkError::InvalidAction(state)),
        ClassificationState::Accepted | ClassificationState::Rejected => {
            store.set(key, state).await?;
        }
        ClassificationState::PendingUpdate => {
            let request = PromotionRequest::for_key(key)?;
            let previous = store.get(key).await?;
            store.set(key, ClassificationState::PendingUpdate).await?;

            tracing::info!(key = %key, test = %request.test, "promoting actual image to baseline");
            if let Err(e) = promoter.promote(&request).await {
                tracing::warn!(key = %key, error = %e, "baseline promotion failed");
                store.set(key, previous).await?;
                return Err(MarkError::Promotion(e));
            }
            store.set(key, ClassificationState::Accepted).await?;
        }
    }

    Ok(match next {
        Some(locator) => MarkOutcome::Advance(locator.to_owned()),
        None => MarkOutcome::Close,
    })
}
