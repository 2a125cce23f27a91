//! Background thread that decodes screenshot pairs.
//!
//! Decoding a large PNG takes long enough to stall a frame, so it happens off
//! the event loop. Requests arrive over a crossbeam channel; each reply goes
//! back as one `AppEvent::PairLoaded` carrying both images or the first
//! failure.

use crossbeam_channel::Receiver;
use pixreview_core::frames::decode_rgba;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;
use crate::loader::types::{DecodedPair, LoadRequest, LoadedPair};

/// Entry point of the loader thread.
///
/// Loops until every request sender is dropped, or until the main loop's
/// receiver is gone.
pub fn loader_loop(rx: Receiver<LoadRequest>, event_tx: UnboundedSender<AppEvent>) {
    for request in rx {
        let reply = decode_pair(request);
        if event_tx.send(AppEvent::PairLoaded(Box::new(reply))).is_err() {
            break;
        }
    }
    tracing::debug!("loader thread exiting");
}

/// Decodes both images of `request`. The pair is all-or-nothing: a page never
/// diffs against a missing side.
fn decode_pair(request: LoadRequest) -> LoadedPair {
    let images = decode_rgba(&request.recorded).and_then(|recorded| {
        let actual = decode_rgba(&request.actual)?;
        Ok(DecodedPair { recorded, actual })
    });
    if let Err(e) = &images {
        tracing::warn!(page = request.page, error = %e, "screenshot pair unavailable");
    }
    LoadedPair { page: request.page, images }
}
