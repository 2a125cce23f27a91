//! Image loading for pixreview.
//!
//! A dedicated `std::thread` owns all screenshot decoding for the review
//! pages; the main loop talks to it only through channels.

pub mod types;
pub mod worker;

use crossbeam_channel::Sender;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;
use types::LoadRequest;

/// Handle to the loader thread. Dropping it closes the request channel,
/// which ends the thread.
pub struct Loader {
    tx: Sender<LoadRequest>,
}

impl Loader {
    pub fn spawn(event_tx: UnboundedSender<AppEvent>) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        std::thread::Builder::new()
            .name("pixreview-loader".to_owned())
            .spawn(move || worker::loader_loop(rx, event_tx))?;
        Ok(Self { tx })
    }

    /// Queues a decode. Returns `false` if the loader thread is gone.
    pub fn request(&self, request: LoadRequest) -> bool {
        let page = request.page;
        match self.tx.send(request) {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(page, "loader thread is not running");
                false
            }
        }
    }
}
