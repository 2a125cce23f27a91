//! The two kinds of page pixreview shows. Pages live on a stack in
//! [`crate::app::App`]; only the top one receives input and background results.

pub mod index;
pub mod review;

use crate::event::PageId;
use index::IndexPage;
use review::ReviewPage;

pub enum Page {
    Index(IndexPage),
    Review(ReviewPage),
}

impl Page {
    pub fn id(&self) -> PageId {
        match self {
            Page::Index(p) => p.id,
            Page::Review(p) => p.id,
        }
    }
}
