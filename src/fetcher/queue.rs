use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::domain::Feed;

/// Snapshot of one cycle's batch, shared by the workers.
///
/// Each feed is handed out exactly once. The lock is only held for the pop
/// itself; an empty queue tells every worker to exit.
pub struct FeedQueue {
    feeds: Mutex<VecDeque<Feed>>,
}

impl FeedQueue {
    pub fn new(feeds: Vec<Feed>) -> Self {
        Self {
            feeds: Mutex::new(feeds.into()),
        }
    }

    pub fn pop(&self) -> Option<Feed> {
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}
