pub mod document;
pub mod feed;
pub mod post;

pub use document::{FeedDocument, RawItem};
pub use feed::Feed;
pub use post::{Post, PostDraft};
