/// A decoded feed as returned by a [`Fetcher`](crate::fetcher::Fetcher).
///
/// Values are kept as they appeared in the document; interpretation (dates,
/// markup detection) is left to the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    /// Empty when the entry carried no link
    pub link: String,
    pub description: Option<String>,
    /// Publication timestamp exactly as written in the feed
    pub pub_date: Option<String>,
}
