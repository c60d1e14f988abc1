mod cache;
pub use cache::FifoCache;

mod config;
pub use config::Config;

mod http_api;
pub use http_api::HttpApi;

mod list;
pub use list::CommentList;

pub mod normalize;
pub use normalize::normalize;

mod order;
pub use order::CommentOrder;

mod pager;
pub use pager::{CommentPager, PageKey, DEFAULT_CACHE_CAPACITY, DEFAULT_PAGE_SIZE};

pub mod spans;
pub use spans::{parse_spans, RenderedText, Span};

mod thread;
pub use thread::{ThreadFetcher, DEFAULT_MAX_DEPTH};

mod view;
pub use view::{Liveness, ThreadView};

pub mod vote;
pub use vote::{VoteClient, VoteOutcome};

mod writer;
pub use writer::{
    CommentWriter, Draft, PendingSubmission, SubmissionOutcome, MIN_COMMENT_LEN,
};

pub mod api {
    pub use kaiwa_api::*;
}
