use std::fmt;

mod error;
pub use error::Error;

mod remote;
pub use remote::Api;

mod vote;
pub use vote::{TargetKind, VoteDirection, VoteTarget};

pub mod wire;

/// Prefix of the references given to comments that the server has not confirmed yet
pub const TEMP_PREFIX: &str = "temp_";

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentRef(pub String);

impl CommentRef {
    pub fn new(r: impl Into<String>) -> CommentRef {
        CommentRef(r.into())
    }

    /// Placeholder reference for an optimistic comment created at `millis`
    pub fn temp(millis: i64) -> CommentRef {
        CommentRef(format!("{TEMP_PREFIX}{millis}"))
    }

    pub fn is_temp(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AuthToken(pub String);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct UserSummary {
    pub username: String,
    pub avatar: Option<String>,
}

impl UserSummary {
    pub fn named(username: impl Into<String>) -> UserSummary {
        UserSummary {
            username: username.into(),
            avatar: None,
        }
    }
}

/// Immediate parent of a flattened reply, for "replying to @user" hints
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ParentInfo {
    pub reference: CommentRef,
    pub username: Option<String>,
}

/// The thing a top-level discussion hangs off, eg. `("anime", "frieren")`
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Subject {
    pub content_type: String,
    pub slug: String,
}

impl Subject {
    pub fn new(content_type: impl Into<String>, slug: impl Into<String>) -> Subject {
        Subject {
            content_type: content_type.into(),
            slug: slug.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub reference: CommentRef,
    pub text: String,

    /// Unix timestamp, in seconds
    pub created: i64,

    pub author: Option<UserSummary>,
    pub parent: Option<CommentRef>,

    /// Nesting depth once flattened, 0 being a direct reply to the thread root
    pub level: usize,
    pub parent_info: Option<ParentInfo>,

    /// Server-authoritative aggregate of all votes
    pub vote_score: i64,

    pub is_optimistic: bool,
    pub is_edited: bool,
}

impl Comment {
    pub fn author_name(&self) -> Option<&str> {
        self.author.as_ref().map(|a| &a.username as &str)
    }

    /// Optimistic comments can be neither voted on nor deleted
    pub fn accepts_actions(&self) -> bool {
        !self.is_optimistic
    }

    pub fn as_parent(&self) -> ParentInfo {
        ParentInfo {
            reference: self.reference.clone(),
            username: self.author_name().map(String::from),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub text: String,
    pub parent: Option<CommentRef>,
}

/// Answer to a thread fetch: the direct replies of one comment
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Thread {
    pub root: Option<Comment>,
    pub replies: Vec<Comment>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub size: u32,
    pub total: Option<u64>,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        self.page < self.pages
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    pub pagination: Pagination,
}
