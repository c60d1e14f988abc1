use async_trait::async_trait;

use crate::{
    AuthToken, Comment, CommentPage, CommentRef, Error, NewComment, Subject, Thread,
    VoteDirection, VoteTarget,
};

/// The remote comment service, as seen by the client components.
///
/// Implementations convert every transport failure into [`Error`]; nothing
/// lower-level leaks through.
#[async_trait]
pub trait Api: Send + Sync {
    /// Fails with [`Error::NotFound`] if the viewer never voted on `target`
    async fn fetch_vote(&self, target: &VoteTarget, token: &AuthToken)
        -> Result<VoteDirection, Error>;

    /// Returns the new aggregate score of `target`, if the server sent it back
    async fn set_vote(
        &self,
        target: &VoteTarget,
        direction: VoteDirection,
        token: &AuthToken,
    ) -> Result<Option<i64>, Error>;

    async fn create_comment(
        &self,
        subject: &Subject,
        new: &NewComment,
        token: &AuthToken,
    ) -> Result<Comment, Error>;

    async fn delete_comment(&self, reference: &CommentRef, token: &AuthToken) -> Result<(), Error>;

    /// Direct replies of `reference`, one level only
    async fn fetch_thread(&self, reference: &CommentRef) -> Result<Thread, Error>;

    /// `page` starts at 1
    async fn fetch_list(&self, subject: &Subject, page: u32, size: u32)
        -> Result<CommentPage, Error>;
}
