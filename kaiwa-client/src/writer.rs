use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::Utc;

use crate::{
    api::{
        Api, AuthToken, Comment, CommentRef, Error, NewComment, ParentInfo, Subject, UserSummary,
    },
    normalize::{normalize, wrap_spoiler},
    CommentList, DEFAULT_MAX_DEPTH,
};

pub const MIN_COMMENT_LEN: usize = 5;

/// A comment as typed by the user, before it is sent
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Draft {
    pub subject: Subject,
    pub text: String,
    pub parent: Option<CommentRef>,
    pub spoiler: bool,
}

impl Draft {
    pub fn new(subject: Subject, text: impl Into<String>) -> Draft {
        Draft {
            subject,
            text: text.into(),
            parent: None,
            spoiler: false,
        }
    }

    pub fn reply_to(mut self, parent: CommentRef) -> Draft {
        self.parent = Some(parent);
        self
    }

    pub fn spoiler(mut self, spoiler: bool) -> Draft {
        self.spoiler = spoiler;
        self
    }

    /// The text that will actually be sent
    pub fn prepared_text(&self) -> String {
        let text = normalize(&self.text);
        if self.spoiler {
            wrap_spoiler(&text)
        } else {
            text
        }
    }

    /// Guard for the submit button. [`CommentWriter::submit`] does not check
    /// this again.
    pub fn check_length(&self) -> Result<(), Error> {
        let actual = normalize(&self.text).chars().count();
        if actual < MIN_COMMENT_LEN {
            return Err(Error::TooShort {
                min: MIN_COMMENT_LEN,
                actual,
            });
        }
        Ok(())
    }
}

/// One submission between the moment it is sent and the server's answer
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingSubmission {
    pub placeholder: CommentRef,
    pub subject: Subject,
    pub new: NewComment,
    pub token: AuthToken,

    /// Whether a placeholder comment was put in the displayed list
    pub displayed: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmissionOutcome {
    /// The server's copy. The caller is expected to reconcile by re-fetching
    /// the thread rather than display this directly.
    pub confirmed: Comment,
    pub placeholder: CommentRef,
}

/// Sends comments in three steps: [`begin`](CommentWriter::begin) shows the
/// placeholder, [`send`](CommentWriter::send) talks to the server without
/// touching the displayed list, and [`finish`](CommentWriter::finish) takes
/// the placeholder down again.
pub struct CommentWriter<A> {
    api: Arc<A>,
    max_depth: usize,
    last_placeholder: AtomicI64,
}

impl<A: Api> CommentWriter<A> {
    pub fn new(api: Arc<A>) -> CommentWriter<A> {
        CommentWriter {
            api,
            max_depth: DEFAULT_MAX_DEPTH,
            last_placeholder: AtomicI64::new(0),
        }
    }

    /// Deepest level a placeholder is shown at, like the thread it goes in
    pub fn with_max_depth(mut self, max_depth: usize) -> CommentWriter<A> {
        self.max_depth = max_depth;
        self
    }

    /// `temp_<millis>`, strictly increasing even within one millisecond
    fn next_placeholder(&self) -> CommentRef {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last_placeholder
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now - 1);
        CommentRef::temp(now.max(prev + 1))
    }

    fn placeholder_comment(
        &self,
        list: &CommentList,
        pending: &PendingSubmission,
        author: &UserSummary,
    ) -> Comment {
        let parent = pending.new.parent.as_ref();
        let displayed_parent = parent.and_then(|p| list.get(p));
        Comment {
            reference: pending.placeholder.clone(),
            text: pending.new.text.clone(),
            created: Utc::now().timestamp(),
            author: Some(author.clone()),
            parent: parent.cloned(),
            level: displayed_parent.map_or(0, |p| (p.level + 1).min(self.max_depth)),
            parent_info: match displayed_parent {
                Some(p) => Some(p.as_parent()),
                None => parent.map(|p| ParentInfo {
                    reference: p.clone(),
                    username: None,
                }),
            },
            vote_score: 0,
            is_optimistic: true,
            is_edited: false,
        }
    }

    /// Prepares `draft` for sending, and shows it in `list` if `author` is
    /// known. Nothing is shown without a token.
    pub fn begin(
        &self,
        list: &mut CommentList,
        draft: &Draft,
        author: Option<&UserSummary>,
        token: Option<&AuthToken>,
    ) -> Result<PendingSubmission, Error> {
        let token = token.ok_or(Error::Unauthenticated)?;
        let mut pending = PendingSubmission {
            placeholder: self.next_placeholder(),
            subject: draft.subject.clone(),
            new: NewComment {
                text: draft.prepared_text(),
                parent: draft.parent.clone(),
            },
            token: token.clone(),
            displayed: false,
        };
        match author {
            Some(author) => {
                let c = self.placeholder_comment(list, &pending, author);
                pending.displayed = list.insert_pending(c);
            }
            None => tracing::debug!("no author summary, submitting without placeholder"),
        }
        Ok(pending)
    }

    /// The server's copy of the comment. Errors other than validation
    /// failures are all reported as network errors.
    pub async fn send(&self, pending: &PendingSubmission) -> Result<Comment, Error> {
        match self
            .api
            .create_comment(&pending.subject, &pending.new, &pending.token)
            .await
        {
            Ok(confirmed) => {
                tracing::info!(reference = %confirmed.reference, "comment confirmed");
                Ok(confirmed)
            }
            Err(err) => {
                tracing::warn!(placeholder = %pending.placeholder, ?err, "comment submission failed");
                Err(match err {
                    Error::Validation(_) | Error::Network(_) => err,
                    other => Error::Network(other.to_string()),
                })
            }
        }
    }

    /// Takes the placeholder down, whatever the server answered
    pub fn finish(&self, list: &mut CommentList, pending: &PendingSubmission) {
        if pending.displayed {
            list.remove(&pending.placeholder);
        }
    }

    /// All three steps at once, for callers that do not display the list
    /// while the request is out. On success, the caller must re-fetch the
    /// thread to display the confirmed comment.
    pub async fn submit(
        &self,
        list: &mut CommentList,
        draft: &Draft,
        author: Option<&UserSummary>,
        token: Option<&AuthToken>,
    ) -> Result<SubmissionOutcome, Error> {
        let pending = self.begin(list, draft, author, token)?;
        let res = self.send(&pending).await;
        self.finish(list, &pending);
        Ok(SubmissionOutcome {
            confirmed: res?,
            placeholder: pending.placeholder,
        })
    }
}
