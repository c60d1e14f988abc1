use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use kaiwa_api::{
    Api, AuthToken, Comment, CommentPage, CommentRef, Error, NewComment, Pagination, Subject,
    Thread, UserSummary, VoteDirection, VoteTarget,
};
use parking_lot::Mutex;

/// In-memory comment service, for tests
pub struct MockServer(Mutex<State>);

#[derive(Default)]
struct State {
    sessions: HashMap<AuthToken, String>,

    // insertion order is server order
    comments: Vec<DbComment>,
    votes: HashMap<(VoteTarget, String), VoteDirection>,
    clock: i64,

    fail_thread: HashSet<CommentRef>,
    thread_hook: Option<Box<dyn Fn(&CommentRef) + Send>>,
    fail_next_write: Option<Error>,
    omit_vote_scores: bool,

    thread_fetches: Vec<CommentRef>,
    list_fetches: Vec<(Subject, u32)>,
    vote_writes: usize,
    comment_writes: usize,
}

struct DbComment {
    subject: Subject,
    comment: Comment,
}

impl State {
    fn resolve(&self, tok: &AuthToken) -> Result<&str, Error> {
        self.sessions
            .get(tok)
            .map(|n| n as &str)
            .ok_or_else(|| Error::Validation(String::from("invalid auth token")))
    }

    fn find(&self, r: &CommentRef) -> Option<&DbComment> {
        self.comments.iter().find(|c| c.comment.reference == *r)
    }

    fn find_mut(&mut self, r: &CommentRef) -> Option<&mut DbComment> {
        self.comments.iter_mut().find(|c| c.comment.reference == *r)
    }

    fn take_failure(&mut self) -> Result<(), Error> {
        match self.fail_next_write.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn tick(&mut self) -> i64 {
        self.clock += 60;
        1_700_000_000 + self.clock
    }

    fn aggregate(&self, target: &VoteTarget) -> i64 {
        self.votes
            .iter()
            .filter(|((t, _), _)| t == target)
            .map(|(_, d)| d.score())
            .sum()
    }

    fn insert(
        &mut self,
        subject: &Subject,
        parent: Option<&CommentRef>,
        author: &str,
        text: &str,
    ) -> Comment {
        let comment = Comment {
            reference: CommentRef::new(uuid::Uuid::new_v4().to_string()),
            text: String::from(text),
            created: self.tick(),
            author: Some(UserSummary::named(author)),
            parent: parent.cloned(),
            level: 0,
            parent_info: None,
            vote_score: 0,
            is_optimistic: false,
            is_edited: false,
        };
        self.comments.push(DbComment {
            subject: subject.clone(),
            comment: comment.clone(),
        });
        comment
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Mutex::new(State::default()))
    }

    /// Returns a session token for a new user named `name`
    pub fn add_user(&self, name: &str) -> AuthToken {
        let tok = AuthToken(uuid::Uuid::new_v4().to_string());
        self.0.lock().sessions.insert(tok.clone(), String::from(name));
        tok
    }

    pub fn seed_comment(
        &self,
        subject: &Subject,
        parent: Option<&CommentRef>,
        author: &str,
        text: &str,
    ) -> CommentRef {
        self.0.lock().insert(subject, parent, author, text).reference
    }

    /// Make every thread fetch of `r` fail
    pub fn fail_thread_fetch(&self, r: &CommentRef) {
        self.0.lock().fail_thread.insert(r.clone());
    }

    /// Make the next vote, comment or delete call fail with `e`
    pub fn fail_next_write(&self, e: Error) {
        self.0.lock().fail_next_write = Some(e);
    }

    /// Answer vote writes without the new aggregate
    pub fn omit_vote_scores(&self, omit: bool) {
        self.0.lock().omit_vote_scores = omit;
    }

    /// Run `hook` on every thread fetch, before answering it
    pub fn on_thread_fetch(&self, hook: impl Fn(&CommentRef) + Send + 'static) {
        self.0.lock().thread_hook = Some(Box::new(hook));
    }

    pub fn thread_fetches(&self) -> Vec<CommentRef> {
        self.0.lock().thread_fetches.clone()
    }

    pub fn list_fetches(&self) -> Vec<(Subject, u32)> {
        self.0.lock().list_fetches.clone()
    }

    pub fn vote_writes(&self) -> usize {
        self.0.lock().vote_writes
    }

    pub fn comment_writes(&self) -> usize {
        self.0.lock().comment_writes
    }

    pub fn comment(&self, r: &CommentRef) -> Option<Comment> {
        self.0.lock().find(r).map(|c| c.comment.clone())
    }

    pub fn comment_count(&self) -> usize {
        self.0.lock().comments.len()
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl Api for MockServer {
    async fn fetch_vote(
        &self,
        target: &VoteTarget,
        token: &AuthToken,
    ) -> Result<VoteDirection, Error> {
        let db = self.0.lock();
        let user = db.resolve(token)?;
        db.votes
            .get(&(target.clone(), String::from(user)))
            .copied()
            .ok_or(Error::NotFound)
    }

    async fn set_vote(
        &self,
        target: &VoteTarget,
        direction: VoteDirection,
        token: &AuthToken,
    ) -> Result<Option<i64>, Error> {
        let mut db = self.0.lock();
        db.vote_writes += 1;
        let user = String::from(db.resolve(token)?);
        db.take_failure()?;
        let comment = CommentRef::new(target.reference.clone());
        if target.kind == kaiwa_api::TargetKind::Comment && db.find(&comment).is_none() {
            return Err(Error::NotFound);
        }
        db.votes.insert((target.clone(), user), direction);
        let aggregate = db.aggregate(target);
        if let Some(c) = db.find_mut(&comment) {
            c.comment.vote_score = aggregate;
        }
        Ok((!db.omit_vote_scores).then_some(aggregate))
    }

    async fn create_comment(
        &self,
        subject: &Subject,
        new: &NewComment,
        token: &AuthToken,
    ) -> Result<Comment, Error> {
        let mut db = self.0.lock();
        db.comment_writes += 1;
        let user = String::from(db.resolve(token)?);
        db.take_failure()?;
        if let Some(p) = &new.parent {
            if db.find(p).is_none() {
                return Err(Error::Validation(format!("parent comment {p} does not exist")));
            }
        }
        Ok(db.insert(subject, new.parent.as_ref(), &user, &new.text))
    }

    async fn delete_comment(&self, reference: &CommentRef, token: &AuthToken) -> Result<(), Error> {
        let mut db = self.0.lock();
        let user = String::from(db.resolve(token)?);
        db.take_failure()?;
        let idx = db
            .comments
            .iter()
            .position(|c| c.comment.reference == *reference)
            .ok_or(Error::NotFound)?;
        if db.comments[idx].comment.author_name() != Some(&user) {
            return Err(Error::Validation(String::from(
                "you can only delete your own comments",
            )));
        }
        db.comments.remove(idx);
        Ok(())
    }

    async fn fetch_thread(&self, reference: &CommentRef) -> Result<Thread, Error> {
        let mut db = self.0.lock();
        db.thread_fetches.push(reference.clone());
        if let Some(hook) = &db.thread_hook {
            hook(reference);
        }
        if db.fail_thread.contains(reference) {
            return Err(Error::Network(String::from("connection reset by peer")));
        }
        let root = db.find(reference).ok_or(Error::NotFound)?.comment.clone();
        let replies = db
            .comments
            .iter()
            .filter(|c| c.comment.parent.as_ref() == Some(reference))
            .map(|c| c.comment.clone())
            .collect();
        Ok(Thread {
            root: Some(root),
            replies,
        })
    }

    async fn fetch_list(
        &self,
        subject: &Subject,
        page: u32,
        size: u32,
    ) -> Result<CommentPage, Error> {
        let mut db = self.0.lock();
        db.list_fetches.push((subject.clone(), page));
        let top = db
            .comments
            .iter()
            .filter(|c| c.subject == *subject && c.comment.parent.is_none())
            .map(|c| c.comment.clone())
            .collect::<Vec<_>>();
        let size = size.max(1);
        let total = top.len() as u32;
        let pages = ((total + size - 1) / size).max(1);
        let comments = top
            .into_iter()
            .skip((page.saturating_sub(1) * size) as usize)
            .take(size as usize)
            .collect();
        Ok(CommentPage {
            comments,
            pagination: Pagination {
                page,
                pages,
                size,
                total: Some(u64::from(total)),
            },
        })
    }
}
