use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    api::{
        Api, AuthToken, Comment, CommentRef, Error, Subject, UserSummary, VoteDirection,
        VoteTarget,
    },
    vote::{score_delta, toggle},
    CommentList, CommentOrder, CommentWriter, Config, Draft, PendingSubmission,
    SubmissionOutcome, ThreadFetcher, VoteClient, VoteOutcome,
};

/// Shared flag telling whether the screen owning a [`ThreadView`] is still
/// there. Answers arriving after [`Liveness::kill`] are dropped.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Liveness {
        Liveness(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn kill(&self) {
        self.0.store(false, Ordering::SeqCst)
    }
}

impl Default for Liveness {
    fn default() -> Liveness {
        Liveness::new()
    }
}

/// Everything one thread screen displays, and the actions it offers.
///
/// A submission goes through [`begin_submission`](ThreadView::begin_submission),
/// [`send_submission`](ThreadView::send_submission) and
/// [`finish_submission`](ThreadView::finish_submission). Only the first and
/// last steps need `&mut self`, so the placeholder can be displayed while the
/// request is out. A view has at most one submission in flight.
pub struct ThreadView<A> {
    api: Arc<A>,
    subject: Subject,
    root: CommentRef,
    order: Option<CommentOrder>,
    viewer: Option<(UserSummary, AuthToken)>,
    comments: CommentList,
    votes: HashMap<CommentRef, VoteDirection>,
    fetcher: ThreadFetcher<A>,
    writer: CommentWriter<A>,
    voter: VoteClient<A>,
    in_flight: Option<CommentRef>,
    alive: Liveness,
}

impl<A: Api> ThreadView<A> {
    pub fn new(api: Arc<A>, subject: Subject, root: CommentRef) -> ThreadView<A> {
        let alive = Liveness::new();
        ThreadView {
            subject,
            root,
            order: None,
            viewer: None,
            comments: CommentList::new(),
            votes: HashMap::new(),
            fetcher: ThreadFetcher::new(api.clone()).with_liveness(alive.clone()),
            writer: CommentWriter::new(api.clone()),
            voter: VoteClient::new(api.clone()),
            in_flight: None,
            alive,
            api,
        }
    }

    /// Re-sort every refreshed thread chronologically instead of keeping
    /// the depth-first server order
    pub fn with_order(mut self, order: CommentOrder) -> ThreadView<A> {
        self.order = Some(order);
        self
    }

    /// Settings from `cfg` that concern a thread screen
    pub fn from_config(
        api: Arc<A>,
        cfg: &Config,
        subject: Subject,
        root: CommentRef,
    ) -> ThreadView<A> {
        ThreadView::new(api, subject, root).with_max_depth(cfg.max_depth)
    }

    /// Applies both to fetched threads and to placeholders
    pub fn with_max_depth(mut self, max_depth: usize) -> ThreadView<A> {
        self.fetcher = ThreadFetcher::new(self.api.clone())
            .with_max_depth(max_depth)
            .with_liveness(self.alive.clone());
        self.writer = CommentWriter::new(self.api.clone()).with_max_depth(max_depth);
        self
    }

    pub fn logged_in(mut self, user: UserSummary, token: AuthToken) -> ThreadView<A> {
        self.viewer = Some((user, token));
        self
    }

    pub fn root(&self) -> &CommentRef {
        &self.root
    }

    pub fn comments(&self) -> &CommentList {
        &self.comments
    }

    /// The viewer's vote on `r`, if it was already loaded
    pub fn vote_of(&self, r: &CommentRef) -> Option<VoteDirection> {
        self.votes.get(r).copied()
    }

    pub fn liveness(&self) -> Liveness {
        self.alive.clone()
    }

    pub fn teardown(&self) {
        self.alive.kill();
    }

    fn token(&self) -> Option<&AuthToken> {
        self.viewer.as_ref().map(|(_, t)| t)
    }

    fn discarded(&self, what: &str) -> bool {
        if self.alive.is_alive() {
            return false;
        }
        tracing::debug!(root = %self.root, what, "view torn down, discarding answer");
        true
    }

    /// A draft replying to the thread root
    pub fn draft(&self, text: impl Into<String>) -> Draft {
        Draft::new(self.subject.clone(), text).reply_to(self.root.clone())
    }

    pub async fn refresh(&mut self) -> Result<(), Error> {
        let res = self.fetcher.fetch_thread(&self.root).await;
        if self.discarded("thread") {
            return Ok(());
        }
        let mut comments = res?;
        if let Some(order) = self.order {
            order.sort(&mut comments);
        }
        self.comments.replace_all(comments);
        Ok(())
    }

    /// Checks `draft` and shows its placeholder
    pub fn begin_submission(&mut self, draft: &Draft) -> Result<PendingSubmission, Error> {
        draft.check_length()?;
        if let Some(placeholder) = &self.in_flight {
            tracing::debug!(%placeholder, "refusing a second submission");
            return Err(Error::Validation(String::from(
                "a comment is already being submitted",
            )));
        }
        let (author, token) = match &self.viewer {
            Some((u, t)) => (Some(u), Some(t)),
            None => (None, None),
        };
        let pending = self
            .writer
            .begin(&mut self.comments, draft, author, token)?;
        self.in_flight = Some(pending.placeholder.clone());
        Ok(pending)
    }

    /// The displayed list stays readable while this is pending
    pub async fn send_submission(&self, pending: &PendingSubmission) -> Result<Comment, Error> {
        self.writer.send(pending).await
    }

    /// Takes the placeholder down, then re-fetches the thread so that the
    /// confirmed comment shows up. A failing re-fetch does not fail the
    /// submission. Once torn down the list is left as is.
    pub async fn finish_submission(
        &mut self,
        pending: PendingSubmission,
        res: Result<Comment, Error>,
    ) -> Result<SubmissionOutcome, Error> {
        if self.in_flight.as_ref() == Some(&pending.placeholder) {
            self.in_flight = None;
        }
        if !self.discarded("submission") {
            self.writer.finish(&mut self.comments, &pending);
        }
        let outcome = SubmissionOutcome {
            confirmed: res?,
            placeholder: pending.placeholder,
        };
        if self.alive.is_alive() {
            if let Err(err) = self.refresh().await {
                tracing::warn!(root = %self.root, ?err, "failed reconciling thread after submission");
            }
        }
        Ok(outcome)
    }

    pub async fn submit(&mut self, draft: &Draft) -> Result<SubmissionOutcome, Error> {
        let pending = self.begin_submission(draft)?;
        let res = self.send_submission(&pending).await;
        self.finish_submission(pending, res).await
    }

    /// Fetched once per comment, then served from memory
    pub async fn load_vote(&mut self, r: &CommentRef) -> Result<VoteDirection, Error> {
        if let Some(d) = self.votes.get(r) {
            return Ok(*d);
        }
        let d = self
            .voter
            .fetch_vote(&VoteTarget::comment(r), self.token())
            .await?;
        if !self.discarded("vote") {
            self.votes.insert(r.clone(), d);
        }
        Ok(d)
    }

    /// The viewer pressed `pressed` on comment `r`. Pressing the held
    /// direction again retracts the vote.
    ///
    /// Returns None, without contacting the server, for comments that are
    /// not displayed or not confirmed yet.
    pub async fn vote(
        &mut self,
        r: &CommentRef,
        pressed: VoteDirection,
    ) -> Result<Option<VoteOutcome>, Error> {
        match self.comments.get(r) {
            Some(c) if c.accepts_actions() => (),
            _ => return Ok(None),
        }
        let current = self.load_vote(r).await?;
        let direction = toggle(current, pressed);
        let outcome = self
            .voter
            .set_vote(&VoteTarget::comment(r), direction, self.token())
            .await?;
        if self.discarded("vote") {
            return Ok(Some(outcome));
        }
        self.votes.insert(r.clone(), direction);
        match outcome.aggregate {
            Some(score) => self.comments.set_score(r, score),
            None => self.comments.adjust_score(r, score_delta(current, direction)),
        };
        Ok(Some(outcome))
    }

    /// Returns false, without contacting the server, for comments that are
    /// not displayed or not confirmed yet
    pub async fn delete(&mut self, r: &CommentRef) -> Result<bool, Error> {
        match self.comments.get(r) {
            Some(c) if c.accepts_actions() => (),
            _ => return Ok(false),
        }
        let token = self.token().ok_or(Error::Unauthenticated)?;
        self.api.delete_comment(r, token).await.map_err(|err| {
            tracing::warn!(reference = %r, ?err, "failed deleting comment");
            err
        })?;
        if !self.discarded("delete") {
            self.comments.remove(r);
            self.votes.remove(r);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::tests::comment;
    use kaiwa_mock_server::MockServer;

    struct Fixture {
        server: Arc<MockServer>,
        subject: Subject,
        root: CommentRef,
        mine: CommentRef,
        theirs: CommentRef,
        token: AuthToken,
    }

    fn fixture() -> Fixture {
        let server = Arc::new(MockServer::new());
        let subject = Subject::new("anime", "mob-psycho-100");
        let token = server.add_user("mob");
        let root = server.seed_comment(&subject, None, "reigen", "root");
        let theirs = server.seed_comment(&subject, Some(&root), "dimple", "theirs");
        let mine = server.seed_comment(&subject, Some(&root), "mob", "mine");
        Fixture {
            server,
            subject,
            root,
            mine,
            theirs,
            token,
        }
    }

    impl Fixture {
        fn view(&self) -> ThreadView<MockServer> {
            ThreadView::new(self.server.clone(), self.subject.clone(), self.root.clone())
                .logged_in(UserSummary::named("mob"), self.token.clone())
        }
    }

    fn texts(v: &ThreadView<MockServer>) -> Vec<&str> {
        v.comments().iter().map(|c| c.text.as_str()).collect()
    }

    #[tokio::test]
    async fn refresh_and_order() {
        let f = fixture();
        f.server.seed_comment(&f.subject, Some(&f.theirs), "teru", "nested");
        let mut v = f.view();
        v.refresh().await.unwrap();
        assert_eq!(texts(&v), ["theirs", "nested", "mine"]);

        let mut v = f.view().with_order(CommentOrder::Newest);
        v.refresh().await.unwrap();
        assert_eq!(texts(&v), ["nested", "mine", "theirs"]);

        let mut v = f.view().with_max_depth(0);
        v.refresh().await.unwrap();
        assert_eq!(texts(&v), ["theirs", "mine"]);
    }

    #[tokio::test]
    async fn submit_reconciles() {
        let f = fixture();
        let mut v = f.view();
        v.refresh().await.unwrap();
        let out = v.submit(&v.draft("   hello\n\n\nworld   ")).await.unwrap();
        assert_eq!(texts(&v), ["theirs", "mine", "hello\n\nworld"]);
        assert!(v.comments().contains(&out.confirmed.reference));
        assert!(!v.comments().contains(&out.placeholder));
        assert_eq!(v.comments().pending().count(), 0);
    }

    #[tokio::test]
    async fn submit_failure_rolls_back() {
        let f = fixture();
        let mut v = f.view();
        v.refresh().await.unwrap();
        let before = v.comments().clone();
        f.server
            .fail_next_write(Error::Validation(String::from("Slow down")));
        let res = v.submit(&v.draft("a perfectly fine reply")).await;
        assert_eq!(res, Err(Error::Validation(String::from("Slow down"))));
        assert_eq!(v.comments(), &before);
    }

    #[tokio::test]
    async fn submit_guards() {
        let f = fixture();
        let mut v = f.view();
        assert!(matches!(
            v.submit(&v.draft(" hi ")).await,
            Err(Error::TooShort { actual: 2, .. })
        ));
        let mut anon = ThreadView::new(f.server.clone(), f.subject.clone(), f.root.clone());
        assert_eq!(
            anon.submit(&anon.draft("hello world")).await,
            Err(Error::Unauthenticated)
        );
        assert_eq!(f.server.comment_writes(), 0);
    }

    #[tokio::test]
    async fn votes_toggle() {
        let f = fixture();
        let mut v = f.view();
        v.refresh().await.unwrap();
        assert_eq!(v.vote_of(&f.theirs), None);
        assert_eq!(v.load_vote(&f.theirs).await, Ok(VoteDirection::Neutral));
        assert_eq!(v.vote_of(&f.theirs), Some(VoteDirection::Neutral));

        let o = v.vote(&f.theirs, VoteDirection::Up).await.unwrap().unwrap();
        assert_eq!(o.direction, VoteDirection::Up);
        assert_eq!(v.comments().get(&f.theirs).unwrap().vote_score, 1);

        let o = v.vote(&f.theirs, VoteDirection::Up).await.unwrap().unwrap();
        assert_eq!(o.direction, VoteDirection::Neutral);
        assert_eq!(v.vote_of(&f.theirs), Some(VoteDirection::Neutral));
        assert_eq!(v.comments().get(&f.theirs).unwrap().vote_score, 0);
    }

    #[tokio::test]
    async fn votes_without_aggregate() {
        let f = fixture();
        f.server.omit_vote_scores(true);
        let mut v = f.view();
        v.refresh().await.unwrap();
        v.vote(&f.mine, VoteDirection::Down).await.unwrap();
        assert_eq!(v.comments().get(&f.mine).unwrap().vote_score, -1);
        v.vote(&f.mine, VoteDirection::Up).await.unwrap();
        assert_eq!(v.comments().get(&f.mine).unwrap().vote_score, 1);
        assert_eq!(f.server.comment(&f.mine).unwrap().vote_score, 1);
    }

    #[tokio::test]
    async fn optimistic_comments_take_no_action() {
        let f = fixture();
        let mut v = f.view();
        v.refresh().await.unwrap();
        let mut pending = comment("temp_1", Some(f.root.as_str()), 0);
        pending.is_optimistic = true;
        assert!(v.comments.insert_pending(pending));

        let r = CommentRef::new("temp_1");
        assert_eq!(v.vote(&r, VoteDirection::Up).await, Ok(None));
        assert_eq!(v.delete(&r).await, Ok(false));
        assert_eq!(v.vote(&CommentRef::new("elsewhere"), VoteDirection::Up).await, Ok(None));
        assert_eq!(f.server.vote_writes(), 0);
        assert!(v.comments().contains(&r));
    }

    #[tokio::test]
    async fn delete_own() {
        let f = fixture();
        let mut v = f.view();
        v.refresh().await.unwrap();
        assert_eq!(v.delete(&f.mine).await, Ok(true));
        assert_eq!(texts(&v), ["theirs"]);
        assert_eq!(f.server.comment(&f.mine), None);

        assert!(matches!(v.delete(&f.theirs).await, Err(Error::Validation(_))));
        assert_eq!(texts(&v), ["theirs"]);
    }

    #[tokio::test]
    async fn teardown_discards_answers() {
        let f = fixture();
        let mut v = f.view();
        let alive = v.liveness();
        assert!(alive.is_alive());
        v.teardown();
        assert!(!alive.is_alive());
        assert_eq!(v.refresh().await, Ok(()));
        assert!(v.comments().is_empty());
        assert_eq!(f.server.thread_fetches().len(), 0);
    }

    #[tokio::test]
    async fn teardown_during_refresh() {
        let f = fixture();
        let mut v = f.view().with_max_depth(3);
        let killer = v.liveness();
        f.server.on_thread_fetch(move |_| killer.kill());
        assert_eq!(v.refresh().await, Ok(()));
        assert!(v.comments().is_empty());
        // the branches below the root are never asked for
        assert_eq!(f.server.thread_fetches(), [f.root.clone()]);
    }

    #[tokio::test]
    async fn placeholder_shown_while_sending() {
        let f = fixture();
        let mut v = f.view();
        v.refresh().await.unwrap();
        let pending = v.begin_submission(&v.draft("on its way")).unwrap();

        let sending = v.send_submission(&pending);
        assert_eq!(texts(&v), ["theirs", "mine", "on its way"]);
        let shown = v.comments().get(&pending.placeholder).unwrap();
        assert!(shown.is_optimistic);
        assert_eq!(shown.author_name(), Some("mob"));
        assert_eq!(v.comments().pending().count(), 1);
        let res = sending.await;

        assert_eq!(
            v.begin_submission(&v.draft("impatient second try")),
            Err(Error::Validation(String::from(
                "a comment is already being submitted"
            )))
        );
        assert_eq!(v.comments().pending().count(), 1);

        let out = v.finish_submission(pending, res).await.unwrap();
        assert_eq!(texts(&v), ["theirs", "mine", "on its way"]);
        assert_eq!(v.comments().pending().count(), 0);
        assert!(v.comments().contains(&out.confirmed.reference));
        assert!(v.begin_submission(&v.draft("next one")).is_ok());
    }

    #[tokio::test]
    async fn teardown_leaves_the_placeholder() {
        let f = fixture();
        let mut v = f.view();
        v.refresh().await.unwrap();
        let pending = v.begin_submission(&v.draft("sent while leaving")).unwrap();
        let res = v.send_submission(&pending).await;
        v.teardown();
        let fetches = f.server.thread_fetches().len();

        let out = v.finish_submission(pending, res).await.unwrap();
        assert!(v.comments().contains(&out.placeholder));
        assert!(!v.comments().contains(&out.confirmed.reference));
        assert_eq!(f.server.thread_fetches().len(), fetches);
        assert_eq!(f.server.comment(&out.confirmed.reference), Some(out.confirmed));
    }

    #[tokio::test]
    async fn configured() {
        let f = fixture();
        f.server.seed_comment(&f.subject, Some(&f.theirs), "teru", "nested");
        let mut cfg = Config::new("http://localhost:8000");
        cfg.max_depth = 0;
        let mut v = ThreadView::from_config(f.server.clone(), &cfg, f.subject.clone(), f.root.clone())
            .logged_in(UserSummary::named("mob"), f.token.clone());
        v.refresh().await.unwrap();
        assert_eq!(texts(&v), ["theirs", "mine"]);

        let reply = v.draft("deep reply").reply_to(f.theirs.clone());
        let pending = v.begin_submission(&reply).unwrap();
        assert_eq!(v.comments().get(&pending.placeholder).unwrap().level, 0);
        let res = v.send_submission(&pending).await;
        v.finish_submission(pending, res).await.unwrap();
        assert_eq!(texts(&v), ["theirs", "mine"]);
    }
}
