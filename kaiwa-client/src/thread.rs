use std::{collections::HashSet, sync::Arc};

use async_recursion::async_recursion;

use crate::{
    api::{Api, Comment, CommentRef, Error, ParentInfo},
    Liveness,
};

pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Pulls a whole reply tree out of the one-level-at-a-time thread endpoint,
/// and flattens it depth-first.
pub struct ThreadFetcher<A> {
    api: Arc<A>,
    max_depth: usize,
    alive: Liveness,
}

impl<A: Api> ThreadFetcher<A> {
    pub fn new(api: Arc<A>) -> ThreadFetcher<A> {
        ThreadFetcher {
            api,
            max_depth: DEFAULT_MAX_DEPTH,
            alive: Liveness::new(),
        }
    }

    /// Stop issuing requests once `alive` is killed
    pub fn with_liveness(mut self, alive: Liveness) -> ThreadFetcher<A> {
        self.alive = alive;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> ThreadFetcher<A> {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Every comment of the thread below `root`, each immediately followed by
    /// its own descendants, in server order.
    ///
    /// Only failing to list `root`'s direct replies is an error. A deeper
    /// branch that cannot be fetched is cut short, and replies at
    /// `max_depth` are returned without their children.
    ///
    /// Once the liveness flag is killed no further request goes out, and
    /// whatever was collected so far is returned.
    pub async fn fetch_thread(&self, root: &CommentRef) -> Result<Vec<Comment>, Error> {
        if !self.alive.is_alive() {
            tracing::debug!(%root, "not fetching thread of a torn down view");
            return Ok(Vec::new());
        }
        let thread = self.api.fetch_thread(root).await.map_err(|err| {
            tracing::warn!(%root, ?err, "failed fetching thread root replies");
            Error::ThreadUnavailable(err.to_string())
        })?;
        let root_info = match thread.root {
            Some(c) => c.as_parent(),
            None => ParentInfo {
                reference: root.clone(),
                username: None,
            },
        };
        let mut seen = HashSet::new();
        seen.insert(root.clone());
        let mut res = Vec::new();
        self.flatten(thread.replies, 0, &root_info, &mut seen, &mut res)
            .await;
        tracing::debug!(%root, num_comments = res.len(), "fetched thread");
        Ok(res)
    }

    #[async_recursion]
    async fn flatten(
        &self,
        replies: Vec<Comment>,
        level: usize,
        parent: &ParentInfo,
        seen: &mut HashSet<CommentRef>,
        res: &mut Vec<Comment>,
    ) {
        if level > self.max_depth {
            return;
        }
        for mut reply in replies {
            if !seen.insert(reply.reference.clone()) {
                tracing::warn!(reference = %reply.reference, "comment seen twice in thread");
                continue;
            }
            reply.level = level;
            reply.parent_info = Some(parent.clone());
            let this = reply.as_parent();
            res.push(reply);
            if level == self.max_depth {
                continue;
            }
            if !self.alive.is_alive() {
                tracing::debug!(reference = %this.reference, "torn down, not fetching deeper");
                return;
            }
            let children = match self.api.fetch_thread(&this.reference).await {
                Ok(t) => t.replies,
                Err(err) => {
                    tracing::debug!(reference = %this.reference, ?err, "treating unfetchable branch as leaf");
                    continue;
                }
            };
            self.flatten(children, level + 1, &this, seen, res).await;
        }
    }
}
