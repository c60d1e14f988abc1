use std::sync::Arc;

use crate::{
    api::{Api, Comment, CommentPage, Error, Pagination, Subject},
    Config, FifoCache,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PageKey {
    pub subject: Subject,
    pub page: u32,
    pub size: u32,
}

/// Walks the flat top-level comment list of a subject, page by page
pub struct CommentPager<A> {
    api: Arc<A>,
    subject: Subject,
    size: u32,
    next: u32,
    last: Option<Pagination>,
    cache: FifoCache<PageKey, CommentPage>,
}

impl<A: Api> CommentPager<A> {
    pub fn new(api: Arc<A>, subject: Subject) -> CommentPager<A> {
        CommentPager {
            api,
            subject,
            size: DEFAULT_PAGE_SIZE,
            next: 1,
            last: None,
            cache: FifoCache::new(DEFAULT_CACHE_CAPACITY),
        }
    }

    /// Page size and cache capacity taken from `cfg`
    pub fn from_config(api: Arc<A>, cfg: &Config, subject: Subject) -> CommentPager<A> {
        CommentPager::new(api, subject)
            .with_page_size(cfg.page_size)
            .with_cache(FifoCache::new(cfg.cache_capacity))
    }

    pub fn with_page_size(mut self, size: u32) -> CommentPager<A> {
        self.size = size.max(1);
        self
    }

    pub fn with_cache(mut self, cache: FifoCache<PageKey, CommentPage>) -> CommentPager<A> {
        self.cache = cache;
        self
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// True until a page reported being the last one
    pub fn has_more(&self) -> bool {
        self.last.map_or(true, |p| p.has_more())
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.last
    }

    pub async fn fetch_page(&mut self, page: u32) -> Result<CommentPage, Error> {
        let key = PageKey {
            subject: self.subject.clone(),
            page,
            size: self.size,
        };
        if let Some(p) = self.cache.get(&key) {
            tracing::trace!(?key, "comment page served from cache");
            return Ok(p.clone());
        }
        let res = self
            .api
            .fetch_list(&self.subject, page, self.size)
            .await
            .map_err(|err| {
                tracing::warn!(?key, ?err, "failed fetching comment page");
                err
            })?;
        if let Some((evicted, _)) = self.cache.insert(key, res.clone()) {
            tracing::trace!(?evicted, "evicted comment page from cache");
        }
        Ok(res)
    }

    /// Returns None once the last page was handed out
    pub async fn next_page(&mut self) -> Result<Option<Vec<Comment>>, Error> {
        if !self.has_more() {
            return Ok(None);
        }
        let page = self.fetch_page(self.next).await?;
        self.last = Some(page.pagination);
        self.next += 1;
        Ok(Some(page.comments))
    }

    /// Start over from the first page, still using cached pages
    pub fn restart(&mut self) {
        self.next = 1;
        self.last = None;
    }

    /// Forget every cached page of this subject
    pub fn invalidate(&mut self) {
        let subject = &self.subject;
        self.cache.retain(|k| k.subject != *subject);
    }

    /// Start over from the first page, re-reading everything from the server
    pub fn refresh(&mut self) {
        self.invalidate();
        self.restart();
    }
}
