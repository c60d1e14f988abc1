use std::collections::HashSet;

use crate::{
    api::{Comment, CommentRef},
    CommentOrder,
};

/// The comments currently on screen, in display order.
///
/// A reference appears at most once.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentList {
    comments: Vec<Comment>,
}

impl CommentList {
    pub fn new() -> CommentList {
        CommentList::default()
    }

    pub fn from_comments(comments: Vec<Comment>) -> CommentList {
        let mut res = CommentList::new();
        res.replace_all(comments);
        res
    }

    /// Swaps the whole content, keeping the first occurrence of any duplicate
    pub fn replace_all(&mut self, comments: Vec<Comment>) {
        let mut seen = HashSet::with_capacity(comments.len());
        self.comments = comments
            .into_iter()
            .filter(|c| {
                let fresh = seen.insert(c.reference.clone());
                if !fresh {
                    tracing::warn!(reference = %c.reference, "dropping duplicate comment");
                }
                fresh
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter()
    }

    pub fn as_slice(&self) -> &[Comment] {
        &self.comments
    }

    fn position(&self, r: &CommentRef) -> Option<usize> {
        self.comments.iter().position(|c| c.reference == *r)
    }

    pub fn get(&self, r: &CommentRef) -> Option<&Comment> {
        self.position(r).map(|i| &self.comments[i])
    }

    pub fn contains(&self, r: &CommentRef) -> bool {
        self.position(r).is_some()
    }

    /// Comments that the server did not confirm yet
    pub fn pending(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| c.is_optimistic)
    }

    /// Shows `c` right after the last displayed descendant of its parent, or
    /// at the end if the parent is not displayed. Returns false, leaving the
    /// list untouched, if `c`'s reference is already displayed.
    pub fn insert_pending(&mut self, c: Comment) -> bool {
        if self.contains(&c.reference) {
            return false;
        }
        let at = match c.parent.as_ref().and_then(|p| self.position(p)) {
            None => self.comments.len(),
            Some(p) => {
                let level = self.comments[p].level;
                self.comments[p + 1..]
                    .iter()
                    .position(|d| d.level <= level)
                    .map_or(self.comments.len(), |n| p + 1 + n)
            }
        };
        self.comments.insert(at, c);
        true
    }

    pub fn remove(&mut self, r: &CommentRef) -> Option<Comment> {
        self.position(r).map(|i| self.comments.remove(i))
    }

    pub fn set_score(&mut self, r: &CommentRef, score: i64) -> bool {
        match self.position(r) {
            Some(i) => {
                self.comments[i].vote_score = score;
                true
            }
            None => false,
        }
    }

    pub fn adjust_score(&mut self, r: &CommentRef, delta: i64) -> bool {
        match self.position(r) {
            Some(i) => {
                self.comments[i].vote_score += delta;
                true
            }
            None => false,
        }
    }

    pub fn sort(&mut self, order: CommentOrder) {
        order.sort(&mut self.comments);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn comment(r: &str, parent: Option<&str>, level: usize) -> Comment {
        Comment {
            reference: CommentRef::new(r),
            text: format!("text of {r}"),
            created: 1_700_000_000,
            author: None,
            parent: parent.map(CommentRef::new),
            level,
            parent_info: None,
            vote_score: 0,
            is_optimistic: false,
            is_edited: false,
        }
    }

    fn refs(l: &CommentList) -> Vec<&str> {
        l.iter().map(|c| c.reference.as_str()).collect()
    }

    #[test]
    fn duplicates_are_dropped() {
        let l = CommentList::from_comments(vec![
            comment("a", None, 0),
            comment("b", None, 0),
            comment("a", None, 0),
        ]);
        assert_eq!(refs(&l), ["a", "b"]);
    }

    #[test]
    fn pending_goes_after_parent_subtree() {
        let mut l = CommentList::from_comments(vec![
            comment("a", None, 0),
            comment("a1", Some("a"), 1),
            comment("a1x", Some("a1"), 2),
            comment("b", None, 0),
        ]);
        assert!(l.insert_pending(comment("new", Some("a"), 1)));
        assert_eq!(refs(&l), ["a", "a1", "a1x", "new", "b"]);
        assert!(l.insert_pending(comment("top", Some("root"), 0)));
        assert_eq!(refs(&l), ["a", "a1", "a1x", "new", "b", "top"]);
        assert!(l.insert_pending(comment("last", Some("b"), 1)));
        assert_eq!(refs(&l), ["a", "a1", "a1x", "new", "b", "last", "top"]);
        assert!(!l.insert_pending(comment("a1", None, 0)));
    }

    #[test]
    fn scores() {
        let mut l = CommentList::from_comments(vec![comment("a", None, 0)]);
        assert!(l.adjust_score(&CommentRef::new("a"), 2));
        assert!(l.adjust_score(&CommentRef::new("a"), -1));
        assert_eq!(l.get(&CommentRef::new("a")).unwrap().vote_score, 1);
        assert!(l.set_score(&CommentRef::new("a"), 40));
        assert_eq!(l.get(&CommentRef::new("a")).unwrap().vote_score, 40);
        assert!(!l.set_score(&CommentRef::new("zz"), 1));
    }
}
