use std::cmp::Reverse;

use crate::api::Comment;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CommentOrder {
    #[default]
    Oldest,
    Newest,
}

impl CommentOrder {
    /// Chronological re-sort of a flattened thread; server order is not
    /// chronological across branches
    pub fn sort(&self, comments: &mut [Comment]) {
        match self {
            CommentOrder::Oldest => comments.sort_by(|a, b| {
                (a.created, &a.reference).cmp(&(b.created, &b.reference))
            }),
            CommentOrder::Newest => comments.sort_by(|a, b| {
                (Reverse(a.created), &a.reference).cmp(&(Reverse(b.created), &b.reference))
            }),
        }
    }
}
