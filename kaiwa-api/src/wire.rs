//! Server JSON shapes, and their conversion into the canonical types.
//!
//! The remote service is not consistent about field names or encodings
//! depending on the endpoint. Everything that varies is absorbed here so the
//! rest of the client only ever sees [`Comment`], [`Thread`] and friends.

use crate::{
    Comment, CommentPage, CommentRef, Error, Pagination, Thread, UserSummary, VoteDirection,
};

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_ref(self) -> CommentRef {
        match self {
            RawId::Text(s) => CommentRef(s),
            RawId::Number(n) => CommentRef(n.to_string()),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Seconds(i64),
    Text(String),
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum RawParent {
    Reference(RawId),
    Object {
        reference: Option<RawId>,
        id: Option<RawId>,
    },
}

impl RawParent {
    fn into_ref(self) -> Option<CommentRef> {
        match self {
            RawParent::Reference(r) => Some(r.into_ref()),
            RawParent::Object { reference, id } => reference.or(id).map(RawId::into_ref),
        }
    }
}

// Servers may send both spellings of a field at once, so each spelling gets
// its own field instead of a serde alias
#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawUser {
    pub username: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub avatar_url: Option<String>,
}

impl RawUser {
    fn into_user(self) -> Option<UserSummary> {
        Some(UserSummary {
            username: self.username.or(self.name)?,
            avatar: self.avatar.or(self.avatar_url),
        })
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawComment {
    pub reference: Option<RawId>,
    pub id: Option<RawId>,
    pub text: Option<String>,
    pub comment: Option<String>,
    pub created: Option<RawTimestamp>,
    pub author: Option<RawUser>,
    pub user: Option<RawUser>,
    pub parent: Option<RawParent>,
    pub vote_score: Option<i64>,
    pub score: Option<i64>,
    pub is_edited: Option<bool>,
}

impl RawComment {
    pub fn into_comment(self) -> Result<Comment, Error> {
        let reference = self
            .reference
            .or(self.id)
            .ok_or_else(|| Error::malformed("comment without reference"))?
            .into_ref();
        let text = self
            .text
            .or(self.comment)
            .ok_or_else(|| Error::malformed("comment without text"))?;
        let created = match self.created {
            None => 0,
            Some(RawTimestamp::Seconds(s)) => s,
            Some(RawTimestamp::Text(t)) => t
                .trim()
                .parse()
                .map_err(|_| Error::malformed("comment timestamp"))?,
        };
        Ok(Comment {
            reference,
            text,
            created,
            author: self.author.or(self.user).and_then(RawUser::into_user),
            parent: self.parent.and_then(RawParent::into_ref),
            level: 0,
            parent_info: None,
            vote_score: self.vote_score.or(self.score).unwrap_or(0),
            is_optimistic: false,
            is_edited: self.is_edited.unwrap_or(false),
        })
    }
}

fn convert_all(raw: Vec<RawComment>) -> Result<Vec<Comment>, Error> {
    raw.into_iter().map(RawComment::into_comment).collect()
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawThread {
    pub root: Option<RawComment>,
    pub comment: Option<RawComment>,
    pub replies: Option<Vec<RawComment>>,
}

impl RawThread {
    pub fn into_thread(self) -> Result<Thread, Error> {
        Ok(Thread {
            root: self
                .root
                .or(self.comment)
                .map(RawComment::into_comment)
                .transpose()?,
            replies: convert_all(self.replies.unwrap_or_default())?,
        })
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct RawPagination {
    pub page: Option<u32>,
    pub current: Option<u32>,
    pub pages: Option<u32>,
    pub last: Option<u32>,
    pub size: Option<u32>,
    pub total: Option<u64>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawPage {
    pub list: Option<Vec<RawComment>>,
    pub results: Option<Vec<RawComment>>,
    #[serde(default)]
    pub pagination: RawPagination,
}

impl RawPage {
    /// `requested` fills in whatever the server left out of its pagination block
    pub fn into_page(self, requested: u32, size: u32) -> Result<CommentPage, Error> {
        let comments = convert_all(self.list.or(self.results).unwrap_or_default())?;
        let p = self.pagination;
        let page = p.page.or(p.current).unwrap_or(requested);
        Ok(CommentPage {
            pagination: Pagination {
                page,
                // without a page count, a full page means there may be another one
                pages: p.pages.or(p.last).unwrap_or(if comments.len() as u32 >= size {
                    page + 1
                } else {
                    page
                }),
                size: p.size.unwrap_or(size),
                total: p.total,
            },
            comments,
        })
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawVote {
    pub score: i64,
}

impl RawVote {
    pub fn into_direction(self) -> Result<VoteDirection, Error> {
        VoteDirection::try_from(self.score).map_err(|_| Error::malformed("vote score"))
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RawVoteScore {
    pub vote_score: Option<i64>,
    pub score: Option<i64>,
}

impl RawVoteScore {
    pub fn aggregate(&self) -> Option<i64> {
        self.vote_score.or(self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Comment, Error> {
        serde_json::from_str::<RawComment>(json)
            .expect("deserializing raw comment")
            .into_comment()
    }

    #[test]
    fn canonical_shape() {
        let c = parse(
            r#"{
                "reference": "abc",
                "text": "hello",
                "created": 1700000000,
                "author": {"username": "mika", "avatar": "https://img/m.png"},
                "parent": null,
                "vote_score": 3,
                "is_edited": true
            }"#,
        )
        .unwrap();
        assert_eq!(c.reference, CommentRef::new("abc"));
        assert_eq!(c.created, 1_700_000_000);
        assert_eq!(c.author_name(), Some("mika"));
        assert_eq!(c.parent, None);
        assert_eq!(c.vote_score, 3);
        assert!(c.is_edited);
        assert!(!c.is_optimistic);
        assert_eq!(c.level, 0);
    }

    #[test]
    fn alternate_field_names() {
        let c = parse(
            r#"{
                "id": 17,
                "comment": "hi",
                "created": "1700000001",
                "user": {"name": "rin", "avatar_url": null},
                "parent": {"id": "p1"},
                "score": -2
            }"#,
        )
        .unwrap();
        assert_eq!(c.reference, CommentRef::new("17"));
        assert_eq!(c.text, "hi");
        assert_eq!(c.created, 1_700_000_001);
        assert_eq!(c.author_name(), Some("rin"));
        assert_eq!(c.parent, Some(CommentRef::new("p1")));
        assert_eq!(c.vote_score, -2);
        assert!(!c.is_edited);
    }

    #[test]
    fn parent_as_plain_reference() {
        let c = parse(r#"{"reference": "a", "text": "t", "parent": "p2"}"#).unwrap();
        assert_eq!(c.parent, Some(CommentRef::new("p2")));
    }

    #[test]
    fn malformed_comments() {
        assert!(matches!(
            parse(r#"{"text": "orphan"}"#),
            Err(Error::Network(_))
        ));
        assert!(matches!(
            parse(r#"{"reference": "a", "text": "t", "created": "yesterday"}"#),
            Err(Error::Network(_))
        ));
    }

    #[test]
    fn thread_without_replies() {
        let t: RawThread = serde_json::from_str(r#"{"replies": null}"#).unwrap();
        assert_eq!(t.into_thread().unwrap(), Thread::default());
    }

    #[test]
    fn page_shapes() {
        let p: RawPage = serde_json::from_str(
            r#"{"results": [{"reference": "a", "text": "t"}], "pagination": {"current": 2, "last": 4}}"#,
        )
        .unwrap();
        let p = p.into_page(2, 10).unwrap();
        assert_eq!(p.comments.len(), 1);
        assert_eq!(p.pagination.page, 2);
        assert_eq!(p.pagination.pages, 4);
        assert_eq!(p.pagination.size, 10);

        let p: RawPage = serde_json::from_str(r#"{"list": []}"#).unwrap();
        let p = p.into_page(1, 10).unwrap();
        assert!(!p.pagination.has_more());
    }

    #[test]
    fn vote_scores() {
        let v: RawVote = serde_json::from_str(r#"{"score": -1}"#).unwrap();
        assert_eq!(v.into_direction(), Ok(VoteDirection::Down));
        let v: RawVote = serde_json::from_str(r#"{"score": 5}"#).unwrap();
        assert!(v.into_direction().is_err());
        let s: RawVoteScore = serde_json::from_str(r#"{"vote_score": 12}"#).unwrap();
        assert_eq!(s.aggregate(), Some(12));
        let s: RawVoteScore = serde_json::from_str(r#"{"score": 4, "vote_score": 7}"#).unwrap();
        assert_eq!(s.aggregate(), Some(7));
        let s: RawVoteScore = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert_eq!(s.aggregate(), None);
    }

    #[test]
    fn both_spellings_at_once() {
        let c = parse(
            r#"{
                "id": 3,
                "reference": "abc",
                "text": "hi",
                "comment": "ignored",
                "author": {"username": "mika", "name": "Mika K."},
                "user": {"name": "someone else"},
                "parent": {"id": 1, "reference": "p9"},
                "score": 1,
                "vote_score": 8
            }"#,
        )
        .unwrap();
        assert_eq!(c.reference, CommentRef::new("abc"));
        assert_eq!(c.text, "hi");
        assert_eq!(c.author_name(), Some("mika"));
        assert_eq!(c.parent, Some(CommentRef::new("p9")));
        assert_eq!(c.vote_score, 8);

        let t: RawThread = serde_json::from_str(
            r#"{"root": {"reference": "r", "text": "t"}, "comment": {"id": 1, "text": "u"},
                "replies": [{"id": 3, "reference": "abc", "text": "hi"}]}"#,
        )
        .unwrap();
        let t = t.into_thread().unwrap();
        assert_eq!(t.root.unwrap().reference, CommentRef::new("r"));
        assert_eq!(t.replies[0].reference, CommentRef::new("abc"));

        let p: RawPage = serde_json::from_str(
            r#"{"list": [{"id": 3, "reference": "abc", "text": "hi"}], "results": [],
                "pagination": {"page": 1, "current": 9, "pages": 2, "last": 9}}"#,
        )
        .unwrap();
        let p = p.into_page(1, 20).unwrap();
        assert_eq!(p.comments.len(), 1);
        assert_eq!((p.pagination.page, p.pagination.pages), (1, 2));
    }

    #[test]
    fn arbitrary_payloads_never_panic() {
        bolero::check!()
            .with_type::<(String, i64, bool)>()
            .for_each(|(text, created, edited)| {
                let json = serde_json::json!({
                    "id": created,
                    "comment": text,
                    "created": text,
                    "parent": { "id": text },
                    "is_edited": edited,
                });
                if let Ok(raw) = serde_json::from_value::<RawComment>(json) {
                    if let Ok(c) = raw.into_comment() {
                        assert_eq!(c.reference.as_str(), created.to_string());
                        assert_eq!(&c.text, text);
                    }
                }
            });
    }
}
