use std::{fmt, str::FromStr};

use crate::CommentRef;

/// The current viewer's own vote, as opposed to the aggregate score
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteDirection {
    Down,
    #[default]
    Neutral,
    Up,
}

impl VoteDirection {
    pub fn score(self) -> i64 {
        match self {
            VoteDirection::Down => -1,
            VoteDirection::Neutral => 0,
            VoteDirection::Up => 1,
        }
    }

    pub const ALL: [VoteDirection; 3] =
        [VoteDirection::Down, VoteDirection::Neutral, VoteDirection::Up];
}

impl TryFrom<i64> for VoteDirection {
    type Error = String;

    fn try_from(score: i64) -> Result<VoteDirection, String> {
        match score {
            -1 => Ok(VoteDirection::Down),
            0 => Ok(VoteDirection::Neutral),
            1 => Ok(VoteDirection::Up),
            s => Err(format!("vote score {s} is not one of -1, 0, 1")),
        }
    }
}

impl From<VoteDirection> for i64 {
    fn from(d: VoteDirection) -> i64 {
        d.score()
    }
}

impl FromStr for VoteDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<VoteDirection, String> {
        match s {
            "up" | "+1" | "1" => Ok(VoteDirection::Up),
            "down" | "-1" => Ok(VoteDirection::Down),
            "none" | "neutral" | "0" => Ok(VoteDirection::Neutral),
            _ => Err(format!("unknown vote direction {s:?}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Comment,
    Article,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Comment => "comment",
            TargetKind::Article => "article",
        }
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<TargetKind, String> {
        match s {
            "comment" => Ok(TargetKind::Comment),
            "article" => Ok(TargetKind::Article),
            _ => Err(format!("unknown vote target kind {s:?}")),
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VoteTarget {
    pub kind: TargetKind,
    pub reference: String,
}

impl VoteTarget {
    pub fn comment(r: &CommentRef) -> VoteTarget {
        VoteTarget {
            kind: TargetKind::Comment,
            reference: r.0.clone(),
        }
    }

    pub fn article(slug: impl Into<String>) -> VoteTarget {
        VoteTarget {
            kind: TargetKind::Article,
            reference: slug.into(),
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.reference)
    }
}
