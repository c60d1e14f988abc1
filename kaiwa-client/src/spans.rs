use lazy_static::lazy_static;
use regex::Regex;

/// Shown in place of a spoiler body until the reader asks to see it
pub const SPOILER_PLACEHOLDER: &str = "[spoiler]";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Span {
    Plain(String),
    Bold(String),
    Italic(String),
    Code(String),
    Link { text: String, url: String },
    Spoiler(String),
}

impl Span {
    /// Visible text, markup delimiters removed
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(t)
            | Span::Bold(t)
            | Span::Italic(t)
            | Span::Code(t)
            | Span::Spoiler(t)
            | Span::Link { text: t, .. } => t,
        }
    }

    pub fn is_spoiler(&self) -> bool {
        matches!(self, Span::Spoiler(_))
    }
}

// Declaration order is the precedence between matches starting at the same offset
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Kind {
    Spoiler,
    Link,
    Bold,
    Italic,
    Code,
}

lazy_static! {
    static ref SPOILER: Regex =
        Regex::new(r"(?ms)^:::spoiler\n(?:(.*?)\n)??:::$").expect("spoiler regex");
    static ref LINK: Regex = Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").expect("link regex");
    static ref BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").expect("bold regex");
    static ref ITALIC: Regex = Regex::new(r"\*([^*\n]+)\*").expect("italic regex");
    static ref CODE: Regex = Regex::new(r"`([^`\n]+)`").expect("code regex");
}

struct Match {
    start: usize,
    end: usize,
    kind: Kind,
    span: Span,
}

fn scan(re: &Regex, kind: Kind, text: &str, res: &mut Vec<Match>) {
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let group = |i| caps.get(i).map_or("", |m| m.as_str()).to_string();
        let span = match kind {
            Kind::Spoiler => Span::Spoiler(group(1)),
            Kind::Link => Span::Link {
                text: group(1),
                url: group(2),
            },
            Kind::Bold => Span::Bold(group(1)),
            Kind::Italic => Span::Italic(group(1)),
            Kind::Code => Span::Code(group(1)),
        };
        res.push(Match {
            start: whole.start(),
            end: whole.end(),
            kind,
            span,
        });
    }
}

/// Splits comment text into displayable spans.
///
/// Each kind of markup is looked for independently, then the matches are
/// laid out by start offset. At equal offsets spoilers win over links, links
/// over bold, bold over italic and italic over code. A match that starts inside
/// one already laid out is dropped, so markup never nests.
pub fn parse_spans(text: &str) -> Vec<Span> {
    let mut matches = Vec::new();
    scan(&SPOILER, Kind::Spoiler, text, &mut matches);
    scan(&LINK, Kind::Link, text, &mut matches);
    scan(&BOLD, Kind::Bold, text, &mut matches);
    scan(&ITALIC, Kind::Italic, text, &mut matches);
    scan(&CODE, Kind::Code, text, &mut matches);
    matches.sort_unstable_by_key(|m| (m.start, m.kind));

    let mut res = Vec::with_capacity(matches.len() * 2 + 1);
    let mut pos = 0;
    for m in matches {
        if m.start < pos {
            continue;
        }
        if m.start > pos {
            res.push(Span::Plain(text[pos..m.start].to_string()));
        }
        res.push(m.span);
        pos = m.end;
    }
    if pos < text.len() {
        res.push(Span::Plain(text[pos..].to_string()));
    }
    res
}

/// Spans of one comment, along with which spoilers the reader opened
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedText {
    spans: Vec<Span>,
    revealed: Vec<bool>,
}

impl RenderedText {
    pub fn new(text: &str) -> RenderedText {
        let spans = parse_spans(text);
        RenderedText {
            revealed: vec![false; spans.len()],
            spans,
        }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_revealed(&self, idx: usize) -> bool {
        self.revealed.get(idx).copied().unwrap_or(false)
    }

    /// Flips spoiler `idx` open or closed, returning whether it is now open.
    /// Non-spoiler spans stay as they are.
    pub fn toggle(&mut self, idx: usize) -> bool {
        match self.spans.get(idx) {
            Some(s) if s.is_spoiler() => {
                self.revealed[idx] = !self.revealed[idx];
                self.revealed[idx]
            }
            _ => false,
        }
    }

    /// What each span currently shows
    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().zip(&self.revealed).map(|(s, open)| match s {
            Span::Spoiler(_) if !open => SPOILER_PLACEHOLDER,
            s => s.text(),
        })
    }

    pub fn display(&self) -> String {
        self.visible().collect()
    }
}
