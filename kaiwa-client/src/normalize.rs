pub const SPOILER_OPEN: &str = ":::spoiler";
pub const SPOILER_CLOSE: &str = ":::";

/// Tidies up user-entered comment text.
///
/// Every line is trimmed, runs of blank lines are collapsed into a single one
/// and blank lines at both ends are dropped. A `:::spoiler` line followed later
/// by a `:::` line delimits a spoiler block: its body is tidied on its own, so
/// the fences always stay on their own lines right around the body.
pub fn normalize(raw: &str) -> String {
    let lines = raw.split('\n').map(str::trim).collect::<Vec<_>>();
    let mut res = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        if lines[i] == SPOILER_OPEN {
            if let Some(len) = lines[i + 1..].iter().position(|l| *l == SPOILER_CLOSE) {
                res.push(SPOILER_OPEN);
                res.extend(tidy(&lines[i + 1..i + 1 + len]));
                res.push(SPOILER_CLOSE);
                i += len + 2;
                continue;
            }
        }
        res.push(lines[i]);
        i += 1;
    }
    tidy(&res).join("\n")
}

/// Wraps the whole of `text` in a spoiler block, unless it already opens with one
pub fn wrap_spoiler(text: &str) -> String {
    if text.starts_with(SPOILER_OPEN) {
        text.to_string()
    } else {
        format!("{SPOILER_OPEN}\n{text}\n{SPOILER_CLOSE}")
    }
}

// Assumes lines are already trimmed
fn tidy<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let mut res: Vec<&str> = Vec::with_capacity(lines.len());
    for &l in lines {
        if l.is_empty() && res.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        res.push(l);
    }
    if res.last() == Some(&"") {
        res.pop();
    }
    res
}
