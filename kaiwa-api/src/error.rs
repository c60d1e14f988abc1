use http::StatusCode;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Comment too short: {actual} characters, at least {min} required")]
    TooShort { min: usize, actual: usize },

    #[error("{0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Thread unavailable: {0}")]
    ThreadUnavailable(String),

    #[error("Not found")]
    NotFound,
}

impl Error {
    /// Converts a non-success answer from the server
    pub fn from_response(status: StatusCode, body: &[u8]) -> Error {
        if status == StatusCode::NOT_FOUND {
            return Error::NotFound;
        }
        match detail(body) {
            Some(msg) => Error::Validation(msg),
            None => Error::Network(format!("server answered with status {}", status.as_u16())),
        }
    }

    pub fn malformed(what: &str) -> Error {
        Error::Network(format!("malformed {what} in server response"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}

fn detail(body: &[u8]) -> Option<String> {
    let data: serde_json::Value = serde_json::from_slice(body).ok()?;
    let detail = data.get("detail").or_else(|| data.get("message"))?;
    match detail {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        // list of field errors, each with its own message
        serde_json::Value::Array(items) => {
            let msgs = items
                .iter()
                .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                .collect::<Vec<_>>();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    }
}
