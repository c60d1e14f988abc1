use std::{str::FromStr, time::Duration};

use anyhow::{anyhow, Context};

use crate::{DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_DEPTH, DEFAULT_PAGE_SIZE};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Without trailing slash
    pub base_url: String,

    /// None keeps the HTTP client's default
    pub timeout: Option<Duration>,

    pub page_size: u32,
    pub max_depth: usize,
    pub cache_capacity: usize,
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Config {
        let base_url = base_url.into();
        Config {
            base_url: String::from(base_url.trim_end_matches('/')),
            timeout: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn from_env() -> anyhow::Result<Config> {
        Config::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let base_url = lookup("KAIWA_API_URL")
            .ok_or_else(|| anyhow!("KAIWA_API_URL environment variable is not set"))?;
        let mut cfg = Config::new(base_url);
        if let Some(secs) = parse_var(&lookup, "KAIWA_TIMEOUT_SECS")? {
            cfg.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(size) = parse_var(&lookup, "KAIWA_PAGE_SIZE")? {
            cfg.page_size = size;
        }
        if let Some(depth) = parse_var(&lookup, "KAIWA_MAX_DEPTH")? {
            cfg.max_depth = depth;
        }
        Ok(cfg)
    }
}

fn parse_var<T>(lookup: impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|v| {
            v.trim()
                .parse()
                .with_context(|| format!("parsing {name} environment variable {v:?}"))
        })
        .transpose()
}
