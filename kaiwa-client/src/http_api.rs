use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};

use crate::{
    api::{
        wire::{RawComment, RawPage, RawThread, RawVote, RawVoteScore},
        Api, AuthToken, Comment, CommentPage, CommentRef, Error, NewComment, Subject, Thread,
        VoteDirection, VoteTarget,
    },
    Config,
};

const AUTH_HEADER: &str = "auth";

/// [`Api`] over the remote service's HTTP JSON interface
pub struct HttpApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpApi {
    pub fn new(cfg: &Config) -> anyhow::Result<HttpApi> {
        let base = Url::parse(&cfg.base_url)
            .with_context(|| format!("parsing API base URL {:?}", cfg.base_url))?;
        if base.cannot_be_a_base() {
            bail!("API base URL {:?} cannot have a path", cfg.base_url);
        }
        let mut client = reqwest::Client::builder();
        if let Some(t) = cfg.timeout {
            client = client.timeout(t);
        }
        Ok(HttpApi {
            client: client.build().context("building HTTP client")?,
            base,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], token: Option<&AuthToken>) -> RequestBuilder {
        let req = self.client.request(method, self.url(segments));
        match token {
            Some(t) => req.header(AUTH_HEADER, &t.0),
            None => req,
        }
    }

    /// Body of a successful answer
    async fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, Error> {
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        if !status.is_success() {
            tracing::debug!(%status, "server answered with an error");
            return Err(Error::from_response(status, &body));
        }
        Ok(body.to_vec())
    }

    async fn json<R>(&self, req: RequestBuilder, what: &str) -> Result<R, Error>
    where
        R: for<'de> serde::Deserialize<'de>,
    {
        let body = self.send(req).await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(what, err = %e, "unexpected server answer");
            Error::malformed(what)
        })
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn fetch_vote(
        &self,
        target: &VoteTarget,
        token: &AuthToken,
    ) -> Result<VoteDirection, Error> {
        let req = self.request(
            Method::GET,
            &["vote", target.kind.as_str(), &target.reference],
            Some(token),
        );
        self.json::<RawVote>(req, "vote").await?.into_direction()
    }

    async fn set_vote(
        &self,
        target: &VoteTarget,
        direction: VoteDirection,
        token: &AuthToken,
    ) -> Result<Option<i64>, Error> {
        let req = self
            .request(
                Method::PUT,
                &["vote", target.kind.as_str(), &target.reference],
                Some(token),
            )
            .json(&serde_json::json!({ "score": direction }));
        let body = self.send(req).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let score: RawVoteScore =
            serde_json::from_slice(&body).map_err(|_| Error::malformed("vote score"))?;
        Ok(score.aggregate())
    }

    async fn create_comment(
        &self,
        subject: &Subject,
        new: &NewComment,
        token: &AuthToken,
    ) -> Result<Comment, Error> {
        let req = self
            .request(
                Method::PUT,
                &["comments", &subject.content_type, &subject.slug],
                Some(token),
            )
            .json(new);
        self.json::<RawComment>(req, "comment").await?.into_comment()
    }

    async fn delete_comment(&self, reference: &CommentRef, token: &AuthToken) -> Result<(), Error> {
        let req = self.request(Method::DELETE, &["comments", reference.as_str()], Some(token));
        self.send(req).await?;
        Ok(())
    }

    async fn fetch_thread(&self, reference: &CommentRef) -> Result<Thread, Error> {
        let req = self.request(
            Method::GET,
            &["comments", "thread", reference.as_str()],
            None,
        );
        self.json::<RawThread>(req, "thread").await?.into_thread()
    }

    async fn fetch_list(
        &self,
        subject: &Subject,
        page: u32,
        size: u32,
    ) -> Result<CommentPage, Error> {
        let req = self
            .request(
                Method::GET,
                &["comments", &subject.content_type, &subject.slug, "list"],
                None,
            )
            .query(&[("page", page), ("size", size)]);
        self.json::<RawPage>(req, "comment list")
            .await?
            .into_page(page, size)
    }
}
