use std::sync::Arc;

use crate::api::{Api, AuthToken, Error, VoteDirection, VoteTarget};

/// Change to apply to a locally displayed aggregate when the viewer's vote
/// goes from `old` to `new`, without re-reading the score from the server
pub fn score_delta(old: VoteDirection, new: VoteDirection) -> i64 {
    new.score() - old.score()
}

/// Direction to send when the viewer presses `pressed` while currently
/// holding `current`: pressing the held direction again retracts the vote.
///
/// This is the caller's decision; [`VoteClient`] sends whatever it is given.
pub fn toggle(current: VoteDirection, pressed: VoteDirection) -> VoteDirection {
    if current == pressed {
        VoteDirection::Neutral
    } else {
        pressed
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VoteOutcome {
    /// None if the server did not send the new aggregate back
    pub aggregate: Option<i64>,
    pub direction: VoteDirection,
}

/// Reads and writes the viewer's vote on a comment or an article. Keeps no
/// state: callers own whatever they display.
pub struct VoteClient<A> {
    api: Arc<A>,
}

impl<A: Api> VoteClient<A> {
    pub fn new(api: Arc<A>) -> VoteClient<A> {
        VoteClient { api }
    }

    /// A target the viewer never voted on reads as neutral
    pub async fn fetch_vote(
        &self,
        target: &VoteTarget,
        token: Option<&AuthToken>,
    ) -> Result<VoteDirection, Error> {
        let token = token.ok_or(Error::Unauthenticated)?;
        match self.api.fetch_vote(target, token).await {
            Ok(d) => Ok(d),
            Err(Error::NotFound) => {
                tracing::debug!(%target, "no vote cast yet");
                Ok(VoteDirection::Neutral)
            }
            Err(err) => {
                tracing::warn!(%target, ?err, "failed fetching vote");
                Err(err)
            }
        }
    }

    pub async fn set_vote(
        &self,
        target: &VoteTarget,
        direction: VoteDirection,
        token: Option<&AuthToken>,
    ) -> Result<VoteOutcome, Error> {
        let token = token.ok_or(Error::Unauthenticated)?;
        let aggregate = self
            .api
            .set_vote(target, direction, token)
            .await
            .map_err(|err| {
                tracing::warn!(%target, ?direction, ?err, "failed setting vote");
                err
            })?;
        Ok(VoteOutcome {
            aggregate,
            direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CommentRef, Subject, VoteDirection::*};
    use kaiwa_mock_server::MockServer;

    #[test]
    fn delta_table() {
        let expected = [
            (Neutral, Up, 1),
            (Neutral, Down, -1),
            (Up, Neutral, -1),
            (Down, Neutral, 1),
            (Up, Down, -2),
            (Down, Up, 2),
            (Up, Up, 0),
            (Down, Down, 0),
            (Neutral, Neutral, 0),
        ];
        for (old, new, delta) in expected {
            assert_eq!(score_delta(old, new), delta, "{old:?} -> {new:?}");
        }
    }

    #[test]
    fn deltas_compose() {
        bolero::check!()
            .with_type::<(i8, i8, i8)>()
            .cloned()
            .for_each(|(a, b, c)| {
                let dir = |x: i8| VoteDirection::ALL[x.rem_euclid(3) as usize];
                let (a, b, c) = (dir(a), dir(b), dir(c));
                assert_eq!(score_delta(a, b) + score_delta(b, c), score_delta(a, c));
            });
    }

    #[test]
    fn pressing_twice_retracts() {
        assert_eq!(toggle(Neutral, Up), Up);
        assert_eq!(toggle(Up, Up), Neutral);
        assert_eq!(toggle(Up, Down), Down);
        assert_eq!(toggle(Down, Down), Neutral);
    }

    fn setup() -> (Arc<MockServer>, AuthToken, VoteTarget) {
        let server = Arc::new(MockServer::new());
        let tok = server.add_user("mika");
        let c = server.seed_comment(&Subject::new("anime", "frieren"), None, "rin", "first!");
        (server, tok, VoteTarget::comment(&c))
    }

    #[tokio::test]
    async fn never_voted_reads_neutral() {
        let (server, tok, target) = setup();
        let client = VoteClient::new(server);
        assert_eq!(client.fetch_vote(&target, Some(&tok)).await, Ok(Neutral));
    }

    #[tokio::test]
    async fn set_then_fetch() {
        let (server, tok, target) = setup();
        let other = server.add_user("rin");
        let client = VoteClient::new(server);

        let o = client.set_vote(&target, Up, Some(&tok)).await.unwrap();
        assert_eq!(o, VoteOutcome { aggregate: Some(1), direction: Up });
        let o = client.set_vote(&target, Up, Some(&other)).await.unwrap();
        assert_eq!(o.aggregate, Some(2));
        assert_eq!(client.fetch_vote(&target, Some(&tok)).await, Ok(Up));

        let o = client.set_vote(&target, Down, Some(&tok)).await.unwrap();
        assert_eq!(o.aggregate, Some(0));
        assert_eq!(client.fetch_vote(&target, Some(&tok)).await, Ok(Down));
    }

    #[tokio::test]
    async fn other_failures_surface() {
        let (server, tok, _) = setup();
        let client = VoteClient::new(server);
        let missing = VoteTarget::comment(&CommentRef::new("nope"));
        assert_eq!(
            client.set_vote(&missing, Up, Some(&tok)).await,
            Err(Error::NotFound)
        );
        let bad = AuthToken(String::from("forged"));
        assert!(matches!(
            client.fetch_vote(&missing, Some(&bad)).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn needs_a_token() {
        let (server, _, target) = setup();
        let client = VoteClient::new(server.clone());
        assert_eq!(
            client.fetch_vote(&target, None).await,
            Err(Error::Unauthenticated)
        );
        assert_eq!(
            client.set_vote(&target, Up, None).await,
            Err(Error::Unauthenticated)
        );
        assert_eq!(server.vote_writes(), 0);
    }
}
