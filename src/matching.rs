use std::time::Duration;

use anyhow::{bail, Result};
use tracing::{debug, warn};

use heartline_common::{MatchStateKind, ServerFrame};

use crate::api::Api;
use crate::channel::{ChannelEvent, SessionChannel};

/// Where the wait ended up. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    Failed,
}

/// What a single signal did to the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    /// This signal won the race; act on it.
    Resolved(MatchOutcome),

    /// Local state may be stale — issue a fresh status poll.
    Resync,

    /// Nothing to do (still waiting, or already resolved).
    Ignored,
}

/// The wait itself: `Waiting -> {Matched, Failed}`, first resolution wins.
///
/// The status poll and the live channel are two independent sources of truth
/// for the same outcome, so every signal funnels through the check-and-set
/// guard here; whichever resolves first wins and the rest are no-ops.
#[derive(Debug, Default)]
pub struct MatchWait {
    outcome: Option<MatchOutcome>,
}

impl MatchWait {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    fn resolve(&mut self, outcome: MatchOutcome) -> MatchStep {
        if self.outcome.is_some() {
            return MatchStep::Ignored;
        }
        self.outcome = Some(outcome);
        MatchStep::Resolved(outcome)
    }

    /// Feed one inbound live-channel frame through the guard.
    pub fn apply_frame(&mut self, frame: &ServerFrame) -> MatchStep {
        if self.outcome.is_some() {
            return MatchStep::Ignored;
        }
        match frame {
            ServerFrame::Matched => self.resolve(MatchOutcome::Matched),
            ServerFrame::Failed => self.resolve(MatchOutcome::Failed),
            // Anything else means we may have missed a transition.
            ServerFrame::Message { .. } | ServerFrame::Unrecognized => MatchStep::Resync,
        }
    }

    /// The channel dropping is itself a resync trigger: the transition may
    /// have happened exactly as the connection died.
    pub fn apply_close(&mut self) -> MatchStep {
        if self.outcome.is_some() {
            return MatchStep::Ignored;
        }
        MatchStep::Resync
    }

    /// Feed one point-in-time poll result through the guard.
    pub fn apply_state(&mut self, state: MatchStateKind) -> MatchStep {
        if self.outcome.is_some() {
            return MatchStep::Ignored;
        }
        match state {
            MatchStateKind::Waiting => MatchStep::Ignored,
            MatchStateKind::Matched => self.resolve(MatchOutcome::Matched),
            MatchStateKind::Failed => self.resolve(MatchOutcome::Failed),
        }
    }
}

/// Run the wait to its outcome. Consumes the channel and closes it on every
/// exit path; `wait_timeout` (when set) resolves a stuck wait as `Failed`.
pub async fn run(
    api: &Api,
    mut channel: SessionChannel,
    wait_timeout: Option<Duration>,
) -> Result<MatchOutcome> {
    let outcome = drive(api, &mut channel, wait_timeout).await;
    channel.close();
    outcome
}

async fn drive(
    api: &Api,
    channel: &mut SessionChannel,
    wait_timeout: Option<Duration>,
) -> Result<MatchOutcome> {
    let mut wait = MatchWait::new();

    // The outcome may predate the channel connect; ask once up front.
    if let Some(outcome) = poll_state(api, &mut wait).await {
        return Ok(outcome);
    }

    let waiting = async {
        loop {
            match channel.next_event().await {
                Some(ChannelEvent::Frame(frame)) => match wait.apply_frame(&frame) {
                    MatchStep::Resolved(outcome) => return Ok(outcome),
                    MatchStep::Resync => {
                        debug!("unrecognized frame while waiting; polling match state");
                        if let Some(outcome) = poll_state(api, &mut wait).await {
                            return Ok(outcome);
                        }
                    }
                    MatchStep::Ignored => {}
                },
                Some(ChannelEvent::Closed) | None => {
                    if let Some(outcome) = poll_state(api, &mut wait).await {
                        return Ok(outcome);
                    }
                    // No reconnect here; with the channel gone and the
                    // backend still waiting there is nothing left to listen
                    // to, so surface it instead of hanging forever.
                    bail!("live channel closed while still waiting for a match; try again");
                }
            }
        }
    };

    match wait_timeout {
        Some(limit) => match tokio::time::timeout(limit, waiting).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("no match outcome within {limit:?}; giving up");
                Ok(MatchOutcome::Failed)
            }
        },
        None => waiting.await,
    }
}

/// One status poll, fed through the guard. Poll failures are logged and
/// ignored; the next trigger re-issues the poll.
async fn poll_state(api: &Api, wait: &mut MatchWait) -> Option<MatchOutcome> {
    match api.match_state().await {
        Ok(state) => match wait.apply_state(state.message) {
            MatchStep::Resolved(outcome) => Some(outcome),
            _ => None,
        },
        Err(err) => {
            warn!("match state poll failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_terminal_frame_wins() {
        let mut wait = MatchWait::new();
        assert_eq!(
            wait.apply_frame(&ServerFrame::Matched),
            MatchStep::Resolved(MatchOutcome::Matched)
        );
        assert_eq!(wait.apply_frame(&ServerFrame::Failed), MatchStep::Ignored);
        assert_eq!(wait.apply_frame(&ServerFrame::Matched), MatchStep::Ignored);
        assert_eq!(wait.outcome(), Some(MatchOutcome::Matched));
    }

    #[test]
    fn failed_frame_resolves_exactly_once() {
        let mut wait = MatchWait::new();
        assert_eq!(
            wait.apply_frame(&ServerFrame::Failed),
            MatchStep::Resolved(MatchOutcome::Failed)
        );
        // A second failure signal must not re-trigger the notice.
        assert_eq!(wait.apply_frame(&ServerFrame::Failed), MatchStep::Ignored);
        assert_eq!(wait.apply_close(), MatchStep::Ignored);
        assert_eq!(wait.apply_state(MatchStateKind::Failed), MatchStep::Ignored);
    }

    #[test]
    fn close_then_matched_poll_resolves_once() {
        let mut wait = MatchWait::new();
        assert_eq!(wait.apply_close(), MatchStep::Resync);
        assert_eq!(
            wait.apply_state(MatchStateKind::Matched),
            MatchStep::Resolved(MatchOutcome::Matched)
        );
        assert_eq!(wait.apply_state(MatchStateKind::Matched), MatchStep::Ignored);
    }

    #[test]
    fn noise_requests_resync_until_resolved() {
        let mut wait = MatchWait::new();
        assert_eq!(wait.apply_frame(&ServerFrame::Unrecognized), MatchStep::Resync);
        assert_eq!(
            wait.apply_frame(&ServerFrame::Message { text: "hi".into() }),
            MatchStep::Resync
        );
        assert_eq!(wait.apply_state(MatchStateKind::Waiting), MatchStep::Ignored);
        assert_eq!(
            wait.apply_state(MatchStateKind::Failed),
            MatchStep::Resolved(MatchOutcome::Failed)
        );
        assert_eq!(wait.apply_frame(&ServerFrame::Unrecognized), MatchStep::Ignored);
    }

    #[test]
    fn poll_and_frame_race_is_idempotent() {
        // Whichever source lands first wins; the other is a no-op.
        let mut wait = MatchWait::new();
        assert_eq!(
            wait.apply_state(MatchStateKind::Matched),
            MatchStep::Resolved(MatchOutcome::Matched)
        );
        assert_eq!(wait.apply_frame(&ServerFrame::Matched), MatchStep::Ignored);
        assert_eq!(wait.apply_frame(&ServerFrame::Failed), MatchStep::Ignored);
        assert_eq!(wait.outcome(), Some(MatchOutcome::Matched));
    }
}
