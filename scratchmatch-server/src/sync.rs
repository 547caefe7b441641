//! Change notification for views.
//!
//! Views do not poll the backing store; they subscribe to the store's
//! version channel. `wait_for_change` is the long-poll building block, and
//! `ParticipantView` applies a re-read only when an observed flag actually
//! differs, so a view can re-fetch freely without flickering.

use std::time::Duration;

use tokio::sync::watch;

use scratchmatch_core::Participant;

/// How long a long-poll request waits for a change before returning.
pub const LONG_POLL_WINDOW: Duration = Duration::from_secs(25);

/// Wait until the store version advances past `seen_version`.
///
/// Returns the new version, or `None` if the window elapses first (or the
/// store has gone away).
pub async fn wait_for_change(
    mut rx: watch::Receiver<u64>,
    seen_version: u64,
    window: Duration,
) -> Option<u64> {
    let wait = async move {
        loop {
            let current = *rx.borrow_and_update();
            if current > seen_version {
                return Some(current);
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    };

    tokio::time::timeout(window, wait).await.ok().flatten()
}

/// A view's copy of one participant record.
///
/// `apply` takes a freshly read record and accepts it only when one of the
/// flags the view renders (`approved`, `scratched`, `assigned_group`)
/// differs from what it last observed, so redundant notifications collapse
/// into no-ops.
#[derive(Debug, Clone)]
pub struct ParticipantView {
    current: Participant,
}

impl ParticipantView {
    pub fn new(initial: Participant) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &Participant {
        &self.current
    }

    /// Apply a re-read snapshot. Returns the updated record when an observed
    /// flag changed, `None` when nothing the view shows has moved.
    pub fn apply(&mut self, fresh: Participant) -> Option<&Participant> {
        let differs = fresh.approved != self.current.approved
            || fresh.scratched != self.current.scratched
            || fresh.assigned_group != self.current.assigned_group;

        if differs {
            self.current = fresh;
            Some(&self.current)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(email: &str) -> Participant {
        Participant::new(format!("id-{email}"), email)
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_ahead() {
        let (tx, rx) = watch::channel(5u64);
        let result = wait_for_change(rx, 3, Duration::from_secs(10)).await;
        assert_eq!(result, Some(5));
        drop(tx);
    }

    #[tokio::test]
    async fn wait_resolves_when_version_advances() {
        let (tx, rx) = watch::channel(0u64);

        let waiter = tokio::spawn(wait_for_change(rx, 0, Duration::from_secs(10)));
        tokio::task::yield_now().await;
        tx.send_modify(|v| *v += 1);

        assert_eq!(waiter.await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn wait_times_out_without_a_change() {
        let (tx, rx) = watch::channel(0u64);
        let result = wait_for_change(rx, 0, Duration::from_millis(20)).await;
        assert_eq!(result, None);
        drop(tx);
    }

    #[tokio::test]
    async fn wait_returns_none_when_store_goes_away() {
        let (tx, rx) = watch::channel(0u64);
        drop(tx);
        let result = wait_for_change(rx, 0, Duration::from_secs(10)).await;
        assert_eq!(result, None);
    }

    #[test]
    fn apply_ignores_a_re_read_with_no_observed_change() {
        let mut view = ParticipantView::new(participant("a@example.com"));

        // A fresh read where only unobserved fields moved is not applied.
        let mut fresh = participant("a@example.com");
        fresh.full_name = Some("Alan Turing".to_string());
        fresh.registered = true;
        assert!(view.apply(fresh).is_none());
        assert!(view.current().full_name.is_none());
    }

    #[test]
    fn apply_accepts_approval_and_assignment_changes() {
        let mut view = ParticipantView::new(participant("a@example.com"));

        let mut approved = participant("a@example.com");
        approved.approved = true;
        assert!(view.apply(approved).is_some());
        assert!(view.current().approved);

        let mut revealed = participant("a@example.com");
        revealed.approved = true;
        revealed.scratched = true;
        revealed.assigned_group = Some(4);
        assert!(view.apply(revealed).is_some());
        assert_eq!(view.current().assigned_group, Some(4));
    }

    #[test]
    fn apply_is_idempotent() {
        let mut view = ParticipantView::new(participant("a@example.com"));

        let mut approved = participant("a@example.com");
        approved.approved = true;

        assert!(view.apply(approved.clone()).is_some());
        assert!(view.apply(approved).is_none());
    }
}
