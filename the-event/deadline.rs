//! Waking a host when the reconciler's next timer comes due.
//!
//! The reconciler never sleeps; it only reports its earliest deadline. A host
//! that runs on tokio hands each report to a [`DeadlineWaker`], whose task
//! sleeps until the latest one and sends it back on the wake channel. The host
//! then polls the reconciler and reports the new deadline.

use std::time::Instant;

use tokio::{
  sync::{
    mpsc,
    watch,
  },
  time,
};

pub struct DeadlineWaker {
  deadline: watch::Sender<Option<Instant>>,
}

impl DeadlineWaker {
  /// Start the waker on the current tokio runtime. Panics outside one, as
  /// `tokio::spawn` does.
  pub fn spawn(wake: mpsc::Sender<Instant>) -> Self {
    let (deadline, rx) = watch::channel(None);
    tokio::spawn(wait_for_deadlines(rx, wake));
    Self { deadline }
  }

  /// Replace the deadline being waited for. `None` stops waiting.
  pub fn report(&self, next: Option<Instant>) {
    self.deadline.send_replace(next);
  }
}

async fn wait_for_deadlines(mut deadline: watch::Receiver<Option<Instant>>, wake: mpsc::Sender<Instant>) {
  loop {
    let next = *deadline.borrow_and_update();
    if let Some(at) = next {
      tokio::select! {
        changed = deadline.changed() => {
          if changed.is_err() {
            break;
          }
          continue;
        },
        () = time::sleep_until(time::Instant::from_std(at)) => {
          if wake.send(at).await.is_err() {
            log::debug!("host stopped listening for deadline wake-ups");
            break;
          }
        },
      }
    }
    // Fired or idle: nothing to do until the host reports again.
    if deadline.changed().await.is_err() {
      break;
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn wakes_at_the_latest_reported_deadline() {
    let (wake_tx, mut wake_rx) = mpsc::channel(4);
    let waker = DeadlineWaker::spawn(wake_tx);

    let late = Instant::now() + Duration::from_millis(500);
    let soon = Instant::now() + Duration::from_millis(10);
    waker.report(Some(late));
    waker.report(Some(soon));

    let woken = time::timeout(Duration::from_secs(2), wake_rx.recv())
      .await
      .unwrap();
    assert_eq!(woken, Some(soon));
  }

  #[tokio::test]
  async fn reporting_none_cancels_the_wake_up() {
    let (wake_tx, mut wake_rx) = mpsc::channel(4);
    let waker = DeadlineWaker::spawn(wake_tx);

    waker.report(Some(Instant::now() + Duration::from_millis(10)));
    waker.report(None);

    let woken = time::timeout(Duration::from_millis(100), wake_rx.recv()).await;
    assert!(woken.is_err());
  }

  #[tokio::test]
  async fn fires_once_per_report() {
    let (wake_tx, mut wake_rx) = mpsc::channel(4);
    let waker = DeadlineWaker::spawn(wake_tx);

    let at = Instant::now() + Duration::from_millis(5);
    waker.report(Some(at));
    let woken = time::timeout(Duration::from_secs(2), wake_rx.recv())
      .await
      .unwrap();
    assert_eq!(woken, Some(at));

    let again = time::timeout(Duration::from_millis(50), wake_rx.recv()).await;
    assert!(again.is_err());
  }
}
