use crate::clients::{Notice, Presenter};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Watches the connectivity signal and tells the shopper when it drops.
///
/// Only a transition from online to offline notifies; repeated offline
/// values and reconnects are silent.
pub fn spawn_network_watcher(
    mut online: watch::Receiver<bool>,
    presenter: Arc<dyn Presenter>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = *online.borrow_and_update();
        debug!(online = last, "Network watcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let now = *online.borrow_and_update();
                    if last && !now {
                        info!("Connection lost");
                        presenter.notify(Notice::NoConnection);
                    }
                    last = now;
                }
            }
        }
        debug!("Network watcher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingPresenter;
    use std::time::Duration;

    #[tokio::test]
    async fn test_notifies_only_on_transition_to_offline() {
        let (tx, rx) = watch::channel(true);
        let presenter = Arc::new(RecordingPresenter::new());
        let cancel = CancellationToken::new();
        let handle = spawn_network_watcher(rx, presenter.clone(), cancel.clone());

        for value in [false, false, true, false] {
            tx.send(value).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(presenter.count(&Notice::NoConnection), 2);
    }
}
