/*!

Helpers for tests that talk to a deployed KIE server through its controller. The REST client
itself is supplied by the caller; the harness only knows how to wait on it.

!*/

use crate::constants::{DEFAULT_POLL_STEP_MILLIS, DEFAULT_TEST_WAIT_SECS};
use crate::wait::wait_for;
use log::debug;
use std::fmt::Display;
use std::time::Duration;

/// The part of the KIE controller REST API the harness waits on.
#[async_trait::async_trait]
pub trait KieControllerClient: Send + Sync {
    type Error: Display + Send;

    /// The ids of the containers registered for `server_template_id`.
    async fn container_ids(
        &self,
        server_template_id: &str,
    ) -> std::result::Result<Vec<String>, Self::Error>;
}

/// Wait up to 15 seconds, polling every second, for `container_id` to be registered under
/// `server_template_id`. Returns `false` if it never shows up. Request failures count as not yet
/// registered.
pub async fn wait_for_container_registration<C>(
    client: &C,
    server_template_id: &str,
    container_id: &str,
) -> bool
where
    C: KieControllerClient + ?Sized,
{
    wait_for_container_registration_within(
        client,
        server_template_id,
        container_id,
        Duration::from_millis(DEFAULT_POLL_STEP_MILLIS),
        Duration::from_secs(DEFAULT_TEST_WAIT_SECS),
    )
    .await
}

pub async fn wait_for_container_registration_within<C>(
    client: &C,
    server_template_id: &str,
    container_id: &str,
    step: Duration,
    total: Duration,
) -> bool
where
    C: KieControllerClient + ?Sized,
{
    wait_for(
        move || async move {
            match client.container_ids(server_template_id).await {
                Ok(ids) => ids.iter().any(|id| id == container_id),
                Err(e) => {
                    debug!(
                        "Unable to list containers of '{}': {}",
                        server_template_id, e
                    );
                    false
                }
            }
        },
        step,
        total,
    )
    .await
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Registers the container after a fixed number of polls.
    struct SlowController {
        polls: AtomicU32,
        registered_after: u32,
    }

    #[async_trait::async_trait]
    impl KieControllerClient for SlowController {
        type Error = String;

        async fn container_ids(&self, server_template_id: &str) -> Result<Vec<String>, String> {
            assert_eq!("myapp-kieserver", server_template_id);
            let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if poll == 1 {
                return Err("controller not reachable yet".to_string());
            }
            if poll >= self.registered_after {
                Ok(vec!["other".to_string(), "container-1".to_string()])
            } else {
                Ok(vec!["other".to_string()])
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn registration_within_the_window() {
        let controller = SlowController {
            polls: AtomicU32::new(0),
            registered_after: 5,
        };
        assert!(
            wait_for_container_registration(&controller, "myapp-kieserver", "container-1").await
        );
        assert_eq!(5, controller.polls.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn registration_too_late() {
        let controller = SlowController {
            polls: AtomicU32::new(0),
            registered_after: 30,
        };
        let start = tokio::time::Instant::now();
        assert!(
            !wait_for_container_registration(&controller, "myapp-kieserver", "container-1").await
        );
        assert!(start.elapsed() >= Duration::from_secs(DEFAULT_TEST_WAIT_SECS));
        // One poll at time zero plus one per second.
        assert_eq!(16, controller.polls.load(Ordering::SeqCst));
    }
}
