//! One-shot grace window check armed when a client connects.

use crate::delivery::Bridge;
use crate::registry::ClientId;
use log::debug;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy)]
pub struct DetectionTimer {
    grace_period: Duration,
}

impl DetectionTimer {
    pub fn new(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Spawns the check for one session. When the grace window ends the
    /// client is demoted if it is still undetermined. The check does
    /// nothing if the session has been closed or replaced, or if the bridge
    /// is gone. Aborting the returned handle cancels it.
    pub fn arm(&self, bridge: Weak<Bridge>, client: ClientId, session: u64) -> JoinHandle<()> {
        let grace_period = self.grace_period;
        tokio::spawn(async move {
            sleep(grace_period).await;
            match bridge.upgrade() {
                Some(bridge) => {
                    bridge.expire_grace(client, session);
                }
                None => debug!("Bridge dropped before detection of {} finished", client),
            }
        })
    }
}
