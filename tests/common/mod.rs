//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use minit::{ActionContext, QuitBroadcast, Result, SignalTable, Supervisor, System, Transition};
use nix::sys::signal::Signal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records side effects instead of performing them.
#[derive(Default)]
pub struct RecordingSystem {
    calls: Mutex<Vec<String>>,
}

impl RecordingSystem {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl System for RecordingSystem {
    fn sync(&self) {
        self.record("sync".to_string());
    }

    fn power(&self, transition: Transition) -> Result<()> {
        self.record(format!("power {transition}"));
        Ok(())
    }

    fn kill_all(&self, signal: Signal) -> Result<()> {
        self.record(format!("kill {signal}"));
        Ok(())
    }

    fn drain_children(&self) -> Result<()> {
        self.record("drain".to_string());
        Ok(())
    }

    fn reexec(&self) -> Result<()> {
        self.record("reexec".to_string());
        Ok(())
    }
}

/// A supervisor with the canonical signal table over a recording system.
pub fn supervisor(grace_period: Duration) -> (Supervisor, Arc<RecordingSystem>, QuitBroadcast) {
    let quit = QuitBroadcast::new();
    let system = Arc::new(RecordingSystem::default());
    let context =
        ActionContext::new(system.clone(), quit.clone()).with_grace_period(grace_period);
    (
        Supervisor::new(SignalTable::canonical(), context),
        system,
        quit,
    )
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
