//! Service exit under a real standing reaper.
//!
//! The reaper calls `waitpid(-1)` and would collect children spawned by any
//! other test sharing the process, so this binary holds a single test.

mod common;

use common::{supervisor, wait_until};
use minit::{process, Reaper, SupervisorState, SystemWaiter};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_service_exit_keeps_supervisor_running() {
    let pid = process::launch(&["/bin/true".to_string()]).unwrap();
    let proc_entry = format!("/proc/{pid}");

    let reaper = Reaper::new(SystemWaiter)
        .with_idle_interval(Duration::from_millis(20))
        .spawn_standing()
        .unwrap();
    let (mut sup, system, quit) = supervisor(Duration::from_millis(10));
    let (_signal_tx, signal_rx) = mpsc::unbounded_channel();

    let outcome =
        tokio::time::timeout(Duration::from_millis(500), sup.run(signal_rx, reaper)).await;
    assert!(outcome.is_err(), "supervisor stopped on service exit");

    // The zombie is gone once reaped.
    wait_until(|| !Path::new(&proc_entry).exists()).await;
    assert_eq!(sup.state(), SupervisorState::Running);
    assert!(system.calls().is_empty());
    assert!(!quit.is_fired());
}
