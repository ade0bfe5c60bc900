//! Supervisor loop.
//!
//! Multiplexes the standing reaper's completion and routed signals into one
//! sequence of system actions. Exactly one event is handled at a time; a
//! signal that arrives while an action is in its grace period is queued and
//! handled right after it.

use crate::action::ActionContext;
use crate::error::{Error, Result};
use crate::signals::SignalTable;
use nix::sys::signal::Signal;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Waiting for the next event
    Running,
    /// A system action is executing
    ActionInProgress,
    /// The loop has stopped
    Exited,
}

pub struct Supervisor {
    table: SignalTable,
    context: ActionContext,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(table: SignalTable, context: ActionContext) -> Self {
        Self {
            table,
            context,
            state: SupervisorState::Running,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// Run until a system action fails or the reaper stops.
    ///
    /// Returns `Ok` only if the signal channel closes.
    pub async fn run(
        &mut self,
        mut signals: mpsc::UnboundedReceiver<Signal>,
        mut reaper: oneshot::Receiver<Result<()>>,
    ) -> Result<()> {
        info!("Supervisor running");

        loop {
            tokio::select! {
                result = &mut reaper => {
                    self.state = SupervisorState::Exited;
                    return Err(match result {
                        Ok(Err(e)) => e,
                        Ok(Ok(())) | Err(_) => Error::ReaperStopped,
                    });
                }

                sig = signals.recv() => match sig {
                    Some(sig) => self.dispatch(sig).await?,
                    None => {
                        self.state = SupervisorState::Exited;
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Handle one signal: run its mapped action, if any.
    pub async fn dispatch(&mut self, sig: Signal) -> Result<()> {
        info!(signal = %sig, "Received signal");

        let Some(action) = self.table.lookup(sig) else {
            debug!(signal = %sig, "No action mapped");
            return Ok(());
        };

        self.state = SupervisorState::ActionInProgress;
        match action.perform(&self.context).await {
            Ok(()) => {
                self.state = SupervisorState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = SupervisorState::Exited;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tests::{Call, RecordingSystem};
    use crate::action::{SystemAction, Transition};
    use crate::quit::QuitBroadcast;
    use nix::errno::Errno;
    use std::sync::Arc;

    fn supervisor(table: SignalTable) -> (Supervisor, Arc<RecordingSystem>, QuitBroadcast) {
        let quit = QuitBroadcast::new();
        let system = Arc::new(RecordingSystem::new(quit.clone()));
        let context = ActionContext::new(system.clone(), quit.clone());
        (Supervisor::new(table, context), system, quit)
    }

    fn expected_calls(action: SystemAction) -> Vec<Call> {
        match action {
            SystemAction::Reboot => vec![Call::Sync, Call::Power(Transition::Restart)],
            SystemAction::Halt => vec![Call::Sync, Call::Power(Transition::Halt)],
            SystemAction::Poweroff => vec![Call::Sync, Call::Power(Transition::PowerOff)],
            SystemAction::Reinit => vec![
                Call::KillAll(Signal::SIGTERM),
                Call::KillAll(Signal::SIGKILL),
                Call::Drain,
                Call::Reexec,
            ],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_signal_runs_its_action() {
        let table = SignalTable::canonical();
        for sig in table.signals() {
            let action = table.lookup(sig).unwrap();
            let (mut sup, system, quit) = supervisor(SignalTable::canonical());

            sup.dispatch(sig).await.unwrap();

            assert_eq!(system.calls(), expected_calls(action), "signal {sig}");
            assert!(quit.is_fired());
            assert_eq!(sup.state(), SupervisorState::Running);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmapped_signal_is_noop() {
        let (mut sup, system, quit) = supervisor(SignalTable::canonical());

        sup.dispatch(Signal::SIGWINCH).await.unwrap();
        sup.dispatch(Signal::SIGCHLD).await.unwrap();

        assert!(system.calls().is_empty());
        assert!(!quit.is_fired());
        assert_eq!(sup.state(), SupervisorState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_processes_signals_in_order() {
        let (mut sup, system, _quit) = supervisor(SignalTable::canonical());
        let (tx, rx) = mpsc::unbounded_channel();
        let (_reaper_tx, reaper_rx) = oneshot::channel();

        tx.send(Signal::SIGUSR1).unwrap();
        tx.send(Signal::SIGWINCH).unwrap();
        tx.send(Signal::SIGTERM).unwrap();
        tx.send(Signal::SIGTERM).unwrap();
        drop(tx);

        sup.run(rx, reaper_rx).await.unwrap();

        assert_eq!(
            system.calls(),
            [
                Call::Sync,
                Call::Power(Transition::Halt),
                Call::Sync,
                Call::Power(Transition::Restart),
                Call::Sync,
                Call::Power(Transition::Restart),
            ]
        );
        assert_eq!(sup.state(), SupervisorState::Exited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_failure_exits() {
        let quit = QuitBroadcast::new();
        let system = Arc::new(RecordingSystem::failing_term_broadcast(quit.clone()));
        let mut sup = Supervisor::new(
            SignalTable::canonical(),
            ActionContext::new(system.clone(), quit),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let (_reaper_tx, reaper_rx) = oneshot::channel();

        tx.send(Signal::SIGQUIT).unwrap();
        tx.send(Signal::SIGUSR2).unwrap();

        let err = sup.run(rx, reaper_rx).await.unwrap_err();
        assert!(matches!(err, Error::SignalBroadcast { .. }));
        assert_eq!(sup.state(), SupervisorState::Exited);
        // The queued SIGUSR2 is never handled.
        assert_eq!(system.calls(), [Call::KillAll(Signal::SIGTERM)]);
    }

    #[tokio::test]
    async fn test_reaper_failure_exits() {
        let (mut sup, system, _quit) = supervisor(SignalTable::canonical());
        let (_tx, rx) = mpsc::unbounded_channel();
        let (reaper_tx, reaper_rx) = oneshot::channel();

        reaper_tx.send(Err(Error::Wait(Errno::EINVAL))).unwrap();

        let err = sup.run(rx, reaper_rx).await.unwrap_err();
        assert!(matches!(err, Error::Wait(Errno::EINVAL)));
        assert_eq!(sup.state(), SupervisorState::Exited);
        assert!(system.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_reaper_exits() {
        let (mut sup, _system, _quit) = supervisor(SignalTable::canonical());
        let (_tx, rx) = mpsc::unbounded_channel();
        let (reaper_tx, reaper_rx) = oneshot::channel::<Result<()>>();
        drop(reaper_tx);

        let err = sup.run(rx, reaper_rx).await.unwrap_err();
        assert!(matches!(err, Error::ReaperStopped));
    }
}
