//! Agent Supervisor - Lifecycle Management for Agent Tasks
//!
//! Spawns the hub, coordinator and relay as separate tokio tasks and
//! tracks their health for the /ready endpoint. A task that exits with
//! a setup error is disabled permanently; the rest of the node keeps
//! running in degraded mode.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::AgentError;

/// Tracks the health state of a single agent task.
#[derive(Debug)]
struct AgentHealth {
    /// Agent name for logging and the readiness report.
    name: &'static str,
    /// Whether the task is currently running.
    running: AtomicBool,
    /// Set once the agent hits a permanent setup failure.
    disabled: AtomicBool,
}

/// Supervises all long-running agent tasks.
pub struct AgentSupervisor {
    agents: Vec<Arc<AgentHealth>>,
    handles: Vec<JoinHandle<()>>,
}

impl AgentSupervisor {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Spawn an agent task and track its health.
    ///
    /// A clean exit (shutdown) just marks the agent stopped. An exit
    /// with a setup error marks it permanently disabled; any other
    /// error is logged and leaves the agent stopped but eligible for a
    /// restart by the operator.
    pub fn spawn_agent<F>(&mut self, name: &'static str, task: F)
    where
        F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let health = Arc::new(AgentHealth {
            name,
            running: AtomicBool::new(true),
            disabled: AtomicBool::new(false),
        });
        self.agents.push(Arc::clone(&health));

        self.handles.push(tokio::spawn(async move {
            match task.await {
                Ok(()) => {
                    info!(agent = health.name, "Agent exited normally");
                }
                Err(e) => {
                    let fatal = e
                        .downcast_ref::<AgentError>()
                        .is_some_and(AgentError::is_fatal);
                    if fatal {
                        error!(agent = health.name, error = %e, "Agent disabled by setup failure");
                        health.disabled.store(true, Ordering::Relaxed);
                    } else {
                        error!(agent = health.name, error = %e, "Agent crashed");
                    }
                }
            }
            health.running.store(false, Ordering::Relaxed);
        }));
    }

    /// Whether every non-disabled agent is still running.
    pub fn is_healthy(&self) -> bool {
        self.agents.iter().all(|agent| {
            agent.running.load(Ordering::Relaxed) || agent.disabled.load(Ordering::Relaxed)
        })
    }

    /// Names of agents that were permanently disabled.
    pub fn disabled_agents(&self) -> Vec<&'static str> {
        self.agents
            .iter()
            .filter(|agent| agent.disabled.load(Ordering::Relaxed))
            .map(|agent| agent.name)
            .collect()
    }

    /// Take the join handles for shutdown coordination.
    pub fn take_handles(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.handles)
    }
}

impl Default for AgentSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_exit_marks_agent_stopped_but_healthy() {
        let mut supervisor = AgentSupervisor::new();
        supervisor.spawn_agent("noop", async { Ok(()) });

        for handle in supervisor.take_handles() {
            handle.await.unwrap();
        }
        // Stopped without error: not running, not disabled
        assert!(!supervisor.is_healthy());
        assert!(supervisor.disabled_agents().is_empty());
    }

    #[tokio::test]
    async fn setup_failure_disables_agent() {
        let mut supervisor = AgentSupervisor::new();
        supervisor.spawn_agent("broken", async {
            Err(AgentError::setup("endpoint unreachable").into())
        });

        for handle in supervisor.take_handles() {
            handle.await.unwrap();
        }
        assert_eq!(supervisor.disabled_agents(), vec!["broken"]);
        // Disabled counts as accounted-for, the node stays ready
        assert!(supervisor.is_healthy());
    }

    #[tokio::test]
    async fn transient_crash_is_not_disabled() {
        let mut supervisor = AgentSupervisor::new();
        supervisor.spawn_agent("flaky", async {
            Err(AgentError::transient("rpc timeout").into())
        });

        for handle in supervisor.take_handles() {
            handle.await.unwrap();
        }
        assert!(supervisor.disabled_agents().is_empty());
        assert!(!supervisor.is_healthy());
    }
}
