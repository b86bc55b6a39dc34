//! Shared rig for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use ah_adapters::{FakeMux, ProviderRegistry};
pub use ah_adapters::MuxAdapter;
use ah_core::{AgentSpec, AhConfig, FakeClock};
use ah_engine::manager::ManagerDeps;
use ah_engine::{Manager, Poller};
use tempfile::TempDir;

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 3000;

pub struct Rig {
    pub mux: FakeMux,
    pub clock: FakeClock,
    pub manager: Manager<FakeMux, FakeClock>,
    pub poller: Poller<FakeMux, FakeClock>,
    pub state_dir: TempDir,
}

impl Rig {
    pub async fn new() -> Self {
        let mux = FakeMux::new();
        let clock = FakeClock::default();
        let state_dir = TempDir::new().unwrap();
        let manager = Manager::new(ManagerDeps {
            mux: mux.clone(),
            clock: clock.clone(),
            registry: ProviderRegistry::builtin(),
            config: AhConfig::default(),
            state_dir: state_dir.path().to_path_buf(),
            subscriptions: vec![],
        });
        let poller = Poller::new(manager.clone());
        Self {
            mux,
            clock,
            manager,
            poller,
            state_dir,
        }
    }

    pub async fn with_project(name: &str) -> Self {
        let rig = Self::new().await;
        rig.manager
            .create_project(name, "/tmp/specs".into(), None)
            .await
            .unwrap();
        rig
    }

    pub async fn spawn_agent(&self, project: &str, provider: &str, id: &str, task: &str) -> String {
        let agent = self
            .manager
            .create_agent(
                project,
                AgentSpec {
                    id: Some(id.to_string()),
                    provider: provider.to_string(),
                    task: task.to_string(),
                    ..AgentSpec::default()
                },
            )
            .await
            .unwrap();
        agent.mux_target
    }
}

/// Poll until `check` passes or the wait ceiling is hit.
pub async fn wait_until<F: Fn() -> bool>(what: &str, check: F) {
    let mut waited = 0;
    while waited < SPEC_WAIT_MAX_MS {
        if check() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
        waited += SPEC_POLL_INTERVAL_MS;
    }
    panic!("timed out waiting for {what}");
}
