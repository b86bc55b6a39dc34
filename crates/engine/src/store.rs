// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-local index of projects and agents.
//!
//! All mutations happen under the manager's single-writer discipline;
//! the lock here only protects the map structure itself. Reads return
//! cloned records, so callers never hold the lock across await points.

use ah_core::{Agent, AgentStatus, Project};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct StoreInner {
    projects: HashMap<String, Project>,
    agents: HashMap<String, Agent>,
    agents_by_project: HashMap<String, Vec<String>>,
}

/// In-memory store. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // -- projects --

    /// Insert a project. Returns false when the name is taken.
    pub fn insert_project(&self, project: Project) -> bool {
        let mut inner = self.inner.lock();
        let name = project.name.as_str().to_string();
        if inner.projects.contains_key(&name) {
            return false;
        }
        inner.agents_by_project.entry(name.clone()).or_default();
        inner.projects.insert(name, project);
        true
    }

    pub fn project(&self, name: &str) -> Option<Project> {
        self.inner.lock().projects.get(name).cloned()
    }

    pub fn update_project<F>(&self, name: &str, update: F) -> bool
    where
        F: FnOnce(&mut Project),
    {
        let mut inner = self.inner.lock();
        match inner.projects.get_mut(name) {
            Some(project) => {
                update(project);
                true
            }
            None => false,
        }
    }

    /// Remove a project. The caller deletes its agents first.
    pub fn remove_project(&self, name: &str) -> Option<Project> {
        let mut inner = self.inner.lock();
        inner.agents_by_project.remove(name);
        inner.projects.remove(name)
    }

    pub fn list_projects(&self) -> Vec<Project> {
        let inner = self.inner.lock();
        let mut projects: Vec<Project> = inner.projects.values().cloned().collect();
        projects.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        projects
    }

    // -- agents --

    /// Insert an agent. Returns false when the id is taken or the
    /// project is unknown.
    pub fn insert_agent(&self, agent: Agent) -> bool {
        let mut inner = self.inner.lock();
        let id = agent.id.as_str().to_string();
        let project = agent.project.as_str().to_string();
        if inner.agents.contains_key(&id) || !inner.projects.contains_key(&project) {
            return false;
        }
        inner.agents.insert(id.clone(), agent);
        inner.agents_by_project.entry(project).or_default().push(id);
        true
    }

    pub fn agent(&self, id: &str) -> Option<Agent> {
        self.inner.lock().agents.get(id).cloned()
    }

    /// Agent lookup scoped to a project.
    pub fn agent_in_project(&self, project: &str, id: &str) -> Option<Agent> {
        self.inner
            .lock()
            .agents
            .get(id)
            .filter(|a| a.project == *project)
            .cloned()
    }

    pub fn update_agent<F>(&self, id: &str, update: F) -> bool
    where
        F: FnOnce(&mut Agent),
    {
        let mut inner = self.inner.lock();
        match inner.agents.get_mut(id) {
            Some(agent) => {
                update(agent);
                true
            }
            None => false,
        }
    }

    pub fn remove_agent(&self, id: &str) -> Option<Agent> {
        let mut inner = self.inner.lock();
        let agent = inner.agents.remove(id)?;
        if let Some(ids) = inner.agents_by_project.get_mut(agent.project.as_str()) {
            ids.retain(|a| a != id);
        }
        Some(agent)
    }

    pub fn agents_in_project(&self, project: &str) -> Vec<Agent> {
        let inner = self.inner.lock();
        inner
            .agents_by_project
            .get(project)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.agents.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all_agents(&self) -> Vec<Agent> {
        let inner = self.inner.lock();
        let mut agents: Vec<Agent> = inner.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        agents
    }

    /// Ids of agents the poller should visit.
    pub fn live_agent_ids(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner
            .agents
            .values()
            .filter(|a| a.status != AgentStatus::Exited)
            .map(|a| a.id.as_str().to_string())
            .collect()
    }

    pub fn counts(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.projects.len(), inner.agents.len())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
