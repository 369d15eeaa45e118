// src/dag/graph.rs

use std::collections::HashSet;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::errors::{JobdagError, Result};
use crate::job::Job;
use crate::types::Resources;

/// Handle to a job inside a [`JobGraph`]. Ordered by insertion.
pub type JobId = NodeIndex;

/// A job plus its static scheduling data.
#[derive(Clone)]
pub struct JobNode {
    pub name: String,
    pub resources: Resources,
    pub job: Arc<dyn Job>,
}

impl fmt::Debug for JobNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobNode")
            .field("name", &self.name)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

/// Jobs as nodes, parent → child edges as dependencies.
///
/// Built imperatively with [`add_job`](Self::add_job) and
/// [`add_dependency`](Self::add_dependency); acyclicity is checked by
/// [`validate`](Self::validate), which the scheduler calls before running
/// anything.
#[derive(Debug, Clone)]
pub struct JobGraph {
    graph: DiGraph<JobNode, ()>,
    allow_diamonds: bool,
}

impl Default for JobGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl JobGraph {
    /// An empty graph in which a job may have several parents.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            allow_diamonds: true,
        }
    }

    /// An empty graph in which every job has at most one parent (a forest).
    pub fn without_diamonds() -> Self {
        Self {
            allow_diamonds: false,
            ..Self::new()
        }
    }

    pub fn add_job(
        &mut self,
        name: impl Into<String>,
        resources: Resources,
        job: impl Job + 'static,
    ) -> Result<JobId> {
        self.add_shared_job(name, resources, Arc::new(job))
    }

    /// Like [`add_job`](Self::add_job) for a job that is already shared.
    pub fn add_shared_job(
        &mut self,
        name: impl Into<String>,
        resources: Resources,
        job: Arc<dyn Job>,
    ) -> Result<JobId> {
        let name = name.into();

        if self.find(&name).is_some() {
            return Err(JobdagError::InvalidGraph(format!(
                "duplicate job name '{name}'"
            )));
        }
        if resources.cores == 0 || resources.memory.bytes() == 0 {
            return Err(JobdagError::InvalidResources(format!(
                "job '{name}' must request at least one core and some memory"
            )));
        }

        Ok(self.graph.add_node(JobNode {
            name,
            resources,
            job,
        }))
    }

    /// Make `child` wait for `parent`.
    pub fn add_dependency(&mut self, parent: JobId, child: JobId) -> Result<()> {
        let parent_name = self.node(parent)?.name.clone();
        let child_name = self.node(child)?.name.clone();

        if parent == child {
            return Err(JobdagError::CycleDetected(format!(
                "job '{parent_name}' cannot depend on itself"
            )));
        }

        if !self.allow_diamonds
            && self
                .parents(child)
                .iter()
                .any(|existing| *existing != parent)
        {
            return Err(JobdagError::InvalidGraph(format!(
                "job '{child_name}' already has a parent; this graph does not allow shared children"
            )));
        }

        self.graph.update_edge(parent, child, ());
        Ok(())
    }

    /// Reject graphs that contain a cycle.
    pub fn validate(&self) -> Result<()> {
        match toposort(&self.graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => {
                let name = &self.graph[cycle.node_id()].name;
                Err(JobdagError::CycleDetected(format!(
                    "cycle detected in job graph involving job '{name}'"
                )))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All jobs in insertion order.
    pub fn job_ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.graph.node_indices()
    }

    pub fn find(&self, name: &str) -> Option<JobId> {
        self.graph
            .node_indices()
            .find(|id| self.graph[*id].name == name)
    }

    pub fn node(&self, id: JobId) -> Result<&JobNode> {
        self.graph.node_weight(id).ok_or_else(|| {
            JobdagError::InvalidGraph(format!("unknown job id {}", id.index()))
        })
    }

    pub fn name(&self, id: JobId) -> &str {
        &self.graph[id].name
    }

    /// Direct parents, in insertion order.
    pub fn parents(&self, id: JobId) -> Vec<JobId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct children, in insertion order.
    pub fn children(&self, id: JobId) -> Vec<JobId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Every job reachable from `id`, excluding `id` itself.
    pub fn descendants(&self, id: JobId) -> Vec<JobId> {
        let mut dfs = Dfs::new(&self.graph, id);
        let mut seen = HashSet::new();
        while let Some(next) = dfs.next(&self.graph) {
            if next != id {
                seen.insert(next);
            }
        }
        let mut out: Vec<JobId> = seen.into_iter().collect();
        out.sort();
        out
    }

    fn neighbors(&self, id: JobId, dir: Direction) -> Vec<JobId> {
        let mut out: Vec<JobId> = self.graph.neighbors_directed(id, dir).collect();
        out.sort();
        out.dedup();
        out
    }
}

impl Index<JobId> for JobGraph {
    type Output = JobNode;

    fn index(&self, id: JobId) -> &JobNode {
        &self.graph[id]
    }
}
