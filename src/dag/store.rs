// src/dag/store.rs

//! Named graph storage.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::task::TaskNode;
use crate::errors::{Result, TaskdagError};

/// Owns every accepted task graph, keyed by graph id.
///
/// Graphs are stored behind `Arc` so planners and runners can hold a
/// snapshot while the store is changed.
#[derive(Debug, Default)]
pub struct GraphStore {
    graphs: HashMap<String, Arc<TaskGraph>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a graph. Nothing is stored on error.
    ///
    /// An existing graph with the same id is replaced.
    pub fn create_graph(&mut self, graph_id: &str, tasks: Vec<TaskNode>) -> Result<Arc<TaskGraph>> {
        let graph = match TaskGraph::new(graph_id, tasks) {
            Ok(g) => Arc::new(g),
            Err(err) => {
                warn!(graph_id, error = %err, "rejecting task graph");
                return Err(err);
            }
        };

        if self.graphs.insert(graph_id.to_string(), Arc::clone(&graph)).is_some() {
            info!(graph_id, tasks = graph.len(), "replaced existing task graph");
        } else {
            info!(graph_id, tasks = graph.len(), "stored task graph");
        }

        Ok(graph)
    }

    pub fn get(&self, graph_id: &str) -> Option<Arc<TaskGraph>> {
        self.graphs.get(graph_id).cloned()
    }

    pub fn require(&self, graph_id: &str) -> Result<Arc<TaskGraph>> {
        self.get(graph_id)
            .ok_or_else(|| TaskdagError::GraphNotFound(graph_id.to_string()))
    }

    pub fn remove(&mut self, graph_id: &str) -> bool {
        self.graphs.remove(graph_id).is_some()
    }

    /// Stored graph ids, sorted.
    pub fn graph_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.graphs.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
