use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{MindmapId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MindmapError {
    #[error("mindmap title cannot be empty")]
    EmptyTitle,

    #[error("mindmap must contain at least one node")]
    NoNodes,

    #[error("node id cannot be empty")]
    EmptyNodeId,

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge { edge: String, node: String },
}

//
// ─── NODES & EDGES ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Central,
    #[default]
    Branch,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub position: NodePosition,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindmapEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub nodes: Vec<MindmapNode>,
    #[serde(default)]
    pub edges: Vec<MindmapEdge>,
}

impl MindmapDraft {
    /// Validate structure and build a mindmap.
    ///
    /// # Errors
    ///
    /// Returns `MindmapError` for a blank title, no nodes, duplicate node ids
    /// or an edge pointing at a node that does not exist.
    pub fn validate(
        self,
        id: MindmapId,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Result<Mindmap, MindmapError> {
        Mindmap::from_persisted(id, owner, self.title, self.nodes, self.edges, now, now)
    }
}

fn check_graph(nodes: &[MindmapNode], edges: &[MindmapEdge]) -> Result<(), MindmapError> {
    if nodes.is_empty() {
        return Err(MindmapError::NoNodes);
    }

    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if node.id.trim().is_empty() {
            return Err(MindmapError::EmptyNodeId);
        }
        if !ids.insert(node.id.as_str()) {
            return Err(MindmapError::DuplicateNode(node.id.clone()));
        }
    }

    for edge in edges {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(MindmapError::DanglingEdge {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
    }

    Ok(())
}

//
// ─── MINDMAP ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub struct Mindmap {
    id: MindmapId,
    owner: UserId,
    title: String,
    nodes: Vec<MindmapNode>,
    edges: Vec<MindmapEdge>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Mindmap {
    /// Rehydrate a mindmap, re-checking its graph.
    ///
    /// # Errors
    ///
    /// Returns `MindmapError` if the stored graph is malformed.
    pub fn from_persisted(
        id: MindmapId,
        owner: UserId,
        title: String,
        nodes: Vec<MindmapNode>,
        edges: Vec<MindmapEdge>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, MindmapError> {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(MindmapError::EmptyTitle);
        }
        check_graph(&nodes, &edges)?;

        Ok(Self {
            id,
            owner,
            title,
            nodes,
            edges,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> MindmapId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> UserId {
        self.owner
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn nodes(&self) -> &[MindmapNode] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[MindmapEdge] {
        &self.edges
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The first node marked central, if any.
    #[must_use]
    pub fn central_node(&self) -> Option<&MindmapNode> {
        self.nodes.iter().find(|node| node.kind == NodeKind::Central)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
