//! Snapshot persistence for [`FunctionGraph`].
//!
//! Two layouts:
//! - a single JSON document holding the whole graph;
//! - a sharded directory: `graph.json` without vectors, numbered
//!   `embeddings-NNNN.json` batches, and a `manifest.json` mapping every
//!   annotated function to its `{ batch, index }` slot.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use super::function_graph::{FunctionGraph, GraphError};
use crate::embedding::Embedding;

/// Layout version written to sharded manifests.
pub const MANIFEST_VERSION: u32 = 1;

pub const GRAPH_FILE: &str = "graph.json";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSlot {
    pub batch: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub batch_size: usize,
    pub batches: usize,
    pub entries: IndexMap<String, ShardSlot>,
}

pub fn batch_file_name(batch: usize) -> String {
    format!("embeddings-{batch:04}.json")
}

fn io_error(path: &Path, source: std::io::Error) -> GraphError {
    GraphError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GraphError> {
    let file = File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|source| GraphError::Json {
        path: path.display().to_string(),
        source,
    })?;
    writer.flush().map_err(|e| io_error(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GraphError> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| GraphError::Json {
        path: path.display().to_string(),
        source,
    })
}

impl FunctionGraph {
    /// Write the whole graph as one JSON document.
    pub fn save(&self, path: &Path) -> Result<(), GraphError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        write_json(path, self)?;
        info!(path = %path.display(), functions = self.len(), "saved snapshot");
        Ok(())
    }

    /// Read a graph written by [`FunctionGraph::save`], rejecting dangling edges.
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let graph: FunctionGraph = read_json(path)?;
        graph.validate()?;
        debug!(path = %path.display(), functions = graph.len(), "loaded snapshot");
        Ok(graph)
    }

    /// Write the graph into `dir` with vectors split into batches.
    pub fn save_sharded(&self, dir: &Path, batch_size: usize) -> Result<Manifest, GraphError> {
        if batch_size == 0 {
            return Err(GraphError::Manifest("batch size must be positive".into()));
        }
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        let mut stripped = self.clone();
        let mut vectors: Vec<(String, Embedding)> = Vec::new();
        for node in stripped.functions_mut() {
            if !node.embedding.is_empty() {
                vectors.push((node.name.clone(), std::mem::take(&mut node.embedding)));
            }
        }
        write_json(&dir.join(GRAPH_FILE), &stripped)?;

        let mut entries = IndexMap::with_capacity(vectors.len());
        let mut batches = 0;
        for (batch, chunk) in vectors.chunks(batch_size).enumerate() {
            let data: Vec<&Embedding> = chunk.iter().map(|(_, e)| e).collect();
            write_json(&dir.join(batch_file_name(batch)), &data)?;
            for (index, (name, _)) in chunk.iter().enumerate() {
                entries.insert(name.clone(), ShardSlot { batch, index });
            }
            batches += 1;
        }

        let manifest = Manifest {
            version: MANIFEST_VERSION,
            created_at: Utc::now(),
            batch_size,
            batches,
            entries,
        };
        write_json(&dir.join(MANIFEST_FILE), &manifest)?;
        info!(dir = %dir.display(), batches, vectors = vectors.len(), "saved sharded snapshot");
        Ok(manifest)
    }

    /// Read a directory written by [`FunctionGraph::save_sharded`].
    pub fn load_sharded(dir: &Path) -> Result<Self, GraphError> {
        let manifest: Manifest = read_json(&dir.join(MANIFEST_FILE))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(GraphError::Manifest(format!(
                "unsupported version {}",
                manifest.version
            )));
        }
        let mut graph = Self::load(&dir.join(GRAPH_FILE))?;

        let mut batches: Vec<Vec<Embedding>> = Vec::with_capacity(manifest.batches);
        for batch in 0..manifest.batches {
            batches.push(read_json(&dir.join(batch_file_name(batch)))?);
        }

        for (name, slot) in manifest.entries {
            let embedding = batches
                .get_mut(slot.batch)
                .and_then(|b| b.get_mut(slot.index))
                .map(std::mem::take)
                .ok_or_else(|| {
                    GraphError::Manifest(format!(
                        "{name} points at missing slot {}/{}",
                        slot.batch, slot.index
                    ))
                })?;
            if !graph.set_embedding(&name, embedding) {
                return Err(GraphError::DanglingEdge {
                    table: "manifest",
                    name,
                });
            }
        }
        Ok(graph)
    }
}
