//! Chunk splitting.
//!
//! Every entry becomes an initial chunk holding everything it reaches
//! (dynamic imports stay in the importing chunk). Cache groups then move
//! modules shared by enough initial chunks into their own chunk.

use super::graph::ModuleGraph;
use crate::pipeline::SplitChunks;
use std::collections::HashMap;

/// A group of modules emitted as one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    /// Module ids, in discovery order.
    pub modules: Vec<String>,
    /// Modules to run when the chunk loads, in order. Empty for split chunks.
    pub entry_modules: Vec<String>,
}

impl Chunk {
    #[must_use]
    pub fn is_entry(&self) -> bool {
        !self.entry_modules.is_empty()
    }
}

/// Split the graph into chunks.
///
/// `entries` lists each entry name with its resolved entry module ids. Split
/// chunks come first in the result, since pages must load them before the
/// entry chunks.
#[must_use]
pub fn split_chunks(
    graph: &ModuleGraph,
    entries: &[(String, Vec<String>)],
    policy: &SplitChunks,
) -> Vec<Chunk> {
    let mut initial: Vec<Chunk> = entries
        .iter()
        .map(|(name, ids)| Chunk {
            name: name.clone(),
            modules: graph.reachable(ids),
            entry_modules: ids.clone(),
        })
        .collect();

    let mut split = Vec::new();
    for group in &policy.cache_groups {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for chunk in &initial {
            for id in &chunk.modules {
                *counts.entry(id.as_str()).or_default() += 1;
            }
        }

        let mut shared: Vec<String> = counts
            .into_iter()
            .filter(|(_, n)| *n >= group.min_chunks)
            .map(|(id, _)| id.to_string())
            .collect();
        if shared.is_empty() {
            continue;
        }
        shared.sort_by_key(|id| graph.position(id));

        for chunk in &mut initial {
            chunk.modules.retain(|id| !shared.contains(id));
        }
        split.push(Chunk {
            name: group.name.clone(),
            modules: shared,
            entry_modules: Vec::new(),
        });
    }

    split.extend(initial);
    split
}
