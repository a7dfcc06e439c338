use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{ContextGraph, Graph, GraphError, TriplePattern};
use crate::term::{ContextId, Triple};

/// A `BTreeMap<ContextId, BTreeSet<Triple>>`-backed [`Graph`], sufficient
/// to drive the installer and aggregate store end-to-end without a real
/// triplestore behind them.
#[derive(Debug, Default, Clone)]
pub struct MemoryGraph {
    contexts: BTreeMap<ContextId, BTreeSet<Triple>>,
}

impl ContextGraph for BTreeSet<Triple> {
    fn triples(&self) -> Box<dyn Iterator<Item = Triple> + '_> {
        Box::new(self.iter().cloned())
    }

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Graph for MemoryGraph {
    fn contexts(&self) -> Vec<ContextId> {
        self.contexts.keys().cloned().collect()
    }

    fn context(&self, id: &ContextId) -> Option<&dyn ContextGraph> {
        self.contexts
            .get(id)
            .map(|triples| triples as &dyn ContextGraph)
    }

    fn triples(&self, pattern: &TriplePattern, ctx: Option<&ContextId>) -> Vec<Triple> {
        let in_context = |triples: &BTreeSet<Triple>| {
            triples
                .iter()
                .filter(|t| pattern.matches(t))
                .cloned()
                .collect::<Vec<_>>()
        };
        match ctx {
            Some(id) => self.contexts.get(id).map(in_context).unwrap_or_default(),
            None => self.contexts.values().flat_map(|set| in_context(set)).collect(),
        }
    }

    fn add(&mut self, ctx: &ContextId, triple: Triple) -> Result<(), GraphError> {
        self.contexts.entry(ctx.clone()).or_default().insert(triple);
        Ok(())
    }

    fn remove(&mut self, ctx: &ContextId, triple: &Triple) -> Result<(), GraphError> {
        if let Some(set) = self.contexts.get_mut(ctx) {
            set.remove(triple);
        }
        Ok(())
    }
}
