use thiserror::Error;

use crate::term::{ContextId, Term, Triple};

/// A partial triple used to filter reads: `None` in any position matches
/// anything in that position.
#[derive(Debug, Clone, Default)]
pub struct TriplePattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
}

impl TriplePattern {
    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_ref().map_or(true, |s| s == &triple.subject)
            && self
                .predicate
                .as_ref()
                .map_or(true, |p| p == &triple.predicate)
            && self.object.as_ref().map_or(true, |o| o == &triple.object)
    }
}

/// Errors a [`Graph`] implementation may raise. Read-only aggregate stores
/// always reject mutation with [`GraphError::UnsupportedOperation`].
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("operation is not supported by this graph")]
    UnsupportedOperation,
    #[error("context {0} not found")]
    ContextNotFound(ContextId),
}

/// The triples of a single named context.
pub trait ContextGraph {
    /// Iterates this context's triples in no particular order; callers
    /// that need a stable order (e.g. canonical serialization) sort
    /// themselves.
    fn triples(&self) -> Box<dyn Iterator<Item = Triple> + '_>;

    /// The number of triples in this context.
    fn len(&self) -> usize {
        self.triples().count()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The trait seam a real RDF library's graph store implements: a
/// conjunctive graph addressable by context, with pattern-based reads and
/// mutation hooks that a read-only composite (the aggregate store) always
/// rejects.
pub trait Graph {
    /// All context ids currently present in this graph.
    fn contexts(&self) -> Vec<ContextId>;

    /// Borrows the named context, if it exists.
    fn context(&self, id: &ContextId) -> Option<&dyn ContextGraph>;

    /// Iterates triples matching `pattern`, optionally restricted to one
    /// context; `ctx = None` searches every context.
    fn triples(&self, pattern: &TriplePattern, ctx: Option<&ContextId>) -> Vec<Triple>;

    /// Iterates triples whose subject/predicate match `pattern` and whose
    /// object is any of `objects`, the "choices" form used to resolve a
    /// context's imports against a batch of candidate predicates in one
    /// pass.
    fn triples_choices(
        &self,
        pattern: &TriplePattern,
        objects: &[Term],
        ctx: Option<&ContextId>,
    ) -> Vec<Triple> {
        self.triples(pattern, ctx)
            .into_iter()
            .filter(|t| objects.contains(&t.object))
            .collect()
    }

    /// Total triple count across every context.
    fn len(&self) -> usize {
        self.contexts().iter().filter_map(|id| self.context(id)).map(ContextGraph::len).sum()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Triple count of one context, or 0 if it does not exist.
    fn len_context(&self, id: &ContextId) -> usize {
        self.context(id).map_or(0, ContextGraph::len)
    }

    /// Adds a single triple to `ctx`. Read-only composites reject this.
    fn add(&mut self, ctx: &ContextId, triple: Triple) -> Result<(), GraphError>;

    /// Removes a single triple from `ctx`. Read-only composites reject this.
    fn remove(&mut self, ctx: &ContextId, triple: &Triple) -> Result<(), GraphError>;

    /// Adds every triple in `triples` to `ctx`. Read-only composites reject
    /// this.
    fn add_n(&mut self, ctx: &ContextId, triples: &[Triple]) -> Result<(), GraphError> {
        for triple in triples {
            self.add(ctx, triple.clone())?;
        }
        Ok(())
    }
}
