use std::collections::HashSet;

use bundle_rdf::{ContextGraph, ContextId, Graph, GraphError, Triple, TriplePattern};

/// One dependency leg of an [`AggregateStore`]: another bundle's own
/// (possibly itself aggregate) store, plus the context URIs excluded from
/// this leg of the composition. Excludes do not cascade into the leg's
/// own dependencies.
pub struct DependencyLeg {
    pub id: String,
    pub version: Option<u32>,
    pub excludes: HashSet<String>,
    pub store: Box<dyn Graph>,
}

/// A read-only composite store over a primary bundle's own graph and its
/// direct dependencies' stores, each with its own exclusion set. Every
/// mutating operation is rejected.
pub struct AggregateStore {
    primary: Box<dyn Graph>,
    dependencies: Vec<DependencyLeg>,
}

impl AggregateStore {
    pub fn new(primary: Box<dyn Graph>, dependencies: Vec<DependencyLeg>) -> Self {
        Self { primary, dependencies }
    }

    fn contributes(leg: &DependencyLeg, ctx: Option<&ContextId>) -> bool {
        match ctx {
            Some(id) => !leg.excludes.contains(id.as_str()),
            None => true,
        }
    }
}

impl Graph for AggregateStore {
    fn contexts(&self) -> Vec<ContextId> {
        let mut contexts: HashSet<ContextId> = self.primary.contexts().into_iter().collect();
        for leg in &self.dependencies {
            for ctx in leg.store.contexts() {
                if !leg.excludes.contains(ctx.as_str()) {
                    contexts.insert(ctx);
                }
            }
        }
        contexts.into_iter().collect()
    }

    fn context(&self, id: &ContextId) -> Option<&dyn ContextGraph> {
        if let Some(ctx) = self.primary.context(id) {
            return Some(ctx);
        }
        for leg in &self.dependencies {
            if leg.excludes.contains(id.as_str()) {
                continue;
            }
            if let Some(ctx) = leg.store.context(id) {
                return Some(ctx);
            }
        }
        None
    }

    fn triples(&self, pattern: &TriplePattern, ctx: Option<&ContextId>) -> Vec<Triple> {
        let mut out = self.primary.triples(pattern, ctx);
        for leg in &self.dependencies {
            if !Self::contributes(leg, ctx) {
                continue;
            }
            match ctx {
                Some(_) => out.extend(leg.store.triples(pattern, ctx)),
                None => {
                    for context in leg.store.contexts() {
                        if leg.excludes.contains(context.as_str()) {
                            continue;
                        }
                        out.extend(leg.store.triples(pattern, Some(&context)));
                    }
                }
            }
        }
        out
    }

    fn triples_choices(
        &self,
        pattern: &TriplePattern,
        objects: &[bundle_rdf::Term],
        ctx: Option<&ContextId>,
    ) -> Vec<Triple> {
        self.triples(pattern, ctx)
            .into_iter()
            .filter(|t| objects.contains(&t.object))
            .collect()
    }

    fn len_context(&self, id: &ContextId) -> usize {
        if self.primary.context(id).is_some() {
            return self.primary.len_context(id);
        }
        for leg in &self.dependencies {
            if leg.excludes.contains(id.as_str()) {
                continue;
            }
            let n = leg.store.len_context(id);
            if n > 0 || leg.store.context(id).is_some() {
                return n;
            }
        }
        0
    }

    fn add(&mut self, _ctx: &ContextId, _triple: Triple) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation)
    }

    fn remove(&mut self, _ctx: &ContextId, _triple: &Triple) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation)
    }

    fn add_n(&mut self, _ctx: &ContextId, _triples: &[Triple]) -> Result<(), GraphError> {
        Err(GraphError::UnsupportedOperation)
    }
}

/// Key used to prune repeated recursion while building an [`AggregateStore`]
/// over a dependency DAG: the same `(id, version)` reached with the same
/// accumulated exclude set is not expanded twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitKey {
    pub id: String,
    pub version: Option<u32>,
    pub accumulated_excludes: Vec<String>,
}

impl VisitKey {
    pub fn new(id: impl Into<String>, version: Option<u32>, mut accumulated_excludes: Vec<String>) -> Self {
        accumulated_excludes.sort();
        accumulated_excludes.dedup();
        Self {
            id: id.into(),
            version,
            accumulated_excludes,
        }
    }
}

#[cfg(test)]
mod tests {
    use bundle_rdf::{MemoryGraph, Term};

    use super::*;

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple {
            subject: Term::iri(s),
            predicate: Term::iri(p),
            object: Term::iri(o),
        }
    }

    #[test]
    fn excluded_context_is_never_observed() {
        let mut primary = MemoryGraph::new();
        let primary_ctx = ContextId::new("http://ex/primary");
        primary
            .add(&primary_ctx, triple("http://ex/s1", "http://ex/p", "http://ex/o1"))
            .unwrap();

        let mut dep = MemoryGraph::new();
        let excluded_ctx = ContextId::new("http://ex/excluded");
        let visible_ctx = ContextId::new("http://ex/visible");
        dep.add(&excluded_ctx, triple("http://ex/s2", "http://ex/p", "http://ex/o2"))
            .unwrap();
        dep.add(&visible_ctx, triple("http://ex/s3", "http://ex/p", "http://ex/o3"))
            .unwrap();

        let mut excludes = HashSet::new();
        excludes.insert("http://ex/excluded".to_owned());

        let store = AggregateStore::new(
            Box::new(primary),
            vec![DependencyLeg {
                id: "dep".to_owned(),
                version: Some(1),
                excludes,
                store: Box::new(dep),
            }],
        );

        let all = store.triples(&TriplePattern::default(), None);
        assert_eq!(all.len(), 2);
        assert!(!store.contexts().contains(&excluded_ctx));
        assert_eq!(store.len_context(&excluded_ctx), 0);
    }

    #[test]
    fn mutation_is_always_rejected() {
        let mut store = AggregateStore::new(Box::new(MemoryGraph::new()), Vec::new());
        let ctx = ContextId::new("http://ex/ctx");
        let err = store.add(&ctx, triple("http://ex/s", "http://ex/p", "http://ex/o")).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedOperation));
    }
}
