use std::collections::HashSet;

use bundle_rdf::{ContextId, Graph, Term, TriplePattern};

/// The predicate used in an imports context to record that one context's
/// data depends on another's, e.g. `(ctx1, CONTEXT_IMPORTS, ctx2)` meaning
/// `ctx1` imports `ctx2`.
pub const CONTEXT_IMPORTS_PREDICATE: &str = "http://openworm.org/schema/bundle#imports";

/// Follows `CONTEXT_IMPORTS_PREDICATE` edges transitively from `start`
/// within `imports_ctx`, returning every URI reached (not including
/// `start` itself). `seen` accumulates visited URIs across repeated calls
/// so that the overall import-closure computation over many starting
/// contexts does neither infinite-loop on cycles nor redo work.
pub fn transitive_imports(
    graph: &dyn Graph,
    imports_ctx: &ContextId,
    start: &str,
    seen: &mut HashSet<String>,
) -> HashSet<String> {
    let mut result = HashSet::new();
    if !seen.insert(start.to_owned()) {
        return result;
    }
    let pattern = TriplePattern {
        subject: Some(Term::iri(start)),
        predicate: Some(Term::iri(CONTEXT_IMPORTS_PREDICATE)),
        object: None,
    };
    for triple in graph.triples(&pattern, Some(imports_ctx)) {
        if let Some(object) = triple.object.as_iri() {
            let object = object.to_owned();
            result.insert(object.clone());
            result.extend(transitive_imports(graph, imports_ctx, &object, seen));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use bundle_rdf::MemoryGraph;

    use super::*;

    #[test]
    fn follows_chain_and_stops_at_cycle() {
        let mut graph = MemoryGraph::new();
        let ctx = ContextId::new("http://example.org/imports");
        let edge = |s: &str, o: &str| bundle_rdf::Triple {
            subject: Term::iri(s),
            predicate: Term::iri(CONTEXT_IMPORTS_PREDICATE),
            object: Term::iri(o),
        };
        graph
            .add(&ctx, edge("http://ex/a", "http://ex/b"))
            .unwrap();
        graph
            .add(&ctx, edge("http://ex/b", "http://ex/c"))
            .unwrap();
        graph
            .add(&ctx, edge("http://ex/c", "http://ex/a"))
            .unwrap();

        let mut seen = HashSet::new();
        let result = transitive_imports(&graph, &ctx, "http://ex/a", &mut seen);
        assert_eq!(
            result,
            ["http://ex/b", "http://ex/c", "http://ex/a"]
                .into_iter()
                .map(String::from)
                .collect()
        );
    }
}
