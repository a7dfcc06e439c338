//! The RDF library boundary: trait seams a real RDF graph store would
//! implement, plus a minimal in-memory conjunctive graph used as a
//! reference implementation and by the rest of the workspace's tests.
//!
//! No RDF parsing, serialization, or storage engine lives here beyond what
//! canonical N-Triples encoding and an in-memory graph require; a
//! production deployment is expected to supply its own [`Graph`]
//! implementation backed by a real triplestore.

pub use crate::decode::{parse_ntriples, NTriplesParseError};
pub use crate::encode::NTriplesEncode;
pub use crate::graph::{ContextGraph, Graph, GraphError, TriplePattern};
pub use crate::memory::MemoryGraph;
pub use crate::term::{ContextId, Literal, Term, Triple};

mod decode;
mod encode;
mod graph;
mod memory;
mod term;

/// Sorts `ctx`'s triples in N-Triples lexical order and writes them with a
/// single trailing newline per triple, producing the canonical
/// serialization whose bytes are hashed to name the context's graph file.
pub fn canonicalize(ctx: &dyn ContextGraph) -> Vec<u8> {
    let mut lines: Vec<String> = ctx.triples().map(|t| t.to_ntriples()).collect();
    lines.sort();
    let mut out = Vec::with_capacity(lines.iter().map(String::len).sum::<usize>() + lines.len());
    for line in lines {
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out
}
