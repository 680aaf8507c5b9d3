//! `Query(query, callback)`: streams result nodes to a caller-supplied
//! callback one at a time, allowing early termination, per `spec.md`
//! §4.10's "Streaming callbacks" contract.

use crate::dom::{Document, NodeId};
use crate::eval::{evaluate, Context};
use crate::parser::parse;
use parasol_errors::{Error, ErrorKind, Status};

/// Compiles `expression`, evaluates it against `document` with `context`
/// as the starting node, and invokes `callback` once per matching node in
/// document order. `callback` returning `Err` with `ErrorKind::Terminate`
/// stops iteration early without propagating as a failure; any other
/// `Err` aborts the query and is returned to the caller.
pub fn query<F>(document: &Document, expression: &str, context: NodeId, mut callback: F) -> Status
where
    F: FnMut(NodeId) -> Status,
{
    let _branch = parasol_errors::log::Branch::enter("xpath::query");

    let expr = parse(expression).map_err(|e| {
        tracing::warn!(error = %e, "xpath syntax error");
        Error::new(ErrorKind::Syntax)
    })?;

    let ctx = Context::new(document);
    let value = evaluate(&expr, &ctx, context);

    for node in value.as_node_set() {
        match callback(node) {
            Ok(()) => {}
            Err(e) if e.kind == ErrorKind::Terminate => return Ok(()),
            Err(e) => return Err(e),
        }
    }

    if ctx.unsupported.get() {
        tracing::warn!(message = %ctx.error_message.borrow(), "xpath expression used an unsupported function");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn streams_matches_and_stops_on_terminate() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, "r");
        for _ in 0..5 {
            doc.create_element(r, "item");
        }

        let mut seen = 0;
        query(&doc, "//item", doc.root(), |_node| {
            seen += 1;
            if seen == 2 {
                Err(Error::new(ErrorKind::Terminate))
            } else {
                Ok(())
            }
        })
        .unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn streams_all_matches_when_never_terminated() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, "r");
        for _ in 0..5 {
            doc.create_element(r, "item");
        }

        let mut seen = 0;
        query(&doc, "//item", doc.root(), |_node| {
            seen += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, 5);
    }
}
