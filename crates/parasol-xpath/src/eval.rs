//! Depth-first evaluation of a compiled `Expr` against a `Document`,
//! grounded on `spec.md` §4.10's evaluation contract: location steps apply
//! an axis and node test, then filter by each predicate in turn with the
//! context position/size of the list the step produced.

use crate::ast::{Axis, BinOp, Expr, NodeTest, NodeType};
use crate::dom::{Document, NodeId, NodeKind};
use crate::functions::{FunctionLibrary, Invocation};
use crate::value::{LiteralKind, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Evaluation context: the document, a variable environment (mutated only
/// by pushing/popping FLWOR bindings), and the two diagnostic channels
/// functions may set, mirroring `spec.md`'s `XPathContext`.
pub struct Context<'a> {
    pub document: &'a Document,
    pub variables: RefCell<HashMap<String, Value>>,
    pub unsupported: Cell<bool>,
    pub error_message: RefCell<String>,
}

impl<'a> Context<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document, variables: RefCell::new(HashMap::new()), unsupported: Cell::new(false), error_message: RefCell::new(String::new()) }
    }

    pub fn with_variables(document: &'a Document, variables: HashMap<String, Value>) -> Self {
        Self { document, variables: RefCell::new(variables), unsupported: Cell::new(false), error_message: RefCell::new(String::new()) }
    }

    fn invocation(&self, focus: &Focus) -> Invocation<'_> {
        Invocation {
            document: self.document,
            node: focus.node,
            position: focus.position,
            size: focus.size,
            unsupported: &self.unsupported,
            error_message: &self.error_message,
        }
    }
}

/// The current evaluation focus: a single context node plus its position
/// and size within the node list that produced it (for `position()`/`last()`).
#[derive(Clone, Copy)]
struct Focus {
    node: NodeId,
    position: usize,
    size: usize,
}

/// Evaluates `expr` with `node` as the initial context node (position 1 of
/// size 1, the XPath convention for a freshly supplied context).
pub fn evaluate(expr: &Expr, ctx: &Context, node: NodeId) -> Value {
    eval_expr(expr, ctx, Focus { node, position: 1, size: 1 })
}

fn eval_expr(expr: &Expr, ctx: &Context, focus: Focus) -> Value {
    match expr {
        Expr::Literal(LiteralKind::String(s)) => Value::String(s.clone()),
        Expr::Literal(LiteralKind::Number(n)) => Value::Number(*n),
        Expr::VariableRef(name) => ctx.variables.borrow().get(name).cloned().unwrap_or(Value::Sequence(Vec::new())),
        Expr::UnaryMinus(inner) => Value::Number(-eval_expr(inner, ctx, focus).as_number(ctx.document)),
        Expr::BinaryOp { op, left, right } => eval_binary(*op, left, right, ctx, focus),
        Expr::Union(parts) => {
            let mut nodes: Vec<NodeId> = Vec::new();
            for part in parts {
                nodes.extend(eval_expr(part, ctx, focus).as_node_set());
            }
            nodes.sort_by_key(|n| n.0);
            nodes.dedup();
            Value::NodeSet(nodes)
        }
        Expr::FunctionCall { name, args } => {
            let values: Vec<Value> = args.iter().map(|a| eval_expr(a, ctx, focus)).collect();
            let invocation = ctx.invocation(&focus);
            FunctionLibrary::instance().call(name, &values, &invocation)
        }
        Expr::Filter { expr, predicates } => {
            let base = eval_expr(expr, ctx, focus);
            let mut items = base.into_items();
            for predicate in predicates {
                let size = items.len();
                items = items
                    .into_iter()
                    .enumerate()
                    .filter(|(i, item)| predicate_keeps(predicate, ctx, item, *i + 1, size))
                    .map(|(_, v)| v)
                    .collect();
            }
            match items.len() {
                1 => items.into_iter().next().unwrap(),
                _ => Value::Sequence(items),
            }
        }
        Expr::Step { .. } | Expr::Path { .. } => {
            let nodes = eval_path(expr, ctx, &[focus.node]);
            Value::NodeSet(nodes)
        }
        Expr::If { cond, then_branch, else_branch } => {
            if eval_expr(cond, ctx, focus).as_boolean(ctx.document) {
                eval_expr(then_branch, ctx, focus)
            } else {
                eval_expr(else_branch, ctx, focus)
            }
        }
        Expr::For { variable, sequence, body } => {
            let items = eval_expr(sequence, ctx, focus).into_items();
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                ctx.variables.borrow_mut().insert(variable.clone(), item);
                out.push(eval_expr(body, ctx, focus));
            }
            ctx.variables.borrow_mut().remove(variable);
            Value::Sequence(out)
        }
        Expr::Quantified { every, variable, sequence, predicate } => {
            let items = eval_expr(sequence, ctx, focus).into_items();
            let mut result = *every;
            for item in items {
                ctx.variables.borrow_mut().insert(variable.clone(), item);
                let satisfied = eval_expr(predicate, ctx, focus).as_boolean(ctx.document);
                if *every && !satisfied {
                    result = false;
                    break;
                }
                if !*every && satisfied {
                    result = true;
                    break;
                }
            }
            ctx.variables.borrow_mut().remove(variable);
            Value::Boolean(result)
        }
    }
}

/// Evaluates a predicate (or filter clause) against one candidate item at
/// `position` within a list of `size`: a numeric result is a positional
/// test (`[1]` keeps only the first item), anything else coerces to
/// boolean.
fn predicate_keeps(predicate: &Expr, ctx: &Context, item: &Value, position: usize, size: usize) -> bool {
    let node = match item {
        Value::NodeSet(nodes) => nodes.first().copied().unwrap_or(ctx.document.root()),
        _ => ctx.document.root(),
    };
    let focus = Focus { node, position, size };
    let value = eval_expr(predicate, ctx, focus);
    match value {
        Value::Number(n) => n == position as f64,
        other => other.as_boolean(ctx.document),
    }
}

fn eval_binary(op: BinOp, left: &Expr, right: &Expr, ctx: &Context, focus: Focus) -> Value {
    match op {
        BinOp::And => {
            return Value::Boolean(eval_expr(left, ctx, focus).as_boolean(ctx.document) && eval_expr(right, ctx, focus).as_boolean(ctx.document));
        }
        BinOp::Or => {
            return Value::Boolean(eval_expr(left, ctx, focus).as_boolean(ctx.document) || eval_expr(right, ctx, focus).as_boolean(ctx.document));
        }
        _ => {}
    }

    let l = eval_expr(left, ctx, focus);
    let r = eval_expr(right, ctx, focus);

    match op {
        BinOp::Add => Value::Number(l.as_number(ctx.document) + r.as_number(ctx.document)),
        BinOp::Sub => Value::Number(l.as_number(ctx.document) - r.as_number(ctx.document)),
        BinOp::Mul => Value::Number(l.as_number(ctx.document) * r.as_number(ctx.document)),
        BinOp::Div => Value::Number(l.as_number(ctx.document) / r.as_number(ctx.document)),
        BinOp::Mod => Value::Number(l.as_number(ctx.document) % r.as_number(ctx.document)),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Value::Boolean(compare(op, &l, &r, ctx.document)),
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

/// General XPath comparison: a node set on either side compares by
/// existential quantification over its `string-value`s (or numbers, for
/// ordering operators); otherwise both sides coerce to a common type —
/// boolean if either side is boolean, number for ordering operators,
/// string for equality between two strings.
fn compare(op: BinOp, left: &Value, right: &Value, doc: &Document) -> bool {
    if let Value::NodeSet(nodes) = left {
        if !matches!(right, Value::NodeSet(_)) {
            return nodes.iter().any(|&n| compare(op, &node_value(n), right, doc));
        }
    }
    if let Value::NodeSet(nodes) = right {
        if !matches!(left, Value::NodeSet(_)) {
            return nodes.iter().any(|&n| compare(op, left, &node_value(n), doc));
        }
    }
    if let (Value::NodeSet(a), Value::NodeSet(b)) = (left, right) {
        return a.iter().any(|&x| b.iter().any(|&y| compare(op, &node_value(x), &node_value(y), doc)));
    }

    if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
        let lb = left.as_boolean(doc);
        let rb = right.as_boolean(doc);
        return match op {
            BinOp::Eq => lb == rb,
            BinOp::Ne => lb != rb,
            _ => false,
        };
    }

    match op {
        BinOp::Eq | BinOp::Ne if matches!(left, Value::String(_)) && matches!(right, Value::String(_)) => {
            let eq = left.as_string(doc) == right.as_string(doc);
            if op == BinOp::Eq { eq } else { !eq }
        }
        _ => {
            let ln = left.as_number(doc);
            let rn = right.as_number(doc);
            match op {
                BinOp::Eq => ln == rn,
                BinOp::Ne => ln != rn,
                BinOp::Lt => ln < rn,
                BinOp::Le => ln <= rn,
                BinOp::Gt => ln > rn,
                BinOp::Ge => ln >= rn,
                _ => false,
            }
        }
    }
}

fn node_value(node: NodeId) -> Value {
    Value::NodeSet(vec![node])
}

// ---- location-path evaluation ----

fn eval_path(expr: &Expr, ctx: &Context, context_nodes: &[NodeId]) -> Vec<NodeId> {
    match expr {
        Expr::Path { steps, absolute } => {
            let mut current: Vec<NodeId> = if *absolute { vec![ctx.document.root()] } else { context_nodes.to_vec() };
            for step in steps {
                current = eval_path(step, ctx, &current);
            }
            current
        }
        Expr::Step { axis, test, predicates } => {
            let mut result = Vec::new();
            for &cn in context_nodes {
                let mut candidates = axis_nodes(ctx.document, cn, *axis);
                candidates.retain(|&n| node_test_matches(ctx.document, n, test, *axis));
                for predicate in predicates {
                    let size = candidates.len();
                    candidates = candidates
                        .into_iter()
                        .enumerate()
                        .filter(|(i, n)| {
                            let focus = Focus { node: *n, position: i + 1, size };
                            match eval_expr(predicate, ctx, focus) {
                                Value::Number(num) => num == (i + 1) as f64,
                                other => other.as_boolean(ctx.document),
                            }
                        })
                        .map(|(_, n)| n)
                        .collect();
                }
                result.extend(candidates);
            }
            result.sort_by_key(|n| n.0);
            result.dedup();
            result
        }
        Expr::Filter { expr, predicates } => {
            let base = eval_expr(expr, ctx, Focus { node: context_nodes.first().copied().unwrap_or(ctx.document.root()), position: 1, size: 1 });
            let mut nodes = base.as_node_set();
            for predicate in predicates {
                let size = nodes.len();
                nodes = nodes
                    .into_iter()
                    .enumerate()
                    .filter(|(i, n)| {
                        let focus = Focus { node: *n, position: i + 1, size };
                        match eval_expr(predicate, ctx, focus) {
                            Value::Number(num) => num == (i + 1) as f64,
                            other => other.as_boolean(ctx.document),
                        }
                    })
                    .map(|(_, n)| n)
                    .collect();
            }
            nodes
        }
        other => eval_expr(other, ctx, Focus { node: context_nodes.first().copied().unwrap_or(ctx.document.root()), position: 1, size: 1 }).as_node_set(),
    }
}

fn axis_nodes(doc: &Document, node: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children(node).to_vec(),
        Axis::Parent => doc.parent(node).into_iter().collect(),
        Axis::SelfAxis => vec![node],
        Axis::Attribute => doc.node(node).attributes.clone(),
        Axis::Descendant => doc.descendants(node),
        Axis::DescendantOrSelf => {
            let mut v = vec![node];
            v.extend(doc.descendants(node));
            v
        }
        Axis::Ancestor => doc.ancestors(node),
        Axis::AncestorOrSelf => {
            let mut v = vec![node];
            v.extend(doc.ancestors(node));
            v
        }
        Axis::FollowingSibling => doc.following_siblings(node),
        Axis::PrecedingSibling => doc.preceding_siblings(node),
        Axis::Following => doc.following(node),
        Axis::Preceding => doc.preceding(node),
    }
}

fn node_test_matches(doc: &Document, node: NodeId, test: &NodeTest, axis: Axis) -> bool {
    match test {
        NodeTest::Any => match axis {
            Axis::Attribute => matches!(doc.node(node).kind, NodeKind::Attribute { .. }),
            _ => matches!(doc.node(node).kind, NodeKind::Element { .. }),
        },
        NodeTest::Name(name) => match (&doc.node(node).kind, axis) {
            (NodeKind::Element { name: n }, _) => n == name,
            (NodeKind::Attribute { name: n, .. }, Axis::Attribute) => n == name,
            _ => false,
        },
        NodeTest::Type(NodeType::Node) => true,
        NodeTest::Type(NodeType::Text) => matches!(doc.node(node).kind, NodeKind::Text(_)),
        NodeTest::Type(NodeType::Comment) => false,
        NodeTest::Type(NodeType::ProcessingInstruction) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::parser::parse;

    fn sample_document() -> Document {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, "r");
        for _ in 0..2 {
            let s = doc.create_element(r, "s");
            doc.create_element(s, "item");
            doc.create_element(s, "item");
        }
        doc
    }

    #[test]
    fn count_of_items_across_nested_sections() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, "r");
        let s1 = doc.create_element(r, "s");
        doc.create_element(s1, "item");
        doc.create_element(s1, "item");
        let s2 = doc.create_element(r, "s");
        doc.create_element(s2, "item");
        doc.create_element(s2, "item");
        doc.create_element(s2, "item");

        let expr = parse("count(//item)").unwrap();
        let ctx = Context::new(&doc);
        let result = evaluate(&expr, &ctx, doc.root());
        assert_eq!(result.as_number(&doc), 5.0);
    }

    #[test]
    fn sum_of_price_elements() {
        let mut doc = Document::new();
        let root = doc.root();
        let r = doc.create_element(root, "r");
        for price in ["10", "20", "30"] {
            let p = doc.create_element(r, "price");
            doc.create_text(p, price);
        }

        let expr = parse("sum(//price)").unwrap();
        let ctx = Context::new(&doc);
        let result = evaluate(&expr, &ctx, doc.root());
        assert_eq!(result.as_number(&doc), 60.0);
    }

    #[test]
    fn positional_predicate_selects_first_item() {
        let doc = sample_document();
        let expr = parse("//s[1]/item[2]").unwrap();
        let ctx = Context::new(&doc);
        let result = evaluate(&expr, &ctx, doc.root());
        assert_eq!(result.as_node_set().len(), 1);
    }

    #[test]
    fn arithmetic_expression_with_nan_propagation() {
        let doc = Document::new();
        let ctx = Context::new(&doc);
        let expr = parse("number('1.5') + number('2.5')").unwrap();
        assert_eq!(evaluate(&expr, &ctx, doc.root()).as_number(&doc), 4.0);

        let expr = parse("number('nan')").unwrap();
        assert!(evaluate(&expr, &ctx, doc.root()).as_number(&doc).is_nan());
    }

    #[test]
    fn string_length_and_concat() {
        let doc = Document::new();
        let ctx = Context::new(&doc);
        let expr = parse("string-length('abc')").unwrap();
        assert_eq!(evaluate(&expr, &ctx, doc.root()).as_number(&doc), 3.0);

        let expr = parse("concat('a','b','c')").unwrap();
        assert_eq!(evaluate(&expr, &ctx, doc.root()).as_string(&doc), "abc");
    }
}
