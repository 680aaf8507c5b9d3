//! The XPath/XQuery typed value model: node sets, strings, numbers,
//! booleans, and date/time values, with the coercion rules XPath 1.0/2.0
//! define between them (`boolean()`, `number()`, `string()` semantics).

use crate::dom::{Document, NodeId};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A parsed literal from the AST, before it becomes a runtime `Value`
/// (kept separate so the AST does not need to carry node-set variants).
#[derive(Clone, Debug)]
pub enum LiteralKind {
    String(String),
    Number(f64),
}

#[derive(Clone, Debug)]
pub enum Value {
    NodeSet(Vec<NodeId>),
    String(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// A general sequence of values, the XPath 2.0 FLWOR/`for` result shape
    /// that a plain node set cannot carry (numbers, strings, mixed types).
    Sequence(Vec<Value>),
}

impl Value {
    pub fn as_boolean(&self, doc: &Document) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) => {
                let _ = doc;
                true
            }
            Value::Sequence(items) => match items.first() {
                Some(first) if items.len() == 1 => first.as_boolean(doc),
                _ => !items.is_empty(),
            },
        }
    }

    pub fn as_number(&self, doc: &Document) -> f64 {
        match self {
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|&n| doc.string_value(n).trim().parse::<f64>().unwrap_or(f64::NAN))
                .unwrap_or(f64::NAN),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) => f64::NAN,
            Value::Sequence(items) => items.first().map(|v| v.as_number(doc)).unwrap_or(f64::NAN),
        }
    }

    pub fn as_string(&self, doc: &Document) -> String {
        match self {
            Value::NodeSet(nodes) => nodes.first().map(|&n| doc.string_value(n)).unwrap_or_default(),
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Value::Sequence(items) => items.first().map(|v| v.as_string(doc)).unwrap_or_default(),
        }
    }

    pub fn as_node_set(&self) -> Vec<NodeId> {
        match self {
            Value::NodeSet(nodes) => nodes.clone(),
            Value::Sequence(items) => items.iter().flat_map(|v| v.as_node_set()).collect(),
            _ => Vec::new(),
        }
    }

    /// Flattens a value into its constituent items, the way XPath 2.0
    /// atomises a sequence for functions that iterate over `Args` (`sum`,
    /// `count`, `avg`, ...). A bare node set is already item-like per item.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Value::Sequence(items) => items,
            Value::NodeSet(nodes) => nodes.into_iter().map(|n| Value::NodeSet(vec![n])).collect(),
            other => vec![other],
        }
    }
}

/// `number()`'s textual rendering: XPath prints integral doubles without a
/// trailing `.0` and spells `NaN` in that exact casing.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == n.trunc() && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn integral_numbers_print_without_a_decimal_point() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(4.5), "4.5");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn boolean_coercion_follows_xpath_truthiness_rules() {
        let doc = Document::new();
        assert!(!Value::String(String::new()).as_boolean(&doc));
        assert!(Value::String("x".into()).as_boolean(&doc));
        assert!(!Value::Number(0.0).as_boolean(&doc));
        assert!(!Value::Number(f64::NAN).as_boolean(&doc));
        assert!(Value::NodeSet(vec![]).as_boolean(&doc) == false);
    }
}
