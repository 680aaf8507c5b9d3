//! The function library: name → implementation, ported from the
//! registration list in `examples/original_source/src/xpath/
//! function_library.cpp`'s `register_core_functions()`. Node-set,
//! document, accessor, QName, string, boolean, sequence, number, and
//! date/time families are all represented; functions with no meaning
//! against an in-memory document with no resolver installed (`doc`,
//! `collection`, `unparsed-text`) set `expression_unsupported` exactly as
//! the original does when it has no collection resolver configured.

use crate::dom::{Document, NodeId};
use crate::value::Value;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Per-call context threaded into every function: the document being
/// queried, the calling step's context node/position/size (`last()`,
/// `position()` read these), and the two out-of-band channels the
/// original threads through `XPathContext` (`expression_unsupported`,
/// `error_message_buffer`).
pub struct Invocation<'a> {
    pub document: &'a Document,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
    pub unsupported: &'a Cell<bool>,
    pub error_message: &'a RefCell<String>,
}

impl<'a> Invocation<'a> {
    fn mark_unsupported(&self, name: &str) -> Value {
        self.unsupported.set(true);
        let mut msg = self.error_message.borrow_mut();
        if !msg.is_empty() {
            msg.push('\n');
        }
        msg.push_str("Unsupported XPath function: ");
        msg.push_str(name);
        Value::NodeSet(Vec::new())
    }
}

pub type XPathFunction = fn(&[Value], &Invocation) -> Value;

/// The registered function table, built once via the same
/// call-once-singleton shape `XPathFunctionLibrary::instance()` uses.
pub struct FunctionLibrary {
    functions: HashMap<&'static str, XPathFunction>,
}

impl FunctionLibrary {
    pub fn instance() -> &'static FunctionLibrary {
        static LIBRARY: OnceLock<FunctionLibrary> = OnceLock::new();
        LIBRARY.get_or_init(FunctionLibrary::new)
    }

    fn new() -> Self {
        let mut functions: HashMap<&'static str, XPathFunction> = HashMap::new();
        macro_rules! reg {
            ($name:literal, $f:expr) => {
                functions.insert($name, $f as XPathFunction);
            };
        }

        // Node-set functions.
        reg!("last", fn_last);
        reg!("position", fn_position);
        reg!("count", fn_count);
        reg!("root", fn_root);

        // Document / accessor functions with no real resolver installed.
        reg!("doc", fn_unsupported_doc);
        reg!("doc-available", fn_false);
        reg!("collection", fn_unsupported_collection);
        reg!("unparsed-text", fn_unsupported_unparsed_text);
        reg!("unparsed-text-available", fn_false);
        reg!("local-name", fn_local_name);
        reg!("namespace-uri", fn_namespace_uri);
        reg!("name", fn_name);

        // String functions.
        reg!("string", fn_string);
        reg!("concat", fn_concat);
        reg!("codepoints-to-string", fn_codepoints_to_string);
        reg!("string-to-codepoints", fn_string_to_codepoints);
        reg!("compare", fn_compare);
        reg!("codepoint-equal", fn_compare);
        reg!("starts-with", fn_starts_with);
        reg!("ends-with", fn_ends_with);
        reg!("contains", fn_contains);
        reg!("substring-before", fn_substring_before);
        reg!("substring-after", fn_substring_after);
        reg!("substring", fn_substring);
        reg!("string-length", fn_string_length);
        reg!("normalize-space", fn_normalize_space);
        reg!("string-join", fn_string_join);
        reg!("translate", fn_translate);
        reg!("upper-case", fn_upper_case);
        reg!("lower-case", fn_lower_case);

        reg!("matches", fn_matches);
        reg!("replace", fn_replace);
        reg!("tokenize", fn_tokenize);

        // Boolean functions.
        reg!("boolean", fn_boolean);
        reg!("not", fn_not);
        reg!("true", fn_true);
        reg!("false", fn_false);
        reg!("exists", fn_exists);
        reg!("empty", fn_empty);

        // Sequence functions.
        reg!("index-of", fn_index_of);
        reg!("distinct-values", fn_distinct_values);
        reg!("reverse", fn_reverse);
        reg!("subsequence", fn_subsequence);
        reg!("unordered", fn_identity_first_arg);
        reg!("zero-or-one", fn_identity_first_arg);
        reg!("one-or-more", fn_identity_first_arg);
        reg!("exactly-one", fn_identity_first_arg);
        reg!("insert-before", fn_insert_before);
        reg!("remove", fn_remove);
        reg!("deep-equal", fn_deep_equal);

        // Number functions.
        reg!("number", fn_number);
        reg!("sum", fn_sum);
        reg!("floor", fn_floor);
        reg!("ceiling", fn_ceiling);
        reg!("round", fn_round);
        reg!("round-half-to-even", fn_round_half_to_even);
        reg!("abs", fn_abs);
        reg!("min", fn_min);
        reg!("max", fn_max);
        reg!("avg", fn_avg);

        // Date/time functions.
        reg!("current-date", fn_current_date);
        reg!("current-time", fn_current_time);
        reg!("current-dateTime", fn_current_date_time);
        reg!("year-from-dateTime", fn_year_from_date_time);
        reg!("month-from-dateTime", fn_month_from_date_time);
        reg!("day-from-dateTime", fn_day_from_date_time);
        reg!("hours-from-dateTime", fn_hours_from_date_time);
        reg!("minutes-from-dateTime", fn_minutes_from_date_time);
        reg!("seconds-from-dateTime", fn_seconds_from_date_time);
        reg!("year-from-date", fn_year_from_date);
        reg!("month-from-date", fn_month_from_date);
        reg!("day-from-date", fn_day_from_date);
        reg!("hours-from-time", fn_hours_from_time);
        reg!("minutes-from-time", fn_minutes_from_time);
        reg!("seconds-from-time", fn_seconds_from_time);

        // Math namespace functions (spec.md §4.10's "math namespace").
        reg!("math:pi", fn_math_pi);
        reg!("math:exp", fn_math_exp);
        reg!("math:exp10", fn_math_exp10);
        reg!("math:log", fn_math_log);
        reg!("math:log10", fn_math_log10);
        reg!("math:pow", fn_math_pow);
        reg!("math:sqrt", fn_math_sqrt);
        reg!("math:sin", fn_math_sin);
        reg!("math:cos", fn_math_cos);
        reg!("math:tan", fn_math_tan);
        reg!("math:asin", fn_math_asin);
        reg!("math:acos", fn_math_acos);
        reg!("math:atan", fn_math_atan);
        reg!("math:atan2", fn_math_atan2);

        Self { functions }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn call(&self, name: &str, args: &[Value], ctx: &Invocation) -> Value {
        match self.functions.get(name) {
            Some(f) => f(args, ctx),
            None => ctx.mark_unsupported(name),
        }
    }
}

// ---- node-set functions ----

fn fn_last(_args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(ctx.size as f64)
}

fn fn_position(_args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(ctx.position as f64)
}

fn fn_count(args: &[Value], _ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.clone().into_items().len()).unwrap_or(0) as f64)
}

fn fn_root(_args: &[Value], ctx: &Invocation) -> Value {
    Value::NodeSet(vec![ctx.document.root()])
}

fn fn_unsupported_doc(_args: &[Value], ctx: &Invocation) -> Value {
    ctx.mark_unsupported("doc")
}

fn fn_unsupported_collection(_args: &[Value], ctx: &Invocation) -> Value {
    ctx.mark_unsupported("collection")
}

fn fn_unsupported_unparsed_text(_args: &[Value], ctx: &Invocation) -> Value {
    ctx.mark_unsupported("unparsed-text")
}

fn first_node(args: &[Value], ctx: &Invocation) -> Option<NodeId> {
    match args.first() {
        Some(Value::NodeSet(nodes)) => nodes.first().copied(),
        None => Some(ctx.node),
        _ => None,
    }
}

fn fn_local_name(args: &[Value], ctx: &Invocation) -> Value {
    let Some(node) = first_node(args, ctx) else { return Value::String(String::new()) };
    let name = ctx.document.element_name(node).map(str::to_string).unwrap_or_default();
    let local = name.rsplit(':').next().unwrap_or(&name).to_string();
    Value::String(local)
}

fn fn_namespace_uri(_args: &[Value], _ctx: &Invocation) -> Value {
    // No namespace support in the in-memory tree (dom.rs's Non-goal).
    Value::String(String::new())
}

fn fn_name(args: &[Value], ctx: &Invocation) -> Value {
    let Some(node) = first_node(args, ctx) else { return Value::String(String::new()) };
    Value::String(ctx.document.element_name(node).map(str::to_string).unwrap_or_default())
}

// ---- string functions ----

fn fn_string(args: &[Value], ctx: &Invocation) -> Value {
    Value::String(args.first().map(|v| v.as_string(ctx.document)).unwrap_or_else(|| ctx.document.string_value(ctx.node)))
}

fn fn_concat(args: &[Value], ctx: &Invocation) -> Value {
    Value::String(args.iter().map(|v| v.as_string(ctx.document)).collect())
}

fn fn_codepoints_to_string(args: &[Value], ctx: &Invocation) -> Value {
    let codepoints = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let s: String = codepoints
        .into_iter()
        .filter_map(|v| char::from_u32(v.as_number(ctx.document) as u32))
        .collect();
    Value::String(s)
}

fn fn_string_to_codepoints(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::Sequence(s.chars().map(|c| Value::Number(c as u32 as f64)).collect())
}

fn fn_compare(args: &[Value], ctx: &Invocation) -> Value {
    let a = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let b = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::Number(match a.cmp(&b) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    })
}

fn fn_starts_with(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let prefix = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::Boolean(s.starts_with(&prefix))
}

fn fn_ends_with(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let suffix = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::Boolean(s.ends_with(&suffix))
}

fn fn_contains(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let needle = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::Boolean(s.contains(&needle))
}

fn fn_substring_before(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let needle = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::String(s.find(&needle).map(|i| s[..i].to_string()).unwrap_or_default())
}

fn fn_substring_after(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let needle = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::String(s.find(&needle).map(|i| s[i + needle.len()..].to_string()).unwrap_or_default())
}

fn fn_substring(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let chars: Vec<char> = s.chars().collect();
    let start = args.get(1).map(|v| v.as_number(ctx.document)).unwrap_or(1.0);
    // XPath substring uses 1-based, rounded start positions and a length
    // that may be omitted (run to the end).
    let start_round = start.round();
    let length = args.get(2).map(|v| v.as_number(ctx.document).round());
    let first = start_round;
    let last = match length {
        Some(len) => first + len,
        None => f64::INFINITY,
    };
    let mut out = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let pos = (i + 1) as f64;
        if pos >= first && pos < last {
            out.push(c);
        }
    }
    Value::String(out)
}

fn fn_string_length(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_else(|| ctx.document.string_value(ctx.node));
    Value::Number(s.chars().count() as f64)
}

fn fn_normalize_space(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_else(|| ctx.document.string_value(ctx.node));
    Value::String(s.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn fn_string_join(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let sep = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::String(items.iter().map(|v| v.as_string(ctx.document)).collect::<Vec<_>>().join(&sep))
}

fn fn_translate(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let from: Vec<char> = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default().chars().collect();
    let to: Vec<char> = args.get(2).map(|v| v.as_string(ctx.document)).unwrap_or_default().chars().collect();
    let mut out = String::new();
    for c in s.chars() {
        match from.iter().position(|&f| f == c) {
            Some(idx) => {
                if let Some(&replacement) = to.get(idx) {
                    out.push(replacement);
                }
            }
            None => out.push(c),
        }
    }
    Value::String(out)
}

fn fn_upper_case(args: &[Value], ctx: &Invocation) -> Value {
    Value::String(args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default().to_uppercase())
}

fn fn_lower_case(args: &[Value], ctx: &Invocation) -> Value {
    Value::String(args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default().to_lowercase())
}

fn fn_matches(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let pattern = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    Value::Boolean(regex::Regex::new(&pattern).map(|re| re.is_match(&s)).unwrap_or(false))
}

fn fn_replace(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let pattern = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let replacement = args.get(2).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    // XPath uses `$1`-style backreferences; `regex` uses the same syntax.
    match regex::Regex::new(&pattern) {
        Ok(re) => Value::String(re.replace_all(&s, replacement.as_str()).into_owned()),
        Err(_) => Value::String(s),
    }
}

fn fn_tokenize(args: &[Value], ctx: &Invocation) -> Value {
    let s = args.first().map(|v| v.as_string(ctx.document)).unwrap_or_default();
    let pattern = args.get(1).map(|v| v.as_string(ctx.document)).unwrap_or_default();
    match regex::Regex::new(&pattern) {
        Ok(re) => Value::Sequence(re.split(&s).map(|piece| Value::String(piece.to_string())).collect()),
        Err(_) => Value::Sequence(vec![Value::String(s)]),
    }
}

// ---- boolean functions ----

fn fn_boolean(args: &[Value], ctx: &Invocation) -> Value {
    Value::Boolean(args.first().map(|v| v.as_boolean(ctx.document)).unwrap_or(false))
}

fn fn_not(args: &[Value], ctx: &Invocation) -> Value {
    Value::Boolean(!args.first().map(|v| v.as_boolean(ctx.document)).unwrap_or(false))
}

fn fn_true(_args: &[Value], _ctx: &Invocation) -> Value {
    Value::Boolean(true)
}

fn fn_false(_args: &[Value], _ctx: &Invocation) -> Value {
    Value::Boolean(false)
}

fn fn_exists(args: &[Value], _ctx: &Invocation) -> Value {
    Value::Boolean(args.first().map(|v| !v.clone().into_items().is_empty()).unwrap_or(false))
}

fn fn_empty(args: &[Value], _ctx: &Invocation) -> Value {
    Value::Boolean(args.first().map(|v| v.clone().into_items().is_empty()).unwrap_or(true))
}

// ---- sequence functions ----

fn fn_index_of(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let target = args.get(1).map(|v| v.as_number(ctx.document));
    let mut indices = Vec::new();
    for (i, item) in items.iter().enumerate() {
        if Some(item.as_number(ctx.document)) == target {
            indices.push(Value::Number((i + 1) as f64));
        }
    }
    Value::Sequence(indices)
}

fn fn_distinct_values(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for item in items {
        let key = item.as_string(ctx.document);
        if !seen.contains(&key) {
            seen.push(key);
            out.push(item);
        }
    }
    Value::Sequence(out)
}

fn fn_reverse(args: &[Value], _ctx: &Invocation) -> Value {
    let mut items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    items.reverse();
    Value::Sequence(items)
}

fn fn_subsequence(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let start = args.get(1).map(|v| v.as_number(ctx.document)).unwrap_or(1.0).round();
    let length = args.get(2).map(|v| v.as_number(ctx.document).round());
    let last = length.map(|len| start + len).unwrap_or(f64::INFINITY);
    let out: Vec<Value> = items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= start && pos < last
        })
        .map(|(_, v)| v)
        .collect();
    Value::Sequence(out)
}

fn fn_identity_first_arg(args: &[Value], _ctx: &Invocation) -> Value {
    args.first().cloned().unwrap_or(Value::Sequence(Vec::new()))
}

fn fn_insert_before(args: &[Value], ctx: &Invocation) -> Value {
    let mut items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let position = args.get(1).map(|v| v.as_number(ctx.document).round() as i64).unwrap_or(1);
    let insert = args.get(2).cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let idx = ((position - 1).max(0) as usize).min(items.len());
    items.splice(idx..idx, insert);
    Value::Sequence(items)
}

fn fn_remove(args: &[Value], ctx: &Invocation) -> Value {
    let mut items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let position = args.get(1).map(|v| v.as_number(ctx.document).round() as i64).unwrap_or(0);
    if position >= 1 && (position as usize) <= items.len() {
        items.remove(position as usize - 1);
    }
    Value::Sequence(items)
}

fn fn_deep_equal(args: &[Value], ctx: &Invocation) -> Value {
    let a = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let b = args.get(1).cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    let equal = a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(x, y)| x.as_string(ctx.document) == y.as_string(ctx.document));
    Value::Boolean(equal)
}

// ---- number functions ----

fn fn_number(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or_else(|| ctx.document.string_value(ctx.node).trim().parse().unwrap_or(f64::NAN)))
}

fn fn_sum(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    if items.is_empty() {
        return Value::Number(args.get(1).map(|v| v.as_number(ctx.document)).unwrap_or(0.0));
    }
    Value::Number(items.iter().map(|v| v.as_number(ctx.document)).sum())
}

fn fn_floor(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).floor())
}

fn fn_ceiling(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).ceil())
}

fn fn_round(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).round())
}

fn fn_round_half_to_even(args: &[Value], ctx: &Invocation) -> Value {
    let n = args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN);
    let floor = n.floor();
    let diff = n - floor;
    let rounded = if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    };
    Value::Number(rounded)
}

fn fn_abs(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).abs())
}

fn fn_min(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    Value::Number(items.iter().map(|v| v.as_number(ctx.document)).fold(f64::INFINITY, f64::min))
}

fn fn_max(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    Value::Number(items.iter().map(|v| v.as_number(ctx.document)).fold(f64::NEG_INFINITY, f64::max))
}

fn fn_avg(args: &[Value], ctx: &Invocation) -> Value {
    let items = args.first().cloned().unwrap_or(Value::Sequence(Vec::new())).into_items();
    if items.is_empty() {
        return Value::Number(f64::NAN);
    }
    let total: f64 = items.iter().map(|v| v.as_number(ctx.document)).sum();
    Value::Number(total / items.len() as f64)
}

// ---- date/time functions ----

fn fn_current_date(_args: &[Value], _ctx: &Invocation) -> Value {
    Value::Date(Local::now().date_naive())
}

fn fn_current_time(_args: &[Value], _ctx: &Invocation) -> Value {
    Value::Time(Local::now().time())
}

fn fn_current_date_time(_args: &[Value], _ctx: &Invocation) -> Value {
    Value::DateTime(Local::now().naive_local())
}

fn parse_date_time(args: &[Value], ctx: &Invocation) -> Option<NaiveDateTime> {
    match args.first()? {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(d) => Some(d.and_hms_opt(0, 0, 0).unwrap()),
        other => {
            let s = other.as_string(ctx.document);
            NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S").ok()
        }
    }
}

fn fn_year_from_date_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_date_time(args, ctx).map(|dt| Value::Number(dt.year() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_month_from_date_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_date_time(args, ctx).map(|dt| Value::Number(dt.month() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_day_from_date_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_date_time(args, ctx).map(|dt| Value::Number(dt.day() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_hours_from_date_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_date_time(args, ctx).map(|dt| Value::Number(dt.hour() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_minutes_from_date_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_date_time(args, ctx).map(|dt| Value::Number(dt.minute() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_seconds_from_date_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_date_time(args, ctx).map(|dt| Value::Number(dt.second() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn parse_date(args: &[Value], ctx: &Invocation) -> Option<NaiveDate> {
    match args.first()? {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date()),
        other => NaiveDate::parse_from_str(&other.as_string(ctx.document), "%Y-%m-%d").ok(),
    }
}

fn fn_year_from_date(args: &[Value], ctx: &Invocation) -> Value {
    parse_date(args, ctx).map(|d| Value::Number(d.year() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_month_from_date(args: &[Value], ctx: &Invocation) -> Value {
    parse_date(args, ctx).map(|d| Value::Number(d.month() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_day_from_date(args: &[Value], ctx: &Invocation) -> Value {
    parse_date(args, ctx).map(|d| Value::Number(d.day() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn parse_time(args: &[Value], ctx: &Invocation) -> Option<NaiveTime> {
    match args.first()? {
        Value::Time(t) => Some(*t),
        Value::DateTime(dt) => Some(dt.time()),
        other => NaiveTime::parse_from_str(&other.as_string(ctx.document), "%H:%M:%S").ok(),
    }
}

fn fn_hours_from_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_time(args, ctx).map(|t| Value::Number(t.hour() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_minutes_from_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_time(args, ctx).map(|t| Value::Number(t.minute() as f64)).unwrap_or(Value::Number(f64::NAN))
}

fn fn_seconds_from_time(args: &[Value], ctx: &Invocation) -> Value {
    parse_time(args, ctx).map(|t| Value::Number(t.second() as f64)).unwrap_or(Value::Number(f64::NAN))
}

// ---- math namespace functions ----

fn fn_math_pi(_args: &[Value], _ctx: &Invocation) -> Value {
    Value::Number(std::f64::consts::PI)
}

fn fn_math_exp(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).exp())
}

fn fn_math_exp10(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(10f64.powf(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN)))
}

fn fn_math_log(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).ln())
}

fn fn_math_log10(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).log10())
}

fn fn_math_pow(args: &[Value], ctx: &Invocation) -> Value {
    let base = args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN);
    let exponent = args.get(1).map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN);
    Value::Number(base.powf(exponent))
}

fn fn_math_sqrt(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).sqrt())
}

fn fn_math_sin(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).sin())
}

fn fn_math_cos(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).cos())
}

fn fn_math_tan(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).tan())
}

fn fn_math_asin(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).asin())
}

fn fn_math_acos(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).acos())
}

fn fn_math_atan(args: &[Value], ctx: &Invocation) -> Value {
    Value::Number(args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN).atan())
}

fn fn_math_atan2(args: &[Value], ctx: &Invocation) -> Value {
    let y = args.first().map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN);
    let x = args.get(1).map(|v| v.as_number(ctx.document)).unwrap_or(f64::NAN);
    Value::Number(y.atan2(x))
}
