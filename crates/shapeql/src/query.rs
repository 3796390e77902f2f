//! Operation synthesis: variable declarations and minified query text.
//!
//! The selection set comes from the destination type's [`Shape`] impl;
//! this module supplies the other half of the operation string — the
//! `query`/`mutation` keyword, the optional operation name, and the
//! variable declarations printed from each variable's host type.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::QueryError;
use crate::shape::{Shape, ID};

/// A value usable as a GraphQL variable.
///
/// The impl prints the value's GraphQL type: `Option<T>` is optional (no
/// trailing `!`), `Vec<T>` is a list with required elements, everything
/// else is the type's GraphQL name with `!`. Bare strings print as `ID`
/// by convention. Derive it on input objects and enums with
/// `#[derive(InputValue)]`.
pub trait InputValue: Serialize {
    /// Append the GraphQL type of `Self` to `buf`.
    fn write_graphql_type(buf: &mut String, required: bool) -> Result<(), QueryError>;
}

macro_rules! input_type {
    ($($ty:ty => $name:literal),+ $(,)?) => {$(
        impl InputValue for $ty {
            fn write_graphql_type(buf: &mut String, required: bool) -> Result<(), QueryError> {
                buf.push_str($name);
                if required {
                    buf.push('!');
                }
                Ok(())
            }
        }
    )+};
}

input_type! {
    bool => "Boolean",
    i8 => "Int",
    i16 => "Int",
    i32 => "Int",
    i64 => "Int",
    u8 => "Int",
    u16 => "Int",
    u32 => "Int",
    u64 => "Int",
    f32 => "Float",
    f64 => "Float",
    String => "ID",
    &str => "ID",
    ID => "ID",
    chrono::DateTime<chrono::Utc> => "DateTime",
    chrono::DateTime<chrono::FixedOffset> => "DateTime",
}

impl<T: InputValue> InputValue for Option<T> {
    fn write_graphql_type(buf: &mut String, _required: bool) -> Result<(), QueryError> {
        // Optionality wins: no `!` regardless of position.
        T::write_graphql_type(buf, false)
    }
}

impl<T: InputValue> InputValue for Vec<T> {
    fn write_graphql_type(buf: &mut String, required: bool) -> Result<(), QueryError> {
        buf.push('[');
        T::write_graphql_type(buf, true)?;
        buf.push(']');
        if required {
            buf.push('!');
        }
        Ok(())
    }
}

impl<T: InputValue, const N: usize> InputValue for [T; N]
where
    [T; N]: Serialize,
{
    fn write_graphql_type(buf: &mut String, required: bool) -> Result<(), QueryError> {
        buf.push('[');
        T::write_graphql_type(buf, true)?;
        buf.push(']');
        if required {
            buf.push('!');
        }
        Ok(())
    }
}

impl InputValue for Value {
    fn write_graphql_type(_buf: &mut String, _required: bool) -> Result<(), QueryError> {
        // A dynamic JSON value carries no declarable GraphQL type.
        Err(QueryError::UnprintableType("serde_json::Value"))
    }
}

/// The variables of an operation, keyed by `$name`.
///
/// Declarations are emitted in ascending key order so the synthesized
/// operation is deterministic for a given set of keys.
#[derive(Clone, Debug, Default)]
pub struct Variables {
    vars: BTreeMap<String, Variable>,
}

#[derive(Clone, Debug)]
struct Variable {
    graphql_type: String,
    value: Value,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable. The GraphQL type is printed from `T` and the
    /// value serialized to JSON, so failures surface here, at synthesis
    /// time.
    pub fn set<T: InputValue>(mut self, name: impl Into<String>, value: T) -> Result<Self, QueryError> {
        let mut graphql_type = String::new();
        T::write_graphql_type(&mut graphql_type, true)?;
        let value = serde_json::to_value(&value).map_err(QueryError::Encode)?;
        self.vars.insert(name.into(), Variable { graphql_type, value });
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// `$k:Type` declarations in key order. Commas are insignificant in
    /// GraphQL and are omitted for minified output.
    pub(crate) fn write_declarations(&self, buf: &mut String) {
        for (name, var) in &self.vars {
            buf.push('$');
            buf.push_str(name);
            buf.push(':');
            buf.push_str(&var.graphql_type);
        }
    }

    /// The `variables` object of the request envelope.
    pub(crate) fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (name, var) in &self.vars {
            map.insert(name.clone(), var.value.clone());
        }
        Value::Object(map)
    }
}

/// Construct a minified query operation for the shape `T`.
///
/// An anonymous query without variables is a bare selection set.
pub fn construct_query<T: Shape>(operation_name: Option<&str>, variables: &Variables) -> String {
    let mut selection = String::new();
    T::write_selection(&mut selection, false);
    if variables.is_empty() && operation_name.is_none() {
        return selection;
    }
    assemble("query", operation_name, variables, &selection)
}

/// Construct a minified mutation operation for the shape `T`.
pub fn construct_mutation<T: Shape>(operation_name: Option<&str>, variables: &Variables) -> String {
    let mut selection = String::new();
    T::write_selection(&mut selection, false);
    assemble("mutation", operation_name, variables, &selection)
}

fn assemble(keyword: &str, operation_name: Option<&str>, variables: &Variables, selection: &str) -> String {
    let mut out = String::from(keyword);
    if let Some(name) = operation_name {
        out.push(' ');
        out.push_str(name);
    }
    if !variables.is_empty() {
        out.push('(');
        variables.write_declarations(&mut out);
        out.push(')');
    }
    out.push_str(selection);
    out
}

/// Render a selection set from an ordered list of `[key, value]` pairs.
///
/// This is the value-driven form for selections whose shape is not known
/// at compile time. Ordering matters for deterministic output, so a JSON
/// object — which carries no order — is rejected; the canonical form is
/// an array of two-element pairs, nested arbitrarily:
///
/// ```ignore
/// let sel = shapeql::selection_from_pairs(&serde_json::json!([
///     ["user", [["name", null], ["height", null]]],
/// ]))?;
/// assert_eq!(sel, "{user{name,height}}");
/// ```
pub fn selection_from_pairs(pairs: &Value) -> Result<String, QueryError> {
    let mut buf = String::new();
    write_pairs(&mut buf, pairs)?;
    Ok(buf)
}

fn write_pairs(buf: &mut String, value: &Value) -> Result<(), QueryError> {
    match value {
        Value::Array(items) => {
            buf.push('{');
            for (i, item) in items.iter().enumerate() {
                let pair = item
                    .as_array()
                    .ok_or_else(|| QueryError::BadPairShape(item.to_string()))?;
                if pair.len() != 2 {
                    return Err(QueryError::BadPairShape(item.to_string()));
                }
                let key = pair[0]
                    .as_str()
                    .ok_or_else(|| QueryError::BadPairShape(item.to_string()))?;
                if i != 0 {
                    buf.push(',');
                }
                buf.push_str(key);
                if !pair[1].is_null() {
                    write_pairs(buf, &pair[1])?;
                }
            }
            buf.push('}');
            Ok(())
        }
        Value::Object(_) => Err(QueryError::UnorderedMapNotSupported),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;
    use serde_json::json;

    #[derive(Default, Shape)]
    struct Height {
        name: String,
        height: f64,
    }

    #[derive(Default, Shape)]
    struct MeQuery {
        me: Height,
    }

    #[test]
    fn selection_from_struct_shape() {
        assert_eq!(construct_query::<MeQuery>(None, &Variables::new()), "{me{name,height}}");
    }

    #[derive(Default, Shape)]
    struct Viewer {
        #[graphql("createdAt")]
        created: chrono::DateTime<chrono::Utc>,
        database_id: Option<u64>,
    }

    #[derive(Default, Shape)]
    struct ViewerQuery {
        viewer: Viewer,
    }

    #[test]
    fn scalar_fields_have_no_selection() {
        // DateTime is an opaque scalar: no braces after createdAt.
        assert_eq!(
            construct_query::<ViewerQuery>(None, &Variables::new()),
            "{viewer{createdAt,databaseId}}"
        );
    }

    #[derive(Default, Shape)]
    struct Actor {
        login: String,
    }

    #[derive(Default, Shape)]
    struct ClosedEvent {
        created_at: chrono::DateTime<chrono::Utc>,
        actor: Actor,
    }

    #[derive(Default, Shape)]
    struct ReopenedEvent {
        created_at: chrono::DateTime<chrono::Utc>,
        actor: Actor,
    }

    #[derive(Default, Shape)]
    struct TimelineItem {
        #[graphql("__typename")]
        typename: String,
        #[graphql("... on ClosedEvent")]
        closed: ClosedEvent,
        #[graphql("... on ReopenedEvent")]
        reopened: ReopenedEvent,
    }

    #[test]
    fn union_selection() {
        let mut buf = String::new();
        TimelineItem::write_selection(&mut buf, false);
        assert_eq!(
            buf,
            "{__typename,... on ClosedEvent{createdAt,actor{login}},... on ReopenedEvent{createdAt,actor{login}}}"
        );
    }

    #[derive(Default, Shape)]
    struct PageInfo {
        end_cursor: Option<String>,
        has_next_page: bool,
    }

    #[derive(Default, Shape)]
    struct IssueConnection {
        #[graphql(flatten)]
        page_info: PageInfo,
        total_count: i64,
    }

    #[test]
    fn flattened_field_is_inlined() {
        let mut buf = String::new();
        IssueConnection::write_selection(&mut buf, false);
        assert_eq!(buf, "{endCursor,hasNextPage,totalCount}");
    }

    #[derive(Default, Shape)]
    struct Commit {
        url: String,
    }

    #[derive(Default, Shape)]
    struct PullRequest {
        #[graphql("commits(last: 1)")]
        commits: Vec<Commit>,
    }

    #[test]
    fn alias_with_arguments_is_emitted_verbatim() {
        let mut buf = String::new();
        PullRequest::write_selection(&mut buf, false);
        assert_eq!(buf, "{commits(last: 1){url}}");
    }

    #[derive(Default, Shape)]
    struct SkipShape {
        name: String,
        #[graphql(skip)]
        #[allow(dead_code)]
        cached: Option<String>,
    }

    #[test]
    fn skipped_field_is_absent() {
        let mut buf = String::new();
        SkipShape::write_selection(&mut buf, false);
        assert_eq!(buf, "{name}");
    }

    #[test]
    fn variable_declarations_sorted_by_key() {
        let variables = Variables::new()
            .set("b", Some(true))
            .and_then(|v| v.set("a", 123i32))
            .unwrap();
        assert_eq!(
            construct_query::<MeQuery>(None, &variables),
            "query($a:Int!$b:Boolean){me{name,height}}"
        );
    }

    #[test]
    fn variable_list_and_option_types() {
        let variables = Variables::new()
            .set("ids", vec![ID::from("a"), ID::from("b")])
            .and_then(|v| v.set("first", Some(10i32)))
            .and_then(|v| v.set("states", Vec::<Option<String>>::new()))
            .unwrap();
        let mut buf = String::new();
        variables.write_declarations(&mut buf);
        assert_eq!(buf, "$first:Int$ids:[ID!]!$states:[ID]!");
    }

    #[test]
    fn dynamic_value_variable_is_rejected() {
        let err = Variables::new().set("v", json!({"a": 1})).unwrap_err();
        assert!(matches!(err, QueryError::UnprintableType(_)));
    }

    #[test]
    fn operation_forms() {
        let no_vars = Variables::new();
        let vars = Variables::new().set("a", 1i32).unwrap();
        assert_eq!(construct_query::<MeQuery>(None, &no_vars), "{me{name,height}}");
        assert_eq!(construct_query::<MeQuery>(Some("Me"), &no_vars), "query Me{me{name,height}}");
        assert_eq!(construct_query::<MeQuery>(None, &vars), "query($a:Int!){me{name,height}}");
        assert_eq!(
            construct_query::<MeQuery>(Some("Me"), &vars),
            "query Me($a:Int!){me{name,height}}"
        );
        assert_eq!(construct_mutation::<MeQuery>(None, &no_vars), "mutation{me{name,height}}");
        assert_eq!(
            construct_mutation::<MeQuery>(Some("Set"), &vars),
            "mutation Set($a:Int!){me{name,height}}"
        );
    }

    #[test]
    fn pairs_render_ordered_selection() {
        let sel = selection_from_pairs(&json!([
            ["user", [["name", null], ["height", null]]],
            ["version", null],
        ]))
        .unwrap();
        assert_eq!(sel, "{user{name,height},version}");
    }

    #[test]
    fn pairs_reject_unordered_map() {
        let err = selection_from_pairs(&json!({"user": null})).unwrap_err();
        assert!(matches!(err, QueryError::UnorderedMapNotSupported));
    }

    #[test]
    fn pairs_reject_bad_pair_shape() {
        let err = selection_from_pairs(&json!([["user", null, 1]])).unwrap_err();
        assert!(matches!(err, QueryError::BadPairShape(_)));
        let err = selection_from_pairs(&json!([["user"]])).unwrap_err();
        assert!(matches!(err, QueryError::BadPairShape(_)));
    }

    #[derive(serde::Serialize, crate::InputValue)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    #[allow(dead_code)]
    enum IssueState {
        Open,
        Closed,
    }

    #[test]
    fn derived_input_value_prints_type_name() {
        let variables = Variables::new().set("state", IssueState::Open).unwrap();
        let mut buf = String::new();
        variables.write_declarations(&mut buf);
        assert_eq!(buf, "$state:IssueState!");
    }
}
