//! GraphQL-aware response binding.
//!
//! Conventional JSON decoding maps one key to one destination. GraphQL
//! responses break that assumption: sibling inline fragments (`... on A`,
//! `... on B`) make the same key land in several subtrees at once, and
//! fragment fields themselves never appear in the JSON at all — their
//! fields do. The binder therefore works on a *candidate frame*: the
//! ordered set of destinations that should all receive the value it is
//! about to consume. Entering an object matches each key against every
//! candidate, descending transparently through fragment fields, and
//! recurses with the matched destinations as the next frame. When the
//! object carries a `__typename`, only the fragment whose type condition
//! matches it is descended into; the other branches keep their zero
//! values.

use serde::de::Error as _;
use serde_json::Value;

use crate::error::DecodeError;
use crate::shape::{Field, ListShape, Node, OptionShape, Shape};

/// Populate `dest` from the bytes of a GraphQL `data` payload.
///
/// The input must contain exactly one JSON value; trailing
/// non-whitespace input is an error.
pub fn from_slice<T: Shape>(data: &[u8], dest: &mut T) -> Result<(), DecodeError> {
    from_slice_dyn(data, dest)
}

pub(crate) fn from_slice_dyn(data: &[u8], dest: &mut dyn Shape) -> Result<(), DecodeError> {
    let mut stream = serde_json::Deserializer::from_slice(data).into_iter::<Value>();
    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(err)) => return Err(DecodeError::Parse(err)),
        None => {
            return Err(DecodeError::Parse(serde_json::Error::custom(
                "unexpected end of input",
            )))
        }
    };
    let rest = &data[stream.byte_offset()..];
    if let Some(&token) = rest.iter().find(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r')) {
        return Err(DecodeError::ExtraInput(token as char));
    }
    bind_value(vec![dest], &value)
}

/// Bind `value` into every destination of the current candidate frame.
fn bind_value(mut frames: Vec<&mut dyn Shape>, value: &Value) -> Result<(), DecodeError> {
    match value {
        Value::Null => {
            for frame in frames {
                match frame.node() {
                    // A pre-existing pointer is reset to nil.
                    Node::Optional(option) => option.set_none(),
                    Node::List(list) => list.reset(),
                    // Non-optional leaves and records keep their zero value.
                    Node::Object(_) | Node::Scalar(_) => {}
                }
            }
            Ok(())
        }
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            for frame in frames {
                bind_leaf(frame, value)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            let mut lists = Vec::new();
            for frame in frames {
                prepare_array_frame(frame, value, &mut lists)?;
            }
            for item in items {
                let mut elements: Vec<&mut dyn Shape> = Vec::with_capacity(lists.len());
                for list in lists.iter_mut() {
                    elements.push(list.append_default());
                }
                bind_value(elements, item)?;
            }
            Ok(())
        }
        Value::Object(entries) => {
            let places = frames.len();
            for frame in frames.iter_mut() {
                prepare_object_frame(&mut **frame, value)?;
            }
            // When the object names its concrete type, only the matching
            // inline fragment receives the shared keys.
            let typename = entries.get("__typename").and_then(Value::as_str);
            for (key, child) in entries {
                let mut matches: Vec<&mut dyn Shape> = Vec::new();
                let mut placed = 0;
                for frame in frames.iter_mut() {
                    placed +=
                        collect_matches(&mut **frame, key, child.is_null(), typename, &mut matches)?;
                }
                if placed == 0 {
                    return Err(DecodeError::Unplaceable { key: key.clone(), places });
                }
                bind_value(matches, child)?;
            }
            Ok(())
        }
    }
}

/// Bind a scalar JSON token into a single destination, allocating
/// through optionals.
fn bind_leaf(dest: &mut dyn Shape, value: &Value) -> Result<(), DecodeError> {
    match dest.node() {
        Node::Scalar(scalar) => scalar.bind_scalar(value),
        Node::Optional(option) => bind_leaf(option.get_or_insert(), value),
        Node::Object(_) => Err(mismatch(value, "object")),
        Node::List(_) => Err(mismatch(value, "array")),
    }
}

/// Resolve a frame about to receive a JSON array: sequence destinations
/// are emptied (never appended to) and collected; opaque scalars take
/// the raw array value.
fn prepare_array_frame<'a>(
    dest: &'a mut dyn Shape,
    raw: &Value,
    lists: &mut Vec<&'a mut dyn ListShape>,
) -> Result<(), DecodeError> {
    match dest.node() {
        Node::List(list) => {
            list.reset();
            lists.push(list);
            Ok(())
        }
        Node::Optional(option) => prepare_array_frame(option.get_or_insert(), raw, lists),
        Node::Scalar(scalar) => scalar.bind_scalar(raw),
        Node::Object(_) => Err(mismatch(raw, "object")),
    }
}

/// Resolve a frame about to receive a JSON object: optionals are
/// allocated, opaque scalars take the raw object value, records are left
/// for keyed matching.
fn prepare_object_frame(dest: &mut dyn Shape, raw: &Value) -> Result<(), DecodeError> {
    match dest.node() {
        Node::Object(_) => Ok(()),
        Node::Optional(option) => prepare_object_frame(option.get_or_insert(), raw),
        Node::Scalar(scalar) => scalar.bind_scalar(raw),
        Node::List(_) => Err(mismatch(raw, "array")),
    }
}

/// Collect into `out` every destination under `dest` that should receive
/// the value for `key`, descending through fragment promotion. Returns
/// the number of placements found (an unallocated optional fragment
/// absorbing a null counts as placed without being allocated).
fn collect_matches<'a>(
    dest: &'a mut dyn Shape,
    key: &str,
    value_is_null: bool,
    typename: Option<&str>,
    out: &mut Vec<&'a mut dyn Shape>,
) -> Result<usize, DecodeError> {
    match dest.node() {
        Node::Object(fields) => collect_fields(fields, key, value_is_null, typename, out),
        Node::Optional(option) => {
            if value_is_null && !option.is_some() {
                // Writing null into an unallocated subtree leaves it nil.
                Ok(1)
            } else {
                collect_matches(option.get_or_insert(), key, value_is_null, typename, out)
            }
        }
        Node::Scalar(_) | Node::List(_) => Ok(0),
    }
}

fn collect_fields<'a>(
    fields: Vec<Field<'a>>,
    key: &str,
    value_is_null: bool,
    typename: Option<&str>,
    out: &mut Vec<&'a mut dyn Shape>,
) -> Result<usize, DecodeError> {
    let mut placed = 0;
    for field in fields {
        if field.promote {
            // A fragment with a type condition is skipped when the
            // object's `__typename` names a different type; without a
            // `__typename`, every structurally matching fragment is a
            // candidate.
            if !field.name.is_empty() && typename.is_some_and(|t| t != field.name) {
                continue;
            }
            if field.dest.accepts(key) {
                placed += collect_matches(field.dest, key, value_is_null, typename, out)?;
            }
        } else if matches_key(&field, key) {
            out.push(field.dest);
            placed += 1;
        }
    }
    Ok(placed)
}

fn matches_key(field: &Field<'_>, key: &str) -> bool {
    key.eq_ignore_ascii_case(field.name)
        || field.json_name.is_some_and(|json| key.eq_ignore_ascii_case(json))
}

fn mismatch(value: &Value, destination: &'static str) -> DecodeError {
    let value = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    DecodeError::Mismatch { value, destination }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;
    use chrono::TimeZone;

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Me {
        name: String,
        height: f64,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct MeQuery {
        me: Me,
    }

    #[test]
    fn binds_nested_object() {
        let mut got = MeQuery::default();
        from_slice(
            br#"{
                "me": {
                    "name": "Luke Skywalker",
                    "height": 1.72
                }
            }"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(
            got,
            MeQuery {
                me: Me { name: "Luke Skywalker".to_string(), height: 1.72 }
            }
        );
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Tagged {
        #[graphql("baz")]
        foo: String,
    }

    #[test]
    fn binds_by_alias_tag() {
        let mut got = Tagged::default();
        from_slice(br#"{"baz": "bar"}"#, &mut got).unwrap();
        assert_eq!(got, Tagged { foo: "bar".to_string() });
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct JsonTagged {
        #[graphql(json = "baz")]
        foo: String,
    }

    #[test]
    fn binds_by_field_name_despite_json_name() {
        // The field name itself stays an accepted spelling.
        let mut got = JsonTagged::default();
        from_slice(br#"{"foo": "bar"}"#, &mut got).unwrap();
        assert_eq!(got, JsonTagged { foo: "bar".to_string() });
    }

    #[test]
    fn binds_by_json_name() {
        let mut got = JsonTagged::default();
        from_slice(br#"{"baz": "bar"}"#, &mut got).unwrap();
        assert_eq!(got, JsonTagged { foo: "bar".to_string() });
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Arrays {
        foo: Option<Vec<String>>,
        bar: Option<Vec<String>>,
        baz: Option<Vec<String>>,
    }

    #[test]
    fn binds_arrays_empty_and_null() {
        let mut got = Arrays::default();
        from_slice(
            br#"{
                "foo": ["bar", "baz"],
                "bar": [],
                "baz": null
            }"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(
            got,
            Arrays {
                foo: Some(vec!["bar".to_string(), "baz".to_string()]),
                bar: Some(vec![]),
                baz: None,
            }
        );
    }

    #[test]
    fn array_overwrites_prior_contents() {
        let mut got = vec!["initial".to_string()];
        from_slice(br#"["bar", "baz"]"#, &mut got).unwrap();
        assert_eq!(got, vec!["bar".to_string(), "baz".to_string()]);
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Named {
        name: String,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct ObjectArray {
        foo: Vec<Named>,
    }

    #[test]
    fn binds_object_array() {
        let mut got = ObjectArray::default();
        from_slice(br#"{"foo": [{"name": "bar"}, {"name": "baz"}]}"#, &mut got).unwrap();
        assert_eq!(
            got,
            ObjectArray {
                foo: vec![
                    Named { name: "bar".to_string() },
                    Named { name: "baz".to_string() },
                ]
            }
        );
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Pointers {
        foo: Option<String>,
        bar: Option<String>,
    }

    #[test]
    fn null_resets_preexisting_pointer() {
        let mut got = Pointers { foo: None, bar: Some(String::new()) };
        from_slice(br#"{"foo": "foo", "bar": null}"#, &mut got).unwrap();
        assert_eq!(got, Pointers { foo: Some("foo".to_string()), bar: None });
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct PointerArray {
        foo: Vec<Option<Named>>,
    }

    #[test]
    fn binds_object_pointer_array_with_null_element() {
        let mut got = PointerArray::default();
        from_slice(
            br#"{"foo": [{"name": "bar"}, null, {"name": "baz"}]}"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(
            got,
            PointerArray {
                foo: vec![
                    Some(Named { name: "bar".to_string() }),
                    None,
                    Some(Named { name: "baz".to_string() }),
                ]
            }
        );
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct User {
        database_id: u64,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct ActorRef {
        #[graphql("... on User")]
        user: User,
        login: String,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Review {
        author: ActorRef,
        editor: Option<ActorRef>,
    }

    #[test]
    fn fragment_fields_bind_through_pointer() {
        let mut got = Review::default();
        from_slice(
            br#"{
                "author": {
                    "databaseId": 1,
                    "login": "test1"
                },
                "editor": {
                    "databaseId": 2,
                    "login": "test2"
                }
            }"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(
            got,
            Review {
                author: ActorRef {
                    user: User { database_id: 1 },
                    login: "test1".to_string(),
                },
                editor: Some(ActorRef {
                    user: User { database_id: 2 },
                    login: "test2".to_string(),
                }),
            }
        );
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Hidden {
        #[graphql(skip)]
        #[allow(dead_code)]
        foo: String,
    }

    #[test]
    fn skipped_field_is_unplaceable() {
        let err = from_slice(br#"{"foo": "bar"}"#, &mut Hidden::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "struct field for \"foo\" doesn't exist in any of 1 places to unmarshal"
        );
    }

    #[test]
    fn trailing_value_is_rejected() {
        let err = from_slice(br#"{"foo": "bar"}{"foo": "baz"}"#, &mut Tagged::default()).unwrap_err();
        assert_eq!(err.to_string(), "invalid token '{' after top-level value");
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct EventActor {
        login: String,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct ClosedEvent {
        actor: EventActor,
        created_at: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct ReopenedEvent {
        actor: EventActor,
        created_at: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct TimelineItem {
        #[graphql("... on ClosedEvent")]
        closed_event: ClosedEvent,
        #[graphql("... on ReopenedEvent")]
        reopened_event: ReopenedEvent,
    }

    fn timestamp() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.timestamp_opt(1498709521, 0).unwrap()
    }

    #[test]
    fn sibling_fragments_receive_same_values() {
        let mut got = TimelineItem::default();
        from_slice(
            br#"{
                "createdAt": "2017-06-29T04:12:01Z",
                "actor": {
                    "login": "some-user"
                }
            }"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(
            got,
            TimelineItem {
                closed_event: ClosedEvent {
                    actor: EventActor { login: "some-user".to_string() },
                    created_at: timestamp(),
                },
                reopened_event: ReopenedEvent {
                    actor: EventActor { login: "some-user".to_string() },
                    created_at: timestamp(),
                },
            }
        );
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct TypedTimelineItem {
        #[graphql("... on ClosedEvent")]
        closed_event: ClosedEvent,
        #[graphql("... on ReopenedEvent")]
        reopened_event: ReopenedEvent,
        #[graphql("__typename")]
        typename: String,
    }

    #[test]
    fn typename_selects_matching_fragment() {
        let mut got = TypedTimelineItem::default();
        from_slice(
            br#"{
                "createdAt": "2017-06-29T04:12:01Z",
                "actor": {
                    "login": "some-user"
                },
                "__typename": "ClosedEvent"
            }"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(got.typename, "ClosedEvent");
        assert_eq!(
            got.closed_event,
            ClosedEvent {
                actor: EventActor { login: "some-user".to_string() },
                created_at: timestamp(),
            }
        );
        // The fragment whose type condition does not match stays zeroed.
        assert_eq!(got.reopened_event, ReopenedEvent::default());
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct PointerTypedItem {
        #[graphql("... on ClosedEvent")]
        closed_event: ClosedEvent,
        #[graphql("... on ReopenedEvent")]
        reopened_event: ReopenedEvent,
        #[graphql("__typename")]
        typename: Option<String>,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Events {
        #[graphql("foo")]
        foo: Vec<PointerTypedItem>,
    }

    #[test]
    fn typename_binds_per_array_element() {
        let mut got = Events::default();
        from_slice(
            br#"{
                "foo": [
                    {
                        "createdAt": "2017-06-29T04:12:01Z",
                        "actor": {"login": "some-user"},
                        "__typename": "ClosedEvent"
                    },
                    {
                        "createdAt": "2017-06-29T04:12:01Z",
                        "actor": {"login": "other-user"},
                        "__typename": "ReopenedEvent"
                    }
                ]
            }"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(got.foo.len(), 2);
        assert_eq!(got.foo[0].typename.as_deref(), Some("ClosedEvent"));
        assert_eq!(got.foo[0].closed_event.actor.login, "some-user");
        assert_eq!(got.foo[0].reopened_event, ReopenedEvent::default());
        assert_eq!(got.foo[1].typename.as_deref(), Some("ReopenedEvent"));
        assert_eq!(got.foo[1].reopened_event.actor.login, "other-user");
        assert_eq!(got.foo[1].closed_event, ClosedEvent::default());
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct CommitNode {
        url: String,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Commits {
        nodes: Vec<CommitNode>,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct PullRequest {
        #[graphql("commits(last: 1)")]
        commits: Commits,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct SearchNode {
        #[graphql("... on PullRequest")]
        pull_request: PullRequest,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Search {
        nodes: Vec<SearchNode>,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct SearchQuery {
        #[graphql("search(type: ISSUE, first: 1, query: \"type:pr repo:owner/name\")")]
        search: Search,
    }

    #[test]
    fn aliased_array_inside_fragment() {
        let mut got = SearchQuery::default();
        from_slice(
            br#"{
                "search": {
                    "nodes": [
                        {
                            "commits": {
                                "nodes": [
                                    {"url": "https://example.org/commit/49e1"}
                                ]
                            }
                        }
                    ]
                }
            }"#,
            &mut got,
        )
        .unwrap();
        assert_eq!(got.search.nodes.len(), 1);
        assert_eq!(
            got.search.nodes[0].pull_request.commits.nodes[0].url,
            "https://example.org/commit/49e1"
        );
    }

    #[test]
    fn fragment_pointer_stays_nil_on_null_fields() {
        #[derive(Debug, Default, PartialEq, Shape)]
        struct LazyItem {
            #[graphql("... on ClosedEvent")]
            closed_event: Option<ClosedEvent>,
            login: Option<String>,
        }

        let mut got = LazyItem::default();
        from_slice(br#"{"createdAt": null, "actor": null, "login": "x"}"#, &mut got).unwrap();
        assert_eq!(got.closed_event, None);
        assert_eq!(got.login.as_deref(), Some("x"));
    }

    #[test]
    fn scalar_token_into_object_is_shape_mismatch() {
        let err = from_slice(br#"{"me": 42}"#, &mut MeQuery::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Mismatch { .. }));
    }

    #[test]
    fn raw_value_destination_takes_anything() {
        #[derive(Debug, Default, PartialEq, Shape)]
        struct RawQuery {
            payload: serde_json::Value,
        }

        let mut got = RawQuery::default();
        from_slice(br#"{"payload": {"anything": [1, 2, 3]}}"#, &mut got).unwrap();
        assert_eq!(got.payload, serde_json::json!({"anything": [1, 2, 3]}));
    }

    #[test]
    fn null_clears_plain_vec() {
        #[derive(Debug, Default, PartialEq, Shape)]
        struct Plain {
            items: Vec<String>,
        }

        let mut got = Plain { items: vec!["stale".to_string()] };
        from_slice(br#"{"items": null}"#, &mut got).unwrap();
        assert_eq!(got.items, Vec::<String>::new());
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    struct GitObjectId(String);

    crate::scalar!(GitObjectId);

    #[test]
    fn registered_scalar_takes_raw_token() {
        #[derive(Debug, Default, PartialEq, Shape)]
        struct CommitQuery {
            oid: GitObjectId,
        }

        let mut got = CommitQuery::default();
        from_slice(br#"{"oid": "49e1"}"#, &mut got).unwrap();
        assert_eq!(got.oid, GitObjectId("49e1".to_string()));

        let mut selection = String::new();
        CommitQuery::write_selection(&mut selection, false);
        assert_eq!(selection, "{oid}");
    }

    #[test]
    fn key_matches_case_insensitively() {
        let mut got = User::default();
        from_slice(br#"{"DatabaseID": 7}"#, &mut got).unwrap();
        assert_eq!(got.database_id, 7);
    }
}
