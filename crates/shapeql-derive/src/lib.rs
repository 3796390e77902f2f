//! Derive macros for the `Shape` and `InputValue` traits.
//!
//! `#[derive(Shape)]` turns a struct definition into a GraphQL query
//! shape: the generated code writes the selection set from the field
//! layout and mirrors the fields back to the response binder. No manual
//! GraphQL strings needed — the struct shape IS the query shape.
//!
//! # Usage
//!
//! ```ignore
//! use shapeql::Shape;
//!
//! #[derive(Shape, Default)]
//! struct Issue {
//!     title: String,
//!     #[graphql("comments(first: 10)")]
//!     comments: Vec<Comment>,
//!     #[graphql("... on PrivateIssue")]
//!     private: PrivateIssue,
//! }
//! ```
//!
//! Selection: `{title,comments(first: 10){…},... on PrivateIssue{…}}`

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Per-field `#[graphql(...)]` attribute contents.
#[derive(Default)]
struct FieldAttrs {
    /// Verbatim tag: an alias with optional inline arguments, an
    /// inline-fragment spread (`... on Type`), or `__typename`.
    tag: Option<String>,
    /// Inline the field's sub-selection into the parent, without a name.
    flatten: bool,
    /// Exclude the field from both the selection and response binding.
    skip: bool,
    /// Extra JSON spelling accepted by the binder when no tag is present.
    json: Option<String>,
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("graphql") {
            continue;
        }
        if let Ok(lit) = attr.parse_args::<LitStr>() {
            out.tag = Some(lit.value());
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("flatten") {
                out.flatten = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                out.skip = true;
                Ok(())
            } else if meta.path.is_ident("json") {
                let value: LitStr = meta.value()?.parse()?;
                out.json = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected a tag literal, `flatten`, `skip`, or `json = \"...\"`"))
            }
        })?;
    }
    Ok(out)
}

/// Derive `Shape` for a struct with named fields.
///
/// Each field contributes a selection entry and a binding destination:
/// - plain fields select as the `lowerCamelCase` of the field name;
/// - `#[graphql("alias(arg: 1)")]` emits the tag verbatim and binds by
///   the bare alias;
/// - `#[graphql("... on Type")]` fields are inline fragments: the binder
///   skips the field itself and promotes its fields to the parent level;
/// - `#[graphql(flatten)]` inlines the field's selection and promotes its
///   fields, contributing no name of its own.
#[proc_macro_derive(Shape, attributes(graphql))]
pub fn derive_shape(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    &input,
                    "Shape can only be derived on structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Shape can only be derived on structs")
                .to_compile_error()
                .into();
        }
    };

    let mut selection_parts = Vec::new();
    let mut probe_arms = Vec::new();
    let mut field_entries = Vec::new();

    for field in fields {
        let attrs = match parse_field_attrs(field) {
            Ok(attrs) => attrs,
            Err(err) => return err.to_compile_error().into(),
        };
        if attrs.skip {
            continue;
        }

        let field_ident = field.ident.as_ref().expect("named field should have ident");
        let ty = &field.ty;

        // Convert Rust snake_case field name to GraphQL camelCase.
        // Handle raw identifiers (r#type → type).
        let rust_name = field_ident.to_string();
        let clean_name = rust_name.strip_prefix("r#").unwrap_or(&rust_name);
        let camel_name = shapeql_ident::parse_snake_case(clean_name).to_lower_camel_case();

        let is_fragment = attrs.tag.as_deref().is_some_and(|t| t.starts_with("... on"));
        let promote = is_fragment || attrs.flatten;

        let comma = if selection_parts.is_empty() {
            quote! {}
        } else {
            quote! { buf.push(','); }
        };

        if attrs.flatten {
            selection_parts.push(quote! {
                #comma
                <#ty as ::shapeql::Shape>::write_selection(buf, true);
            });
        } else {
            let sel_name = attrs.tag.clone().unwrap_or_else(|| camel_name.clone());
            selection_parts.push(quote! {
                #comma
                buf.push_str(#sel_name);
                <#ty as ::shapeql::Shape>::write_selection(buf, false);
            });
        }

        if promote {
            // A fragment field carries its type condition so the binder
            // can select it by the object's `__typename`; flattened
            // fields carry none and always promote.
            let condition = if is_fragment {
                attrs
                    .tag
                    .as_deref()
                    .unwrap_or("")
                    .trim_start_matches("... on")
                    .trim()
                    .to_string()
            } else {
                String::new()
            };
            probe_arms.push(quote! { <#ty as ::shapeql::Shape>::probe(key) });
            field_entries.push(quote! {
                ::shapeql::Field {
                    name: #condition,
                    json_name: ::std::option::Option::None,
                    promote: true,
                    dest: &mut self.#field_ident,
                }
            });
        } else {
            // The binder matches the bare alias: inline arguments are
            // stripped, so `commits(last: 1)` binds the key `commits`.
            let bind_name = match &attrs.tag {
                Some(tag) => tag.split('(').next().unwrap_or(tag).trim_end().to_string(),
                None => camel_name.clone(),
            };
            // A JSON-name spelling applies only when no tag is present.
            let json_name = match (&attrs.tag, &attrs.json) {
                (None, Some(json)) => quote! { ::std::option::Option::Some(#json) },
                _ => quote! { ::std::option::Option::None },
            };
            let mut probe = quote! { key.eq_ignore_ascii_case(#bind_name) };
            if let (None, Some(json)) = (&attrs.tag, &attrs.json) {
                probe = quote! { #probe || key.eq_ignore_ascii_case(#json) };
            }
            probe_arms.push(probe);
            field_entries.push(quote! {
                ::shapeql::Field {
                    name: #bind_name,
                    json_name: #json_name,
                    promote: false,
                    dest: &mut self.#field_ident,
                }
            });
        }
    }

    let probe_expr = probe_arms
        .into_iter()
        .reduce(|acc, arm| quote! { #acc || #arm })
        .unwrap_or_else(|| {
            quote! {
                {
                    let _ = key;
                    false
                }
            }
        });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let expanded = quote! {
        impl #impl_generics ::shapeql::Shape for #name #ty_generics #where_clause {
            fn write_selection(buf: &mut ::std::string::String, inline: bool) {
                if !inline {
                    buf.push('{');
                }
                #(#selection_parts)*
                if !inline {
                    buf.push('}');
                }
            }

            fn probe(key: &str) -> bool {
                #probe_expr
            }

            fn node(&mut self) -> ::shapeql::Node<'_> {
                ::shapeql::Node::Object(::std::vec![
                    #(#field_entries),*
                ])
            }

            fn accepts(&self, key: &str) -> bool {
                <Self as ::shapeql::Shape>::probe(key)
            }
        }
    };

    expanded.into()
}

/// Derive `InputValue` for a named input type (input object or enum).
///
/// The GraphQL type name is the Rust type's unqualified name; the value
/// itself is serialized through the type's `serde::Serialize` impl.
#[proc_macro_derive(InputValue)]
pub fn derive_input_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let gql_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::shapeql::InputValue for #name #ty_generics #where_clause {
            fn write_graphql_type(
                buf: &mut ::std::string::String,
                required: bool,
            ) -> ::std::result::Result<(), ::shapeql::QueryError> {
                buf.push_str(#gql_name);
                if required {
                    buf.push('!');
                }
                ::std::result::Result::Ok(())
            }
        }
    };

    expanded.into()
}
