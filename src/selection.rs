//! Flatten a query's requested-field tree into field names.

use async_graphql::dynamic::ResolverContext;
use async_graphql::parser::types::{ExecutableDocument, FragmentDefinition, Selection as AstSelection, SelectionSet};
use async_graphql::parser::{parse_query, Positioned};
use async_graphql::{Name, SelectionField};
use std::collections::HashMap;

/// One requested field and whatever was selected beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    pub children: Vec<Selection>,
}

impl Selection {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self { name: name.into(), children: Vec::new() }
    }

    pub fn new(name: impl Into<String>, children: Vec<Selection>) -> Self {
        Self { name: name.into(), children }
    }

    /// Capture a live selection, fragments already expanded by the engine.
    pub fn from_field(field: SelectionField<'_>) -> Self {
        Self {
            name: field.name().to_string(),
            children: field.selection_set().map(Selection::from_field).collect(),
        }
    }
}

/// Depth-first, duplicates kept.
pub fn requested_fields(selections: &[Selection]) -> Vec<String> {
    let mut out = Vec::new();
    collect(selections, &mut out);
    out
}

fn collect(selections: &[Selection], out: &mut Vec<String>) {
    for selection in selections {
        out.push(selection.name.clone());
        collect(&selection.children, out);
    }
}

/// Fields requested beneath the field currently being resolved.
pub fn requested_fields_in(ctx: &ResolverContext<'_>) -> Vec<String> {
    let selections: Vec<Selection> = ctx.ctx.field().selection_set().map(Selection::from_field).collect();
    requested_fields(&selections)
}

/// Top-level selections of every operation in `query`.
///
/// Unparseable or empty queries yield no selections.
pub fn selections_from_query(query: &str) -> Vec<Selection> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let document = match parse_query(query) {
        Ok(document) => document,
        Err(err) => {
            tracing::debug!(%err, "query did not parse, no selections");
            return Vec::new();
        }
    };
    let ExecutableDocument { operations, fragments } = &document;
    let mut out = Vec::new();
    for (_, operation) in operations.iter() {
        let mut active = Vec::new();
        out.extend(lower_set(&operation.node.selection_set.node, fragments, &mut active));
    }
    out
}

fn lower_set(
    set: &SelectionSet,
    fragments: &HashMap<Name, Positioned<FragmentDefinition>>,
    active: &mut Vec<Name>,
) -> Vec<Selection> {
    let mut out = Vec::new();
    for item in &set.items {
        match &item.node {
            AstSelection::Field(field) => {
                let children = lower_set(&field.node.selection_set.node, fragments, active);
                out.push(Selection::new(field.node.name.node.to_string(), children));
            }
            AstSelection::InlineFragment(fragment) => {
                out.extend(lower_set(&fragment.node.selection_set.node, fragments, active));
            }
            AstSelection::FragmentSpread(spread) => {
                let name = &spread.node.fragment_name.node;
                // a fragment spreading itself is invalid; stop rather than loop
                if active.contains(name) {
                    continue;
                }
                let Some(fragment) = fragments.get(name) else {
                    tracing::debug!(fragment = %name, "unknown fragment");
                    continue;
                };
                active.push(name.clone());
                out.extend(lower_set(&fragment.node.selection_set.node, fragments, active));
                active.pop();
            }
        }
    }
    out
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_depth_first() {
        let sel = selections_from_query("{ user { id name } posts { title } }");
        assert_eq!(requested_fields(&sel), vec!["user", "id", "name", "posts", "title"]);
    }

    #[test]
    fn fragments_are_expanded_in_place() {
        let sel = selections_from_query(
            "query { user { ...Who ... on User { email } } }
             fragment Who on User { id name }",
        );
        assert_eq!(requested_fields(&sel), vec!["user", "id", "name", "email"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let sel = vec![
            Selection::new("a", vec![Selection::leaf("id")]),
            Selection::new("b", vec![Selection::leaf("id")]),
        ];
        assert_eq!(requested_fields(&sel), vec!["a", "id", "b", "id"]);
    }

    #[test]
    fn absent_or_broken_input_is_empty() {
        assert!(requested_fields(&[]).is_empty());
        assert!(selections_from_query("").is_empty());
        assert!(selections_from_query("{ user {").is_empty());
    }

    #[test]
    fn self_spreading_fragment_terminates() {
        let sel = selections_from_query("{ node { ...F } } fragment F on Node { id ...F }");
        assert_eq!(requested_fields(&sel), vec!["node", "id"]);
    }
}
