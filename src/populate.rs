//! Resolve references only when the client asked for them.
//!
//! A candidate `user` is backed by the reference field `userId`. When `user`
//! appears in the request's selection, `userId` is materialized eagerly and the
//! result is reshaped so `userId` holds the id and `user` the document.

use serde_json::Value;

use crate::store::{DocumentQuery, StoreError};

/// `<candidate>Id`
pub fn reference_field(candidate: &str) -> String { format!("{candidate}Id") }

/// Candidates present in `requested`, in candidate order.
pub fn requested_candidates<'a>(requested: &[String], candidates: &[&'a str]) -> Vec<&'a str> {
    candidates.iter().copied().filter(|c| requested.iter().any(|r| r == c)).collect()
}

pub async fn populate<Q: DocumentQuery>(
    query: Q,
    requested: &[String],
    candidates: &[&str],
) -> Result<Value, StoreError> {
    let wanted = requested_candidates(requested, candidates);
    let references: Vec<String> = wanted.iter().map(|c| reference_field(c)).collect();
    tracing::trace!(?references, "populating");
    let mut result = query.materialize(&references).await?;
    restore(&mut result, &wanted);
    Ok(result)
}

/// Move each populated `<c>Id` document under `<c>`, leaving its `_id` behind.
///
/// Works on one document or an array of them; references that are still bare
/// ids are left alone.
pub fn restore(result: &mut Value, candidates: &[&str]) {
    match result {
        Value::Array(items) => {
            for item in items {
                restore(item, candidates);
            }
        }
        Value::Object(doc) => {
            for candidate in candidates {
                let key = reference_field(candidate);
                let Some(Value::Object(referenced)) = doc.get(&key) else { continue };
                let id = referenced.get("_id").cloned().unwrap_or(Value::Null);
                if let Some(populated) = doc.insert(key, id) {
                    doc.insert(candidate.to_string(), populated);
                }
            }
        }
        _ => {}
    }
}

// ------------------------------- Tests ------------------------------------ //
