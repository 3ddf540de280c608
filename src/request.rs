//! Per-request context: a log id plus the (optional) authenticated identity.

use serde_json::Value;

use crate::store::Document;

/// Record field compared against the identity for `self` permissions.
pub const SELF_IDENTITY_FIELD: &str = "email";

#[derive(Debug, Clone, PartialEq)]
pub struct Identity(pub Document);

impl Identity {
    pub fn get(&self, field: &str) -> Option<&Value> { self.0.get(field) }

    pub fn id(&self) -> Option<String> {
        self.0.get("_id").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub id: i64,
    pub user: Option<Identity>,
}

impl RequestInfo {
    /// Stamp a new request with the current time in milliseconds.
    pub fn new(user: Option<Identity>) -> Self {
        Self { id: chrono::Utc::now().timestamp_millis(), user }
    }

    pub fn anonymous() -> Self { Self::new(None) }

    /// `"<id>, <user id | not-loggedin>"`, prefixed to request log lines.
    pub fn describe(&self) -> String {
        let who = self.user.as_ref().and_then(Identity::id).unwrap_or_else(|| "not-loggedin".to_string());
        format!("{}, {who}", self.id)
    }

    pub fn is_logged_in(&self) -> bool { self.user.is_some() }

    /// True when the record's identity field equals the requester's.
    pub fn owns(&self, record: &Value) -> bool {
        let Some(user) = &self.user else { return false };
        match (user.get(SELF_IDENTITY_FIELD), record.get(SELF_IDENTITY_FIELD)) {
            (Some(mine), Some(theirs)) => !mine.is_null() && mine == theirs,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(v: Value) -> Identity {
        Identity(v.as_object().cloned().unwrap())
    }

    #[test]
    fn describe_names_user_or_anonymous() {
        let anon = RequestInfo { id: 42, user: None };
        assert_eq!(anon.describe(), "42, not-loggedin");

        let user = RequestInfo { id: 42, user: Some(identity(json!({"_id": "u1"}))) };
        assert_eq!(user.describe(), "42, u1");
    }

    #[test]
    fn ownership_compares_identity_field() {
        let req = RequestInfo::new(Some(identity(json!({"_id": "u1", "email": "a@x.io"}))));
        assert!(req.owns(&json!({"email": "a@x.io"})));
        assert!(!req.owns(&json!({"email": "b@x.io"})));
        assert!(!req.owns(&json!({})));
        assert!(!RequestInfo::anonymous().owns(&json!({"email": "a@x.io"})));
    }
}
