use crate::store::Document;

/// Copy only the listed keys that `args` actually has.
pub fn optionally_add_attrs(args: &Document, attrs: &[&str]) -> Document {
    attrs
        .iter()
        .filter_map(|&key| args.get(key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_listed_keys_only() {
        let user = json!({"id": 1, "name": "John", "age": 30, "active": true, "note": null});
        let out = optionally_add_attrs(user.as_object().unwrap(), &["name", "age", "email", "note"]);
        assert_eq!(serde_json::Value::Object(out), json!({"name": "John", "age": 30, "note": null}));
    }
}
