use serde_json::Value;

// Bounds how many string/envelope layers are peeled off a payload.
const MAX_UNWRAP_DEPTH: usize = 4;

/// A link a tool reply pointed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReference {
    pub url: String,
    pub title: String,
}

/// Reads the references out of a function-call response.
///
/// Accepts an object carrying a `results` list or a bare list, each item an
/// object with `url` and optional `title`. String payloads are parsed as JSON
/// and a `{"result": ...}` envelope is unwrapped first. Anything else yields
/// no references.
pub fn tool_references(response: &Value) -> Vec<ToolReference> {
    let Some(value) = normalize(response.clone()) else {
        return Vec::new();
    };

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items.iter().filter_map(reference_from_item).collect()
}

fn normalize(mut current: Value) -> Option<Value> {
    for _ in 0..MAX_UNWRAP_DEPTH {
        current = match current {
            Value::String(text) => serde_json::from_str(&text).ok()?,
            Value::Object(mut map) if map.contains_key("result") && !map.contains_key("results") => {
                map.remove("result")?
            }
            other => return Some(other),
        };
    }
    Some(current)
}

fn reference_from_item(item: &Value) -> Option<ToolReference> {
    let url = item.get("url")?.as_str()?.trim();
    if url.is_empty() {
        return None;
    }
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(url);
    Some(ToolReference {
        url: url.to_string(),
        title: title.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urls(refs: &[ToolReference]) -> Vec<&str> {
        refs.iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn test_results_object() {
        let refs = tool_references(&json!({
            "answer": "yes",
            "results": [
                {"url": "https://a.example", "title": "A", "content": "..."},
                {"url": "https://b.example", "title": "B"}
            ]
        }));
        assert_eq!(urls(&refs), vec!["https://a.example", "https://b.example"]);
        assert_eq!(refs[0].title, "A");
    }

    #[test]
    fn test_plain_list_defaults_title_to_url() {
        let refs = tool_references(&json!([
            {"url": "https://a.example", "content": "page"},
            {"url": "https://b.example", "title": ""}
        ]));
        assert_eq!(refs[0].title, "https://a.example");
        assert_eq!(refs[1].title, "https://b.example");
    }

    #[test]
    fn test_string_payload_is_parsed() {
        let payload = Value::String(r#"[{"url":"https://v.example","title":"Video"}]"#.into());
        let refs = tool_references(&payload);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].title, "Video");
    }

    #[test]
    fn test_result_envelope_is_unwrapped() {
        let wrapped = json!({"result": {"results": [{"url": "https://a.example", "title": "A"}]}});
        assert_eq!(tool_references(&wrapped).len(), 1);

        let wrapped_text = json!({"result": r#"[{"url":"https://a.example"}]"#});
        assert_eq!(urls(&tool_references(&wrapped_text)), vec!["https://a.example"]);
    }

    #[test]
    fn test_unrecognised_shapes_yield_nothing() {
        assert!(tool_references(&Value::String("Transcript not available".into())).is_empty());
        assert!(tool_references(&Value::String("Invalid URL".into())).is_empty());
        assert!(tool_references(&json!({"answer": "no list"})).is_empty());
        assert!(tool_references(&json!({"results": "not a list"})).is_empty());
        assert!(tool_references(&json!(42)).is_empty());
        assert!(tool_references(&Value::Null).is_empty());
    }

    #[test]
    fn test_items_without_url_are_skipped() {
        let refs = tool_references(&json!([
            {"title": "no url"},
            {"url": "   "},
            "https://bare-string.example",
            {"url": "https://ok.example"}
        ]));
        assert_eq!(urls(&refs), vec!["https://ok.example"]);
    }
}
