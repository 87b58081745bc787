//! Read-path normalizer for persisted slides.
//!
//! Stored `summary_text` rows were written by several generations of the
//! summarizer. Depending on when a row was written, a slide element may be:
//!
//! - plain markdown (current format)
//! - a JSON *string* encoding `{"slide": "..."}` or `{"title", "content"}`
//! - a raw object of either shape
//! - some other JSON value
//!
//! Every element is first classified into a [`SlideShape`] and then rendered
//! by one exhaustive [`render`]. Callers never inspect raw values themselves.
//!
//! Normalizing already-normalized output is a no-op for anything the current
//! summarizer writes.

use serde_json::{Map, Value};

/// Recognised shapes of a stored slide element.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideShape {
    /// A string that is not JSON: already markdown.
    Markdown(String),
    /// An object (raw or JSON-encoded) with a string `slide` field.
    SlideField(String),
    /// An object (raw or JSON-encoded) with string `title` and `content`.
    TitleContent { title: String, content: String },
    /// Any other object or array, rendered as compact JSON.
    GenericObject(Value),
    /// A string holding a JSON scalar (`"42"`, `"\"text\""`, `"true"`).
    EncodedScalar(Value),
    /// A non-string, non-object element.
    Other(Value),
}

/// Classify one stored slide element.
pub fn classify(value: &Value) -> SlideShape {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => classify_object(&map),
            Ok(array @ Value::Array(_)) => SlideShape::GenericObject(array),
            Ok(scalar) => SlideShape::EncodedScalar(scalar),
            Err(_) => SlideShape::Markdown(s.clone()),
        },
        Value::Object(map) => classify_object(map),
        other => SlideShape::Other(other.clone()),
    }
}

fn classify_object(map: &Map<String, Value>) -> SlideShape {
    if let Some(Value::String(slide)) = map.get("slide") {
        return SlideShape::SlideField(slide.clone());
    }
    if let (Some(Value::String(title)), Some(Value::String(content))) =
        (map.get("title"), map.get("content"))
    {
        return SlideShape::TitleContent {
            title: title.clone(),
            content: content.clone(),
        };
    }
    SlideShape::GenericObject(Value::Object(map.clone()))
}

/// Render a classified slide as markdown.
pub fn render(shape: SlideShape) -> String {
    match shape {
        SlideShape::Markdown(s) | SlideShape::SlideField(s) => s,
        SlideShape::TitleContent { title, content } => format!("# {}\n\n{}", title, content),
        SlideShape::GenericObject(v) => v.to_string(),
        SlideShape::EncodedScalar(Value::String(s)) => s,
        SlideShape::EncodedScalar(v) | SlideShape::Other(v) => v.to_string(),
    }
}

/// Normalize one element.
pub fn normalize_slide(value: &Value) -> String {
    render(classify(value))
}

/// Normalize a slide array, preserving order.
pub fn normalize_slides(values: &[Value]) -> Vec<String> {
    values.iter().map(normalize_slide).collect()
}

/// Normalize a stored `summary_text` column.
///
/// Accepts a JSON array of slides, a `{"slides": [...]}` deck, any single
/// JSON value, or raw non-JSON text (one markdown slide). Blank text gives
/// no slides.
pub fn normalize_summary_text(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => normalize_slides(&items),
        Ok(Value::Object(map)) => match map.get("slides") {
            Some(Value::Array(items)) => normalize_slides(items),
            _ => vec![render(classify_object(&map))],
        },
        Ok(single) => vec![normalize_slide(&single)],
        Err(_) => vec![text.to_string()],
    }
}

/// Encode slides for the `summary_text` column.
pub fn encode_slides(slides: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(slides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slide_object_uses_slide_field() {
        let v = json!({"slide": "# Intro\n\nText"});
        assert_eq!(classify(&v), SlideShape::SlideField("# Intro\n\nText".into()));
        assert_eq!(normalize_slide(&v), "# Intro\n\nText");
    }

    #[test]
    fn encoded_title_content_is_composed() {
        let v = json!(r#"{"title":"T","content":"C"}"#);
        assert_eq!(normalize_slide(&v), "# T\n\nC");
    }

    #[test]
    fn plain_markdown_is_unchanged() {
        let v = json!("plain markdown text");
        assert_eq!(classify(&v), SlideShape::Markdown("plain markdown text".into()));
        assert_eq!(normalize_slide(&v), "plain markdown text");
    }

    #[test]
    fn slide_field_wins_over_title_content() {
        let v = json!({"slide": "S", "title": "T", "content": "C"});
        assert_eq!(normalize_slide(&v), "S");
    }

    #[test]
    fn unrecognised_objects_are_serialised() {
        let v = json!({"bullet": "x"});
        assert_eq!(normalize_slide(&v), r#"{"bullet":"x"}"#);
        let encoded = json!(r#"{"bullet": "x"}"#);
        assert_eq!(normalize_slide(&encoded), r#"{"bullet":"x"}"#);
        let non_string_slide = json!({"slide": 3});
        assert!(matches!(classify(&non_string_slide), SlideShape::GenericObject(_)));
    }

    #[test]
    fn encoded_scalars_use_their_value() {
        assert_eq!(normalize_slide(&json!("42")), "42");
        assert_eq!(normalize_slide(&json!("\"quoted\"")), "quoted");
        assert_eq!(normalize_slide(&json!(7)), "7");
        assert_eq!(normalize_slide(&Value::Null), "null");
        assert_eq!(normalize_slide(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        let stored = vec![
            json!("# Plain\n\n- a\n- b"),
            json!({"slide": "# From object"}),
            json!(r##"{"slide":"# From encoded"}"##),
            json!({"title": "T", "content": "C"}),
            json!({"other": true}),
            json!("[link](https://x.example)"),
        ];
        let once = normalize_slides(&stored);
        let again: Vec<Value> = once.iter().map(|s| json!(s)).collect();
        assert_eq!(normalize_slides(&again), once);
    }

    #[test]
    fn stored_formats_round_trip() {
        let slides = vec!["# One\n\nBody".to_string(), "# Two".to_string()];
        let plain = encode_slides(&slides).unwrap();
        assert_eq!(normalize_summary_text(&plain), slides);

        let legacy: Vec<String> = slides
            .iter()
            .map(|s| json!({"slide": s}).to_string())
            .collect();
        let legacy_text = serde_json::to_string(&legacy).unwrap();
        assert_eq!(normalize_summary_text(&legacy_text), slides);
    }

    #[test]
    fn summary_text_variants() {
        assert!(normalize_summary_text("  ").is_empty());
        assert_eq!(normalize_summary_text("just prose"), vec!["just prose"]);
        assert_eq!(
            normalize_summary_text(r#"{"title":"D","slides":["a","b"]}"#),
            vec!["a", "b"]
        );
        assert_eq!(normalize_summary_text(r#"{"slide":"x"}"#), vec!["x"]);
    }
}
