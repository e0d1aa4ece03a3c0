//! Parsing of model responses.
//!
//! Model output is untrusted. Batch responses are mapped back to tiles only
//! through a validated integer `index`, and anything that does not match the
//! expected shape is dropped instead of guessed at.

use serde_json::Value;
use tumbuh_core::error::{Result, TumbuhError};
use tumbuh_core::models::{InsightItem, Recommendation};

/// Remove a surrounding markdown code fence, if any
pub fn strip_markdown(text: &str) -> &str {
    let cleaned = text.trim();
    let fence = "```";
    let Some(start) = cleaned.find(fence) else {
        return cleaned;
    };

    let mut after = &cleaned[start + fence.len()..];
    // Skip the language tag line (```json)
    if let Some(newline) = after.find('\n') {
        after = &after[newline + 1..];
    }
    match after.find(fence) {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}

/// Parse a batch recommendation response into one slot per batch position
///
/// Accepts `{"tiles": [...]}` or a bare array of tile entries. Each entry must
/// carry an integer `index` below `batch_len`; entries with a missing,
/// non-integer, out-of-range or repeated index are ignored (the first entry
/// for an index wins). An entry whose recommendation list is malformed leaves
/// its slot `None`. Only unparseable top-level JSON fails the whole batch.
pub fn parse_batch_response(text: &str, batch_len: usize) -> Result<Vec<Option<Vec<Recommendation>>>> {
    let value: Value = serde_json::from_str(strip_markdown(text))
        .map_err(|e| TumbuhError::Enrichment(format!("response is not valid JSON: {}", e)))?;

    let entries = match &value {
        Value::Object(map) => map.get("tiles").and_then(Value::as_array),
        Value::Array(items) => Some(items),
        _ => None,
    }
    .ok_or_else(|| TumbuhError::Enrichment("response has no 'tiles' list".to_string()))?;

    let mut slots: Vec<Option<Vec<Recommendation>>> = vec![None; batch_len];
    let mut seen = vec![false; batch_len];

    for entry in entries {
        let Some(index) = entry.get("index").and_then(Value::as_u64) else {
            tracing::warn!("Discarding response entry without an integer index");
            continue;
        };
        let Some(position) = usize::try_from(index).ok().filter(|i| *i < batch_len) else {
            tracing::warn!(index, batch_len, "Discarding response entry with out-of-range index");
            continue;
        };
        if seen[position] {
            tracing::warn!(index, "Discarding duplicate response entry");
            continue;
        }
        seen[position] = true;
        slots[position] = parse_recommendation_list(entry.get("recommendations"));
    }

    Ok(slots)
}

fn parse_recommendation_list(value: Option<&Value>) -> Option<Vec<Recommendation>> {
    value?.as_array()?.iter().map(parse_recommendation).collect()
}

fn parse_recommendation(value: &Value) -> Option<Recommendation> {
    let plant = value.get("plant")?.as_str()?.trim();
    if plant.is_empty() {
        return None;
    }
    let confidence = value.get("confidence")?.as_f64()?;
    let rationale = value
        .get("rationale")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    Some(Recommendation { plant: plant.to_string(), confidence, rationale })
}

/// Parse an insight response, keeping only items with a source URL
pub fn parse_insight_response(text: &str) -> Result<Vec<InsightItem>> {
    let value: Value = serde_json::from_str(strip_markdown(text))
        .map_err(|e| TumbuhError::Enrichment(format!("insight response is not valid JSON: {}", e)))?;

    let items = value
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| TumbuhError::Enrichment("insight response has no 'items' list".to_string()))?;

    let sanitized: Vec<InsightItem> = items
        .iter()
        .filter_map(|item| {
            let text_field = |key: &str| {
                item.get(key).and_then(Value::as_str).map(str::trim).unwrap_or_default().to_string()
            };
            let source_url = text_field("source_url");
            if source_url.is_empty() {
                return None;
            }
            let title = text_field("title");
            let source_name = text_field("source_name");
            Some(InsightItem {
                title: if title.is_empty() { "Insight".to_string() } else { title },
                summary: text_field("summary"),
                source_name: (!source_name.is_empty()).then_some(source_name),
                source_url,
            })
        })
        .collect();

    if sanitized.is_empty() {
        return Err(TumbuhError::Enrichment("no insight carried a source URL".to_string()));
    }
    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plants(slot: &Option<Vec<Recommendation>>) -> Vec<&str> {
        slot.as_ref().map(|list| list.iter().map(|r| r.plant.as_str()).collect()).unwrap_or_default()
    }

    #[test]
    fn test_strip_markdown() {
        assert_eq!(strip_markdown("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_markdown("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_markdown("Here you go:\n```\n[1]\n```\nThanks"), "[1]");
        assert_eq!(strip_markdown("```json\n[2]"), "[2]");
    }

    #[test]
    fn test_permuted_entries_map_by_index() {
        let text = r#"{"tiles": [
            {"index": 2, "recommendations": [{"plant": "cassava", "confidence": 0.6}]},
            {"index": 0, "recommendations": [{"plant": "rice", "confidence": 0.9}]},
            {"index": 1, "recommendations": [{"plant": "maize", "confidence": 0.8}]}
        ]}"#;
        let slots = parse_batch_response(text, 3).unwrap();
        assert_eq!(plants(&slots[0]), vec!["rice"]);
        assert_eq!(plants(&slots[1]), vec!["maize"]);
        assert_eq!(plants(&slots[2]), vec!["cassava"]);
    }

    #[test]
    fn test_missing_entry_leaves_slot_empty() {
        let text = r#"{"tiles": [
            {"index": 0, "recommendations": [{"plant": "rice", "confidence": 0.9}]},
            {"index": 2, "recommendations": [{"plant": "chili", "confidence": 0.4}]}
        ]}"#;
        let slots = parse_batch_response(text, 3).unwrap();
        assert!(slots[1].is_none());
        assert_eq!(plants(&slots[2]), vec!["chili"]);
    }

    #[test]
    fn test_untrusted_indexes_are_discarded() {
        let text = r#"[
            {"index": 7, "recommendations": [{"plant": "rice", "confidence": 0.9}]},
            {"index": "0", "recommendations": [{"plant": "rice", "confidence": 0.9}]},
            {"index": 0.5, "recommendations": [{"plant": "rice", "confidence": 0.9}]},
            {"tile_id": "0-0", "recommendations": [{"plant": "rice", "confidence": 0.9}]},
            {"index": 1, "recommendations": [{"plant": "taro", "confidence": 0.5}]},
            {"index": 1, "recommendations": [{"plant": "yam", "confidence": 0.7}]}
        ]"#;
        let slots = parse_batch_response(text, 2).unwrap();
        assert!(slots[0].is_none());
        assert_eq!(plants(&slots[1]), vec!["taro"]);
    }

    #[test]
    fn test_malformed_list_empties_only_that_tile() {
        let text = r#"{"tiles": [
            {"index": 0, "recommendations": [{"plant": "rice", "confidence": "high"}]},
            {"index": 1, "recommendations": [{"confidence": 0.3}]},
            {"index": 2, "recommendations": [{"plant": "maize", "confidence": 0.7, "rationale": " loam soil "}]}
        ]}"#;
        let slots = parse_batch_response(text, 3).unwrap();
        assert!(slots[0].is_none());
        assert!(slots[1].is_none());
        let maize = &slots[2].as_ref().unwrap()[0];
        assert_eq!(maize.rationale.as_deref(), Some("loam soil"));
    }

    #[test]
    fn test_invalid_json_fails_whole_batch() {
        let err = parse_batch_response("I cannot help with that", 2).unwrap_err();
        assert!(matches!(err, TumbuhError::Enrichment(_)));
        assert!(parse_batch_response(r#"{"result": []}"#, 2).is_err());
    }

    #[test]
    fn test_fenced_response_parses() {
        let text = "```json\n{\"tiles\": [{\"index\": 0, \"recommendations\": []}]}\n```";
        let slots = parse_batch_response(text, 1).unwrap();
        assert_eq!(slots[0], Some(Vec::new()));
    }

    #[test]
    fn test_insight_items_without_url_dropped() {
        let text = r#"{"items": [
            {"title": "Rain outlook", "summary": "20 mm expected", "source_name": "BMKG", "source_url": "https://bmkg.go.id"},
            {"title": "Rumor", "summary": "unsourced"},
            {"summary": "Rice price stable", "source_url": "https://example.org/prices"}
        ]}"#;
        let items = parse_insight_response(text).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].title, "Insight");
        assert!(items[1].source_name.is_none());
    }

    #[test]
    fn test_insight_response_without_sources_fails() {
        assert!(parse_insight_response(r#"{"items": [{"title": "x"}]}"#).is_err());
        assert!(parse_insight_response("not json").is_err());
    }
}
