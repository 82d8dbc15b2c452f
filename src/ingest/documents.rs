use crate::data::{Event, EventTime, SizeValue};
use crate::error::InputError;
use crate::utils::IngestConfig;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Parse a JSON array or newline-delimited JSON into documents
pub fn parse_documents(input: &str) -> Result<Vec<Value>, InputError> {
    let trimmed = input.trim_start();

    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<Value>>(trimmed)
            .map_err(|e| InputError::Parse(e.to_string()));
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Value>(line)
                .map_err(|e| InputError::Parse(format!("line {}: {}", n + 1, e)))
        })
        .collect()
}

/// Maps search documents onto events using the configured field paths
pub struct DocumentMapper {
    fields: IngestConfig,
}

impl DocumentMapper {
    pub fn new(fields: IngestConfig) -> Self {
        Self { fields }
    }

    /// Convert documents to events
    ///
    /// A document may be a search hit (`{"_source": {...}}`) or the source
    /// itself. A receiver array yields one event per receiver.
    pub fn map_documents(&self, docs: &[Value]) -> Result<Vec<Event>, InputError> {
        let mut events = Vec::with_capacity(docs.len());

        for (index, doc) in docs.iter().enumerate() {
            if !doc.is_object() {
                return Err(InputError::NotAnObject { index });
            }
            let source = match doc.get("_source") {
                Some(inner) if inner.is_object() => inner,
                _ => doc,
            };

            let sender = lookup(source, &self.fields.sender_field).and_then(text);
            let timestamp = parse_timestamp(lookup(source, &self.fields.timestamp_field));
            let size = parse_size(lookup(source, &self.fields.size_field));

            for receiver in receivers(lookup(source, &self.fields.receiver_field)) {
                events.push(Event {
                    sender: sender.clone(),
                    receiver,
                    timestamp: timestamp.clone(),
                    size: size.clone(),
                });
            }
        }

        Ok(events)
    }
}

/// Resolve a dotted path through nested objects, falling back to a flattened key
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let nested = path
        .split('.')
        .try_fold(doc, |value, segment| value.get(segment));

    nested
        .or_else(|| doc.get(path))
        .filter(|v| !v.is_null())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn receivers(value: Option<&Value>) -> Vec<Option<String>> {
    match value {
        Some(Value::Array(items)) => {
            let list: Vec<Option<String>> = items.iter().map(text).collect();
            if list.is_empty() {
                vec![None]
            } else {
                list
            }
        }
        Some(other) => vec![text(other)],
        None => vec![None],
    }
}

fn parse_timestamp(value: Option<&Value>) -> EventTime {
    let value = match value {
        Some(v) => v,
        None => return EventTime::Malformed("missing".to_string()),
    };

    let parsed = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
            .or_else(|| s.trim().parse::<i64>().ok().and_then(from_epoch_millis)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(from_epoch_millis),
        _ => None,
    };

    match parsed {
        Some(ts) => EventTime::At(ts),
        None => EventTime::Malformed(raw_text(value)),
    }
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

fn parse_size(value: Option<&Value>) -> Option<SizeValue> {
    match value? {
        Value::Number(n) => Some(n.as_f64().map_or_else(
            || SizeValue::Malformed(n.to_string()),
            SizeValue::from_number,
        )),
        Value::String(s) => Some(SizeValue::parse(s)),
        other => Some(SizeValue::Malformed(other.to_string())),
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapper() -> DocumentMapper {
        DocumentMapper::new(IngestConfig::default())
    }

    #[test]
    fn test_parse_array_and_ndjson() {
        let array = parse_documents(r#"[{"a": 1}, {"a": 2}]"#).unwrap();
        assert_eq!(array.len(), 2);

        let ndjson = parse_documents("{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();
        assert_eq!(ndjson.len(), 2);

        let err = parse_documents("{\"a\": 1}\n{broken\n").unwrap_err();
        assert!(matches!(err, InputError::Parse(msg) if msg.starts_with("line 2")));
    }

    #[test]
    fn test_nested_search_hit() {
        let docs = vec![json!({
            "_source": {
                "email": {"sender": "alice@corp", "receiver": "bob@corp", "size": 1200},
                "@timestamp": "2024-03-01T10:00:00Z"
            }
        })];

        let events = mapper().map_documents(&docs).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].identity(), Some(("alice@corp", "bob@corp")));
        assert_eq!(events[0].size, Some(SizeValue::Bytes(1200.0)));
        assert_eq!(
            events[0].timestamp.instant().unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_flattened_keys_and_epoch_millis() {
        let docs = vec![json!({
            "email.sender": "alice",
            "email.receiver": "bob",
            "@timestamp": 1_700_000_000_000i64
        })];

        let events = mapper().map_documents(&docs).unwrap();
        assert_eq!(events[0].identity(), Some(("alice", "bob")));
        assert_eq!(events[0].timestamp.instant().unwrap().timestamp(), 1_700_000_000);
        assert_eq!(events[0].size, None);
    }

    #[test]
    fn test_receiver_list_expands() {
        let docs = vec![json!({
            "email": {"sender": "alice", "receiver": ["bob", "carol"]},
            "@timestamp": "2024-03-01T10:00:00Z"
        })];

        let events = mapper().map_documents(&docs).unwrap();
        let receivers: Vec<_> = events.iter().map(|e| e.receiver.clone().unwrap()).collect();
        assert_eq!(receivers, vec!["bob", "carol"]);
    }

    #[test]
    fn test_missing_and_malformed_fields_preserved() {
        let docs = vec![json!({
            "email": {"sender": "alice", "size": "huge"},
            "@timestamp": "last tuesday"
        })];

        let events = mapper().map_documents(&docs).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].receiver, None);
        assert_eq!(events[0].timestamp, EventTime::Malformed("last tuesday".into()));
        assert_eq!(events[0].size, Some(SizeValue::Malformed("huge".into())));
    }

    #[test]
    fn test_non_object_document_rejected() {
        let err = mapper().map_documents(&[json!({}), json!(42)]).unwrap_err();
        assert_eq!(err, InputError::NotAnObject { index: 1 });
    }

    #[test]
    fn test_custom_field_mapping() {
        let fields = IngestConfig {
            sender_field: "src".into(),
            receiver_field: "dst".into(),
            size_field: "bytes".into(),
            timestamp_field: "ts".into(),
            until: None,
        };
        let docs = vec![json!({"src": "10.0.0.5", "dst": "203.0.113.9", "bytes": 64, "ts": "2024-03-01T10:00:00+02:00"})];

        let events = DocumentMapper::new(fields).map_documents(&docs).unwrap();
        assert_eq!(events[0].identity(), Some(("10.0.0.5", "203.0.113.9")));
        assert_eq!(events[0].timestamp.instant().unwrap().to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }
}
