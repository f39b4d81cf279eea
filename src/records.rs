//! Record-side counterparts of the flat schema.
//!
//! Record extraction lives outside this crate. What it needs from here is the
//! page shape and the rule that turns structural values into text, matching
//! the `["string", "null"]` typing the normalizer gives those properties.

use serde_json::{Map, Value};

/// Key holding the continuation link in an OData response page.
pub const NEXT_LINK_KEY: &str = "@odata.nextLink";

/// Key holding the records in an OData response page.
pub const RECORDS_KEY: &str = "value";

/// One page of raw records plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<Value>,
    /// Opaque continuation token; `None` on the last page.
    pub next: Option<String>,
}

impl RecordPage {
    /// Split an OData response body into records and next link.
    ///
    /// A body without a `value` array yields no records.
    pub fn from_response(body: &Value) -> Self {
        let records = body
            .get(RECORDS_KEY)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let next = body
            .get(NEXT_LINK_KEY)
            .and_then(Value::as_str)
            .map(String::from);
        Self { records, next }
    }
}

/// Produces pages of records from a remote service.
pub trait RecordSource {
    type Error;

    /// Fetch the page at `cursor`, or the first page when `cursor` is `None`.
    fn fetch_page(&mut self, cursor: Option<&str>) -> Result<RecordPage, Self::Error>;
}

/// Replace object and array field values with their compact JSON text.
///
/// Scalars and nulls are kept as they are.
pub fn stringify_structural(record: &Map<String, Value>) -> Map<String, Value> {
    record
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_from_response() {
        let body = json!({
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users",
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/users?$skiptoken=abc",
            "value": [{ "id": "1" }, { "id": "2" }]
        });
        let page = RecordPage::from_response(&body);
        assert_eq!(page.records.len(), 2);
        assert_eq!(
            page.next.as_deref(),
            Some("https://graph.microsoft.com/v1.0/users?$skiptoken=abc")
        );
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page = RecordPage::from_response(&json!({ "value": [] }));
        assert!(page.records.is_empty());
        assert_eq!(page.next, None);

        assert_eq!(RecordPage::from_response(&json!({})), RecordPage::default());
    }

    #[test]
    fn stringify_structural_values() {
        let record = json!({
            "id": "1",
            "accountEnabled": true,
            "age": 42,
            "manager": null,
            "businessPhones": ["555-0100"],
            "mailboxSettings": { "timeZone": "UTC" }
        });
        let record = record.as_object().unwrap();
        let flat = stringify_structural(record);

        assert_eq!(flat["id"], "1");
        assert_eq!(flat["accountEnabled"], true);
        assert_eq!(flat["age"], 42);
        assert_eq!(flat["manager"], Value::Null);
        assert_eq!(flat["businessPhones"], r#"["555-0100"]"#);
        assert_eq!(flat["mailboxSettings"], r#"{"timeZone":"UTC"}"#);
    }

    struct Pages {
        pages: Vec<Value>,
    }

    impl RecordSource for Pages {
        type Error = String;

        fn fetch_page(&mut self, cursor: Option<&str>) -> Result<RecordPage, String> {
            let index = match cursor {
                None => 0,
                Some(c) => c.parse::<usize>().map_err(|e| e.to_string())?,
            };
            self.pages
                .get(index)
                .map(RecordPage::from_response)
                .ok_or_else(|| format!("no page {}", index))
        }
    }

    #[test]
    fn follow_cursors_until_exhausted() {
        let mut source = Pages {
            pages: vec![
                json!({ "value": [{ "id": "a" }], "@odata.nextLink": "1" }),
                json!({ "value": [{ "id": "b" }, { "id": "c" }] }),
            ],
        };

        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = source.fetch_page(cursor.as_deref()).unwrap();
            ids.extend(page.records.iter().map(|r| r["id"].clone()));
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(ids, vec![json!("a"), json!("b"), json!("c")]);
    }
}
