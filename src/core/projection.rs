use crate::domain::model::{Column, ProcessedRow, Projection, SkippedRecord};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CollectorError, Result};
use serde_json::Value;

pub const RECORD_COLUMN: &str = "record";

/// Flattens raw API responses into fixed-schema rows.
///
/// The output depends only on the ordered list of raw bodies, so projecting
/// the saved raw file again reproduces the same table byte for byte.
#[derive(Debug, Clone)]
pub struct Projector {
    items_path: Option<String>,
    columns: Vec<Column>,
    delimiter: u8,
}

impl Projector {
    pub fn new(items_path: Option<String>, columns: Vec<Column>, delimiter: u8) -> Self {
        Self {
            items_path: items_path.filter(|p| !p.trim().is_empty()),
            columns,
            delimiter,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self::new(
            config.items_path().map(str::to_string),
            config.columns().to_vec(),
            config.delimiter(),
        )
    }

    pub fn header(&self) -> Vec<String> {
        std::iter::once(RECORD_COLUMN.to_string())
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    pub fn project(&self, responses: &[Value]) -> Projection {
        let mut rows = Vec::new();
        let mut skipped = Vec::new();

        for (record, response) in responses.iter().enumerate() {
            let container = match &self.items_path {
                Some(path) => match lookup_path(response, path) {
                    Some(value) => value,
                    None => {
                        tracing::warn!("⚠️ Record {}: items path '{}' not found, skipped", record, path);
                        skipped.push(SkippedRecord {
                            record,
                            reason: format!("items path '{}' not found", path),
                        });
                        continue;
                    }
                },
                None => response,
            };

            let items = expand_items(container);
            if items.is_empty() {
                tracing::warn!("⚠️ Record {}: no items, skipped", record);
                skipped.push(SkippedRecord {
                    record,
                    reason: "no items".to_string(),
                });
                continue;
            }

            for item in items {
                let values = self
                    .columns
                    .iter()
                    .map(|column| render_cell(lookup_path(item, &column.path)))
                    .collect();
                rows.push(ProcessedRow { record, values });
            }
        }

        tracing::debug!(
            "Projected {} rows from {} records ({} skipped)",
            rows.len(),
            responses.len(),
            skipped.len()
        );

        Projection {
            records: responses.len(),
            header: self.header(),
            rows,
            skipped,
        }
    }

    /// 輸出分隔文字；即使沒有任何資料列也會寫出標題列
    pub fn render(&self, projection: &Projection) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer.write_record(&projection.header)?;
        for row in &projection.rows {
            writer.write_record(
                std::iter::once(row.record.to_string()).chain(row.values.iter().cloned()),
            )?;
        }

        writer
            .into_inner()
            .map_err(|e| CollectorError::IoError(e.into_error()))
    }

    /// Re-runs the projection over the contents of a raw output file.
    pub fn project_raw(&self, raw: &[u8]) -> Result<(Projection, Vec<u8>)> {
        let responses: Vec<Value> = serde_json::from_slice(raw)?;
        let projection = self.project(&responses);
        let output = self.render(&projection)?;
        Ok((projection, output))
    }
}

/// Resolves a dotted path; numeric segments index into arrays.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn expand_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(specs: &[&str]) -> Vec<Column> {
        specs.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn output_lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_single_response_with_three_items() {
        let projector = Projector::new(
            Some("articles".to_string()),
            columns(&["title", "source=source.name"]),
            b',',
        );
        let responses = vec![json!({
            "status": "ok",
            "articles": [
                {"title": "One", "source": {"name": "A"}},
                {"title": "Two", "source": {"name": "B"}},
                {"title": "Three", "source": {"name": "C"}}
            ]
        })];

        let projection = projector.project(&responses);
        assert_eq!(projection.rows.len(), 3);
        assert!(projection.skipped.is_empty());

        let lines = output_lines(&projector.render(&projection).unwrap());
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "record,title,source");
        assert_eq!(lines[1], "0,One,A");
        assert_eq!(lines[3], "0,Three,C");
    }

    #[test]
    fn test_rows_follow_record_order() {
        let projector = Projector::new(None, columns(&["id"]), b',');
        let responses = vec![json!([{"id": 1}, {"id": 2}]), json!({"id": 3})];

        let projection = projector.project(&responses);
        let records: Vec<usize> = projection.rows.iter().map(|r| r.record).collect();
        let ids: Vec<&str> = projection
            .rows
            .iter()
            .map(|r| r.values[0].as_str())
            .collect();

        assert_eq!(records, vec![0, 0, 1]);
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_missing_items_path_is_counted_as_skipped() {
        let projector = Projector::new(Some("data.items".to_string()), columns(&["id"]), b',');
        let responses = vec![
            json!({"data": {"items": [{"id": 1}]}}),
            json!({"error": "quota"}),
            json!({"data": {"items": []}}),
        ];

        let projection = projector.project(&responses);
        assert_eq!(projection.rows.len(), 1);
        assert_eq!(projection.skipped.len(), 2);
        assert_eq!(projection.skipped[0].record, 1);
        assert!(projection.skipped[0].reason.contains("not found"));
        assert_eq!(projection.skipped[1].record, 2);
        assert_eq!(projection.skipped[1].reason, "no items");
    }

    #[test]
    fn test_cell_rendering() {
        let projector = Projector::new(
            None,
            columns(&["text", "count", "flag", "missing", "null", "tags", "first_tag=tags.0"]),
            b',',
        );
        let responses = vec![json!({
            "text": "hello, world",
            "count": 42,
            "flag": true,
            "null": null,
            "tags": ["a", "b"]
        })];

        let projection = projector.project(&responses);
        assert_eq!(
            projection.rows[0].values,
            vec!["hello, world", "42", "true", "", "", r#"["a","b"]"#, "a"]
        );

        let lines = output_lines(&projector.render(&projection).unwrap());
        assert_eq!(lines[1], r#"0,"hello, world",42,true,,,"[""a"",""b""]",a"#);
    }

    #[test]
    fn test_empty_input_renders_header_only() {
        let projector = Projector::new(None, columns(&["title", "url"]), b'\t');
        let projection = projector.project(&[]);
        let output = projector.render(&projection).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "record\ttitle\turl\n");
    }

    #[test]
    fn test_reprojection_is_byte_identical() {
        let projector = Projector::new(Some("results".to_string()), columns(&["name", "score"]), b',');
        let raw = serde_json::to_vec_pretty(&vec![
            json!({"results": [{"name": "x", "score": 1.5}, {"name": "y"}]}),
            json!({"results": {"name": "z", "score": 3}}),
        ])
        .unwrap();

        let (first_projection, first) = projector.project_raw(&raw).unwrap();
        let (_, second) = projector.project_raw(&raw).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_projection.records, 2);
        assert_eq!(first_projection.rows.len(), 3);
    }

    #[test]
    fn test_large_integers_and_key_order_survive_reprojection() {
        let projector = Projector::new(Some("articles".to_string()), columns(&["title"]), b',');
        let body = r#"{"zeta":1,"articles":[{"title":12345678901234567890123}],"alpha":2}"#;
        let response: Value = serde_json::from_str(body).unwrap();

        let raw = serde_json::to_vec(&vec![response]).unwrap();
        assert_eq!(String::from_utf8(raw.clone()).unwrap(), format!("[{}]", body));

        let (_, output) = projector.project_raw(&raw).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "record,title\n0,12345678901234567890123\n"
        );
    }

    #[test]
    fn test_project_raw_rejects_invalid_json() {
        let projector = Projector::new(None, columns(&["id"]), b',');
        assert!(matches!(
            projector.project_raw(b"not json"),
            Err(CollectorError::SerializationError(_))
        ));
    }

    #[test]
    fn test_lookup_path() {
        let value = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
        assert_eq!(lookup_path(&value, "a.b.1.c"), Some(&json!(2)));
        assert_eq!(lookup_path(&value, "a.b.x"), None);
        assert_eq!(lookup_path(&value, "a.missing"), None);
    }
}
