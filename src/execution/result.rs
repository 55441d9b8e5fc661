//! Query Result - rows returned by an execution adapter and their text rendering

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One result row: column name → value, in the order the engine returned them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, serde_json::Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, serde_json::Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Serialized as a JSON object that keeps column order
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Caller-facing text: the rows followed by the SQL that produced them
pub fn render_rows(rows: &[Row], sql: &str) -> String {
    let rendered = serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string());
    format!("Result: {} obtained from the query: {}", rendered, sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_keeps_column_order() {
        let row = Row::new().with("pol", "LAX").with("count", 4).with("avg_rate", 12.5);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"pol":"LAX","count":4,"avg_rate":12.5}"#);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["pol", "count", "avg_rate"]);
        assert_eq!(row.get("count"), Some(&serde_json::json!(4)));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_render_rows() {
        let rows = vec![Row::new().with("status", 3), Row::new().with("status", serde_json::Value::Null)];
        let text = render_rows(&rows, "SELECT status FROM shipments LIMIT 10");
        assert_eq!(
            text,
            r#"Result: [{"status":3},{"status":null}] obtained from the query: SELECT status FROM shipments LIMIT 10"#
        );
    }

    #[test]
    fn test_render_empty_result() {
        let text = render_rows(&[], "SELECT * FROM orders LIMIT 10");
        assert!(text.starts_with("Result: [] obtained"));
    }
}
