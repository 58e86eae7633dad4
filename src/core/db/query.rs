/// Query Results Module
///
/// Every backend normalizes what it gets back from the server into a
/// [`QueryResult`], so callers see the same shape whichever driver ran the
/// statement.
use serde::Serialize;

/// Text used for SQL NULL in rendered rows.
pub const NULL_TEXT: &str = "NULL";

/// Represents the result of a SQL statement execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names from the first result set (empty for statements without rows)
    pub columns: Vec<String>,
    /// Rows of data as string values
    pub rows: Vec<Vec<String>>,
    /// Number of rows returned
    pub row_count: usize,
    /// Rows changed by an INSERT/UPDATE/DELETE
    pub affected_rows: u64,
    /// Auto-increment id generated by the statement, if any
    pub last_insert_id: Option<u64>,
}

impl QueryResult {
    /// Creates a new QueryResult from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let row_count = rows.len();
        QueryResult {
            columns,
            rows,
            row_count,
            affected_rows: 0,
            last_insert_id: None,
        }
    }

    /// Creates a row-less result for a data-modifying statement
    pub fn modified(affected_rows: u64, last_insert_id: Option<u64>) -> Self {
        QueryResult {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            affected_rows,
            last_insert_id,
        }
    }

    /// Whether the statement produced a result set
    pub fn has_rows(&self) -> bool {
        !self.columns.is_empty()
    }

    /// First column of the first row, the usual shape of `SELECT COUNT(*)`
    /// and friends.
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_counts_rows() {
        let result = QueryResult::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec!["1".to_string(), "Alice".to_string()],
                vec!["2".to_string(), NULL_TEXT.to_string()],
            ],
        );
        assert_eq!(result.row_count, 2);
        assert!(result.has_rows());
        assert_eq!(result.scalar(), Some("1"));
        assert_eq!(result.affected_rows, 0);
    }

    #[test]
    fn test_modified_result() {
        let result = QueryResult::modified(3, Some(42));
        assert!(!result.has_rows());
        assert_eq!(result.scalar(), None);
        assert_eq!(result.affected_rows, 3);
        assert_eq!(result.last_insert_id, Some(42));
    }

    #[test]
    fn test_serializes_to_json() {
        let result = QueryResult::new(vec!["1".to_string()], vec![vec!["1".to_string()]]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["columns"][0], "1");
        assert_eq!(json["rows"][0][0], "1");
        assert_eq!(json["row_count"], 1);
        assert!(json["last_insert_id"].is_null());
    }
}
