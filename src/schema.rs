//! Upload parsing and column validation

use csv::{ReaderBuilder, Trim};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::FeatureMatrix;

const UTF8_BOM: &str = "\u{feff}";

/// A parsed CSV upload: header row plus data rows of equal width.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl UploadTable {
    /// Decode the raw upload as UTF-8 CSV with a header row.
    pub fn from_csv_bytes(bytes: &[u8]) -> AppResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| AppError::Malformed(format!("Upload is not valid UTF-8 text: {}", e)))?;
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

        if text.trim().is_empty() {
            return Err(AppError::Malformed("No columns to parse from file".to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<String>>()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Self { headers, rows })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Identifier column plus the model's feature matrix
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub customer_ids: Vec<String>,
    pub features: FeatureMatrix,
}

/// Required columns for a scoring request
#[derive(Debug, Clone)]
pub struct Schema {
    id_column: String,
    feature_columns: Vec<String>,
}

impl Schema {
    pub fn new(id_column: impl Into<String>, feature_columns: Vec<String>) -> Self {
        Self {
            id_column: id_column.into(),
            feature_columns,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.id_column.clone(), config.feature_columns.clone())
    }

    /// Identifier first, then features in configured order.
    pub fn required_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id_column.as_str()).chain(self.feature_columns.iter().map(String::as_str))
    }

    /// Split the upload into identifiers and a feature matrix of exactly
    /// the configured columns. Extra upload columns are dropped.
    pub fn validate(&self, table: &UploadTable) -> AppResult<ValidatedBatch> {
        let missing: Vec<String> = self
            .required_columns()
            .filter(|col| !table.has_column(col))
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            return Err(AppError::MissingColumns(missing));
        }

        if table.rows.is_empty() {
            return Err(AppError::EmptyResult);
        }

        let id_idx = table
            .column_index(&self.id_column)
            .ok_or_else(|| AppError::MissingColumns(vec![self.id_column.clone()]))?;
        let feature_idx = self
            .feature_columns
            .iter()
            .map(|col| {
                table
                    .column_index(col)
                    .ok_or_else(|| AppError::MissingColumns(vec![col.clone()]))
            })
            .collect::<AppResult<Vec<usize>>>()?;

        let customer_ids: Vec<String> = table.rows.iter().map(|row| row[id_idx].clone()).collect();
        let rows: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| feature_idx.iter().map(|&i| row[i].clone()).collect::<Vec<String>>())
            .collect();

        Ok(ValidatedBatch {
            customer_ids,
            features: FeatureMatrix::new(self.feature_columns.clone(), rows),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FEATURE_COLUMNS;

    const HEADER: &str = "CustomerID,AmountSpent,ProductCategory,LoginFrequency,ServiceUsage,\
Days_Since_Last_Transaction,Days_Since_last_Interaction,Days_Since_Last_Login";

    fn schema() -> Schema {
        Schema::new(
            "CustomerID",
            DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        )
    }

    fn without(column: &str) -> String {
        HEADER
            .split(',')
            .filter(|c| *c != column)
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn test_parse_upload() {
        let csv = format!("{}\nC1,10.5,Books,3,Mobile App,5,6,7\nC2,1,Books,0,Website,1,2,3\n", HEADER);
        let table = UploadTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.headers.len(), 8);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0], "C2");
    }

    #[test]
    fn test_parse_strips_bom_and_whitespace() {
        let csv = "\u{feff}CustomerID , AmountSpent\n C1 , 5 \n";
        let table = UploadTable::from_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["CustomerID", "AmountSpent"]);
        assert_eq!(table.rows[0], vec!["C1", "5"]);
    }

    #[test]
    fn test_parse_rejects_bad_uploads() {
        assert!(matches!(UploadTable::from_csv_bytes(b""), Err(AppError::Malformed(_))));
        assert!(matches!(UploadTable::from_csv_bytes(b"  \n\n"), Err(AppError::Malformed(_))));
        assert!(matches!(
            UploadTable::from_csv_bytes(&[0xff, 0xfe, 0x00, 0x41]),
            Err(AppError::Malformed(_))
        ));
        assert!(matches!(
            UploadTable::from_csv_bytes(b"a,b\n1,2,3\n"),
            Err(AppError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_single_column() {
        let csv = format!("{}\n", without("Days_Since_Last_Login"));
        let table = UploadTable::from_csv_bytes(csv.as_bytes()).unwrap();
        match schema().validate(&table) {
            Err(AppError::MissingColumns(cols)) => assert_eq!(cols, vec!["Days_Since_Last_Login"]),
            other => panic!("Expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_columns_reported_in_check_order() {
        let header = without("ServiceUsage").replace("CustomerID,", "");
        let table = UploadTable::from_csv_bytes(format!("{}\n", header).as_bytes()).unwrap();
        match schema().validate(&table) {
            Err(AppError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["CustomerID", "ServiceUsage"])
            }
            other => panic!("Expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty_result() {
        let table = UploadTable::from_csv_bytes(format!("{}\n", HEADER).as_bytes()).unwrap();
        assert!(matches!(schema().validate(&table), Err(AppError::EmptyResult)));
    }

    #[test]
    fn test_extra_columns_are_dropped_and_features_reordered() {
        let csv = "Days_Since_Last_Login,Notes,ServiceUsage,CustomerID,AmountSpent,ProductCategory,\
LoginFrequency,Days_Since_Last_Transaction,Days_Since_last_Interaction\n\
7,vip,Website,C9,12,Books,4,5,6\n";
        let table = UploadTable::from_csv_bytes(csv.as_bytes()).unwrap();
        let batch = schema().validate(&table).unwrap();

        assert_eq!(batch.customer_ids, vec!["C9"]);
        assert_eq!(batch.features.columns(), &DEFAULT_FEATURE_COLUMNS.map(String::from));
        assert_eq!(
            batch.features.rows()[0],
            vec!["12", "Books", "4", "Website", "5", "6", "7"]
        );
        assert!(batch.features.column_index("Notes").is_none());
    }

    #[test]
    fn test_row_order_preserved() {
        let mut csv = format!("{}\n", HEADER);
        for i in 0..50 {
            csv.push_str(&format!("C{},1,Books,1,Website,1,1,1\n", i));
        }
        let table = UploadTable::from_csv_bytes(csv.as_bytes()).unwrap();
        let batch = schema().validate(&table).unwrap();
        assert_eq!(batch.customer_ids.len(), 50);
        assert_eq!(batch.features.n_rows(), 50);
        for (i, id) in batch.customer_ids.iter().enumerate() {
            assert_eq!(id, &format!("C{}", i));
        }
    }
}
