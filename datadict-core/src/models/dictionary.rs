use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured description of one table, as produced by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDictionary {
    pub table_name: String,
    pub summary: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub inferred_type: String,
    pub description: String,
    pub constraints: Vec<String>,
    pub example_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_logic: Option<String>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("column {index} has an empty name")]
    EmptyColumnName { index: usize },

    #[error("column '{name}' has an empty inferred_type")]
    EmptyInferredType { name: String },
}

impl DataDictionary {
    /// Every column must carry a non-blank `name` and `inferred_type`.
    pub fn validate(&self) -> Result<(), DictionaryError> {
        for (index, column) in self.columns.iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(DictionaryError::EmptyColumnName { index });
            }
            if column.inferred_type.trim().is_empty() {
                return Err(DictionaryError::EmptyInferredType {
                    name: column.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Render as a Markdown document with one table row per column. Only the
    /// first two example values are listed.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# Data Dictionary: {}\n\n", self.table_name);
        md.push_str(&format!("## Summary\n{}\n\n", self.summary));
        md.push_str("## Columns\n\n");
        md.push_str("| Column Name | Data Type | Description | Constraints | Examples |\n");
        md.push_str("| :--- | :--- | :--- | :--- | :--- |\n");
        for col in &self.columns {
            let examples: Vec<&str> = col
                .example_values
                .iter()
                .take(2)
                .map(String::as_str)
                .collect();
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                cell(&col.name),
                cell(&col.inferred_type),
                cell(&col.description),
                cell(&col.constraints.join(", ")),
                cell(&examples.join(", ")),
            ));
        }
        md
    }

    /// `"Customer Orders"` becomes `customer_orders_dictionary.md`.
    pub fn export_file_name(&self) -> String {
        let mut stem = String::with_capacity(self.table_name.len());
        let mut in_space = false;
        for c in self.table_name.to_lowercase().chars() {
            if c.is_whitespace() {
                if !in_space {
                    stem.push('_');
                }
                in_space = true;
            } else {
                stem.push(c);
                in_space = false;
            }
        }
        format!("{}_dictionary.md", stem)
    }
}

// Pipes and line breaks would split a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users_table() -> DataDictionary {
        serde_json::from_value(json!({
            "table_name": "Users",
            "summary": "Registered application users",
            "columns": [
                {
                    "name": "id",
                    "inferred_type": "INTEGER",
                    "description": "Surrogate key",
                    "constraints": ["PRIMARY KEY", "NOT NULL"],
                    "example_values": ["1", "2", "3"]
                },
                {
                    "name": "name",
                    "inferred_type": "VARCHAR(255)",
                    "description": "Display name",
                    "constraints": [],
                    "example_values": ["Alice", "Bob"],
                    "business_logic": "Free text | user supplied"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_required_column_field_is_rejected() {
        let result = serde_json::from_value::<DataDictionary>(json!({
            "table_name": "t",
            "summary": "s",
            "columns": [{
                "name": "id",
                "inferred_type": "INTEGER",
                "description": "d",
                "example_values": []
            }]
        }));
        assert!(result.is_err(), "constraints must be present");
    }

    #[test]
    fn test_business_logic_is_optional_and_omitted_when_absent() {
        let dict = users_table();
        assert!(dict.columns[0].business_logic.is_none());
        let value = serde_json::to_value(&dict).unwrap();
        assert!(value["columns"][0].get("business_logic").is_none());
        assert_eq!(
            value["columns"][1]["business_logic"],
            "Free text | user supplied"
        );
    }

    #[test]
    fn test_validate_accepts_well_formed_dictionary() {
        assert_eq!(users_table().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let mut dict = users_table();
        dict.columns[1].name = "  ".to_string();
        assert_eq!(
            dict.validate(),
            Err(DictionaryError::EmptyColumnName { index: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_empty_inferred_type() {
        let mut dict = users_table();
        dict.columns[0].inferred_type = String::new();
        assert_eq!(
            dict.validate(),
            Err(DictionaryError::EmptyInferredType {
                name: "id".to_string()
            })
        );
    }

    #[test]
    fn test_markdown_export_layout() {
        let md = users_table().to_markdown();
        assert!(md.starts_with("# Data Dictionary: Users\n\n## Summary\nRegistered application users\n\n## Columns\n\n"));
        assert!(md.contains("| id | INTEGER | Surrogate key | PRIMARY KEY, NOT NULL | 1, 2 |\n"));
        assert!(md.contains("| name | VARCHAR(255) | Display name |  | Alice, Bob |\n"));
    }

    #[test]
    fn test_markdown_cells_escape_pipes_and_newlines() {
        let mut dict = users_table();
        dict.columns[0].description = "a|b\nc".to_string();
        let md = dict.to_markdown();
        assert!(md.contains("| a\\|b c |"));
    }

    #[test]
    fn test_export_file_name_collapses_whitespace() {
        let mut dict = users_table();
        dict.table_name = "Customer   Orders\t2024".to_string();
        assert_eq!(dict.export_file_name(), "customer_orders_2024_dictionary.md");
    }
}
