//! Query Builder SELECT operations

use super::builder::QueryBuilder;

impl QueryBuilder {
    /// Replace the select list, `fields` is a comma separated column list
    pub fn select(mut self, fields: &str) -> Self {
        self.select_fields = split_columns(fields);
        self
    }

    /// Replace the select list with the given columns
    pub fn select_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.select_fields = columns.iter().map(|c| c.as_ref().trim().to_string()).collect();
        self
    }

    /// Append columns to the select list
    pub fn add_select(mut self, fields: &str) -> Self {
        if self.select_fields.is_empty() {
            if let Some(table) = &self.from_table {
                self.select_fields.push(format!("{}.*", table));
            }
        }
        self.select_fields.extend(split_columns(fields));
        self
    }

    /// Add SELECT DISTINCT to the query
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.from_table = Some(table.to_string());
        self
    }
}

fn split_columns(fields: &str) -> Vec<String> {
    fields
        .split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_splits_columns() {
        let query = QueryBuilder::table("torrents").select("id, name ,size");
        assert_eq!(query.get_columns(), ["id", "name", "size"]);
    }

    #[test]
    fn test_add_select_keeps_table_wildcard() {
        let query = QueryBuilder::table("torrents").add_select("tagged.active as pivot_active");
        assert_eq!(
            query.get_columns(),
            ["torrents.*", "tagged.active as pivot_active"]
        );
    }
}
