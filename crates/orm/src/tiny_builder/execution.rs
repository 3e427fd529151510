//! Query execution - fetching, hydration and model returning CRUD helpers

use std::sync::Arc;

use super::TinyBuilder;
use crate::backends::{AttributeItem, Connection, Row, Value};
use crate::error::{ModelError, OrmResult};
use crate::model::{CrudOperations, HasAttributes, HasTimestamps, Model};
use crate::query::{qualify, unqualified, QueryGrammar};

impl<M: Model> TinyBuilder<M> {
    pub(crate) fn connection(&self) -> OrmResult<Arc<dyn Connection>> {
        self.model.get_connection()
    }

    /// Fetch the models and resolve the top level eager loads
    pub fn get(&self) -> OrmResult<Vec<M>> {
        let mut models = self.get_models()?;
        if !models.is_empty() {
            self.eager_load_relations(&mut models)?;
        }
        Ok(models)
    }

    /// Fetch and hydrate the models without eager loading
    pub fn get_models(&self) -> OrmResult<Vec<M>> {
        let query = self.to_base();
        let query = if query.get_columns().is_empty() {
            query.select(&format!("{}.*", M::table_name()))
        } else {
            query
        };

        let rows = self.connection()?.select(&query)?;
        Ok(self.hydrate(rows))
    }

    /// Existing models from raw rows, nothing dirty
    pub fn hydrate(&self, rows: Vec<Row>) -> Vec<M> {
        rows.into_iter()
            .map(|row| self.model.new_from_builder(row))
            .collect()
    }

    pub fn find<K: Into<Value>>(&self, id: K) -> OrmResult<Option<M>> {
        self.clone()
            .where_eq(&self.model.get_qualified_key_name(), id)
            .first()
    }

    /// The model with key `id`, or a new instance
    pub fn find_or_new<K: Into<Value>>(&self, id: K) -> OrmResult<M> {
        Ok(self
            .find(id)?
            .unwrap_or_else(|| self.model.new_instance()))
    }

    pub fn find_or_fail<K: Into<Value>>(&self, id: K) -> OrmResult<M> {
        let id = id.into();
        self.find(id.clone())?
            .ok_or_else(|| ModelError::NotFound(format!("{}({})", M::table_name(), id)))
    }

    pub fn find_many<K: Into<Value>>(&self, ids: Vec<K>) -> OrmResult<Vec<M>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.clone()
            .where_in(&self.model.get_qualified_key_name(), ids)
            .get()
    }

    pub fn first(&self) -> OrmResult<Option<M>> {
        Ok(self.clone().take(1).get()?.into_iter().next())
    }

    pub fn first_or_fail(&self) -> OrmResult<M> {
        self.first()?
            .ok_or_else(|| ModelError::NotFound(M::table_name().to_string()))
    }

    pub fn first_where<V: Into<Value>>(&self, column: &str, operator: &str, value: V) -> OrmResult<Option<M>> {
        self.clone().where_op(column, operator, value).first()
    }

    /// Value of `column` of the first row
    pub fn value(&self, column: &str) -> OrmResult<Option<Value>> {
        let query = self.to_base().select(column).limit(1);
        let rows = self.connection()?.select(&query)?;
        Ok(rows.into_iter().next().and_then(|row| column_value(row, column)))
    }

    /// Values of `column` across all rows
    pub fn pluck(&self, column: &str) -> OrmResult<Vec<Value>> {
        let query = self.to_base();
        let query = if query.get_columns().is_empty() {
            query.select(column)
        } else {
            query
        };
        let rows = self.connection()?.select(&query)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| column_value(row, column))
            .collect())
    }

    pub fn count(&self) -> OrmResult<u64> {
        let query = self
            .to_base()
            .without_paging()
            .select(&self.model.get_qualified_key_name());
        Ok(self.connection()?.select(&query)?.len() as u64)
    }

    /// SQL of the current query with `$n` placeholders
    pub fn to_sql(&self) -> String {
        let grammar = self
            .connection()
            .map(|connection| connection.grammar().clone())
            .unwrap_or_else(|_| QueryGrammar::default());
        grammar.compile_select(&self.to_base()).0
    }

    /// Create and save a model
    pub fn create<I, T>(&self, attributes: I) -> OrmResult<M>
    where
        I: IntoIterator<Item = T>,
        T: Into<AttributeItem>,
    {
        let mut model = self.model.new_instance();
        model.fill(attributes)?;
        model.save()?;
        Ok(model)
    }

    /// First model matching `attributes`, or a new unsaved one filled with
    /// `attributes` and `values`
    pub fn first_or_new(&self, attributes: &[AttributeItem], values: &[AttributeItem]) -> OrmResult<M> {
        if let Some(model) = self.where_attributes(attributes).first()? {
            return Ok(model);
        }

        let mut model = self.model.new_instance();
        model.fill(attributes.iter().chain(values).cloned())?;
        Ok(model)
    }

    /// First model matching `attributes`, or a new saved one
    pub fn first_or_create(&self, attributes: &[AttributeItem], values: &[AttributeItem]) -> OrmResult<M> {
        if let Some(model) = self.where_attributes(attributes).first()? {
            return Ok(model);
        }
        self.create(attributes.iter().chain(values).cloned())
    }

    /// Fill `values` into the first model matching `attributes`, or a new
    /// one, and save it
    pub fn update_or_create(&self, attributes: &[AttributeItem], values: &[AttributeItem]) -> OrmResult<M> {
        let mut model = self.first_or_new(attributes, &[])?;
        model.fill(values.iter().cloned())?;
        model.save()?;
        Ok(model)
    }

    fn where_attributes(&self, attributes: &[AttributeItem]) -> Self {
        self.clone().where_all(
            attributes
                .iter()
                .map(|item| (item.key.as_str(), item.value.clone())),
        )
    }

    /// Update the matched rows, adding `updated_at` for timestamped models
    pub fn update(&self, values: Vec<AttributeItem>) -> OrmResult<u64> {
        let values = self.add_updated_at_column(values)?;
        let values = self.model.attributes_for_binding(&values);
        let result = self.connection()?.update(&self.to_base(), &values)?;
        Ok(result.affected_rows)
    }

    fn add_updated_at_column(&self, mut values: Vec<AttributeItem>) -> OrmResult<Vec<AttributeItem>> {
        let updated_at = M::updated_at_column();
        if !M::uses_timestamps() || updated_at.is_empty() {
            return Ok(values);
        }

        if !values.iter().any(|item| unqualified(&item.key) == updated_at) {
            values.push(AttributeItem::new(
                qualify(M::table_name(), updated_at),
                self.model.fresh_timestamp_binding()?,
            ));
        }
        Ok(values)
    }

    /// Delete the matched rows, soft deleting models stamp `deleted_at`
    /// instead
    pub fn remove(&self) -> OrmResult<u64> {
        if M::soft_deletes() {
            return self.soft_delete();
        }
        self.force_delete()
    }

    /// Bump `updated_at` of the matched rows
    pub fn touch(&self) -> OrmResult<u64> {
        if !M::uses_timestamps() {
            return Ok(0);
        }
        self.update(Vec::new())
    }

    pub fn insert(&self, values: &[AttributeItem]) -> OrmResult<u64> {
        Ok(self.connection()?.insert(&self.query, values)?.affected_rows)
    }

    pub fn insert_get_id(&self, values: &[AttributeItem], sequence: Option<&str>) -> OrmResult<u64> {
        self.connection()?.insert_get_id(&self.query, values, sequence)
    }
}

/// Value of `column`, matched by its unqualified name or alias
fn column_value(row: Row, column: &str) -> Option<Value> {
    let name = crate::query::SelectColumn::parse(column).output_name().to_string();
    let name = unqualified(&name).to_string();
    row.into_iter()
        .find(|item| item.key == name)
        .map(|item| item.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryConnection;
    use crate::connection::DatabaseManager;
    use crate::model::fixtures::Post;
    use crate::model::QueryMethods;

    fn posts() -> (Arc<MemoryConnection>, TinyBuilder<Post>) {
        let connection = Arc::new(MemoryConnection::new("default"));
        connection.seed(
            "posts",
            vec![
                vec![AttributeItem::new("title", "first")],
                vec![AttributeItem::new("title", "second")],
            ],
        );
        let manager = DatabaseManager::new("default").with_connection(connection.clone());
        (connection, Post::on(Arc::new(manager)))
    }

    #[test]
    fn test_get_hydrates_existing_clean_models() {
        let (_, builder) = posts();
        let models = builder.get().unwrap();

        assert_eq!(models.len(), 2);
        assert!(models.iter().all(|m| m.exists() && m.get_dirty().is_empty()));
    }

    #[test]
    fn test_find_and_count() {
        let (connection, builder) = posts();
        let post = builder.find(2u64).unwrap().unwrap();
        assert_eq!(post.get_attribute("title"), Some(&Value::from("second")));

        connection.reset_query_log();
        assert_eq!(builder.count().unwrap(), 2);
        assert_eq!(connection.query_count(), 1);
        assert!(builder.find(99u64).unwrap().is_none());
    }

    #[test]
    fn test_pluck_and_value() {
        let (_, builder) = posts();
        let titles = builder.clone().order_by("id").pluck("title").unwrap();
        assert_eq!(titles, vec![Value::from("first"), Value::from("second")]);
        assert_eq!(
            builder.order_by_desc("id").value("title").unwrap(),
            Some(Value::from("second"))
        );
    }

    #[test]
    fn test_first_or_new_does_not_persist() {
        let (connection, builder) = posts();
        let post = builder
            .first_or_new(&[AttributeItem::new("title", "third")], &[AttributeItem::new("body", "b")])
            .unwrap();

        assert!(!post.exists());
        assert_eq!(post.get_attribute("body"), Some(&Value::from("b")));
        assert_eq!(connection.row_count("posts"), 2);
    }

    #[test]
    fn test_update_or_create() {
        let (connection, builder) = posts();
        let post = builder
            .update_or_create(&[AttributeItem::new("title", "first")], &[AttributeItem::new("body", "x")])
            .unwrap();
        assert_eq!(post.get_key().and_then(Value::as_u64), Some(1));
        assert_eq!(connection.row_count("posts"), 2);

        let created = builder
            .update_or_create(&[AttributeItem::new("title", "new")], &[])
            .unwrap();
        assert!(created.exists());
        assert_eq!(connection.row_count("posts"), 3);
    }

    #[test]
    fn test_builder_update_adds_updated_at() {
        let (connection, builder) = posts();
        let affected = builder
            .where_eq("title", "first")
            .update(vec![AttributeItem::new("title", "renamed")])
            .unwrap();
        assert_eq!(affected, 1);

        let row = &connection.rows("posts")[0];
        assert!(row.iter().any(|item| item.key == "updated_at"));
    }

    #[test]
    fn test_to_sql() {
        let (_, builder) = posts();
        let sql = builder.where_eq("title", "x").limit(1).to_sql();
        assert_eq!(sql, "SELECT * FROM posts WHERE title = $1 LIMIT 1");
    }
}
