//! Factory system for test models
//!
//! Builds models from a fixed attribute set plus per instance sequences and
//! persists them through a [`TestDatabase`].

use std::marker::PhantomData;
use std::sync::Arc;

use tinyorm::{AttributeItem, CrudOperations, HasAttributes, Model, Value};

use crate::{database::TestDatabase, TestError, TestResult};

type Sequence = Arc<dyn Fn(usize) -> Value + Send + Sync>;

/// Factory builder for fluent API
#[derive(Clone)]
pub struct FactoryBuilder<M: Model> {
    attributes: Vec<AttributeItem>,
    sequences: Vec<(String, Sequence)>,
    database: Option<TestDatabase>,
    _phantom: PhantomData<fn() -> M>,
}

impl<M: Model> FactoryBuilder<M> {
    /// Create a new factory builder
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            sequences: Vec::new(),
            database: None,
            _phantom: PhantomData,
        }
    }

    /// Set an attribute value
    pub fn with<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.attributes.push(AttributeItem::new(key, value));
        self
    }

    /// Set an attribute from the instance's index within a batch
    pub fn sequence<F>(mut self, key: &str, sequence: F) -> Self
    where
        F: Fn(usize) -> Value + Send + Sync + 'static,
    {
        self.sequences.push((key.to_string(), Arc::new(sequence)));
        self
    }

    /// Set database connection for persistence
    pub fn with_database(mut self, database: &TestDatabase) -> Self {
        self.database = Some(database.clone());
        self
    }

    /// Build the `index`-th model without persisting it
    pub fn make_nth(&self, index: usize) -> TestResult<M> {
        let mut model = match &self.database {
            Some(database) => database.model::<M>(),
            None => M::default(),
        };

        let sequenced = self
            .sequences
            .iter()
            .map(|(key, sequence)| AttributeItem::new(key.as_str(), sequence(index)));
        model.force_fill(self.attributes.iter().cloned().chain(sequenced))?;
        Ok(model)
    }

    pub fn make(&self) -> TestResult<M> {
        self.make_nth(0)
    }

    /// Build and save a model
    pub fn create(&self) -> TestResult<M> {
        self.create_nth(0)
    }

    /// Build and save `count` models
    pub fn create_many(&self, count: usize) -> TestResult<Vec<M>> {
        (0..count).map(|index| self.create_nth(index)).collect()
    }

    fn create_nth(&self, index: usize) -> TestResult<M> {
        if self.database.is_none() {
            return Err(TestError::Factory {
                message: format!("no database set for {} factory", M::model_name()),
            });
        }

        let mut model = self.make_nth(index)?;
        if !model.save()? {
            return Err(TestError::Factory {
                message: format!("saving {} failed", M::model_name()),
            });
        }
        Ok(model)
    }
}

impl<M: Model> Default for FactoryBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "fixtures"))]
mod tests {
    use super::*;
    use crate::fixtures::Torrent;
    use crate::utils;

    #[test]
    fn test_make_does_not_persist() {
        let database = TestDatabase::new();
        let torrent: Torrent = FactoryBuilder::new()
            .with("name", "made")
            .with_database(&database)
            .make()
            .unwrap();

        assert!(!torrent.exists());
        assert!(database.rows("torrents").is_empty());
    }

    #[test]
    fn test_create_many_with_sequence() {
        let database = TestDatabase::new();
        let torrents: Vec<Torrent> = FactoryBuilder::new()
            .with("hash", utils::random_hash())
            .sequence("name", |index| Value::from(format!("torrent{}", index)))
            .with_database(&database)
            .create_many(3)
            .unwrap();

        assert!(torrents.iter().all(|torrent| torrent.exists()));
        assert!(database.record_exists("torrents", &[("name", Value::from("torrent2"))]));
        assert_eq!(database.rows("torrents").len(), 3);
    }

    #[test]
    fn test_create_requires_database() {
        let result = FactoryBuilder::<Torrent>::new().create();
        assert!(matches!(result, Err(TestError::Factory { .. })));
    }
}
