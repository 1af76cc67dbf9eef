use std::collections::BTreeMap;

use dstore_model::{Schema, SerializedRecord};
use dstore_schema::SchemaSanitizer;

use crate::adapter::{RecordId, StorageAdapter, StorageKind, check_schema_conflict};
use crate::error::Result;

/// In-memory storage keyed by record position.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    sanitizer: SchemaSanitizer,
    schema: Option<Schema>,
    records: BTreeMap<RecordId, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a sanitizer with a different identifier limit.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: SchemaSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }
}

impl StorageAdapter for MemoryStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    fn set_schema(&mut self, schema: Schema) -> Result<()> {
        let cleaned = self.sanitizer.clean_schema(&schema);
        check_schema_conflict(self.schema.as_ref(), &cleaned)?;
        self.schema = Some(cleaned);
        Ok(())
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn store_multiple(&mut self, records: &[SerializedRecord]) -> Result<Vec<RecordId>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            self.records.insert(record.number, record.payload.clone());
            ids.push(record.number);
        }
        Ok(ids)
    }

    fn retrieve(&self, id: RecordId) -> Result<Option<String>> {
        Ok(self.records.get(&id).cloned())
    }

    fn retrieve_all(&self) -> Result<BTreeMap<RecordId, String>> {
        Ok(self.records.clone())
    }

    fn remove(&mut self, id: RecordId) -> Result<bool> {
        Ok(self.records.remove(&id).is_some())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn destroy(&mut self) -> Result<()> {
        self.records.clear();
        self.schema = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use dstore_model::Field;

    fn record(number: u64, payload: &str) -> SerializedRecord {
        SerializedRecord {
            number,
            payload: payload.to_string(),
        }
    }

    #[test]
    fn repeated_store_overwrites() {
        let mut storage = MemoryStorage::new();
        storage
            .store_multiple(&[record(1, r#"["a"]"#), record(2, r#"["b"]"#)])
            .unwrap();
        storage.store_multiple(&[record(2, r#"["b"]"#)]).unwrap();
        assert_eq!(storage.count().unwrap(), 2);
        assert_eq!(storage.retrieve(2).unwrap().as_deref(), Some(r#"["b"]"#));
    }

    #[test]
    fn remove_reports_presence() {
        let mut storage = MemoryStorage::new();
        storage.store_multiple(&[record(1, "[]")]).unwrap();
        assert!(storage.remove(1).unwrap());
        assert!(!storage.remove(1).unwrap());
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn set_schema_cleans_names() {
        let mut storage = MemoryStorage::new();
        storage
            .set_schema(Schema::new(vec![Field::text("Zip Code"), Field::text("id")]))
            .unwrap();
        let schema = storage.schema().unwrap();
        assert_eq!(schema.names(), vec!["zip_code", "id"]);
        assert_eq!(
            schema.fields()[0].description.as_deref(),
            Some("Zip Code")
        );
    }

    #[test]
    fn same_schema_twice_is_accepted() {
        let mut storage = MemoryStorage::new();
        let schema = Schema::new(vec![Field::text("id")]);
        storage.set_schema(schema.clone()).unwrap();
        storage.set_schema(schema).unwrap();

        let err = storage
            .set_schema(Schema::new(vec![Field::text("other")]))
            .unwrap_err();
        assert!(matches!(err, StorageError::SchemaConflict { .. }));
    }

    #[test]
    fn destroy_forgets_schema_and_records() {
        let mut storage = MemoryStorage::new();
        storage.set_schema(Schema::new(vec![Field::text("id")])).unwrap();
        storage.store_multiple(&[record(1, "[]")]).unwrap();
        storage.destroy().unwrap();
        assert!(storage.schema().is_none());
        assert_eq!(storage.count().unwrap(), 0);
        storage
            .set_schema(Schema::new(vec![Field::text("other")]))
            .unwrap();
    }
}
