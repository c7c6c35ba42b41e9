//! Data-access collaborator consumed by the backup manager.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::debug;

use super::record::{EntityKind, Record};
use crate::error::DatabaseError;

/// Source of entity records. Implementations own persistence and any
/// per-field validation; the backup core treats records as opaque.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get_cars(&self) -> Result<Vec<Record>, DatabaseError>;

    async fn get_customers(&self) -> Result<Vec<Record>, DatabaseError>;

    async fn get_bookings(&self) -> Result<Vec<Record>, DatabaseError>;

    /// Fetch one kind by name.
    async fn fetch(&self, kind: EntityKind) -> Result<Vec<Record>, DatabaseError> {
        match kind {
            EntityKind::Cars => self.get_cars().await,
            EntityKind::Customers => self.get_customers().await,
            EntityKind::Bookings => self.get_bookings().await,
        }
    }
}

/// In-process data source backed by per-kind record lists.
#[derive(Default)]
pub struct InMemoryDataSource {
    collections: RwLock<HashMap<EntityKind, Vec<Record>>>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small demo fleet with customers and one booking.
    pub fn with_demo_data() -> Self {
        let cars = to_records(vec![
            json!({"id": 1, "plate": "RT-101", "make": "Toyota", "model": "Yaris", "daily_rate": 39.0, "available": true}),
            json!({"id": 2, "plate": "RT-102", "make": "Volkswagen", "model": "Golf", "daily_rate": 49.0, "available": false}),
            json!({"id": 3, "plate": "RT-103", "make": "Ford", "model": "Transit, 9 seats", "daily_rate": 89.0, "available": true}),
        ]);
        let customers = to_records(vec![
            json!({"id": 1, "name": "Ana Silva", "phone": "+351912345678", "email": "ana@example.com"}),
            json!({"id": 2, "name": "Tom \"TJ\" Jones", "phone": "+447700900123", "email": "tj@example.com"}),
        ]);
        let bookings = to_records(vec![
            json!({"id": 1, "car_id": 2, "customer_id": 1, "pickup": "2026-10-20", "return": "2026-10-24", "total": 196.0}),
        ]);

        let mut collections = HashMap::new();
        collections.insert(EntityKind::Cars, cars);
        collections.insert(EntityKind::Customers, customers);
        collections.insert(EntityKind::Bookings, bookings);
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Replace one collection wholesale.
    pub async fn replace(&self, kind: EntityKind, records: Vec<Record>) {
        debug!(entity = %kind, count = records.len(), "Replacing collection");
        self.collections.write().await.insert(kind, records);
    }

    async fn read(&self, kind: EntityKind) -> Vec<Record> {
        self.collections
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn get_cars(&self) -> Result<Vec<Record>, DatabaseError> {
        Ok(self.read(EntityKind::Cars).await)
    }

    async fn get_customers(&self) -> Result<Vec<Record>, DatabaseError> {
        Ok(self.read(EntityKind::Customers).await)
    }

    async fn get_bookings(&self) -> Result<Vec<Record>, DatabaseError> {
        Ok(self.read(EntityKind::Bookings).await)
    }
}

fn to_records(values: Vec<serde_json::Value>) -> Vec<Record> {
    values
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_source_returns_empty_collections() {
        let source = InMemoryDataSource::new();
        for kind in EntityKind::ALL {
            assert!(source.fetch(kind).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn demo_data_has_every_kind() {
        let source = InMemoryDataSource::with_demo_data();
        assert_eq!(source.get_cars().await.unwrap().len(), 3);
        assert_eq!(source.get_customers().await.unwrap().len(), 2);
        assert_eq!(source.get_bookings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_overwrites_collection() {
        let source = InMemoryDataSource::with_demo_data();
        source.replace(EntityKind::Cars, Vec::new()).await;
        assert!(source.get_cars().await.unwrap().is_empty());
        assert_eq!(source.get_customers().await.unwrap().len(), 2);
    }
}
