use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use aws_sdk_dynamodb::model::AttributeValue;
use lambda_runtime::Error;
use migrate_results::bucket::MarkerBucket;
use migrate_results::notify::Notifier;
use migrate_results::store::{primary_key, string_attr, Item, PutOutcome, Query, RecordError, RecordStore};

/// Table keyed on `PK` + `SK`, shared between clones.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<Vec<Item>>>,
    fail_queries: Arc<AtomicBool>,
    fail_puts: Arc<AtomicBool>
}

impl MemoryStore {
    pub fn with_items(items: Vec<Item>) -> Self {
        let store = MemoryStore::default();
        *store.items.lock().unwrap() = items;
        store
    }

    pub fn items(&self) -> Vec<Item> {
        self.items.lock().unwrap().clone()
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }
}

/// Evaluates `query` against one item: partition equality, sort key prefix
/// and equality filters, ignoring which index the query names.
pub fn matches(query: &Query, item: &Item) -> bool {
    let sort_matches = match &query.sort_prefix {
        Some((attribute, prefix)) => string_attr(item, attribute)
            .map_or(false, |value| value.starts_with(prefix.as_str())),
        None => true
    };
    item.get(&query.partition.attribute) == Some(&query.partition.value)
        && sort_matches
        && query.filters.iter().all(|f| item.get(&f.attribute) == Some(&f.value))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Item>, Error> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(Error::from("ProvisionedThroughputExceededException"))
        }
        Ok(self.items.lock().unwrap().iter().filter(|i| matches(query, i)).cloned().collect())
    }

    async fn put_if_absent(&self, item: Item) -> Result<PutOutcome, Error> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::from("AccessDeniedException"))
        }
        let pk = primary_key(&item)?.clone();
        let sk = match string_attr(&item, "SK") {
            Some(sk) => sk.to_string(),
            None => return Err(RecordError { reason: format!("item without SK {:?}", item) }.into())
        };
        let mut items = self.items.lock().unwrap();
        let exists = items.iter().any(|i| {
            i.get("PK") == Some(&pk) && string_attr(i, "SK") == Some(sk.as_str())
        });
        if exists {
            return Ok(PutOutcome::AlreadyExists)
        }
        items.push(item);
        Ok(PutOutcome::Inserted)
    }
}

#[derive(Clone, Default)]
pub struct MemoryBucket {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>
}

impl MemoryBucket {
    pub fn put(&self, key: &str, body: &str) {
        self.objects.lock().unwrap().insert(key.to_string(), body.as_bytes().to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl MarkerBucket for MemoryBucket {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, subject: &str, message: &str) -> Result<(), Error> {
        self.messages.lock().unwrap().push((subject.to_string(), message.to_string()));
        Ok(())
    }
}

pub fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

pub fn item(attributes: &[(&str, AttributeValue)]) -> Item {
    attributes.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}
