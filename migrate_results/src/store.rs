//! Key-value store seam of the worker and its DynamoDB implementation.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use async_trait::async_trait;
use aws_sdk_dynamodb as ddb;
use aws_sdk_dynamodb::model::AttributeValue;
use aws_sdk_dynamodb::types::SdkError;
use lambda_runtime::Error;
use migration_common::keys::PK;
use tokio_stream::StreamExt;
use tracing::debug;

pub type Item = HashMap<String, AttributeValue>;

#[derive(Debug)]
pub struct RecordError {
    pub reason: String
}

impl std::error::Error for RecordError {}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: String,
    pub value: AttributeValue
}

/// A single-partition query: `partition = value`, optionally
/// `begins_with(sort, prefix)`, narrowed by equality filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub index_name: Option<String>,
    pub partition: Condition,
    pub sort_prefix: Option<(String, String)>,
    pub filters: Vec<Condition>
}

impl Query {
    pub fn partition(attribute: &str, value: AttributeValue) -> Self {
        Query {
            index_name: None,
            partition: Condition { attribute: attribute.to_string(), value },
            sort_prefix: None,
            filters: Vec::new()
        }
    }

    pub fn on_index(mut self, index_name: &str) -> Self {
        self.index_name = Some(index_name.to_string());
        self
    }

    pub fn sort_begins_with(mut self, attribute: &str, prefix: impl Into<String>) -> Self {
        self.sort_prefix = Some((attribute.to_string(), prefix.into()));
        self
    }

    pub fn filter(mut self, attribute: &str, value: AttributeValue) -> Self {
        self.filters.push(Condition { attribute: attribute.to_string(), value });
        self
    }

    pub fn key_condition_expression(&self) -> String {
        match self.sort_prefix {
            Some(_) => String::from("#pk = :pk AND begins_with(#sk, :sk)"),
            None => String::from("#pk = :pk")
        }
    }

    pub fn filter_expression(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None
        }
        let clauses: Vec<String> = (0..self.filters.len())
            .map(|i| format!("#f{i} = :f{i}"))
            .collect();
        Some(clauses.join(" AND "))
    }

    pub fn expression_attribute_names(&self) -> HashMap<String, String> {
        let mut names = HashMap::from([
            (String::from("#pk"), self.partition.attribute.to_owned())
        ]);
        if let Some((attribute, _)) = &self.sort_prefix {
            names.insert(String::from("#sk"), attribute.to_owned());
        }
        for (i, filter) in self.filters.iter().enumerate() {
            names.insert(format!("#f{i}"), filter.attribute.to_owned());
        }
        names
    }

    pub fn expression_attribute_values(&self) -> HashMap<String, AttributeValue> {
        let mut values = HashMap::from([
            (String::from(":pk"), self.partition.value.clone())
        ]);
        if let Some((_, prefix)) = &self.sort_prefix {
            values.insert(String::from(":sk"), AttributeValue::S(prefix.to_owned()));
        }
        for (i, filter) in self.filters.iter().enumerate() {
            values.insert(format!(":f{i}"), filter.value.clone());
        }
        values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    AlreadyExists
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All items matching `query`, across every result page.
    async fn query(&self, query: &Query) -> Result<Vec<Item>, Error>;

    /// Writes `item` unless an item with the same primary key is already
    /// stored. A lost condition is reported as [`PutOutcome::AlreadyExists`].
    async fn put_if_absent(&self, item: Item) -> Result<PutOutcome, Error>;
}

pub struct DynamoStore {
    client: ddb::Client,
    table_name: String
}

impl DynamoStore {
    pub fn new(client: ddb::Client, table_name: String) -> Self {
        DynamoStore { client, table_name }
    }
}

#[async_trait]
impl RecordStore for DynamoStore {
    async fn query(&self, query: &Query) -> Result<Vec<Item>, Error> {
        let mut pages = self.client.query()
            .table_name(self.table_name.to_owned())
            .set_index_name(query.index_name.clone())
            .key_condition_expression(query.key_condition_expression())
            .set_filter_expression(query.filter_expression())
            .set_expression_attribute_names(Some(query.expression_attribute_names()))
            .set_expression_attribute_values(Some(query.expression_attribute_values()))
            .into_paginator()
            .send();
        let mut found = Vec::new();
        while let Some(page) = pages.next().await {
            match page?.items() {
                Some(items) => found.extend(items.iter().cloned()),
                None => break
            }
        }
        debug!("{} items from {} for {:?}", found.len(), self.table_name, query);
        Ok(found)
    }

    async fn put_if_absent(&self, item: Item) -> Result<PutOutcome, Error> {
        primary_key(&item)?;
        let result = self.client.put_item()
            .table_name(self.table_name.to_owned())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", PK)
            .send()
            .await;
        match result {
            Ok(_) => Ok(PutOutcome::Inserted),
            Err(SdkError::ServiceError(e)) if e.err().is_conditional_check_failed_exception() => {
                Ok(PutOutcome::AlreadyExists)
            },
            Err(e) => Err(e.into())
        }
    }
}

pub fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Some(s.as_str()),
        _ => None
    }
}

/// The `PK` of `item`, which must be a string or a number.
pub fn primary_key(item: &Item) -> Result<&AttributeValue, RecordError> {
    match item.get(PK) {
        Some(value @ AttributeValue::S(_)) | Some(value @ AttributeValue::N(_)) => Ok(value),
        Some(other) => Err(RecordError { reason: format!("unsupported {} value {:?}", PK, other) }),
        None => Err(RecordError { reason: format!("item without {}", PK) })
    }
}

/// Members of a list or set attribute, in stored order. Anything else is empty.
pub fn list_attr(item: &Item, name: &str) -> Vec<AttributeValue> {
    match item.get(name) {
        Some(AttributeValue::L(values)) => values.to_vec(),
        Some(AttributeValue::Ss(values)) => values.iter().map(|v| AttributeValue::S(v.to_owned())).collect(),
        Some(AttributeValue::Ns(values)) => values.iter().map(|v| AttributeValue::N(v.to_owned())).collect(),
        _ => Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    fn results_query() -> Query {
        Query::partition("barcode", s("BC1"))
            .on_index("PK-SK-index")
            .sort_begins_with("SK", "#STATE_DATE#")
            .filter("type_event", s("REPORT_READY"))
            .filter("REPID", s("123"))
    }

    #[test]
    fn builds_expressions() {
        let query = results_query();
        assert_eq!(query.key_condition_expression(), "#pk = :pk AND begins_with(#sk, :sk)");
        assert_eq!(query.filter_expression().as_deref(), Some("#f0 = :f0 AND #f1 = :f1"));
        let names = query.expression_attribute_names();
        assert_eq!(names["#pk"], "barcode");
        assert_eq!(names["#sk"], "SK");
        assert_eq!(names["#f1"], "REPID");
        let values = query.expression_attribute_values();
        assert_eq!(values[":sk"], s("#STATE_DATE#"));
        assert_eq!(values[":f0"], s("REPORT_READY"));
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn partition_only_query() {
        let query = Query::partition("PK", s("REPORTID#1"));
        assert_eq!(query.key_condition_expression(), "#pk = :pk");
        assert_eq!(query.filter_expression(), None);
        assert_eq!(query.expression_attribute_names().len(), 1);
    }

    #[test]
    fn reads_attributes() {
        let item = Item::from([
            (String::from("PK"), AttributeValue::N(String::from("42"))),
            (String::from("ITEMS"), AttributeValue::L(vec![s("BC1"), s("BC2")])),
            (String::from("SET"), AttributeValue::Ss(vec![String::from("BC3")]))
        ]);
        assert_eq!(primary_key(&item).unwrap(), &AttributeValue::N(String::from("42")));
        assert_eq!(string_attr(&item, "PK"), None);
        assert_eq!(list_attr(&item, "ITEMS"), vec![s("BC1"), s("BC2")]);
        assert_eq!(list_attr(&item, "SET"), vec![s("BC3")]);
        assert!(list_attr(&item, "PK").is_empty());
    }

    #[test]
    fn rejects_items_without_usable_key() {
        let missing = Item::from([(String::from("SK"), s("#DEF#TS#1"))]);
        assert_eq!(primary_key(&missing).unwrap_err().reason, "item without PK");
        let listed = Item::from([(String::from("PK"), AttributeValue::L(vec![s("x")]))]);
        assert!(primary_key(&listed).unwrap_err().reason.starts_with("unsupported PK value"));
    }
}
