use std::{collections::HashMap, sync::Arc, time::Duration};

use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    PutRequest, ScalarAttributeType, WriteRequest,
};
use backend::DynamoBackend;
use fractic_core::collection;
use fractic_server_error::ServerError;

use crate::{
    config::DynamoConfig,
    errors::{DynamoCalloutError, DynamoRequestBuildError},
    schema::{
        movie::INFO_RATING,
        parsing::{build_attribute_value, build_dynamo_map, parse_dynamo_map},
        Movie, MovieKey, ATTR_INFO, ATTR_TITLE, ATTR_YEAR,
    },
};

pub mod backend;
mod test;

pub type DynamoMap = HashMap<String, AttributeValue>;

/// Max number of write requests DynamoDB accepts in a single BatchWriteItem.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// Default bound on how long `create_table` waits for the table to become
/// active.
pub const TABLE_WAIT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub const PROVISIONED_READ_CAPACITY: i64 = 10;
pub const PROVISIONED_WRITE_CAPACITY: i64 = 10;

/// Outcome of a batch write.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchWriteReport {
    /// Number of BatchWriteItem calls issued.
    pub batches: usize,
    /// Number of items the store accepted.
    pub written: usize,
    /// Items the store returned as unprocessed. These were not written and
    /// can be resubmitted by the caller.
    pub unprocessed: Vec<Movie>,
}

#[derive(Clone)]
pub struct DynamoUtil {
    pub backend: Arc<dyn DynamoBackend>,
    pub table: String,
}

impl DynamoUtil {
    pub async fn new(config: &DynamoConfig) -> Result<Self, ServerError> {
        let client = backend::connect(config).await?;
        Ok(Self {
            backend: Arc::new(client),
            table: config.table.clone(),
        })
    }

    pub fn with_backend(backend: Arc<dyn DynamoBackend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    // Table lifecycle.
    // --------------------------------------------------

    /// Creates the movies table (hash key 'year', range key 'title') and
    /// waits until it is active.
    pub async fn create_table(&self) -> Result<(), ServerError> {
        self.create_table_with_timeout(TABLE_WAIT_TIMEOUT).await
    }

    pub async fn create_table_with_timeout(&self, max_wait: Duration) -> Result<(), ServerError> {
        let attribute_definitions = vec![
            AttributeDefinition::builder()
                .attribute_name(ATTR_YEAR)
                .attribute_type(ScalarAttributeType::N)
                .build()
                .map_err(|e| DynamoRequestBuildError::with_debug(&e))?,
            AttributeDefinition::builder()
                .attribute_name(ATTR_TITLE)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| DynamoRequestBuildError::with_debug(&e))?,
        ];
        let key_schema = vec![
            KeySchemaElement::builder()
                .attribute_name(ATTR_YEAR)
                .key_type(KeyType::Hash)
                .build()
                .map_err(|e| DynamoRequestBuildError::with_debug(&e))?,
            KeySchemaElement::builder()
                .attribute_name(ATTR_TITLE)
                .key_type(KeyType::Range)
                .build()
                .map_err(|e| DynamoRequestBuildError::with_debug(&e))?,
        ];
        let provisioned_throughput = ProvisionedThroughput::builder()
            .read_capacity_units(PROVISIONED_READ_CAPACITY)
            .write_capacity_units(PROVISIONED_WRITE_CAPACITY)
            .build()
            .map_err(|e| DynamoRequestBuildError::with_debug(&e))?;

        tracing::debug!(table = %self.table, "creating table");
        self.backend
            .create_table(
                self.table.clone(),
                attribute_definitions,
                key_schema,
                provisioned_throughput,
            )
            .await
            .map_err(|e| DynamoCalloutError::with_debug(&e))?;

        self.backend
            .wait_for_table(self.table.clone(), max_wait)
            .await?;
        tracing::info!(table = %self.table, "table is active");
        Ok(())
    }

    /// Lists every table name visible to the connection, following pagination.
    pub async fn list_tables(&self) -> Result<Vec<String>, ServerError> {
        let mut names = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let response = self
                .backend
                .list_tables(start)
                .await
                .map_err(|e| DynamoCalloutError::with_debug(&e))?;
            names.extend(response.table_names.unwrap_or_default());
            match response.last_evaluated_table_name {
                Some(last) => start = Some(last),
                None => break,
            }
        }
        Ok(names)
    }

    pub async fn delete_table(&self) -> Result<(), ServerError> {
        tracing::debug!(table = %self.table, "deleting table");
        self.backend
            .delete_table(self.table.clone())
            .await
            .map_err(|e| DynamoCalloutError::with_debug(&e))?;
        Ok(())
    }

    // Single items.
    // --------------------------------------------------

    pub async fn put_movie(&self, movie: &Movie) -> Result<(), ServerError> {
        movie.key()?;
        let item = build_dynamo_map(movie)?;
        self.backend
            .put_item(self.table.clone(), item)
            .await
            .map_err(|e| DynamoCalloutError::with_debug(&e))?;
        Ok(())
    }

    pub async fn get_movie(&self, key: &MovieKey) -> Result<Option<Movie>, ServerError> {
        let response = self
            .backend
            .get_item(self.table.clone(), key.to_dynamo_map())
            .await
            .map_err(|e| DynamoCalloutError::with_debug(&e))?;
        response
            .item
            .map(|item| parse_dynamo_map::<Movie>(&item))
            .transpose()
    }

    /// Sets `info.rating` on an existing movie, leaving the rest of `info`
    /// untouched.
    pub async fn update_rating(&self, key: &MovieKey, rating: f64) -> Result<(), ServerError> {
        let update_expression = "SET #info.#rating = :rating".to_string();
        let values = collection! {
            ":rating".to_string() => build_attribute_value(&rating)?,
        };
        let names = collection! {
            "#info".to_string() => ATTR_INFO.to_string(),
            "#rating".to_string() => INFO_RATING.to_string(),
        };
        self.backend
            .update_item(
                self.table.clone(),
                key.to_dynamo_map(),
                update_expression,
                values,
                names,
            )
            .await
            .map_err(|e| DynamoCalloutError::with_debug(&e))?;
        Ok(())
    }

    pub async fn delete_movie(&self, key: &MovieKey) -> Result<(), ServerError> {
        self.backend
            .delete_item(self.table.clone(), key.to_dynamo_map())
            .await
            .map_err(|e| DynamoCalloutError::with_debug(&e))?;
        Ok(())
    }

    // Batch writes.
    // --------------------------------------------------

    /// Writes up to `max_movies` of the given movies, in BatchWriteItem calls of
    /// at most 25 items each. Batches are not transactional: the store may
    /// leave some items unprocessed, which are reported back rather than
    /// counted as written.
    pub async fn batch_put_movies(
        &self,
        movies: &[Movie],
        max_movies: usize,
    ) -> Result<BatchWriteReport, ServerError> {
        let limit = movies.len().min(max_movies);
        let mut report = BatchWriteReport::default();
        for chunk in movies[..limit].chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|movie| -> Result<WriteRequest, ServerError> {
                    movie.key()?;
                    let put_request = PutRequest::builder()
                        .set_item(Some(build_dynamo_map(movie)?))
                        .build()
                        .map_err(|e| DynamoRequestBuildError::with_debug(&e))?;
                    Ok(WriteRequest::builder().put_request(put_request).build())
                })
                .collect::<Result<Vec<WriteRequest>, ServerError>>()?;

            let response = self
                .backend
                .batch_write_item(self.table.clone(), requests)
                .await
                .map_err(|e| DynamoCalloutError::with_debug(&e))?;
            report.batches += 1;

            let unprocessed = response
                .unprocessed_items
                .and_then(|mut tables| tables.remove(&self.table))
                .unwrap_or_default()
                .into_iter()
                .filter_map(|request| request.put_request)
                .map(|put_request| parse_dynamo_map::<Movie>(&put_request.item))
                .collect::<Result<Vec<Movie>, ServerError>>()?;
            if !unprocessed.is_empty() {
                tracing::warn!(
                    table = %self.table,
                    unprocessed = unprocessed.len(),
                    "batch write left items unprocessed"
                );
            }
            report.written += chunk.len().saturating_sub(unprocessed.len());
            report.unprocessed.extend(unprocessed);
        }
        tracing::debug!(
            table = %self.table,
            batches = report.batches,
            written = report.written,
            "batch write finished"
        );
        Ok(report)
    }

    // Scans and queries.
    // --------------------------------------------------

    /// Returns every movie in the table, reading all pages.
    pub async fn scan(&self) -> Result<Vec<Movie>, ServerError> {
        let items = self.scan_pages(None, None, None, None).await?;
        items.iter().map(parse_dynamo_map::<Movie>).collect()
    }

    /// Returns movies released between `start_year` and `end_year`
    /// (inclusive), projected to year, title and info.rating.
    pub async fn scan_by_year(
        &self,
        start_year: i64,
        end_year: i64,
    ) -> Result<Vec<Movie>, ServerError> {
        let names = collection! {
            "#year".to_string() => ATTR_YEAR.to_string(),
            "#title".to_string() => ATTR_TITLE.to_string(),
            "#info".to_string() => ATTR_INFO.to_string(),
            "#rating".to_string() => INFO_RATING.to_string(),
        };
        let values = collection! {
            ":start_year".to_string() => AttributeValue::N(start_year.to_string()),
            ":end_year".to_string() => AttributeValue::N(end_year.to_string()),
        };
        let items = self
            .scan_pages(
                Some("#year BETWEEN :start_year AND :end_year".to_string()),
                Some("#year, #title, #info.#rating".to_string()),
                Some(names),
                Some(values),
            )
            .await?;
        items.iter().map(parse_dynamo_map::<Movie>).collect()
    }

    /// Returns all movies released in the given year.
    pub async fn query_by_year(&self, year: i64) -> Result<Vec<Movie>, ServerError> {
        let mut items: Vec<DynamoMap> = Vec::new();
        let mut start: Option<DynamoMap> = None;
        loop {
            let response = self
                .backend
                .query(
                    self.table.clone(),
                    "#year = :year".to_string(),
                    collection! { "#year".to_string() => ATTR_YEAR.to_string() },
                    collection! { ":year".to_string() => AttributeValue::N(year.to_string()) },
                    start,
                )
                .await
                .map_err(|e| DynamoCalloutError::with_debug(&e))?;
            items.extend(response.items.unwrap_or_default());
            match response.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        items.iter().map(parse_dynamo_map::<Movie>).collect()
    }

    async fn scan_pages(
        &self,
        filter_expression: Option<String>,
        projection_expression: Option<String>,
        names: Option<HashMap<String, String>>,
        values: Option<DynamoMap>,
    ) -> Result<Vec<DynamoMap>, ServerError> {
        let mut items: Vec<DynamoMap> = Vec::new();
        let mut start: Option<DynamoMap> = None;
        loop {
            let response = self
                .backend
                .scan(
                    self.table.clone(),
                    filter_expression.clone(),
                    projection_expression.clone(),
                    names.clone(),
                    values.clone(),
                    start,
                )
                .await
                .map_err(|e| DynamoCalloutError::with_debug(&e))?;
            items.extend(response.items.unwrap_or_default());
            match response.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
        Ok(items)
    }
}
