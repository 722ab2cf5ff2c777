use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::{
    client::Waiters as _,
    config::Credentials,
    error::SdkError,
    operation::{
        batch_write_item::{BatchWriteItemError, BatchWriteItemOutput},
        create_table::{CreateTableError, CreateTableOutput},
        delete_item::{DeleteItemError, DeleteItemOutput},
        delete_table::{DeleteTableError, DeleteTableOutput},
        execute_statement::{ExecuteStatementError, ExecuteStatementOutput},
        get_item::{GetItemError, GetItemOutput},
        list_tables::{ListTablesError, ListTablesOutput},
        put_item::{PutItemError, PutItemOutput},
        query::{QueryError, QueryOutput},
        scan::{ScanError, ScanOutput},
        update_item::{UpdateItemError, UpdateItemOutput},
    },
    types::{
        AttributeDefinition, AttributeValue, KeySchemaElement, ProvisionedThroughput,
        WriteRequest,
    },
};
use fractic_core::collection;
use fractic_server_error::ServerError;
use mockall::automock;

use crate::{
    config::DynamoConfig,
    errors::{DynamoConfigError, DynamoTableWaitError},
};

// Underlying backend, which performs the actual AWS operations. Kept generic so
// that it can be swapped with a mock backend for testing.
//
// Should be kept as minimal and close as possible to the real
// aws_sdk_dynamodb::Client, to minimize untestable code. Paginated operations
// return a single page; callers follow the continuation token.
#[automock]
#[async_trait]
pub trait DynamoBackend: Send + Sync {
    async fn create_table(
        &self,
        table_name: String,
        attribute_definitions: Vec<AttributeDefinition>,
        key_schema: Vec<KeySchemaElement>,
        provisioned_throughput: ProvisionedThroughput,
    ) -> Result<CreateTableOutput, SdkError<CreateTableError>>;

    /// Blocks until the table exists and is active, or `max_wait` elapses.
    async fn wait_for_table(&self, table_name: String, max_wait: Duration)
        -> Result<(), ServerError>;

    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<ListTablesOutput, SdkError<ListTablesError>>;

    async fn delete_table(
        &self,
        table_name: String,
    ) -> Result<DeleteTableOutput, SdkError<DeleteTableError>>;

    async fn get_item(
        &self,
        table_name: String,
        key: HashMap<String, AttributeValue>,
    ) -> Result<GetItemOutput, SdkError<GetItemError>>;

    async fn put_item(
        &self,
        table_name: String,
        item: HashMap<String, AttributeValue>,
    ) -> Result<PutItemOutput, SdkError<PutItemError>>;

    async fn update_item(
        &self,
        table_name: String,
        key: HashMap<String, AttributeValue>,
        update_expression: String,
        expression_attribute_values: HashMap<String, AttributeValue>,
        expression_attribute_names: HashMap<String, String>,
    ) -> Result<UpdateItemOutput, SdkError<UpdateItemError>>;

    async fn delete_item(
        &self,
        table_name: String,
        key: HashMap<String, AttributeValue>,
    ) -> Result<DeleteItemOutput, SdkError<DeleteItemError>>;

    async fn batch_write_item(
        &self,
        table_name: String,
        requests: Vec<WriteRequest>,
    ) -> Result<BatchWriteItemOutput, SdkError<BatchWriteItemError>>;

    async fn scan(
        &self,
        table_name: String,
        filter_expression: Option<String>,
        projection_expression: Option<String>,
        expression_attribute_names: Option<HashMap<String, String>>,
        expression_attribute_values: Option<HashMap<String, AttributeValue>>,
        exclusive_start_key: Option<HashMap<String, AttributeValue>>,
    ) -> Result<ScanOutput, SdkError<ScanError>>;

    async fn query(
        &self,
        table_name: String,
        condition: String,
        expression_attribute_names: HashMap<String, String>,
        expression_attribute_values: HashMap<String, AttributeValue>,
        exclusive_start_key: Option<HashMap<String, AttributeValue>>,
    ) -> Result<QueryOutput, SdkError<QueryError>>;

    async fn execute_statement(
        &self,
        statement: String,
        parameters: Vec<AttributeValue>,
        next_token: Option<String>,
    ) -> Result<ExecuteStatementOutput, SdkError<ExecuteStatementError>>;
}

// Connection factory.
// --------------------------------------------------

pub async fn connect(config: &DynamoConfig) -> Result<aws_sdk_dynamodb::Client, ServerError> {
    if config.region.trim().is_empty() {
        return Err(DynamoConfigError::new("region is empty"));
    }
    let mut loader =
        aws_config::defaults(BehaviorVersion::v2025_01_17()).region(Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    if let Some(credentials) = &config.credentials {
        loader = loader.credentials_provider(Credentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None,
            None,
            "movies-dynamo-static",
        ));
    }
    let shared_config = loader.load().await;
    tracing::debug!(
        region = %config.region,
        endpoint = ?config.endpoint,
        static_credentials = config.credentials.is_some(),
        "DynamoDB client configured"
    );
    Ok(aws_sdk_dynamodb::Client::new(&shared_config))
}

// Real implementation,
// making actual calls to AWS.
// --------------------------------------------------

#[async_trait]
impl DynamoBackend for aws_sdk_dynamodb::Client {
    async fn create_table(
        &self,
        table_name: String,
        attribute_definitions: Vec<AttributeDefinition>,
        key_schema: Vec<KeySchemaElement>,
        provisioned_throughput: ProvisionedThroughput,
    ) -> Result<CreateTableOutput, SdkError<CreateTableError>> {
        self.create_table()
            .set_table_name(Some(table_name))
            .set_attribute_definitions(Some(attribute_definitions))
            .set_key_schema(Some(key_schema))
            .set_provisioned_throughput(Some(provisioned_throughput))
            .send()
            .await
    }

    async fn wait_for_table(
        &self,
        table_name: String,
        max_wait: Duration,
    ) -> Result<(), ServerError> {
        self.wait_until_table_exists()
            .table_name(table_name)
            .wait(max_wait)
            .await
            .map(|_| ())
            .map_err(|e| DynamoTableWaitError::with_debug(&e))
    }

    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<ListTablesOutput, SdkError<ListTablesError>> {
        self.list_tables()
            .set_exclusive_start_table_name(exclusive_start_table_name)
            .send()
            .await
    }

    async fn delete_table(
        &self,
        table_name: String,
    ) -> Result<DeleteTableOutput, SdkError<DeleteTableError>> {
        self.delete_table()
            .set_table_name(Some(table_name))
            .send()
            .await
    }

    async fn get_item(
        &self,
        table_name: String,
        key: HashMap<String, AttributeValue>,
    ) -> Result<GetItemOutput, SdkError<GetItemError>> {
        self.get_item()
            .set_table_name(Some(table_name))
            .set_key(Some(key))
            .send()
            .await
    }

    async fn put_item(
        &self,
        table_name: String,
        item: HashMap<String, AttributeValue>,
    ) -> Result<PutItemOutput, SdkError<PutItemError>> {
        self.put_item()
            .set_table_name(Some(table_name))
            .set_item(Some(item))
            .send()
            .await
    }

    async fn update_item(
        &self,
        table_name: String,
        key: HashMap<String, AttributeValue>,
        update_expression: String,
        expression_attribute_values: HashMap<String, AttributeValue>,
        expression_attribute_names: HashMap<String, String>,
    ) -> Result<UpdateItemOutput, SdkError<UpdateItemError>> {
        self.update_item()
            .set_table_name(Some(table_name))
            .set_key(Some(key))
            .set_update_expression(Some(update_expression))
            .set_expression_attribute_values(Some(expression_attribute_values))
            .set_expression_attribute_names(Some(expression_attribute_names))
            .send()
            .await
    }

    async fn delete_item(
        &self,
        table_name: String,
        key: HashMap<String, AttributeValue>,
    ) -> Result<DeleteItemOutput, SdkError<DeleteItemError>> {
        self.delete_item()
            .set_table_name(Some(table_name))
            .set_key(Some(key))
            .send()
            .await
    }

    async fn batch_write_item(
        &self,
        table_name: String,
        requests: Vec<WriteRequest>,
    ) -> Result<BatchWriteItemOutput, SdkError<BatchWriteItemError>> {
        self.batch_write_item()
            .set_request_items(Some(collection!(table_name => requests)))
            .send()
            .await
    }

    async fn scan(
        &self,
        table_name: String,
        filter_expression: Option<String>,
        projection_expression: Option<String>,
        expression_attribute_names: Option<HashMap<String, String>>,
        expression_attribute_values: Option<HashMap<String, AttributeValue>>,
        exclusive_start_key: Option<HashMap<String, AttributeValue>>,
    ) -> Result<ScanOutput, SdkError<ScanError>> {
        self.scan()
            .set_table_name(Some(table_name))
            .set_filter_expression(filter_expression)
            .set_projection_expression(projection_expression)
            .set_expression_attribute_names(expression_attribute_names)
            .set_expression_attribute_values(expression_attribute_values)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
    }

    async fn query(
        &self,
        table_name: String,
        condition: String,
        expression_attribute_names: HashMap<String, String>,
        expression_attribute_values: HashMap<String, AttributeValue>,
        exclusive_start_key: Option<HashMap<String, AttributeValue>>,
    ) -> Result<QueryOutput, SdkError<QueryError>> {
        self.query()
            .set_table_name(Some(table_name))
            .set_key_condition_expression(Some(condition))
            .set_expression_attribute_names(Some(expression_attribute_names))
            .set_expression_attribute_values(Some(expression_attribute_values))
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
    }

    async fn execute_statement(
        &self,
        statement: String,
        parameters: Vec<AttributeValue>,
        next_token: Option<String>,
    ) -> Result<ExecuteStatementOutput, SdkError<ExecuteStatementError>> {
        self.execute_statement()
            .set_statement(Some(statement))
            .set_parameters(Some(parameters))
            .set_next_token(next_token)
            .send()
            .await
    }
}
