// Movie operations expressed as parameterized PartiQL statements, run through
// the ExecuteStatement API. Parameters are positional and are marshaled in the
// order the placeholders appear; the statement text is not checked against
// them, so a mismatch surfaces as an error from the store.
// ---------------------------------------------------------------------------

use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use fractic_server_error::ServerError;

use crate::{
    errors::DynamoCalloutError,
    schema::{
        parsing::{build_attribute_value, parse_dynamo_map},
        Movie, MovieKey,
    },
    util::{backend::DynamoBackend, DynamoMap, DynamoUtil},
};

#[derive(Clone)]
pub struct PartiqlRunner {
    pub backend: Arc<dyn DynamoBackend>,
    pub table: String,
}

impl From<&DynamoUtil> for PartiqlRunner {
    fn from(util: &DynamoUtil) -> Self {
        Self {
            backend: util.backend.clone(),
            table: util.table.clone(),
        }
    }
}

impl PartiqlRunner {
    pub fn new(backend: Arc<dyn DynamoBackend>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub fn insert_statement(&self) -> String {
        format!(
            "INSERT INTO \"{}\" VALUE {{'title': ?, 'year': ?, 'info': ?}}",
            self.table
        )
    }

    pub fn select_statement(&self) -> String {
        format!(
            "SELECT * FROM \"{}\" WHERE title = ? AND year = ?",
            self.table
        )
    }

    pub fn update_rating_statement(&self) -> String {
        format!(
            "UPDATE \"{}\" SET info.rating = ? WHERE title = ? AND year = ?",
            self.table
        )
    }

    pub fn delete_statement(&self) -> String {
        format!(
            "DELETE FROM \"{}\" WHERE title = ? AND year = ?",
            self.table
        )
    }

    pub async fn add_movie(&self, movie: &Movie) -> Result<(), ServerError> {
        movie.key()?;
        let parameters = vec![
            build_attribute_value(&movie.title)?,
            build_attribute_value(&movie.year)?,
            build_attribute_value(&movie.info)?,
        ];
        self.execute(self.insert_statement(), parameters).await?;
        Ok(())
    }

    /// Fetches a single movie by key. An empty result set is `Ok(None)`.
    pub async fn get_movie(&self, key: &MovieKey) -> Result<Option<Movie>, ServerError> {
        let parameters = vec![
            build_attribute_value(&key.title)?,
            build_attribute_value(&key.year)?,
        ];
        let items = self.execute(self.select_statement(), parameters).await?;
        items
            .first()
            .map(parse_dynamo_map::<Movie>)
            .transpose()
    }

    pub async fn update_rating(&self, key: &MovieKey, rating: f64) -> Result<(), ServerError> {
        let parameters = vec![
            build_attribute_value(&rating)?,
            build_attribute_value(&key.title)?,
            build_attribute_value(&key.year)?,
        ];
        self.execute(self.update_rating_statement(), parameters)
            .await?;
        Ok(())
    }

    pub async fn delete_movie(&self, key: &MovieKey) -> Result<(), ServerError> {
        let parameters = vec![
            build_attribute_value(&key.title)?,
            build_attribute_value(&key.year)?,
        ];
        self.execute(self.delete_statement(), parameters).await?;
        Ok(())
    }

    /// Runs one statement and collects the returned items across all pages.
    async fn execute(
        &self,
        statement: String,
        parameters: Vec<AttributeValue>,
    ) -> Result<Vec<DynamoMap>, ServerError> {
        tracing::debug!(statement = %statement, "executing PartiQL statement");
        let mut items: Vec<DynamoMap> = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .backend
                .execute_statement(statement.clone(), parameters.clone(), next_token)
                .await
                .map_err(|e| DynamoCalloutError::with_debug(&e))?;
            items.extend(response.items.unwrap_or_default());
            match response.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(items)
    }
}
