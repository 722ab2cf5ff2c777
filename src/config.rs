use fractic_server_error::ServerError;

use crate::errors::DynamoConfigError;

pub const DYNAMO_REGION: &str = "DYNAMO_REGION";
pub const DYNAMO_ENDPOINT: &str = "DYNAMO_ENDPOINT";
pub const DYNAMO_ACCESS_KEY_ID: &str = "DYNAMO_ACCESS_KEY_ID";
pub const DYNAMO_SECRET_ACCESS_KEY: &str = "DYNAMO_SECRET_ACCESS_KEY";
pub const DYNAMO_TABLE: &str = "DYNAMO_TABLE";

pub const DEFAULT_TABLE: &str = "movies";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Everything needed to open a connection to the store.
///
/// If `endpoint` is set, requests go there instead of the regional AWS
/// endpoint (e.g. LocalStack or DynamoDB Local). If `credentials` is not
/// set, the default AWS provider chain is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub credentials: Option<StaticCredentials>,
    pub table: String,
}

impl DynamoConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            credentials: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_static_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some(StaticCredentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        });
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Reads the process environment, after loading a `.env` file if one is
    /// present.
    pub fn from_env() -> Result<Self, ServerError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let region = non_empty(DYNAMO_REGION)
            .ok_or_else(|| DynamoConfigError::new(&format!("{DYNAMO_REGION} is not set")))?;
        let credentials = match (
            non_empty(DYNAMO_ACCESS_KEY_ID),
            non_empty(DYNAMO_SECRET_ACCESS_KEY),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => {
                return Err(DynamoConfigError::new(&format!(
                    "{DYNAMO_ACCESS_KEY_ID} and {DYNAMO_SECRET_ACCESS_KEY} must be set together"
                )))
            }
        };

        Ok(Self {
            region,
            endpoint: non_empty(DYNAMO_ENDPOINT),
            credentials,
            table: non_empty(DYNAMO_TABLE).unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        })
    }
}
