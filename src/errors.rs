use fractic_server_error::{define_client_error, define_internal_error};

define_internal_error!(DynamoCalloutError, "Generic DynamoDB error.");
define_internal_error!(
    DynamoItemParsingError,
    "DynamoDB item parsing error: {details}.",
    { details: &str }
);
define_internal_error!(
    DynamoRequestBuildError,
    "Failed to build DynamoDB request."
);
define_internal_error!(
    DynamoTableWaitError,
    "DynamoDB table did not become active in time."
);
define_client_error!(
    DynamoInvalidKey,
    "DynamoDB invalid key: {details}.",
    { details: &str }
);
define_client_error!(
    DynamoConfigError,
    "Invalid DynamoDB configuration: {details}.",
    { details: &str }
);
