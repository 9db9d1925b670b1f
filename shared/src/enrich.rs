use tracing::{debug, warn};

use crate::intrinsic::{self, Sub};
use crate::openapi::{ApiDescription, Integration, IntegrationExtension, INTEGRATION_EXTENSION};

pub const PASSTHROUGH_BEHAVIOR: &str = "when_no_match";
/// Lambda proxy integrations are always invoked with POST, whatever the route method.
pub const BACKEND_HTTP_METHOD: &str = "POST";
pub const INTEGRATION_TYPE: &str = "aws_proxy";

/// The Lambda function every operation is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationTarget {
    pub partition: String,
    pub region: String,
    pub function_arn: String,
}

impl IntegrationTarget {
    /// Target whose partition and region are resolved by CloudFormation at deploy time.
    pub fn deferred(function_arn: impl Into<String>) -> Self {
        Self {
            partition: intrinsic::PARTITION.to_string(),
            region: intrinsic::REGION.to_string(),
            function_arn: function_arn.into(),
        }
    }

    pub fn invocation_uri(&self) -> Sub {
        Sub::new(format!(
            "arn:{}:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
            self.partition, self.region, self.function_arn
        ))
    }

    pub fn extension(&self) -> IntegrationExtension {
        IntegrationExtension {
            uri: self.invocation_uri(),
            passthrough_behavior: PASSTHROUGH_BEHAVIOR.to_string(),
            http_method: BACKEND_HTTP_METHOD.to_string(),
            integration_type: INTEGRATION_TYPE.to_string(),
        }
    }
}

/// Points every operation of `description` at `target`.
///
/// Existing integrations are overwritten whatever their shape. Paths without
/// operations are left alone, so a description with no paths comes back
/// unchanged.
pub fn enrich(mut description: ApiDescription, target: &IntegrationTarget) -> ApiDescription {
    let extension = target.extension();
    let integration = Integration::Lambda(extension.clone());
    let mut enriched = 0usize;

    for (path, method, operation) in description.operations_mut() {
        if let Some(previous) = &operation.integration {
            if previous != &integration {
                warn!("Replacing {} on {} {}", INTEGRATION_EXTENSION, method, path);
            }
        }
        operation.integration = Some(integration.clone());
        enriched += 1;
    }

    debug!("Enriched {} operations with {}", enriched, extension.uri);

    description
}
