use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use shared::enrich::{enrich, IntegrationTarget};
use shared::intrinsic::{self, GetAtt, Ref, Sub};
use shared::openapi::ApiDescription;
use std::collections::BTreeMap;
use tracing::info;

use crate::parameters::{ApiParameters, FunctionParameters, Parameters};
use crate::template::{
    DeploymentProperties, FunctionProperties, Output, PermissionProperties, Resource,
    RestApiProperties, Template,
};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
const SERVERLESS_TRANSFORM: &str = "AWS::Serverless-2016-10-31";
const GATEWAY_PRINCIPAL: &str = "apigateway.amazonaws.com";
const INVOKE_ACTION: &str = "lambda:InvokeFunction";
const DEPLOYMENT_HASH_LEN: usize = 16;

/// A declared Lambda function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    logical_id: String,
}

impl FunctionRef {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn arn(&self) -> String {
        intrinsic::placeholder(&format!("{}.Arn", self.logical_id))
    }
}

/// A declared REST API together with the stage it is deployed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestApiRef {
    logical_id: String,
    stage_name: String,
    deployment_logical_id: String,
    execution_arn: Sub,
    endpoint: Sub,
}

impl RestApiRef {
    pub fn deployment_logical_id(&self) -> &str {
        &self.deployment_logical_id
    }

    /// Matches every stage, method and resource of the API.
    pub fn execution_arn(&self) -> &Sub {
        &self.execution_arn
    }

    pub fn endpoint(&self) -> &Sub {
        &self.endpoint
    }
}

pub struct Stack {
    partition: String,
    region: String,
    template: Template,
}

impl Stack {
    pub fn new(parameters: &Parameters) -> Self {
        Self {
            partition: parameters
                .partition
                .clone()
                .unwrap_or_else(|| intrinsic::PARTITION.to_string()),
            region: parameters
                .region
                .clone()
                .unwrap_or_else(|| intrinsic::REGION.to_string()),
            template: Template {
                format_version: TEMPLATE_FORMAT_VERSION,
                transform: SERVERLESS_TRANSFORM,
                description: parameters.description.clone(),
                resources: BTreeMap::new(),
                outputs: BTreeMap::new(),
            },
        }
    }

    pub fn add_function(&mut self, function: &FunctionParameters) -> FunctionRef {
        self.template.resources.insert(
            function.logical_id.clone(),
            Resource::Function(FunctionProperties {
                function_name: function.function_name.clone(),
                code_uri: function.code_uri.clone(),
                handler: function.handler.clone(),
                runtime: function.runtime.clone(),
                architectures: function.architectures.clone(),
                memory_size: function.memory_size,
                timeout: function.timeout,
            }),
        );

        FunctionRef {
            logical_id: function.logical_id.clone(),
        }
    }

    pub fn integration_target(&self, function: &FunctionRef) -> IntegrationTarget {
        IntegrationTarget {
            partition: self.partition.clone(),
            region: self.region.clone(),
            function_arn: function.arn(),
        }
    }

    /// Declares the REST API with `description` inlined as its body, and a
    /// deployment of it to the configured stage.
    ///
    /// The deployment's logical id carries a hash of the body and stage, so any
    /// change to either makes CloudFormation create a fresh deployment.
    pub fn add_spec_rest_api(
        &mut self,
        api: &ApiParameters,
        description: ApiDescription,
    ) -> Result<RestApiRef> {
        let api_id = intrinsic::placeholder(&api.logical_id);
        let deployment_logical_id = format!(
            "{}Deployment{}",
            api.logical_id,
            deployment_hash(&description, &api.stage_name)?
        );

        self.template.resources.insert(
            api.logical_id.clone(),
            Resource::RestApi(RestApiProperties {
                name: api.name.clone(),
                body: description,
            }),
        );
        self.template.resources.insert(
            deployment_logical_id.clone(),
            Resource::Deployment(DeploymentProperties {
                rest_api_id: Ref::new(&api.logical_id),
                stage_name: api.stage_name.clone(),
            }),
        );

        Ok(RestApiRef {
            logical_id: api.logical_id.clone(),
            stage_name: api.stage_name.clone(),
            deployment_logical_id,
            execution_arn: Sub::new(format!(
                "arn:{}:execute-api:{}:{}:{}/*/*/*",
                self.partition,
                self.region,
                intrinsic::ACCOUNT_ID,
                api_id
            )),
            endpoint: Sub::new(format!(
                "https://{}.execute-api.{}.{}/{}/",
                api_id,
                self.region,
                intrinsic::URL_SUFFIX,
                api.stage_name
            )),
        })
    }

    /// Lets the API invoke the function. Scoped to this API only.
    pub fn add_invoke_permission(&mut self, function: &FunctionRef, api: &RestApiRef) {
        self.template.resources.insert(
            format!("{}InvokePermission", api.logical_id),
            Resource::Permission(PermissionProperties {
                action: INVOKE_ACTION.to_string(),
                function_name: GetAtt::new(function.logical_id(), "Arn"),
                principal: GATEWAY_PRINCIPAL.to_string(),
                source_arn: api.execution_arn().clone(),
            }),
        );
    }

    pub fn add_endpoint_output(&mut self, api: &RestApiRef) {
        self.template.outputs.insert(
            format!("{}Endpoint", api.logical_id),
            Output {
                description: format!("Invoke URL of the {} stage", api.stage_name),
                value: api.endpoint().clone(),
            },
        );
    }

    pub fn into_template(self) -> Template {
        self.template
    }
}

fn deployment_hash(description: &ApiDescription, stage_name: &str) -> Result<String> {
    let body = serde_yaml::to_string(description).context("failed to serialise API body")?;

    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hasher.update(stage_name.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    Ok(digest[..DEPLOYMENT_HASH_LEN].to_string())
}

/// Declares the function, points the API description at it, then declares the
/// API and the permission linking the two. Each step consumes the previous
/// step's reference.
pub fn build(parameters: &Parameters, description: ApiDescription) -> Result<Template> {
    let mut stack = Stack::new(parameters);

    let function = stack.add_function(&parameters.function);
    let target = stack.integration_target(&function);

    let description = enrich(description, &target);
    info!(
        "Integrated {} operations with {}",
        description.operations().count(),
        function.logical_id()
    );

    let api = stack.add_spec_rest_api(&parameters.api, description)?;
    info!(
        "Deploying {} to stage {}",
        api.deployment_logical_id(),
        parameters.api.stage_name
    );
    stack.add_invoke_permission(&function, &api);
    stack.add_endpoint_output(&api);

    Ok(stack.into_template())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const API: &str = r#"
openapi: 3.0.1
info:
  title: Hello
  version: 1.0.0
paths:
  /hello:
    get:
      responses:
        "200":
          description: greeting
    post:
      responses:
        "200":
          description: greeting
"#;

    fn template(parameters: &Parameters) -> Value {
        let description = ApiDescription::from_yaml(API).unwrap();
        serde_json::to_value(build(parameters, description).unwrap()).unwrap()
    }

    fn deployment_id(source: &str, stage_name: &str) -> String {
        let mut stack = Stack::new(&Parameters::default());
        let api = ApiParameters {
            stage_name: stage_name.to_string(),
            ..ApiParameters::default()
        };
        let description = ApiDescription::from_yaml(source).unwrap();
        let api = stack.add_spec_rest_api(&api, description).unwrap();

        api.deployment_logical_id().to_string()
    }

    #[test]
    fn declares_function_api_deployment_and_permission() {
        let template = template(&Parameters::default());
        let resources = template["Resources"].as_object().unwrap();

        let deployment = resources
            .keys()
            .find(|key| key.starts_with("MySpecApiDeployment"))
            .unwrap()
            .clone();
        assert_eq!(
            resources.keys().collect::<Vec<_>>(),
            vec![
                "MyLambda",
                "MySpecApi",
                deployment.as_str(),
                "MySpecApiInvokePermission"
            ]
        );
        assert_eq!(template["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert_eq!(template["Transform"], json!("AWS::Serverless-2016-10-31"));
        assert_eq!(resources["MyLambda"]["Type"], json!("AWS::Serverless::Function"));
        assert_eq!(
            resources["MyLambda"]["Properties"]["Handler"],
            json!("bootstrap")
        );
        assert_eq!(
            resources[deployment.as_str()]["Properties"],
            json!({ "RestApiId": { "Ref": "MySpecApi" }, "StageName": "prod" })
        );
    }

    #[test]
    fn deployment_id_follows_body_and_stage() {
        let id = deployment_id(API, "prod");

        assert!(id.starts_with("MySpecApiDeployment"));
        assert_eq!(id.len(), "MySpecApiDeployment".len() + DEPLOYMENT_HASH_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(id, deployment_id(API, "prod"));

        let changed = API.replace("description: greeting", "description: hello");
        assert_ne!(id, deployment_id(&changed, "prod"));
        assert_ne!(id, deployment_id(API, "dev"));
    }

    #[test]
    fn inlines_the_enriched_body() {
        let template = template(&Parameters::default());
        let api = &template["Resources"]["MySpecApi"];

        assert_eq!(api["Type"], json!("AWS::ApiGateway::RestApi"));
        assert_eq!(api["Properties"]["Name"], json!("OpenApiGateway"));
        assert_eq!(api["Properties"]["Body"]["info"]["title"], json!("Hello"));

        for method in ["get", "post"] {
            assert_eq!(
                api["Properties"]["Body"]["paths"]["/hello"][method]
                    ["x-amazon-apigateway-integration"],
                json!({
                    "uri": {
                        "Fn::Sub": "arn:${AWS::Partition}:apigateway:${AWS::Region}:lambda:path/2015-03-31/functions/${MyLambda.Arn}/invocations"
                    },
                    "passthroughBehavior": "when_no_match",
                    "httpMethod": "POST",
                    "type": "aws_proxy"
                })
            );
        }
    }

    #[test]
    fn permission_is_scoped_to_the_api_execution_arn() {
        let mut stack = Stack::new(&Parameters::default());
        let function = stack.add_function(&FunctionParameters::default());
        let api = stack
            .add_spec_rest_api(&ApiParameters::default(), ApiDescription::default())
            .unwrap();
        stack.add_invoke_permission(&function, &api);
        let template = serde_json::to_value(stack.into_template()).unwrap();

        let permission = &template["Resources"]["MySpecApiInvokePermission"];
        assert_eq!(permission["Type"], json!("AWS::Lambda::Permission"));
        assert_eq!(
            permission["Properties"]["SourceArn"],
            serde_json::to_value(api.execution_arn()).unwrap()
        );
        assert_eq!(
            api.execution_arn().as_str(),
            "arn:${AWS::Partition}:execute-api:${AWS::Region}:${AWS::AccountId}:${MySpecApi}/*/*/*"
        );
        assert_eq!(
            permission["Properties"]["FunctionName"],
            json!({ "Fn::GetAtt": ["MyLambda", "Arn"] })
        );
        assert_eq!(
            permission["Properties"]["Principal"],
            json!("apigateway.amazonaws.com")
        );
        assert_eq!(
            permission["Properties"]["Action"],
            json!("lambda:InvokeFunction")
        );
    }

    #[test]
    fn fixed_partition_and_region_are_baked_in() {
        let parameters = Parameters {
            partition: Some("aws".to_string()),
            region: Some("us-east-1".to_string()),
            ..Parameters::default()
        };
        let template = template(&parameters);

        assert_eq!(
            template["Resources"]["MySpecApi"]["Properties"]["Body"]["paths"]["/hello"]["get"]
                ["x-amazon-apigateway-integration"]["uri"],
            json!({
                "Fn::Sub": "arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/${MyLambda.Arn}/invocations"
            })
        );
        assert_eq!(
            template["Resources"]["MySpecApiInvokePermission"]["Properties"]["SourceArn"],
            json!({
                "Fn::Sub": "arn:aws:execute-api:us-east-1:${AWS::AccountId}:${MySpecApi}/*/*/*"
            })
        );
    }

    #[test]
    fn outputs_the_stage_endpoint() {
        let template = template(&Parameters::default());

        assert_eq!(
            template["Outputs"]["MySpecApiEndpoint"]["Value"],
            json!({
                "Fn::Sub": "https://${MySpecApi}.execute-api.${AWS::Region}.${AWS::URLSuffix}/prod/"
            })
        );
    }

    #[test]
    fn function_properties_follow_parameters() {
        let mut parameters = Parameters::default();
        parameters.function.function_name = Some("hello".to_string());
        parameters.function.architectures = vec!["x86_64".to_string()];
        parameters.function.memory_size = 512;
        let template = template(&parameters);

        assert_eq!(
            template["Resources"]["MyLambda"]["Properties"],
            json!({
                "FunctionName": "hello",
                "CodeUri": "target/lambda/hello/",
                "Handler": "bootstrap",
                "Runtime": "provided.al2",
                "Architectures": ["x86_64"],
                "MemorySize": 512,
                "Timeout": 3
            })
        );
    }
}
