use serde::Serialize;
use shared::intrinsic::{GetAtt, Ref, Sub};
use shared::openapi::ApiDescription;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: &'static str,
    pub transform: &'static str,
    pub description: String,
    pub resources: BTreeMap<String, Resource>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "Type", content = "Properties")]
pub enum Resource {
    #[serde(rename = "AWS::Serverless::Function")]
    Function(FunctionProperties),
    #[serde(rename = "AWS::ApiGateway::RestApi")]
    RestApi(RestApiProperties),
    #[serde(rename = "AWS::ApiGateway::Deployment")]
    Deployment(DeploymentProperties),
    #[serde(rename = "AWS::Lambda::Permission")]
    Permission(PermissionProperties),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub code_uri: String,
    pub handler: String,
    pub runtime: String,
    pub architectures: Vec<String>,
    pub memory_size: u16,
    pub timeout: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RestApiProperties {
    pub name: String,
    pub body: ApiDescription,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentProperties {
    pub rest_api_id: Ref,
    pub stage_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionProperties {
    pub action: String,
    pub function_name: GetAtt,
    pub principal: String,
    pub source_arn: Sub,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Sub,
}
