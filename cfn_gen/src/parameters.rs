use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub description: String,
    pub openapi_path: PathBuf,
    pub template_path: PathBuf,
    /// Fixed partition, `${AWS::Partition}` when unset.
    pub partition: Option<String>,
    /// Fixed region, `${AWS::Region}` when unset.
    pub region: Option<String>,
    pub function: FunctionParameters,
    pub api: ApiParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionParameters {
    pub logical_id: String,
    pub function_name: Option<String>,
    pub code_uri: String,
    pub handler: String,
    pub runtime: String,
    pub architectures: Vec<String>,
    pub memory_size: u16,
    pub timeout: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiParameters {
    pub logical_id: String,
    pub name: String,
    pub stage_name: String,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            description: "OpenAPI backed Lambda".to_string(),
            openapi_path: PathBuf::from("api/docs/openapi.yaml"),
            template_path: PathBuf::from("template.yml"),
            partition: None,
            region: None,
            function: FunctionParameters::default(),
            api: ApiParameters::default(),
        }
    }
}

impl Default for FunctionParameters {
    fn default() -> Self {
        Self {
            logical_id: "MyLambda".to_string(),
            function_name: None,
            code_uri: "target/lambda/hello/".to_string(),
            handler: "bootstrap".to_string(),
            runtime: "provided.al2".to_string(),
            architectures: vec!["arm64".to_string()],
            memory_size: 128,
            timeout: 3,
        }
    }
}

impl Default for ApiParameters {
    fn default() -> Self {
        Self {
            logical_id: "MySpecApi".to_string(),
            name: "OpenApiGateway".to_string(),
            stage_name: "prod".to_string(),
        }
    }
}

pub fn load_parameters(path: &Path) -> Result<Parameters> {
    let parameters = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parameters: Parameters = serde_yaml::from_str(&parameters)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    parameters.validate()?;

    Ok(parameters)
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        for logical_id in [&self.function.logical_id, &self.api.logical_id] {
            if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
                bail!("logical id `{}` must be non-empty and alphanumeric", logical_id);
            }
        }
        if self.function.logical_id == self.api.logical_id {
            bail!(
                "function and api share the logical id `{}`",
                self.function.logical_id
            );
        }
        if self.api.stage_name.is_empty() {
            bail!("api stage_name must not be empty");
        }

        Ok(())
    }
}
