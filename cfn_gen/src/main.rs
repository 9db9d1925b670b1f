mod parameters;
mod stack;
mod template;

use anyhow::{Context, Result};
use shared::openapi::ApiDescription;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::parameters::load_parameters;
use crate::template::Template;

fn main() -> Result<()> {
    shared::log::init_cli();

    let parameters = load_parameters(Path::new("parameters.yml"))?;
    let description = ApiDescription::load(&parameters.openapi_path)?;
    info!(
        "Loaded {} paths from {}",
        description.paths.len(),
        parameters.openapi_path.display()
    );

    let template = stack::build(&parameters, description)?;
    let content = render(&template)?;
    create_template_file(&parameters.template_path, &content)?;
    info!("Wrote {}", parameters.template_path.display());

    Ok(())
}

fn render(template: &Template) -> Result<String> {
    let yaml = serde_yaml::to_string(template).context("failed to serialise template")?;

    Ok(format!("---\n{}", yaml))
}

/// Writes next to `path` first and renames over it, so a failed write never
/// leaves a truncated template behind.
fn create_template_file(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("template.yml");
    let tmp_path = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{}.tmp", file_name));

    fs::write(&tmp_path, content)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed to publish {}", path.display()))?;

    Ok(())
}
