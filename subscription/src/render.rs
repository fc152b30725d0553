use crate::descriptor::ServerDescriptor;
use async_trait::async_trait;
use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, Error, Output, State, UndefinedBehavior, context, escape_formatter};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const TEMPLATE_NAME: &str = "subscription";

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("could not read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Turns the parsed servers into the response document.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, servers: &[ServerDescriptor]) -> Result<String, RenderError>;
}

/// Renders a template file, re-read on every call so edits apply without a restart.
pub struct TemplateFileRenderer {
    path: PathBuf,
}

impl TemplateFileRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TemplateFileRenderer { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Renderer for TemplateFileRenderer {
    async fn render(&self, servers: &[ServerDescriptor]) -> Result<String, RenderError> {
        let source = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| RenderError::Io {
                path: self.path.clone(),
                source,
            })?;
        render_template(&source, servers)
    }
}

/// Renders a template held in memory.
pub struct TemplateRenderer {
    source: String,
}

impl TemplateRenderer {
    pub fn new(source: impl Into<String>) -> Self {
        TemplateRenderer {
            source: source.into(),
        }
    }
}

#[async_trait]
impl Renderer for TemplateRenderer {
    async fn render(&self, servers: &[ServerDescriptor]) -> Result<String, RenderError> {
        render_template(&self.source, servers)
    }
}

// Templates see the list as `servers`. Unknown names are errors, not empty strings.
fn render_template(source: &str, servers: &[ServerDescriptor]) -> Result<String, RenderError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_formatter(format_value);
    env.add_template(TEMPLATE_NAME, source)?;

    let template = env.get_template(TEMPLATE_NAME)?;
    Ok(template.render(context! { servers })?)
}

// Booleans print as `true`/`false` rather than `True`/`False`.
fn format_value(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), Error> {
    if value.kind() == ValueKind::Bool {
        out.write_str(if value.is_true() { "true" } else { "false" })?;
        return Ok(());
    }
    escape_formatter(out, state, value)
}
