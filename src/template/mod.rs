//! Renders stored views into query text.
//!
//! Views are Jinja templates. Output is HTML auto-escaped and undefined
//! variables are errors, so a template can never silently emit an empty
//! filter clause.

use std::collections::HashMap;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::specs::ViewDefinition;
use crate::types::TemplateVars;

#[derive(Debug, Error)]
#[error("Failed to render view '{view}': {message}")]
pub struct RenderError {
    pub view: String,
    pub message: String,
}

impl RenderError {
    fn new(view: &str, err: minijinja::Error) -> Self {
        Self {
            view: view.to_string(),
            message: err.to_string(),
        }
    }
}

struct CompiledView {
    digest: String,
    env: Arc<Environment<'static>>,
}

pub struct ViewRenderer {
    cache: Option<RwLock<HashMap<String, CompiledView>>>,
}

impl ViewRenderer {
    /// With `cache_compiled`, compiled templates are reused while the view
    /// source digest is unchanged.
    pub fn new(cache_compiled: bool) -> Self {
        Self {
            cache: cache_compiled.then(|| RwLock::new(HashMap::new())),
        }
    }

    pub async fn render(
        &self,
        view: &ViewDefinition,
        vars: &TemplateVars,
    ) -> Result<String, RenderError> {
        let env = match &self.cache {
            Some(cache) => self.cached_environment(cache, view).await?,
            None => Arc::new(compile(view)?),
        };

        let template = env
            .get_template(&view.name)
            .map_err(|e| RenderError::new(&view.name, e))?;
        template.render(vars).map_err(|e| RenderError::new(&view.name, e))
    }

    async fn cached_environment(
        &self,
        cache: &RwLock<HashMap<String, CompiledView>>,
        view: &ViewDefinition,
    ) -> Result<Arc<Environment<'static>>, RenderError> {
        let digest = source_digest(&view.template_source);

        {
            let compiled = cache.read().await;
            if let Some(entry) = compiled.get(&view.name) {
                if entry.digest == digest {
                    return Ok(Arc::clone(&entry.env));
                }
            }
        }

        let env = Arc::new(compile(view)?);
        cache.write().await.insert(
            view.name.clone(),
            CompiledView {
                digest,
                env: Arc::clone(&env),
            },
        );
        tracing::debug!("Compiled view template {}", view.name);
        Ok(env)
    }
}

fn compile(view: &ViewDefinition) -> Result<Environment<'static>, RenderError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_template_owned(view.name.clone(), view.template_source.clone())
        .map_err(|e| RenderError::new(&view.name, e))?;
    Ok(env)
}

fn source_digest(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
