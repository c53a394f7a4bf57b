//! View rendering
//!
//! The mailer only knows about the [`Renderer`] trait: given a view name and
//! some data it returns text or fails. [`TeraRenderer`] is the implementation
//! used by the binary, backed by a directory of `tera` templates.

use std::path::Path;

use serde_json::{Map, Value};
use tera::{Context, Tera};
use thiserror::Error;

/// The data made available to a view
pub type ViewData = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("View [{0}] not found")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),
}

pub trait Renderer: Send + Sync {
    ///
    /// Render `view` with `data`
    ///
    /// # Errors
    /// If the view does not exist or fails to render
    ///
    fn render(&self, view: &str, data: &ViewData) -> Result<String, RenderError>;
}

/// Join an error with its sources; tera keeps the useful detail in the chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

const EXTENSIONS: [&str; 3] = ["html", "txt", "tera"];

/// Renders views from `tera` templates.
///
/// Views are addressed by dotted names, so `emails.welcome` is looked up as
/// `emails/welcome.html`, then `.txt`, then `.tera`, then `emails/welcome`.
/// A name that is already a registered template path is used as is.
#[derive(Default)]
pub struct TeraRenderer {
    engine: Tera,
}

impl TeraRenderer {
    ///
    /// Load every template below `dir`
    ///
    /// # Errors
    /// If the directory cannot be read or a template fails to parse
    ///
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, RenderError> {
        let dir = dir.as_ref();
        let pattern = dir.join("**").join("*");

        let engine = Tera::new(&pattern.to_string_lossy()).map_err(|err| {
            RenderError::Failed(format!(
                "Unable to load views from {}: {}",
                dir.display(),
                describe(&err)
            ))
        })?;

        tracing::debug!(
            dir = %dir.display(),
            views = engine.get_template_names().count(),
            "Views loaded"
        );

        Ok(Self { engine })
    }

    ///
    /// Register in-memory views, keyed by template path
    ///
    /// # Errors
    /// If a template fails to parse
    ///
    pub fn from_raw<I, N, C>(views: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let mut engine = Tera::default();
        engine
            .add_raw_templates(views)
            .map_err(|err| RenderError::Failed(describe(&err)))?;

        Ok(Self { engine })
    }

    fn resolve(&self, view: &str) -> Option<String> {
        let base = view.replace('.', "/");
        let mut candidates = std::iter::once(view.to_string())
            .chain(EXTENSIONS.iter().map(|ext| format!("{base}.{ext}")))
            .chain(std::iter::once(base.clone()));

        let known = self.engine.get_template_names().collect::<Vec<_>>();
        candidates.find(|candidate| known.contains(&candidate.as_str()))
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, view: &str, data: &ViewData) -> Result<String, RenderError> {
        let template = self
            .resolve(view)
            .ok_or_else(|| RenderError::NotFound(view.to_string()))?;

        let context = Context::from_serialize(data).map_err(|err| RenderError::Failed(describe(&err)))?;

        self.engine
            .render(&template, &context)
            .map_err(|err| RenderError::Failed(describe(&err)))
    }
}
