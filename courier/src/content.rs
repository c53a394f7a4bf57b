//! What a message says, before it is rendered
//!
//! A [`ContentSpec`] names views (or carries raw text) and is resolved
//! against a [`Renderer`] into [`ResolvedContent`], which is then applied to
//! a [`Message`].

use courier_common::{ContentKind, Message};
use serde_json::Value;

use crate::{
    error::ContentError,
    view::{RenderError, Renderer, ViewData},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSpec {
    /// A single view, rendered as the HTML body
    View(String),

    /// An HTML view and a plain text view
    Pair(String, String),

    /// Any subset of an HTML view, a plain text view and raw text
    Parts {
        html: Option<String>,
        text: Option<String>,
        raw: Option<String>,
    },
}

impl ContentSpec {
    /// Raw text, sent as is with no view
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Parts {
            html: None,
            text: None,
            raw: Some(text.into()),
        }
    }

    /// A plain text view only
    pub fn text(view: impl Into<String>) -> Self {
        Self::Parts {
            html: None,
            text: Some(view.into()),
            raw: None,
        }
    }

    ///
    /// Render the views named by this content
    ///
    /// # Errors
    /// If the content is an empty set of parts, or a view is missing or fails
    /// to render
    ///
    pub fn resolve(
        self,
        renderer: &dyn Renderer,
        data: &ViewData,
    ) -> Result<ResolvedContent, ContentError> {
        let (html, text, raw) = match self {
            Self::View(html) => (Some(html), None, None),
            Self::Pair(html, text) => (Some(html), Some(text), None),
            Self::Parts {
                html: None,
                text: None,
                raw: None,
            } => return Err(ContentError::Empty),
            Self::Parts { html, text, raw } => (html, text, raw),
        };

        let render = |view: Option<String>| {
            view.map(|view| {
                renderer
                    .render(&view, data)
                    .map_err(|err| content_error(view, err))
            })
            .transpose()
        };

        Ok(ResolvedContent {
            html: render(html)?,
            text: render(text)?,
            raw,
        })
    }
}

fn content_error(view: String, err: RenderError) -> ContentError {
    match err {
        RenderError::NotFound(_) => ContentError::ViewNotFound(view),
        RenderError::Failed(reason) => ContentError::Render { view, reason },
    }
}

impl From<&str> for ContentSpec {
    fn from(view: &str) -> Self {
        Self::View(view.to_string())
    }
}

impl From<String> for ContentSpec {
    fn from(view: String) -> Self {
        Self::View(view)
    }
}

impl<A: Into<String>, B: Into<String>> From<(A, B)> for ContentSpec {
    fn from((html, text): (A, B)) -> Self {
        Self::Pair(html.into(), text.into())
    }
}

impl TryFrom<Value> for ContentSpec {
    type Error = ContentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(view) => Ok(Self::View(view)),
            Value::Array(items) => match items.as_slice() {
                [Value::String(html), Value::String(text)] => {
                    Ok(Self::Pair(html.clone(), text.clone()))
                }
                _ => Err(ContentError::InvalidShape(
                    "expected an array of two view names".to_string(),
                )),
            },
            Value::Object(map) => {
                let mut html = None;
                let mut text = None;
                let mut raw = None;

                for (key, value) in map {
                    let Value::String(value) = value else {
                        return Err(ContentError::InvalidShape(format!(
                            "'{key}' must be a string"
                        )));
                    };

                    match key.as_str() {
                        "html" => html = Some(value),
                        "text" => text = Some(value),
                        "raw" => raw = Some(value),
                        _ => {
                            return Err(ContentError::InvalidShape(format!(
                                "unknown key '{key}'"
                            )));
                        }
                    }
                }

                Ok(Self::Parts { html, text, raw })
            }
            other => Err(ContentError::InvalidShape(format!(
                "expected a view name, a pair of view names or an object, found {other}"
            ))),
        }
    }
}

/// Rendered content, ready to be placed into a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedContent {
    pub html: Option<String>,
    pub text: Option<String>,
    pub raw: Option<String>,
}

impl ResolvedContent {
    /// HTML becomes the body; text and then raw are added as `text/plain` parts
    pub fn apply(self, message: &mut Message) {
        if let Some(html) = self.html {
            message.set_body(html, ContentKind::Html);
        }

        if let Some(text) = self.text {
            message.add_part(text, ContentKind::Plain);
        }

        if let Some(raw) = self.raw {
            message.add_part(raw, ContentKind::Plain);
        }
    }
}
