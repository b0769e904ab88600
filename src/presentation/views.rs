//! Askama rendering with failures tagged by the page that produced them.

use askama::{Error as AskamaError, Template};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
#[error("failed to render `{page}`")]
pub struct TemplateRenderError {
    page: &'static str,
    #[source]
    error: AskamaError,
}

impl TemplateRenderError {
    /// Template path that failed, e.g. `blogs/index.html`.
    pub fn page(&self) -> &'static str {
        self.page
    }

    pub fn origin(&self) -> &'static str {
        "presentation::views"
    }
}

/// Render `template`, recording which page failed.
pub fn render_page<T: Template>(
    page: &'static str,
    template: &T,
) -> Result<String, TemplateRenderError> {
    template.render().map_err(|err| {
        error!(target = "presentation::views", page, error = %err, "template rendering failed");
        TemplateRenderError { page, error: err }
    })
}
