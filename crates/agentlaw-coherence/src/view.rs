use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Renders a canonical artifact into a projection.
pub type RenderFn = dyn Fn(&Value) -> Value + Send + Sync;

/// A named projection of a canonical artifact.
///
/// A complete view keeps enough to reconstruct the artifact; a lossy view
/// (a summary, an excerpt) does not and is only required not to contradict
/// the complete ones.
#[derive(Clone)]
pub struct View {
    name: String,
    lossy: bool,
    render: Arc<RenderFn>,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("lossy", &self.lossy)
            .finish_non_exhaustive()
    }
}

impl View {
    pub fn complete<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        make_view(name, render, false)
    }

    pub fn lossy<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        make_view(name, render, true)
    }

    /// The canonical artifact itself.
    pub fn identity(name: impl Into<String>) -> Self {
        Self::complete(name, Value::clone)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    pub fn render(&self, canonical: &Value) -> Value {
        (self.render)(canonical)
    }
}

/// Construct a view.
pub fn make_view<F>(name: impl Into<String>, render: F, lossy: bool) -> View
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    View {
        name: name.into(),
        lossy,
        render: Arc::new(render),
    }
}
