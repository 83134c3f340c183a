//! Sheaves of views over one canonical artifact.

use crate::error::SheafError;
use crate::view::View;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Renderings keyed by view name.
pub type Renderings = BTreeMap<String, Value>;

/// Reconstructs a canonical artifact from some of its renderings.
///
/// Must accept any non-empty subset of complete views and return `None`
/// only when those renderings genuinely cannot determine an artifact.
pub type GlueFn = dyn Fn(&Renderings) -> Option<Value> + Send + Sync;

/// A set of views over one artifact plus a way to glue them back.
#[derive(Clone)]
pub struct Sheaf {
    name: String,
    views: Vec<View>,
    canonical: String,
    glue: Arc<GlueFn>,
}

impl fmt::Debug for Sheaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheaf")
            .field("name", &self.name)
            .field("views", &self.views)
            .field("canonical", &self.canonical)
            .finish_non_exhaustive()
    }
}

impl Sheaf {
    /// Views keep their given order, which fixes the order of conflicts.
    pub fn new<F>(
        name: impl Into<String>,
        views: Vec<View>,
        canonical: impl Into<String>,
        glue: F,
    ) -> Result<Self, SheafError>
    where
        F: Fn(&Renderings) -> Option<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let canonical = canonical.into();
        if views.is_empty() {
            return Err(SheafError::NoViews { sheaf: name });
        }
        for (i, view) in views.iter().enumerate() {
            if views[..i].iter().any(|v| v.name() == view.name()) {
                return Err(SheafError::DuplicateView {
                    sheaf: name,
                    view: view.name().to_string(),
                });
            }
        }
        match views.iter().find(|v| v.name() == canonical) {
            None => {
                return Err(SheafError::UnknownCanonicalView {
                    sheaf: name,
                    view: canonical,
                });
            }
            Some(view) if view.is_lossy() => {
                return Err(SheafError::LossyCanonicalView {
                    sheaf: name,
                    view: canonical,
                });
            }
            Some(_) => {}
        }
        Ok(Self {
            name,
            views,
            canonical,
            glue: Arc::new(glue),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name() == name)
    }

    pub fn canonical_view(&self) -> &str {
        &self.canonical
    }

    pub fn complete_views(&self) -> impl Iterator<Item = &View> {
        self.views.iter().filter(|v| !v.is_lossy())
    }

    pub fn lossy_views(&self) -> impl Iterator<Item = &View> {
        self.views.iter().filter(|v| v.is_lossy())
    }

    /// Render `instance` through every view.
    pub fn render_all(&self, instance: &Value) -> Renderings {
        self.views
            .iter()
            .map(|v| (v.name().to_string(), v.render(instance)))
            .collect()
    }

    pub fn glue(&self, renderings: &Renderings) -> Option<Value> {
        (self.glue)(renderings)
    }
}

/// Construct a sheaf.
pub fn make_sheaf<F>(
    name: impl Into<String>,
    views: Vec<View>,
    canonical: impl Into<String>,
    glue: F,
) -> Result<Sheaf, SheafError>
where
    F: Fn(&Renderings) -> Option<Value> + Send + Sync + 'static,
{
    Sheaf::new(name, views, canonical, glue)
}
