//! Two-tier view coherence.
//!
//! Complete views must agree exactly: gluing from any one of them and
//! re-rendering another reproduces that other's rendering. Lossy views are
//! only required not to contradict the canonical view: either it entails
//! them, or they assert nothing it lacks and stay semantically close.

use crate::config::CoherenceConfig;
use crate::distance::{SemanticDistance, TokenOverlapDistance, normalized};
use crate::sheaf::{Renderings, Sheaf};
use crate::view::View;
use agentlaw_kernel::witness::{compute_witness_id, failure_class};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Stand-in view name for "every view of the sheaf".
pub const ALL_VIEWS: &str = "*";

/// One contradiction between views, or between views and the sheaf's glue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub witness_id: String,
    pub class: String,
    /// The views involved: `[source, target]`. For glue conflicts the
    /// source is the view glued from, or `*` when all views were glued.
    pub views: [String; 2],
    /// What the target view should have rendered.
    pub expected: Value,
    /// What it rendered instead; `null` when glue produced nothing.
    pub found: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub description: String,
}

impl Conflict {
    fn new(
        sheaf: &str,
        class: &str,
        views: [&str; 2],
        expected: Value,
        found: Value,
        distance: Option<f64>,
        description: String,
    ) -> Self {
        let subject = format!("{} -> {}", views[0], views[1]);
        let context = json!({ "expected": expected, "found": found });
        Self {
            witness_id: compute_witness_id(class, sheaf, Some(&subject), Some(&context)),
            class: class.to_string(),
            views: views.map(str::to_string),
            expected,
            found,
            distance,
            description,
        }
    }

    /// Whether this conflict names `view`.
    pub fn involves(&self, view: &str) -> bool {
        self.views.iter().any(|v| v == view)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} -> {}]: {}", self.class, self.views[0], self.views[1], self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "conflicts", rename_all = "snake_case")]
pub enum CoherenceResult {
    Coherent,
    Conflicts(Vec<Conflict>),
}

impl CoherenceResult {
    pub fn is_coherent(&self) -> bool {
        matches!(self, Self::Coherent)
    }

    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Self::Coherent => &[],
            Self::Conflicts(conflicts) => conflicts,
        }
    }
}

/// Checks sheaf instances under a configured semantic distance.
#[derive(Clone)]
pub struct Checker {
    config: CoherenceConfig,
    distance: Arc<dyn SemanticDistance>,
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("config", &self.config)
            .field("distance", &self.distance.name())
            .finish()
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new(CoherenceConfig::default())
    }
}

impl Checker {
    /// Token-overlap distance.
    pub fn new(config: CoherenceConfig) -> Self {
        Self::with_distance(config, TokenOverlapDistance)
    }

    pub fn with_distance<D>(config: CoherenceConfig, distance: D) -> Self
    where
        D: SemanticDistance + 'static,
    {
        Self {
            config,
            distance: Arc::new(distance),
        }
    }

    pub fn config(&self) -> &CoherenceConfig {
        &self.config
    }

    /// Check that every view of `sheaf` tells a consistent story about
    /// `instance`.
    ///
    /// Conflicts come in a fixed order: glue faithfulness, then ordered
    /// pairs of complete views, then lossy views against the canonical
    /// view, each in view order.
    pub fn check(&self, sheaf: &Sheaf, instance: &Value) -> CoherenceResult {
        let renderings = sheaf.render_all(instance);
        let complete: Vec<&View> = sheaf.complete_views().collect();
        let lossy: Vec<&View> = sheaf.lossy_views().collect();
        let mut conflicts = Vec::new();

        self.check_glue(sheaf, &renderings, &complete, &mut conflicts);
        self.check_complete_pairs(sheaf, &renderings, &complete, &mut conflicts);
        self.check_lossy(sheaf, &renderings, &lossy, &mut conflicts);

        tracing::debug!(
            sheaf = sheaf.name(),
            complete = complete.len(),
            lossy = lossy.len(),
            conflicts = conflicts.len(),
            distance = self.distance.name(),
            "checked sheaf instance"
        );
        if conflicts.is_empty() {
            CoherenceResult::Coherent
        } else {
            for conflict in &conflicts {
                tracing::warn!(sheaf = sheaf.name(), witness = %conflict.witness_id, "{conflict}");
            }
            CoherenceResult::Conflicts(conflicts)
        }
    }

    /// Gluing every rendering must give back an artifact every complete
    /// view renders to what it rendered from the instance.
    fn check_glue(
        &self,
        sheaf: &Sheaf,
        renderings: &Renderings,
        complete: &[&View],
        conflicts: &mut Vec<Conflict>,
    ) {
        let Some(glued) = sheaf.glue(renderings) else {
            conflicts.push(Conflict::new(
                sheaf.name(),
                failure_class::GLUE_UNDEFINED,
                [ALL_VIEWS, sheaf.canonical_view()],
                json!(renderings),
                Value::Null,
                None,
                "glue produced no artifact from the full set of renderings".to_string(),
            ));
            return;
        };
        for view in complete {
            let expected = &renderings[view.name()];
            let found = view.render(&glued);
            if &found != expected {
                conflicts.push(Conflict::new(
                    sheaf.name(),
                    failure_class::GLUE_UNFAITHFUL,
                    [ALL_VIEWS, view.name()],
                    expected.clone(),
                    found,
                    None,
                    format!("glued artifact does not re-render view {}", view.name()),
                ));
            }
        }
    }

    fn check_complete_pairs(
        &self,
        sheaf: &Sheaf,
        renderings: &Renderings,
        complete: &[&View],
        conflicts: &mut Vec<Conflict>,
    ) {
        for source in complete {
            let only: Renderings = [(
                source.name().to_string(),
                renderings[source.name()].clone(),
            )]
            .into_iter()
            .collect();
            let glued = sheaf.glue(&only);
            for target in complete {
                if target.name() == source.name() {
                    continue;
                }
                let expected = renderings[target.name()].clone();
                let Some(artifact) = &glued else {
                    conflicts.push(Conflict::new(
                        sheaf.name(),
                        failure_class::GLUE_UNDEFINED,
                        [source.name(), target.name()],
                        expected,
                        Value::Null,
                        None,
                        format!("glue cannot reconstruct from view {} alone", source.name()),
                    ));
                    continue;
                };
                let found = target.render(artifact);
                if found != expected {
                    conflicts.push(Conflict::new(
                        sheaf.name(),
                        failure_class::COMPLETE_VIEWS_DISAGREE,
                        [source.name(), target.name()],
                        expected,
                        found,
                        None,
                        format!(
                            "view {} does not round-trip through view {}",
                            target.name(),
                            source.name()
                        ),
                    ));
                }
            }
        }
    }

    /// Lossy renderings are held against the canonical view's rendering;
    /// the other complete views were already tied to it by glue.
    fn check_lossy(
        &self,
        sheaf: &Sheaf,
        renderings: &Renderings,
        lossy: &[&View],
        conflicts: &mut Vec<Conflict>,
    ) {
        let canonical = sheaf.canonical_view();
        let truth = &renderings[canonical];
        for summary in lossy {
            let claimed = &renderings[summary.name()];
            if entails(truth, claimed) {
                continue;
            }
            let (truth_text, claimed_text) = (text_of(truth), text_of(claimed));
            let unsupported = self.distance.unsupported(&truth_text, &claimed_text);
            let distance = normalized(self.distance.distance(&truth_text, &claimed_text));
            if unsupported.is_empty() && distance <= self.config.max_lossy_distance {
                continue;
            }
            let description = if unsupported.is_empty() {
                format!(
                    "lossy view {} is not entailed by view {canonical} and is {distance:.3} away (limit {})",
                    summary.name(),
                    self.config.max_lossy_distance
                )
            } else {
                format!(
                    "lossy view {} asserts {} beyond view {canonical}",
                    summary.name(),
                    unsupported.join(", ")
                )
            };
            conflicts.push(Conflict::new(
                sheaf.name(),
                failure_class::LOSSY_VIEW_CONTRADICTION,
                [canonical, summary.name()],
                truth.clone(),
                claimed.clone(),
                Some(distance),
                description,
            ));
        }
    }
}

/// `Checker::default().check(..)`.
pub fn check(sheaf: &Sheaf, instance: &Value) -> CoherenceResult {
    Checker::default().check(sheaf, instance)
}

/// Whether `claimed` says nothing `truth` does not.
///
/// Text is entailed by case-insensitive containment, arrays element-wise,
/// objects field-wise. `null` claims nothing.
pub fn entails(truth: &Value, claimed: &Value) -> bool {
    match (truth, claimed) {
        (_, Value::Null) => true,
        (Value::String(t), Value::String(c)) => t.to_lowercase().contains(&c.to_lowercase()),
        (_, Value::String(c)) => text_of(truth).to_lowercase().contains(&c.to_lowercase()),
        (Value::Array(items), Value::Array(claims)) => claims
            .iter()
            .all(|claim| items.iter().any(|item| entails(item, claim))),
        (_, Value::Array(claims)) => claims.iter().all(|claim| entails(truth, claim)),
        (Value::Object(fields), Value::Object(claims)) => claims.iter().all(|(name, claim)| {
            fields.get(name).is_some_and(|field| entails(field, claim))
        }),
        (_, Value::Object(claims)) => claims.values().all(|claim| entails(truth, claim)),
        (t, c) => t == c,
    }
}

/// Flattened text of a rendering: strings as-is, other leaves printed,
/// joined by spaces.
fn text_of(value: &Value) -> String {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Null => {}
            Value::String(s) => out.push(s.clone()),
            Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Object(fields) => fields.values().for_each(|v| collect(v, out)),
            scalar => out.push(scalar.to_string()),
        }
    }
    let mut out = Vec::new();
    collect(value, &mut out);
    out.join(" ")
}
