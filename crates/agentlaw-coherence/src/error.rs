/// An ill-formed sheaf definition.
///
/// Conflicts found while checking an instance are not errors; they are
/// returned in `CoherenceResult::Conflicts`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SheafError {
    #[error("sheaf {sheaf} has no views")]
    NoViews { sheaf: String },

    #[error("sheaf {sheaf} declares view {view} twice")]
    DuplicateView { sheaf: String, view: String },

    #[error("sheaf {sheaf}: canonical view {view} is not one of its views")]
    UnknownCanonicalView { sheaf: String, view: String },

    #[error("sheaf {sheaf}: canonical view {view} is lossy")]
    LossyCanonicalView { sheaf: String, view: String },
}
