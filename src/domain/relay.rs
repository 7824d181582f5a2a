//! Requests accepted by the invalidation relay.

use serde::Deserialize;

use super::revalidation::Target;

/// Which kind of cache partition a trigger addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Path,
    Tag,
}

/// Body of `POST /api/cache-test/invalidate`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateCommand {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    pub target: String,
}

impl InvalidateCommand {
    pub fn into_target(self) -> Target {
        match self.kind {
            TargetKind::Path => Target::Path(self.target),
            TargetKind::Tag => Target::Tag(self.target),
        }
    }
}
