//! Lifecycle phase derivation.
//!
//! Rules, in priority order:
//!
//! 1. non-empty publication key or publication date → [`Phase::Published`]
//! 2. explicit negative outcome (`passed == Some(false)`) → [`Phase::Rejected`]
//! 3. last parliamentary stage name contains a presidential keyword →
//!    [`Phase::President`], else a senate keyword → [`Phase::Senate`], else
//!    [`Phase::Sejm`]
//! 4. no parliamentary stages → [`Phase::Government`]
//!
//! Keyword matching is a case-sensitive substring search on the registry's
//! natural-language stage names, so the keyword lists are configuration.

use serde::{Deserialize, Serialize};

use crate::model::{Origin, Phase, Project};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseKeywords {
    pub president: Vec<String>,
    pub senate: Vec<String>,
}

impl Default for PhaseKeywords {
    fn default() -> Self {
        Self {
            president: vec!["Prezydent".to_string()],
            senate: vec!["Senat".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhaseResolver {
    keywords: PhaseKeywords,
}

impl PhaseResolver {
    pub fn new(keywords: PhaseKeywords) -> Self {
        Self { keywords }
    }

    /// Pure function of the project's fields other than its phase.
    pub fn resolve(&self, project: &Project) -> Phase {
        let published = project.publication_key.as_deref().is_some_and(|k| !k.is_empty())
            || project.publication_date().is_some_and(|d| !d.is_empty());
        if published {
            return Phase::Published;
        }
        if project.passed == Some(false) {
            return Phase::Rejected;
        }
        match project.stages_from(Origin::Parliamentary).last() {
            Some(stage) if contains_any(&stage.name, &self.keywords.president) => Phase::President,
            Some(stage) if contains_any(&stage.name, &self.keywords.senate) => Phase::Senate,
            Some(_) => Phase::Sejm,
            None => Phase::Government,
        }
    }
}

fn contains_any(name: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && name.contains(k.as_str()))
}
