use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::JobError;

/// Ordered list of backend model ids for one logical model choice.
///
/// The order is the trial order for fallback; the first success wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ProviderCandidateList {
    ids: Vec<String>,
}

impl ProviderCandidateList {
    /// Build a list from model ids. Blank ids and repeats are dropped;
    /// an empty result is rejected.
    pub fn new<I, S>(ids: I) -> Result<Self, JobError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into().trim().to_string();
            if !id.is_empty() && !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Err(JobError::InvalidRequest(
                "Candidate list must contain at least one model id".into(),
            ));
        }
        Ok(Self { ids: unique })
    }

    /// A single-candidate list.
    pub fn single(id: impl Into<String>) -> Result<Self, JobError> {
        Self::new([id.into()])
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn primary(&self) -> &str {
        &self.ids[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for ProviderCandidateList {
    type Error = JobError;

    fn try_from(ids: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(ids)
    }
}

impl From<ProviderCandidateList> for Vec<String> {
    fn from(list: ProviderCandidateList) -> Self {
        list.ids
    }
}

impl<'a> IntoIterator for &'a ProviderCandidateList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// The user-facing model choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTier {
    #[serde(rename = "veo-3-preview")]
    Veo3Preview,
    #[serde(rename = "veo-3-fast")]
    Veo3Fast,
    #[serde(rename = "veo-3-quality")]
    Veo3Quality,
    #[serde(rename = "veo-2")]
    Veo2,
}

impl ModelTier {
    pub const ALL: [ModelTier; 4] = [
        ModelTier::Veo3Preview,
        ModelTier::Veo3Fast,
        ModelTier::Veo3Quality,
        ModelTier::Veo2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Veo3Preview => "veo-3-preview",
            ModelTier::Veo3Fast => "veo-3-fast",
            ModelTier::Veo3Quality => "veo-3-quality",
            ModelTier::Veo2 => "veo-2",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelTier::Veo3Preview => "Veo 3 Preview",
            ModelTier::Veo3Fast => "Veo 3 Fast",
            ModelTier::Veo3Quality => "Veo 3 Quality",
            ModelTier::Veo2 => "Veo 2",
        }
    }

    /// Backend model ids in fallback order.
    pub fn model_ids(&self) -> &'static [&'static str] {
        match self {
            ModelTier::Veo3Preview => &["veo-3.0-generate-preview"],
            ModelTier::Veo3Fast => &["veo-3.0-fast-generate-001", "veo-3.0-fast-generate-preview"],
            ModelTier::Veo3Quality => &["veo-3.0-generate-001"],
            ModelTier::Veo2 => &[
                "veo-2.0-generate-001",
                "veo-2.0-generate-exp",
                "veo-2.0-generate-preview",
            ],
        }
    }

    pub fn candidates(&self) -> ProviderCandidateList {
        ProviderCandidateList {
            ids: self.model_ids().iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FromStr for ModelTier {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ModelTier::ALL
            .into_iter()
            .find(|t| t.as_str() == needle || t.label().to_ascii_lowercase() == needle)
            .ok_or_else(|| JobError::InvalidRequest(format!("Unknown model tier: {}", s)))
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_list_dedupes_and_trims() {
        let list = ProviderCandidateList::new(["a", " b ", "a", "", "c"]).unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(list.primary(), "a");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        assert!(ProviderCandidateList::new(Vec::<String>::new()).is_err());
        assert!(ProviderCandidateList::new(["  "]).is_err());
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("veo-2".parse::<ModelTier>().unwrap(), ModelTier::Veo2);
        assert_eq!("Veo 3 Quality".parse::<ModelTier>().unwrap(), ModelTier::Veo3Quality);
        assert!("veo-9".parse::<ModelTier>().is_err());
    }

    #[test]
    fn test_tier_candidates() {
        assert_eq!(ModelTier::Veo3Quality.candidates().len(), 1);
        let veo2 = ModelTier::Veo2.candidates();
        assert_eq!(veo2.len(), 3);
        assert_eq!(veo2.primary(), "veo-2.0-generate-001");
        for tier in ModelTier::ALL {
            assert!(!tier.candidates().is_empty(), "{}", tier);
        }
    }

    #[test]
    fn test_candidate_list_serde_validates() {
        let list: ProviderCandidateList = serde_json::from_str(r#"["x", "y"]"#).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["x","y"]"#);
        assert!(serde_json::from_str::<ProviderCandidateList>("[]").is_err());
    }

    #[test]
    fn test_tier_serde() {
        assert_eq!(serde_json::to_string(&ModelTier::Veo3Fast).unwrap(), "\"veo-3-fast\"");
    }
}
