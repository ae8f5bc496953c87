//! Intent domain model.
//!
//! An intent is the classified form of a user request, produced by an
//! external classifier. The planner only checks it for presence of the
//! fields it needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of request the classifier recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    TaskRequest,
    Question,
    Command,
    /// Anything else (conversation, unclassified input)
    #[serde(other)]
    Other,
}

/// Classifier's estimate of request complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[default]
    Simple,
    Moderate,
    Complex,
    Expert,
}

impl Complexity {
    /// Complex and expert requests get the broader plan shape.
    pub fn is_demanding(&self) -> bool {
        matches!(self, Self::Complex | Self::Expert)
    }
}

/// Risk classification shared by intents and task contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entities extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IntentEntities {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub concepts: Vec<String>,
}

/// A classified user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    pub action: String,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub multi_step: bool,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub entities: IntentEntities,
}

impl Intent {
    pub fn new(kind: IntentKind, action: impl Into<String>) -> Self {
        Self {
            kind,
            action: action.into(),
            complexity: Complexity::default(),
            multi_step: false,
            risk_level: RiskLevel::default(),
            entities: IntentEntities::default(),
        }
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_multi_step(mut self, multi_step: bool) -> Self {
        self.multi_step = multi_step;
        self
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the action asks for something to be built.
    pub fn implies_construction(&self) -> bool {
        let action = self.action.to_lowercase();
        action
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| matches!(word, "create" | "implement" | "add"))
    }
}
