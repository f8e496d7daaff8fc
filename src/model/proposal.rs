//! Proposal representation

use super::ids::{BatchGroupId, ProposalId};
use serde::{Deserialize, Serialize};

/// A listed author of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Free-text content of a proposal as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalContent {
    pub title: String,
    pub category: String,
    pub duration: String,
    pub description: String,
    pub audience: String,
    pub level: String,
    pub objectives: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub outline: String,
    pub additional_notes: String,
    pub additional_requirements: String,
}

/// A content field that can feed the similarity clusterer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Category,
    Description,
    Audience,
    Objectives,
    Abstract,
    Outline,
    AdditionalNotes,
}

impl ProposalContent {
    /// Text of a single field
    pub fn field(&self, field: TextField) -> &str {
        match field {
            TextField::Title => &self.title,
            TextField::Category => &self.category,
            TextField::Description => &self.description,
            TextField::Audience => &self.audience,
            TextField::Objectives => &self.objectives,
            TextField::Abstract => &self.abstract_text,
            TextField::Outline => &self.outline,
            TextField::AdditionalNotes => &self.additional_notes,
        }
    }
}

/// A submitted proposal
///
/// Owned by the ingestion side. The engine reads it and, through the store,
/// may only change its batch-group assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub content: ProposalContent,
    #[serde(default)]
    pub withdrawn: bool,
    #[serde(default)]
    pub batchgroup: Option<BatchGroupId>,
    /// Number of distinct voters who scored this proposal
    #[serde(default)]
    pub vote_count: u32,
}

impl Proposal {
    /// Create a proposal with a title and no other content
    pub fn new(id: impl Into<ProposalId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            authors: Vec::new(),
            content: ProposalContent {
                title: title.into(),
                ..Default::default()
            },
            withdrawn: false,
            batchgroup: None,
            vote_count: 0,
        }
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_content(mut self, content: ProposalContent) -> Self {
        self.content = content;
        self
    }

    pub fn withdrawn(mut self) -> Self {
        self.withdrawn = true;
        self
    }

    /// Whether `email` belongs to one of the authors (case-insensitive)
    pub fn is_authored_by(&self, email: &str) -> bool {
        self.authors
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email))
    }

    /// Concatenation of the given fields, separated by newlines
    pub fn document(&self, fields: &[TextField]) -> String {
        fields
            .iter()
            .map(|f| self.content.field(*f))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
