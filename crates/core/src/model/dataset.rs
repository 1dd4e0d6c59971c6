use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SodaError;

/// Server-side publication stage of a view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStage {
    #[default]
    Unpublished,
    Published,
    /// A formerly published version, superseded by a newer publication.
    Snapshotted,
}

/// Where a dataset sits in the publication lifecycle.
///
/// ```text
/// Unpublished --publish--> Published --create_working_copy--> WorkingCopy
/// WorkingCopy --publish--> Published (previous Published becomes Superseded)
/// ```
///
/// The service owns every transition; this is a read-only view of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Unpublished,
    Published,
    WorkingCopy,
    Superseded,
}

/// A dataset (view) on the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Server-assigned identifier (e.g. "abcd-1234"). Absent until created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub publication_stage: PublicationStage,
    /// Set on working copies: the published dataset this draft will replace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_view_uid: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub publication_date: Option<DateTime<Utc>>,
}

impl Dataset {
    /// A dataset description ready to be created.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// The server-assigned id, or an error for datasets that were never created.
    pub fn require_id(&self) -> Result<&str, SodaError> {
        self.id.as_deref().ok_or_else(|| {
            SodaError::InvalidArgument(format!("dataset '{}' has no id", self.name))
        })
    }

    pub fn state(&self) -> PublicationState {
        match self.publication_stage {
            PublicationStage::Published => PublicationState::Published,
            PublicationStage::Snapshotted => PublicationState::Superseded,
            PublicationStage::Unpublished if self.published_view_uid.is_some() => {
                PublicationState::WorkingCopy
            }
            PublicationStage::Unpublished => PublicationState::Unpublished,
        }
    }

    pub fn is_published(&self) -> bool {
        self.publication_stage == PublicationStage::Published
    }
}
