//! Schemas for the persisted key namespace.
//!
//! Each record type is bound to exactly one storage key. Loading through
//! the typed API validates the stored JSON against the schema.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A value persisted under a fixed key.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
  /// Storage key this record lives under
  const KEY: &'static str;
}

/// Every key managed by the app, in the order pages use them.
pub const PERSISTED_KEYS: &[&str] = &[
  ChatTranscript::KEY,
  HealthRecords::KEY,
  Appointments::KEY,
  Alerts::KEY,
  Resources::KEY,
  SavedResources::KEY,
];

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub id: String,
  pub role: Role,
  pub content: String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatTranscript(pub Vec<ChatMessage>);

impl Record for ChatTranscript {
  const KEY: &'static str = "chatMessages";
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
  pub id: String,
  pub date: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub doctor: String,
  pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthRecords(pub Vec<HealthRecord>);

impl Record for HealthRecords {
  const KEY: &'static str = "healthRecords";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
  Upcoming,
  Completed,
  Canceled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
  pub id: String,
  pub date: String,
  pub time: String,
  pub doctor: String,
  pub location: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Appointments(pub Vec<Appointment>);

impl Record for Appointments {
  const KEY: &'static str = "appointments";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
  Info,
  Warning,
  Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub id: String,
  #[serde(rename = "type")]
  pub level: AlertLevel,
  pub message: String,
  pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alerts(pub Vec<Alert>);

impl Record for Alerts {
  const KEY: &'static str = "alerts";
}

// ============================================================================
// Resources
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
  All,
  Articles,
  Videos,
  Guides,
  Schemes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
  pub id: String,
  pub title: String,
  pub description: String,
  pub category: ResourceCategory,
  pub language: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content: Option<String>,
  #[serde(default)]
  pub is_available_offline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resources(pub Vec<Resource>);

impl Resources {
  pub fn find(&self, id: &str) -> Option<&Resource> {
    self.0.iter().find(|r| r.id == id)
  }
}

impl Record for Resources {
  const KEY: &'static str = "resources";
}

/// Ids of resources the user bookmarked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedResources(pub Vec<String>);

impl SavedResources {
  /// Add `id` if absent, remove it if present. Returns whether it is now saved.
  pub fn toggle(&mut self, id: &str) -> bool {
    if let Some(pos) = self.0.iter().position(|s| s == id) {
      self.0.remove(pos);
      false
    } else {
      self.0.push(id.to_string());
      true
    }
  }
}

impl Record for SavedResources {
  const KEY: &'static str = "savedResources";
}
