//! Data models for Lifedash
//!
//! Records mirror the JSON the dashboard API serves (camelCase keys, ids as
//! numbers or strings). Each record type has a matching draft used for
//! create and update requests: every draft field is optional so the same
//! type doubles as a partial update.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::Domain;

/// Record identifier; the API uses both numeric and string ids
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    /// Parse user input, preferring the numeric form
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>()
            .map(EntityId::Number)
            .unwrap_or_else(|_| EntityId::Text(raw.to_string()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

/// A record type synchronized from one domain
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    const DOMAIN: Domain;

    /// Payload for create and update requests
    type Draft: Draft;

    fn id(&self) -> &EntityId;
}

/// Create/update payload
pub trait Draft: Serialize + Send + Sync {
    /// Required-on-create fields this draft leaves empty
    fn missing_fields(&self) -> Vec<&'static str>;
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// The signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: EntityId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            avatar_url: None,
        }
    }

    /// Name to show in a header: name, then email, then id
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

// ==================== Notes ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_trashed: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_trashed: Option<bool>,
}

impl Entity for Note {
    const DOMAIN: Domain = Domain::Notes;
    type Draft = NoteDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for NoteDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        // A note needs something in it, title or body
        if is_blank(&self.title) && is_blank(&self.content) {
            vec!["title"]
        } else {
            Vec::new()
        }
    }
}

// ==================== Bookmarks ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl BookmarkDraft {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

impl Entity for Bookmark {
    const DOMAIN: Domain = Domain::Bookmarks;
    type Draft = BookmarkDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for BookmarkDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        if is_blank(&self.url) {
            vec!["url"]
        } else {
            Vec::new()
        }
    }
}

// ==================== Passwords ====================

/// A stored credential; the secret arrives already encrypted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Password {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(alias = "service")]
    pub service_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "encryptedPassword", alias = "password")]
    pub encrypted_secret: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Entity for Password {
    const DOMAIN: Domain = Domain::Passwords;
    type Draft = PasswordDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for PasswordDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.service_name) {
            missing.push("serviceName");
        }
        if is_blank(&self.username) {
            missing.push("username");
        }
        if is_blank(&self.encrypted_secret) {
            missing.push("encryptedSecret");
        }
        missing
    }
}

// ==================== Wallet cards ====================

/// A payment card; only the masked number is ever kept in memory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(alias = "cardholderName")]
    pub cardholder: String,
    #[serde(
        default,
        alias = "cardNumber",
        alias = "number",
        deserialize_with = "deserialize_masked_number"
    )]
    pub masked_number: String,
    #[serde(default, alias = "expiryDate")]
    pub expiry: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

impl Entity for Card {
    const DOMAIN: Domain = Domain::Cards;
    type Draft = CardDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for CardDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.cardholder) {
            missing.push("cardholder");
        }
        if is_blank(&self.card_number) {
            missing.push("cardNumber");
        }
        if is_blank(&self.expiry) {
            missing.push("expiry");
        }
        missing
    }
}

/// Mask all but the last four digits: `•••• •••• •••• 4242`
pub fn mask_card_number(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        // Already masked (or just the last four)
        return raw.trim().to_string();
    }
    let last4: String = digits[digits.len() - 4..].iter().collect();
    format!("•••• •••• •••• {}", last4)
}

fn deserialize_masked_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(mask_card_number(&raw))
}

// ==================== Voice memos ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMemo {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(default)]
    pub title: String,
    /// Length in seconds
    #[serde(default, alias = "duration")]
    pub duration_secs: f64,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMemoDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Entity for VoiceMemo {
    const DOMAIN: Domain = Domain::VoiceMemos;
    type Draft = VoiceMemoDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for VoiceMemoDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        if is_blank(&self.audio_url) {
            vec!["audioUrl"]
        } else {
            Vec::new()
        }
    }
}

// ==================== Resumes ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub template: Option<String>,
    /// Section tree as edited in the resume builder
    #[serde(default)]
    pub sections: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<serde_json::Value>,
}

impl Entity for Resume {
    const DOMAIN: Domain = Domain::Resumes;
    type Draft = ResumeDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for ResumeDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        if is_blank(&self.title) {
            vec!["title"]
        } else {
            Vec::new()
        }
    }
}

// ==================== Files and folders ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub folder_id: Option<EntityId>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_trashed: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_trashed: Option<bool>,
}

impl Entity for FileItem {
    const DOMAIN: Domain = Domain::Files;
    type Draft = FileDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for FileDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        if is_blank(&self.name) {
            vec!["name"]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<EntityId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
}

impl Entity for Folder {
    const DOMAIN: Domain = Domain::Folders;
    type Draft = FolderDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for FolderDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        if is_blank(&self.name) {
            vec!["name"]
        } else {
            Vec::new()
        }
    }
}

// ==================== Photos and albums ====================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub album_id: Option<EntityId>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl Entity for Photo {
    const DOMAIN: Domain = Domain::Photos;
    type Draft = PhotoDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for PhotoDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        if is_blank(&self.url) {
            vec!["url"]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: EntityId,
    #[serde(default)]
    pub user_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_photo_id: Option<EntityId>,
    #[serde(default)]
    pub photo_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_photo_id: Option<EntityId>,
}

impl Entity for Album {
    const DOMAIN: Domain = Domain::Albums;
    type Draft = AlbumDraft;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

impl Draft for AlbumDraft {
    fn missing_fields(&self) -> Vec<&'static str> {
        if is_blank(&self.name) {
            vec!["name"]
        } else {
            Vec::new()
        }
    }
}
