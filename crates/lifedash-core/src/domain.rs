//! Data domains and their server-side conventions
//!
//! Each domain names one REST resource, the closed set of list envelopes
//! that resource is known to return, and how the client reconciles its
//! collection after a mutation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One synchronized collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Notes,
    Bookmarks,
    Passwords,
    Cards,
    VoiceMemos,
    Resumes,
    Files,
    Folders,
    Photos,
    Albums,
}

/// How a collection is brought back into agreement after create/update/delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Apply the server's answer to the local collection
    LocalPatch,
    /// Re-issue the list fetch with the last filters
    Refetch,
}

/// Response wrappers a domain's endpoints may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeSpec {
    /// List endpoint may answer with a bare JSON array
    pub bare_list: bool,
    /// Object keys that may wrap a list
    pub list_keys: &'static [&'static str],
    /// Object keys that may wrap a single record
    pub record_keys: &'static [&'static str],
}

const ITEMS_ONLY: EnvelopeSpec = EnvelopeSpec {
    bare_list: true,
    list_keys: &["items"],
    record_keys: &["item"],
};

impl Domain {
    pub const ALL: [Domain; 10] = [
        Domain::Notes,
        Domain::Bookmarks,
        Domain::Passwords,
        Domain::Cards,
        Domain::VoiceMemos,
        Domain::Resumes,
        Domain::Files,
        Domain::Folders,
        Domain::Photos,
        Domain::Albums,
    ];

    /// REST collection path
    pub fn path(&self) -> &'static str {
        match self {
            Domain::Notes => "/notes",
            Domain::Bookmarks => "/bookmarks",
            Domain::Passwords => "/passwords",
            Domain::Cards => "/wallet/cards",
            Domain::VoiceMemos => "/voice-memos",
            Domain::Resumes => "/resume",
            Domain::Files => "/files",
            Domain::Folders => "/folders",
            Domain::Photos => "/photos",
            Domain::Albums => "/albums",
        }
    }

    /// Path of one record in the collection
    pub fn record_path(&self, id: impl fmt::Display) -> String {
        format!("{}/{}", self.path(), id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Domain::Notes => "notes",
            Domain::Bookmarks => "bookmarks",
            Domain::Passwords => "passwords",
            Domain::Cards => "cards",
            Domain::VoiceMemos => "voice_memos",
            Domain::Resumes => "resumes",
            Domain::Files => "files",
            Domain::Folders => "folders",
            Domain::Photos => "photos",
            Domain::Albums => "albums",
        }
    }

    pub fn envelope(&self) -> EnvelopeSpec {
        match self {
            Domain::Cards => EnvelopeSpec {
                bare_list: true,
                list_keys: &["cards", "items"],
                record_keys: &["card", "item"],
            },
            Domain::VoiceMemos => EnvelopeSpec {
                bare_list: true,
                list_keys: &["memos", "items"],
                record_keys: &["memo", "item"],
            },
            _ => ITEMS_ONLY,
        }
    }

    /// Domains whose records carry server-derived fields (thumbnails,
    /// sizes, counts, rendered sections) refetch; the rest patch locally.
    pub fn mutation_policy(&self) -> MutationPolicy {
        match self {
            Domain::Notes
            | Domain::Bookmarks
            | Domain::Passwords
            | Domain::Cards
            | Domain::VoiceMemos => MutationPolicy::LocalPatch,
            Domain::Resumes | Domain::Files | Domain::Folders | Domain::Photos | Domain::Albums => {
                MutationPolicy::Refetch
            }
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "notes" | "note" => Ok(Domain::Notes),
            "bookmarks" | "bookmark" => Ok(Domain::Bookmarks),
            "passwords" | "password" => Ok(Domain::Passwords),
            "cards" | "card" | "wallet" => Ok(Domain::Cards),
            "voice_memos" | "voice_memo" | "memos" => Ok(Domain::VoiceMemos),
            "resumes" | "resume" => Ok(Domain::Resumes),
            "files" | "file" => Ok(Domain::Files),
            "folders" | "folder" => Ok(Domain::Folders),
            "photos" | "photo" => Ok(Domain::Photos),
            "albums" | "album" => Ok(Domain::Albums),
            other => Err(format!("unknown domain '{}'", other)),
        }
    }
}
