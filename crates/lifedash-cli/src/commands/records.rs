//! Collection command handlers

use anyhow::{Context, Result};

use lifedash_core::store::Stored;
use lifedash_core::{
    Album, Bookmark, BookmarkDraft, Card, Dashboard, Domain, EntityId, FileItem, Folder,
    ListFilters, Note, NoteDraft, Password, Photo, Resume, VoiceMemo,
};

use crate::output::{Output, Row};
use crate::prompt::confirm;

/// Run a generic helper with the record type matching `$domain`
macro_rules! with_domain_type {
    ($domain:expr, $helper:ident($($arg:expr),*)) => {
        match $domain {
            Domain::Notes => $helper::<Note>($($arg),*).await,
            Domain::Bookmarks => $helper::<Bookmark>($($arg),*).await,
            Domain::Passwords => $helper::<Password>($($arg),*).await,
            Domain::Cards => $helper::<Card>($($arg),*).await,
            Domain::VoiceMemos => $helper::<VoiceMemo>($($arg),*).await,
            Domain::Resumes => $helper::<Resume>($($arg),*).await,
            Domain::Files => $helper::<FileItem>($($arg),*).await,
            Domain::Folders => $helper::<Folder>($($arg),*).await,
            Domain::Photos => $helper::<Photo>($($arg),*).await,
            Domain::Albums => $helper::<Album>($($arg),*).await,
        }
    };
}

/// Fetch and print one domain's collection
pub async fn list(
    dashboard: &Dashboard,
    domain: Domain,
    filters: ListFilters,
    output: &Output,
) -> Result<()> {
    with_domain_type!(domain, list_records(dashboard, filters, output))
}

async fn list_records<T: Stored + Row>(
    dashboard: &Dashboard,
    filters: ListFilters,
    output: &Output,
) -> Result<()> {
    let records = dashboard
        .actions::<T>()
        .fetch(filters)
        .await
        .with_context(|| format!("Failed to fetch {}", T::DOMAIN))?;
    output.print_records(&records);
    Ok(())
}

/// Delete a record, confirming first in interactive mode
pub async fn delete(
    dashboard: &Dashboard,
    domain: Domain,
    id: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let id = EntityId::parse(&id);

    if output.should_prompt() && !yes {
        println!("Delete {} {}", domain, id);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted: Result<()> = with_domain_type!(domain, delete_record(dashboard, &id));
    deleted?;
    output.success(&format!("Deleted {} {}", domain, id));
    Ok(())
}

async fn delete_record<T: Stored>(dashboard: &Dashboard, id: &EntityId) -> Result<()> {
    dashboard
        .actions::<T>()
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete {} {}", T::DOMAIN, id))
}

/// Create a bookmark
pub async fn add_bookmark(
    dashboard: &Dashboard,
    url: String,
    title: Option<String>,
    tags: Vec<String>,
    output: &Output,
) -> Result<()> {
    let draft = BookmarkDraft {
        title,
        tags: (!tags.is_empty()).then_some(tags),
        ..BookmarkDraft::new(url)
    };

    let bookmark = dashboard
        .bookmarks()
        .create(&draft)
        .await
        .context("Failed to create bookmark")?;

    output.success(&format!("Created bookmark: {}", bookmark.id));
    output.print_record(&bookmark);
    Ok(())
}

/// Create a note
pub async fn add_note(
    dashboard: &Dashboard,
    title: String,
    body: Option<String>,
    tags: Vec<String>,
    pinned: bool,
    output: &Output,
) -> Result<()> {
    let draft = NoteDraft {
        title: Some(title),
        content: body,
        tags: (!tags.is_empty()).then_some(tags),
        is_pinned: pinned.then_some(true),
        ..NoteDraft::default()
    };

    let note = dashboard
        .notes()
        .create(&draft)
        .await
        .context("Failed to create note")?;

    output.success(&format!("Created note: {}", note.id));
    output.print_record(&note);
    Ok(())
}
