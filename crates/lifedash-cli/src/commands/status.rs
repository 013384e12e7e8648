//! Status command handler

use anyhow::Result;

use lifedash_core::{Dashboard, FetchStatus};

use crate::output::{Output, OutputFormat};

/// Show session, storage and (optionally) collection status
pub async fn show(dashboard: &Dashboard, refresh: bool, output: &Output) -> Result<()> {
    let session = dashboard.session();

    // Collections start empty in a fresh process; only fetch when asked
    let refreshed = refresh && session.is_authenticated();
    if refreshed {
        dashboard.refresh_all().await;
    }
    let summaries = dashboard.store().summaries();
    let prefs = dashboard.preferences();

    match output.format {
        OutputFormat::Json => {
            let collections = refreshed.then_some(&summaries);
            println!(
                "{}",
                serde_json::json!({
                    "api_url": dashboard.api_url(),
                    "storage": dashboard.storage_backend(),
                    "authenticated": session.is_authenticated(),
                    "user": session.user(),
                    "preferences": prefs,
                    "collections": collections,
                })
            );
        }
        OutputFormat::Quiet => {
            let state = if session.is_authenticated() {
                "authenticated"
            } else {
                "anonymous"
            };
            println!("{}", state);
        }
        OutputFormat::Human => {
            println!("Lifedash Status");
            println!("===============");
            println!();
            println!("Server:");
            println!("  API:     {}", dashboard.api_url());
            println!("  Storage: {}", dashboard.storage_backend());
            println!();
            println!("Session:");
            match session.user() {
                Some(user) => println!("  Signed in as {}", user.display_name()),
                None => println!("  Not signed in"),
            }
            println!();
            println!("Preferences:");
            println!("  Theme:   {}", prefs.theme);
            println!(
                "  Sidebar: {}",
                if prefs.sidebar_collapsed {
                    "collapsed"
                } else {
                    "expanded"
                }
            );
            if refreshed {
                println!();
                println!("Collections:");
                for summary in &summaries {
                    let state = match summary.status {
                        FetchStatus::Error => format!(
                            "error: {}",
                            summary.error.as_deref().unwrap_or("unknown")
                        ),
                        _ => summary.count.to_string(),
                    };
                    println!("  {:<12} {}", summary.domain.to_string(), state);
                }
            }
        }
    }

    Ok(())
}
