//! Preference command handlers

use anyhow::Result;

use lifedash_core::{Dashboard, Theme};

use crate::output::{Output, OutputFormat};

pub fn show(dashboard: &Dashboard, output: &Output) -> Result<()> {
    let prefs = dashboard.preferences();
    match output.format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "theme": prefs.theme,
                "sidebar_collapsed": prefs.sidebar_collapsed
            })
        ),
        OutputFormat::Quiet => println!("{}", prefs.theme),
        OutputFormat::Human => {
            println!("Preferences:");
            println!("  theme:             {}", prefs.theme);
            println!("  sidebar_collapsed: {}", prefs.sidebar_collapsed);
        }
    }
    Ok(())
}

pub async fn set_theme(dashboard: &Dashboard, theme: Theme, output: &Output) -> Result<()> {
    dashboard.set_theme(theme).await;
    output.success(&format!("Theme set to {}", theme));
    Ok(())
}

pub async fn set_sidebar(dashboard: &Dashboard, collapsed: bool, output: &Output) -> Result<()> {
    dashboard.set_sidebar_collapsed(collapsed).await;
    let state = if collapsed { "collapsed" } else { "expanded" };
    output.success(&format!("Sidebar {}", state));
    Ok(())
}
