//! Session command handlers

use anyhow::{Context, Result};

use lifedash_core::{Credentials, Dashboard};

use crate::output::{Output, OutputFormat};
use crate::prompt::read_line;

/// Sign in; the password is read from stdin when not given
pub async fn login(
    dashboard: &Dashboard,
    email: String,
    password: Option<String>,
    output: &Output,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_line("Password")?,
    };

    let session = dashboard
        .login(&Credentials::new(email, password))
        .await
        .context("Login failed")?;

    let Some(user) = session.user() else {
        anyhow::bail!("Login failed: server did not return a user");
    };
    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "user": user })),
        OutputFormat::Quiet => {}
        OutputFormat::Human => output.success(&format!("Signed in as {}", user.display_name())),
    }
    Ok(())
}

pub async fn logout(dashboard: &Dashboard, output: &Output) -> Result<()> {
    if !dashboard.session().is_authenticated() {
        output.message("Not signed in.");
        return Ok(());
    }
    dashboard.logout().await;
    output.success("Signed out");
    Ok(())
}

pub async fn reset_password(dashboard: &Dashboard, email: String, output: &Output) -> Result<()> {
    dashboard
        .request_password_reset(&email)
        .await
        .context("Password reset failed")?;
    output.success(&format!("Password reset link sent to {}", email));
    Ok(())
}
