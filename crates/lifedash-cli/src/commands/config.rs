//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use lifedash_core::{Config, Platform};

use crate::output::{Output, OutputFormat};

fn or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| "(not set)".to_string())
}

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "platform": config.platform,
                    "request_timeout_secs": config.request_timeout_secs,
                    "max_retries": config.max_retries,
                    "retry_base_delay_ms": config.retry_base_delay_ms,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  api_url:              {}", or_unset(config.api_url.clone()));
            println!(
                "  platform:             {}",
                or_unset(config.platform.map(|p| p.to_string()))
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  max_retries:          {}", config.max_retries);
            println!("  retry_base_delay_ms:  {}", config.retry_base_delay_ms);
            println!(
                "  log_file:             {}",
                or_unset(config.log_file.as_ref().map(|p| p.display().to_string()))
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let unset = value.is_empty() || value == "none";

    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "api_url" => {
            config.api_url = if unset { None } else { Some(value.clone()) };
        }
        "platform" => {
            config.platform = if unset {
                None
            } else {
                Some(value.parse::<Platform>().map_err(anyhow::Error::msg)?)
            };
        }
        "request_timeout_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a number of seconds.")?;
            if secs == 0 {
                bail!("request_timeout_secs must be at least 1");
            }
            config.request_timeout_secs = secs;
        }
        "max_retries" => {
            config.max_retries = value
                .parse()
                .context("Invalid value for max_retries. Use a whole number.")?;
        }
        "retry_base_delay_ms" => {
            config.retry_base_delay_ms = value
                .parse()
                .context("Invalid value for retry_base_delay_ms. Use milliseconds.")?;
        }
        "log_file" => {
            config.log_file = if unset { None } else { Some(value.clone().into()) };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, api_url, platform, request_timeout_secs, \
                 max_retries, retry_base_delay_ms, log_file",
                key
            );
        }
    }

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config.toml");
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();
        path
    }

    #[test]
    fn test_set_persists_value() {
        let dir = TempDir::new().unwrap();
        let path = seeded_config(&dir);
        let output = Output::new(OutputFormat::Quiet);

        set(
            "api_url".to_string(),
            "http://localhost:4000".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();
        set("max_retries".to_string(), "0".to_string(), Some(&path), &output).unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.max_retries, 0);

        set("api_url".to_string(), "none".to_string(), Some(&path), &output).unwrap();
        assert!(Config::load_from_path(&path).unwrap().api_url.is_none());
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        let path = seeded_config(&dir);
        let output = Output::new(OutputFormat::Quiet);

        assert!(set("colour".to_string(), "red".to_string(), Some(&path), &output).is_err());
        assert!(set(
            "max_retries".to_string(),
            "many".to_string(),
            Some(&path),
            &output
        )
        .is_err());
        assert!(set(
            "request_timeout_secs".to_string(),
            "0".to_string(),
            Some(&path),
            &output
        )
        .is_err());
        assert!(set(
            "platform".to_string(),
            "toaster".to_string(),
            Some(&path),
            &output
        )
        .is_err());
    }
}
