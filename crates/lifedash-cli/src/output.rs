//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use lifedash_core::{
    Album, Bookmark, Card, Entity, FileItem, Folder, Note, Password, Photo, Resume, VoiceMemo,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// One-line human rendering of a record
pub trait Row {
    /// Main label (title, name, url)
    fn label(&self) -> String;

    /// Secondary column, if any
    fn detail(&self) -> Option<String> {
        None
    }
}

impl Row for Note {
    fn label(&self) -> String {
        let title = if self.title.is_empty() {
            first_line(&self.content)
        } else {
            self.title.clone()
        };
        if self.is_pinned {
            format!("* {}", title)
        } else {
            title
        }
    }

    fn detail(&self) -> Option<String> {
        (!self.tags.is_empty()).then(|| self.tags.join(", "))
    }
}

impl Row for Bookmark {
    fn label(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.url.clone())
    }

    fn detail(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

impl Row for Password {
    fn label(&self) -> String {
        self.service_name.clone()
    }

    fn detail(&self) -> Option<String> {
        Some(self.username.clone())
    }
}

impl Row for Card {
    fn label(&self) -> String {
        self.masked_number.clone()
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{} {}", self.cardholder, self.expiry))
    }
}

impl Row for VoiceMemo {
    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{:.0}s", self.duration_secs))
    }
}

impl Row for Resume {
    fn label(&self) -> String {
        self.title.clone()
    }

    fn detail(&self) -> Option<String> {
        self.template.clone()
    }
}

impl Row for FileItem {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn detail(&self) -> Option<String> {
        Some(human_size(self.size))
    }
}

impl Row for Folder {
    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Row for Photo {
    fn label(&self) -> String {
        self.caption.clone().unwrap_or_else(|| self.url.clone())
    }
}

impl Row for Album {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn detail(&self) -> Option<String> {
        Some(format!("{} photo(s)", self.photo_count))
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single record
    pub fn print_record<T: Entity + Row>(&self, record: &T) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:     {}", record.id());
                println!("Label:  {}", record.label());
                if let Some(detail) = record.detail() {
                    println!("Detail: {}", detail);
                }
            }
            OutputFormat::Json => print_json(record),
            OutputFormat::Quiet => println!("{}", record.id()),
        }
    }

    /// Print a list of records
    pub fn print_records<T: Entity + Row>(&self, records: &[T]) {
        match self.format {
            OutputFormat::Human => {
                let noun = T::DOMAIN.to_string().replace('_', " ");
                if records.is_empty() {
                    println!("No {} found.", noun);
                    return;
                }
                for record in records {
                    let id = record.id().to_string();
                    match record.detail() {
                        Some(detail) => println!(
                            "{:>6} | {} | {}",
                            truncate(&id, 6),
                            truncate(&record.label(), 40),
                            truncate(&detail, 40)
                        ),
                        None => println!("{:>6} | {}", truncate(&id, 6), truncate(&record.label(), 40)),
                    }
                }
                println!("\n{} {}", records.len(), noun);
            }
            OutputFormat::Json => print_json(records),
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", record.id());
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn first_line(s: &str) -> String {
    s.lines().next().unwrap_or("").to_string()
}

/// Format a byte count as a human-readable size
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("•••• •••• •••• 4242", 7), "••••...");
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_note_label_falls_back_to_content() {
        let note: Note = serde_json::from_value(serde_json::json!({
            "id": 1,
            "content": "first line\nsecond",
            "isPinned": true
        }))
        .unwrap();
        assert_eq!(note.label(), "* first line");
        assert_eq!(note.detail(), None);
    }
}
