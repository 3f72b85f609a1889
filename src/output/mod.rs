//! Output formatting for CLI results

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::error::Result;

pub mod formatters;
pub mod json;
pub mod table;

/// Trait for types that can be formatted for output
pub trait Formattable {
    /// Format the data according to the specified format
    fn format(&self, format: OutputFormat) -> Result<String>;

    /// Format and print to stdout
    fn print(&self, format: OutputFormat) -> Result<()> {
        println!("{}", self.format(format)?);
        Ok(())
    }
}

impl<T: Tabled + Serialize> Formattable for Vec<T> {
    fn format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(json::format_json(self)?),
            OutputFormat::Table | OutputFormat::Pretty => Ok(table::format_table(self)),
        }
    }
}

/// Spinner shown on stderr while waiting on the API; hidden for JSON output
/// or when stderr is not a terminal.
pub fn spinner(format: OutputFormat, message: &str) -> ProgressBar {
    if matches!(format, OutputFormat::Json) {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled, Serialize)]
    struct Row {
        #[tabled(rename = "EMAIL")]
        email: String,
    }

    #[test]
    fn test_vec_formats_by_output_format() {
        let rows = vec![Row {
            email: "a@b.io".to_string(),
        }];
        let table = rows.format(OutputFormat::Table).unwrap();
        assert!(table.contains("EMAIL"));

        let json = rows.format(OutputFormat::Json).unwrap();
        assert!(json.contains("\"email\": \"a@b.io\""));
    }

    #[test]
    fn test_spinner_hidden_for_json() {
        assert!(spinner(OutputFormat::Json, "working").is_hidden());
    }
}
