use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A command result that can be printed in every output format.
///
/// JSON comes from the `Serialize` impl; table and pretty output list
/// `fields()` in order.
pub trait Report: Serialize {
    fn fields(&self) -> Vec<(String, String)>;
}

pub fn print_report<R: Report>(report: &R, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in report.fields() {
                table.add_row(vec![name, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields = report.fields();
            let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, value) in fields {
                println!("{:<width$}  {value}", format!("{name}:"), width = width + 1);
            }
        }
    }
}

/// Fixed-width hex, the form words are shown in everywhere.
pub fn hex_word(word: u64) -> String {
    format!("{word:#018x}")
}

pub fn bytes_preview(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_word_is_zero_padded() {
        assert_eq!(hex_word(0x7b), "0x000000000000007b");
        assert_eq!(hex_word(u64::MAX), "0xffffffffffffffff");
    }

    #[test]
    fn preview_marks_binary() {
        assert_eq!(bytes_preview(b"hello"), "hello");
        assert_eq!(bytes_preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }
}
