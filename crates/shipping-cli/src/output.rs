//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use shipping_core::types::PageResponse;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Print one page of rows, with its position in the full listing
pub fn print_page<T: Serialize + Tabled>(page: &PageResponse<T>, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if page.items.is_empty() {
                println!("No results found.");
            } else {
                println!("{}", Table::new(&page.items));
            }
            println!(
                "Page {} of {} ({} total, {} per page)",
                page.page, page.total_pages, page.total_items, page.page_size
            );
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(page).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{:#?}", item);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{}:", key), value);
}

/// Format a money amount with two decimals
pub fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Convert every item of a page, keeping its paging metadata
pub fn map_page<T, R, F>(page: PageResponse<T>, convert: F) -> PageResponse<R>
where
    T: Serialize,
    R: Serialize,
    F: FnMut(T) -> R,
{
    PageResponse::new(
        page.items.into_iter().map(convert).collect(),
        page.page,
        page.page_size,
        page.total_items,
    )
}
