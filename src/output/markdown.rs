//! Markdown summary generation
//!
//! This module generates a human-readable markdown digest of the pages held
//! in the page store: title, URL, summary and keywords for each page.

use crate::output::stats::StoreStatistics;
use crate::storage::StoredPage;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown digest of stored pages to a file
///
/// # Arguments
///
/// * `stats` - Store-wide statistics shown in the header
/// * `pages` - The pages to list, in display order
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(io::Error)` - Failed to write summary
pub fn generate_markdown_summary(
    stats: &StoreStatistics,
    pages: &[StoredPage],
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_summary(stats, pages);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats stored pages as markdown
pub fn format_markdown_summary(stats: &StoreStatistics, pages: &[StoredPage]) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Inquiry Page Summary\n\n");
    md.push_str(&format!(
        "_Generated {}_\n\n",
        chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    ));

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Pages**: {}\n", stats.total_pages));
    md.push_str(&format!("- **Keywords**: {}\n\n", stats.total_keywords));

    if !stats.top_keywords.is_empty() {
        md.push_str("## Top Keywords\n\n");
        md.push_str("| Keyword | Pages |\n");
        md.push_str("|---------|-------|\n");
        for entry in &stats.top_keywords {
            md.push_str(&format!(
                "| {} | {} |\n",
                escape_table_cell(&entry.keyword),
                entry.pages
            ));
        }
        md.push('\n');
    }

    md.push_str("## Pages\n\n");
    if pages.is_empty() {
        md.push_str("No pages stored.\n");
        return md;
    }

    for page in pages {
        let title = if page.title.trim().is_empty() {
            page.url.as_str()
        } else {
            page.title.as_str()
        };
        md.push_str(&format!("### {}\n\n", title));
        md.push_str(&format!("- **URL**: <{}>\n", page.url));
        md.push_str(&format!("- **Updated**: {}\n", page.last_updated));
        if !page.keywords.is_empty() {
            md.push_str(&format!("- **Keywords**: {}\n", page.keywords.join(", ")));
        }
        md.push('\n');

        if page.summary.trim().is_empty() {
            md.push_str("_No summary available._\n\n");
        } else {
            md.push_str(page.summary.trim());
            md.push_str("\n\n");
        }
    }

    md
}

fn escape_table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
