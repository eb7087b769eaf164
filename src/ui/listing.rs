// Fiches - ui/listing.rs
//
// Plain-text projection of the browser: status header, active filters,
// notices, error banner, one line per file and a pagination footer.
// Produces strings only; printing is the caller's business.

use crate::app::browser::{FileBrowser, LoadState};
use crate::core::filter::FilterState;
use crate::core::model::{PageWindow, ResultItem};
use crate::util::constants::RECENT_WINDOW_DAYS;
use std::fmt::Write;

/// Render the full listing for the current browser state.
pub fn render(browser: &FileBrowser) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}",
        status_line(browser.items().len(), browser.window(), browser.total_count())
    );
    let _ = writeln!(out, "Filters: {}", filter_summary(browser.filters()));

    if browser.restored_notice() {
        let _ = writeln!(out, "(filters restored from your last session)");
    }
    if browser.is_loading_more() {
        let _ = writeln!(out, "(loading more...)");
    } else if browser.is_pending() || browser.is_searching() {
        let _ = writeln!(out, "(updating...)");
    }
    if let LoadState::Failed(error) = browser.recent_window() {
        let _ = writeln!(out, "(recent files unavailable: {error})");
    }
    if let Some(error) = browser.error() {
        let _ = writeln!(out, "! Could not load files: {error}. Retry to try again.");
    }

    let _ = writeln!(out);
    if browser.items().is_empty() {
        let _ = writeln!(out, "  No files match these filters.");
    } else {
        for item in browser.items() {
            let _ = writeln!(out, "  {}", item_line(item));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", footer_line(browser.window(), browser.is_showing_recent()));
    out
}

/// One file: date, domain/level, name, tags, downloads.
pub fn item_line(item: &ResultItem) -> String {
    let mut line = format!("{}  ", item.created_at.format("%Y-%m-%d %H:%M"));

    match (item.domain.as_deref(), item.level.as_deref()) {
        (Some(domain), Some(level)) => line.push_str(&format!("[{domain}/{level}] ")),
        (Some(domain), None) => line.push_str(&format!("[{domain}] ")),
        (None, Some(level)) => line.push_str(&format!("[{level}] ")),
        (None, None) => {}
    }

    line.push_str(item.display_name());

    if !item.tags.is_empty() {
        let tags: Vec<String> = item.tags.iter().map(|t| format!("#{t}")).collect();
        line.push_str("  ");
        line.push_str(&tags.join(" "));
    }

    match item.download_count {
        0 => {}
        1 => line.push_str("  (1 download)"),
        n => line.push_str(&format!("  ({n} downloads)")),
    }
    line
}

/// "N shown of M matching (T in total)".
pub fn status_line(shown: usize, window: PageWindow, total: Option<u64>) -> String {
    let mut line = if window.total_count > shown as u64 {
        format!("{shown} shown of {} matching", window.total_count)
    } else {
        format!("{shown} shown")
    };
    if let Some(total) = total {
        line.push_str(&format!(" ({total} in total)"));
    }
    line
}

/// Compact description of the active filters.
pub fn filter_summary(state: &FilterState) -> String {
    if state.is_default() {
        return format!("none (period {})", state.time_range);
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(domain) = state.domain {
        parts.push(format!("domain={domain}"));
    }
    if let Some(level) = state.level {
        parts.push(format!("level={level}"));
    }
    parts.push(format!("period={}", state.time_range));
    if !state.tags.is_empty() {
        let tags: Vec<&str> = state.tags.iter().map(String::as_str).collect();
        parts.push(format!("tags={}", tags.join("+")));
    }
    let text = state.search_text.trim();
    if !text.is_empty() {
        parts.push(format!("text=\"{text}\""));
    }
    parts.join(" ")
}

fn footer_line(window: PageWindow, showing_recent: bool) -> String {
    if showing_recent {
        format!("Showing files from the last {RECENT_WINDOW_DAYS} days.")
    } else if window.total_pages == 0 {
        "No pages loaded.".to_string()
    } else if window.has_more {
        format!(
            "Page {} of {}, more available.",
            window.page, window.total_pages
        )
    } else {
        format!("Page {} of {}, end of results.", window.page, window.total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::browser::BrowserOptions;
    use crate::app::memory_backend::MemoryBackend;
    use crate::app::persistence::MemoryPersistence;
    use crate::core::model::{ClassLevel, Domain, TimeRange};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn item() -> ResultItem {
        ResultItem {
            file_id: "f1".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 5, 20, 9, 5, 0).unwrap(),
            title: Some("Tables de 3".to_string()),
            filename: Some("tables3.pdf".to_string()),
            domain: Some("math".to_string()),
            level: Some("CE1".to_string()),
            tags: vec!["multiplication".to_string(), "tables".to_string()],
            download_count: 3,
        }
    }

    #[test]
    fn test_item_line() {
        assert_eq!(
            item_line(&item()),
            "2025-05-20 09:05  [math/CE1] Tables de 3  #multiplication #tables  (3 downloads)"
        );
    }

    #[test]
    fn test_item_line_minimal() {
        let mut bare = item();
        bare.title = None;
        bare.domain = None;
        bare.tags.clear();
        bare.download_count = 1;
        assert_eq!(
            item_line(&bare),
            "2025-05-20 09:05  [CE1] tables3.pdf  (1 download)"
        );
    }

    #[test]
    fn test_filter_summary() {
        assert_eq!(filter_summary(&FilterState::default()), "none (period week)");
        let state = FilterState {
            domain: Some(Domain::Math),
            level: Some(ClassLevel::Ce1),
            time_range: TimeRange::ThreeMonths,
            tags: ["addition", "soustraction"].into_iter().collect(),
            search_text: " révision ".to_string(),
        };
        assert_eq!(
            filter_summary(&state),
            "domain=math level=CE1 period=3months tags=addition+soustraction text=\"révision\""
        );
    }

    #[test]
    fn test_status_line() {
        let window = PageWindow {
            page: 1,
            page_size: 20,
            total_count: 45,
            total_pages: 3,
            has_more: true,
        };
        assert_eq!(status_line(20, window, Some(120)), "20 shown of 45 matching (120 in total)");
        assert_eq!(status_line(0, PageWindow::empty(20), None), "0 shown");
    }

    #[test]
    fn test_footer() {
        let window = PageWindow {
            page: 3,
            page_size: 20,
            total_count: 45,
            total_pages: 3,
            has_more: false,
        };
        assert_eq!(footer_line(window, false), "Page 3 of 3, end of results.");
        assert_eq!(footer_line(window, true), "Showing files from the last 7 days.");
    }

    #[test]
    fn test_render_after_recent_window_failure() {
        let backend = Arc::new(MemoryBackend::with_files(item().created_at, [item()]));
        backend.set_recent_failing(true);
        backend.set_count_failing(true);
        let mut browser = FileBrowser::new(
            backend,
            Box::new(MemoryPersistence::new()),
            BrowserOptions::default(),
        );
        browser.mount(Instant::now());
        assert!(browser.wait_for_fetches(Duration::from_secs(5)));

        let text = render(&browser);
        assert!(text.starts_with("1 shown\n"), "{text}");
        assert!(text.contains("(recent files unavailable: 'by-period' answered with HTTP 503)"));
        assert!(text.contains("[math/CE1] Tables de 3"));
        assert!(text.ends_with("Page 1 of 1, end of results.\n"), "{text}");
    }
}
