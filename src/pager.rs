//! Numbered page window for list navigation.

/// One slot in the page strip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageLink {
    Page(usize),
    Ellipsis,
}

const SHOW_ALL_UP_TO: usize = 7;
const SPREAD: usize = 2;

/// Page links to show for `current` of `total` (both 1-based).
///
/// Up to seven pages are listed in full. Beyond that the first and last pages
/// are always shown, plus two pages either side of `current`, with ellipses
/// marking the gaps.
pub fn page_window(current: usize, total: usize) -> Vec<PageLink> {
    if total == 0 {
        return Vec::new();
    }
    if total <= SHOW_ALL_UP_TO {
        return (1..=total).map(PageLink::Page).collect();
    }
    let current = current.clamp(1, total);
    let lo = current.saturating_sub(SPREAD).max(2);
    let hi = (current + SPREAD).min(total - 1);

    let mut out = vec![PageLink::Page(1)];
    if current > SPREAD + 2 {
        out.push(PageLink::Ellipsis);
    }
    out.extend((lo..=hi).map(PageLink::Page));
    if current + SPREAD + 1 < total {
        out.push(PageLink::Ellipsis);
    }
    out.push(PageLink::Page(total));
    out
}

pub fn has_prev(current: usize) -> bool {
    current > 1
}

pub fn has_next(current: usize, total: usize) -> bool {
    current < total
}

/// Render the window as `‹ 1 … 4 [5] 6 … 9 ›` for terminal output.
pub fn render(current: usize, total: usize) -> String {
    let mut parts = Vec::new();
    if has_prev(current) {
        parts.push("‹".to_string());
    }
    for link in page_window(current, total) {
        parts.push(match link {
            PageLink::Page(p) if p == current => format!("[{p}]"),
            PageLink::Page(p) => p.to_string(),
            PageLink::Ellipsis => "…".to_string(),
        });
    }
    if has_next(current, total) {
        parts.push("›".to_string());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::PageLink::{Ellipsis as E, Page as P};
    use super::*;

    #[test]
    fn test_small_totals_show_everything() {
        assert_eq!(page_window(1, 3), vec![P(1), P(2), P(3)]);
        assert_eq!(page_window(4, 7).len(), 7);
        assert!(page_window(1, 0).is_empty());
    }

    #[test]
    fn test_window_near_start() {
        assert_eq!(page_window(1, 10), vec![P(1), P(2), P(3), E, P(10)]);
        assert_eq!(page_window(4, 10), vec![P(1), P(2), P(3), P(4), P(5), P(6), E, P(10)]);
    }

    #[test]
    fn test_window_in_middle() {
        assert_eq!(
            page_window(5, 10),
            vec![P(1), E, P(3), P(4), P(5), P(6), P(7), E, P(10)]
        );
    }

    #[test]
    fn test_window_near_end() {
        assert_eq!(page_window(10, 10), vec![P(1), E, P(8), P(9), P(10)]);
        assert_eq!(page_window(7, 10), vec![P(1), E, P(5), P(6), P(7), P(8), P(9), P(10)]);
    }

    #[test]
    fn test_render_marks_current() {
        assert_eq!(render(2, 3), "‹ 1 [2] 3 ›");
        assert_eq!(render(1, 1), "[1]");
    }
}
