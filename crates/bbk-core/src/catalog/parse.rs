//! Parse HTTP response header lines collected by curl.

/// Pagination state reported by `X-RangeLimit-*` headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeLimit {
    pub total: u64,
    pub end: u64,
}

impl RangeLimit {
    /// `total == end` marks the final page (including when both headers are absent).
    pub fn is_last_page(&self) -> bool {
        self.total == self.end
    }
}

/// Extract `X-RangeLimit-Total` / `X-RangeLimit-EndPos`. Absent or unparseable values are 0.
pub(crate) fn parse_range_limit(lines: &[String]) -> RangeLimit {
    let mut limit = RangeLimit::default();
    for line in lines {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim().parse::<u64>().unwrap_or(0);
        if name.eq_ignore_ascii_case("x-rangelimit-total") {
            limit.total = value;
        } else if name.eq_ignore_ascii_case("x-rangelimit-endpos") {
            limit.end = value;
        }
    }
    limit
}

/// Returns true when `line` is an HTTP status line (`HTTP/1.1 200 OK`).
pub(crate) fn is_status_line(line: &str) -> bool {
    line.starts_with("HTTP/")
}
