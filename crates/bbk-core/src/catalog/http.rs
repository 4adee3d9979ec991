//! Blocking GET over a curl `Easy` handle.
//!
//! Runs in the current thread; callers dispatch it onto the network pool.

use std::cell::{Cell, RefCell};
use std::io;
use std::str;

use url::Url;

use crate::config::TimeoutConfig;

use super::error::CatalogError;
use super::parse;

/// Cap on how much of a failed response body is kept for the error message.
const ERROR_BODY_LIMIT: usize = 64 * 1024;

/// Header lines of the final response (after redirects), status line first.
#[derive(Debug, Clone)]
pub(crate) struct ResponseHead {
    pub(crate) headers: Vec<String>,
}

/// One GET request: where to, how to describe it in errors, and what to send.
pub(crate) struct Get<'a> {
    pub(crate) url: &'a Url,
    pub(crate) description: &'a str,
    pub(crate) authorization: Option<&'a str>,
    pub(crate) timeouts: &'a TimeoutConfig,
    pub(crate) buffer_size: Option<usize>,
}

impl Get<'_> {
    /// Performs the request, handing every body chunk of a 2xx response to `on_body`.
    ///
    /// A non-2xx response never reaches `on_body`; its body is captured for the
    /// returned `CatalogError::Http`. An error from `on_body` aborts the transfer.
    pub(crate) fn perform<F>(&self, mut on_body: F) -> Result<ResponseHead, CatalogError>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        let transport = |source: curl::Error| CatalogError::Transport {
            request: self.description.to_string(),
            source,
        };

        let mut easy = curl::easy::Easy::new();
        easy.url(self.url.as_str()).map_err(transport)?;
        easy.get(true).map_err(transport)?;
        easy.follow_location(true).map_err(transport)?;
        easy.max_redirections(10).map_err(transport)?;
        easy.useragent(concat!("bbk/", env!("CARGO_PKG_VERSION")))
            .map_err(transport)?;
        easy.connect_timeout(self.timeouts.connect())
            .map_err(transport)?;
        easy.timeout(self.timeouts.call()).map_err(transport)?;
        // Stalled reads/writes: fail when under 1 byte/s for the whole window.
        easy.low_speed_limit(1).map_err(transport)?;
        easy.low_speed_time(self.timeouts.stall())
            .map_err(transport)?;
        if let Some(sz) = self.buffer_size {
            easy.buffer_size(sz).map_err(transport)?;
        }

        if let Some(value) = self.authorization {
            let mut list = curl::easy::List::new();
            list.append(&format!("Authorization: {}", value))
                .map_err(transport)?;
            easy.http_headers(list).map_err(transport)?;
        }

        let headers: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let status_ok = Cell::new(true);
        let error_body: RefCell<Vec<u8>> = RefCell::new(Vec::new());
        let sink_error: RefCell<Option<io::Error>> = RefCell::new(None);

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        let line = s.trim_end();
                        if parse::is_status_line(line) {
                            // New response (first one or after a redirect).
                            let mut h = headers.borrow_mut();
                            h.clear();
                            error_body.borrow_mut().clear();
                            status_ok.set(status_is_success(line));
                            h.push(line.to_string());
                        } else if !line.is_empty() {
                            headers.borrow_mut().push(line.to_string());
                        }
                    }
                    true
                })
                .map_err(transport)?;
            transfer
                .write_function(|data| {
                    if !status_ok.get() {
                        let mut body = error_body.borrow_mut();
                        let room = ERROR_BODY_LIMIT.saturating_sub(body.len());
                        body.extend_from_slice(&data[..data.len().min(room)]);
                        return Ok(data.len());
                    }
                    match on_body(data) {
                        Ok(()) => Ok(data.len()),
                        Err(e) => {
                            *sink_error.borrow_mut() = Some(e);
                            Ok(0) // abort transfer
                        }
                    }
                })
                .map_err(transport)?;
            transfer.perform()
        };

        if let Some(source) = sink_error.into_inner() {
            return Err(CatalogError::Write {
                request: self.description.to_string(),
                source,
            });
        }
        performed.map_err(transport)?;

        let code = easy.response_code().map_err(transport)?;
        let headers = headers.into_inner();
        let status_line = headers
            .first()
            .filter(|l| parse::is_status_line(l))
            .cloned()
            .unwrap_or_else(|| format!("HTTP {}", code));

        if !(200..300).contains(&code) {
            let body = String::from_utf8_lossy(&error_body.into_inner()).into_owned();
            return Err(CatalogError::Http {
                request: self.description.to_string(),
                status: status_line,
                body,
            });
        }

        tracing::debug!(url = %self.url, status = %status_line, "catalog request ok");
        Ok(ResponseHead { headers })
    }

    /// Performs the request and returns the whole 2xx body.
    pub(crate) fn perform_to_vec(&self) -> Result<(ResponseHead, Vec<u8>), CatalogError> {
        let mut body = Vec::new();
        let head = self.perform(|chunk| {
            body.extend_from_slice(chunk);
            Ok(())
        })?;
        Ok((head, body))
    }
}

/// `HTTP/1.1 204 No Content` → true. Unparseable lines count as failures.
fn status_is_success(line: &str) -> bool {
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u32>().ok())
        .map(|code| (200..300).contains(&code))
        .unwrap_or(false)
}
