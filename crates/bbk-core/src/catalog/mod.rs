//! Bintray catalog client.
//!
//! Three read calls walk the catalog (repositories, paginated packages, files
//! of a package) and one call streams file content to disk. Every call is a
//! blocking curl request; the scheduler runs them on the network pool.
//!
//! [API Documentation](https://bintray.com/docs/api/)

mod auth;
mod error;
mod http;
mod model;
mod parse;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use url::Url;

use crate::config::{BackupConfig, TimeoutConfig};

pub use auth::{Credentials, CredentialsFormatError};
pub use error::CatalogError;
pub use model::{Package, RemoteFile, Repository};
pub use parse::RangeLimit;

use auth::AuthenticatedHosts;
use http::Get;

/// One page of the package listing.
#[derive(Debug, Clone)]
pub struct PackagePage {
    pub packages: Vec<Package>,
    pub range: RangeLimit,
}

#[derive(Debug, Clone)]
pub struct CatalogClient {
    api: Url,
    downloads: Url,
    credentials: Option<Credentials>,
    authenticated_hosts: AuthenticatedHosts,
    timeouts: TimeoutConfig,
}

impl CatalogClient {
    pub fn new(
        api: Url,
        downloads: Url,
        credentials: Option<Credentials>,
        timeouts: TimeoutConfig,
    ) -> Self {
        let authenticated_hosts = AuthenticatedHosts::from_endpoints(&[&api, &downloads]);
        Self {
            api,
            downloads,
            credentials,
            authenticated_hosts,
            timeouts,
        }
    }

    pub fn from_config(
        cfg: &BackupConfig,
        credentials: Option<Credentials>,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(
            cfg.api_url()?,
            cfg.downloads_url()?,
            credentials,
            cfg.timeouts,
        ))
    }

    /// [Get repositories](https://bintray.com/docs/api/#_get_repositories)
    pub fn list_repositories(&self, subject: &str) -> Result<Vec<Repository>, CatalogError> {
        let url = endpoint_url(&self.api, &["repos", subject], None)?;
        let description = format!("Get repos for '{}'", subject);
        self.get_json(&url, &description).map(|(_, repos)| repos)
    }

    /// Fetches a single page of packages starting at `start_position`.
    pub fn list_packages_page(
        &self,
        subject: &str,
        repo: &Repository,
        start_position: u64,
    ) -> Result<PackagePage, CatalogError> {
        let start = start_position.to_string();
        let url = endpoint_url(
            &self.api,
            &["repos", subject, &repo.name, "packages"],
            Some(("start_pos", &start)),
        )?;
        let description = format!(
            "Get packages for '{}/{}' (start_pos {})",
            subject, repo.name, start_position
        );
        let (head, packages) = self.get_json(&url, &description)?;
        Ok(PackagePage {
            packages,
            range: parse::parse_range_limit(&head.headers),
        })
    }

    /// [Get packages](https://bintray.com/docs/api/#_get_packages)
    ///
    /// Follows `X-RangeLimit-*` pages until `total == end`, returning packages in
    /// page order with duplicates (by name) across overlapping pages removed.
    pub fn list_packages(
        &self,
        subject: &str,
        repo: &Repository,
        start_position: u64,
    ) -> Result<Vec<Package>, CatalogError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut packages = Vec::new();
        let mut start = start_position;
        loop {
            let page = self.list_packages_page(subject, repo, start)?;
            for pkg in page.packages {
                if seen.insert(pkg.name.clone()) {
                    packages.push(pkg);
                }
            }
            if page.range.is_last_page() {
                break;
            }
            if page.range.end <= start {
                return Err(CatalogError::Pagination {
                    request: format!("Get packages for '{}/{}'", subject, repo.name),
                    start,
                    end: page.range.end,
                    total: page.range.total,
                });
            }
            tracing::debug!(
                repo = %repo.name,
                end = page.range.end,
                total = page.range.total,
                "requesting next package page"
            );
            start = page.range.end;
        }
        Ok(packages)
    }

    /// [Get package files](https://bintray.com/docs/api/#_get_package_files)
    pub fn list_files(
        &self,
        subject: &str,
        repo: &Repository,
        pkg: &Package,
    ) -> Result<Vec<RemoteFile>, CatalogError> {
        let url = endpoint_url(
            &self.api,
            &["packages", subject, &repo.name, &pkg.name, "files"],
            Some(("include_unpublished", "1")),
        )?;
        let description = format!(
            "Get package files for '{}/{}/{}'",
            subject, repo.name, pkg.name
        );
        self.get_json(&url, &description).map(|(_, files)| files)
    }

    /// [Download content](https://bintray.com/docs/api/#_download_content)
    ///
    /// Streams the body to `destination`, truncating whatever was there.
    /// Returns the number of bytes written.
    pub fn download(
        &self,
        subject: &str,
        repo: &Repository,
        file: &RemoteFile,
        destination: &Path,
        buffer_size: usize,
    ) -> Result<u64, CatalogError> {
        let mut segments = vec![subject, repo.name.as_str()];
        segments.extend(file.path.split('/').filter(|s| !s.is_empty()));
        let url = endpoint_url(&self.downloads, &segments, None)?;
        let description = format!("Download file '{}/{}/{}'", subject, repo.name, file.path);

        let write_err = |source| CatalogError::Write {
            request: description.clone(),
            source,
        };
        let out = File::create(destination).map_err(write_err)?;
        let mut writer = BufWriter::with_capacity(buffer_size.max(1), out);
        let mut written = 0u64;

        let authorization = self.authorization_for(&url);
        let get = Get {
            url: &url,
            description: &description,
            authorization: authorization.as_deref(),
            timeouts: &self.timeouts,
            buffer_size: Some(buffer_size),
        };
        get.perform(|chunk| {
            writer.write_all(chunk)?;
            written += chunk.len() as u64;
            Ok(())
        })?;

        let out = writer.into_inner().map_err(|e| write_err(e.into_error()))?;
        out.sync_all().map_err(write_err)?;
        tracing::debug!(path = %destination.display(), bytes = written, "download written");
        Ok(written)
    }

    fn authorization_for(&self, url: &Url) -> Option<String> {
        let credentials = self.credentials.as_ref()?;
        if self.authenticated_hosts.contains(url) {
            Some(credentials.basic_header_value())
        } else {
            None
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        description: &str,
    ) -> Result<(http::ResponseHead, T), CatalogError> {
        let authorization = self.authorization_for(url);
        let get = Get {
            url,
            description,
            authorization: authorization.as_deref(),
            timeouts: &self.timeouts,
            buffer_size: None,
        };
        let (head, body) = get.perform_to_vec()?;
        let parsed = serde_json::from_slice(&body).map_err(|source| CatalogError::Decode {
            request: description.to_string(),
            source,
        })?;
        Ok((head, parsed))
    }
}

/// Appends percent-encoded path segments (and an optional query pair) to `base`.
fn endpoint_url(
    base: &Url,
    segments: &[&str],
    query: Option<(&str, &str)>,
) -> Result<Url, CatalogError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CatalogError::InvalidUrl {
            base: base.to_string(),
            reason: "URL cannot have path segments".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    if let Some((key, value)) = query {
        url.query_pairs_mut().append_pair(key, value);
    }
    Ok(url)
}
