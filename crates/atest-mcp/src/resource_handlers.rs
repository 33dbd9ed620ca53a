//! MCP Resource Handlers
//!
//! `embedded:` URIs resolve to compiled-in documents. `file:///<path>` URIs
//! are fetched from the docs host; a failed fetch degrades to a placeholder
//! text instead of an error. Other schemes are rejected before anything is
//! fetched.

use tracing::warn;

use crate::resources::{EMBEDDED_SCHEME, FILE_SCHEME, ResourceContent, embedded};
use crate::{Error, Result};

/// A resource URI split by scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceUri<'a> {
    Embedded(&'a str),
    File(&'a str),
}

fn parse_uri(uri: &str) -> Result<ResourceUri<'_>> {
    let mismatch = || Error::SchemeMismatch {
        uri: uri.to_string(),
    };
    let (scheme, rest) = uri.split_once(':').ok_or_else(mismatch)?;
    let rest = rest.trim_start_matches('/');
    match scheme {
        EMBEDDED_SCHEME => Ok(ResourceUri::Embedded(rest)),
        FILE_SCHEME => Ok(ResourceUri::File(rest)),
        _ => Err(mismatch()),
    }
}

fn mime_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("yaml" | "yml") => "application/yaml",
        _ => "text/plain",
    }
}

/// Reads resources by URI
#[derive(Debug, Clone)]
pub struct ResourceReader {
    client: reqwest::Client,
    docs_base_url: String,
}

impl ResourceReader {
    pub fn new(docs_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            docs_base_url: docs_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Read a resource by URI
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemeMismatch` for schemes other than `embedded:` and
    /// `file:`, and `Error::ResourceNotFound` for unknown embedded names.
    pub async fn read(&self, uri: &str) -> Result<ResourceContent> {
        match parse_uri(uri)? {
            ResourceUri::Embedded(name) => {
                let resource = embedded(name).ok_or_else(|| Error::ResourceNotFound {
                    uri: uri.to_string(),
                })?;
                Ok(ResourceContent {
                    uri: uri.to_string(),
                    mime_type: resource.mime_type.to_string(),
                    text: resource.text.to_string(),
                })
            }
            ResourceUri::File(path) => Ok(self.fetch_doc(uri, path).await),
        }
    }

    async fn fetch_doc(&self, uri: &str, path: &str) -> ResourceContent {
        let url = format!("{}/{}", self.docs_base_url, path);
        tracing::debug!(%url, "Fetching doc resource");

        match self.get_text(&url).await {
            Ok(text) => ResourceContent {
                uri: uri.to_string(),
                mime_type: mime_type_for(path).to_string(),
                text,
            },
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                ResourceContent {
                    uri: uri.to_string(),
                    mime_type: "text/plain".to_string(),
                    text: Error::ResourceNotFound {
                        uri: uri.to_string(),
                    }
                    .to_string(),
                }
            }
        }
    }

    async fn get_text(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
