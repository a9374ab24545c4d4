pub mod extractor;


use std::time::Duration;

use tracing::{debug, info};
use ureq::Agent;

use crate::config::{ArchiveConfig, RepoConfig};
use crate::embeddings::openai::body_snippet;
use crate::{RagError, Result};

pub use extractor::{collect_documents, extract_archive, locate_docs_root};

/// Downloads branch archives from a GitHub-style source host
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    agent: Agent,
    base_url: String,
    max_archive_bytes: u64,
}

impl ArchiveFetcher {
    #[inline]
    pub fn new(config: &ArchiveConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(concat!("docs-rag/", env!("CARGO_PKG_VERSION")))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_archive_bytes: config.max_archive_bytes,
        }
    }

    /// URL of the zip archive for the configured branch
    #[inline]
    pub fn archive_url(&self, repo: &RepoConfig) -> String {
        format!(
            "{}/{}/{}/archive/refs/heads/{}.zip",
            self.base_url, repo.owner, repo.repo, repo.branch
        )
    }

    /// Download the branch archive. Any status other than 200 is a failure.
    #[inline]
    pub fn fetch(&self, repo: &RepoConfig) -> Result<Vec<u8>> {
        let url = self.archive_url(repo);
        info!("Downloading documentation archive from {}", url);

        let mut response = self.agent.get(&url).call().map_err(|e| RagError::Network {
            status: None,
            message: format!("Failed to download {}: {}", url, e),
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            debug!("Archive download failed with status {}: {}", status, url);
            return Err(RagError::Network {
                status: Some(status),
                message: format!(
                    "Unexpected response downloading {}: {}",
                    url,
                    body_snippet(&body)
                ),
            });
        }

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_archive_bytes)
            .read_to_vec()
            .map_err(|e| RagError::Network {
                status: Some(status),
                message: format!("Failed to read archive body from {}: {}", url, e),
            })?;

        info!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }
}
