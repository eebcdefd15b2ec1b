use crate::{credential::Credential, error::Error, github, release_ref::ReleaseRef};
use log::{debug, info};
use reqwest::{
    header::{HeaderValue, ACCEPT},
    Client,
};
use std::{
    fmt::Display,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::Builder;
use url::Url;

/// Downloads one asset by its ID and writes it to a path. The destination is replaced atomically,
/// so it is either untouched or complete.
#[derive(Debug)]
pub(crate) struct Downloader {
    client: Client,
    api_base_url: Url,
    credential: Credential,
}

impl Downloader {
    pub(crate) fn new(client: Client, api_base_url: Url, credential: Credential) -> Self {
        Self {
            client,
            api_base_url,
            credential,
        }
    }

    pub(crate) async fn download(
        &self,
        release: &ReleaseRef,
        asset_id: u64,
        destination: &Path,
    ) -> Result<(), Error> {
        let fail = |message: &dyn Display| Error::DownloadFailed {
            owner: release.owner().to_string(),
            repo: release.repo().to_string(),
            tag: release.tag().to_string(),
            filename: release.filename().to_string(),
            asset_id,
            destination: destination.to_path_buf(),
            message: message.to_string(),
        };

        let url =
            github::authenticated_asset_url(&self.api_base_url, release, asset_id, &self.credential)
                .map_err(|e| fail(&e))?;
        debug!("downloading asset from {}", github::redact(url.as_str()));

        let mut resp = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/octet-stream"))
            .send()
            .await
            .map_err(|e| fail(&e.without_url()))?;
        if !resp.status().is_success() {
            let mut msg = format!("the GitHub API responded with {}", resp.status());
            if let Ok(t) = resp.text().await {
                if !t.is_empty() {
                    msg.push('\n');
                    msg.push_str(&t);
                }
            }
            return Err(fail(&msg));
        }
        let expect_len = resp.content_length();

        let dir = destination_dir(destination);
        let mut part = Builder::new()
            .prefix(&format!(".{}.", release.filename()))
            .suffix(".part")
            .tempfile_in(&dir)
            .map_err(|e| {
                fail(&format!(
                    "failed to create a temporary file in {}: {e}",
                    dir.display()
                ))
            })?;
        debug!("temporary download path is {}", part.path().display());

        let mut written: u64 = 0;
        while let Some(c) = resp
            .chunk()
            .await
            .map_err(|e| fail(&format!("failed to read response body: {}", e.without_url())))?
        {
            part.write_all(c.as_ref()).map_err(|e| {
                fail(&format!(
                    "failed to write to {}: {e}",
                    part.path().display()
                ))
            })?;
            written += c.len() as u64;
        }
        check_length(expect_len, written).map_err(|e| fail(&e))?;
        part.as_file()
            .sync_all()
            .map_err(|e| fail(&format!("failed to flush the downloaded file: {e}")))?;

        // On failure the returned error owns the temp file, so it's removed when that's dropped.
        part.persist(destination)
            .map_err(|e| fail(&format!("failed to move the download into place: {}", e.error)))?;
        info!(
            "Downloaded {} ({written} bytes) to {}",
            release.filename(),
            destination.display()
        );

        Ok(())
    }
}

fn destination_dir(destination: &Path) -> PathBuf {
    destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn check_length(expect: Option<u64>, got: u64) -> Result<(), String> {
    if let Some(expect) = expect {
        if expect != got {
            return Err(format!(
                "the response body was truncated: expected {expect} bytes but got {got}"
            ));
        }
    }
    Ok(())
}
