use crate::{
    credential::Credential,
    error::Error,
    github::{self, Release, ReleaseAsset},
    release_ref::ReleaseRef,
};
use log::debug;
use reqwest::{
    header::{HeaderValue, ACCEPT, AUTHORIZATION},
    Client, StatusCode,
};
use url::Url;

/// Looks up the numeric ID of a release asset. Every call makes a fresh request.
#[derive(Debug)]
pub(crate) struct AssetResolver {
    client: Client,
    api_base_url: Url,
    credential: Credential,
}

impl AssetResolver {
    pub(crate) fn new(client: Client, api_base_url: Url, credential: Credential) -> Self {
        Self {
            client,
            api_base_url,
            credential,
        }
    }

    pub(crate) async fn resolve(&self, release: &ReleaseRef) -> Result<u64, Error> {
        let assets = self.fetch_assets(release).await?;
        let asset =
            pick_asset(&assets, release.filename()).ok_or_else(|| Error::AssetNotFound {
                owner: release.owner().to_string(),
                repo: release.repo().to_string(),
                tag: release.tag().to_string(),
                filename: release.filename().to_string(),
            })?;
        debug!("Asset {} has id {}", asset.name, asset.id);
        Ok(asset.id)
    }

    async fn fetch_assets(&self, release: &ReleaseRef) -> Result<Vec<ReleaseAsset>, Error> {
        let url = github::release_info_url(&self.api_base_url, release);
        debug!("Getting release info from `{url}`");

        let transient = |message: String| Error::TransientNetwork {
            owner: release.owner().to_string(),
            repo: release.repo().to_string(),
            tag: release.tag().to_string(),
            message,
        };

        let resp = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/vnd.github+json"))
            .header(AUTHORIZATION, self.bearer_header()?)
            .send()
            .await
            .map_err(|e| transient(e.without_url().to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                return Err(Error::ReleaseNotFound {
                    owner: release.owner().to_string(),
                    repo: release.repo().to_string(),
                    tag: release.tag().to_string(),
                })
            }
            StatusCode::UNAUTHORIZED => {
                return Err(Error::BadCredential {
                    owner: release.owner().to_string(),
                    repo: release.repo().to_string(),
                    tag: release.tag().to_string(),
                })
            }
            s if !s.is_success() => {
                return Err(transient(format!("the GitHub API responded with {s}")));
            }
            _ => (),
        }

        let body = resp
            .text()
            .await
            .map_err(|e| transient(e.without_url().to_string()))?;
        let release_info =
            serde_json::from_str::<Release>(&body).map_err(|source| Error::InvalidMetadata {
                owner: release.owner().to_string(),
                repo: release.repo().to_string(),
                tag: release.tag().to_string(),
                source,
            })?;
        debug!(
            "Release {} has {} asset(s)",
            release.tag(),
            release_info.assets.len()
        );

        Ok(release_info.assets)
    }

    fn bearer_header(&self) -> Result<HeaderValue, Error> {
        debug!("Adding GitHub token to GitHub request.");
        let bearer = format!("Bearer {}", self.credential.expose());
        let mut auth_val = HeaderValue::from_str(&bearer).map_err(|_| {
            Error::InvalidConfig(
                "the GitHub token contains characters that cannot be sent in an HTTP header"
                    .to_string(),
            )
        })?;
        auth_val.set_sensitive(true);
        Ok(auth_val)
    }
}

/// Returns the first asset named exactly `filename`.
fn pick_asset<'a>(assets: &'a [ReleaseAsset], filename: &str) -> Option<&'a ReleaseAsset> {
    assets.iter().find(|a| a.name == filename)
}
