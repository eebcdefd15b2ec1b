use crate::{
    downloader::Downloader, error::Error, release_ref::ReleaseRef, resolver::AssetResolver,
};
use log::debug;
use std::{
    future::{self, Future},
    path::{Path, PathBuf},
    time::Duration,
};

/// `PrivRel` fetches one release asset to one path. Use the
/// [`PrivRelBuilder`](crate::PrivRelBuilder) struct to create a new `PrivRel` instance.
#[derive(Debug)]
pub struct PrivRel {
    release: ReleaseRef,
    destination: PathBuf,
    resolver: AssetResolver,
    downloader: Downloader,
    timeout: Option<Duration>,
}

impl PrivRel {
    pub(crate) fn new(
        release: ReleaseRef,
        destination: PathBuf,
        resolver: AssetResolver,
        downloader: Downloader,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            release,
            destination,
            resolver,
            downloader,
            timeout,
        }
    }

    /// The release asset this instance fetches.
    #[must_use]
    pub fn release(&self) -> &ReleaseRef {
        &self.release
    }

    /// The path the asset will be written to.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Looks up the asset's ID and then downloads it. Returns the path the asset was written to.
    ///
    /// # Errors
    ///
    /// * [`Error::ReleaseNotFound`] if the release doesn't exist or the token can't read it.
    /// * [`Error::AssetNotFound`] if the release has no asset with the right name.
    /// * [`Error::BadCredential`] if GitHub rejects the token.
    /// * [`Error::TransientNetwork`] or [`Error::InvalidMetadata`] if the release lookup fails.
    /// * [`Error::DownloadFailed`] if the download or writing the file fails.
    /// * [`Error::Cancelled`] if the configured timeout elapses.
    pub async fn fetch(&self) -> Result<PathBuf, Error> {
        self.fetch_with_cancel(future::pending()).await
    }

    /// Like [`PrivRel::fetch`], but gives up with [`Error::Cancelled`] as soon as `cancel`
    /// completes. Any in-flight request is dropped and the destination is left as it was.
    ///
    /// # Errors
    ///
    /// See [`PrivRel::fetch`].
    pub async fn fetch_with_cancel<F>(&self, cancel: F) -> Result<PathBuf, Error>
    where
        F: Future<Output = ()>,
    {
        let work = async {
            match self.timeout {
                Some(t) => tokio::time::timeout(t, self.resolve_and_download())
                    .await
                    .unwrap_or_else(|_| {
                        Err(self.cancelled(&format!("timed out after {}s", t.as_secs_f64())))
                    }),
                None => self.resolve_and_download().await,
            }
        };

        tokio::select! {
            res = work => res,
            () = cancel => {
                debug!("fetch of {} was cancelled", self.release);
                Err(self.cancelled("cancelled by the caller"))
            }
        }
    }

    /// Looks up the numeric ID of the release asset.
    ///
    /// # Errors
    ///
    /// See [`PrivRel::fetch`].
    pub async fn resolve(&self) -> Result<u64, Error> {
        self.resolver.resolve(&self.release).await
    }

    /// Downloads the asset with the given ID to the destination.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DownloadFailed`] on any failure.
    pub async fn download(&self, asset_id: u64) -> Result<(), Error> {
        self.downloader
            .download(&self.release, asset_id, &self.destination)
            .await
    }

    async fn resolve_and_download(&self) -> Result<PathBuf, Error> {
        let asset_id = self.resolve().await?;
        self.download(asset_id).await?;
        Ok(self.destination.clone())
    }

    fn cancelled(&self, reason: &str) -> Error {
        Error::Cancelled {
            owner: self.release.owner().to_string(),
            repo: self.release.repo().to_string(),
            tag: self.release.tag().to_string(),
            filename: self.release.filename().to_string(),
            reason: reason.to_string(),
        }
    }
}
