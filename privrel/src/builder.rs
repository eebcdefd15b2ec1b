//! The `builder` module contains the `PrivRelBuilder` struct which is used to create a `PrivRel`
//! instance.
use crate::{
    credential::{find_credential, CredentialProvider, EnvProvider, GitCredentialHelper},
    downloader::Downloader,
    error::Error,
    github::DEFAULT_API_BASE_URL,
    privrel::PrivRel,
    release_ref::ReleaseRef,
    resolver::AssetResolver,
};
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client,
};
use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

/// `PrivRelBuilder` is used to create a [`PrivRel`] instance.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct PrivRelBuilder<'a> {
    url: Option<&'a str>,
    project: Option<&'a str>,
    tag: Option<&'a str>,
    asset: Option<&'a str>,
    destination: Option<PathBuf>,
    token: Option<&'a str>,
    credential_helper: Option<bool>,
    api_base_url: Option<&'a str>,
    timeout: Option<Duration>,
}

impl<'a> PrivRelBuilder<'a> {
    /// Returns a new empty `PrivRelBuilder`.
    #[must_use]
    pub fn new() -> Self {
        PrivRelBuilder::default()
    }

    /// Set the release asset URL to download, like
    /// `https://github.com/acme/tool/releases/download/v1.2.0/tool_darwin_arm64.tar.gz`.
    ///
    /// You must set this or set all of `project`, `tag`, and `asset`, but not both.
    #[must_use]
    pub fn url(mut self, url: &'a str) -> Self {
        self.url = Some(url);
        self
    }

    /// Set the project to download from, as `owner/repo`.
    #[must_use]
    pub fn project(mut self, project: &'a str) -> Self {
        self.project = Some(project);
        self
    }

    /// Set the release tag to download from. Required when `project` is set.
    #[must_use]
    pub fn tag(mut self, tag: &'a str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Set the filename of the release asset. Required when `project` is set.
    #[must_use]
    pub fn asset(mut self, asset: &'a str) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Set the path to write the asset to. If this is an existing directory, the asset is written
    /// into it using the asset's filename. If not set, the asset is written to the current
    /// directory using its filename.
    #[must_use]
    pub fn destination<P: AsRef<Path>>(mut self, destination: P) -> Self {
        self.destination = Some(destination.as_ref().to_path_buf());
        self
    }

    /// Set a token to use for API requests. If this is not set, then the `HOMEBREW_GITHUB_API_TOKEN`
    /// and `GITHUB_TOKEN` env vars are checked, followed by the git credential helper.
    #[must_use]
    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Set whether to ask the git credential helper for a token when none is given explicitly or
    /// found in the environment. This defaults to `true`.
    #[must_use]
    pub fn credential_helper(mut self, enabled: bool) -> Self {
        self.credential_helper = Some(enabled);
        self
    }

    /// Set the base URL for the GitHub API. This is useful for testing or if you want to operate
    /// against GitHub Enterprise. This should be something like
    /// `https://github.my-corp.example.com/api/v3`.
    #[must_use]
    pub fn api_base_url(mut self, api_base_url: &'a str) -> Self {
        self.api_base_url = Some(api_base_url);
        self
    }

    /// Set a limit on how long the whole fetch (lookup plus download) may take.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds a new [`PrivRel`] instance and returns it. This looks up the token but does not
    /// make any network requests.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidConfig`] if incompatible options were set (a `url` with a `project`) or
    ///   required options are missing.
    /// * [`Error::MalformedUrl`] or [`Error::MalformedProject`] if the asset cannot be parsed.
    /// * [`Error::MissingCredential`] if no token could be found.
    pub fn build(self) -> Result<PrivRel, Error> {
        let release = self.release_ref()?;
        let credential = {
            let env = EnvProvider::default();
            let git = GitCredentialHelper::default();
            let mut providers: Vec<&dyn CredentialProvider> = vec![&env];
            if self.credential_helper.unwrap_or(true) {
                providers.push(&git);
            }
            find_credential(self.token, &providers).ok_or_else(|| Error::MissingCredential {
                owner: release.owner().to_string(),
                repo: release.repo().to_string(),
            })?
        };

        let api_base_url = self.parsed_api_base_url()?;
        let destination = destination(self.destination.as_deref(), release.filename())?;
        let client = reqwest_client()?;

        Ok(PrivRel::new(
            release,
            destination,
            AssetResolver::new(client.clone(), api_base_url.clone(), credential.clone()),
            Downloader::new(client, api_base_url, credential),
            self.timeout,
        ))
    }

    fn release_ref(&self) -> Result<ReleaseRef, Error> {
        match (self.url, self.project) {
            (Some(_), Some(_)) => Err(Error::InvalidConfig(
                "You cannot set a url with a project".to_string(),
            )),
            (Some(_), None) if self.tag.is_some() || self.asset.is_some() => Err(
                Error::InvalidConfig("You cannot set a url with a tag or asset".to_string()),
            ),
            (Some(url), None) => ReleaseRef::parse(url),
            (None, Some(project)) => {
                let (Some(tag), Some(asset)) = (self.tag, self.asset) else {
                    return Err(Error::InvalidConfig(
                        "You must set a tag and asset along with a project".to_string(),
                    ));
                };
                ReleaseRef::from_parts(project, tag, asset)
            }
            (None, None) => Err(Error::InvalidConfig(
                "You must set a url or project".to_string(),
            )),
        }
    }

    fn parsed_api_base_url(&self) -> Result<Url, Error> {
        let Some(api_base_url) = self.api_base_url else {
            return Ok(DEFAULT_API_BASE_URL.clone());
        };
        let url = Url::parse(api_base_url).map_err(|e| {
            Error::InvalidConfig(format!("invalid API base URL `{api_base_url}`: {e}"))
        })?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "invalid API base URL `{api_base_url}`: it cannot have paths appended to it"
            )));
        }
        Ok(url)
    }
}

fn destination(destination: Option<&Path>, filename: &str) -> Result<PathBuf, Error> {
    let destination = match destination {
        Some(d) if d.is_dir() => d.join(filename),
        Some(d) => d.to_path_buf(),
        None => env::current_dir()
            .map_err(|e| {
                Error::InvalidConfig(format!("could not determine the current directory: {e}"))
            })?
            .join(filename),
    };
    debug!("destination path = {}", destination.display());
    Ok(destination)
}

fn reqwest_client() -> Result<Client, Error> {
    let builder = Client::builder().gzip(true);

    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("privrel version ", env!("CARGO_PKG_VERSION"))),
    );
    builder
        .default_headers(headers)
        .build()
        .map_err(|e| Error::InvalidConfig(format!("could not create an HTTP client: {e}")))
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;
    use rstest::rstest;
    use serial_test::serial;
    use tempfile::TempDir;

    const URL: &str =
        "https://github.com/acme/tool/releases/download/v1.2.0/tool_darwin_arm64.tar.gz";

    fn clear_token_env() {
        for name in crate::credential::TOKEN_ENV_VARS {
            env::remove_var(name);
        }
    }

    #[test]
    fn build_from_url() -> Result<()> {
        let td = TempDir::new()?;
        let privrel = PrivRelBuilder::new()
            .url(URL)
            .token("abc123")
            .destination(td.path().join("x.tar.gz"))
            .build()?;
        assert_eq!(privrel.release().owner(), "acme");
        assert_eq!(privrel.release().filename(), "tool_darwin_arm64.tar.gz");
        assert_eq!(privrel.destination(), td.path().join("x.tar.gz"));
        Ok(())
    }

    #[test]
    fn build_from_project() -> Result<()> {
        let privrel = PrivRelBuilder::new()
            .project("acme/tool")
            .tag("v1.2.0")
            .asset("tool_darwin_arm64.tar.gz")
            .token("abc123")
            .build()?;
        assert_eq!(privrel.release(), &ReleaseRef::parse(URL)?);
        Ok(())
    }

    #[test]
    fn destination_defaults_to_filename_in_current_dir() -> Result<()> {
        let privrel = PrivRelBuilder::new().url(URL).token("abc123").build()?;
        assert_eq!(
            privrel.destination(),
            env::current_dir()?.join("tool_darwin_arm64.tar.gz"),
        );
        Ok(())
    }

    #[test]
    fn destination_directory_gets_filename() -> Result<()> {
        let td = TempDir::new()?;
        let privrel = PrivRelBuilder::new()
            .url(URL)
            .token("abc123")
            .destination(td.path())
            .build()?;
        assert_eq!(
            privrel.destination(),
            td.path().join("tool_darwin_arm64.tar.gz")
        );
        Ok(())
    }

    #[rstest]
    #[case::nothing(PrivRelBuilder::new())]
    #[case::url_and_project(PrivRelBuilder::new().url(URL).project("acme/tool"))]
    #[case::url_and_tag(PrivRelBuilder::new().url(URL).tag("v1"))]
    #[case::url_and_asset(PrivRelBuilder::new().url(URL).asset("tool.tar.gz"))]
    #[case::project_without_asset(PrivRelBuilder::new().project("acme/tool").tag("v1"))]
    #[case::project_without_tag(PrivRelBuilder::new().project("acme/tool").asset("tool.tar.gz"))]
    #[case::bad_api_base_url(PrivRelBuilder::new().url(URL).api_base_url("not a url"))]
    #[case::cannot_be_a_base(PrivRelBuilder::new().url(URL).api_base_url("mailto:someone@example.com"))]
    fn build_invalid_config(#[case] builder: PrivRelBuilder<'static>) {
        let res = builder.token("abc123").build();
        assert!(matches!(res, Err(Error::InvalidConfig(_))), "{res:?}");
    }

    #[test]
    fn build_malformed_url() {
        let res = PrivRelBuilder::new()
            .url("https://github.com/acme/tool/releases/latest")
            .token("abc123")
            .build();
        assert!(matches!(res, Err(Error::MalformedUrl { .. })), "{res:?}");
    }

    #[test]
    #[serial]
    fn build_missing_credential() {
        clear_token_env();
        let res = PrivRelBuilder::new()
            .url(URL)
            .credential_helper(false)
            .build();
        match res {
            Err(e @ Error::MissingCredential { .. }) => {
                assert!(e.to_string().contains("acme/tool"), "{e}");
            }
            other => panic!("expected MissingCredential, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn build_uses_env_token() {
        clear_token_env();
        env::set_var("GITHUB_TOKEN", "from-env");
        let res = PrivRelBuilder::new()
            .url(URL)
            .credential_helper(false)
            .build();
        clear_token_env();
        assert!(res.is_ok(), "{res:?}");
    }

    #[test]
    #[serial]
    fn build_empty_env_token_is_missing() {
        clear_token_env();
        env::set_var("HOMEBREW_GITHUB_API_TOKEN", "");
        let res = PrivRelBuilder::new()
            .url(URL)
            .credential_helper(false)
            .build();
        clear_token_env();
        assert!(
            matches!(res, Err(Error::MissingCredential { .. })),
            "{res:?}"
        );
    }
}
