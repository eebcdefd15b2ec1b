use crate::{credential::Credential, release_ref::ReleaseRef};
use lazy_regex::{lazy_regex, Lazy, Regex};
use serde::{Deserialize, Serialize};
use url::Url;

pub(crate) static DEFAULT_API_BASE_URL: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://api.github.com").expect("the default GitHub API URL is valid")
});

// Used to keep the `{token}@` part out of anything we log.
static USERINFO: Lazy<Regex> = lazy_regex!(r"//[^/@]*@");

/// The subset of a GitHub release response that we care about.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct Release {
    #[serde(default)]
    pub(crate) assets: Vec<ReleaseAsset>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub(crate) struct ReleaseAsset {
    pub(crate) name: String,
    pub(crate) id: u64,
}

/// `{api_base}/repos/{owner}/{repo}/releases/tags/{tag}`
pub(crate) fn release_info_url(api_base: &Url, release: &ReleaseRef) -> Url {
    api_url(
        api_base,
        &[
            "repos",
            release.owner(),
            release.repo(),
            "releases",
            "tags",
            release.tag(),
        ],
    )
}

/// `{api_base}/repos/{owner}/{repo}/releases/assets/{id}`, without any credentials.
pub(crate) fn asset_url(api_base: &Url, release: &ReleaseRef, asset_id: u64) -> Url {
    api_url(
        api_base,
        &[
            "repos",
            release.owner(),
            release.repo(),
            "releases",
            "assets",
            &asset_id.to_string(),
        ],
    )
}

// The segments come straight from a download URL, so they may already be percent-encoded (a tag
// like `v1.0.0%2Bbuild`). `set_path` leaves existing escapes alone where `push` would encode the
// `%` a second time.
fn api_url(api_base: &Url, segments: &[&str]) -> Url {
    let mut url = api_base.clone();
    let path = format!(
        "{}/{}",
        api_base.path().trim_end_matches('/'),
        segments.join("/")
    );
    url.set_path(&path);
    url
}

/// The asset URL with the token embedded as the URL's username, so that it works with tools that
/// only take a URL.
pub(crate) fn authenticated_asset_url(
    api_base: &Url,
    release: &ReleaseRef,
    asset_id: u64,
    credential: &Credential,
) -> Result<Url, String> {
    let mut url = asset_url(api_base, release, asset_id);
    url.set_username(credential.expose())
        .map_err(|()| format!("cannot embed a token in the URL {url}"))?;
    Ok(url)
}

/// Strips any `user:pass@` from a URL string.
pub(crate) fn redact(url: &str) -> String {
    USERINFO.replace(url, "//").into_owned()
}
