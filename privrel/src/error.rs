use std::path::PathBuf;
use thiserror::Error;

/// The stage of a fetch in which an [`Error`] happened.
#[derive(strum::AsRefStr, Clone, Copy, Debug, strum::Display, PartialEq, Eq)]
pub enum Stage {
    #[strum(serialize = "parse")]
    Parse,
    #[strum(serialize = "credential")]
    Credential,
    #[strum(serialize = "resolve")]
    Resolve,
    #[strum(serialize = "download")]
    Download,
}

/// All the ways a fetch can fail. None of these are retried internally. Messages never include the
/// token.
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{url}` is not a GitHub release asset URL like https://github.com/{{owner}}/{{repo}}/releases/download/{{tag}}/{{filename}}")]
    MalformedUrl { url: String },

    #[error("{0}")]
    MalformedProject(String),

    #[error("{0}")]
    InvalidConfig(String),

    #[error("no GitHub token found for {owner}/{repo}; set HOMEBREW_GITHUB_API_TOKEN or GITHUB_TOKEN to a token that can read the repository")]
    MissingCredential { owner: String, repo: String },

    #[error("the GitHub token was rejected as invalid while looking up release {tag} for {owner}/{repo}")]
    BadCredential {
        owner: String,
        repo: String,
        tag: String,
    },

    #[error("release {tag} not found (or token lacks access) for {owner}/{repo}")]
    ReleaseNotFound {
        owner: String,
        repo: String,
        tag: String,
    },

    #[error("asset {filename} not found in release {tag} ({owner}/{repo})")]
    AssetNotFound {
        owner: String,
        repo: String,
        tag: String,
        filename: String,
    },

    #[error("could not parse the metadata for release {tag} of {owner}/{repo}: {source}")]
    InvalidMetadata {
        owner: String,
        repo: String,
        tag: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("network error while looking up release {tag} for {owner}/{repo}: {message}")]
    TransientNetwork {
        owner: String,
        repo: String,
        tag: String,
        message: String,
    },

    #[error("failed to download {filename} (asset {asset_id}) from release {tag} of {owner}/{repo} to {}: {message}", .destination.display())]
    DownloadFailed {
        owner: String,
        repo: String,
        tag: String,
        filename: String,
        asset_id: u64,
        destination: PathBuf,
        message: String,
    },

    #[error("fetching {filename} from release {tag} of {owner}/{repo} was cancelled: {reason}")]
    Cancelled {
        owner: String,
        repo: String,
        tag: String,
        filename: String,
        reason: String,
    },
}

impl Error {
    /// Returns the stage of the fetch that produced this error.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Error::MalformedUrl { .. } | Error::MalformedProject(_) | Error::InvalidConfig(_) => {
                Stage::Parse
            }
            Error::MissingCredential { .. } => Stage::Credential,
            Error::BadCredential { .. }
            | Error::ReleaseNotFound { .. }
            | Error::AssetNotFound { .. }
            | Error::InvalidMetadata { .. }
            | Error::TransientNetwork { .. } => Stage::Resolve,
            Error::DownloadFailed { .. } | Error::Cancelled { .. } => Stage::Download,
        }
    }
}
