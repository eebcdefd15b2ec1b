use crate::error::Error;
use lazy_regex::regex_captures;
use log::debug;
use std::{fmt, str::FromStr};

/// A reference to one asset of one GitHub release, as parsed from a URL like
/// `https://github.com/acme/tool/releases/download/v1.2.0/tool_darwin_arm64.tar.gz`.
///
/// All fields are non-empty and none of them contain a `/`. The values are kept exactly as they
/// appear in the URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseRef {
    owner: String,
    repo: String,
    tag: String,
    filename: String,
}

impl ReleaseRef {
    /// Parses a release asset URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedUrl`] unless the URL has exactly the shape
    /// `http(s)://github.com/{owner}/{repo}/releases/download/{tag}/{filename}`.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let Some((_, owner, repo, tag, filename)) = regex_captures!(
            r"^https?://github\.com/([^/]+)/([^/]+)/releases/download/([^/]+)/([^/]+)$",
            url
        ) else {
            return Err(Error::MalformedUrl {
                url: url.to_string(),
            });
        };
        debug!("Parsed {url} = {owner} / {repo} @ {tag} : {filename}");

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
            filename: filename.to_string(),
        })
    }

    /// Builds a reference from its parts. `project` must be in the form `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedProject`] if any part is empty or contains a `/` (other than the
    /// one separating owner and repo).
    pub fn from_parts(project: &str, tag: &str, filename: &str) -> Result<Self, Error> {
        let Some((owner, repo)) = project.split_once('/') else {
            return Err(Error::MalformedProject(format!(
                "could not parse owner and repo name from `{project}`"
            )));
        };
        for (what, val) in [
            ("owner", owner),
            ("repo", repo),
            ("tag", tag),
            ("asset filename", filename),
        ] {
            if val.is_empty() || val.contains('/') {
                return Err(Error::MalformedProject(format!(
                    "the {what} `{val}` must be non-empty and cannot contain a `/`"
                )));
            }
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
            filename: filename.to_string(),
        })
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl FromStr for ReleaseRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Formats the reference as its public `https://github.com/...` download URL.
impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "https://github.com/{}/{}/releases/download/{}/{}",
            self.owner, self.repo, self.tag, self.filename,
        )
    }
}
