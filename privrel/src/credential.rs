use log::debug;
use std::{
    env, fmt,
    io::Write,
    process::{Command, Stdio},
};
use which::which;

/// The env vars checked for a token, in order.
pub(crate) const TOKEN_ENV_VARS: &[&str] = &["HOMEBREW_GITHUB_API_TOKEN", "GITHUB_TOKEN"];

/// A bearer token for the GitHub API. This is never empty. Its `Debug` output does not include
/// the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` if the given token is empty or only whitespace.
    #[must_use]
    pub fn new(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// A source of GitHub tokens.
pub trait CredentialProvider: fmt::Debug {
    /// A short description of where the token comes from, used in log output.
    fn describe(&self) -> String;

    /// Returns a token, or `None` if this source doesn't have one.
    fn credential(&self) -> Option<Credential>;
}

/// Looks for a token in a list of env vars, returning the first non-empty one.
#[derive(Debug)]
pub struct EnvProvider {
    names: Vec<String>,
}

impl EnvProvider {
    #[must_use]
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
        }
    }
}

impl Default for EnvProvider {
    fn default() -> Self {
        Self::new(TOKEN_ENV_VARS)
    }
}

impl CredentialProvider for EnvProvider {
    fn describe(&self) -> String {
        format!("env vars {}", self.names.join(", "))
    }

    fn credential(&self) -> Option<Credential> {
        self.names.iter().find_map(|name| {
            let cred = env::var(name).ok().as_deref().and_then(Credential::new);
            if cred.is_some() {
                debug!("Using GitHub token from the {name} environment variable.");
            }
            cred
        })
    }
}

/// Asks `git credential fill` for the password stored for a host. Git will never prompt for one.
#[derive(Debug)]
pub struct GitCredentialHelper {
    host: String,
}

impl GitCredentialHelper {
    #[must_use]
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
        }
    }

    fn run_git(&self) -> Option<String> {
        let Ok(git) = which("git") else {
            debug!("No git executable found, so the git credential helper cannot be asked.");
            return None;
        };

        let mut child = Command::new(git)
            .args(["credential", "fill"])
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_ASKPASS", "")
            .env("SSH_ASKPASS", "")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .inspect_err(|e| debug!("Could not run `git credential fill`: {e}"))
            .ok()?;

        if let Some(mut stdin) = child.stdin.take() {
            let request = format!("protocol=https\nhost={}\n\n", self.host);
            if let Err(e) = stdin.write_all(request.as_bytes()) {
                debug!("Could not write to `git credential fill`: {e}");
            }
        }

        let output = child
            .wait_with_output()
            .inspect_err(|e| debug!("`git credential fill` failed: {e}"))
            .ok()?;
        if !output.status.success() {
            debug!("`git credential fill` exited with {}", output.status);
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for GitCredentialHelper {
    fn default() -> Self {
        Self::new("github.com")
    }
}

impl CredentialProvider for GitCredentialHelper {
    fn describe(&self) -> String {
        format!("git credential helper for {}", self.host)
    }

    fn credential(&self) -> Option<Credential> {
        let cred = password_from_credential_output(&self.run_git()?);
        if cred.is_some() {
            debug!("Using GitHub token from the git credential helper.");
        }
        cred
    }
}

fn password_from_credential_output(output: &str) -> Option<Credential> {
    output
        .lines()
        .find_map(|l| l.strip_prefix("password="))
        .and_then(Credential::new)
}

/// Returns the explicit token if there is one, otherwise the first credential any provider
/// yields.
pub(crate) fn find_credential(
    explicit: Option<&str>,
    providers: &[&dyn CredentialProvider],
) -> Option<Credential> {
    if let Some(cred) = explicit.and_then(Credential::new) {
        debug!("Using the GitHub token that was passed in explicitly.");
        return Some(cred);
    }
    providers.iter().find_map(|p| {
        debug!("Looking for a GitHub token in {}", p.describe());
        p.credential()
    })
}
