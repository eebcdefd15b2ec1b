//! A library for downloading release assets from private GitHub repositories.
//!
//! GitHub's public download URLs for release assets, like
//! `https://github.com/acme/tool/releases/download/v1.2.0/tool_darwin_arm64.tar.gz`, do not work
//! for private repositories, even when you send a token along. Instead, the asset has to be fetched
//! through the REST API by its numeric ID. This crate takes one of those public-style URLs, looks up
//! the release for its tag, finds the asset's ID, and then downloads it with the token.
//!
//! This project also ships a CLI tool named `privrel`.
//!
//! The main entry point for programmatic use is the [`PrivRelBuilder`] struct. Here is an example
//! of its usage:
//!
//! ```ignore
//! use privrel::PrivRelBuilder;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let privrel = PrivRelBuilder::new()
//!         .url("https://github.com/acme/tool/releases/download/v1.2.0/tool_darwin_arm64.tar.gz")
//!         .destination("/tmp/tool.tar.gz")
//!         .build()?;
//!
//!     privrel.fetch().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Tokens
//!
//! A token is required, and it is looked up before any request is made. If one is not passed to
//! [`PrivRelBuilder::token`], the `HOMEBREW_GITHUB_API_TOKEN` and `GITHUB_TOKEN` env vars are
//! checked, in that order. If neither is set, the local git credential helper is asked for
//! `github.com` credentials, unless that was disabled with
//! [`PrivRelBuilder::credential_helper`].
//!
//! ## Downloads
//!
//! The asset is streamed into a temporary file next to the destination, which is renamed into
//! place once the whole body has arrived. If anything fails, or the fetch is cancelled, the
//! destination is left alone.
//!
//! ## Features
//!
//! This crate offers several features to control the TLS dependency used by `reqwest`:
//!
#![doc = document_features::document_features!()]

mod builder;
mod credential;
mod downloader;
mod error;
mod github;
mod privrel;
mod release_ref;
mod resolver;

pub use crate::{
    builder::PrivRelBuilder,
    error::{Error, Stage},
    privrel::PrivRel,
    release_ref::ReleaseRef,
};

// The version of the `privrel` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "logging")]
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};

/// This function initializes logging for the application. It's public for the sake of the
/// `privrel` binary, but it lives in the library crate so that test code can also enable logging.
///
/// # Errors
///
/// This can return a `log::SetLoggerError` error.
#[cfg(feature = "logging")]
pub fn init_logger(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    let line_colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::BrightBlack)
        .debug(Color::BrightBlack)
        .trace(Color::BrightBlack);
    let level_colors = line_colors.info(Color::Green).debug(Color::Black);

    Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{color_line}[{target}][{level}{color_line}] {message}\x1B[0m",
                color_line = format_args!(
                    "\x1B[{}m",
                    line_colors.get_color(&record.level()).to_fg_str()
                ),
                target = record.target(),
                level = level_colors.color(record.level()),
                message = message,
            ));
        })
        .level(level)
        // This is very noisy.
        .level_for("hyper", log::LevelFilter::Error)
        .level_for("hyper_util", log::LevelFilter::Error)
        .chain(std::io::stderr())
        .apply()
}
