use anyhow::{Error, Result};
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use log::{debug, error, info};
use privrel::{PrivRel, PrivRelBuilder};
use std::{future, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
enum PrivRelCliError {
    #[error("{0:}")]
    InvalidArgsError(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cmd = cmd();
    let matches = cmd.get_matches();
    let res = init_logger_from_matches(&matches);
    if let Err(e) = res {
        eprintln!("Error creating logger: {e}");
        std::process::exit(126);
    }

    let status = match make_privrel(&matches) {
        Ok(p) => match p.fetch_with_cancel(ctrl_c()).await {
            Ok(path) => {
                info!("Wrote {}", path.display());
                0
            }
            Err(e) => {
                print_err(&e.into());
                1
            }
        },
        Err(e) => {
            let status = if is_invalid_args(&e) { 127 } else { 1 };
            print_err(&e);
            status
        }
    };
    std::process::exit(status);
}

const MAX_TERM_WIDTH: usize = 100;

fn cmd() -> Command {
    Command::new("privrel")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Dave Rolsky <autarch@urth.org>")
        .about("Download release assets from private GitHub repositories")
        .arg(Arg::new("url").help(concat!(
            "The release asset to download, like",
            " https://github.com/acme/tool/releases/download/v1.2.0/tool_darwin_arm64.tar.gz.",
            " You can pass --project, --tag, and --asset instead.",
        )))
        .arg(
            Arg::new("project")
                .long("project")
                .short('p')
                .help("The repository to download from, like acme/tool."),
        )
        .arg(
            Arg::new("tag")
                .long("tag")
                .short('t')
                .help("The release tag to download from. Required with --project."),
        )
        .arg(
            Arg::new("asset")
                .long("asset")
                .short('a')
                .help("The filename of the release asset. Required with --project."),
        )
        .arg(Arg::new("out").long("out").short('o').help(concat!(
            "Where to write the asset. If this is a directory, the asset's filename is used",
            " inside it. Defaults to the asset's filename in the current directory.",
        )))
        .arg(Arg::new("api-base-url").long("api-base-url").help(concat!(
            "The base URL for the GitHub API. This is useful for testing or if you want",
            " to operate against GitHub Enterprise. This should be something like",
            " `https://github.my-corp.example.com/api/v3`.",
        )))
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(u64).range(1..))
                .help("Give up if the lookup and download take more than this many seconds."),
        )
        .arg(
            Arg::new("no-credential-helper")
                .long("no-credential-helper")
                .action(ArgAction::SetTrue)
                .help(concat!(
                    "Do not ask the git credential helper for a token when neither",
                    " HOMEBREW_GITHUB_API_TOKEN nor GITHUB_TOKEN is set.",
                )),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output."),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debugging output."),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppresses most output."),
        )
        .group(ArgGroup::new("log-level").args(["verbose", "debug", "quiet"]))
        .after_help(concat!(
            "The token is read from HOMEBREW_GITHUB_API_TOKEN, then GITHUB_TOKEN, then the git",
            " credential helper. It must be able to read the repository.",
        ))
        .max_term_width(MAX_TERM_WIDTH)
}

pub(crate) fn init_logger_from_matches(matches: &ArgMatches) -> Result<(), log::SetLoggerError> {
    let level = if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else if matches.get_flag("verbose") {
        log::LevelFilter::Info
    } else if matches.get_flag("quiet") {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };

    privrel::init_logger(level)
}

fn make_privrel(matches: &ArgMatches) -> Result<PrivRel> {
    validate_args(matches)?;

    let mut builder = PrivRelBuilder::new();
    if let Some(u) = matches.get_one::<String>("url") {
        builder = builder.url(u);
    }
    if let Some(p) = matches.get_one::<String>("project") {
        builder = builder.project(p);
    }
    if let Some(t) = matches.get_one::<String>("tag") {
        builder = builder.tag(t);
    }
    if let Some(a) = matches.get_one::<String>("asset") {
        builder = builder.asset(a);
    }
    if let Some(o) = matches.get_one::<String>("out") {
        builder = builder.destination(o);
    }
    if let Some(url) = matches.get_one::<String>("api-base-url") {
        builder = builder.api_base_url(url);
    }
    if let Some(t) = matches.get_one::<u64>("timeout") {
        builder = builder.timeout(Duration::from_secs(*t));
    }
    if matches.get_flag("no-credential-helper") {
        builder = builder.credential_helper(false);
    }

    Ok(builder.build()?)
}

fn validate_args(matches: &ArgMatches) -> Result<()> {
    if matches.contains_id("url") {
        for a in &["project", "tag", "asset"] {
            if matches.contains_id(a) {
                return Err(PrivRelCliError::InvalidArgsError(format!(
                    "You cannot combine a URL with the --{a} option"
                ))
                .into());
            }
        }
        return Ok(());
    }

    if matches.contains_id("project") {
        for a in &["tag", "asset"] {
            if !matches.contains_id(a) {
                return Err(PrivRelCliError::InvalidArgsError(format!(
                    "You must pass --{a} along with --project"
                ))
                .into());
            }
        }
        return Ok(());
    }

    Err(PrivRelCliError::InvalidArgsError(
        "You must pass a URL or --project, --tag, and --asset.".to_string(),
    )
    .into())
}

// Resolves when the user hits Ctrl-C. If the handler can't be installed, this never resolves.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!("could not listen for Ctrl-C: {e}");
        future::pending::<()>().await;
    }
}

// Bad option values that only the builder can check, like an unparseable `--api-base-url`, are
// argument errors too.
fn is_invalid_args(e: &Error) -> bool {
    e.downcast_ref::<PrivRelCliError>().is_some()
        || matches!(
            e.downcast_ref::<privrel::Error>(),
            Some(privrel::Error::InvalidConfig(_))
        )
}

fn print_err(e: &Error) {
    if is_invalid_args(e) {
        error!("{e}");
        println!();
        if let Err(e) = cmd().print_help() {
            eprintln!("could not print help: {e}");
        }
        return;
    }

    if let Some(pe) = e.downcast_ref::<privrel::Error>() {
        error!("{} failed: {pe}", pe.stage());
        return;
    }

    error!("{e}");
}
