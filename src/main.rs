use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use wait_for_checks::announce::SpeechAnnouncer;
use wait_for_checks::client::GitHubApi;
use wait_for_checks::config::{ActionFlags, WatchConfig};
use wait_for_checks::poller::Poller;
use wait_for_checks::render::Renderer;
use wait_for_checks::store::SnapshotStore;
use wait_for_checks::target::Target;
use wait_for_checks::verdict::{ActionOutcome, VerdictDriver, FATAL_EXIT_CODE};

#[derive(Parser)]
#[command(name = "wait-for-checks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wait for checks to pass or fail on a GitHub PR or commit", long_about = None)]
struct Cli {
    /// https://github.com/<owner>/<repo>[/pull/<number>|/commit/<sha>]
    target: String,

    /// GitHub token used for every API call
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Workflow or job name to leave out (repeatable, comma separated)
    #[arg(long = "skip", value_name = "NAME", value_delimiter = ',')]
    skip: Vec<String>,

    /// Do not stop on the first failed workflow, wait for everything to finish
    #[arg(long)]
    ignore_failures: bool,

    /// Merge the pull request once all checks passed
    #[arg(long)]
    merge: bool,

    /// Add the pull request to the merge queue once all checks passed
    #[arg(long)]
    enqueue: bool,

    /// Speak the result out loud
    #[arg(long)]
    announce: bool,

    /// Seconds between two refreshes of the check suites (at least 1)
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval: u64,

    /// Log failed refreshes and debug details to stderr. Without it only errors
    /// are logged; RUST_LOG overrides both
    #[arg(short, long)]
    verbose: bool,
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "wait_for_checks=debug"
    } else {
        "error"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(cli.verbose)))
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("Error: {error:?}");
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let target = Target::parse(&cli.target)?;
    let api = Arc::new(GitHubApi::new(cli.token)?);
    let resolved = api.resolve(&target).await?;
    log::info!("Resolved {} to commit {}", cli.target, resolved.head_sha);
    println!(
        "Waiting for checks to complete for commit {}...",
        resolved.head_sha
    );

    let config = WatchConfig {
        skip: cli.skip.into_iter().collect(),
        ignore_failures: cli.ignore_failures,
        poll_interval: Duration::from_secs(cli.poll_interval),
        ..WatchConfig::default()
    };
    let store = Arc::new(SnapshotStore::new());
    Poller::new(
        api.clone(),
        resolved.commit_node.clone(),
        config.poll_interval,
        store.clone(),
    )
    .spawn();

    let verdict = Renderer::new(std::io::stdout(), store.reader(), config)
        .run()
        .await?;

    let announcer = SpeechAnnouncer::default();
    let driver = VerdictDriver {
        target: &resolved,
        flags: ActionFlags {
            merge: cli.merge,
            enqueue: cli.enqueue,
            announce: cli.announce,
        },
        actions: api.as_ref(),
        announcer: &announcer,
    };
    let report = driver.conclude(verdict).await;
    for outcome in &report.outcomes {
        match outcome {
            ActionOutcome::Done(_) => println!("{outcome}"),
            _ => eprintln!("{outcome}"),
        }
    }
    Ok(report.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    use super::*;

    const TARGET: &str = "https://github.com/octo/widgets/pull/7";

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(
            ["wait-for-checks", TARGET, "--token", "t"]
                .iter()
                .chain(args.iter())
                .copied(),
        )
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = parse(&["--poll-interval", "0"]).err().expect("0 must be rejected");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_poll_interval() {
        assert_eq!(parse(&[]).unwrap().poll_interval, 5);
        assert_eq!(parse(&["--poll-interval", "1"]).unwrap().poll_interval, 1);
    }

    #[test]
    fn test_skip_list() {
        let cli = parse(&["--skip", "lint,docs", "--skip", "flaky"]).unwrap();
        assert_eq!(cli.skip, vec!["lint", "docs", "flaky"]);
    }

    #[test]
    fn test_verbose_shows_fetch_warnings() {
        assert_eq!(log_filter(false), "error");
        assert_eq!(log_filter(true), "wait_for_checks=debug");
        assert!(parse(&["-v"]).unwrap().verbose);

        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Log failed refreshes"));
    }
}
