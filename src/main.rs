use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use futures_util::future::join_all;
use url::Url;

use snav::config::Config;
use snav::dom::{MemoryHost, MemoryNode, Session};
use snav::error::{NavError, NavResult};
use snav::event::EventKind;
use snav::nav::{NavOutcome, Navigator, NavigatorOptions};
use snav::transition::{HookError, TransitionContext, TransitionRegistry, TransitionSpec};
use snav::transport::{FetchRequest, Fetcher, FsFetcher};

const SITE_ORIGIN: &str = "http://localhost/";

/// Replays soft navigations over a directory of HTML pages.
#[derive(Debug, Parser)]
#[command(name = "snav", version)]
struct Cli {
    /// Directory the pages are served from.
    #[arg(long)]
    site: PathBuf,
    /// Page loaded before the first step.
    #[arg(long, default_value = "/")]
    start: String,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Start each step this long after the previous one instead of waiting
    /// for it to finish.
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Print lifecycle events as JSON lines on stdout.
    #[arg(long)]
    json: bool,
    /// Addresses to visit, or `back` / `forward`.
    #[arg(required = true)]
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Go(String),
    Back,
    Forward,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "" => Err("step must not be empty".to_string()),
            "back" => Ok(Self::Back),
            "forward" => Ok(Self::Forward),
            address => Ok(Self::Go(address.to_string())),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> NavResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    snav::logging::init(&config.log);

    let fetcher = Rc::new(FsFetcher::new(cli.site.clone()));
    let start = Url::parse(SITE_ORIGIN)
        .and_then(|origin| origin.join(&cli.start))
        .map_err(|source| NavError::invalid_address(&cli.start, source))?;
    let markup = fetcher
        .fetch(FetchRequest {
            url: start.clone(),
            credentials: config.fetch.credentials,
        })
        .await
        .map_err(|source| NavError::transport(start.as_str(), source))?;

    let host = Rc::new(MemoryHost::with_history_capacity(
        start.as_str(),
        &markup,
        config.history.capacity,
    )?);
    let registry = TransitionRegistry::new(demo_transition(&config));
    let nav = Navigator::new(
        Rc::clone(&host),
        fetcher,
        NavigatorOptions::from_config(registry, &config),
    )?;
    subscribe_reporters(&nav, cli.json);

    tracing::info!(site = %cli.site.display(), start = %start, "loaded start page");
    nav.enter_initial().await;

    let outcomes = match cli.interval_ms {
        None => {
            let mut outcomes = Vec::with_capacity(cli.steps.len());
            for step in &cli.steps {
                outcomes.push(run_step(&nav, &host, step).await);
            }
            outcomes
        }
        Some(interval) => {
            let staggered = cli.steps.iter().zip(0u64..).map(|(step, index)| {
                let nav = nav.clone();
                let host = Rc::clone(&host);
                async move {
                    tokio::time::sleep(Duration::from_millis(interval.saturating_mul(index))).await;
                    run_step(&nav, &host, step).await
                }
            });
            join_all(staggered).await
        }
    };

    let completed = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Some(NavOutcome::Completed)))
        .count();
    let counters = nav.cache().counters();
    tracing::info!(
        location = %host.location(),
        title = %host.title(),
        completed,
        steps = outcomes.len(),
        cache_hits = counters.hits,
        cache_misses = counters.misses,
        aborted_fetches = counters.aborted,
        "done"
    );
    Ok(())
}

async fn run_step(
    nav: &Navigator<MemoryHost>,
    host: &MemoryHost,
    step: &Step,
) -> Option<NavOutcome> {
    let outcome = match step {
        Step::Go(address) => nav.go(address).await,
        Step::Back if host.history_back() => nav.pop_state().await,
        Step::Forward if host.history_forward() => nav.pop_state().await,
        Step::Back | Step::Forward => {
            tracing::warn!(?step, "no history entry in that direction");
            return None;
        }
    };
    tracing::debug!(?step, ?outcome, "step finished");
    Some(outcome)
}

/// Leave and enter both wait for the configured time; enter then drops the
/// outgoing content node.
fn demo_transition(config: &Config) -> TransitionSpec<MemoryNode> {
    let leave = Duration::from_millis(config.demo.leave_ms);
    let enter = Duration::from_millis(config.demo.enter_ms);
    TransitionSpec::new(
        move |ctx: TransitionContext<MemoryNode>| async move {
            tokio::time::sleep(enter).await;
            if let Some(from) = ctx.from {
                from.detach();
            }
            Ok::<(), HookError>(())
        },
        move |_| async move {
            tokio::time::sleep(leave).await;
            Ok::<(), HookError>(())
        },
    )
}

fn subscribe_reporters(nav: &Navigator<MemoryHost>, json: bool) {
    for kind in EventKind::ALL {
        nav.on(kind, move |event| {
            let record = event.record();
            if json {
                match serde_json::to_string(&record) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!(error = %err, "failed to encode event"),
                }
                return;
            }
            match &record.error {
                Some(error) => tracing::error!(
                    event = kind.as_str(),
                    address = record.address.as_deref().unwrap_or("-"),
                    "{error}"
                ),
                None => tracing::info!(
                    event = kind.as_str(),
                    address = record.address.as_deref().unwrap_or("-"),
                    trigger = record.trigger.unwrap_or("-"),
                    leave_cancelled = record.leave_cancelled,
                    "lifecycle event"
                ),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{Cli, Step};

    #[test]
    fn parses_steps_and_flags() {
        let cli = Cli::try_parse_from([
            "snav",
            "--site",
            "public",
            "--interval-ms",
            "50",
            "--json",
            "/about",
            "back",
            "forward",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.site, PathBuf::from("public"));
        assert_eq!(cli.start, "/");
        assert_eq!(cli.interval_ms, Some(50));
        assert!(cli.json);
        assert_eq!(
            cli.steps,
            vec![Step::Go("/about".to_string()), Step::Back, Step::Forward]
        );
    }

    #[test]
    fn requires_site_and_at_least_one_step() {
        assert!(Cli::try_parse_from(["snav", "/about"]).is_err());
        assert!(Cli::try_parse_from(["snav", "--site", "public"]).is_err());
    }

    #[test]
    fn blank_step_is_rejected() {
        assert!("  ".parse::<Step>().is_err());
        assert_eq!("/x".parse::<Step>(), Ok(Step::Go("/x".to_string())));
    }
}
