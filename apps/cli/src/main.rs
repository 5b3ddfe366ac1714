#![deny(warnings)]

//! Headless runner: plays Overhead for a number of simulated seconds and
//! prints the resulting KPIs.

use anyhow::{Context, Result};
use overhead_core::{validate_pools, GameConfig, GameModule, Pools};
use overhead_runtime::{ActionError, Game};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    pools: Option<PathBuf>,
    seconds: Option<u64>,
    autoplay: bool,
    debug: bool,
    json: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--pools" => args.pools = it.next().map(PathBuf::from),
            "--seconds" => args.seconds = it.next().and_then(|s| s.parse().ok()),
            "--autoplay" => args.autoplay = true,
            "--debug" => args.debug = true,
            "--json" => args.json = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

fn load_config(path: Option<&PathBuf>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    GameConfig::from_yaml_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn load_pools(path: Option<&PathBuf>, cfg: &GameConfig) -> Result<Pools> {
    let Some(path) = path else {
        return Ok(Pools::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading pools {}", path.display()))?;
    let pools = Pools::from_json_str(&text)?;
    validate_pools(&pools, cfg.mailbox.mail_total_upgraded)?;
    Ok(pools)
}

/// Not-enough-funds and friends are expected during play; only log them.
fn notice(result: Result<(), ActionError>) {
    if let Err(e) = result {
        info!(%e, "action refused");
    }
}

/// One simulated second of play by the planner.
fn autoplay_step(game: &mut Game) {
    if game.corporation().is_unlocked() && !game.corporation().is_started() {
        notice(game.start_corporation());
    }
    if game.world().is_unlocked() && !game.world().is_active() {
        notice(game.start_world());
    }
    while let Some(upgrade) = overhead_ai::plan_purchase(&game.view()) {
        if let Err(e) = game.purchase(upgrade) {
            info!(?upgrade, %e, "planned purchase refused");
            break;
        }
    }
    let mailbox = game.mailbox();
    if !mailbox.upgrades().auto_mail && !mailbox.is_syncing() {
        let unchecked: Vec<usize> = mailbox
            .mails()
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.checked)
            .map(|(i, _)| i)
            .collect();
        for i in unchecked {
            if let Err(e) = game.toggle_mail(i) {
                info!(%e, "toggle refused");
            }
        }
        if game.mailbox().remaining() == 0 && !game.mailbox().is_syncing() {
            notice(game.reply_all());
        }
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::DEBUG)
        .init();

    let args = parse_args();
    info!(
        ?args,
        sha = env!("OVERHEAD_GIT_SHA"),
        built = env!("OVERHEAD_BUILD_DATE"),
        "starting overhead"
    );

    let cfg = load_config(args.config.as_ref())?;
    let pools = load_pools(args.pools.as_ref(), &cfg)?;
    let mut game = Game::new(cfg, pools)?;

    if args.debug {
        game.enable_debug()?;
    }

    let seconds = args.seconds.unwrap_or(600);
    for _ in 0..seconds {
        if game.is_over() {
            break;
        }
        if args.autoplay {
            autoplay_step(&mut game);
        }
        game.advance(Duration::from_secs(1));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&game.view())?);
        return Ok(());
    }

    let u = game.unlocks();
    println!(
        "KPI | time: {}s | money: {} | output: {:.0} | progress: {:.1}% | corporation: {} | world: {} | won: {}",
        game.clock().as_secs(),
        game.money().round_dp(2),
        game.output_value(),
        game.progress(),
        u.module2,
        u.module3,
        u.win
    );
    for m in game.view().modules {
        println!(
            "  {:<12} {:>16.0} | x{} | {:.1}/min | {}",
            m.name, m.primary_value, m.multiplier, m.opm, m.label
        );
    }
    for point in game.chart().points() {
        println!("  {} +{:.0}", point.label, point.delta);
    }
    Ok(())
}
