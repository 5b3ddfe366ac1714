#![deny(warnings)]

//! Headless Bevy HUD: ticks the game and formats the widget text a renderer
//! would draw.

use bevy_ecs::prelude::*;
use overhead_core::{GameConfig, GameModule, Pools};
use overhead_econ::PurchaseError;
use overhead_modules::MailPhase;
use overhead_runtime::{ActionError, Game, Milestone, MilestoneReached, Upgrade};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(16);
const BAR_WIDTH: usize = 20;
const MAX_NOTICES: usize = 5;

#[derive(Resource)]
struct Session {
    game: Game,
    paused: bool,
}

/// Buttons pressed since the last frame.
#[derive(Clone, Copy, Debug, PartialEq)]
enum HudAction {
    ToggleMail(usize),
    SelectAll,
    ReplyAll,
    StartCorporation,
    StartWorld,
    BuyCounter,
    UpgradeStep,
    #[cfg_attr(not(test), allow(dead_code))]
    Buy(Upgrade),
}

#[derive(Resource, Default)]
struct PendingActions(Vec<HudAction>);

/// Text for every widget, rebuilt each frame.
#[derive(Resource, Default, Debug)]
struct HudText {
    money: String,
    output: String,
    progress_bar: String,
    modules: Vec<String>,
    mailbox: String,
    document: String,
    banner: Option<String>,
    notices: Vec<String>,
    milestones_seen: usize,
}

fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "[{}{}] {:.1}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent
    )
}

fn notice_for(error: &ActionError) -> String {
    match error {
        ActionError::Purchase(PurchaseError::InsufficientFunds { .. }) => {
            "Not enough funds!".to_string()
        }
        other => other.to_string(),
    }
}

fn apply(game: &mut Game, action: HudAction) -> Result<(), ActionError> {
    match action {
        HudAction::ToggleMail(i) => game.toggle_mail(i).map(|_| ()),
        HudAction::SelectAll => game.select_all_mail(),
        HudAction::ReplyAll => game.reply_all(),
        HudAction::StartCorporation => game.start_corporation(),
        HudAction::StartWorld => game.start_world(),
        HudAction::BuyCounter => game.buy_counter().map(|_| ()),
        HudAction::UpgradeStep => game.upgrade_step().map(|_| ()),
        HudAction::Buy(upgrade) => game.purchase(upgrade),
    }
}

fn input_system(
    mut session: ResMut<Session>,
    mut pending: ResMut<PendingActions>,
    mut hud: ResMut<HudText>,
) {
    for action in pending.0.drain(..) {
        if let Err(e) = apply(&mut session.game, action) {
            hud.notices.push(notice_for(&e));
        }
    }
    let excess = hud.notices.len().saturating_sub(MAX_NOTICES);
    if excess > 0 {
        let kept = hud.notices.split_off(excess);
        hud.notices = kept;
    }
}

fn tick_system(mut session: ResMut<Session>) {
    if !session.paused {
        session.game.advance(FRAME);
    }
}

fn milestone_text(m: &MilestoneReached) -> String {
    match m.milestone {
        Milestone::CorporationUnlocked => "Corporation unlocked!".to_string(),
        Milestone::WorldUnlocked => "World unlocked!".to_string(),
        Milestone::Won => "You have generated enough overhead. You win!".to_string(),
    }
}

fn render_system(session: Res<Session>, mut hud: ResMut<HudText>) {
    let game = &session.game;
    hud.money = format!("Money: ${}", game.money().round_dp(2));
    hud.output = format!("Overhead: {:.0}", game.output_value());
    hud.progress_bar = progress_bar(game.progress());

    let modules: [&dyn GameModule; 3] = [game.mailbox(), game.corporation(), game.world()];
    hud.modules = modules
        .iter()
        .filter(|m| m.is_unlocked())
        .map(|m| {
            let metrics = m.metrics();
            format!("{}: {} ({:.0} OPM)", metrics.name, metrics.label, metrics.opm)
        })
        .collect();

    hud.mailbox = match game.mailbox().phase() {
        MailPhase::Syncing { seconds_left } => {
            format!("Synchronizing... {seconds_left}s")
        }
        MailPhase::Ready => "Reply All".to_string(),
        MailPhase::Selecting { remaining } => format!("{remaining} mails to check"),
    };

    hud.document = match game.corporation().document() {
        Some(doc) => format!(
            "{} {} | signed {}/{} | scope creep {}%",
            doc.title,
            doc.version,
            doc.current_signature_index,
            doc.signatories.len(),
            doc.scope_creep
        ),
        None => String::new(),
    };
    hud.banner = game
        .corporation()
        .wasted_banner()
        .map(|hours| format!("{hours:.0} hours wasted!"));

    let milestones = &game.state().milestones;
    let fresh: Vec<String> = milestones[hud.milestones_seen..]
        .iter()
        .map(milestone_text)
        .collect();
    hud.milestones_seen = milestones.len();
    hud.notices.extend(fresh);
}

/// Scripted player for the headless demo: works the inbox by hand, opens
/// modules as they unlock and dabbles in counters.
fn autopilot_system(session: Res<Session>, mut pending: ResMut<PendingActions>) {
    let game = &session.game;
    let mailbox = game.mailbox();
    match mailbox.phase() {
        MailPhase::Selecting { .. } if mailbox.upgrades().select_all => {
            pending.0.push(HudAction::SelectAll)
        }
        MailPhase::Selecting { .. } => pending.0.extend(
            mailbox
                .mails()
                .iter()
                .enumerate()
                .filter(|(_, m)| !m.checked)
                .map(|(i, _)| HudAction::ToggleMail(i)),
        ),
        MailPhase::Ready => pending.0.push(HudAction::ReplyAll),
        MailPhase::Syncing { .. } => {}
    }
    if game.corporation().is_unlocked() && !game.corporation().is_started() {
        pending.0.push(HudAction::StartCorporation);
    }
    if game.world().is_unlocked() && !game.world().is_active() {
        pending.0.push(HudAction::StartWorld);
    }
    if game.counters().values().is_empty() && game.money() >= game.config().counters.counter_cost {
        pending.0.push(HudAction::BuyCounter);
        pending.0.push(HudAction::UpgradeStep);
    }
}

fn build_world(game: Game) -> (World, Schedule) {
    let mut world = World::new();
    world.insert_resource(Session {
        game,
        paused: false,
    });
    world.insert_resource(PendingActions::default());
    world.insert_resource(HudText::default());
    let mut schedule = Schedule::default();
    schedule.add_systems((input_system, tick_system, render_system).chain());
    (world, schedule)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let game = Game::new(GameConfig::default(), Pools::default())?;
    let (mut world, mut schedule) = build_world(game);
    schedule.add_systems(autopilot_system.before(input_system));
    // One simulated minute, no run loop: headless demo.
    for _ in 0..(60_000 / FRAME.as_millis()) {
        schedule.run(&mut world);
    }
    let hud = world.resource::<HudText>();
    info!(notices = hud.notices.len(), "hud ready");
    println!("game-frontend: {} | {} | {}", hud.money, hud.output, hud.progress_bar);
    for line in &hud.modules {
        println!("  {line}");
    }
    println!("  mailbox: {}", hud.mailbox);
    if !hud.document.is_empty() {
        println!("  document: {}", hud.document);
    }
    if let Some(banner) = &hud.banner {
        println!("  {banner}");
    }
    for notice in &hud.notices {
        println!("  ! {notice}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use overhead_modules::MailboxUpgrade;

    fn world() -> (World, Schedule) {
        build_world(Game::new(GameConfig::default(), Pools::default()).unwrap())
    }

    #[test]
    fn smoke_initializes_and_ticks_once() {
        let (mut world, mut schedule) = world();
        schedule.run(&mut world);
        let hud = world.resource::<HudText>();
        assert_eq!(hud.money, "Money: $0");
        assert_eq!(hud.mailbox, "5 mails to check");
        assert_eq!(hud.modules.len(), 1);
        assert_eq!(world.resource::<Session>().game.clock(), FRAME);
    }

    #[test]
    fn refused_purchase_shows_a_notice() {
        let (mut world, mut schedule) = world();
        world
            .resource_mut::<PendingActions>()
            .0
            .push(HudAction::Buy(Upgrade::Mailbox(MailboxUpgrade::AutoMail)));
        schedule.run(&mut world);
        let hud = world.resource::<HudText>();
        assert_eq!(hud.notices, vec!["Not enough funds!".to_string()]);
        assert_eq!(
            notice_for(&ActionError::Purchase(PurchaseError::AlreadyOwned)),
            "upgrade already purchased"
        );
    }

    #[test]
    fn replying_starts_the_sync_countdown() {
        let (mut world, mut schedule) = world();
        {
            let mut pending = world.resource_mut::<PendingActions>();
            pending.0.extend((0..5).map(HudAction::ToggleMail));
            pending.0.push(HudAction::ReplyAll);
        }
        schedule.run(&mut world);
        assert_eq!(world.resource::<HudText>().mailbox, "Synchronizing... 10s");
    }

    #[test]
    fn paused_session_does_not_advance() {
        let (mut world, mut schedule) = world();
        world.resource_mut::<Session>().paused = true;
        schedule.run(&mut world);
        assert_eq!(world.resource::<Session>().game.clock(), Duration::ZERO);
        assert_eq!(progress_bar(50.0), "[##########..........] 50.0%");
    }
}
