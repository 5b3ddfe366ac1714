use criterion::{criterion_group, criterion_main, Criterion};
use std::time::Duration;

use overhead_modules::MailboxUpgrade;
use overhead_runtime::{Game, Upgrade};

fn bench_ticks(c: &mut Criterion) {
    let cfg = overhead_core::GameConfig {
        starting_money: rust_decimal::Decimal::new(5_000, 0),
        ..overhead_core::GameConfig::default()
    };
    let mut game = Game::new(cfg, overhead_core::Pools::default()).unwrap();
    game.purchase(Upgrade::Mailbox(MailboxUpgrade::AutoMail))
        .unwrap();
    game.purchase(Upgrade::Mailbox(MailboxUpgrade::FasterAutoMail))
        .unwrap();
    game.buy_counter().unwrap();
    c.bench_function("advance_one_second", |b| {
        b.iter(|| {
            game.advance(Duration::from_secs(1));
        })
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
