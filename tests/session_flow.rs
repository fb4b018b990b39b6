mod common;

use abyssal_vault::config::VaultConfig;
use abyssal_vault::error::{NotFound, VaultError};
use abyssal_vault::hooks::SkipReason;
use abyssal_vault::models::item::ItemClass;
use abyssal_vault::models::types::{AccountId, ItemEntry};
use abyssal_vault::protocol::VaultMessage;
use abyssal_vault::Acquisition;
use common::*;

const ACC: AccountId = AccountId(7);

#[tokio::test]
async fn session_start_pushes_full_sync() {
    let h = Harness::new();
    h.ledger.seed(ACC, LINEN, 12);
    h.ledger.seed(ACC, ORE, 3);

    let session = h.registry.on_session_start(ACC).await.unwrap();
    assert!(h.registry.vault.is_loaded(ACC));

    let messages = h.transport.messages(session, &h.registry);
    assert_eq!(
        messages,
        vec![VaultMessage::Sync(vec![(LINEN, 12), (ORE, 3)])]
    );
}

#[tokio::test]
async fn empty_vault_syncs_empty_payload() {
    let h = Harness::new();
    let session = h.registry.on_session_start(ACC).await.unwrap();
    let raw = h.transport.take();
    assert_eq!(raw, vec![(session, "ABYS\tSYNC:".to_string())]);
}

#[tokio::test]
async fn acquired_trade_goods_are_deposited_on_tick() {
    let h = Harness::new();
    let session = h.login(ACC, &[(LINEN, 5)]).await;
    let mut player = FakePlayer::new(16);

    let looted = player.give(LINEN, 8)[0];
    let verdict = h.registry.on_item_acquired(session, &player, looted).unwrap();
    assert_eq!(verdict, Acquisition::Queued);

    // Nothing moves inside the acquisition event itself
    assert_eq!(player.item_count_of(LINEN), 8);
    assert_eq!(h.vault(ACC, LINEN), 5);

    let deposited = h.registry.on_periodic_tick(session, &mut player).unwrap();
    assert_eq!(deposited.len(), 1);
    assert_eq!(player.item_count_of(LINEN), 0);
    assert_eq!(h.vault(ACC, LINEN), 13);
    assert_eq!(h.row(ACC, LINEN).await, Some(13));

    let messages = h.transport.messages(session, &h.registry);
    assert_eq!(messages, vec![VaultMessage::Update { entry: LINEN, count: 13 }]);
}

#[tokio::test]
async fn tick_clamps_to_what_is_still_held() {
    let h = Harness::new();
    let session = h.login(ACC, &[]).await;
    let mut player = FakePlayer::new(16);

    let ore = player.give(ORE, 10)[0];
    h.registry.on_item_acquired(session, &player, ore).unwrap();
    let linen = player.give(LINEN, 4)[0];
    h.registry.on_item_acquired(session, &player, linen).unwrap();

    // Traded away some ore and all the linen before the tick
    player.lose(ORE, 7);
    player.lose(LINEN, 4);

    let deposited = h.registry.on_periodic_tick(session, &mut player).unwrap();
    assert_eq!(deposited.len(), 1);
    assert_eq!(h.vault(ACC, ORE), 3);
    assert_eq!(h.vault(ACC, LINEN), 0);
    assert_eq!(h.row(ACC, LINEN).await, None);

    // The queue is drained
    assert!(h.registry.on_periodic_tick(session, &mut player).unwrap().is_empty());
}

#[tokio::test]
async fn ineligible_items_stay_in_bags() {
    let h = Harness::new();
    let session = h.login(ACC, &[]).await;
    let mut player = FakePlayer::new(16).with_quest_item(QUEST_ITEM);

    let sword = player.give(SWORD, 1)[0];
    let letter = player.give(QUEST_ITEM, 1)[0];
    let unknown = player.give(ItemEntry(999_999), 1)[0];

    for stack in [sword, letter, unknown] {
        assert_eq!(
            h.registry.on_item_acquired(session, &player, stack).unwrap(),
            Acquisition::Skipped(SkipReason::NotEligible)
        );
    }
    assert!(h.registry.on_periodic_tick(session, &mut player).unwrap().is_empty());
}

#[tokio::test]
async fn category_whitelist_is_configurable() {
    let h = Harness::with_config(VaultConfig {
        auto_store_categories: vec![ItemClass::Weapon],
        ..VaultConfig::default()
    });
    let session = h.login(ACC, &[]).await;
    let mut player = FakePlayer::new(16);

    let sword = player.give(SWORD, 1)[0];
    assert_eq!(h.registry.on_item_acquired(session, &player, sword).unwrap(), Acquisition::Queued);
    let linen = player.give(LINEN, 1)[0];
    assert_eq!(
        h.registry.on_item_acquired(session, &player, linen).unwrap(),
        Acquisition::Skipped(SkipReason::NotEligible)
    );
}

#[tokio::test]
async fn sessions_of_one_account_share_the_vault_until_the_last_logs_out() {
    let h = Harness::new();
    let first = h.login(ACC, &[(ORE, 4)]).await;
    let second = h.registry.on_session_start(ACC).await.unwrap();
    assert_eq!(h.registry.account_session_count(ACC), 2);

    let mut player = FakePlayer::new(16);
    h.registry.on_session_end(first, &mut player).unwrap();
    assert!(h.registry.vault.is_loaded(ACC), "other session still online");
    assert_eq!(h.vault(ACC, ORE), 4);

    h.registry.on_session_end(second, &mut player).unwrap();
    assert!(!h.registry.vault.is_loaded(ACC));
    assert_eq!(h.registry.account_session_count(ACC), 0);
    assert_eq!(h.registry.session_count(), 0);

    assert_eq!(
        h.registry.on_periodic_tick(second, &mut player),
        Err(VaultError::NotFound(NotFound::Session(second)))
    );
}

#[tokio::test]
async fn logout_revaults_materialized_leftovers() {
    let h = Harness::new();
    let session = h.login(ACC, &[(ORE, 25)]).await;
    let mut player = FakePlayer::new(16);

    let check = h.registry.on_quest_complete_check(session, &mut player, DELIVERY);
    assert!(check.allows());
    assert_eq!(player.item_count_of(ORE), 10);
    assert_eq!(h.vault(ACC, ORE), 15);

    let returned = h.registry.on_session_end(session, &mut player).unwrap();
    assert_eq!(returned.len(), 1);
    assert_eq!(player.item_count_of(ORE), 0);
    assert_eq!(h.row(ACC, ORE).await, Some(25));

    // Next login starts from the store
    let again = h.registry.on_session_start(ACC).await.unwrap();
    assert_eq!(h.vault(ACC, ORE), 25);
    assert_eq!(h.transport.mirror(again, &h.registry).count(ORE), 25);
}

#[tokio::test]
async fn disabled_feature_turns_hooks_off() {
    let h = Harness::new();
    let session = h.login(ACC, &[(LINEN, 2)]).await;
    let mut player = FakePlayer::new(16);
    let linen = player.give(LINEN, 3)[0];

    h.registry.set_enabled(false);
    assert_eq!(h.registry.on_item_acquired(session, &player, linen), Err(VaultError::Disabled));
    assert_eq!(h.registry.on_periodic_tick(session, &mut player), Err(VaultError::Disabled));
    assert!(matches!(
        h.registry.on_session_start(AccountId(8)).await,
        Err(VaultError::Disabled)
    ));
    let check = h.registry.on_spell_cast_check(session, &mut player, BANDAGE);
    assert!(check.allows());

    h.registry.set_enabled(true);
    assert_eq!(h.registry.on_item_acquired(session, &player, linen), Ok(Acquisition::Queued));
}

#[tokio::test]
async fn failed_durable_writes_are_counted() {
    let h = Harness::new();
    let session = h.login(ACC, &[]).await;
    let mut player = FakePlayer::new(16);

    h.ledger.set_fail_writes(true);
    let linen = player.give(LINEN, 3)[0];
    h.registry.on_item_acquired(session, &player, linen).unwrap();
    h.registry.on_periodic_tick(session, &mut player).unwrap();

    // Memory keeps the deposit, the row never made it
    assert_eq!(h.vault(ACC, LINEN), 3);
    assert_eq!(h.row(ACC, LINEN).await, None);
    assert_eq!(h.registry.vault.ledger().failed_writes(), 1);
}

#[tokio::test]
async fn full_vault_entry_leaves_the_surplus_in_the_bags() {
    let h = Harness::new();
    let session = h.login(ACC, &[(ORE, u32::MAX - 2)]).await;
    let mut player = FakePlayer::new(16);

    let ore = player.give(ORE, 5)[0];
    h.registry.on_item_acquired(session, &player, ore).unwrap();

    let deposited = h.registry.on_periodic_tick(session, &mut player).unwrap();
    assert_eq!(deposited.len(), 1);
    assert_eq!(deposited[0].count, 2);
    assert_eq!(player.item_count_of(ORE), 3);
    assert_eq!(h.vault(ACC, ORE), u32::MAX);
    assert_eq!(h.row(ACC, ORE).await, Some(u32::MAX));
    assert_eq!(h.registry.vault.ledger().failed_writes(), 0);

    // Still loadable after a round trip through the store
    h.registry.on_session_end(session, &mut player).unwrap();
    h.registry.on_session_start(ACC).await.unwrap();
    assert_eq!(h.vault(ACC, ORE), u32::MAX);
}
