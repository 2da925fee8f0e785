#![allow(clippy::unwrap_used)]

mod common;

use common::*;
use mlm_common::{
    amount::units,
    ledger::CommissionReason,
    participant::Position,
    plan::CompensationPlan,
    rank::Rank,
    time::SECONDS_PER_DAY,
};
use mlm_engine::{
    config::EngineConfig,
    core::{
        error::EngineError,
        storage::{MemoryStorage, OrderProvider, ParticipantProvider},
    },
    Engine,
};

#[tokio::test]
async fn test_sale_pays_sponsor_binary_and_matching() {
    let engine = sponsor_and_legs().await;

    // P becomes Beginner, R fills P's right leg
    sell(&engine, 1, 2, 5_000).await;
    sell(&engine, 2, 4, 5_000).await;
    let p = engine.get_participant(2).await.unwrap();
    assert_eq!(p.rank, Rank::Beginner);
    assert_eq!(p.right_leg_volume, units(5_000));

    let report = sell(&engine, 3, 3, 10_000).await;

    assert_eq!(
        report.amounts_for(CommissionReason::DirectSponsorBonus),
        vec![(1, units(1_000))]
    );
    assert_eq!(
        report.amounts_for(CommissionReason::BinaryCommission),
        vec![(2, units(600))]
    );
    assert_eq!(
        report.amounts_for(CommissionReason::MatchingBonus),
        vec![(1, units(60))]
    );
    assert_eq!(report.credited_to(1), units(1_060));
    assert_eq!(report.total_distributed, units(1_660));

    // one pair consumed from both legs
    let p = engine.get_participant(2).await.unwrap();
    assert_eq!(p.left_leg_volume, units(5_000));
    assert_eq!(p.right_leg_volume, 0);

    assert!(engine.audit_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_indirect_sponsor_ladder() {
    let engine = new_engine();
    engine.register_root(1, "root".into(), DAY_ONE).await.unwrap();
    // straight sponsor line 1 <- 2 <- ... <- 8
    for id in 2..=8 {
        signup(&engine, id, id - 1, id - 1).await;
    }

    let report = sell(&engine, 1, 8, 10_000).await;
    assert_eq!(
        report.amounts_for(CommissionReason::DirectSponsorBonus),
        vec![(7, units(1_000))]
    );
    let indirect: Vec<_> = (1..=5)
        .flat_map(|level| report.amounts_for(CommissionReason::IndirectSponsorBonus(level)))
        .collect();
    assert_eq!(
        indirect,
        vec![
            (6, units(500)),
            (5, units(300)),
            (4, units(200)),
            (3, units(100)),
            (2, units(100)),
        ]
    );
    // the root is six levels up and gets nothing
    assert_eq!(report.credited_to(1), 0);
}

#[tokio::test]
async fn test_sponsor_bonus_rounds_half_away_from_zero() {
    let engine = sponsor_and_legs().await;
    let mut sale = sale(1, 3, 0);
    // 10% of 0.05 is 0.005
    sale.amount = 5;
    let report = engine.on_sale_approved(sale).await.unwrap();
    assert_eq!(report.amounts_for(CommissionReason::DirectSponsorBonus), vec![(1, 1)]);
}

#[tokio::test]
async fn test_daily_cap_throttles_binary_commission() {
    let engine = sponsor_and_legs().await;
    sell(&engine, 1, 2, 5_000).await;
    sell(&engine, 2, 4, 125_000).await;

    // 25 pairs at once go over the Beginner cap of 12 000
    let report = sell(&engine, 3, 3, 125_000).await;
    assert_eq!(
        report.amounts_for(CommissionReason::BinaryCommission),
        vec![(2, units(15_000))]
    );
    let p = engine.get_participant(2).await.unwrap();
    assert_eq!((p.left_leg_volume, p.right_leg_volume), (0, 0));

    // same day: legs are reset and nothing more is paid
    sell(&engine, 4, 4, 10_000).await;
    let report = sell(&engine, 5, 3, 10_000).await;
    assert!(report.amounts_for(CommissionReason::BinaryCommission).is_empty());
    let p = engine.get_participant(2).await.unwrap();
    assert_eq!((p.left_leg_volume, p.right_leg_volume), (0, 0));

    // next day pairing resumes
    let mut next = sale(6, 4, 5_000);
    next.timestamp = DAY_ONE + SECONDS_PER_DAY;
    engine.on_sale_approved(next).await.unwrap();
    let mut next = sale(7, 3, 5_000);
    next.timestamp = DAY_ONE + SECONDS_PER_DAY;
    let report = engine.on_sale_approved(next).await.unwrap();
    assert_eq!(
        report.amounts_for(CommissionReason::BinaryCommission),
        vec![(2, units(600))]
    );
}

#[tokio::test]
async fn test_rank_none_never_accumulates_leg_volume() {
    let engine = sponsor_and_legs().await;
    sell(&engine, 1, 4, 5_000).await;
    sell(&engine, 2, 3, 5_000).await;

    // P has no purchases: cap 0 resets its legs after every sale
    let p = engine.get_participant(2).await.unwrap();
    assert_eq!(p.rank, Rank::None);
    assert_eq!((p.left_leg_volume, p.right_leg_volume), (0, 0));
    assert_eq!(balance(&engine, 2).await, units(500));
}

#[tokio::test]
async fn test_leadership_and_rank_bonuses_are_paid_once() {
    let engine = sponsor_and_legs().await;
    sell(&engine, 1, 2, 30_000).await;
    assert_eq!(engine.get_participant(2).await.unwrap().rank, Rank::Zonal);

    let report = sell(&engine, 2, 4, 1_000).await;
    assert_eq!(
        report.amounts_for(CommissionReason::LeadershipBonus),
        vec![(2, units(5_000))]
    );
    assert_eq!(
        report.amounts_for(CommissionReason::RankAchievementBonus(Rank::Zonal)),
        vec![(2, units(5_000))]
    );
    let p = engine.get_participant(2).await.unwrap();
    assert!(p.leadership_bonus_given);
    assert!(p.rank_bonus_given);
    assert_eq!(p.last_rank_awarded, Rank::Zonal);

    let report = sell(&engine, 3, 4, 1_000).await;
    // direct sponsor bonus only
    assert_eq!(report.credited_to(2), units(100));

    // reaching Regional pays the next rank bonus but no second leadership bonus
    sell(&engine, 4, 2, 30_000).await;
    let report = sell(&engine, 5, 4, 1_000).await;
    assert!(report.amounts_for(CommissionReason::LeadershipBonus).is_empty());
    assert_eq!(
        report.amounts_for(CommissionReason::RankAchievementBonus(Rank::Regional)),
        vec![(2, units(10_000))]
    );
    let p = engine.get_participant(2).await.unwrap();
    assert_eq!(p.last_rank_awarded, Rank::Regional);
    assert!(p.last_rank_awarded <= p.rank);
    assert!(engine.reconcile(2).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_duplicate_sale_is_rejected() {
    let engine = sponsor_and_legs().await;
    sell(&engine, 1, 3, 10_000).await;

    let err = engine.on_sale_approved(sale(1, 3, 10_000)).await.unwrap_err();
    assert!(matches!(err, EngineError::DuplicateSale(1)));
    assert_eq!(balance(&engine, 1).await, units(1_000));
}

#[tokio::test]
async fn test_failed_cascade_leaves_no_trace() {
    let engine = sponsor_and_legs().await;

    // break P's parent edge behind the engine's back
    let mut p = engine.get_participant(2).await.unwrap();
    p.parent = Some(99);
    engine.storage_mut().await.set_participant(&p).await.unwrap();

    let err = engine.on_sale_approved(sale(1, 3, 10_000)).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(99)));

    // the sponsor bonus credited before the failure was rolled back
    assert_eq!(balance(&engine, 1).await, 0);
    assert!(engine.get_commission_entries(1).await.unwrap().is_empty());
    assert!(!engine.storage().await.has_order(1).await.unwrap());
    assert_eq!(engine.get_participant(3).await.unwrap().rank, Rank::None);

    // once fixed, the same order pays exactly once
    p.parent = Some(1);
    engine.storage_mut().await.set_participant(&p).await.unwrap();
    let report = engine.on_sale_approved(sale(1, 3, 10_000)).await.unwrap();
    assert_eq!(report.credited_to(1), units(1_000));
    assert!(matches!(
        engine.on_sale_approved(sale(1, 3, 10_000)).await,
        Err(EngineError::DuplicateSale(1))
    ));
    assert_eq!(balance(&engine, 1).await, units(1_000));
    assert_eq!(
        engine.get_participant(2).await.unwrap().position,
        Some(Position::Left)
    );
}

#[tokio::test]
async fn test_unknown_buyer() {
    let engine = sponsor_and_legs().await;
    assert!(matches!(
        engine.on_sale_approved(sale(1, 42, 100)).await,
        Err(EngineError::NotFound(42))
    ));
    assert!(!engine.storage().await.has_order(1).await.unwrap());
}

#[tokio::test]
async fn test_walk_bound_rolls_back_cascade() {
    let config = EngineConfig {
        max_walk_depth: 2,
        ..EngineConfig::default()
    };
    let engine =
        Engine::new(MemoryStorage::in_memory(), CompensationPlan::default(), config).unwrap();
    engine.register_root(1, "root".into(), DAY_ONE).await.unwrap();
    for id in 2..=5 {
        signup(&engine, id, id - 1, id - 1).await;
    }

    // 5 has four sponsors above it, more than the walk may take
    let err = engine.on_sale_approved(sale(1, 5, 10_000)).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::WalkDepthExceeded {
            start: 5,
            max_depth: 2
        }
    ));
    assert!(!engine.storage().await.has_order(1).await.unwrap());
    for id in 1..=5 {
        assert_eq!(balance(&engine, id).await, 0);
    }

    // two levels up fit in the bound
    let report = sell(&engine, 2, 3, 10_000).await;
    assert_eq!(report.credited_to(2), units(1_000));
    assert_eq!(report.credited_to(1), units(500));
}
