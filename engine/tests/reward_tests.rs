#![allow(clippy::unwrap_used)]

mod common;

use common::*;
use mlm_common::{amount::units, ledger::CommissionReason, milestone::Fund, rank::Rank};

/// Sponsor line 1 <- 2 <- ... <- 6, each one placed under its sponsor.
/// Everybody bought enough to be Beginner.
async fn beginner_line() -> TestEngine {
    let engine = new_engine();
    engine.register_root(1, "root".into(), DAY_ONE).await.unwrap();
    for id in 2..=6 {
        signup(&engine, id, id - 1, id - 1).await;
    }
    for id in 1..=6 {
        sell(&engine, id, id, 5_000).await;
    }
    for id in 1..=6 {
        assert_eq!(engine.get_participant(id).await.unwrap().rank, Rank::Beginner);
    }
    engine
}

fn repurchase_payments(
    report: &mlm_common::sale::CascadeReport,
) -> Vec<Vec<(u64, u64)>> {
    (0..6)
        .map(|level| report.amounts_for(CommissionReason::RepurchaseCommission(level)))
        .collect()
}

#[tokio::test]
async fn test_repurchase_is_gated_by_each_rank() {
    let engine = beginner_line().await;

    let report = engine
        .on_sale_approved(repurchase(7, 6, 1_000, 1_000))
        .await
        .unwrap();
    assert_eq!(
        repurchase_payments(&report),
        vec![
            vec![(6, units(100))],
            vec![(5, units(80))],
            vec![(4, units(60))],
            vec![],
            vec![],
            vec![],
        ]
    );

    // only the rank of 3 changes: it becomes Area and can earn at level 3
    sell(&engine, 8, 3, 10_000).await;
    assert_eq!(engine.get_participant(3).await.unwrap().rank, Rank::Area);

    let report = engine
        .on_sale_approved(repurchase(9, 6, 1_000, 1_000))
        .await
        .unwrap();
    let payments = repurchase_payments(&report);
    assert_eq!(payments[3], vec![(3, units(50))]);
    assert!(payments[4].is_empty());
    assert!(engine.audit_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repurchase_skips_purchaser_without_rank() {
    let engine = beginner_line().await;
    signup(&engine, 7, 6, 6).await;
    sell(&engine, 10, 7, 1_000).await;

    let report = engine
        .on_sale_approved(repurchase(11, 7, 1_000, 1_000))
        .await
        .unwrap();
    let payments = repurchase_payments(&report);
    assert!(payments[0].is_empty());
    assert_eq!(payments[1], vec![(6, units(80))]);
    assert_eq!(payments[2], vec![(5, units(60))]);
    assert!(payments[3].is_empty());
}

#[tokio::test]
async fn test_points_without_repurchase_flag() {
    let engine = beginner_line().await;
    let mut sale = sale(7, 6, 1_000);
    sale.point_base = units(1_000);
    let report = engine.on_sale_approved(sale).await.unwrap();

    assert!(repurchase_payments(&report).iter().all(Vec::is_empty));
    assert_eq!(engine.get_participant(6).await.unwrap().total_points, units(1_000));
}

#[tokio::test]
async fn test_first_milestone_without_royalty() {
    let engine = sponsor_and_legs().await;
    sell(&engine, 1, 4, 60_000).await;
    sell(&engine, 2, 3, 120_000).await;
    assert!(engine.get_reward_payouts(2).await.unwrap().is_empty());

    let report = sell(&engine, 3, 4, 50_000).await;
    assert_eq!(report.reward_payouts.len(), 1);
    let payout = &report.reward_payouts[0];
    assert_eq!(payout.participant, 2);
    assert_eq!(payout.milestone, units(100_000));
    assert_eq!(payout.rank_label, "Executive");
    assert_eq!(payout.reward, "Smart Watch");
    assert_eq!(payout.royalty_amount, 0);
    assert!(report.amounts_for(CommissionReason::RankRewardRoyalty).is_empty());

    for fund in [Fund::Travel, Fund::Car, Fund::House] {
        assert!(engine.get_fund_contributions(fund).await.unwrap().is_empty());
    }

    let progress = engine.get_team_sales_progress(2).await.unwrap();
    assert_eq!(progress.matched_volume_consumed, units(110_000));
    assert_eq!(progress.left_team_sales, units(120_000));
    assert_eq!(progress.right_team_sales, units(110_000));
}

#[tokio::test]
async fn test_milestones_fire_once_each() {
    let engine = sponsor_and_legs().await;
    sell(&engine, 1, 4, 110_000).await;
    sell(&engine, 2, 3, 520_000).await;
    assert_eq!(engine.get_reward_payouts(2).await.unwrap().len(), 1);

    // 250 000 and 500 000 are crossed by the same sale
    let report = sell(&engine, 3, 4, 400_000).await;
    let milestones: Vec<_> = report.reward_payouts.iter().map(|p| p.milestone).collect();
    assert_eq!(milestones, vec![units(250_000), units(500_000)]);
    assert_eq!(
        report.amounts_for(CommissionReason::RankRewardRoyalty),
        vec![(2, units(2_500)), (2, units(5_000))]
    );

    let travel = engine.get_fund_contributions(Fund::Travel).await.unwrap();
    assert_eq!(travel.len(), 1);
    assert_eq!(travel[0].amount, units(5_000));
    assert_eq!(travel[0].milestone, units(500_000));
    assert!(engine.get_fund_contributions(Fund::Car).await.unwrap().is_empty());

    // more volume below the next milestone pays nothing again
    let report = sell(&engine, 4, 4, 1_000).await;
    assert!(report.reward_payouts.is_empty());
    let report = sell(&engine, 5, 3, 1_000).await;
    assert!(report.reward_payouts.is_empty());

    let payouts = engine.get_reward_payouts(2).await.unwrap();
    assert_eq!(payouts.len(), 3);
    let progress = engine.get_team_sales_progress(2).await.unwrap();
    assert!(progress.matched_volume_consumed <= progress.matched_volume());
    assert_eq!(progress.matched_volume_consumed, units(511_000));
    assert!(engine.reconcile(2).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_reward_payouts_of_unknown_participant() {
    let engine = beginner_line().await;
    assert!(engine.get_reward_payouts(6).await.unwrap().is_empty());
    assert!(matches!(
        engine.get_reward_payouts(42).await,
        Err(mlm_engine::core::error::EngineError::NotFound(42))
    ));
}
