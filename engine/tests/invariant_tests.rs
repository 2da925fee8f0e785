#![allow(clippy::unwrap_used)]

mod common;

use common::*;
use mlm_common::{
    amount::units,
    participant::{ParticipantId, Position, Registration},
    sale::SaleEvent,
    time::SECONDS_PER_DAY,
};
use mlm_engine::core::storage::{ParticipantProvider, RewardProvider, TeamSalesProvider};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Joiner {
    parent_hint: usize,
    sponsored_by_parent: bool,
}

#[derive(Debug, Clone)]
struct Purchase {
    buyer_hint: usize,
    whole_amount: u64,
    repurchase: bool,
    day: u64,
}

fn joiner() -> impl Strategy<Value = Joiner> {
    (any::<usize>(), any::<bool>()).prop_map(|(parent_hint, sponsored_by_parent)| Joiner {
        parent_hint,
        sponsored_by_parent,
    })
}

fn purchase() -> impl Strategy<Value = Purchase> {
    (any::<usize>(), 100u64..60_000, any::<bool>(), 0u64..3).prop_map(
        |(buyer_hint, whole_amount, repurchase, day)| Purchase {
            buyer_hint,
            whole_amount,
            repurchase,
            day,
        },
    )
}

async fn run_scenario(joiners: Vec<Joiner>, purchases: Vec<Purchase>) {
    let engine = new_engine();
    engine.register_root(1, "root".into(), DAY_ONE).await.unwrap();
    let mut ids: Vec<ParticipantId> = vec![1];

    for (i, joiner) in joiners.into_iter().enumerate() {
        let id = i as ParticipantId + 2;
        // first participant with a free slot, starting at the hint
        let mut parent = None;
        for offset in 0..ids.len() {
            let candidate = ids[(joiner.parent_hint % ids.len() + offset) % ids.len()];
            if engine.get_participant(candidate).await.unwrap().free_slot().is_some() {
                parent = Some(candidate);
                break;
            }
        }
        let parent = parent.unwrap();
        let sponsor = if joiner.sponsored_by_parent { parent } else { 1 };
        engine
            .on_distributor_signup(Registration {
                id,
                name: format!("member-{}", id),
                sponsor,
                parent,
                timestamp: DAY_ONE,
            })
            .await
            .unwrap();
        ids.push(id);
    }

    for (order, purchase) in purchases.into_iter().enumerate() {
        let buyer = ids[purchase.buyer_hint % ids.len()];
        let previous = engine.storage().await.get_participant(buyer).await.unwrap();
        let sale = SaleEvent {
            order_id: order as u64,
            buyer,
            amount: units(purchase.whole_amount),
            is_repurchase: purchase.repurchase,
            point_base: units(purchase.whole_amount / 10),
            timestamp: DAY_ONE + purchase.day * SECONDS_PER_DAY,
        };
        engine.on_sale_approved(sale).await.unwrap();

        let current = engine.get_participant(buyer).await.unwrap();
        assert!(current.rank >= previous.rank);
        assert!(current.last_rank_awarded >= previous.last_rank_awarded);
    }

    let storage = engine.storage().await;
    let participants = storage.get_all_participants().await.unwrap();
    assert_eq!(participants.len(), ids.len());

    for participant in &participants {
        assert!(participant.last_rank_awarded <= participant.rank);

        // child slots point back to their parent
        for position in [Position::Left, Position::Right] {
            if let Some(child) = participant.child_at(position) {
                let child = storage.get_participant(child).await.unwrap();
                assert_eq!(child.parent, Some(participant.id));
                assert_eq!(child.position, Some(position));
            }
        }

        if let Some(progress) = storage.get_team_sales_progress(participant.id).await.unwrap() {
            assert!(progress.matched_volume_consumed <= progress.matched_volume());
            for payout in storage.get_reward_payouts(participant.id).await.unwrap() {
                assert!(payout.milestone <= progress.matched_volume_consumed);
            }
        }
    }

    // no two children claim the same slot
    for position in [Position::Left, Position::Right] {
        for participant in &participants {
            let claimed = participants
                .iter()
                .filter(|p| p.parent == Some(participant.id) && p.position == Some(position))
                .count();
            assert!(claimed <= 1);
        }
    }
    drop(storage);

    assert!(engine.audit_all().await.unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_cascade_invariants(
        joiners in prop::collection::vec(joiner(), 1..12),
        purchases in prop::collection::vec(purchase(), 1..30),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(run_scenario(joiners, purchases));
    }
}
