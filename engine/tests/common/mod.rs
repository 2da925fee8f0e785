// Shared helpers of the engine integration tests

#![allow(dead_code)]

use mlm_common::{
    amount::{units, Amount},
    participant::{Participant, ParticipantId, Registration},
    plan::CompensationPlan,
    sale::{CascadeReport, OrderId, SaleEvent},
    time::TimestampSeconds,
};
use mlm_engine::{
    config::EngineConfig,
    core::storage::{MemoryStorage, Storage},
    Engine,
};

pub type TestEngine = Engine<MemoryStorage>;

// Noon of the first day
pub const DAY_ONE: TimestampSeconds = 43_200;

pub fn new_engine() -> TestEngine {
    Engine::new(
        MemoryStorage::in_memory(),
        CompensationPlan::default(),
        EngineConfig::default(),
    )
    .unwrap()
}

pub async fn signup<S: Storage>(
    engine: &Engine<S>,
    id: ParticipantId,
    sponsor: ParticipantId,
    parent: ParticipantId,
) -> Participant {
    engine
        .on_distributor_signup(Registration {
            id,
            name: format!("member-{}", id),
            sponsor,
            parent,
            timestamp: DAY_ONE,
        })
        .await
        .unwrap()
}

pub fn sale(order_id: OrderId, buyer: ParticipantId, whole_amount: u64) -> SaleEvent {
    SaleEvent {
        order_id,
        buyer,
        amount: units(whole_amount),
        is_repurchase: false,
        point_base: 0,
        timestamp: DAY_ONE,
    }
}

pub fn repurchase(
    order_id: OrderId,
    buyer: ParticipantId,
    whole_amount: u64,
    points: u64,
) -> SaleEvent {
    SaleEvent {
        is_repurchase: true,
        point_base: units(points),
        ..sale(order_id, buyer, whole_amount)
    }
}

pub async fn sell<S: Storage>(
    engine: &Engine<S>,
    order_id: OrderId,
    buyer: ParticipantId,
    whole_amount: u64,
) -> CascadeReport {
    engine
        .on_sale_approved(sale(order_id, buyer, whole_amount))
        .await
        .unwrap()
}

pub async fn balance<S: Storage>(engine: &Engine<S>, id: ParticipantId) -> Amount {
    engine.get_participant(id).await.unwrap().commission_balance
}

/// Sponsor S (1) at the root, P (2) under it, B (3) on P's left and R (4) on
/// P's right. B is sponsored by S, R by P.
pub async fn sponsor_and_legs() -> TestEngine {
    let engine = new_engine();
    engine.register_root(1, "sponsor".into(), DAY_ONE).await.unwrap();
    signup(&engine, 2, 1, 1).await;
    signup(&engine, 3, 1, 2).await;
    signup(&engine, 4, 2, 2).await;
    engine
}
