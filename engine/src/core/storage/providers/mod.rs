mod ledger;
mod order;
mod participant;
mod reward;
mod snapshot;
mod team_sales;

pub use self::{
    ledger::LedgerProvider, order::OrderProvider, participant::ParticipantProvider,
    reward::RewardProvider, snapshot::SnapshotProvider, team_sales::TeamSalesProvider,
};
