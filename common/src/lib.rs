// Shared types of the MLM compensation engine
//
// Everything here is plain data: records stored by the engine, the
// compensation plan tables and the helpers to compute with amounts.

#![allow(clippy::too_many_arguments)]

pub mod amount;
pub mod ledger;
pub mod milestone;
pub mod participant;
pub mod plan;
pub mod rank;
pub mod sale;
pub mod time;

pub use amount::{apply_bps, format_amount, parse_amount, units, Amount, AmountError, BasisPoints};
pub use participant::{ParticipantId, Position};
pub use rank::Rank;
