// Ledger writes
//
// Every change of a cached balance goes through this module together with
// its ledger rows, so that the balances stay a projection of the ledgers.

use log::{debug, warn};
use mlm_common::{
    amount::{format_amount, Amount},
    ledger::{
        ledger_sum, Adjustment, CommissionReason, Direction, LedgerEntry, Reconciliation,
        StatementLine, WalletStatement,
    },
    participant::{Participant, ParticipantId},
    sale::{Distribution, OrderId},
    time::{day_of, DayNumber, TimestampSeconds},
};

use super::{error::EngineError, storage::Storage};

/// A credit about to be posted
#[derive(Debug, Clone)]
pub struct Posting {
    pub amount: Amount,
    pub reason: CommissionReason,
    pub remark: String,
    pub timestamp: TimestampSeconds,
    pub order: Option<OrderId>,
}

impl Posting {
    pub fn new(
        amount: Amount,
        reason: CommissionReason,
        remark: String,
        timestamp: TimestampSeconds,
    ) -> Self {
        Self {
            amount,
            reason,
            remark,
            timestamp,
            order: None,
        }
    }

    pub fn for_order(mut self, order: OrderId) -> Self {
        self.order = Some(order);
        self
    }
}

async fn build_entry<S: Storage>(
    storage: &mut S,
    participant: ParticipantId,
    direction: Direction,
    posting: Posting,
) -> Result<LedgerEntry, EngineError> {
    let id = storage.next_entry_id().await?;
    Ok(LedgerEntry {
        id,
        participant,
        direction,
        amount: posting.amount,
        reason: posting.reason,
        remark: posting.remark,
        timestamp: posting.timestamp,
        order: posting.order,
    })
}

/// Credit a participant record held by the caller, who must store it.
///
/// The same row goes into the commission and the wallet ledger.
/// Nothing is posted for a zero amount.
pub async fn credit_participant<S: Storage>(
    storage: &mut S,
    participant: &mut Participant,
    posting: Posting,
) -> Result<Option<Distribution>, EngineError> {
    if posting.amount == 0 {
        return Ok(None);
    }

    let entry = build_entry(storage, participant.id, Direction::Credit, posting).await?;
    storage.append_commission_entry(&entry).await?;
    storage.append_wallet_entry(&entry).await?;

    participant.commission_balance = participant.commission_balance.saturating_add(entry.amount);
    participant.total_wallet_balance =
        participant.total_wallet_balance.saturating_add(entry.amount);

    if log::log_enabled!(log::Level::Debug) {
        debug!(
            "credited {} to {} ({}): {}",
            format_amount(entry.amount),
            participant.id,
            entry.reason,
            entry.remark
        );
    }

    Ok(Some(Distribution {
        recipient: participant.id,
        amount: entry.amount,
        reason: entry.reason,
    }))
}

/// Credit a participant by id, loading and storing its record
pub async fn credit<S: Storage>(
    storage: &mut S,
    participant: ParticipantId,
    posting: Posting,
) -> Result<Option<Distribution>, EngineError> {
    if posting.amount == 0 {
        return Ok(None);
    }
    let mut record = storage.get_participant(participant).await?;
    let distribution = credit_participant(storage, &mut record, posting).await?;
    storage.set_participant(&record).await?;
    Ok(distribution)
}

/// Administrative correction, posted to both ledgers
pub async fn manual_adjustment<S: Storage>(
    storage: &mut S,
    adjustment: Adjustment,
) -> Result<LedgerEntry, EngineError> {
    let mut record = storage.get_participant(adjustment.participant).await?;

    if adjustment.direction == Direction::Debit {
        let available = record.commission_balance.min(record.total_wallet_balance);
        if adjustment.amount > available {
            warn!(
                "refused debit of {} from {}",
                format_amount(adjustment.amount),
                record.id
            );
            return Err(EngineError::InsufficientFunds {
                participant: record.id,
                needed: adjustment.amount,
                available,
            });
        }
    }

    let posting = Posting::new(
        adjustment.amount,
        CommissionReason::ManualAdjustment,
        adjustment.note,
        adjustment.timestamp,
    );
    let entry = build_entry(storage, record.id, adjustment.direction, posting).await?;
    storage.append_commission_entry(&entry).await?;
    storage.append_wallet_entry(&entry).await?;

    match entry.direction {
        Direction::Credit => {
            record.commission_balance = record.commission_balance.saturating_add(entry.amount);
            record.total_wallet_balance = record.total_wallet_balance.saturating_add(entry.amount);
        }
        Direction::Debit => {
            record.commission_balance -= entry.amount;
            record.total_wallet_balance -= entry.amount;
        }
    }
    storage.set_participant(&record).await?;

    if log::log_enabled!(log::Level::Debug) {
        debug!(
            "manual {:?} of {} on {}",
            entry.direction,
            format_amount(entry.amount),
            record.id
        );
    }
    Ok(entry)
}

/// Debit the wallet only; the commission balance is left untouched
pub async fn withdraw<S: Storage>(
    storage: &mut S,
    participant: ParticipantId,
    amount: Amount,
    timestamp: TimestampSeconds,
) -> Result<LedgerEntry, EngineError> {
    let mut record = storage.get_participant(participant).await?;
    if amount > record.total_wallet_balance {
        warn!(
            "refused withdrawal of {} from {}",
            format_amount(amount),
            participant
        );
        return Err(EngineError::InsufficientFunds {
            participant,
            needed: amount,
            available: record.total_wallet_balance,
        });
    }

    let posting = Posting::new(
        amount,
        CommissionReason::Withdrawal,
        format!("Withdrawal by {}", record.name),
        timestamp,
    );
    let entry = build_entry(storage, participant, Direction::Debit, posting).await?;
    storage.append_wallet_entry(&entry).await?;

    record.total_wallet_balance -= amount;
    storage.set_participant(&record).await?;
    Ok(entry)
}

/// Binary commission earned by the participant during a UTC day
pub async fn binary_commission_on_day<S: Storage>(
    storage: &S,
    participant: ParticipantId,
    day: DayNumber,
) -> Result<Amount, EngineError> {
    Ok(storage
        .get_commission_entries(participant)
        .await?
        .iter()
        .filter(|e| {
            e.reason == CommissionReason::BinaryCommission
                && e.is_credit()
                && day_of(e.timestamp) == day
        })
        .fold(0, |total: Amount, e| total.saturating_add(e.amount)))
}

/// Was a credit with this reason ever posted to the participant?
pub async fn has_reason<S: Storage>(
    storage: &S,
    participant: ParticipantId,
    reason: CommissionReason,
) -> Result<bool, EngineError> {
    Ok(storage
        .get_commission_entries(participant)
        .await?
        .iter()
        .any(|e| e.reason == reason && e.is_credit()))
}

pub async fn wallet_statement<S: Storage>(
    storage: &S,
    participant: ParticipantId,
) -> Result<WalletStatement, EngineError> {
    // make sure the participant exists
    storage.get_participant(participant).await?;

    let mut running: i128 = 0;
    let mut lines = Vec::new();
    for entry in storage.get_wallet_entries(participant).await? {
        running += entry.signed_amount();
        let running_balance = Amount::try_from(running).map_err(|_| {
            EngineError::InternalInconsistency(format!(
                "wallet of {} goes negative at entry {}",
                participant, entry.id
            ))
        })?;
        lines.push(StatementLine {
            entry,
            running_balance,
        });
    }

    let closing_balance = lines.last().map_or(0, |line| line.running_balance);
    Ok(WalletStatement {
        participant,
        lines,
        closing_balance,
    })
}

async fn reconciliation_of<S: Storage>(
    storage: &S,
    record: &Participant,
) -> Result<Reconciliation, EngineError> {
    let commissions = storage.get_commission_entries(record.id).await?;
    let wallet = storage.get_wallet_entries(record.id).await?;
    Ok(Reconciliation {
        participant: record.id,
        cached_commission: record.commission_balance,
        ledger_commission: ledger_sum(&commissions),
        cached_wallet: record.total_wallet_balance,
        ledger_wallet: ledger_sum(&wallet),
    })
}

/// Compare the cached balances of a participant with its ledgers
pub async fn reconcile<S: Storage>(
    storage: &S,
    participant: ParticipantId,
) -> Result<Reconciliation, EngineError> {
    let record = storage.get_participant(participant).await?;
    let report = reconciliation_of(storage, &record).await?;
    if !report.is_consistent() {
        return Err(EngineError::InternalInconsistency(format!(
            "balances of {} diverge from ledger: commission {} vs {}, wallet {} vs {}",
            participant,
            report.cached_commission,
            report.ledger_commission,
            report.cached_wallet,
            report.ledger_wallet
        )));
    }
    Ok(report)
}

/// Every participant whose cached balances diverge from its ledgers
pub async fn audit_all<S: Storage>(storage: &S) -> Result<Vec<Reconciliation>, EngineError> {
    let mut divergent = Vec::new();
    for record in storage.get_all_participants().await? {
        let report = reconciliation_of(storage, &record).await?;
        if !report.is_consistent() {
            warn!("participant {} is not consistent with its ledger", record.id);
            divergent.push(report);
        }
    }
    Ok(divergent)
}
