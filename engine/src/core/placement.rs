use log::{debug, info, warn};
use mlm_common::{
    participant::{Participant, ParticipantId, Registration},
    time::TimestampSeconds,
};

use super::{
    error::{EngineError, PlacementFault},
    storage::Storage,
    walk::{is_tree_ancestor_or_self, WalkLimit},
};

// A removed id still owns its ledger rows and orders and cannot be taken again
async fn ensure_id_is_free<S: Storage>(storage: &S, id: ParticipantId) -> Result<(), EngineError> {
    if storage.has_participant(id).await? || storage.is_participant_removed(id).await? {
        return Err(EngineError::AlreadyRegistered(id));
    }
    Ok(())
}

/// Create a participant with no parent and no sponsor
pub async fn register_root<S: Storage>(
    storage: &mut S,
    id: ParticipantId,
    name: String,
    timestamp: TimestampSeconds,
) -> Result<Participant, EngineError> {
    ensure_id_is_free(&*storage, id).await?;

    let participant = Participant::new(id, name, None, None, None, timestamp);
    storage.set_participant(&participant).await?;
    info!("registered root participant {}", id);
    Ok(participant)
}

/// Attach a new participant under `parent`, in its first free slot.
///
/// The sponsor must be the parent itself or one of its placement ancestors.
pub async fn attach<S: Storage>(
    storage: &mut S,
    registration: Registration,
    limit: WalkLimit,
) -> Result<Participant, EngineError> {
    let Registration {
        id,
        name,
        sponsor,
        parent,
        timestamp,
    } = registration;

    ensure_id_is_free(&*storage, id).await?;
    if !storage.has_participant(sponsor).await? {
        return Err(EngineError::NotFound(sponsor));
    }

    let mut parent_record = storage.get_participant(parent).await?;
    let position = parent_record
        .free_slot()
        .ok_or(EngineError::PlacementInvalid {
            parent,
            fault: PlacementFault::SlotsFull,
        })?;

    if !is_tree_ancestor_or_self(&*storage, sponsor, parent, limit).await? {
        warn!("refused signup of {}: sponsor {} is not above {}", id, sponsor, parent);
        return Err(EngineError::PlacementUnauthorized { sponsor, parent });
    }

    let participant = Participant::new(
        id,
        name,
        Some(parent),
        Some(sponsor),
        Some(position),
        timestamp,
    );
    parent_record.set_child(position, Some(id));

    storage.set_participant(&parent_record).await?;
    storage.set_participant(&participant).await?;

    info!(
        "attached {} under {} ({}), sponsored by {}",
        id, parent, position, sponsor
    );
    Ok(participant)
}

/// Re-parent `child` under `new_parent`.
///
/// Leg volumes and team sales already accumulated by the former uplines are
/// left as they are; only future sales follow the new placement.
pub async fn move_participant<S: Storage>(
    storage: &mut S,
    child: ParticipantId,
    new_parent: ParticipantId,
    limit: WalkLimit,
) -> Result<Participant, EngineError> {
    let mut record = storage.get_participant(child).await?;
    let mut target = storage.get_participant(new_parent).await?;

    if record.parent == Some(new_parent) {
        debug!("{} is already placed under {}", child, new_parent);
        return Ok(record);
    }

    if is_tree_ancestor_or_self(&*storage, child, new_parent, limit).await? {
        warn!("refused move of {} under its own downline {}", child, new_parent);
        return Err(EngineError::PlacementInvalid {
            parent: new_parent,
            fault: PlacementFault::Cycle,
        });
    }

    let position = target.free_slot().ok_or(EngineError::PlacementInvalid {
        parent: new_parent,
        fault: PlacementFault::SlotsFull,
    })?;

    if let Some(sponsor) = record.sponsor {
        if !is_tree_ancestor_or_self(&*storage, sponsor, new_parent, limit).await? {
            warn!(
                "refused move of {}: sponsor {} is not above {}",
                child, sponsor, new_parent
            );
            return Err(EngineError::PlacementUnauthorized {
                sponsor,
                parent: new_parent,
            });
        }
    }

    if let (Some(old_parent), Some(old_position)) = (record.parent, record.position) {
        let mut previous = storage.get_participant(old_parent).await?;
        previous.set_child(old_position, None);
        storage.set_participant(&previous).await?;
    }

    target.set_child(position, Some(child));
    record.parent = Some(new_parent);
    record.position = Some(position);

    storage.set_participant(&target).await?;
    storage.set_participant(&record).await?;

    info!("moved {} under {} ({})", child, new_parent, position);
    Ok(record)
}

/// Delete a participant that nobody depends on anymore.
///
/// Ledger rows of the participant are kept and its id is retired.
pub async fn remove_participant<S: Storage>(
    storage: &mut S,
    id: ParticipantId,
) -> Result<Participant, EngineError> {
    let record = storage.get_participant(id).await?;
    if record.has_children() {
        return Err(EngineError::ParticipantInUse(id));
    }

    let sponsors_someone = storage
        .get_all_participants()
        .await?
        .iter()
        .any(|p| p.sponsor == Some(id));
    if sponsors_someone {
        return Err(EngineError::ParticipantInUse(id));
    }

    if let (Some(parent), Some(position)) = (record.parent, record.position) {
        let mut parent_record = storage.get_participant(parent).await?;
        parent_record.set_child(position, None);
        storage.set_participant(&parent_record).await?;
    }
    storage.delete_participant(id).await?;

    info!("removed participant {}", id);
    Ok(record)
}
