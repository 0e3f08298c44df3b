//! Player-join reconciliation: auto-add on login and missed-boss delivery.

use crate::config::ConfigStore;
use crate::types::RosterEntry;
use plugin_api::PlayerSession;
use tracing::{error, warn};

/// What happened for one join event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    /// The player was appended to the roster (name-only entry).
    pub auto_added: bool,
    /// Sentence to deliver to the player, if their ledger had anything.
    pub delivery: Option<String>,
}

/// Reconcile a joining player against the roster and the ledger.
///
/// Persistence failures are logged and do not reverse the in-memory
/// mutation already made for this event.
pub fn on_player_join(store: &mut ConfigStore, session: &PlayerSession) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    // Auto-add binds to the name only: the same player on a new device
    // should not end up required twice.
    if store.config().add_on_login && !store.contains_match_for(session) {
        if let Err(e) = store.add(RosterEntry::new(session.name.clone())) {
            error!("Failed to persist auto-added roster entry: {}", e);
        }
        outcome.auto_added = true;
    }

    if !store.config().send_missed_on_join {
        return outcome;
    }

    // Name-only lookup; the uuid check below decides whether this session
    // may claim the entry's ledger.
    let entry = match store
        .entries()
        .iter()
        .find(|e| e.name == session.name)
        .cloned()
    {
        Some(entry) => entry,
        None => return outcome,
    };

    if let Some(uuid) = &entry.uuid {
        if *uuid != session.uuid {
            // Same name, different device id: treat as a different physical
            // player and deliver nothing.
            warn!(
                "Not delivering missed bosses to {}: roster uuid does not match session",
                session.name
            );
            return outcome;
        }
    }

    let names: Vec<String> = store
        .missed_for(&entry)
        .map(|bucket| bucket.iter().map(|b| b.name.clone()).collect())
        .unwrap_or_default();
    if names.is_empty() {
        if let Err(e) = store.clear_missed(&entry) {
            error!("Failed to clear empty missed bucket: {}", e);
        }
        return outcome;
    }

    outcome.delivery = Some(spawned_sentence(&names));
    if let Err(e) = store.clear_missed(&entry) {
        error!("Failed to persist cleared missed bucket: {}", e);
    }
    outcome
}

/// One sentence naming everything that spawned while the player was gone.
///
/// The zero-name branch is unreachable through [`on_player_join`]; it
/// exists so a bug upstream announces itself instead of sending an empty
/// sentence.
pub fn spawned_sentence(names: &[String]) -> String {
    match names {
        [] => "Nothing spawned while you were gone. (This is probably a bug.)".to_string(),
        [only] => format!("{} spawned.", only),
        [first, second] => format!("{} and {} spawned.", first, second),
        [head @ .., last] => format!("{}, and {} all spawned.", head.join(", "), last),
    }
}
