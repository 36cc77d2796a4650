//! Submission workflow: status transitions and the guard functions shared by
//! the edit, view, listing and import paths.
//!
//! Lifecycle: `roboczy` -> `weryfikacja` -> `opublikowany` -> `wycofany`.
//! Owners move their own drafts with the two form actions; moderators may
//! place an entry in any state.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::actor::{Actor, Role};
use crate::domain::catalog_entry::{CatalogEntry, EntryStatus};
use crate::domain::error::{AppError, Result};

pub const REASON_NOT_OWNER: &str = "Możesz edytować tylko swoje zgłoszenia.";
pub const REASON_NOT_DRAFT: &str = "Możesz edytować tylko zgłoszenia ze statusem 'roboczy'.";
pub const REASON_MODERATOR_ONLY: &str = "Dostęp ograniczony do redaktorów.";
pub const REASON_LOGIN_REQUIRED: &str = "Wymagane zalogowanie.";
pub const REASON_NOT_VISIBLE: &str = "Brak dostępu do tego zgłoszenia.";
pub const REASON_EXPLICIT_STATUS: &str = "Tylko redaktor może ustawić status bezpośrednio.";

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Forbidden(String),
}

impl Decision {
    fn forbidden(reason: &str) -> Self {
        Decision::Forbidden(reason.to_string())
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Forbidden(reason) => Err(AppError::Forbidden(reason)),
        }
    }
}

/// Form button pressed by an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitAction {
    SaveDraft,
    SubmitForReview,
}

impl SubmitAction {
    pub fn target_status(&self) -> EntryStatus {
        match self {
            SubmitAction::SaveDraft => EntryStatus::Draft,
            SubmitAction::SubmitForReview => EntryStatus::InReview,
        }
    }
}

impl FromStr for SubmitAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "save-draft" | "zapisz" => Ok(SubmitAction::SaveDraft),
            "submit-for-review" | "wyslij" => Ok(SubmitAction::SubmitForReview),
            other => Err(AppError::ValidationError(format!(
                "Nieznana akcja formularza: '{}'",
                other
            ))),
        }
    }
}

/// What the caller asked the entry's status to become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRequest {
    Action(SubmitAction),
    Explicit(EntryStatus),
}

/// A resolved status change. `is_override` marks moderator moves that skip
/// the regular lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Option<EntryStatus>,
    pub to: EntryStatus,
    pub is_override: bool,
}

/// Whether `from -> to` follows the regular lifecycle order.
pub fn is_lifecycle_step(from: EntryStatus, to: EntryStatus) -> bool {
    use EntryStatus::*;
    from == to
        || matches!(
            (from, to),
            (Draft, InReview) | (InReview, Published) | (InReview, Withdrawn) | (Published, Withdrawn)
        )
}

/// Resolve the status an entry moves to on create (`current = None`) or edit.
///
/// Permission to touch the entry at all is checked separately by
/// [`can_edit`]/[`can_create`]; this only decides the target state.
pub fn resolve_transition(
    actor: &Actor,
    current: Option<EntryStatus>,
    request: StatusRequest,
) -> Result<Transition> {
    let to = match (actor.role, request) {
        (Role::Visitor, _) => return Err(AppError::Forbidden(REASON_LOGIN_REQUIRED.to_string())),
        (Role::Contributor, StatusRequest::Explicit(_)) => {
            return Err(AppError::Forbidden(REASON_EXPLICIT_STATUS.to_string()))
        }
        (Role::Contributor, StatusRequest::Action(action)) => {
            if let Some(status) = current {
                if status != EntryStatus::Draft {
                    return Err(AppError::Forbidden(REASON_NOT_DRAFT.to_string()));
                }
            }
            action.target_status()
        }
        (Role::Moderator, StatusRequest::Action(action)) => action.target_status(),
        (Role::Moderator, StatusRequest::Explicit(status)) => status,
    };

    let is_override = match current {
        Some(from) => !is_lifecycle_step(from, to),
        None => false,
    };

    Ok(Transition {
        from: current,
        to,
        is_override,
    })
}

pub fn can_create(actor: &Actor) -> Decision {
    if actor.is_authenticated() {
        Decision::Allowed
    } else {
        Decision::forbidden(REASON_LOGIN_REQUIRED)
    }
}

pub fn can_view(actor: &Actor, entry: &CatalogEntry) -> Decision {
    if entry.status.is_public() || actor.is_moderator() {
        return Decision::Allowed;
    }
    match actor.user_id {
        Some(user_id) if actor.is_authenticated() && entry.is_owned_by(user_id) => {
            Decision::Allowed
        }
        _ => Decision::forbidden(REASON_NOT_VISIBLE),
    }
}

pub fn can_edit(actor: &Actor, entry: &CatalogEntry) -> Decision {
    match actor.role {
        Role::Moderator => Decision::Allowed,
        Role::Visitor => Decision::forbidden(REASON_LOGIN_REQUIRED),
        Role::Contributor => {
            let owns = actor.user_id.map(|id| entry.is_owned_by(id)).unwrap_or(false);
            if !owns {
                Decision::forbidden(REASON_NOT_OWNER)
            } else if entry.status != EntryStatus::Draft {
                Decision::forbidden(REASON_NOT_DRAFT)
            } else {
                Decision::Allowed
            }
        }
    }
}

pub fn can_import(actor: &Actor) -> Decision {
    if actor.is_moderator() {
        Decision::Allowed
    } else {
        Decision::forbidden(REASON_MODERATOR_ONLY)
    }
}

pub fn can_list_submissions(actor: &Actor) -> Decision {
    can_create(actor)
}

/// Which entries a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingScope {
    pub owner_id: Option<i64>,
    pub status: Option<EntryStatus>,
}

impl ListingScope {
    pub fn public() -> Self {
        Self {
            owner_id: None,
            status: Some(EntryStatus::Published),
        }
    }
}

/// Scope of the "my submissions" view.
///
/// `status_param` is the raw query value: `None` when the parameter is
/// missing, `Some("")` when it was sent empty. Moderators see every owner's
/// entries and default to `weryfikacja`; contributors only see their own.
pub fn submission_scope(actor: &Actor, status_param: Option<&str>) -> Result<ListingScope> {
    can_list_submissions(actor).into_result()?;

    let explicit = match status_param.map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(value) => Some(Some(value.parse::<EntryStatus>()?)),
    };

    match actor.role {
        Role::Moderator => Ok(ListingScope {
            owner_id: None,
            status: explicit.unwrap_or(Some(EntryStatus::InReview)),
        }),
        _ => Ok(ListingScope {
            owner_id: actor.user_id,
            status: explicit.flatten(),
        }),
    }
}
