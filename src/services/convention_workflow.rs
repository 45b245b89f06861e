// ============================================================================
// CONVENTION - MACHINE À ÉTATS
// ============================================================================
//
//   en_attente --(signature)--> en_attente        (drapeau seulement)
//   en_attente --(admin: début d'instruction)--> en_cours
//   en_attente/en_cours --(admin: validation)--> validee  (+ signature école)
//   en_attente/en_cours --(admin/entreprise: annulation + motif)--> annulee
//   validee, annulee: terminaux
//
// Trois signatures présentes ne valident PAS automatiquement la convention:
// la validation reste une action explicite de l'administration.
//
// ============================================================================

use thiserror::Error;

use crate::error::AppError;
use crate::models::convention::{self, ConventionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Student,
    Company,
    School,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConventionEvent {
    Sign(Party),
    BeginReview,
    Validate,
    Cancel { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionState {
    pub status: ConventionStatus,
    pub student_signed: bool,
    pub company_signed: bool,
    pub school_signed: bool,
    pub cancellation_reason: Option<String>,
}

impl ConventionState {
    /// État initial à la création
    pub fn new() -> Self {
        Self {
            status: ConventionStatus::Pending,
            student_signed: false,
            company_signed: false,
            school_signed: false,
            cancellation_reason: None,
        }
    }

    pub fn is_signed_by(&self, party: Party) -> bool {
        match party {
            Party::Student => self.student_signed,
            Party::Company => self.company_signed,
            Party::School => self.school_signed,
        }
    }

    pub fn fully_signed(&self) -> bool {
        self.student_signed && self.company_signed && self.school_signed
    }

    fn with_signature(mut self, party: Party) -> Self {
        match party {
            Party::Student => self.student_signed = true,
            Party::Company => self.company_signed = true,
            Party::School => self.school_signed = true,
        }
        self
    }
}

impl From<&convention::Model> for ConventionState {
    fn from(model: &convention::Model) -> Self {
        Self {
            status: model.statut,
            student_signed: model.signature_etudiant,
            company_signed: model.signature_entreprise,
            school_signed: model.signature_ecole,
            cancellation_reason: model.motif_annulation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Changed(ConventionState),
    /// Rien à écrire (ex: re-signature)
    Unchanged,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Un motif d'annulation est requis")]
    EmptyReason,
    #[error("La convention est déjà {0}")]
    Terminal(&'static str),
    #[error("Transition impossible depuis le statut {0}")]
    InvalidTransition(&'static str),
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::EmptyReason => AppError::Validation(err.to_string()),
            _ => AppError::Conflict(err.to_string()),
        }
    }
}

/// Normalise le motif d'annulation; à appeler avant tout accès à la base
pub fn check_reason(reason: &str) -> Result<String, WorkflowError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(WorkflowError::EmptyReason);
    }
    Ok(reason.to_string())
}

fn terminal_label(status: ConventionStatus) -> &'static str {
    match status {
        ConventionStatus::Validated => "validée",
        ConventionStatus::Cancelled => "annulée",
        _ => status.label(),
    }
}

/// Seule fonction autorisée à faire évoluer une convention
pub fn transition(state: &ConventionState, event: ConventionEvent) -> Result<Outcome, WorkflowError> {
    match event {
        ConventionEvent::Sign(party) => {
            if state.is_signed_by(party) {
                return Ok(Outcome::Unchanged);
            }
            if state.status.is_terminal() {
                return Err(WorkflowError::Terminal(terminal_label(state.status)));
            }
            Ok(Outcome::Changed(state.clone().with_signature(party)))
        }

        ConventionEvent::BeginReview => match state.status {
            ConventionStatus::Pending => Ok(Outcome::Changed(ConventionState {
                status: ConventionStatus::InProgress,
                ..state.clone()
            })),
            ConventionStatus::InProgress => Ok(Outcome::Unchanged),
            other => Err(WorkflowError::Terminal(terminal_label(other))),
        },

        ConventionEvent::Validate => match state.status {
            ConventionStatus::Pending | ConventionStatus::InProgress => {
                let mut next = state.clone().with_signature(Party::School);
                next.status = ConventionStatus::Validated;
                Ok(Outcome::Changed(next))
            }
            ConventionStatus::Validated => Ok(Outcome::Unchanged),
            ConventionStatus::Cancelled => {
                Err(WorkflowError::InvalidTransition(ConventionStatus::Cancelled.label()))
            }
        },

        ConventionEvent::Cancel { reason } => {
            let reason = check_reason(&reason)?;
            if state.status.is_terminal() {
                return Err(WorkflowError::Terminal(terminal_label(state.status)));
            }
            Ok(Outcome::Changed(ConventionState {
                status: ConventionStatus::Cancelled,
                cancellation_reason: Some(reason),
                ..state.clone()
            }))
        }
    }
}
