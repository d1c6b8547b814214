//! Collaboration session roster.
//!
//! # Invariants
//! - At most one session at a time; the host is always a participant.
//! - Participants are keyed by id.
//! - `share_file`/`follow_user` validate and emit events; they keep no state.

use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::model::file::normalize_path;
use crate::model::ids::{ParticipantId, SessionId};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Away,
    Busy,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
    Write,
    Admin,
}

pub const OWNER_PERMISSIONS: &[Permission] = &[Permission::Read, Permission::Write, Permission::Admin];
pub const GUEST_PERMISSIONS: &[Permission] = &[Permission::Read, Permission::Write];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub status: PresenceStatus,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub host_id: ParticipantId,
    pub participants: BTreeMap<ParticipantId, Participant>,
}

pub struct CollaborationManager {
    session: Option<Session>,
    bus: EventBus,
}

impl CollaborationManager {
    pub fn new(bus: EventBus) -> Self {
        Self {
            session: None,
            bus,
        }
    }

    /// Opens a session hosted by `host_name`; the host gets owner permissions.
    pub fn start_session(&mut self, host_name: &str) -> KernelResult<SessionId> {
        if let Some(session) = &self.session {
            return Err(KernelError::state(
                "startSession",
                format!("session {} is active", session.id),
            ));
        }
        let host = participant(host_name, OWNER_PERMISSIONS)?;
        let session = Session {
            id: SessionId::new(),
            host_id: host.id,
            participants: BTreeMap::from([(host.id, host)]),
        };
        let (session_id, host_id) = (session.id, session.host_id);
        self.session = Some(session);

        info!("event=collab_start module=collaboration status=ok session_id={session_id}");
        self.bus.emit(KernelEvent::SessionStarted {
            session_id,
            host_id,
        });
        Ok(session_id)
    }

    pub fn join_session(&mut self, session_id: SessionId, name: &str) -> KernelResult<ParticipantId> {
        let guest = participant(name, GUEST_PERMISSIONS)?;
        let session = self.session_mut(session_id)?;
        let participant_id = guest.id;
        let name = guest.name.clone();
        session.participants.insert(participant_id, guest);

        self.bus.emit(KernelEvent::SessionJoined {
            session_id,
            participant_id,
            name,
        });
        Ok(participant_id)
    }

    /// Removes a participant; the host leaving ends the session.
    pub fn leave_session(&mut self, session_id: SessionId, participant_id: ParticipantId) -> KernelResult<()> {
        let session = self.session_mut(session_id)?;
        if session.participants.remove(&participant_id).is_none() {
            return Err(unknown_participant(participant_id));
        }
        if session.host_id == participant_id {
            self.session = None;
        }

        self.bus.emit(KernelEvent::SessionLeft {
            session_id,
            participant_id,
        });
        Ok(())
    }

    /// Announces `path` to the session.
    pub fn share_file(&self, path: &str) -> KernelResult<()> {
        let path = normalize_path(path)?;
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| KernelError::state("shareFile", "no active session"))?;
        self.bus.emit(KernelEvent::FileShared {
            session_id: session.id,
            path,
        });
        Ok(())
    }

    /// Announces that the local user follows `participant_id`.
    pub fn follow_user(&self, participant_id: ParticipantId) -> KernelResult<()> {
        if self.participant(participant_id).is_none() {
            return Err(unknown_participant(participant_id));
        }
        self.bus.emit(KernelEvent::UserFollowed { participant_id });
        Ok(())
    }

    pub fn set_presence(&mut self, participant_id: ParticipantId, status: PresenceStatus) -> KernelResult<()> {
        let participant = self.participant_mut(participant_id)?;
        if participant.status == status {
            return Ok(());
        }
        participant.status = status;
        self.bus.emit(KernelEvent::PresenceChanged {
            participant_id,
            status,
        });
        Ok(())
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.session.as_ref()?.participants.get(&id)
    }

    pub(crate) fn clear(&mut self) {
        self.session = None;
    }

    fn session_mut(&mut self, session_id: SessionId) -> KernelResult<&mut Session> {
        self.session
            .as_mut()
            .filter(|session| session.id == session_id)
            .ok_or_else(|| KernelError::validation(format!("session not found: {session_id}")))
    }

    fn participant_mut(&mut self, id: ParticipantId) -> KernelResult<&mut Participant> {
        self.session
            .as_mut()
            .and_then(|session| session.participants.get_mut(&id))
            .ok_or_else(|| unknown_participant(id))
    }
}

fn participant(name: &str, permissions: &[Permission]) -> KernelResult<Participant> {
    let name = name.trim();
    if name.is_empty() {
        return Err(KernelError::validation("participant name must not be empty"));
    }
    Ok(Participant {
        id: ParticipantId::new(),
        name: name.to_string(),
        status: PresenceStatus::Online,
        permissions: permissions.to_vec(),
    })
}

fn unknown_participant(id: ParticipantId) -> KernelError {
    KernelError::validation(format!("participant not found: {id}"))
}
