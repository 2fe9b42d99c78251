//! Per-call-kind generation counters.
//!
//! Every action takes a [`Ticket`] when it is issued. When its call resolves
//! the outcome may only be committed if the ticket's generation is still the
//! latest for its kind.
//!
//! Each kind also remembers the generation of its newest call that has not
//! resolved yet. A call counts as live while that generation is both
//! unresolved and current, so a superseded call that is still waiting on
//! the identity service never holds up another call's resolution.

use std::sync::atomic::{AtomicU64, Ordering};

/// Groups of actions whose outcomes supersede one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Login, register, and session verification.
    Authenticate,
    /// Forgot and reset password.
    Recovery,
    /// Profile updates.
    Profile,
}

impl CallKind {
    const ALL: [Self; 3] = [Self::Authenticate, Self::Recovery, Self::Profile];
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticate => f.write_str("authenticate"),
            Self::Recovery => f.write_str("recovery"),
            Self::Profile => f.write_str("profile"),
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    /// Latest generation issued.
    issued: AtomicU64,
    /// Generation of the newest unresolved call, `0` if none.
    outstanding: AtomicU64,
}

#[derive(Debug, Default)]
pub(super) struct Generations {
    authenticate: Slot,
    recovery: Slot,
    profile: Slot,
}

impl Generations {
    const fn slot(&self, kind: CallKind) -> &Slot {
        match kind {
            CallKind::Authenticate => &self.authenticate,
            CallKind::Recovery => &self.recovery,
            CallKind::Profile => &self.profile,
        }
    }

    /// Issue a ticket for a new call of `kind`.
    ///
    /// A new authentication also supersedes pending recovery and profile
    /// calls, which belong to whatever session it replaces.
    pub(super) fn issue(&self, kind: CallKind) -> Ticket<'_> {
        if kind == CallKind::Authenticate {
            self.recovery.issued.fetch_add(1, Ordering::SeqCst);
            self.profile.issued.fetch_add(1, Ordering::SeqCst);
        }
        let slot = self.slot(kind);
        let generation = slot.issued.fetch_add(1, Ordering::SeqCst) + 1;
        slot.outstanding.store(generation, Ordering::SeqCst);
        Ticket {
            kind,
            generation,
            owner: self,
        }
    }

    /// Supersede every outstanding call.
    pub(super) fn invalidate_all(&self) {
        for kind in CallKind::ALL {
            self.slot(kind).issued.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(super) fn current(&self, kind: CallKind) -> u64 {
        self.slot(kind).issued.load(Ordering::SeqCst)
    }

    /// `true` if the newest call of `kind` is unresolved and still current.
    fn is_live(&self, kind: CallKind) -> bool {
        let slot = self.slot(kind);
        let outstanding = slot.outstanding.load(Ordering::SeqCst);
        outstanding != 0 && outstanding == slot.issued.load(Ordering::SeqCst)
    }
}

/// Claim on the outcome of one call. Dropping it marks the call resolved.
#[derive(Debug)]
pub(super) struct Ticket<'a> {
    pub(super) kind: CallKind,
    pub(super) generation: u64,
    owner: &'a Generations,
}

impl Ticket<'_> {
    /// `true` while no newer call of the same kind has been issued and no
    /// logout has happened since this ticket was taken.
    pub(super) fn is_current(&self) -> bool {
        self.owner.current(self.kind) == self.generation
    }

    /// `true` if a current call of another kind has not resolved yet.
    pub(super) fn others_live(&self) -> bool {
        CallKind::ALL
            .into_iter()
            .filter(|&kind| kind != self.kind)
            .any(|kind| self.owner.is_live(kind))
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        // A newer call of the same kind may already own the slot.
        let _ = self.owner.slot(self.kind).outstanding.compare_exchange(
            self.generation,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}
