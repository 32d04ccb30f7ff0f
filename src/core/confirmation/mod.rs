pub mod confirmation_gate;

pub use confirmation_gate::{
    ConfirmationGate, Decision, PendingChange, Proposal, Resolution, PENDING_TTL_MINUTES,
};
