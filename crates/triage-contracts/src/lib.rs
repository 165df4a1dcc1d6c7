//! Data contracts and local state for the triage client: the model's
//! response documents, the history log, display rules, and the
//! application-state reducer. Nothing in this crate touches the network.

pub mod analysis;
pub mod chat;
pub mod condition;
pub mod error;
pub mod events;
pub mod history;
pub mod media;
pub mod presentation;
pub mod profiles;
pub mod report;
pub mod schema;
pub mod state;
pub mod validate;

pub use analysis::{
    AnalysisRequest, AnalysisResult, Medication, RiskLevel, RiskScore, RiskStatus,
    TermDefinition, Urgency,
};
pub use condition::{ConditionDetails, COMMON_CONDITIONS};
pub use error::{Result, TriageError};
pub use history::{HistoryItem, HistoryStore};
pub use media::MediaAttachment;
pub use profiles::{Profile, ProfileRole, ProfileTable};
