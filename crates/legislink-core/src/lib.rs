pub mod config;
pub mod identifier;
pub mod model;
pub mod normalize;
pub mod phase;
pub mod query;
pub mod source;
pub mod timeline;

pub use config::{ConfigError, PipelineConfig};
pub use identifier::extract_cross_reference;
pub use model::{
    Committee, LinkMethod, LinkResult, Origin, PartyVote, Phase, Project, Publication,
    Rapporteur, SenatePosition, Stage, TribunalCase, VoteOutcome, Voting,
};
pub use phase::{PhaseKeywords, PhaseResolver};
pub use source::{
    Document, GovernmentStageEntry, NativeStage, NativeVoting, ParliamentaryStageEntry,
    ProcessRecord, ProcessSummary, SourceRecord, StageChild,
};
