//! Risk assessment: capital-at-risk sizing and advisory feedback.

mod advisor;
mod assessor;

pub use advisor::{AdvisorError, FeedbackProvider, OfflineAdvisor};
pub use assessor::RiskAssessor;

#[cfg(test)]
pub(crate) use assessor::MISSING_INPUTS_FEEDBACK;
