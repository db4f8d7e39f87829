// Candidate generation: identity resolution for classifier-authored profiles
// and the batch pipeline that persists candidates with their CVs.
// All LLM calls go through the ClassifierGateway.

pub mod handlers;
pub mod identity;
pub mod pipeline;
