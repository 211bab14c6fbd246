//! Record types produced by the crews in this crate.

pub mod candidate_score;

pub use candidate_score::CandidateScore;
