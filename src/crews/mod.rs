//! Crew execution results, the run context, and the project crews.

pub mod crew_output;
pub mod crew_run;
pub mod lead_score_crew;

pub use crew_output::CrewOutput;
pub use crew_run::{CrewRun, RunState};
pub use lead_score_crew::{Candidate, LeadScoreCrew};
