pub mod engine;
pub mod mortgage;
pub mod solver;
pub mod types;

pub use engine::{run_projection, run_projection_to, summarize};
pub use solver::{find_fi_age, goal_guidance, is_viable};
pub use types::{PlanInput, SearchResult, Summary, YearRecord};
