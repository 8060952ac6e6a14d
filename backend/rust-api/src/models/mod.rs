pub mod attempt;
pub mod competition;
pub mod puzzle;
pub mod timer;
pub mod user;

pub use attempt::{AttemptRecord, Correctness};
pub use competition::{CompetitionWindow, Phase, Remaining, SubmissionRejection, WindowState};
pub use puzzle::{LayoutRole, Puzzle, PuzzleStatus, PuzzleViewState};
pub use user::{Profile, UserRole};
