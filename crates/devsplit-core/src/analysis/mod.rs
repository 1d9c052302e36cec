pub mod conflict_plan;
pub mod hidden;
pub mod merge;

pub use conflict_plan::{ConflictPlan, DeviceConflict, ReassignmentGroup};
pub use merge::{MergeManager, MergedDevice, PendingMerge};
