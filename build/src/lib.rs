use bake_graph::{Key, RuleSet};

pub mod interface;
mod rebuilder;
mod scheduler;
mod task;

#[cfg(test)]
mod property_tests;

pub use rebuilder::{
    mtime_rebuilder, Dirtiness, DiskMTimeState, MTimeRebuilder, MTimeState, RebuildError,
};
pub use scheduler::{BuildError, TopoScheduler};
pub use task::{run_and_check, CleanTask, CommandTask, MkdirTask, TaskError, TaskResult};

use interface::{Rebuilder, Scheduler};

pub fn build(
    scheduler: impl Scheduler<Key, TaskResult, BuildError, RebuildError>,
    rebuilder: &dyn Rebuilder<Key, TaskResult, RebuildError>,
    rules: &RuleSet,
    start: Vec<Key>,
) -> Result<(), BuildError> {
    scheduler.schedule(rebuilder, rules, start)
}

pub fn build_externals(
    scheduler: impl Scheduler<Key, TaskResult, BuildError, RebuildError>,
    rebuilder: &dyn Rebuilder<Key, TaskResult, RebuildError>,
    rules: &RuleSet,
) -> Result<(), BuildError> {
    scheduler.schedule_externals(rebuilder, rules)
}
