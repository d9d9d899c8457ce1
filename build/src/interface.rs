use core::fmt::Debug;

use bake_graph::{Rule, RuleSet};

/// A unit of runnable work produced by a rebuilder.
pub trait BuildTask<V> {
    fn run(&self) -> V;

    #[cfg(test)]
    fn is_command(&self) -> bool {
        false
    }
}

impl<V> Debug for dyn BuildTask<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BuildTask{{}}")
    }
}

/// Decides whether a target is out of date. Returns no task when the
/// target can be left alone.
pub trait Rebuilder<K, V, RebuilderError> {
    fn build(
        &self,
        key: K,
        rule: &Rule,
    ) -> Result<Option<Box<dyn BuildTask<V>>>, RebuilderError>;
}

pub trait Scheduler<K, V, BuildError, RebuilderError> {
    fn schedule(
        &self,
        rebuilder: &dyn Rebuilder<K, V, RebuilderError>,
        rules: &RuleSet,
        start: Vec<K>,
    ) -> Result<(), BuildError>;

    fn schedule_externals(
        &self,
        rebuilder: &dyn Rebuilder<K, V, RebuilderError>,
        rules: &RuleSet,
    ) -> Result<(), BuildError>;
}
