use std::collections::{hash_map::Entry, HashMap};

use petgraph::{algo::toposort, graph::NodeIndex, visit::DfsPostOrder, Direction};
use thiserror::Error;

use bake_graph::{Key, RuleSet};

use crate::{
    interface::{Rebuilder, Scheduler},
    rebuilder::RebuildError,
    task::{TaskError, TaskResult},
};

type SchedulerGraph<'a> = petgraph::Graph<&'a Key, ()>;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("dependency cycle involving {0}")]
    Cycle(Key),
    #[error("don't know how to build {0}")]
    UnknownTarget(Key),
    #[error(transparent)]
    Rebuild(#[from] RebuildError),
    #[error("{key}: {source}")]
    TaskFailed { key: Key, source: TaskError },
}

/// Walks the graph depth first and runs every stale task in dependency
/// order, one at a time, aborting on the first failure. Parallel execution
/// belongs to a different scheduler.
#[derive(Debug, Default)]
pub struct TopoScheduler;

impl TopoScheduler {
    pub fn new() -> TopoScheduler {
        TopoScheduler
    }

    fn build_graph(rules: &RuleSet) -> (SchedulerGraph, HashMap<&Key, NodeIndex>) {
        let mut keys_to_nodes: HashMap<&Key, NodeIndex> = HashMap::new();
        let mut graph = SchedulerGraph::new();
        fn add_or_get_node<'a>(
            map: &mut HashMap<&'a Key, NodeIndex>,
            graph: &mut SchedulerGraph<'a>,
            key: &'a Key,
        ) -> NodeIndex {
            match map.entry(key) {
                Entry::Vacant(e) => {
                    let node = graph.add_node(key);
                    e.insert(node);
                    node
                }
                Entry::Occupied(e) => *e.get(),
            }
        }
        for (key, rule) in rules.all_rules() {
            let source = add_or_get_node(&mut keys_to_nodes, &mut graph, key);
            for dep in rule.dependencies() {
                let dep_node = add_or_get_node(&mut keys_to_nodes, &mut graph, dep);
                graph.add_edge(source, dep_node, ());
            }
        }
        (graph, keys_to_nodes)
    }

    fn schedule_internal(
        &self,
        rebuilder: &dyn Rebuilder<Key, TaskResult, RebuildError>,
        rules: &RuleSet,
        start: Option<Vec<Key>>,
    ) -> Result<(), BuildError> {
        let (graph, keys_to_nodes) = Self::build_graph(rules);

        if let Err(cycle) = toposort(&graph, None) {
            return Err(BuildError::Cycle(graph[cycle.node_id()].clone()));
        }

        let starts: Vec<NodeIndex> = match start {
            Some(keys) => {
                let mut nodes = Vec::with_capacity(keys.len());
                for key in keys {
                    match keys_to_nodes.get(&key) {
                        Some(node) => nodes.push(*node),
                        None => return Err(BuildError::UnknownTarget(key)),
                    }
                }
                nodes
            }
            // Root targets only. Named tasks like clean never run unless
            // explicitly requested.
            None => graph
                .externals(Direction::Incoming)
                .filter(|node| graph[*node].is_path())
                .collect(),
        };

        // The visitor keeps its visited set across move_to calls, so keys
        // shared between requested targets run once.
        let mut visitor = DfsPostOrder::empty(&graph);
        for start in starts {
            visitor.move_to(start);
            while let Some(node) = visitor.next(&graph) {
                let key = graph[node];
                let rule = match rules.rule(key) {
                    Some(rule) => rule,
                    // A plain source, nothing to run.
                    None => continue,
                };
                if let Some(task) = rebuilder.build(key.clone(), rule)? {
                    tracing::info!("building {}", key);
                    task.run().map_err(|source| BuildError::TaskFailed {
                        key: key.clone(),
                        source,
                    })?;
                }
            }
        }
        Ok(())
    }
}

impl Scheduler<Key, TaskResult, BuildError, RebuildError> for TopoScheduler {
    fn schedule(
        &self,
        rebuilder: &dyn Rebuilder<Key, TaskResult, RebuildError>,
        rules: &RuleSet,
        start: Vec<Key>,
    ) -> Result<(), BuildError> {
        self.schedule_internal(rebuilder, rules, Some(start))
    }

    fn schedule_externals(
        &self,
        rebuilder: &dyn Rebuilder<Key, TaskResult, RebuildError>,
        rules: &RuleSet,
    ) -> Result<(), BuildError> {
        self.schedule_internal(rebuilder, rules, None)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rebuilder::mtime_rebuilder;
    use bake_graph::{Action, Invocation, Rule};
    use std::fs;

    fn copy_rule(from: &std::path::Path, to: &std::path::Path) -> Rule {
        Rule::new(
            vec![Key::path(from)],
            Action::Invoke(Invocation::new("cp").arg(from).arg(to)),
        )
    }

    #[test]
    fn test_build_runs_stale_tasks_in_dependency_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("hello.txt");
        let middle = dir.path().join("middle.txt");
        let out = dir.path().join("out.txt");
        fs::write(&source, b"hi").expect("write");

        let mut rules = RuleSet::new();
        rules.declare(Key::path(&middle), copy_rule(&source, &middle));
        rules.declare(Key::path(&out), copy_rule(&middle, &out));

        let rebuilder = mtime_rebuilder();
        TopoScheduler::new()
            .schedule(&rebuilder, &rules, vec![Key::path(&out)])
            .expect("build succeeds");
        assert_eq!(fs::read(&out).expect("read"), b"hi");

        // Everything is up to date now; a second run is a no-op.
        TopoScheduler::new()
            .schedule(&rebuilder, &rules, vec![Key::path(&out)])
            .expect("rebuild succeeds");
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut rules = RuleSet::new();
        rules.declare(
            Key::path("a"),
            Rule::new(vec![Key::path("b")], Action::MakeDir),
        );
        rules.declare(
            Key::path("b"),
            Rule::new(vec![Key::path("a")], Action::MakeDir),
        );
        let rebuilder = mtime_rebuilder();
        let err = TopoScheduler::new()
            .schedule(&rebuilder, &rules, vec![Key::path("a")])
            .expect_err("cycle");
        assert!(matches!(err, BuildError::Cycle(_)));
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let rules = RuleSet::new();
        let rebuilder = mtime_rebuilder();
        let err = TopoScheduler::new()
            .schedule(&rebuilder, &rules, vec![Key::path("nope")])
            .expect_err("unknown");
        assert!(matches!(err, BuildError::UnknownTarget(_)));
    }

    #[test]
    fn test_missing_input_aborts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("never-written.txt");
        let out = dir.path().join("out.txt");
        let mut rules = RuleSet::new();
        rules.declare(Key::path(&out), copy_rule(&missing, &out));
        let rebuilder = mtime_rebuilder();
        let err = TopoScheduler::new()
            .schedule(&rebuilder, &rules, vec![Key::path(&out)])
            .expect_err("missing input");
        assert!(matches!(
            err,
            BuildError::Rebuild(RebuildError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_failing_command_aborts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("never-made.txt");
        let mut rules = RuleSet::new();
        rules.declare(
            Key::path(&out),
            Rule::new(vec![], Action::Invoke(Invocation::new("false"))),
        );
        let rebuilder = mtime_rebuilder();
        let err = TopoScheduler::new()
            .schedule(&rebuilder, &rules, vec![Key::path(&out)])
            .expect_err("command fails");
        assert!(matches!(err, BuildError::TaskFailed { .. }));
    }

    #[test]
    fn test_externals_skip_named_tasks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let keep = dir.path().join("keep.txt");
        let out = dir.path().join("out.txt");
        fs::write(&keep, b"precious").expect("write");

        let mut rules = RuleSet::new();
        rules.declare(
            Key::task("clean"),
            Rule::new(vec![], Action::RemovePaths(vec![keep.clone()])),
        );
        rules.declare(
            Key::path(&out),
            Rule::new(vec![], Action::Invoke(Invocation::new("touch").arg(&out))),
        );

        let rebuilder = mtime_rebuilder();
        TopoScheduler::new()
            .schedule_externals(&rebuilder, &rules)
            .expect("build succeeds");
        assert!(out.exists());
        assert!(keep.exists(), "clean must not run implicitly");
    }
}
