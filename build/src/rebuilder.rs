use std::{fs, io, time::SystemTime};

use thiserror::Error;

use bake_graph::{Action, Key, Rule};

use crate::{
    interface::{BuildTask, Rebuilder},
    task::{CleanTask, CommandTask, MkdirTask, TaskResult},
};

/// What the rebuilder knows about a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dirtiness {
    Modified(SystemTime),
    DoesNotExist,
    /// Always rebuild. Named tasks report this.
    Dirty,
}

pub trait MTimeState {
    fn modified(&self, key: &Key) -> io::Result<Dirtiness>;
}

/// Answers straight from the file system, no caching.
#[derive(Debug, Default)]
pub struct DiskMTimeState;

impl MTimeState for DiskMTimeState {
    fn modified(&self, key: &Key) -> io::Result<Dirtiness> {
        match key {
            Key::Task(_) => Ok(Dirtiness::Dirty),
            Key::Path(path) => {
                if path.exists() {
                    Ok(Dirtiness::Modified(fs::metadata(path)?.modified()?))
                } else {
                    Ok(Dirtiness::DoesNotExist)
                }
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("stat {key}: {source}")]
    Stat { key: Key, source: io::Error },
    #[error("{dependency}, required by {target}, does not exist")]
    MissingInput { target: Key, dependency: Key },
}

/// The staleness contract: a rule's action runs iff its target is absent
/// or older than any dependency.
#[derive(Debug)]
pub struct MTimeRebuilder<S: MTimeState> {
    state: S,
}

impl<S: MTimeState> MTimeRebuilder<S> {
    pub fn new(state: S) -> MTimeRebuilder<S> {
        MTimeRebuilder { state }
    }
}

pub fn mtime_rebuilder() -> MTimeRebuilder<DiskMTimeState> {
    MTimeRebuilder::new(DiskMTimeState::default())
}

impl<S: MTimeState> Rebuilder<Key, TaskResult, RebuildError> for MTimeRebuilder<S> {
    fn build(
        &self,
        key: Key,
        rule: &Rule,
    ) -> Result<Option<Box<dyn BuildTask<TaskResult>>>, RebuildError> {
        let target = self.state.modified(&key).map_err(|source| RebuildError::Stat {
            key: key.clone(),
            source,
        })?;
        let mut dirty = !matches!(target, Dirtiness::Modified(_));
        for dependency in rule.dependencies() {
            let dep_state =
                self.state
                    .modified(dependency)
                    .map_err(|source| RebuildError::Stat {
                        key: dependency.clone(),
                        source,
                    })?;
            match dep_state {
                Dirtiness::Dirty => dirty = true,
                Dirtiness::DoesNotExist => {
                    // The scheduler brings dependencies up to date before
                    // their dependents, so a dependency that is still
                    // missing here can never appear.
                    return Err(RebuildError::MissingInput {
                        target: key,
                        dependency: dependency.clone(),
                    });
                }
                Dirtiness::Modified(dep_mtime) => {
                    if let Dirtiness::Modified(target_mtime) = target {
                        if dep_mtime > target_mtime {
                            dirty = true;
                        }
                    }
                }
            }
        }
        if !dirty {
            return Ok(None);
        }
        let task: Box<dyn BuildTask<TaskResult>> = match rule.action() {
            Action::Invoke(invocation) => Box::new(CommandTask::new(key, invocation.clone())),
            Action::MakeDir => Box::new(MkdirTask::new(key.as_path().to_owned())),
            Action::RemovePaths(paths) => Box::new(CleanTask::new(paths.clone())),
        };
        Ok(Some(task))
    }
}
