/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::{
    fs, io,
    path::PathBuf,
    process::{Command, ExitStatus},
};

use thiserror::Error;

use bake_graph::{registry, Invocation, Key};

use crate::interface::BuildTask;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("failed to spawn {invocation}: {source}")]
    SpawnFailed {
        invocation: Invocation,
        source: io::Error,
    },
    #[error("{invocation} failed with {status}")]
    CommandFailed {
        invocation: Invocation,
        status: ExitStatus,
    },
    #[error("creating directory {}: {}", .path.display(), .source)]
    MkdirFailed { path: PathBuf, source: io::Error },
}

pub type TaskResult = Result<(), TaskError>;

/// The one process spawning primitive. Stdio is inherited from the caller,
/// the call blocks until the child exits, and a nonzero status is an error
/// naming the full command line. Missing executables surface as an
/// ordinary spawn failure.
pub fn run_and_check(invocation: &Invocation) -> TaskResult {
    let mut command = Command::new(invocation.program());
    command.args(invocation.argv());
    if let Some(dir) = invocation.cwd() {
        command.current_dir(dir);
    }
    let status = command.status().map_err(|source| TaskError::SpawnFailed {
        invocation: invocation.clone(),
        source,
    })?;
    if !status.success() {
        return Err(TaskError::CommandFailed {
            invocation: invocation.clone(),
            status,
        });
    }
    Ok(())
}

#[derive(Debug)]
pub struct CommandTask {
    key: Key,
    invocation: Invocation,
}

impl CommandTask {
    pub fn new(key: Key, invocation: Invocation) -> CommandTask {
        CommandTask { key, invocation }
    }

    fn create_output_dirs(&self) -> TaskResult {
        // Compilers will not create missing output directories themselves.
        if let Key::Path(ref output) = self.key {
            if let Some(dir) = output.parent() {
                if !dir.exists() {
                    fs::create_dir_all(dir).map_err(|source| TaskError::MkdirFailed {
                        path: dir.to_owned(),
                        source,
                    })?;
                }
            }
        }
        Ok(())
    }
}

impl BuildTask<TaskResult> for CommandTask {
    fn run(&self) -> TaskResult {
        self.create_output_dirs()?;
        run_and_check(&self.invocation)
    }

    #[cfg(test)]
    fn is_command(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct MkdirTask {
    path: PathBuf,
}

impl MkdirTask {
    pub fn new(path: PathBuf) -> MkdirTask {
        MkdirTask { path }
    }
}

impl BuildTask<TaskResult> for MkdirTask {
    fn run(&self) -> TaskResult {
        fs::create_dir_all(&self.path).map_err(|source| TaskError::MkdirFailed {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Debug)]
pub struct CleanTask {
    paths: Vec<PathBuf>,
}

impl CleanTask {
    pub fn new(paths: Vec<PathBuf>) -> CleanTask {
        CleanTask { paths }
    }
}

impl BuildTask<TaskResult> for CleanTask {
    fn run(&self) -> TaskResult {
        // Removal failures are swallowed; clean never fails a build.
        registry::remove_paths(&self.paths);
        Ok(())
    }
}
