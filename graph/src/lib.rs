use std::{
    collections::HashMap,
    fmt::Display,
    path::{Path, PathBuf},
};

mod invocation;
pub mod registry;

pub use invocation::Invocation;
pub use registry::CleanupRegistry;

#[derive(Debug, PartialOrd, Ord, Hash, Eq, PartialEq, Clone)]
pub enum Key {
    /// A file or directory target, or a plain source dependency.
    Path(PathBuf),
    /// A named task like `clean`. Named tasks are never up to date.
    Task(String),
}

impl Key {
    pub fn path<P: Into<PathBuf>>(path: P) -> Key {
        Key::Path(path.into())
    }

    pub fn task<S: Into<String>>(name: S) -> Key {
        Key::Task(name.into())
    }

    pub fn is_path(&self) -> bool {
        matches!(self, Key::Path(_))
    }

    pub fn is_task(&self) -> bool {
        matches!(self, Key::Task(_))
    }

    pub fn as_path(&self) -> &Path {
        match *self {
            Key::Path(ref path) => path,
            _ => panic!("only works on Key::Path"),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Path(path) => write!(f, "{}", path.display()),
            Key::Task(name) => write!(f, ":{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Create the target directory.
    MakeDir,
    /// Run one subprocess described by a typed invocation.
    Invoke(Invocation),
    /// Remove the recorded paths, best-effort. The payload of `clean`.
    RemovePaths(Vec<PathBuf>),
}

impl Action {
    pub fn is_invoke(&self) -> bool {
        matches!(self, Action::Invoke(_))
    }

    pub fn invocation(&self) -> Option<&Invocation> {
        match self {
            Action::Invoke(ref invocation) => Some(invocation),
            _ => None,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::MakeDir => write!(f, "MakeDir"),
            Action::Invoke(invocation) => write!(f, "Invoke({})", invocation),
            Action::RemovePaths(paths) => write!(f, "RemovePaths({} paths)", paths.len()),
        }
    }
}

pub type Dependencies = Vec<Key>;

/// One declared rule: what the target depends on and how to produce it.
/// The target itself is the key in the owning [`RuleSet`].
#[derive(Debug)]
pub struct Rule {
    pub dependencies: Dependencies,
    pub action: Action,
}

impl Rule {
    pub fn new(dependencies: Dependencies, action: Action) -> Rule {
        Rule {
            dependencies,
            action,
        }
    }

    pub fn dependencies(&self) -> &[Key] {
        &self.dependencies
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}

pub type RulesMap = HashMap<Key, Rule>;

/// The build graph under construction: every declared target mapped to its
/// rule. Declaration is eager, evaluation belongs to the engine.
#[derive(Debug, Default)]
pub struct RuleSet {
    map: RulesMap,
}

impl RuleSet {
    pub fn new() -> RuleSet {
        RuleSet::default()
    }

    /// Redeclaring a target keeps the newer rule, matching the usual
    /// rule-redefinition semantics of file based build tools.
    pub fn declare(&mut self, target: Key, rule: Rule) {
        if self.map.insert(target.clone(), rule).is_some() {
            tracing::debug!("rule for {} redeclared, keeping the newer one", target);
        }
    }

    pub fn rule(&self, key: &Key) -> Option<&Rule> {
        self.map.get(key)
    }

    pub fn all_rules(&self) -> &RulesMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RuleSet{{\n rules:\n")?;
        let mut keys: Vec<&Key> = self.map.keys().collect();
        keys.sort();
        for key in keys {
            let rule = &self.map[key];
            write!(f, "  {} -> {} [", key, rule.action)?;
            for dep in rule.dependencies() {
                write!(f, "{}, ", dep)?;
            }
            writeln!(f, "]")?;
        }
        write!(f, "}}")
    }
}
