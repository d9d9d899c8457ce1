use std::{
    ffi::{OsStr, OsString},
    fs, io,
    path::{Path, PathBuf},
};

use globwalk::{FileType, GlobWalkerBuilder};
use thiserror::Error;

use bake_graph::{Action, CleanupRegistry, Invocation, Key, Rule, RuleSet};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("reading {}: {}", .dir.display(), .source)]
    ReadDir { dir: PathBuf, source: io::Error },
    #[error("bad schema pattern: {0}")]
    Pattern(#[from] globwalk::GlobError),
    #[error("walking {}: {}", .dir.display(), .source)]
    Walk { dir: PathBuf, source: io::Error },
}

/// How to turn schema files into generated code. The defaults match
/// `protoc` emitting Go bindings; both the compiler and the language tag
/// are configuration, not contract.
#[derive(Debug, Clone)]
pub struct ProtocConfig {
    compiler: OsString,
    lang: String,
    schema_ext: String,
}

impl Default for ProtocConfig {
    fn default() -> ProtocConfig {
        ProtocConfig {
            compiler: "protoc".into(),
            lang: "go".into(),
            schema_ext: "proto".into(),
        }
    }
}

impl ProtocConfig {
    pub fn new() -> ProtocConfig {
        ProtocConfig::default()
    }

    pub fn compiler<S: AsRef<OsStr>>(mut self, compiler: S) -> ProtocConfig {
        self.compiler = compiler.as_ref().to_owned();
        self
    }

    /// Language tag: selects the `--<lang>_out` flag and the `.pb.<lang>`
    /// extension on generated files.
    pub fn lang<S: Into<String>>(mut self, lang: S) -> ProtocConfig {
        self.lang = lang.into();
        self
    }

    pub fn schema_ext<S: Into<String>>(mut self, ext: S) -> ProtocConfig {
        self.schema_ext = ext.into();
        self
    }

    fn generated_extension(&self) -> String {
        format!("pb.{}", self.lang)
    }

    fn is_schema(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext == OsStr::new(&self.schema_ext))
            .unwrap_or(false)
    }

    fn compile(&self, include_dir: &Path, out_dir: &Path, schema: &Path) -> Invocation {
        let mut include = OsString::from("-I");
        include.push(include_dir);
        let mut out = OsString::from(format!("--{}_out=", self.lang));
        out.push(out_dir);
        Invocation::new(&self.compiler)
            .arg(include)
            .arg(out)
            .arg(schema)
    }
}

pub(crate) fn fanout(
    rules: &mut RuleSet,
    cleanup: &mut CleanupRegistry,
    config: &ProtocConfig,
    source_dir: &Path,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, GenerateError> {
    let entries = fs::read_dir(source_dir).map_err(|source| GenerateError::ReadDir {
        dir: source_dir.to_owned(),
        source,
    })?;
    let mut schemas = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| GenerateError::ReadDir {
            dir: source_dir.to_owned(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && config.is_schema(&path) {
            schemas.push(path);
        }
    }
    schemas.sort();

    // The destination is a real target so outputs can depend on it, even
    // when there is nothing to generate.
    rules.declare(Key::path(dest_dir), Rule::new(vec![], Action::MakeDir));

    let mut outputs = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let generated = schema.with_extension(config.generated_extension());
        let file_name = generated.file_name().expect("schema files have names");
        let output = dest_dir.join(file_name);
        rules.declare(
            Key::path(&output),
            Rule::new(
                vec![Key::path(&schema), Key::path(dest_dir)],
                Action::Invoke(config.compile(source_dir, dest_dir, &schema)),
            ),
        );
        cleanup.register(&output);
        outputs.push(output);
    }
    tracing::debug!(
        "declared {} schema rules from {}",
        outputs.len(),
        source_dir.display()
    );
    Ok(outputs)
}

pub(crate) fn in_place(
    rules: &mut RuleSet,
    cleanup: &mut CleanupRegistry,
    config: &ProtocConfig,
    source_dir: &Path,
) -> Result<Vec<PathBuf>, GenerateError> {
    let walker = GlobWalkerBuilder::new(source_dir, format!("**/*.{}", config.schema_ext))
        .file_type(FileType::FILE)
        .build()?;
    let mut schemas = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| GenerateError::Walk {
            dir: source_dir.to_owned(),
            source: io::Error::new(io::ErrorKind::Other, source),
        })?;
        schemas.push(entry.path().to_owned());
    }
    schemas.sort();

    let mut outputs = Vec::with_capacity(schemas.len());
    for schema in schemas {
        let output = schema.with_extension(config.generated_extension());
        rules.declare(
            Key::path(&output),
            Rule::new(
                vec![Key::path(&schema)],
                // Include and output stay the directory the caller named,
                // not the schema's own directory.
                Action::Invoke(config.compile(source_dir, source_dir, &schema)),
            ),
        );
        cleanup.register(&output);
        outputs.push(output);
    }
    tracing::debug!(
        "declared {} in-place schema rules under {}",
        outputs.len(),
        source_dir.display()
    );
    Ok(outputs)
}
