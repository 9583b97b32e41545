//! Build-time enhancement of a classes directory.

use crate::context::{DefaultEnhancementContext, EnhancementFlags};
use crate::descriptor::TypeCategory;
use crate::enhancer::{DescriptorEnhancer, Enhancer};
use crate::error::EnhanceTaskError;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const CLASS_EXTENSION: &str = "class";

fn default_includes() -> Vec<String> {
    vec!["**/*.class".to_string()]
}

/// A directory plus ant-style include and exclude patterns, matched against
/// paths relative to the directory (`**` spans directories, `*` and `?` do
/// not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    pub directory: PathBuf,
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl FileSet {
    /// Every class file below `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            includes: default_includes(),
            excludes: Vec::new(),
        }
    }

    #[must_use]
    pub fn include(mut self, pattern: &str) -> Self {
        if self.includes == default_includes() {
            self.includes.clear();
        }
        self.includes.push(pattern.to_string());
        self
    }

    #[must_use]
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.excludes.push(pattern.to_string());
        self
    }
}

/// Build-time enhancement settings.
///
/// ```toml
/// classes_directory = "target/classes"
/// enable_lazy_initialization = true
///
/// [[file_sets]]
/// directory = "target/classes"
/// excludes = ["**/generated/**"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub classes_directory: PathBuf,
    /// Files to enhance. Empty means every class file in `classes_directory`.
    pub file_sets: Vec<FileSet>,
    #[serde(flatten)]
    pub flags: EnhancementFlags,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            classes_directory: PathBuf::from("target/classes"),
            file_sets: Vec::new(),
            flags: EnhancementFlags::default(),
        }
    }
}

impl EnhancerConfig {
    pub fn new(classes_directory: impl Into<PathBuf>) -> Self {
        Self {
            classes_directory: classes_directory.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, EnhanceTaskError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, EnhanceTaskError> {
        let source = fs::read_to_string(path).map_err(EnhanceTaskError::io(path))?;
        Self::from_toml_str(&source)
    }

    fn effective_file_sets(&self) -> Vec<FileSet> {
        if self.file_sets.is_empty() {
            vec![FileSet::new(&self.classes_directory)]
        } else {
            self.file_sets.clone()
        }
    }
}

/// What happened to one class file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Enhanced,
    /// The enhancer made no change; the file was not touched.
    Skipped,
}

/// Summary of a [`EnhanceTask::run`].
#[derive(Debug, Default)]
pub struct EnhanceReport {
    pub enhanced: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, EnhanceTaskError)>,
}

impl EnhanceReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Enhances the class files selected by an [`EnhancerConfig`].
pub struct EnhanceTask {
    config: EnhancerConfig,
    enhancer: Box<dyn Enhancer>,
    source_set: Vec<PathBuf>,
}

impl EnhanceTask {
    /// Creates a task using a [`DescriptorEnhancer`] configured from the
    /// config's flags.
    pub fn new(config: EnhancerConfig) -> Self {
        debug!("creating enhancer");
        let context = DefaultEnhancementContext::new(config.flags);
        Self::with_enhancer(config, Box::new(DescriptorEnhancer::new(context)))
    }

    pub fn with_enhancer(config: EnhancerConfig, enhancer: Box<dyn Enhancer>) -> Self {
        Self {
            config,
            enhancer,
            source_set: Vec::new(),
        }
    }

    pub const fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    pub fn source_set(&self) -> &[PathBuf] {
        &self.source_set
    }

    // ── Source set ───────────────────────────────────────────────

    /// Collects the class files selected by the file sets, in path order.
    pub fn assemble_source_set(&mut self) -> Result<&[PathBuf], EnhanceTaskError> {
        debug!("starting assembly of the source set");
        let mut files = Vec::new();
        for file_set in self.config.effective_file_sets() {
            add_file_set(&file_set, &mut files)?;
        }
        files.sort();
        files.dedup();
        self.source_set = files;
        debug!(files = self.source_set.len(), "ending assembly of the source set");
        Ok(&self.source_set)
    }

    /// Dotted class name of a class file below the classes directory.
    pub fn determine_class_name(&self, file: &Path) -> Result<String, EnhanceTaskError> {
        debug!(file = %file.display(), "determining class name");
        let relative = file
            .strip_prefix(&self.config.classes_directory)
            .map_err(|_| EnhanceTaskError::ClassName(file.to_path_buf()))?;
        if relative.extension().and_then(|e| e.to_str()) != Some(CLASS_EXTENSION) {
            return Err(EnhanceTaskError::ClassName(file.to_path_buf()));
        }
        let parts = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| EnhanceTaskError::ClassName(file.to_path_buf()))?;
        Ok(parts.join("."))
    }

    // ── Discovery ────────────────────────────────────────────────

    pub fn discover_types_for_file(&self, file: &Path) -> Result<(String, TypeCategory), EnhanceTaskError> {
        let (class_name, bytes) = self.read_class(file)?;
        let category = self.classify(file, &class_name, &bytes)?;
        Ok((class_name, category))
    }

    fn classify(&self, file: &Path, class_name: &str, bytes: &[u8]) -> Result<TypeCategory, EnhanceTaskError> {
        debug!(file = %file.display(), "trying to discover types");
        let category = self
            .enhancer
            .discover_types(class_name, bytes)
            .map_err(|source| EnhanceTaskError::Enhancement {
                path: file.to_path_buf(),
                source,
            })?;
        info!(file = %file.display(), ?category, "discovered types");
        Ok(category)
    }

    /// Classifies every file of the source set. Failures are logged and left
    /// out of the result.
    pub fn discover_types(&self) -> Vec<(String, TypeCategory)> {
        debug!("starting type discovery");
        let discovered = self
            .source_set
            .iter()
            .filter_map(|file| match self.discover_types_for_file(file) {
                Ok(found) => Some(found),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "type discovery failed");
                    None
                }
            })
            .collect();
        debug!("ending type discovery");
        discovered
    }

    // ── Enhancement ──────────────────────────────────────────────

    /// Enhances one class file. An unchanged class leaves the file, and its
    /// modification time, untouched.
    pub fn enhance_file(&self, file: &Path) -> Result<FileOutcome, EnhanceTaskError> {
        let (class_name, original) = self.read_class(file)?;
        self.enhance_class(file, &class_name, &original)
    }

    fn read_class(&self, file: &Path) -> Result<(String, Vec<u8>), EnhanceTaskError> {
        let class_name = self.determine_class_name(file)?;
        let bytes = fs::read(file).map_err(EnhanceTaskError::io(file))?;
        Ok((class_name, bytes))
    }

    fn enhance_class(&self, file: &Path, class_name: &str, original: &[u8]) -> Result<FileOutcome, EnhanceTaskError> {
        debug!(file = %file.display(), "trying to enhance class file");
        let enhanced = self
            .enhancer
            .enhance(class_name, original)
            .map_err(|source| EnhanceTaskError::Enhancement {
                path: file.to_path_buf(),
                source,
            })?;

        match enhanced {
            Some(bytes) if bytes != original => {
                write_byte_code(&bytes, file)?;
                info!(file = %file.display(), "enhanced class file");
                Ok(FileOutcome::Enhanced)
            }
            _ => {
                info!(file = %file.display(), "skipping file, no enhancement needed");
                Ok(FileOutcome::Skipped)
            }
        }
    }

    /// Classifies one class file and enhances it if it is a mapped type.
    /// The file is read and parsed for classification once; unmapped types
    /// are skipped without running the enhancer.
    fn process_file(&self, file: &Path) -> Result<FileOutcome, EnhanceTaskError> {
        let (class_name, original) = self.read_class(file)?;
        if self.classify(file, &class_name, &original)? == TypeCategory::Other {
            info!(file = %file.display(), "skipping file, not a mapped type");
            return Ok(FileOutcome::Skipped);
        }
        self.enhance_class(file, &class_name, &original)
    }

    /// Assembles the source set, then classifies and enhances every file.
    /// A failing file is logged, recorded in the report, and the run
    /// continues.
    pub fn run(&mut self) -> Result<EnhanceReport, EnhanceTaskError> {
        if !self.config.classes_directory.is_dir() {
            warn!(
                directory = %self.config.classes_directory.display(),
                "classes directory does not exist, nothing to enhance"
            );
            return Ok(EnhanceReport::default());
        }

        self.assemble_source_set()?;

        debug!("starting class enhancement");
        let mut report = EnhanceReport::default();
        for file in &self.source_set {
            match self.process_file(file) {
                Ok(FileOutcome::Enhanced) => report.enhanced.push(file.clone()),
                Ok(FileOutcome::Skipped) => report.skipped.push(file.clone()),
                Err(e) => {
                    error!(file = %file.display(), error = %e, "error while enhancing class file");
                    report.failed.push((file.clone(), e));
                }
            }
        }
        debug!(
            enhanced = report.enhanced.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "ending class enhancement"
        );
        Ok(report)
    }
}

// ── File handling ────────────────────────────────────────────────

fn add_file_set(file_set: &FileSet, files: &mut Vec<PathBuf>) -> Result<(), EnhanceTaskError> {
    debug!(directory = %file_set.directory.display(), "processing file set");
    let includes = compile_patterns(&file_set.includes)?;
    let excludes = compile_patterns(&file_set.excludes)?;

    let mut candidates = Vec::new();
    walk(&file_set.directory, &mut candidates)?;
    for path in candidates {
        let Some(relative) = relative_slash_path(&file_set.directory, &path) else {
            continue;
        };
        if !includes.iter().any(|p| p.is_match(&relative)) || excludes.iter().any(|p| p.is_match(&relative)) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(CLASS_EXTENSION) {
            debug!(file = %path.display(), "skipping non class file");
            continue;
        }
        info!(file = %path.display(), "added file to source set");
        files.push(path);
    }
    debug!("file set processed successfully");
    Ok(())
}

fn walk(directory: &Path, out: &mut Vec<PathBuf>) -> Result<(), EnhanceTaskError> {
    let entries = fs::read_dir(directory).map_err(EnhanceTaskError::io(directory))?;
    for entry in entries {
        let path = entry.map_err(EnhanceTaskError::io(directory))?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, EnhanceTaskError> {
    patterns.iter().map(|p| ant_pattern(p)).collect()
}

/// Compiles an ant-style path pattern to an anchored regex.
pub fn ant_pattern(pattern: &str) -> Result<Regex, EnhanceTaskError> {
    let mut regex = String::from("^");
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**/") {
            regex.push_str("(?:.*/)?");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("**") {
            regex.push_str(".*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            regex.push_str("[^/]*");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('?') {
            regex.push_str("[^/]");
            rest = tail;
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                regex.push_str(&regex_lite::escape(c.encode_utf8(&mut [0; 4])));
            }
            rest = chars.as_str();
        }
    }
    regex.push('$');
    Regex::new(&regex).map_err(|source| EnhanceTaskError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Truncates an existing file.
fn clear_file(file: &Path) -> Result<(), EnhanceTaskError> {
    debug!(file = %file.display(), "trying to clear file");
    if !file.is_file() {
        error!(file = %file.display(), "unable to clear file");
        return Err(EnhanceTaskError::io(file)(std::io::Error::from(std::io::ErrorKind::NotFound)));
    }
    fs::File::create(file).map_err(EnhanceTaskError::io(file))?;
    info!(file = %file.display(), "cleared file");
    Ok(())
}

fn write_byte_code(bytes: &[u8], file: &Path) -> Result<(), EnhanceTaskError> {
    debug!(file = %file.display(), "writing byte code to file");
    clear_file(file)?;
    fs::write(file, bytes).map_err(EnhanceTaskError::io(file))?;
    debug!(file = %file.display(), bytes = bytes.len(), "byte code written");
    Ok(())
}
