//! File generation: turns a manifest's file mappings into an output tree.

use log::{debug, info};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::condition::evaluate_expression;
use crate::constants::{
    DEFAULT_IGNORE_PATTERNS, SHARED_DIR, SHARED_MARKER, STATIC_DIR, TEMPLATES_DIR,
    TEMPLATE_SUFFIXES,
};
use crate::error::{Error, Result};
use crate::manifest::{DirectoryMapping, FileMapping, Files};
use crate::matcher::PathMatcher;
use crate::renderer::TemplateRenderer;
use crate::variables::VariableStore;

/// Whether a mapping's content is rendered or copied verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Template,
    Static,
}

impl MappingKind {
    fn root_dir(self) -> &'static str {
        match self {
            MappingKind::Template => TEMPLATES_DIR,
            MappingKind::Static => STATIC_DIR,
        }
    }
}

/// Outcome for one generated (or deliberately not generated) path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Written,
    Copied,
    CreatedDirectory,
    SkippedCondition,
    SkippedProtected,
    SkippedMissing,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileAction::Written => "Writing",
            FileAction::Copied => "Copying",
            FileAction::CreatedDirectory => "Creating directory",
            FileAction::SkippedCondition => "Skipping (condition not met)",
            FileAction::SkippedProtected => "Skipping (protected)",
            FileAction::SkippedMissing => "Skipping (optional source missing)",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    /// Declared or resolved source
    pub source: String,
    /// Absolute target, unknown when the mapping was skipped before resolution
    pub target: Option<PathBuf>,
    pub action: FileAction,
}

impl GeneratedFile {
    fn new(source: impl Into<String>, target: Option<PathBuf>, action: FileAction) -> Self {
        Self { source: source.into(), target, action }
    }
}

/// Per-run state shared by every mapping.
struct Pass<'v> {
    variables: &'v VariableStore,
    context: serde_json::Value,
    protected: PathMatcher,
    ignored: PathMatcher,
}

/// Generates files from a recipe into an output directory.
pub struct FileGenerator<'a> {
    renderer: &'a dyn TemplateRenderer,
    recipe_root: PathBuf,
    output_root: PathBuf,
    shared_root: Option<PathBuf>,
}

impl<'a> FileGenerator<'a> {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        renderer: &'a dyn TemplateRenderer,
        recipe_root: P,
        output_root: Q,
    ) -> Self {
        Self {
            renderer,
            recipe_root: recipe_root.into(),
            output_root: output_root.into(),
            shared_root: None,
        }
    }

    /// Overrides the shared template library, which otherwise is `<recipe>/../_shared`.
    pub fn with_shared_root<P: Into<PathBuf>>(mut self, shared_root: P) -> Self {
        self.shared_root = Some(shared_root.into());
        self
    }

    /// Generates directories, then templates, then static files.
    ///
    /// # Errors
    /// * `Error::ConditionError` for a malformed mapping condition
    /// * `Error::SourceNotFound` for a missing non-optional source
    /// * `Error::InvalidDestination` if a rendered destination escapes the output root
    /// * `Error::RenderError` / `Error::IoError` while producing a file
    pub fn generate_files(
        &self,
        files: &Files,
        variables: &VariableStore,
    ) -> Result<Vec<GeneratedFile>> {
        let pass = Pass {
            variables,
            context: variables.to_context(),
            protected: PathMatcher::new(&files.protected)?,
            ignored: PathMatcher::new(DEFAULT_IGNORE_PATTERNS.iter().copied().chain(
                files.ignore.iter().map(String::as_str),
            ))?,
        };

        let mut generated = Vec::new();
        for directory in &files.directories {
            generated.push(self.create_directory(directory, &pass)?);
        }
        for mapping in &files.templates {
            generated.extend(self.generate_mapping(MappingKind::Template, mapping, &pass)?);
        }
        for mapping in &files.static_files {
            generated.extend(self.generate_mapping(MappingKind::Static, mapping, &pass)?);
        }
        Ok(generated)
    }

    /// Resolves a declared source to a path under the recipe or the shared library.
    pub fn resolve_source(&self, kind: MappingKind, source: &str) -> Result<PathBuf> {
        match source.strip_prefix(SHARED_MARKER) {
            Some(shared) => {
                let root = match &self.shared_root {
                    Some(root) => root.clone(),
                    None => self
                        .recipe_root
                        .parent()
                        .map(|parent| parent.join(SHARED_DIR))
                        .ok_or_else(|| {
                            Error::ConfigError(format!(
                                "recipe '{}' has no parent for the shared library",
                                self.recipe_root.display()
                            ))
                        })?,
                };
                Ok(root.join(shared))
            }
            None => Ok(self.recipe_root.join(kind.root_dir()).join(source)),
        }
    }

    fn create_directory(
        &self,
        directory: &DirectoryMapping,
        pass: &Pass<'_>,
    ) -> Result<GeneratedFile> {
        if !holds(directory.condition.as_deref(), pass)? {
            debug!("Skipping directory '{}': condition not met", directory.path);
            return Ok(GeneratedFile::new(&directory.path, None, FileAction::SkippedCondition));
        }
        let relative = self.render_path(&directory.path, &directory.path, pass)?;
        let target = self.output_root.join(relative);
        fs::create_dir_all(&target)?;
        Ok(GeneratedFile::new(&directory.path, Some(target), FileAction::CreatedDirectory))
    }

    fn generate_mapping(
        &self,
        kind: MappingKind,
        mapping: &FileMapping,
        pass: &Pass<'_>,
    ) -> Result<Vec<GeneratedFile>> {
        if !holds(mapping.condition.as_deref(), pass)? {
            debug!("Skipping '{}': condition not met", mapping.source);
            return Ok(vec![GeneratedFile::new(
                &mapping.source,
                None,
                FileAction::SkippedCondition,
            )]);
        }

        let source = self.resolve_source(kind, &mapping.source)?;
        debug!("Resolved '{}' to {}", mapping.source, source.display());
        if !source.exists() {
            if mapping.optional {
                info!("Optional source {} is missing", source.display());
                return Ok(vec![GeneratedFile::new(
                    source.display().to_string(),
                    None,
                    FileAction::SkippedMissing,
                )]);
            }
            return Err(Error::SourceNotFound { path: source.display().to_string() });
        }

        let raw_destination = match &mapping.destination {
            Some(destination) => destination.clone(),
            None => default_destination(kind, &mapping.source),
        };
        let destination = self.render_path(&mapping.source, &raw_destination, pass)?;

        if !source.is_dir() {
            return Ok(vec![self.emit(kind, mapping, &source, &destination, pass)?]);
        }

        let mut generated = Vec::new();
        for entry in WalkDir::new(&source).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let relative = entry.path().strip_prefix(&source).map_err(|e| {
                Error::ConfigError(format!("{}: {e}", entry.path().display()))
            })?;
            if pass.ignored.is_match(relative) {
                debug!("Ignoring {}", entry.path().display());
                continue;
            }

            let relative = match kind {
                MappingKind::Template => {
                    let raw = relative.to_str().ok_or_else(|| {
                        Error::ConfigError(format!(
                            "non UTF-8 path: {}",
                            entry.path().display()
                        ))
                    })?;
                    let rendered = self.render_path(raw, raw, pass)?;
                    if entry.file_type().is_dir() {
                        rendered
                    } else {
                        strip_template_suffix(&rendered)
                    }
                }
                MappingKind::Static => relative.to_path_buf(),
            };
            let target_relative = destination.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(self.output_root.join(&target_relative))?;
            } else {
                generated.push(self.emit(kind, mapping, entry.path(), &target_relative, pass)?);
            }
        }
        Ok(generated)
    }

    /// Writes or copies one file unless its destination is protected and present.
    fn emit(
        &self,
        kind: MappingKind,
        mapping: &FileMapping,
        source: &Path,
        relative_target: &Path,
        pass: &Pass<'_>,
    ) -> Result<GeneratedFile> {
        let target = self.output_root.join(relative_target);
        let source_name = source.display().to_string();

        if target.exists() && (mapping.protected || pass.protected.is_match(relative_target)) {
            debug!("Keeping protected file {}", target.display());
            return Ok(GeneratedFile::new(source_name, Some(target), FileAction::SkippedProtected));
        }

        let action = match kind {
            MappingKind::Template => {
                let content = fs::read_to_string(source)?;
                let rendered = self.renderer.render(&source_name, &content, &pass.context)?;
                write_file(&target, &rendered)?;
                FileAction::Written
            }
            MappingKind::Static => {
                copy_file(source, &target)?;
                FileAction::Copied
            }
        };
        debug!("{action}: {}", target.display());
        Ok(GeneratedFile::new(source_name, Some(target), action))
    }

    /// Renders a destination path and checks that it stays inside the output root.
    fn render_path(&self, name: &str, raw: &str, pass: &Pass<'_>) -> Result<PathBuf> {
        let rendered = self.renderer.render(name, raw, &pass.context)?;
        if !is_rendered_path_valid(&rendered) {
            return Err(Error::InvalidDestination { path: rendered });
        }
        Ok(PathBuf::from(rendered))
    }
}

fn holds(condition: Option<&str>, pass: &Pass<'_>) -> Result<bool> {
    match condition {
        Some(expr) => evaluate_expression(expr, pass.variables.values()),
        None => Ok(true),
    }
}

fn default_destination(kind: MappingKind, source: &str) -> String {
    let source = source.strip_prefix(SHARED_MARKER).unwrap_or(source);
    match kind {
        MappingKind::Template => strip_template_suffix(Path::new(source)).display().to_string(),
        MappingKind::Static => source.to_string(),
    }
}

/// Returns the template suffix of a file name, if it carries one on top of a non-empty stem.
pub fn template_suffix(filename: &str) -> Option<&'static str> {
    TEMPLATE_SUFFIXES
        .iter()
        .copied()
        .find(|suffix| filename.len() > suffix.len() && filename.ends_with(suffix))
}

/// Removes a recognized template suffix from the last component of `path`.
pub fn strip_template_suffix<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
        return path.to_path_buf();
    };
    match template_suffix(filename) {
        Some(suffix) => path.with_file_name(&filename[..filename.len() - suffix.len()]),
        None => path.to_path_buf(),
    }
}

/// A rendered destination must be non-empty, relative, free of empty segments and
/// must not climb out of the output root.
pub fn is_rendered_path_valid(path: &str) -> bool {
    if path.trim().is_empty() || path.starts_with('/') || path.contains("//") {
        return false;
    }
    Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // The creation mode only applies to new files; narrow an existing one before writing.
    restrict_permissions(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    fs::set_permissions(dest, fs::metadata(source)?.permissions())?;
    Ok(())
}
