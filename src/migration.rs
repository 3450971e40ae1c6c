//! Version migrations: sequencing, execution and the per-run audit log.
//!
//! The runner only orders steps and records outcomes. SQL statements go to an injected
//! [`SqlExecutor`]; scripts and inline code go to a [`ScriptRunner`]. Scripts run as
//! blocking subprocesses without a timeout.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::manifest::{Migration, MigrationHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(Error::MigrationConfigError(format!(
                "unknown migration direction '{other}', expected 'up' or 'down'"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Applied,
    RolledBack,
    Skipped,
    Failed,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MigrationStatus::Applied => "applied",
            MigrationStatus::RolledBack => "rolled back",
            MigrationStatus::Skipped => "skipped",
            MigrationStatus::Failed => "failed",
        })
    }
}

/// Outcome of one attempted migration step.
///
/// For rollbacks `from_version`/`to_version` are swapped so they read in the direction
/// the step moved.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRecord {
    pub from_version: String,
    pub to_version: String,
    pub description: String,
    pub status: MigrationStatus,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Executes SQL statements against a database connection owned by the caller.
pub trait SqlExecutor {
    fn execute(&mut self, statement: &str) -> anyhow::Result<()>;
}

/// Runs migration scripts and inline code.
pub trait ScriptRunner {
    fn run_script(&self, script: &Path, migration: &Migration) -> anyhow::Result<()>;

    fn run_inline(&self, code: &str, migration: &Migration) -> anyhow::Result<()>;
}

/// Runs scripts as child processes, exporting `RITUAL_FROM_VERSION` and `RITUAL_TO_VERSION`.
#[derive(Debug, Clone, Default)]
pub struct ProcessScriptRunner {
    working_dir: Option<PathBuf>,
}

impl ProcessScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn run(&self, mut command: Command, what: &str, migration: &Migration) -> anyhow::Result<()> {
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        let status = command
            .env("RITUAL_FROM_VERSION", &migration.from_version)
            .env("RITUAL_TO_VERSION", &migration.to_version)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to start {what}"))?;

        if !status.success() {
            bail!("{what} failed with status: {status}");
        }
        Ok(())
    }
}

impl ScriptRunner for ProcessScriptRunner {
    fn run_script(&self, script: &Path, migration: &Migration) -> anyhow::Result<()> {
        debug!("Running migration script {}", script.display());
        let what = format!("script '{}'", script.display());
        self.run(Command::new(script), &what, migration)
    }

    fn run_inline(&self, code: &str, migration: &Migration) -> anyhow::Result<()> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(code);
        self.run(command, "inline migration code", migration)
    }
}

/// Pipes each statement to the standard input of a shell command, e.g. `psql "$DATABASE_URL"`.
#[derive(Debug, Clone)]
pub struct CommandSqlExecutor {
    command: String,
}

impl CommandSqlExecutor {
    pub fn new<S: Into<String>>(command: S) -> Self {
        Self { command: command.into() }
    }
}

impl SqlExecutor for CommandSqlExecutor {
    fn execute(&mut self, statement: &str) -> anyhow::Result<()> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.command))?;

        let written = match child.stdin.take() {
            Some(mut stdin) => {
                stdin.write_all(statement.as_bytes()).and_then(|()| stdin.write_all(b"\n"))
            }
            None => Ok(()),
        };

        // Reap the child even when the statement could not be delivered.
        let status = child.wait()?;
        written.with_context(|| format!("failed to send statement to '{}'", self.command))?;
        if !status.success() {
            bail!("'{}' failed with status: {status}", self.command);
        }
        Ok(())
    }
}

/// Checks that a migration declares the handlers it needs.
///
/// # Errors
/// * `Error::MigrationConfigError` if `up` is empty, or `down` is empty on a migration
///   that is not idempotent
pub fn validate_migration(migration: &Migration) -> Result<()> {
    if migration.up.is_empty() {
        return Err(Error::MigrationConfigError(format!(
            "migration {} -> {} has no up handler",
            migration.from_version, migration.to_version
        )));
    }
    if !migration.idempotent && migration.down.is_empty() {
        return Err(Error::MigrationConfigError(format!(
            "migration {} -> {} is not idempotent and has no down handler",
            migration.from_version, migration.to_version
        )));
    }
    Ok(())
}

/// Applies or rolls back migrations, recording one [`MigrationRecord`] per attempt.
pub struct MigrationRunner {
    sql: Option<Box<dyn SqlExecutor>>,
    scripts: Box<dyn ScriptRunner>,
    script_root: PathBuf,
    dry_run: bool,
    records: Vec<MigrationRecord>,
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRunner {
    /// Creates a runner without SQL executor that runs scripts as subprocesses.
    pub fn new() -> Self {
        Self {
            sql: None,
            scripts: Box::new(ProcessScriptRunner::new()),
            script_root: PathBuf::from("."),
            dry_run: false,
            records: Vec::new(),
        }
    }

    pub fn sql_executor<E: SqlExecutor + 'static>(mut self, executor: E) -> Self {
        self.sql = Some(Box::new(executor));
        self
    }

    pub fn script_runner<R: ScriptRunner + 'static>(mut self, runner: R) -> Self {
        self.scripts = Box::new(runner);
        self
    }

    /// Directory relative script paths are resolved against.
    pub fn script_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.script_root = root.into();
        self
    }

    /// Records every step as skipped without executing anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Applies the `up` handler of a migration.
    ///
    /// # Errors
    /// * `Error::MigrationFailed` if the step fails; a failed record is appended first
    pub fn run_up(&mut self, migration: &Migration) -> Result<()> {
        self.run(migration, Direction::Up)
    }

    /// Applies the `down` handler of a migration.
    ///
    /// # Errors
    /// * `Error::MigrationFailed` if the step fails; a failed record is appended first
    pub fn run_down(&mut self, migration: &Migration) -> Result<()> {
        self.run(migration, Direction::Down)
    }

    /// Runs migrations strictly in the given order and stops at the first failure.
    ///
    /// The runner never reorders: for `"down"` the caller must pass the migrations already
    /// reversed (newest first).
    ///
    /// # Errors
    /// * `Error::MigrationConfigError` for an unknown direction or an invalid migration,
    ///   before any step runs
    /// * `Error::MigrationFailed` for the first failing step
    pub fn run_migration_chain(&mut self, migrations: &[Migration], direction: &str) -> Result<()> {
        let direction: Direction = direction.parse()?;
        migrations.iter().try_for_each(validate_migration)?;

        info!("Running {} migration(s) {direction}", migrations.len());
        for migration in migrations {
            self.run(migration, direction)?;
        }
        Ok(())
    }

    /// Every record of this run, in execution order.
    pub fn records(&self) -> &[MigrationRecord] {
        &self.records
    }

    pub fn get_applied_migrations(&self) -> Vec<&MigrationRecord> {
        self.with_status(MigrationStatus::Applied)
    }

    pub fn get_failed_migrations(&self) -> Vec<&MigrationRecord> {
        self.with_status(MigrationStatus::Failed)
    }

    fn with_status(&self, status: MigrationStatus) -> Vec<&MigrationRecord> {
        self.records.iter().filter(|r| r.status == status).collect()
    }

    fn run(&mut self, migration: &Migration, direction: Direction) -> Result<()> {
        let (from, to, handler, done) = match direction {
            Direction::Up => (
                &migration.from_version,
                &migration.to_version,
                &migration.up,
                MigrationStatus::Applied,
            ),
            Direction::Down => (
                &migration.to_version,
                &migration.from_version,
                &migration.down,
                MigrationStatus::RolledBack,
            ),
        };

        if self.dry_run {
            info!("Dry run: skipping migration {from} -> {to}");
            self.record(from, to, migration, MigrationStatus::Skipped, None);
            return Ok(());
        }

        match self.execute(handler, migration) {
            Ok(()) => {
                info!("Migration {from} -> {to} {done}");
                self.record(from, to, migration, done, None);
                Ok(())
            }
            Err(message) => {
                warn!("Migration {from} -> {to} failed: {message}");
                self.record(from, to, migration, MigrationStatus::Failed, Some(message.clone()));
                Err(Error::MigrationFailed { from: from.clone(), to: to.clone(), message })
            }
        }
    }

    fn execute(
        &mut self,
        handler: &MigrationHandler,
        migration: &Migration,
    ) -> std::result::Result<(), String> {
        let declared = [!handler.sql.is_empty(), handler.script.is_some(), handler.code.is_some()]
            .into_iter()
            .filter(|present| *present)
            .count();
        match declared {
            0 => return Err("no handler defined".to_string()),
            1 => {}
            _ => return Err("handler declares more than one of sql, script and code".to_string()),
        }

        if !handler.sql.is_empty() {
            let statements: Vec<&str> =
                handler.sql.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
            if statements.is_empty() {
                return Err("SQL handler contains only blank statements".to_string());
            }
            let executor = self.sql.as_mut().ok_or("no SQL executor configured")?;
            for statement in statements {
                debug!("Executing SQL: {statement}");
                executor.execute(statement).map_err(|e| format!("{e:#}"))?;
            }
            return Ok(());
        }

        if let Some(script) = &handler.script {
            let path =
                if script.is_absolute() { script.clone() } else { self.script_root.join(script) };
            if !path.is_file() {
                return Err(format!("script not found: {}", path.display()));
            }
            return self.scripts.run_script(&path, migration).map_err(|e| format!("{e:#}"));
        }

        match &handler.code {
            Some(code) if !code.trim().is_empty() => {
                self.scripts.run_inline(code, migration).map_err(|e| format!("{e:#}"))
            }
            _ => Err("inline code is blank".to_string()),
        }
    }

    fn record(
        &mut self,
        from: &str,
        to: &str,
        migration: &Migration,
        status: MigrationStatus,
        error: Option<String>,
    ) {
        self.records.push(MigrationRecord {
            from_version: from.to_string(),
            to_version: to.to_string(),
            description: migration.description.clone(),
            status,
            error,
            timestamp: Utc::now(),
        });
    }
}
