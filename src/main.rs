//! Ritual's main application entry point and orchestration logic.
//! Handles command-line argument parsing, the questionnaire, file generation and
//! migrations.

use std::path::{Path, PathBuf};

use ritual::{
    answers::{collect_answers, get_answers_from},
    cli::{get_args, Args},
    constants::ENV_PREFIX,
    error::{default_error_handler, Error, Result},
    flow::QuestionFlow,
    generator::FileGenerator,
    logger::init_logger,
    manifest::load_manifest,
    migration::{CommandSqlExecutor, MigrationRunner, ProcessScriptRunner},
    prompt::{DialoguerPrompter, Prompter},
    renderer::MiniJinjaRenderer,
    variables::VariableStore,
};

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Ensures the output directory is safe to write to.
///
/// # Errors
/// * `Error::OutputDirectoryExistsError` if the directory exists and force is false
pub fn get_output_dir<P: AsRef<Path>>(output_dir: P, force: bool) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    if output_dir.exists() && !force {
        return Err(Error::OutputDirectoryExistsError {
            output_dir: output_dir.display().to_string(),
        });
    }
    Ok(output_dir.to_path_buf())
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads and validates the recipe manifest
/// 2. Collects answers (preloaded, prompted or defaulted)
/// 3. Builds the variable store
/// 4. Generates the output tree
/// 5. Runs migrations when requested
fn run(args: Args) -> Result<()> {
    let output_root = get_output_dir(&args.output_dir, args.force)?;
    let manifest = load_manifest(&args.recipe)?;
    manifest.validate()?;
    println!("Using recipe '{}' from {}", manifest.name, args.recipe.display());

    let renderer = MiniJinjaRenderer::with_delimiters(&manifest.delimiters)?;

    let preloaded = get_answers_from(args.answers.as_deref(), args.stdin)?;
    let dialoguer = DialoguerPrompter::new();
    let prompter: Option<&dyn Prompter> =
        if args.non_interactive || args.stdin { None } else { Some(&dialoguer) };

    let mut flow = QuestionFlow::new(manifest.questions.clone());
    let answers = collect_answers(&mut flow, prompter, &preloaded)?;

    let mut variables = VariableStore::new();
    variables.import_env(ENV_PREFIX);
    variables.extend(&answers);
    variables.add_case_variants();
    variables.add_computed(chrono::Local::now());

    let mut generator = FileGenerator::new(&renderer, &args.recipe, &output_root);
    if let Some(shared_root) = &args.shared_root {
        generator = generator.with_shared_root(shared_root);
    }
    for file in generator.generate_files(&manifest.files, &variables)? {
        match &file.target {
            Some(target) => println!("{}: '{}'", file.action, target.display()),
            None => println!("{}: '{}'", file.action, file.source),
        }
    }

    if let Some(direction) = &args.migrate {
        let mut runner = MigrationRunner::new()
            .script_runner(ProcessScriptRunner::new().with_working_dir(&output_root))
            .script_root(&args.recipe)
            .dry_run(args.dry_run);
        if let Some(command) = &args.sql_command {
            runner = runner.sql_executor(CommandSqlExecutor::new(command));
        }

        let mut migrations = manifest.migrations.clone();
        if direction == "down" {
            migrations.reverse();
        }
        let result = runner.run_migration_chain(&migrations, direction);
        for record in runner.records() {
            println!(
                "Migration {} -> {}: {}",
                record.from_version, record.to_version, record.status
            );
        }
        result?;
    }

    println!("Generation completed successfully in {}.", output_root.display());
    Ok(())
}
