//! Template rendering for Ritual.
//! Wraps MiniJinja with recipe-configurable delimiters, strict handling of undefined
//! variables and the case-conversion helpers.
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};

use crate::case;
use crate::error::{Error, Result};
use crate::manifest::Delimiters;

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `name` - Name reported in errors, usually the source path
    /// * `template` - Template string to render
    /// * `context` - Context variables for rendering
    ///
    /// # Returns
    /// * `Result<String>` - Rendered template string; nothing is returned on failure
    fn render(&self, name: &str, template: &str, context: &serde_json::Value) -> Result<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer using the default `[[ ]]`, `[% %]` and `[# #]` delimiters.
    pub fn new() -> Self {
        Self { env: base_environment() }
    }

    /// Creates a renderer with custom delimiters.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the delimiters are empty or ambiguous
    pub fn with_delimiters(delimiters: &Delimiters) -> Result<Self> {
        if delimiters.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::ConfigError("template delimiters cannot be empty".to_string()));
        }
        let syntax = SyntaxConfig::builder()
            .variable_delimiters(
                delimiters.variable_start.clone(),
                delimiters.variable_end.clone(),
            )
            .block_delimiters(delimiters.block_start.clone(), delimiters.block_end.clone())
            .comment_delimiters(delimiters.comment_start.clone(), delimiters.comment_end.clone())
            .build()
            .map_err(|e| Error::ConfigError(format!("invalid template delimiters: {e}")))?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        configure(&mut env);
        Ok(Self { env })
    }
}

impl Default for MiniJinjaRenderer {
    fn default() -> Self {
        MiniJinjaRenderer::new()
    }
}

fn base_environment() -> Environment<'static> {
    let mut env = Environment::new();
    let defaults = Delimiters::default();
    if let Ok(syntax) = SyntaxConfig::builder()
        .variable_delimiters(defaults.variable_start, defaults.variable_end)
        .block_delimiters(defaults.block_start, defaults.block_end)
        .comment_delimiters(defaults.comment_start, defaults.comment_end)
        .build()
    {
        env.set_syntax(syntax);
    }
    configure(&mut env);
    env
}

fn configure(env: &mut Environment<'static>) {
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);

    let helpers: [(&'static str, fn(&str) -> String); 7] = [
        ("upper", case::to_upper),
        ("lower", case::to_lower),
        ("title", case::to_title_case),
        ("pascal_case", case::to_pascal_case),
        ("camel_case", case::to_camel_case),
        ("snake_case", case::to_snake_case),
        ("kebab_case", case::to_kebab_case),
    ];
    for (name, helper) in helpers {
        env.add_filter(name, move |value: String| helper(&value));
        env.add_function(name, move |value: String| helper(&value));
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a template string using MiniJinja.
    ///
    /// # Errors
    /// * `Error::RenderError` naming the template if parsing or rendering fails,
    ///   including references to undefined variables
    fn render(&self, name: &str, template: &str, context: &serde_json::Value) -> Result<String> {
        self.env
            .render_named_str(name, template, context)
            .map_err(|source| Error::RenderError { template: name.to_string(), source })
    }
}
