//! Output and Reporting
//!
//! Formats validation outcomes and route listings for the terminal.

use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::registry::Registry;
use crate::validator::ValidationOutcome;

/// Output formatter for human-readable or JSON results
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

#[derive(Serialize)]
struct RouteLine<'a> {
    key: &'a str,
    method: &'a str,
    base_path: &'a str,
    template: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation_id: Option<&'a str>,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Disable ANSI colors regardless of the terminal
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_outcome(&self, method: &str, target: &str, outcome: &ValidationOutcome) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(outcome).unwrap_or_default();
        }

        let request = format!("{} {}", method.to_uppercase(), target);
        match outcome {
            ValidationOutcome::Ok => {
                if self.verbosity == VerbosityLevel::Quiet {
                    String::new()
                } else {
                    format!("{}  {}", self.colorize("✓ VALID", "32"), request)
                }
            }
            ValidationOutcome::ResourceNotFound => format!(
                "{}  {} - API does not provide resource",
                self.colorize("? NOT FOUND", "33"),
                request
            ),
            ValidationOutcome::Invalid(_) | ValidationOutcome::MultipleInvalid { .. } => {
                let errors = outcome.errors();
                let mut output = format!(
                    "{}  {} - {} error{}",
                    self.colorize("✗ INVALID", "31"),
                    request,
                    errors.len(),
                    if errors.len() == 1 { "" } else { "s" }
                );

                // Quiet mode reports only what the middleware would
                let shown = if self.verbosity == VerbosityLevel::Quiet {
                    &errors[..1.min(errors.len())]
                } else {
                    errors
                };
                for violation in shown {
                    output.push_str(&format!("\n    {}: {}", violation.path, violation.message));
                }

                if self.verbosity >= VerbosityLevel::Verbose
                    && let ValidationOutcome::MultipleInvalid { operation, .. } = outcome
                {
                    output.push_str(&format!("\n    operation: {}", operation));
                }
                output
            }
        }
    }

    pub fn format_routes(&self, registry: &Registry) -> String {
        let lines: Vec<RouteLine<'_>> = registry
            .entries()
            .iter()
            .map(|entry| RouteLine {
                key: entry.key.as_str(),
                method: entry.method().as_str(),
                base_path: entry.base_path(),
                template: &entry.operation.template,
                operation_id: entry.operation.operation_id.as_deref(),
            })
            .collect();

        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(&lines).unwrap_or_default();
        }

        let mut output = String::new();
        for line in &lines {
            output.push_str(&format!(
                "{:<8}{}{}",
                self.colorize(&line.method.to_uppercase(), "36"),
                line.base_path,
                line.template
            ));
            if self.verbosity >= VerbosityLevel::Verbose
                && let Some(id) = line.operation_id
            {
                output.push_str(&format!("  ({})", id));
            }
            output.push('\n');
        }

        if self.verbosity != VerbosityLevel::Quiet {
            output.push_str(&format!("{} operations\n", lines.len()));
        }
        output
    }
}
