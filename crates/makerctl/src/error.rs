//! Top-level error reporting
//!
//! All failures funnel through [`print_diagnostic`], which renders a
//! cargo-style message with actionable tips and leaves the nonzero exit to
//! `main`. Handlers and the poller never print or exit on their own.

use colored::Colorize;
use makerctl_core::CoreError;

/// Cargo-style diagnostic: an error line plus indented tips.
struct CliDiagnostic {
    message: String,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    fn tip(mut self, description: &str, commands: &[String]) -> Self {
        self.tips
            .push((description.to_string(), commands.to_vec()));
        self
    }

    fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{description}");
            for command in commands {
                eprintln!("      {command}");
            }
        }
    }
}

fn suggestions(err: &CoreError) -> Vec<(String, Vec<String>)> {
    match err {
        CoreError::Config(_) => vec![(
            "store credentials for the provider first:".to_string(),
            vec!["makerctl auth --provider <do|aws|gcp>".to_string()],
        )],
        CoreError::Auth { provider, .. } => vec![(
            "re-enter the credentials:".to_string(),
            vec![format!("makerctl auth --provider {provider}")],
        )],
        CoreError::Unsupported { provider, .. } => vec![(
            format!("see what '{provider}' supports:"),
            vec!["makerctl create --help".to_string()],
        )],
        CoreError::LookupNotFound { kind, .. } => vec![(
            format!("check the {kind} name in the provider console"),
            vec![],
        )],
        CoreError::LookupAmbiguous { kind, .. } => vec![(
            format!("rename the duplicate {kind}s so the name is unique, then retry"),
            vec![],
        )],
        CoreError::PollTimeout(_) => vec![(
            "the operation may still finish; check status later or raise the deadline:"
                .to_string(),
            vec!["makerctl ... --wait-timeout 3600".to_string()],
        )],
        _ => vec![],
    }
}

pub fn print_diagnostic(err: &CoreError) {
    let mut diagnostic = CliDiagnostic::error(&err.to_string());
    for (description, commands) in suggestions(err) {
        diagnostic = diagnostic.tip(&description, &commands);
    }
    diagnostic.print();
}

#[cfg(test)]
mod tests {
    use super::*;
    use makerctl_core::{Provider, ResourceKind, Verb};

    #[test]
    fn auth_errors_point_back_at_auth() {
        let err = CoreError::auth(Provider::Aws, "bad key");
        let tips = suggestions(&err);
        assert!(tips[0].1[0].contains("auth --provider aws"));
    }

    #[test]
    fn unsupported_and_timeout_have_tips() {
        let unsupported = CoreError::Unsupported {
            provider: Provider::Gcp,
            kind: ResourceKind::Database,
            verb: Verb::Status,
        };
        assert!(!suggestions(&unsupported).is_empty());

        let timeout = CoreError::PollTimeout(std::time::Duration::from_secs(60));
        assert!(suggestions(&timeout)[0].1[0].contains("--wait-timeout"));
    }

    #[test]
    fn plain_failures_have_no_tips() {
        assert!(suggestions(&CoreError::Cancelled).is_empty());
    }
}
