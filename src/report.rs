// 📣 Report sink - User-facing output of commands
// Commands hand templated records and error messages to a Reporter

use crate::db::Identity;
#[cfg(test)]
use std::cell::RefCell;

// ============================================================================
// TEMPLATES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    /// A profile was updated from one of its identities
    AutoProfile { uuid: String, identity: Identity },
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::AutoProfile { .. } => "autoprofile",
        }
    }

    pub fn render(&self) -> String {
        match self {
            Template::AutoProfile { uuid, identity } => {
                format!("Profile {} updated using identity {}", uuid, identity.id)
            }
        }
    }
}

// ============================================================================
// REPORTER
// ============================================================================

/// Output capability injected into commands, scoped to one invocation.
pub trait Reporter {
    fn display(&self, record: &Template);
    fn error(&self, message: &str);
}

/// Prints records to stdout and errors to stderr
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn display(&self, record: &Template) {
        tracing::debug!(template = record.name(), "display");
        println!("{}", record.render());
    }

    fn error(&self, message: &str) {
        tracing::debug!(error = message, "command error");
        eprintln!("Error: {}", message);
    }
}

/// Keeps everything in memory
#[cfg(test)]
#[derive(Default)]
pub struct MemoryReporter {
    pub records: RefCell<Vec<Template>>,
    pub errors: RefCell<Vec<String>>,
}

#[cfg(test)]
impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Reporter for MemoryReporter {
    fn display(&self, record: &Template) {
        self.records.borrow_mut().push(record.clone());
    }

    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autoprofile_render() {
        let identity = Identity::new(Some("uuid-1"), "git", None, None, Some("john_bot"));
        let record = Template::AutoProfile {
            uuid: "uuid-1".to_string(),
            identity: identity.clone(),
        };

        assert_eq!(record.name(), "autoprofile");
        assert_eq!(
            record.render(),
            format!("Profile uuid-1 updated using identity {}", identity.id)
        );
    }

    #[test]
    fn test_memory_reporter_collects() {
        let reporter = MemoryReporter::new();
        reporter.error("uuid-4 not found in the registry");

        assert_eq!(reporter.errors.borrow().len(), 1);
        assert!(reporter.records.borrow().is_empty());
    }
}
