//! Legacy placeholder replacement.
//!
//! Older generated projects carry marker comments such as
//! `// this line is used by starport scaffolding # 1`. The [`Tracer`] replaces
//! them literally and remembers every marker it could not find, so a run can
//! report all of them at once.

use std::collections::BTreeSet;
use std::fmt;

/// Placeholders that were not found, plus any free-form errors appended during
/// the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPlaceholdersError {
    missing: Vec<String>,
    misc_errors: Vec<String>,
}

impl MissingPlaceholdersError {
    /// Missing placeholders, sorted and de-duplicated.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn misc_errors(&self) -> &[String] {
        &self.misc_errors
    }
}

impl fmt::Display for MissingPlaceholdersError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.missing.is_empty() {
            write!(f, "missing placeholders: {}", self.missing.join(", "))?;
            if !self.misc_errors.is_empty() {
                f.write_str("\n")?;
            }
        }
        f.write_str(&self.misc_errors.join("\n"))
    }
}

impl std::error::Error for MissingPlaceholdersError {}

#[derive(Debug, Clone, Default)]
pub struct Tracer {
    missing: BTreeSet<String>,
    misc_errors: Vec<String>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the first occurrence of `placeholder`. A missing placeholder is
    /// recorded and the content returned unchanged.
    pub fn replace(&mut self, content: &str, placeholder: &str, replacement: &str) -> String {
        if !content.contains(placeholder) {
            self.record_missing(placeholder);
            return content.to_string();
        }
        content.replacen(placeholder, replacement, 1)
    }

    /// Replaces every occurrence of `placeholder`.
    pub fn replace_all(&mut self, content: &str, placeholder: &str, replacement: &str) -> String {
        if !content.contains(placeholder) {
            self.record_missing(placeholder);
            return content.to_string();
        }
        content.replace(placeholder, replacement)
    }

    /// Like [`Tracer::replace`], but does nothing when `replacement` is already
    /// in the content.
    pub fn replace_once(&mut self, content: &str, placeholder: &str, replacement: &str) -> String {
        if content.contains(replacement) {
            return content.to_string();
        }
        self.replace(content, placeholder, replacement)
    }

    pub fn append_misc_error(&mut self, message: impl Into<String>) {
        self.misc_errors.push(message.into());
    }

    pub fn err(&self) -> Option<MissingPlaceholdersError> {
        if self.missing.is_empty() && self.misc_errors.is_empty() {
            return None;
        }
        Some(MissingPlaceholdersError {
            missing: self.missing.iter().cloned().collect(),
            misc_errors: self.misc_errors.clone(),
        })
    }

    fn record_missing(&mut self, placeholder: &str) {
        tracing::warn!(placeholder, "placeholder not found");
        self.missing.insert(placeholder.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "// this line is used by starport scaffolding # 1";

    #[test]
    fn replace_first_only() {
        let mut tracer = Tracer::new();
        let content = format!("{MARKER}\n{MARKER}\n");
        let replaced = tracer.replace(&content, MARKER, "a := 1");
        assert_eq!(replaced, format!("a := 1\n{MARKER}\n"));
        assert!(tracer.err().is_none());
    }

    #[test]
    fn replace_all_occurrences() {
        let mut tracer = Tracer::new();
        let content = format!("{MARKER}\n{MARKER}\n");
        assert_eq!(tracer.replace_all(&content, MARKER, "x"), "x\nx\n");
    }

    #[test]
    fn replace_once_skips_existing_replacement() {
        let mut tracer = Tracer::new();
        let content = format!("a := 1\n{MARKER}\n");
        let replaced = tracer.replace_once(&content, MARKER, "a := 1");
        assert_eq!(replaced, content);
        assert!(tracer.err().is_none());
    }

    #[test]
    fn missing_placeholders_are_sorted_and_unique() {
        let mut tracer = Tracer::new();
        tracer.replace("", "// b", "x");
        tracer.replace_all("", "// a", "x");
        tracer.replace_once("", "// b", "y");

        let err = tracer.err().unwrap();
        assert_eq!(err.missing(), ["// a", "// b"]);
        assert_eq!(err.to_string(), "missing placeholders: // a, // b");
    }

    #[test]
    fn misc_errors_are_reported() {
        let mut tracer = Tracer::new();
        tracer.append_misc_error("module foo already exists");
        assert_eq!(tracer.err().unwrap().to_string(), "module foo already exists");

        tracer.replace("", "// a", "x");
        assert_eq!(
            tracer.err().unwrap().to_string(),
            "missing placeholders: // a\nmodule foo already exists"
        );
    }
}
