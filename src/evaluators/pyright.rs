// Static type checking of generated Python with Pyright.
//
// The code is written to a scratch directory and checked with
// `pyright --outputjson`; error-severity diagnostics fail the evaluation.

use super::{EvalResult, Evaluator};
use crate::tools::{run_cmd_in_dir, write_file};
use crate::{Ctx, StepError};
use serde::Deserialize;
use tracing::debug;

pub const PYRIGHT_KEY: &str = "pyright_succeeded";

/// Prefix of the comment produced when Pyright's output is not the JSON
/// report we expect (missing binary, crash, version mismatch).
pub const PARSE_FAILURE_PREFIX: &str = "Failed to parse Pyright output";

pub struct PyrightEvaluator {
    command: String,
    ignored_rules: Vec<String>,
}

impl Default for PyrightEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl PyrightEvaluator {
    /// Runs `pyright` from `PATH`, ignoring unresolved third-party imports.
    pub fn new() -> Self {
        Self {
            command: "pyright".to_string(),
            ignored_rules: vec![
                "reportMissingImports".to_string(),
                "reportMissingModuleSource".to_string(),
            ],
        }
    }

    /// Use a different launcher, e.g. `npx pyright` or `uvx pyright`.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn ignore_rule(mut self, rule: impl Into<String>) -> Self {
        self.ignored_rules.push(rule.into());
        self
    }

    fn parse(&self, stdout: &str) -> EvalResult {
        let report: Report = match serde_json::from_str(stdout) {
            Ok(report) => report,
            Err(_) => {
                return EvalResult::fail(PYRIGHT_KEY, format!("{PARSE_FAILURE_PREFIX}: {stdout}"));
            }
        };

        let errors: Vec<String> = report
            .general_diagnostics
            .iter()
            .filter(|d| d.severity == "error")
            .filter(|d| {
                d.rule
                    .as_ref()
                    .is_none_or(|rule| !self.ignored_rules.contains(rule))
            })
            .map(Diagnostic::describe)
            .collect();

        if errors.is_empty() {
            EvalResult::pass(PYRIGHT_KEY)
        } else {
            EvalResult::fail(PYRIGHT_KEY, errors.join("\n"))
        }
    }
}

impl Evaluator for PyrightEvaluator {
    fn evaluate(&self, outputs: &str, ctx: &mut Ctx) -> Result<EvalResult, StepError> {
        let dir = tempfile::tempdir()?;
        write_file(&dir.path().join("outputs.py"), outputs)?;

        let output = run_cmd_in_dir(dir.path(), &format!("{} --outputjson outputs.py", self.command))?;
        debug!(success = output.success, bytes = output.stdout.len(), "pyright finished");

        let result = self.parse(&output.stdout);
        ctx.log(format!(
            "pyright: {}",
            if result.score { "clean" } else { "found problems" }
        ));
        Ok(result)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    #[serde(default)]
    general_diagnostics: Vec<Diagnostic>,
}

#[derive(Deserialize)]
struct Diagnostic {
    severity: String,
    message: String,
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    range: Option<Range>,
}

#[derive(Deserialize)]
struct Range {
    start: Position,
}

#[derive(Deserialize)]
struct Position {
    line: u32,
}

impl Diagnostic {
    fn describe(&self) -> String {
        let line = self
            .range
            .as_ref()
            .map(|r| format!("line {}: ", r.start.line + 1))
            .unwrap_or_default();
        match &self.rule {
            Some(rule) => format!("{line}{} ({rule})", self.message),
            None => format!("{line}{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "version": "1.1.380",
        "generalDiagnostics": [
            {
                "file": "/tmp/x/outputs.py",
                "severity": "error",
                "message": "Import \"langgraph\" could not be resolved",
                "range": {"start": {"line": 0, "character": 5}, "end": {"line": 0, "character": 14}},
                "rule": "reportMissingImports"
            },
            {
                "file": "/tmp/x/outputs.py",
                "severity": "error",
                "message": "\"foo\" is not defined",
                "range": {"start": {"line": 3, "character": 4}, "end": {"line": 3, "character": 7}},
                "rule": "reportUndefinedVariable"
            },
            {
                "file": "/tmp/x/outputs.py",
                "severity": "warning",
                "message": "Variable \"x\" is not accessed"
            }
        ],
        "summary": {"filesAnalyzed": 1, "errorCount": 2, "warningCount": 1}
    }"#;

    #[test]
    fn reports_errors_but_skips_ignored_rules_and_warnings() {
        let result = PyrightEvaluator::new().parse(REPORT);
        assert!(!result.score);
        assert_eq!(result.key, PYRIGHT_KEY);
        assert_eq!(
            result.comment.as_deref(),
            Some("line 4: \"foo\" is not defined (reportUndefinedVariable)")
        );
    }

    #[test]
    fn only_ignored_errors_pass() {
        let evaluator = PyrightEvaluator::new().ignore_rule("reportUndefinedVariable");
        assert!(evaluator.parse(REPORT).score);
    }

    #[test]
    fn clean_report_passes() {
        let result = PyrightEvaluator::new().parse(r#"{"generalDiagnostics": []}"#);
        assert_eq!(result, EvalResult::pass(PYRIGHT_KEY));
    }

    #[test]
    fn garbage_output_is_a_parse_failure() {
        let result = PyrightEvaluator::new().parse("sh: pyright: not found");
        assert!(!result.score);
        assert!(result.comment.unwrap().starts_with(PARSE_FAILURE_PREFIX));
    }

    #[test]
    fn missing_binary_fails_with_parse_comment() {
        let evaluator = PyrightEvaluator::new().with_command("definitely-not-pyright-xyz");
        let mut ctx = Ctx::new();
        let result = evaluator.evaluate("x: int = 1\n", &mut ctx).unwrap();

        assert!(!result.score);
        assert!(result.comment.unwrap().starts_with(PARSE_FAILURE_PREFIX));
        assert_eq!(ctx.logs(), ["pyright: found problems"]);
    }
}
