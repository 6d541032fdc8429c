//! Renderers for validation reports.
//!
//! Each renderer writes one complete report for one document.

use runs_on_config_validation::{Diagnostic, Severity, ValidationReport};
use serde::Serialize;
use serde_json::json;
use std::io::{self, Write};

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

/// `file:line:col`, or just the file when the position is unknown.
fn location(source_name: &str, diagnostic: &Diagnostic) -> String {
    if diagnostic.has_position() {
        format!("{}:{}:{}", source_name, diagnostic.line, diagnostic.column)
    } else {
        source_name.to_string()
    }
}

fn write_group(
    out: &mut impl Write,
    source_name: &str,
    diagnostics: &[&Diagnostic],
) -> io::Result<()> {
    for (i, diagnostic) in diagnostics.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "  {}. {}", i + 1, location(source_name, diagnostic))?;
        writeln!(out, "     {}", diagnostic.message)?;
    }
    Ok(())
}

/// Human-readable report: errors, then warnings, then a summary line.
pub fn write_text(
    out: &mut impl Write,
    source_name: &str,
    report: &ValidationReport,
) -> io::Result<()> {
    if report.is_empty() {
        writeln!(out, "✓ No issues found")?;
        return Ok(());
    }

    let errors: Vec<_> = report.errors().collect();
    let warnings: Vec<_> = report.warnings().collect();

    if !errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "✗ Found {} error(s):", errors.len())?;
        writeln!(out)?;
        write_group(out, source_name, &errors)?;
    }

    if !warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "⚠ Found {} warning(s):", warnings.len())?;
        writeln!(out)?;
        write_group(out, source_name, &warnings)?;
    }

    writeln!(out)?;
    if errors.is_empty() {
        writeln!(out, "✓ Validation passed with {} warning(s)", warnings.len())?;
    } else if warnings.is_empty() {
        writeln!(out, "✗ Validation failed with {} error(s)", errors.len())?;
    } else {
        writeln!(
            out,
            "✗ Validation failed with {} error(s) and {} warning(s)",
            errors.len(),
            warnings.len()
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    valid: bool,
    diagnostics: Vec<JsonDiagnostic<'a>>,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    file: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "is_zero")]
    line: usize,
    #[serde(skip_serializing_if = "is_zero")]
    column: usize,
    message: &'a str,
    severity: Severity,
    code: &'a str,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Pretty-printed JSON report.
pub fn write_json(
    out: &mut impl Write,
    source_name: &str,
    report: &ValidationReport,
) -> io::Result<()> {
    let json_report = JsonReport {
        valid: report.is_valid(),
        diagnostics: report
            .diagnostics()
            .iter()
            .map(|d| JsonDiagnostic {
                file: source_name,
                path: &d.path,
                line: d.line,
                column: d.column,
                message: &d.message,
                severity: d.severity,
                code: &d.code,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &json_report)?;
    writeln!(out)
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    }
}

/// SARIF 2.1.0 log with a single run.
pub fn write_sarif(
    out: &mut impl Write,
    source_name: &str,
    report: &ValidationReport,
) -> io::Result<()> {
    // Rules in order of first use
    let mut rule_ids: Vec<&str> = Vec::new();
    for diagnostic in report.diagnostics() {
        if !rule_ids.contains(&diagnostic.code.as_str()) {
            rule_ids.push(&diagnostic.code);
        }
    }
    let rules: Vec<_> = rule_ids.iter().map(|id| json!({ "id": id })).collect();

    let results: Vec<_> = report
        .diagnostics()
        .iter()
        .map(|d| {
            let mut physical_location = json!({
                "artifactLocation": { "uri": source_name },
            });
            if d.has_position() {
                physical_location["region"] = json!({
                    "startLine": d.line,
                    "startColumn": d.column,
                });
            }
            json!({
                "ruleId": d.code,
                "level": sarif_level(d.severity),
                "message": { "text": d.message },
                "locations": [{ "physicalLocation": physical_location }],
            })
        })
        .collect();

    let log = json!({
        "$schema": SARIF_SCHEMA,
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "runs-on-config-lint",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules,
                }
            },
            "results": results,
        }],
    });
    serde_json::to_writer_pretty(&mut *out, &log)?;
    writeln!(out)
}
