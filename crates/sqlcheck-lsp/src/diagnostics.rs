//! Conversion from check results to LSP diagnostics

use sqlcheck_core::{CheckerResult, SyntaxError, Warning, WarningKind};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

pub const SOURCE: &str = "sqlcheck";

/// Editor severity for a warning kind
pub fn severity(kind: WarningKind) -> DiagnosticSeverity {
    match kind {
        WarningKind::Error => DiagnosticSeverity::ERROR,
        WarningKind::Warning => DiagnosticSeverity::WARNING,
        WarningKind::Info => DiagnosticSeverity::INFORMATION,
        WarningKind::Optimization => DiagnosticSeverity::HINT,
    }
}

/// All diagnostics for a result computed from `sql`
pub fn to_diagnostics(result: &CheckerResult, sql: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::with_capacity(result.warnings.len() + 1);

    if let Some(error) = &result.syntax_error {
        diagnostics.push(syntax_diagnostic(error, sql));
    }

    diagnostics.extend(
        result
            .warnings
            .iter()
            .map(|warning| warning_diagnostic(warning, sql)),
    );

    diagnostics
}

pub fn syntax_diagnostic(error: &SyntaxError, sql: &str) -> Diagnostic {
    let marker = error.marker_range(sql);
    let line = marker.start_line - 1;
    let end = line_width(sql, line);

    Diagnostic {
        range: Range {
            start: Position {
                line: line as u32,
                character: utf16_offset(sql, line, marker.start_column - 1).min(end),
            },
            end: Position {
                line: marker.end_line as u32 - 1,
                character: end,
            },
        },
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::String("syntax-error".to_string())),
        source: Some(SOURCE.to_string()),
        message: error.message.clone(),
        ..Default::default()
    }
}

/// Warnings cover a whole line: their own, or the first
pub fn warning_diagnostic(warning: &Warning, sql: &str) -> Diagnostic {
    let line_count = sql.split('\n').count().max(1);
    let line = warning.line.unwrap_or(1).clamp(1, line_count) - 1;

    let message = match &warning.suggestion {
        Some(suggestion) => format!("{}\n{}", warning.message, suggestion),
        None => warning.message.clone(),
    };

    Diagnostic {
        range: Range {
            start: Position {
                line: line as u32,
                character: 0,
            },
            end: Position {
                line: line as u32,
                character: line_width(sql, line),
            },
        },
        severity: Some(severity(warning.kind)),
        code: Some(NumberOrString::String(warning.code.as_str().to_string())),
        source: Some(SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

/// Width of a 0-based line in UTF-16 code units
fn line_width(sql: &str, line: usize) -> u32 {
    sql.split('\n')
        .nth(line)
        .map(|text| text.trim_end_matches('\r').encode_utf16().count() as u32)
        .unwrap_or(0)
}

/// UTF-16 offset of the char at `column` (0-based) on a 0-based line
fn utf16_offset(sql: &str, line: usize, column: usize) -> u32 {
    sql.split('\n')
        .nth(line)
        .map(|text| text.chars().take(column).map(char::len_utf16).sum::<usize>() as u32)
        .unwrap_or(0)
}
