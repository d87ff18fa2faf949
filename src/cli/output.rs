use serde::Serialize;

use crate::models::{IndexStats, OutputFormat, ProvisionOutcome, RunReport};

pub trait Formatter {
    fn format_run_report(&self, report: &RunReport) -> String;
    fn format_provision(&self, index: &str, outcome: ProvisionOutcome) -> String;
    fn format_index_stats(&self, index: &str, stats: &IndexStats) -> String;
    fn format_validation(&self, summary: &ValidationSummary) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

/// Result of a `--validate-only` run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub file: String,
    pub reviews: usize,
    pub with_text: usize,
    pub without_text: usize,
}

fn lines(lines: Vec<String>) -> String {
    let mut output = lines.join("\n");
    output.push('\n');
    output
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut out = vec![
            "Setup Complete".to_string(),
            "--------------".to_string(),
            format!("Index:      {} ({})", report.index, report.provision),
            format!("Namespace:  {}", report.namespace),
            format!("Loaded:     {}", report.loaded),
            format!("Embedded:   {}", report.embedded),
            format!("Skipped:    {}", report.skipped.len()),
            format!(
                "Upserted:   {} of {} in {} batch(es)",
                report.upserted, report.submitted, report.batches
            ),
            format!("Duration:   {}ms", report.duration_ms),
        ];

        for skipped in &report.skipped {
            out.push(format!(
                "  skipped #{} {}: {}",
                skipped.index, skipped.id, skipped.reason
            ));
        }
        for warning in &report.warnings {
            out.push(format!("Warning: {warning}"));
        }
        if let Some(ref stats) = report.stats {
            out.push(String::new());
            out.push(self.format_index_stats(&report.index, stats).trim_end().to_string());
        }
        lines(out)
    }

    fn format_provision(&self, index: &str, outcome: ProvisionOutcome) -> String {
        format!("Index {index}: {outcome}\n")
    }

    fn format_index_stats(&self, index: &str, stats: &IndexStats) -> String {
        let mut out = vec![
            format!("Index Stats: {index}"),
            format!(
                "  Dimension:     {}",
                stats
                    .dimension
                    .map_or_else(|| "unknown".to_string(), |d| d.to_string())
            ),
            format!("  Total vectors: {}", stats.total_vector_count),
        ];
        for (namespace, ns) in &stats.namespaces {
            out.push(format!("  {namespace}: {} vectors", ns.vector_count));
        }
        lines(out)
    }

    fn format_validation(&self, summary: &ValidationSummary) -> String {
        lines(vec![
            format!("{} is valid", summary.file),
            format!("  Reviews:      {}", summary.reviews),
            format!("  With text:    {}", summary.with_text),
            format!("  Without text: {}", summary.without_text),
        ])
    }

    fn format_message(&self, message: &str) -> String {
        format!("{message}\n")
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {error}\n")
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        self.render(report)
    }

    fn format_provision(&self, index: &str, outcome: ProvisionOutcome) -> String {
        self.render(&serde_json::json!({"index": index, "outcome": outcome}))
    }

    fn format_index_stats(&self, index: &str, stats: &IndexStats) -> String {
        self.render(&serde_json::json!({"index": index, "stats": stats}))
    }

    fn format_validation(&self, summary: &ValidationSummary) -> String {
        self.render(summary)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_run_report(&self, report: &RunReport) -> String {
        let mut out = vec![
            "## Setup Complete\n".to_string(),
            "| Metric | Value |".to_string(),
            "|--------|-------|".to_string(),
            format!("| Index | `{}` ({}) |", report.index, report.provision),
            format!("| Namespace | `{}` |", report.namespace),
            format!("| Loaded | {} |", report.loaded),
            format!("| Embedded | {} |", report.embedded),
            format!("| Skipped | {} |", report.skipped.len()),
            format!("| Submitted | {} |", report.submitted),
            format!("| Upserted | {} |", report.upserted),
            format!("| Batches | {} |", report.batches),
            format!("| Duration | {}ms |", report.duration_ms),
        ];

        if !report.skipped.is_empty() {
            out.push("\n### Skipped\n".to_string());
            for skipped in &report.skipped {
                out.push(format!(
                    "- #{} `{}`: {}",
                    skipped.index, skipped.id, skipped.reason
                ));
            }
        }
        if !report.warnings.is_empty() {
            out.push("\n### Warnings\n".to_string());
            for warning in &report.warnings {
                out.push(format!("- {warning}"));
            }
        }
        if let Some(ref stats) = report.stats {
            out.push(String::new());
            out.push(self.format_index_stats(&report.index, stats).trim_end().to_string());
        }
        lines(out)
    }

    fn format_provision(&self, index: &str, outcome: ProvisionOutcome) -> String {
        format!("> Index `{index}`: {outcome}\n")
    }

    fn format_index_stats(&self, index: &str, stats: &IndexStats) -> String {
        let mut out = vec![
            format!("## Index Stats: `{index}`\n"),
            format!("- **Total vectors:** {}", stats.total_vector_count),
        ];
        if let Some(dimension) = stats.dimension {
            out.push(format!("- **Dimension:** {dimension}"));
        }
        if !stats.namespaces.is_empty() {
            out.push(String::new());
            out.push("| Namespace | Vectors |".to_string());
            out.push("|-----------|---------|".to_string());
            for (namespace, ns) in &stats.namespaces {
                out.push(format!("| `{namespace}` | {} |", ns.vector_count));
            }
        }
        lines(out)
    }

    fn format_validation(&self, summary: &ValidationSummary) -> String {
        lines(vec![
            format!("## `{}` is valid\n", summary.file),
            format!("- **Reviews:** {}", summary.reviews),
            format!("- **With text:** {}", summary.with_text),
            format!("- **Without text:** {}", summary.without_text),
        ])
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {message}\n")
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {error}\n")
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
