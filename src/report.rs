//! Report rendering in structured, delimited and markup encodings

use crate::engine::{ReconciliationResult, ReconciliationSummary};
use crate::error::{ReconError, Result};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tera::{Context, Tera};

const REPORT_TEMPLATE: &str = include_str!("templates/report.html");

/// Base name of every rendered report file
pub const REPORT_BASENAME: &str = "reconciliation_report";

/// Output encoding of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportFormat {
    /// JSON
    #[default]
    #[serde(rename = "json")]
    Structured,
    /// CSV
    #[serde(rename = "csv")]
    Delimited,
    /// HTML
    #[serde(rename = "html")]
    Markup,
}

impl ReportFormat {
    /// Parse a format selector, case-insensitively
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" | "structured" => Ok(Self::Structured),
            "csv" | "delimited" => Ok(Self::Delimited),
            "html" | "markup" => Ok(Self::Markup),
            _ => Err(ReconError::unsupported_format(s)),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::Delimited => "csv",
            Self::Markup => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Structured => "application/json",
            Self::Delimited => "text/csv",
            Self::Markup => "text/html",
        }
    }

    pub fn filename(&self) -> String {
        format!("{}.{}", REPORT_BASENAME, self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoded report plus the metadata needed to serve or attach it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub format: ReportFormat,
    pub content: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

impl RenderedReport {
    fn new(format: ReportFormat, content: Vec<u8>) -> Self {
        Self {
            format,
            content,
            mime_type: format.mime_type().to_string(),
            filename: format.filename(),
        }
    }

    pub fn as_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content)
            .map_err(|e| ReconError::internal(format!("report is not UTF-8: {}", e)))
    }

    /// Value for a `Content-Disposition` header
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// One of the three report sections
pub(crate) struct Section<'a> {
    pub key: &'static str,
    pub title: &'static str,
    pub empty_message: &'static str,
    pub records: &'a [Record],
}

pub(crate) fn sections(result: &ReconciliationResult) -> [Section<'_>; 3] {
    [
        Section {
            key: "sourceOnly",
            title: "Missing in Target",
            empty_message: "No missing records in target",
            records: &result.source_only,
        },
        Section {
            key: "targetOnly",
            title: "Missing in Source",
            empty_message: "No missing records in source",
            records: &result.target_only,
        },
        Section {
            key: "matched",
            title: "Matched",
            empty_message: "No matched records",
            records: &result.matched,
        },
    ]
}

/// Template-facing view of a section, with cells already formatted
#[derive(Debug, Serialize)]
pub(crate) struct SectionView {
    key: &'static str,
    title: &'static str,
    empty_message: &'static str,
    count: usize,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Build template views, keeping at most `row_limit` rows per section
pub(crate) fn section_views(result: &ReconciliationResult, row_limit: Option<usize>) -> Vec<SectionView> {
    sections(result)
        .iter()
        .map(|section| {
            let columns: Vec<String> = section
                .records
                .first()
                .map(|r| r.columns().map(str::to_string).collect())
                .unwrap_or_default();
            let limit = row_limit.unwrap_or(section.records.len());
            let rows = section
                .records
                .iter()
                .take(limit)
                .map(|record| row_cells(record, &columns))
                .collect();
            SectionView {
                key: section.key,
                title: section.title,
                empty_message: section.empty_message,
                count: section.records.len(),
                columns,
                rows,
            }
        })
        .collect()
}

fn row_cells<S: AsRef<str>>(record: &Record, columns: &[S]) -> Vec<String> {
    columns
        .iter()
        .map(|c| record.get(c.as_ref()).map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredReport<'a> {
    source_only: &'a [Record],
    target_only: &'a [Record],
    matched: &'a [Record],
    columns: &'a [String],
    summary: StructuredSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredSummary {
    #[serde(flatten)]
    counts: ReconciliationSummary,
    empty_sections: Vec<&'static str>,
}

/// Renders reconciliation results
pub struct ReportRenderer {
    templates: Tera,
}

impl ReportRenderer {
    pub fn new() -> Result<Self> {
        let mut templates = Tera::default();
        templates.add_raw_template("report.html", REPORT_TEMPLATE)?;
        Ok(Self { templates })
    }

    /// Render `result` in `format`
    pub fn render(&self, result: &ReconciliationResult, format: ReportFormat) -> Result<RenderedReport> {
        let content = match format {
            ReportFormat::Structured => self.render_structured(result)?,
            ReportFormat::Delimited => self.render_delimited(result)?,
            ReportFormat::Markup => self.render_markup(result)?,
        };
        log::debug!("Rendered {} report ({} bytes)", format, content.len());
        Ok(RenderedReport::new(format, content))
    }

    /// Render with a format given by name (`json`, `csv`, `html`, any case)
    pub fn render_named(&self, result: &ReconciliationResult, format: &str) -> Result<RenderedReport> {
        self.render(result, ReportFormat::parse(format)?)
    }

    fn render_structured(&self, result: &ReconciliationResult) -> Result<Vec<u8>> {
        let empty_sections = sections(result)
            .iter()
            .filter(|s| s.records.is_empty())
            .map(|s| s.key)
            .collect();

        let report = StructuredReport {
            source_only: &result.source_only,
            target_only: &result.target_only,
            matched: &result.matched,
            columns: &result.columns,
            summary: StructuredSummary {
                counts: result.summary(),
                empty_sections,
            },
        };

        let mut content = serde_json::to_vec_pretty(&report)?;
        content.push(b'\n');
        Ok(content)
    }

    fn render_delimited(&self, result: &ReconciliationResult) -> Result<Vec<u8>> {
        let mut content = Vec::new();

        for (index, section) in sections(result).iter().enumerate() {
            if index > 0 {
                content.push(b'\n');
            }

            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(Vec::new());

            writer.write_record([section.title])?;
            match section.records.first() {
                None => writer.write_record([section.empty_message])?,
                Some(first) => {
                    let columns: Vec<&str> = first.columns().collect();
                    writer.write_record(&columns)?;
                    for record in section.records {
                        writer.write_record(row_cells(record, &columns))?;
                    }
                }
            }

            let bytes = writer
                .into_inner()
                .map_err(|e| ReconError::internal(format!("failed to flush CSV section: {}", e)))?;
            content.extend_from_slice(&bytes);
        }

        Ok(content)
    }

    fn render_markup(&self, result: &ReconciliationResult) -> Result<Vec<u8>> {
        let mut context = Context::new();
        context.insert("sections", &section_views(result, None));
        let html = self.templates.render("report.html", &context)?;
        Ok(html.into_bytes())
    }
}

/// Read a structured report back into a result
pub fn parse_structured(content: &[u8]) -> Result<ReconciliationResult> {
    Ok(serde_json::from_slice(content)?)
}
