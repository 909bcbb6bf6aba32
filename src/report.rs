use std::{fmt::Write as _, path::Path, str::FromStr};

use serde::Serialize;

use crate::config::Algorithm;
use crate::errors::{FilterCalcError, Result};
use crate::solver::{SearchStats, SearchStatus, Solution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = FilterCalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(FilterCalcError::invalid_argument(format!(
                "unknown report format `{other}`, expected text or json"
            ))),
        }
    }
}

/// A solution ready to be written out.
#[derive(Debug, Clone)]
pub struct Report {
    solution: Solution,
    algorithm: Algorithm,
    generated_at: chrono::DateTime<chrono::Local>,
}

#[derive(Serialize)]
struct JsonFilter<'a> {
    pattern: String,
    value: u32,
    mask: u32,
    acceptance_mask: u32,
    ids: &'a [u32],
    pass: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    algorithm: String,
    generated_at: String,
    width: u32,
    cost: u64,
    status: SearchStatus,
    stats: &'a SearchStats,
    filters: Vec<JsonFilter<'a>>,
}

impl Report {
    pub fn new(solution: Solution, algorithm: Algorithm) -> Self {
        Self {
            solution,
            algorithm,
            generated_at: chrono::Local::now(),
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => self.to_json(),
        }
    }

    pub fn to_text(&self) -> String {
        let solution = &self.solution;
        let width = solution.width();
        let hex_width = (width as usize).div_ceil(4);
        let binary = |id: &u32| format!("'{:0w$b}'", id, w = width as usize);

        let mut out = String::new();
        // writing into a String can't fail
        let _ = writeln!(out, "CAN filter calculation");
        let _ = writeln!(out, "algorithm : {}", self.algorithm);
        let _ = writeln!(
            out,
            "generated : {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S %:z")
        );
        let _ = writeln!(out, "width     : {width} bit");
        let _ = writeln!(
            out,
            "status    : {} ({} evaluated, {} improvements)",
            match solution.status() {
                SearchStatus::Completed => "completed",
                SearchStatus::Interrupted => "interrupted",
            },
            solution.stats().evaluated,
            solution.stats().improvements
        );

        let lists: Vec<String> = solution
            .groups()
            .iter()
            .map(|group| {
                let ids: Vec<String> = group.iter().map(binary).collect();
                format!("[{}]", ids.join(", "))
            })
            .collect();
        let patterns: Vec<String> = solution
            .filter_patterns()
            .into_iter()
            .map(|p| format!("'{p}'"))
            .collect();
        let _ = writeln!(out, "\nResult:\n");
        let _ = writeln!(out, "Lists:  [{}]\n", lists.join(", "));
        let _ = writeln!(out, "Filters:  [{}]\n", patterns.join(", "));
        let _ = writeln!(out, "Sum messages pass:  {}\n", solution.cost());

        let _ = writeln!(
            out,
            "{:>6} | {:>w$} | {:>w$} | {:>w$} | {:<p$} | {:>4} | {:>10}",
            "filter",
            "value",
            "mask",
            "accept",
            "pattern",
            "ids",
            "pass",
            w = hex_width.max(6) + 2,
            p = width as usize
        );
        for (index, ((filter, group), pass)) in solution
            .filters()
            .iter()
            .zip(solution.groups())
            .zip(solution.pass_counts())
            .enumerate()
        {
            let _ = writeln!(
                out,
                "{:>6} | {:>w$} | {:>w$} | {:>w$} | {:<p$} | {:>4} | {:>10}",
                index,
                format!("{:#0hw$X}", filter.value(), hw = hex_width + 2),
                format!("{:#0hw$X}", filter.mask(), hw = hex_width + 2),
                format!("{:#0hw$X}", filter.acceptance_mask(width), hw = hex_width + 2),
                filter.pattern(width),
                group.len(),
                pass,
                w = hex_width.max(6) + 2,
                p = width as usize
            );
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        let solution = &self.solution;
        let width = solution.width();
        let report = JsonReport {
            algorithm: self.algorithm.to_string(),
            generated_at: self.generated_at.to_rfc3339(),
            width,
            cost: solution.cost(),
            status: solution.status(),
            stats: solution.stats(),
            filters: solution
                .filters()
                .iter()
                .zip(solution.groups())
                .zip(solution.pass_counts())
                .map(|((filter, ids), &pass)| JsonFilter {
                    pattern: filter.pattern(width),
                    value: filter.value(),
                    mask: filter.mask(),
                    acceptance_mask: filter.acceptance_mask(width),
                    ids,
                    pass,
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    pub fn write_to(&self, path: &Path, format: ReportFormat) -> Result<()> {
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }
}
