//! Ranking output for the command line.

use std::fmt::Write as _;

use lirical_common::evidence::{AnalysisResults, DiseaseResult};
use lirical_ranker::engine::AnalysisReporter;

pub enum Format {
    Text,
    Json,
    Yaml,
}

impl Format {
    pub fn from_name(name: &str) -> Self {
        match name {
            "json" => Format::Json,
            "yaml" => Format::Yaml,
            _ => Format::Text,
        }
    }
}

pub struct StdoutReporter {
    format: Format,
    top: usize,
}

impl StdoutReporter {
    pub fn new(format: Format, top: usize) -> Self {
        Self { format, top }
    }

    pub fn render(&self, results: &AnalysisResults) -> anyhow::Result<String> {
        Ok(match self.format {
            Format::Json => serde_json::to_string_pretty(results)?,
            Format::Yaml => serde_yaml::to_string(results)?,
            Format::Text => render_text(results, self.top),
        })
    }
}

impl AnalysisReporter for StdoutReporter {
    fn report(&self, results: &AnalysisResults) -> anyhow::Result<()> {
        println!("{}", self.render(results)?);
        Ok(())
    }
}

fn render_text(results: &AnalysisResults, top: usize) -> String {
    let mut out = String::new();
    let sample = results.metadata.sample_id.as_deref().unwrap_or("-");
    let _ = writeln!(
        out,
        "Sample {sample}: {} diseases ranked, {} skipped ({} ms)",
        results.metadata.diseases_evaluated, results.metadata.diseases_skipped, results.metadata.elapsed_ms
    );
    if !results.complete {
        let _ = writeln!(out, "WARNING: analysis timed out, ranking is partial");
    }
    for (rank, result) in results.top(top).iter().enumerate() {
        write_result(&mut out, rank + 1, result);
    }
    if !results.warnings.is_empty() {
        let _ = writeln!(out, "\n{} warning(s):", results.warnings.len());
        for w in &results.warnings {
            let _ = writeln!(out, "  - {w}");
        }
    }
    out
}

fn write_result(out: &mut String, rank: usize, result: &DiseaseResult) {
    let _ = writeln!(
        out,
        "\n{rank:>3}. {} [{}]  posttest {:.4}  (pretest {:.2e}, log10 LR {:+.3})",
        result.disease_name,
        result.disease_id,
        result.posttest_probability,
        result.pretest_probability,
        result.log10_composite_lr()
    );
    for c in &result.components {
        let _ = writeln!(out, "       {:<10} {:>9.3}  {}", format!("{:?}", c.kind), c.ratio(), c.explanation);
    }
}
