//! Terminal statistics output

use crate::errors::Result;
use crate::features::cfl::application::pipeline::AnalysisReport;
use crate::features::cfl::ports::StatsSink;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Writes each report to `out` (stdout in the binary)
pub struct TerminalStatsSink<W: Write> {
    out: W,
    format: ReportFormat,
}

impl<W: Write> TerminalStatsSink<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_text(&mut self, report: &AnalysisReport) -> std::io::Result<()> {
        let out = &mut self.out;
        writeln!(out, "== {} ({}) ==", report.analysis, report.variant)?;
        writeln!(out, "nodes:            {}", report.nodes)?;
        writeln!(out, "edges:            {}", report.edges)?;

        if let Some(s) = &report.simplify {
            writeln!(
                out,
                "simplify:         {} -> {} nodes, {} -> {} edges",
                s.nodes_before, s.nodes_after, s.edges_before, s.edges_after
            )?;
            writeln!(out, "  scc merged:     {}", s.scc_merged)?;
            writeln!(out, "  folded:         {}", s.folded)?;
            writeln!(out, "  anchors:        {}", s.anchors)?;
            writeln!(out, "  pruned edges:   {}", s.pruned_edges)?;
            writeln!(out, "  time:           {:.2} ms", s.duration_ms)?;
        }

        if let Some(s) = &report.solver {
            writeln!(out, "iterations:       {}", s.iterations)?;
            writeln!(out, "checks:           {}", s.checks)?;
            if s.accelerator_checks > 0 || s.reachable_pairs > 0 {
                writeln!(out, "closure checks:   {}", s.accelerator_checks)?;
                writeln!(out, "closure pairs:    {}", s.reachable_pairs)?;
            }
            writeln!(out, "total edges:      {}", s.total_edges)?;
            writeln!(out, "summary edges:    {}", s.summary_edges)?;
            for (symbol, count) in &s.symbol_counts {
                writeln!(out, "  {:<16}{}", symbol, count)?;
            }
            if let Some(symbol) = &s.count_symbol {
                writeln!(out, "{} pairs:         {}", symbol, s.count_pairs)?;
            }
            writeln!(out, "solve time:       {:.2} ms", s.solve_ms)?;
        }
        Ok(())
    }
}

impl<W: Write> StatsSink for TerminalStatsSink<W> {
    fn report(&mut self, report: &AnalysisReport) -> Result<()> {
        match self.format {
            ReportFormat::Text => self.write_text(report)?,
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, report).map_err(std::io::Error::from)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cfl::infrastructure::fixpoint_solver::SolverStats;

    fn report() -> AnalysisReport {
        AnalysisReport {
            analysis: "cfl".to_string(),
            variant: "focr".to_string(),
            nodes: 3,
            edges: 2,
            simplify: None,
            solver: Some(SolverStats {
                count_symbol: Some("a".to_string()),
                count_pairs: 3,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_text_report() {
        let mut sink = TerminalStatsSink::new(Vec::new(), ReportFormat::Text);
        sink.report(&report()).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert!(text.starts_with("== cfl (focr) =="));
        assert!(text.contains("a pairs:"));
        assert!(!text.contains("simplify:"));
        assert!(!text.contains("closure checks"));
    }

    #[test]
    fn test_json_report() {
        let mut sink = TerminalStatsSink::new(Vec::new(), ReportFormat::Json);
        sink.report(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(value["nodes"], 3);
        assert_eq!(value["solver"]["count_pairs"], 3);
        assert!(value.get("simplify").is_none());
    }
}
