//! Aggregate statistics over elimination logs and a plain-text rendering.
use crate::compute::EliminationLog;
use crate::config::ControlMode;
use crate::workflow::{NodeFailure, WorkflowReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Counts and size statistics for one elimination log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrectionSummary {
    pub total_eliminated: usize,
    pub by_polymer: BTreeMap<String, usize>,
    pub by_color: BTreeMap<String, usize>,
    pub by_shape: BTreeMap<String, usize>,
    pub by_control_source: BTreeMap<String, usize>,
    /// `None` when nothing was eliminated.
    pub mean_size_difference: Option<f64>,
    pub median_size_difference: Option<f64>,
}

impl CorrectionSummary {
    pub fn from_log(log: &EliminationLog) -> Self {
        let mut summary = Self { total_eliminated: log.len(), ..Default::default() };
        for r in log {
            *summary.by_polymer.entry(r.polymer_type.clone()).or_default() += 1;
            *summary.by_color.entry(r.color.clone()).or_default() += 1;
            *summary.by_shape.entry(r.shape.clone()).or_default() += 1;
            *summary.by_control_source.entry(r.control_source.clone()).or_default() += 1;
        }

        let mut diffs: Vec<f64> = log.iter().map(|r| r.size_difference).collect();
        if !diffs.is_empty() {
            diffs.sort_by(f64::total_cmp);
            let n = diffs.len();
            summary.mean_size_difference = Some(diffs.iter().sum::<f64>() / n as f64);
            summary.median_size_difference = Some(if n % 2 == 1 {
                diffs[n / 2]
            } else {
                (diffs[n / 2 - 1] + diffs[n / 2]) / 2.0
            });
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub controls: Vec<String>,
    pub mode: Option<ControlMode>,
    pub input_particles: usize,
    pub remaining_particles: usize,
    pub correction: CorrectionSummary,
}

/// Per-node summaries of a workflow run, in processing order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub order: Vec<String>,
    pub nodes: Vec<NodeSummary>,
    pub failures: Vec<NodeFailure>,
    pub total_eliminated: usize,
}

impl RunSummary {
    pub fn from_report(report: &WorkflowReport) -> Self {
        let nodes = report
            .outputs
            .iter()
            .map(|out| NodeSummary {
                name: out.name.clone(),
                controls: out.controls.clone(),
                mode: out.mode,
                input_particles: out.input_particles,
                remaining_particles: out.outcome.corrected.len(),
                correction: CorrectionSummary::from_log(&out.outcome.log),
            })
            .collect();
        Self {
            order: report.order.clone(),
            nodes,
            failures: report.failures.clone(),
            total_eliminated: report.total_eliminated(),
        }
    }
}

pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "CORRECTION SUMMARY ({} eliminated):", summary.total_eliminated);
    let _ = writeln!(out, "--------------------------------------------------");

    for node in &summary.nodes {
        let controls = if node.controls.is_empty() { "-".to_string() } else { node.controls.join(", ") };
        let mode = match node.mode {
            Some(ControlMode::Sequential) => " [sequential]",
            Some(ControlMode::Synthetic) => " [synthetic]",
            None => "",
        };
        let _ = writeln!(
            out,
            "{} <- {}{}: {} -> {} particles",
            node.name, controls, mode, node.input_particles, node.remaining_particles
        );

        let c = &node.correction;
        if c.total_eliminated == 0 {
            continue;
        }
        let _ = writeln!(out, "  eliminated: {}", c.total_eliminated);
        if let (Some(mean), Some(median)) = (c.mean_size_difference, c.median_size_difference) {
            let _ = writeln!(out, "  size difference: mean {:.3}, median {:.3}", mean, median);
        }
        write_counts(&mut out, "polymer", &c.by_polymer);
        write_counts(&mut out, "color", &c.by_color);
        write_counts(&mut out, "shape", &c.by_shape);
        write_counts(&mut out, "source", &c.by_control_source);
    }

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "FAILED:");
        for f in &summary.failures {
            let _ = writeln!(out, "  {}: {}", f.node, f.reason);
        }
    }
    out
}

fn write_counts(out: &mut String, label: &str, counts: &BTreeMap<String, usize>) {
    let parts: Vec<String> = counts.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    let _ = writeln!(out, "  by {}: {}", label, parts.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::EliminationRecord;
    use crate::store::ParticleId;
    use rstest::rstest;

    fn record(polymer: &str, source: &str, diff: f64) -> EliminationRecord {
        EliminationRecord {
            eliminated_particle_id: ParticleId::from("e"),
            control_particle_id: ParticleId::from("c"),
            control_source: source.to_string(),
            size_difference: diff,
            polymer_type: polymer.to_string(),
            color: "blue".to_string(),
            shape: "fibre".to_string(),
        }
    }

    #[rstest]
    #[case(vec![3.0], 3.0, 3.0)]
    #[case(vec![1.0, 4.0], 2.5, 2.5)]
    #[case(vec![5.0, 1.0, 3.0], 3.0, 3.0)]
    #[case(vec![0.0, 0.0, 0.0, 8.0], 2.0, 0.0)]
    fn test_size_difference_statistics(#[case] diffs: Vec<f64>, #[case] mean: f64, #[case] median: f64) {
        let mut log = EliminationLog::new();
        for d in diffs {
            log.push(record("PE", "blank", d));
        }
        let summary = CorrectionSummary::from_log(&log);
        assert!((summary.mean_size_difference.unwrap() - mean).abs() < 1e-9);
        assert!((summary.median_size_difference.unwrap() - median).abs() < 1e-9);
    }

    #[test]
    fn test_counts_by_category() {
        let mut log = EliminationLog::new();
        log.push(record("PE", "blank", 1.0));
        log.push(record("PP", "blank", 1.0));
        log.push(record("PE", "blind", 1.0));
        let summary = CorrectionSummary::from_log(&log);

        assert_eq!(summary.total_eliminated, 3);
        assert_eq!(summary.by_polymer["PE"], 2);
        assert_eq!(summary.by_polymer["PP"], 1);
        assert_eq!(summary.by_color["blue"], 3);
        assert_eq!(summary.by_control_source["blind"], 1);
    }

    #[test]
    fn test_empty_log_has_no_statistics() {
        let summary = CorrectionSummary::from_log(&EliminationLog::new());
        assert_eq!(summary.total_eliminated, 0);
        assert!(summary.mean_size_difference.is_none());
        assert!(summary.by_polymer.is_empty());
    }

    #[test]
    fn test_format_lists_nodes_and_failures() {
        let mut log = EliminationLog::new();
        log.push(record("PE", "blank", 2.0));
        let summary = RunSummary {
            order: vec!["blank".into(), "env".into()],
            nodes: vec![NodeSummary {
                name: "env".into(),
                controls: vec!["blank".into()],
                mode: Some(ControlMode::Sequential),
                input_particles: 4,
                remaining_particles: 3,
                correction: CorrectionSummary::from_log(&log),
            }],
            failures: vec![NodeFailure { node: "blind".into(), reason: "boom".into() }],
            total_eliminated: 1,
        };
        let text = format_summary(&summary);

        assert!(text.starts_with("CORRECTION SUMMARY (1 eliminated):"));
        assert!(text.contains("env <- blank [sequential]: 4 -> 3 particles"));
        assert!(text.contains("  by polymer: PE=1"));
        assert!(text.contains("  size difference: mean 2.000, median 2.000"));
        assert!(text.contains("  blind: boom"));
    }
}
