use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write};

use crate::metrics::collector::MetricsCollector;
use crate::provisioner::SchedulingDecision;

#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq)]
pub enum OutputFormat {
    #[default]
    JSON,
    PrettyTable,
}

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
pub struct MetricsPrinterConfig {
    #[serde(default)]
    format: OutputFormat,
    output_file: std::path::PathBuf,
}

pub fn print_metrics(
    collector: &MetricsCollector,
    config: &MetricsPrinterConfig,
) -> std::io::Result<()> {
    let mut metrics_file = File::create(&config.output_file)?;
    match config.format {
        OutputFormat::PrettyTable => print_metrics_as_pretty_table(collector, &mut metrics_file),
        OutputFormat::JSON => print_metrics_as_json(collector, &mut metrics_file),
    }
}

pub fn print_metrics_as_pretty_table(
    metrics: &MetricsCollector,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let mut aggregated_table = Table::new();
    aggregated_table.add_row(row!["Metric", "Count"]);
    aggregated_table.add_row(row!["Solves", metrics.solves]);
    aggregated_table.add_row(row!["Total new node claims", metrics.total_new_node_claims]);
    aggregated_table.add_row(row![
        "Total unschedulable pods",
        metrics.total_unschedulable_pods
    ]);
    aggregated_table.add_row(row!["Unschedulable pods in last solve", metrics.unschedulable_pods]);
    for (node_pool, count) in metrics.no_compatible_instance_types.iter() {
        aggregated_table.add_row(row![
            format!("Nodepool {} without instance types", node_pool),
            count
        ]);
    }

    let mut stats_table = Table::new();
    stats_table.add_row(row!["Metric", "Min", "Max", "Mean", "Variance"]);
    stats_table.add_row(row![
        "Solve duration",
        metrics.solve_duration_stats.min(),
        metrics.solve_duration_stats.max(),
        metrics.solve_duration_stats.mean(),
        metrics.solve_duration_stats.population_variance()
    ]);
    stats_table.add_row(row![
        "Queue depth",
        metrics.queue_depth_stats.min(),
        metrics.queue_depth_stats.max(),
        metrics.queue_depth_stats.mean(),
        metrics.queue_depth_stats.population_variance()
    ]);

    aggregated_table.print(&mut *out)?;
    stats_table.print(&mut *out)?;
    Ok(())
}

#[derive(Serialize)]
struct MetricsJSON {
    counters: Counters,
    timings: Timings,
}

#[derive(Serialize)]
struct Counters {
    solves: u64,
    total_new_node_claims: u64,
    total_unschedulable_pods: u64,
    unschedulable_pods: usize,
    no_compatible_instance_types: std::collections::BTreeMap<String, u64>,
}

#[derive(Serialize)]
struct Timings {
    solve_duration: TimingsStats,
    queue_depth: TimingsStats,
}

#[derive(Serialize)]
struct TimingsStats {
    min: f64,
    max: f64,
    mean: f64,
    variance: f64,
}

pub fn print_metrics_as_json(
    metrics: &MetricsCollector,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let metrics = MetricsJSON {
        counters: Counters {
            solves: metrics.solves,
            total_new_node_claims: metrics.total_new_node_claims,
            total_unschedulable_pods: metrics.total_unschedulable_pods,
            unschedulable_pods: metrics.unschedulable_pods,
            no_compatible_instance_types: metrics.no_compatible_instance_types.clone(),
        },
        timings: Timings {
            solve_duration: TimingsStats {
                min: metrics.solve_duration_stats.min(),
                max: metrics.solve_duration_stats.max(),
                mean: metrics.solve_duration_stats.mean(),
                variance: metrics.solve_duration_stats.population_variance(),
            },
            queue_depth: TimingsStats {
                min: metrics.queue_depth_stats.min(),
                max: metrics.queue_depth_stats.max(),
                mean: metrics.queue_depth_stats.mean(),
                variance: metrics.queue_depth_stats.population_variance(),
            },
        },
    };

    let serialized_json = serde_json::to_string_pretty(&metrics)?;
    out.write_all(serialized_json.as_bytes())
}

/// Shows at most this many instance type options of a claim in a table.
const TABLE_INSTANCE_TYPES: usize = 5;

pub fn print_decision(
    decision: &SchedulingDecision,
    format: OutputFormat,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    match format {
        OutputFormat::JSON => {
            let serialized_json = serde_json::to_string_pretty(decision)?;
            out.write_all(serialized_json.as_bytes())?;
            out.write_all(b"\n")
        }
        OutputFormat::PrettyTable => print_decision_as_pretty_table(decision, out),
    }
}

fn print_decision_as_pretty_table(
    decision: &SchedulingDecision,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let mut claims_table = Table::new();
    claims_table.add_row(row!["Node claim", "Nodepool", "Pods", "Requests", "Instance types"]);
    for claim in decision.new_node_claims.iter() {
        let mut names: Vec<&str> = claim
            .instance_type_options
            .iter()
            .take(TABLE_INSTANCE_TYPES)
            .map(|it| it.name.as_str())
            .collect();
        if claim.instance_type_options.len() > TABLE_INSTANCE_TYPES {
            names.push("...");
        }
        claims_table.add_row(row![
            claim.hostname,
            claim.node_pool,
            claim.pods.len(),
            claim.requests,
            names.join(", ")
        ]);
    }

    let mut nodes_table = Table::new();
    nodes_table.add_row(row!["Existing node", "Pods"]);
    for node in decision.existing_nodes.iter() {
        nodes_table.add_row(row![node.node_name, node.pods.len()]);
    }

    let mut errors_table = Table::new();
    errors_table.add_row(row!["Pod", "Error"]);
    for (pod, error) in decision.pod_errors.iter() {
        errors_table.add_row(row![pod, error]);
    }

    claims_table.print(&mut *out)?;
    nodes_table.print(&mut *out)?;
    errors_table.print(&mut *out)?;
    writeln!(
        out,
        "no nodepools found: {}, pods remaining: {}, interruption: {:?}",
        decision.no_node_pools_found,
        decision.pods_remaining.len(),
        decision.interruption
    )
}
