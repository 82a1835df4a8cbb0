//! Console text for the two demos. Every function returns a `String`; the
//! binaries decide where it goes.

use crate::Matrix;
use crate::dataset::{ClusterSummary, Dataset};
use crate::error::Result;
use crate::pipeline::{HierarchicalOutcome, KMeansOutcome};
use std::path::PathBuf;

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn push_line(out: &mut String, line: impl AsRef<str>) {
    out.push_str(line.as_ref());
    out.push('\n');
}

pub fn missing_values(dataset: &Dataset) -> String {
    let mut out = String::new();
    for (name, count) in dataset.feature_names().iter().zip(dataset.missing_values()) {
        push_line(&mut out, format!("{:<14}{:>6}", name, count));
    }
    out
}

pub fn distribution(summary: &ClusterSummary) -> String {
    let mut out = String::from("cluster   count\n");
    for (k, count) in summary.counts.iter().enumerate() {
        push_line(&mut out, format!("{:<8}{:>7}", k, count));
    }
    out
}

/// One row per cluster, two decimals, like a grouped mean table.
pub fn feature_table(names: &[&str], rows: &Matrix) -> String {
    let mut out = format!("{:<8}", "cluster");
    for name in names {
        out.push_str(&format!("{:>14}", name));
    }
    out.push('\n');

    for (k, row) in rows.rows().into_iter().enumerate() {
        out.push_str(&format!("{:<8}", k));
        for value in row.iter() {
            out.push_str(&format!("{:>14.2}", value));
        }
        out.push('\n');
    }
    out
}

/// Names clusters by ascending mean age: young, adult, senior.
pub fn segment_interpretation(summary: &ClusterSummary) -> String {
    const PROFILES: [(&str, &str, &str); 3] = [
        ("Young", "low spend", "entry-level promotions"),
        ("Adults", "medium spend", "upsell"),
        ("Seniors", "high spend", "VIP loyalty"),
    ];

    let mut order: Vec<usize> = (0..summary.n_clusters()).collect();
    order.sort_by(|&a, &b| summary.means[[a, 0]].total_cmp(&summary.means[[b, 0]]));

    let mut out = String::new();
    for (rank, &k) in order.iter().enumerate() {
        let Some(&(group, spend, action)) = PROFILES.get(rank) else {
            break;
        };
        push_line(
            &mut out,
            format!(
                "• Cluster {} → {} (~{:.0} years), {} (~{:.0}) → {}",
                k,
                group,
                summary.means[[k, 0]],
                spend,
                summary.means[[k, 1]],
                action
            ),
        );
    }
    out
}

pub fn kmeans_report(outcome: &KMeansOutcome) -> Result<String> {
    let names = outcome.dataset.feature_names();
    let summary = outcome.dataset.cluster_summary(outcome.model.n_clusters())?;

    let mut out = String::new();
    push_line(&mut out, format!("\n{}", rule()));
    push_line(&mut out, "K-MEANS RESULTS");
    push_line(&mut out, rule());
    push_line(&mut out, format!("Inertia (WCSS): {:.2}", outcome.model.inertia.unwrap_or(f64::NAN)));
    push_line(&mut out, format!("Agreement with generating segments (ARI): {:.3}", outcome.agreement));
    push_line(&mut out, "\nCentroids (original scale):");
    out.push_str(&feature_table(names, &outcome.centroids));
    push_line(&mut out, "\nCustomers per cluster:");
    out.push_str(&distribution(&summary));
    push_line(&mut out, "\nMeans per cluster:");
    out.push_str(&feature_table(names, &summary.means));
    push_line(&mut out, "\nINTERPRETATION:");
    out.push_str(&segment_interpretation(&summary));
    push_line(&mut out, rule());
    Ok(out)
}

pub fn hierarchical_report(outcome: &HierarchicalOutcome, n_clusters: usize) -> Result<String> {
    let names = outcome.dataset.feature_names();
    let summary = outcome.dataset.cluster_summary(n_clusters)?;

    let mut out = String::new();
    push_line(&mut out, format!("\n{}", rule()));
    push_line(&mut out, "HIERARCHICAL CLUSTERING RESULTS");
    push_line(&mut out, rule());
    push_line(&mut out, format!("Cut height (Ward): {:.4}", outcome.cut_height));
    push_line(&mut out, format!("Agreement with generating segments (ARI): {:.3}", outcome.agreement));
    push_line(&mut out, "\nCustomers per cluster:");
    out.push_str(&distribution(&summary));
    push_line(&mut out, "\nMeans per cluster:");
    out.push_str(&feature_table(names, &summary.means));
    push_line(&mut out, "\nINTERPRETATION:");
    push_line(&mut out, "• Results very close to K-Means");
    push_line(&mut out, "• The dendrogram shows points fusing progressively");
    push_line(&mut out, "• The tree can be cut at another cluster count without refitting");
    push_line(&mut out, "• Suited to data with a natural hierarchical structure");
    push_line(&mut out, rule());
    Ok(out)
}

pub fn saved_files(paths: &[PathBuf]) -> String {
    let mut out = String::from("\nSaved plots:\n");
    for path in paths {
        push_line(&mut out, format!("  → {}", path.display()));
    }
    out
}
