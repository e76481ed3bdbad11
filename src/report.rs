use crate::analyzer::RiskReport;
use crate::correlation::CorrelationMatrix;
use crate::summary::Histogram;
use anyhow::Result;

const BAR_WIDTH: usize = 40;

/// Pretty JSON rendering of the report, terminal values included.
pub fn to_json(report: &RiskReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Compact label for a column header: first `width` chars of the asset id.
fn short_label(asset: &str, width: usize) -> String {
    asset.chars().take(width).collect()
}

pub fn format_correlation_table(matrix: &CorrelationMatrix) -> String {
    let assets = matrix.assets();
    let label_width = assets.iter().map(|a| a.chars().count()).max().unwrap_or(0).min(16);
    let mut out = String::new();

    out.push_str(&format!("{:<width$}", "", width = label_width + 2));
    for asset in assets {
        out.push_str(&format!(" {:>6}", short_label(asset, 6)));
    }
    out.push('\n');

    for (asset, row) in assets.iter().zip(matrix.values()) {
        out.push_str(&format!("{:<width$}", short_label(asset, label_width), width = label_width + 2));
        for value in row {
            out.push_str(&format!(" {:>+6.2}", value));
        }
        out.push('\n');
    }
    out
}

pub fn format_histogram(hist: &Histogram) -> String {
    let peak = hist.counts.iter().copied().max().unwrap_or(0).max(1);
    hist.bins()
        .map(|(start, end, count)| {
            let bar = "█".repeat(count * BAR_WIDTH / peak);
            format!("${:>12.2} - ${:>12.2} | {:<width$} {}\n", start, end, bar, count, width = BAR_WIDTH)
        })
        .collect()
}

/// Prints the report to stdout.
pub fn print_report(report: &RiskReport) {
    let s = &report.summary;

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║           Portfolio Monte Carlo Risk Report                ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!(
        "║  History            : {} -> {} ({} days)",
        report.first_return_date, report.last_return_date, report.observations
    );
    println!(
        "║  Simulation         : {} trials x {} days from ${:.2}",
        s.trials, report.horizon_days, report.initial_value
    );
    println!("║  Seed               : {}", report.simulation.seed);
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Mean Portfolio Value   : ${:>14.2}", s.mean);
    println!("║  Median Portfolio Value : ${:>14.2}", s.median);
    println!("║  5th Percentile Value   : ${:>14.2}", s.p5);
    println!("║  95th Percentile Value  : ${:>14.2}", s.p95);
    println!("║  Range                  : ${:.2} .. ${:.2}", s.min, s.max);
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Asset                  Weight");
    for (asset, w) in report.assets.iter().zip(report.weights.as_slice()) {
        println!("║    {:<20} {:>6.2}%", asset, w * 100.0);
    }
    println!("╠════════════════════════════════════════════════════════════╣");
    match report.correlation.average_pairwise {
        Some(avg) => println!("║  Average Pairwise Correlation: {:.2}", avg),
        None => println!("║  Average Pairwise Correlation: n/a (single asset)"),
    }
    println!("╚════════════════════════════════════════════════════════════╝");

    println!("\nCorrelation matrix:");
    print!("{}", format_correlation_table(&report.correlation.matrix));

    println!("\nTerminal value distribution:");
    print!("{}", format_histogram(&report.histogram));
    println!();
}
