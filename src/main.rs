use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use arr_dashboard::config::{Cli, Command, RangeArgs};
use arr_dashboard::logging::setup_logging;
use arr_dashboard::{
    compute_kpis, compute_monthly_snapshots, compute_recognized_revenue,
    compute_segment_breakdown, DataQualityEngine, DataSnapshot, MonthlyArrSnapshot, Period,
    PeriodRange, Severity,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.data.log_level)?;

    let data = DataSnapshot::load_dir(&cli.data.data_dir)
        .with_context(|| format!("Failed to load data from {}", cli.data.data_dir.display()))?;

    match cli.command {
        Command::Report { range, json } => run_report(&data, &range, json),
        Command::Segments { period, json } => run_segments(&data, period.as_deref(), json),
        Command::Kpis { range, json } => run_kpis(&data, &range, json),
        Command::Revenue { range, json } => run_revenue(&data, &range, json),
        Command::Validate { json } => run_validate(&data, json),
    }
}

fn resolve(data: &DataSnapshot, range: &RangeArgs) -> Result<Option<PeriodRange>> {
    data.resolve_range(range.from.as_deref(), range.to.as_deref())
        .context("Invalid --from/--to")
}

fn snapshots(data: &DataSnapshot, range: &RangeArgs) -> Result<Vec<MonthlyArrSnapshot>> {
    let Some(range) = resolve(data, range)? else {
        return Ok(Vec::new());
    };
    compute_monthly_snapshots(&data.customers, &data.subscriptions, &range)
        .with_context(|| format!("Failed to compute rollforward for {}", range))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn run_report(data: &DataSnapshot, range: &RangeArgs, json: bool) -> Result<()> {
    let snapshots = snapshots(data, range)?;
    if json {
        return print_json(&snapshots);
    }

    println!("📈 ARR Rollforward");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:<8} {:>14} {:>12} {:>12} {:>12} {:>12} {:>14} {:>6}",
        "Month", "Starting", "New", "Expansion", "Contraction", "Churned", "Ending", "Cust"
    );
    for s in &snapshots {
        println!(
            "{:<8} {:>14.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>14.2} {:>6}",
            s.period.to_string(),
            s.starting,
            s.new,
            s.expansion,
            s.contraction,
            s.churned,
            s.ending,
            s.active_customers
        );
    }
    if snapshots.is_empty() {
        println!("(no subscription history)");
    }

    Ok(())
}

fn run_segments(data: &DataSnapshot, period: Option<&str>, json: bool) -> Result<()> {
    let period = match period {
        Some(raw) => raw.parse::<Period>().context("Invalid --period")?,
        None => match data.default_range() {
            Some(range) => range.end(),
            None => {
                println!("(no subscription history)");
                return Ok(());
            }
        },
    };

    let breakdown = compute_segment_breakdown(&data.customers, &data.subscriptions, period)
        .with_context(|| format!("Failed to compute segments for {}", period))?;
    if json {
        return print_json(&breakdown);
    }

    println!("🧩 ARR by Segment - {}", period);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for (segment, totals) in &breakdown.segments {
        let share = totals
            .share
            .map(|s| format!("{:.1}%", s * rust_decimal::Decimal::ONE_HUNDRED))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:<12} {:>14.2} {:>6} customers {:>8}",
            segment.label(),
            totals.arr,
            totals.customer_count,
            share
        );
    }
    println!("{:<12} {:>14.2}", "Total", breakdown.total_arr);

    Ok(())
}

fn run_kpis(data: &DataSnapshot, range: &RangeArgs, json: bool) -> Result<()> {
    let kpis = compute_kpis(&snapshots(data, range)?);
    if json {
        return print_json(&kpis);
    }

    println!("🎯 {}", kpis.summary());
    Ok(())
}

fn run_revenue(data: &DataSnapshot, range: &RangeArgs, json: bool) -> Result<()> {
    let revenue = match resolve(data, range)? {
        Some(range) => compute_recognized_revenue(&data.customers, &data.transactions, &range)
            .context("Failed to compute recognized revenue")?,
        None => Vec::new(),
    };
    if json {
        return print_json(&revenue);
    }

    println!("💵 Recognized Revenue");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for r in &revenue {
        println!("{:<8} {:>14.2} {:>6} payments", r.period.to_string(), r.recognized, r.payments);
    }

    Ok(())
}

fn run_validate(data: &DataSnapshot, json: bool) -> Result<()> {
    let report = DataQualityEngine::new().validate_all(data);
    if json {
        return print_json(&report);
    }

    println!("✅ Data Quality");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for v in &report.validations {
        let mark = if v.passed { "✓" } else { "✗" };
        println!("{} {:<28} {} issues", mark, v.rule_name, v.issue_count);
    }
    for issue in &report.issues {
        let icon = match issue.severity {
            Severity::Critical => "🔴",
            Severity::Warning => "🟡",
            Severity::Info => "🔵",
        };
        println!("{} [{}] {}: {}", icon, issue.rule_name, issue.location, issue.issue);
        println!("   → {}", issue.recommendation);
    }
    println!("\n{}", report.summary());

    if let Some(reconciliation) = &report.reconciliation {
        println!("⚖️  {}", reconciliation.summary());
        for d in &reconciliation.discrepancies {
            println!("   {}", d.description());
        }
    }

    if report.has_critical_issues() {
        anyhow::bail!("Data has critical quality issues");
    }
    Ok(())
}
