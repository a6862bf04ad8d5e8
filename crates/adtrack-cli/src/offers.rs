//! Read-only offer listing and per-offer reports.

use chrono::Utc;
use clap::Subcommand;
use uuid::Uuid;

use adtrack_core::{
    cumulative_variation, experiment_outcome, format_locale_date, launch_series, peak_day,
    projection, seven_day_growth, DayCount, ExperimentOutcome, SeriesOverrides,
};
use adtrack_db::HistoryRow;

/// Sub-commands available under `offers`.
#[derive(Debug, Subcommand)]
pub enum OffersCommands {
    /// List every tracked offer with its current counts
    List,
    /// Print the launch-window report for one offer
    Report {
        /// Offer id
        id: Uuid,
    },
}

pub(crate) async fn run_offers(pool: &sqlx::PgPool, command: OffersCommands) -> anyhow::Result<()> {
    match command {
        OffersCommands::List => run_offers_list(pool).await,
        OffersCommands::Report { id } => run_offers_report(pool, id).await,
    }
}

/// Percent with one decimal, or a dash when there is no value.
pub(crate) fn fmt_growth(growth: Option<f64>) -> String {
    growth.map_or_else(|| "\u{2014}".to_string(), |g| format!("{g:.1}%"))
}

/// Counts of a series separated by spaces, oldest first.
pub(crate) fn series_line(series: &[DayCount]) -> String {
    series
        .iter()
        .map(|d| d.count.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

async fn run_offers_list(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let offers = adtrack_db::list_offers(pool).await?;

    if offers.is_empty() {
        println!("no offers found; create one through the API first");
        return Ok(());
    }

    println!(
        "{:<38}{:<30}{:>7}{:>7}{:>10}  ENABLED",
        "ID", "NAME", "TODAY", "YEST", "VAR"
    );
    for offer in &offers {
        let name = if offer.name.chars().count() > 28 {
            format!("{}...", offer.name.chars().take(25).collect::<String>())
        } else {
            offer.name.clone()
        };
        println!(
            "{:<38}{:<30}{:>7}{:>7}{:>10}  {}",
            offer.id,
            name,
            offer.active_today,
            offer.active_yesterday,
            offer.variation,
            if offer.enabled { "yes" } else { "no" }
        );
    }

    Ok(())
}

async fn run_offers_report(pool: &sqlx::PgPool, id: Uuid) -> anyhow::Result<()> {
    let offer = adtrack_db::get_offer(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("offer '{id}' not found"))?;
    let history: Vec<DayCount> = adtrack_db::list_offer_history(pool, id)
        .await?
        .iter()
        .map(HistoryRow::day_count)
        .collect();

    let today = Utc::now().date_naive();
    let overrides = SeriesOverrides::from_counts(offer.active_today, offer.active_yesterday);
    let series = launch_series(offer.created_on, &history, today, overrides);

    println!("# {}", offer.name);
    println!();
    println!("Created:    {}", format_locale_date(offer.created_on));
    println!(
        "Today:      {} (yesterday {}, {})",
        offer.active_today, offer.active_yesterday, offer.variation
    );
    println!("Days:       {}", history.len());
    println!("Launch:     {}", series_line(&series));

    match peak_day(&series) {
        Some(peak) => println!(
            "Peak:       {} on {}",
            peak.count,
            format_locale_date(peak.day)
        ),
        None => println!("Peak:       \u{2014}"),
    }
    println!("Projection: {} (next 5 days)", projection(&series));
    println!("7d growth:  {}", fmt_growth(seven_day_growth(&series)));
    println!("Overall:    {}%", cumulative_variation(&history));

    if let Some(arm) = offer.experiment.as_deref() {
        match experiment_outcome(&history) {
            ExperimentOutcome::Pending { days_recorded } => {
                println!("Experiment: {arm} (pending, {days_recorded} day(s) recorded)");
            }
            ExperimentOutcome::Complete { total } => {
                println!("Experiment: {arm} (complete, total {total})");
            }
        }
    }

    Ok(())
}
