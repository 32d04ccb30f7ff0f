use super::analytics_models::{FunnelStep, FunnelStepInput, ReportTable};

/// Ratio that treats an empty denominator as no conversion.
pub fn rate(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Match each step's page against a `pagePath` report and compute rates.
///
/// Pages match by exact path. A page with no row counts as zero views.
pub fn compute_funnel(steps: &[FunnelStepInput], table: &ReportTable) -> Vec<FunnelStep> {
    let path_idx = table.dimension_index("pagePath").unwrap_or(0);
    let views_idx = table.metric_index("screenPageViews");
    let sessions_idx = table.metric_index("sessions");

    let lookup = |page: &str| -> (f64, f64) {
        table
            .rows
            .iter()
            .filter(|row| row.dimensions.get(path_idx).map(String::as_str) == Some(page))
            .fold((0.0, 0.0), |(views, sessions), row| {
                let v = views_idx.and_then(|i| row.metrics.get(i)).copied().unwrap_or(0.0);
                let s = sessions_idx.and_then(|i| row.metrics.get(i)).copied().unwrap_or(0.0);
                (views + v, sessions + s)
            })
    };

    let mut out: Vec<FunnelStep> = Vec::with_capacity(steps.len());
    let mut first_sessions = 0.0;
    let mut previous_sessions = 0.0;

    for (i, step) in steps.iter().enumerate() {
        let (views, sessions) = lookup(&step.page);
        let name = step
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Step {}", i + 1));

        let (rate_from_previous, rate_from_first, drop_off) = if i == 0 {
            first_sessions = sessions;
            (1.0, 1.0, 0.0)
        } else {
            (
                rate(sessions, previous_sessions),
                rate(sessions, first_sessions),
                (previous_sessions - sessions).max(0.0),
            )
        };
        previous_sessions = sessions;

        out.push(FunnelStep {
            name,
            page: step.page.clone(),
            views,
            sessions,
            rate_from_previous,
            rate_from_first,
            drop_off,
        });
    }

    out
}
