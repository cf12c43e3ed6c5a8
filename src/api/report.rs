use crate::core::{AggregateResult, DownsideShock};

pub fn render_report(result: &AggregateResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("Simulations Run        : {}\n", format_count(result.runs)));
    out.push_str(&format!(
        "Average Final Value    : {}\n",
        format_currency(result.average_final_value)
    ));
    out.push_str(&format!(
        "Median Final Value     : {}\n",
        format_currency(result.median_final_value)
    ));
    out.push_str(&format!(
        "P10 Final Value        : {}\n",
        format_currency(result.p10_final_value)
    ));
    out.push_str(&format!(
        "Insolvency Probability : {:.2}% (±{:.2}%)\n",
        result.insolvency_probability_pct, result.insolvency_ci_half_width_pct
    ));
    out.push_str(&format!(
        "Depleted Runs          : {}\n",
        format_count(result.depleted_runs)
    ));

    out.push_str("\nPosterior Shock Probabilities (monthly):\n");
    for shock in DownsideShock::ALL {
        out.push_str(&format!(
            "  {:<10}: {:.6}\n",
            shock.label(),
            result.posterior.get(shock)
        ));
    }

    out.push_str("\nTotal Shock Events Across All Runs:\n");
    for shock in DownsideShock::ALL {
        out.push_str(&format!(
            "  {:<10}: {}\n",
            shock.label(),
            format_count(result.total_hits.get(shock))
        ));
    }
    out
}

/// Whole dollars with thousands separators, e.g. `$1,234,567`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(&format!("{:.0}", rounded.abs())))
}

pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ShockCounts, ShockPosterior};

    fn sample_result() -> AggregateResult {
        AggregateResult {
            runs: 1_000_000,
            months: 120,
            insolvent_runs: 23_456,
            depleted_runs: 0,
            total_final_value: 1.0e15,
            average_final_value: 1_234_567_890.4,
            median_final_value: 1_200_000_000.0,
            p10_final_value: 950_000_000.0,
            insolvency_probability_pct: 2.3456,
            insolvency_ci_half_width_pct: 0.0296,
            total_hits: ShockCounts {
                recession: 240_123,
                war: 60_001,
                pandemic: 59_876,
                black_swan: 36_000,
            },
            posterior: ShockPosterior {
                recession: 0.002001,
                war: 0.0005,
                pandemic: 0.000499,
                black_swan: 0.0003,
            },
        }
    }

    #[test]
    fn currency_groups_and_rounds() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.6), "$1,000");
        assert_eq!(format_currency(1_234_567_890.4), "$1,234,567,890");
        assert_eq!(format_currency(-12_345.0), "-$12,345");
    }

    #[test]
    fn counts_group_by_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_000_000), "1,000,000");
    }

    #[test]
    fn report_has_expected_shape() {
        let report = render_report(&sample_result());
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "Simulations Run        : 1,000,000");
        assert_eq!(lines[1], "Average Final Value    : $1,234,567,890");
        assert_eq!(lines[4], "Insolvency Probability : 2.35% (±0.03%)");
        assert!(report.contains("Posterior Shock Probabilities (monthly):"));
        assert!(report.contains("  Recession : 0.002001"));
        assert!(report.contains("  Black Swan: 0.000300"));
        assert!(report.contains("Total Shock Events Across All Runs:"));
        assert!(report.contains("  Recession : 240,123"));
        assert!(report.contains("  Black Swan: 36,000"));
        assert!(report.ends_with("  Black Swan: 36,000\n"));
    }
}
