//! Terminal output.
//!
//! stdout carries exactly one line (the metric); the run summary goes to the log.

use chrono::NaiveDateTime;

use crate::domain::Metric;

/// The metric line printed on stdout.
pub fn format_metric(value: f64) -> String {
    format!("{value:.5}")
}

/// One-line description of a finished run, for the log.
pub fn format_run_summary(
    experiment: &str,
    train: &[NaiveDateTime],
    test: &[NaiveDateTime],
    features: &[String],
    metric: Metric,
    score: f64,
) -> String {
    let window = |ts: &[NaiveDateTime]| match (ts.first(), ts.last()) {
        (Some(a), Some(b)) => format!("{a} .. {b}"),
        _ => "empty".to_string(),
    };
    format!(
        "{experiment}: train n={} [{}] | test n={} [{}] | features=[{}] | {}={}",
        train.len(),
        window(train),
        test.len(),
        window(test),
        features.join(", "),
        metric.display_name(),
        format_metric(score),
    )
}

/// Feature importance as `name=gain` pairs, largest first.
pub fn format_importance(importance: &[(String, f64)]) -> String {
    importance
        .iter()
        .map(|(name, gain)| format!("{name}={gain:.1}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn metric_has_five_decimals() {
        assert_eq!(format_metric(2948.498376), "2948.49838");
        assert_eq!(format_metric(0.0), "0.00000");
    }

    #[test]
    fn summary_names_windows_and_metric() {
        let day = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let train = [day.and_hms_opt(0, 0, 0).unwrap()];
        let test = [day.and_hms_opt(1, 0, 0).unwrap(), day.and_hms_opt(2, 0, 0).unwrap()];
        let line = format_run_summary("lgb", &train, &test, &["hour".to_string()], Metric::Mae, 1.5);
        assert_eq!(
            line,
            "lgb: train n=1 [2015-01-01 00:00:00 .. 2015-01-01 00:00:00] | \
             test n=2 [2015-01-01 01:00:00 .. 2015-01-01 02:00:00] | features=[hour] | MAE=1.50000"
        );
        assert!(format_run_summary("prophet", &[], &[], &[], Metric::Rmse, 0.0).contains("[empty]"));
    }

    #[test]
    fn importance_is_compact() {
        let imp = vec![("hour".to_string(), 10.0), ("year".to_string(), 0.3)];
        assert_eq!(format_importance(&imp), "hour=10.0 year=0.3");
    }
}
