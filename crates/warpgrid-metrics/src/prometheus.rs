//! Prometheus text exposition format.
//!
//! Renders recorded operation timings into the Prometheus text exposition
//! format for scraping by a Prometheus server or compatible agent.

use crate::timing::OperationTiming;

/// Render a list of operation timings into Prometheus text format.
///
/// Produces a COUNTER for call counts and total seconds, and a GAUGE for
/// the slowest observed call, each with an `operation` label.
pub fn render_prometheus(timings: &[OperationTiming]) -> String {
    let mut out = String::new();

    out.push_str("# HELP warpgrid_operation_calls_total Completed calls per operation.\n");
    out.push_str("# TYPE warpgrid_operation_calls_total counter\n");
    for t in timings {
        out.push_str(&format!(
            "warpgrid_operation_calls_total{{operation=\"{}\"}} {}\n",
            t.operation, t.count
        ));
    }

    out.push_str("# HELP warpgrid_operation_seconds_total Cumulative time spent per operation.\n");
    out.push_str("# TYPE warpgrid_operation_seconds_total counter\n");
    for t in timings {
        out.push_str(&format!(
            "warpgrid_operation_seconds_total{{operation=\"{}\"}} {:.6}\n",
            t.operation,
            t.total.as_secs_f64()
        ));
    }

    out.push_str("# HELP warpgrid_operation_max_seconds Slowest observed call per operation.\n");
    out.push_str("# TYPE warpgrid_operation_max_seconds gauge\n");
    for t in timings {
        out.push_str(&format!(
            "warpgrid_operation_max_seconds{{operation=\"{}\"}} {:.6}\n",
            t.operation,
            t.max.as_secs_f64()
        ));
    }

    out
}
