//! Output formatting for the barrier outcome.
//!
//! Supports both human-readable and JSON output formats for
//! integration with scripts and other tools.

use muster_barrier::BarrierOutcome;

/// Trait for types that can be output in multiple formats.
pub trait Outputable {
    /// Convert to JSON value for structured output.
    fn to_json(&self) -> serde_json::Value;

    /// Convert to human-readable string.
    fn to_human(&self) -> String;
}

/// Print a value in the appropriate format.
pub fn print_output<T: Outputable>(value: &T, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&value.to_json())
                .unwrap_or_else(|e| { format!("{{\"error\": \"failed to serialize: {}\"}}", e) })
        );
    } else {
        println!("{}", value.to_human());
    }
}

/// Barrier passage summary.
pub struct OutcomeOutput<'a> {
    pub outcome: &'a BarrierOutcome,
}

impl Outputable for OutcomeOutput<'_> {
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.outcome).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
    }

    fn to_human(&self) -> String {
        let o = self.outcome;
        let statistics = match &o.statistics {
            Some(s) => format!("count={} max={} min={} mean={:.3}", s.count, s.max, s.min, s.mean),
            None => "none".to_string(),
        };

        format!(
            "Barrier Passed\n\
             ==============\n\
             Node:           {}\n\
             Participants:   {}/{}\n\
             Rounds:         {}\n\
             Elapsed:        {:.1}s\n\
             Leader:         {}\n\
             Statistics:     {}",
            o.node_path,
            o.live_count,
            o.required_count,
            o.rounds,
            o.elapsed_ms as f64 / 1000.0,
            if o.was_leader { "yes" } else { "no" },
            statistics
        )
    }
}
