use super::clock_for;
use crate::output::print_json;
use crate::report::describe_verdict;
use anyhow::Context;
use tierback_core::{classifier::classify, config::Config, schedule};

/// `tierback check`: the verdict for a moment, with no side effects.
pub fn run(config: &Config, at: Option<&str>, json: bool) -> anyhow::Result<()> {
    let at = clock_for(at)?.now();
    let classification = classify(&at);
    let verdict = schedule::should_execute(config, at).context("failed to read ledger")?;

    if json {
        let value = serde_json::json!({
            "at": at,
            "classification": classification,
            "verdict": verdict,
        });
        return print_json(&value);
    }

    println!("Time:     {}", at.format("%Y-%m-%d %H:%M:%S %:z"));
    println!(
        "Level:    {}",
        classification
            .level
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("Execute:  {}", if verdict.execute { "yes" } else { "no" });
    println!("Reason:   {}", describe_verdict(&verdict));
    Ok(())
}
