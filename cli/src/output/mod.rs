//! Terminal rendering for agent answers, reports and tables

use colored::Colorize;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use taike_core::agent::{AgentOutcome, Termination};
use taike_core::forecast::BoundedForecast;
use taike_core::tools::ToolDefinition;
use taike_core::Report;

/// Spinner shown on stderr while the agent works; hidden when not a terminal
pub fn spinner(message: &str) -> ProgressBar {
    if !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn termination_label(termination: Termination) -> &'static str {
    match termination {
        Termination::FinalAnswer => "final answer",
        Termination::ImplicitAnswer => "implicit answer",
        Termination::BestEffort => "best effort",
        Termination::Exhausted => "iterations exhausted",
    }
}

/// Print the answer, and with `verbose` the step trace
pub fn print_outcome(outcome: &AgentOutcome, verbose: bool) {
    if verbose {
        for step in &outcome.steps {
            let tool = step.tool.as_deref().unwrap_or("-");
            println!(
                "{} #{} {} tool={} ({} ms)",
                "step".dimmed(),
                step.iteration,
                step.state.as_str(),
                tool,
                step.duration_ms
            );
        }
        println!(
            "{} {} LLM call(s), {} tool call(s), {} in {} ms\n",
            "done".dimmed(),
            outcome.llm_calls,
            outcome.tool_calls(),
            termination_label(outcome.termination),
            outcome.duration_ms
        );
    }

    if outcome.is_exhausted() {
        println!("{}", outcome.answer.yellow());
    } else {
        println!("{}", outcome.answer);
    }
}

pub fn print_report(report: &Report) {
    println!("{}", report.title.bold());
    println!("{} {}\n", "요약:".green(), report.summary);
    println!("{}", report.content);
}

pub fn print_tools(definitions: &[ToolDefinition]) {
    println!("{}\n", "🛠️  Available Tools".bold());
    for definition in definitions {
        println!("📦 {}", definition.name.cyan());
        let first_line = definition
            .description
            .lines()
            .next()
            .unwrap_or(&definition.description);
        println!("   {}\n", first_line);
    }
}

pub fn print_bounded(rows: &[BoundedForecast], capped_share: f64) {
    println!("{:<10} {:>6} {:>12} {:>12}", "district", "year", "raw", "bounded");
    for row in rows {
        let line = format!(
            "{:<10} {:>6} {:>12.1} {:>12.1}",
            row.district, row.year, row.child_user_raw, row.child_user
        );
        if row.was_capped() {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
    println!(
        "\n{} row(s), {:.1}% changed by bounding",
        rows.len(),
        capped_share * 100.0
    );
}
