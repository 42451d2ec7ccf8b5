//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output: colored status
//! messages, pass reports and plans.

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use podsync_lib::Plan;
use podsync_lib::execute::{Outcome, PassReport, SkipReason};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const PLUS: &str = "+";
  pub const MINUS: &str = "-";
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

pub fn skip_reason(reason: SkipReason) -> &'static str {
  match reason {
    SkipReason::NotTriggered => "not triggered",
    SkipReason::PodExists => "pod exists",
    SkipReason::PodMissing => "pod missing",
    SkipReason::ServiceActive => "service active",
    SkipReason::ServiceInactive => "service inactive",
    SkipReason::UpToDate => "up to date",
  }
}

pub fn print_report(report: &PassReport) {
  print_info(&format!("{} ({}, {})", report.pod, report.ensure, report.context));

  for record in &report.actions {
    let action = record.action.to_string();
    match record.outcome {
      Outcome::Ran { changed: true } => println!(
        "  {} {} {}",
        symbols::PLUS.if_supports_color(Stream::Stdout, |s| s.green()),
        action,
        "changed".if_supports_color(Stream::Stdout, |s| s.dimmed())
      ),
      Outcome::Ran { changed: false } => println!(
        "  {} {} {}",
        symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
        action,
        "ran".if_supports_color(Stream::Stdout, |s| s.dimmed())
      ),
      Outcome::Skipped { reason } => println!(
        "  {} {} {}",
        symbols::MINUS.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        action.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        format!("skipped ({})", skip_reason(reason)).if_supports_color(Stream::Stdout, |s| s.dimmed())
      ),
      Outcome::Failed => println!(
        "  {} {} {}",
        symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
        action,
        "failed".if_supports_color(Stream::Stdout, |s| s.red())
      ),
    }
  }

  // The caller prints the failure.
  if report.failure.is_none() {
    println!();
    if report.changed().is_empty() {
      print_success("Already converged");
    } else {
      print_success(&format!("Converged with {} change(s)", report.changed().len()));
    }
  }
}

pub fn print_report_json(report: &PassReport) -> anyhow::Result<()> {
  print_json(&serde_json::json!({
    "pod": report.pod,
    "ensure": report.ensure,
    "context": report.context,
    "success": report.is_success(),
    "actions": report.actions,
    "error": report.failure.as_ref().map(|f| f.to_string()),
  }))
}

pub fn print_plan(plan: &Plan, context: &str) {
  print_info(&format!("Plan for {} ({}, {})", plan.pod, plan.ensure, context));

  for (i, action) in plan.describe().iter().enumerate() {
    println!(
      "  {}. {} {} {}",
      i + 1,
      action.id,
      symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      action.step
    );
    let mut when = action.guard.clone();
    if action.trigger_only {
      when.push_str(", when notified");
    }
    if let Some(pending) = &action.pending {
      when.push_str(&format!(" or while {}", pending));
    }
    println!("     {}", when.if_supports_color(Stream::Stdout, |s| s.dimmed()));
    if !action.notifies.is_empty() {
      let targets: Vec<String> = action.notifies.iter().map(ToString::to_string).collect();
      println!(
        "     {}",
        format!("notifies {}", targets.join(", ")).if_supports_color(Stream::Stdout, |s| s.dimmed())
      );
    }
  }
}
