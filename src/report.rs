//! Console rendering. Everything a run prints beyond per-step log lines lives here.

use chrono::{DateTime, Local, Utc};
use std::io::{self, Write};
use std::time::Duration;
use tracing::info;

use crate::client::{CheckInReceipt, SessionStatus};
use crate::orchestrator::RunSummary;

/// Coarse human duration, e.g. `3 hours and 12 minutes`.
pub fn format_duration(d: Duration) -> String {
    let seconds = d.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{} days and {} hours", days, hours % 24)
    } else if hours > 0 {
        format!("{} hours and {} minutes", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{} minutes and {} seconds", minutes, seconds % 60)
    } else {
        format!("{} seconds", seconds)
    }
}

pub fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn banner() {
    info!("===========================================");
    info!("🤖 X.INK Daily Check-in Bot");
    info!("===========================================");
}

pub fn cycle_header(cycle: u64, started_at: DateTime<Utc>) {
    info!("🔄 ===========================================");
    info!("🚀 Starting cycle #{} at {}", cycle, local_time(started_at));
    info!("===========================================");
}

pub fn separator() {
    info!("----------------------------------------");
}

pub fn session_status(title: &str, status: &SessionStatus) {
    info!("📊 {}:", title);
    info!("├─ Invite Count: {}", status.invite_count);
    info!("├─ Check-in Count: {}", status.check_in_count);
    info!("├─ Points: {}", status.points);
    info!(
        "└─ Last Check-in: {}",
        status
            .last_check_in
            .map(local_time)
            .unwrap_or_else(|| "Never".to_string())
    );
}

pub fn check_in_receipt(receipt: &CheckInReceipt) {
    info!("✅ Check-in successful!");
    info!("├─ Points Earned: +{}", receipt.points_earned);
    info!("└─ New Check-in Count: {}", receipt.check_in_count);
}

pub fn cycle_summary(summary: &RunSummary) {
    info!("📊 ===========================================");
    info!("Cycle Summary:");
    info!("├─ Total Wallets: {}", summary.total);
    info!("├─ Successful: {}", summary.succeeded);
    info!("├─ Failed: {}", summary.failed);
    if summary.interrupted {
        info!("├─ Interrupted after {} wallets", summary.processed());
    }
    info!("├─ Processing Time: {}", format_duration(summary.elapsed));
    info!("└─ Completed at: {}", local_time(summary.finished_at));
    info!("===========================================");
}

pub fn next_cycle(at: DateTime<Utc>, wait: Duration) {
    info!("⏰ Next cycle will start at: {}", local_time(at));
    info!("⏳ Waiting {}...", format_duration(wait));
    info!("💡 Press Ctrl+C to stop the bot");
}

/// Overwrites the current terminal line with the time left.
pub fn countdown_line(label: &str, remaining: Duration) {
    let mut out = io::stdout();
    let _ = write!(out, "\r⏱️  {}: {}          ", label, format_duration(remaining));
    let _ = out.flush();
}

pub fn countdown_done(message: &str) {
    let mut out = io::stdout();
    let _ = writeln!(out, "\r{}                                        ", message);
    let _ = out.flush();
}

pub fn goodbye() {
    info!("👋 Bot stopped by user");
    info!("===========================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 seconds");
        assert_eq!(format_duration(Duration::from_secs(30)), "30 seconds");
        assert_eq!(format_duration(Duration::from_secs(95)), "1 minutes and 35 seconds");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 12 * 60 + 5)), "3 hours and 12 minutes");
        assert_eq!(format_duration(Duration::from_secs(24 * 3600)), "1 days and 0 hours");
        assert_eq!(format_duration(Duration::from_secs(50 * 3600)), "2 days and 2 hours");
    }
}
