//! Table and JSON printers.

use anyhow::Result;

use komodo_client::config::ClientConfig;
use komodo_client::entities::ResourceTarget;
use komodo_client::entities::update::{Update, UpdateListItem, UpdateStatus};
use komodo_client::maintenance::{MaintenanceScheduleType, MaintenanceWindow};
use komodo_client::ws::UpdateWsEvent;

use crate::OutputFormat;

pub fn print_update(update: &Update, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let mark = if update.success { "✓" } else { "✗" };
            println!(
                "{} {} on {} ({})",
                mark,
                update.operation,
                describe_target(&update.target),
                update.status
            );
            if let Some(ms) = update.duration_ms() {
                println!("  Took {ms}ms");
            }
            for log in &update.logs {
                let mark = if log.success { "✓" } else { "✗" };
                println!("  {} {}", mark, log.stage);
                if !log.success && !log.stderr.is_empty() {
                    for line in log.stderr.lines() {
                        println!("      {line}");
                    }
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(update)?),
    }
    Ok(())
}

pub fn print_update_event(event: &UpdateWsEvent, format: OutputFormat) -> Result<()> {
    match (event, format) {
        (UpdateWsEvent::Update(update), OutputFormat::Table) => print_update_row(update),
        (UpdateWsEvent::Update(update), OutputFormat::Json) => {
            println!("{}", serde_json::to_string(update)?)
        }
        // Connection events are only logged so json output stays one update per line
        (UpdateWsEvent::Connected, _) => tracing::debug!("connected"),
        (UpdateWsEvent::LoggedIn, _) => tracing::info!("Listening for updates"),
        (UpdateWsEvent::Closed, _) => tracing::info!("Update stream closed, reconnecting"),
        (UpdateWsEvent::Error(e), _) => tracing::warn!("Update stream error: {e}"),
        (UpdateWsEvent::Cancelled, _) => {}
    }
    Ok(())
}

fn print_update_row(update: &UpdateListItem) {
    let mark = match (update.status, update.success) {
        (UpdateStatus::Complete, true) => "✓",
        (UpdateStatus::Complete, false) => "✗",
        _ => "•",
    };
    println!(
        "{} {:<24} {:<32} {:<12} {}",
        mark,
        update.operation,
        describe_target(&update.target),
        update.status,
        update.username
    );
}

fn describe_target(target: &ResourceTarget) -> String {
    if target.id().is_empty() {
        target.variant().to_string()
    } else {
        format!("{} {}", target.variant(), target.id())
    }
}

pub fn print_config(config: &ClientConfig, format: OutputFormat) -> Result<()> {
    let masked = ClientConfig {
        api_secret: config.api_secret.as_ref().map(|_| "********".to_string()),
        jwt: config.jwt.as_ref().map(|_| "********".to_string()),
        ..config.clone()
    };
    match format {
        OutputFormat::Table => {
            println!("address:          {}", masked.address);
            println!("api_key:          {}", masked.api_key.as_deref().unwrap_or("-"));
            println!("api_secret:       {}", masked.api_secret.as_deref().unwrap_or("-"));
            println!("jwt:              {}", masked.jwt.as_deref().unwrap_or("-"));
            println!("retry_timeout_ms: {}", masked.retry_timeout_ms);
            println!("poll_interval_ms: {}", masked.poll_interval_ms);
            let timezone = if masked.timezone.is_empty() {
                "local"
            } else {
                masked.timezone.as_str()
            };
            println!("timezone:         {timezone}");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&masked)?),
    }
    Ok(())
}

pub fn print_maintenance(
    windows: &[MaintenanceWindow],
    active: &[&MaintenanceWindow],
    timestamp: i64,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if windows.is_empty() {
                println!("No maintenance windows");
                return Ok(());
            }
            println!(
                "{:<3} {:<20} {:<22} {:<8} {:<10} TIMEZONE",
                "", "NAME", "SCHEDULE", "START", "DURATION"
            );
            for window in windows {
                let mark = if active.iter().any(|a| std::ptr::eq(*a, window)) {
                    "●"
                } else if window.enabled {
                    "○"
                } else {
                    "-"
                };
                println!(
                    "{:<3} {:<20} {:<22} {:02}:{:02}    {:<10} {}",
                    mark,
                    window.name,
                    describe_schedule(&window.schedule_type),
                    window.hour,
                    window.minute,
                    format!("{}m", window.duration_minutes),
                    if window.timezone.is_empty() {
                        "default"
                    } else {
                        window.timezone.as_str()
                    }
                );
            }
            println!();
            println!("{} of {} windows active", active.len(), windows.len());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "timestamp": timestamp,
                "in_maintenance": !active.is_empty(),
                "active": active.iter().map(|w| &w.name).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn describe_schedule(schedule: &MaintenanceScheduleType) -> String {
    match schedule {
        MaintenanceScheduleType::Daily => "daily".to_string(),
        MaintenanceScheduleType::Weekly { day_of_week } => format!("weekly {day_of_week:?}"),
        MaintenanceScheduleType::OneTime { date } => format!("once {date}"),
    }
}
