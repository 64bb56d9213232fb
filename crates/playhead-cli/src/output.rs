//! Output formatting for CLI

use playhead_core::{PlaybackError, TrackingPayload, TrackingRecord};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Render any serializable value as pretty JSON
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// One line per tracking record
pub fn record_line(record: &TrackingRecord) -> String {
    let event = &record.event;
    format!(
        "#{:<3} {:<26} {:<48} {}",
        record.sequence,
        event.kind.to_string(),
        event.video_id,
        payload_summary(&event.payload)
    )
}

pub fn error_line(error: &PlaybackError) -> String {
    format!("{:<20} {}", error.code(), error.message)
}

fn payload_summary(payload: &TrackingPayload) -> String {
    match payload {
        TrackingPayload::None => String::new(),
        TrackingPayload::Playback {
            position_micros,
            percent,
        } => format!("at {} ({}%)", format_micros(*position_micros), percent),
        TrackingPayload::Percent { percent } => format!("{percent}%"),
        TrackingPayload::Seek {
            from_micros,
            to_micros,
        } => format!("{} -> {}", format_micros(*from_micros), format_micros(*to_micros)),
        TrackingPayload::Ad { ad } => format!("ad {}", ad.ad_id),
        TrackingPayload::Avails {
            avails,
            timeline_position_micros,
        } => format!(
            "{} avail(s) at {}",
            avails.len(),
            format_micros(*timeline_position_micros)
        ),
        TrackingPayload::Info { message } => message.clone(),
    }
}

/// Format microseconds as `h:mm:ss.mmm`
pub fn format_micros(micros: i64) -> String {
    if micros < 0 {
        return "-".to_string();
    }
    let total_ms = micros / 1_000;
    let ms = total_ms % 1_000;
    let secs = (total_ms / 1_000) % 60;
    let mins = (total_ms / 60_000) % 60;
    let hours = total_ms / 3_600_000;
    format!("{hours}:{mins:02}:{secs:02}.{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Text);
    }

    #[test]
    fn test_format_micros() {
        assert_eq!(format_micros(0), "0:00:00.000");
        assert_eq!(format_micros(61_500_000), "0:01:01.500");
        assert_eq!(format_micros(3_723_004_000), "1:02:03.004");
        assert_eq!(format_micros(playhead_core::NO_POSITION), "-");
    }
}
