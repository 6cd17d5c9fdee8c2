//! Alert text for SMS and the voice-call script.
//!
//! Both forms are pure functions of their input so identical triggers yield
//! byte-identical messages.

use crate::models::dispatch::Coordinates;
use crate::models::sos_event::TriggerKind;

const APP_NAME: &str = "RakshaNet";

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coords: Coordinates,
    pub address: String,
}

pub fn map_link(coords: Coordinates) -> String {
    format!(
        "https://www.google.com/maps?q={:.6},{:.6}",
        coords.latitude, coords.longitude
    )
}

fn summary_line(kind: TriggerKind, user_name: &str) -> String {
    format!(
        "{} triggered an emergency {} alert via {} and needs immediate help!",
        user_name.trim(),
        kind,
        APP_NAME
    )
}

pub fn compose_sms(kind: TriggerKind, user_name: &str, location: Option<&ResolvedLocation>) -> String {
    let mut lines = vec![
        format!("🚨 {} SOS ALERT! 🚨", kind.as_str().to_uppercase()),
        summary_line(kind, user_name),
    ];
    if let Some(loc) = location {
        lines.push(format!("📍 Location: {}", loc.address));
        lines.push(format!("🗺️ Map: {}", map_link(loc.coords)));
    }
    lines.join("\n")
}

/// Single-line script for speech synthesis. Carries no URL: only the
/// address is spoken.
pub fn compose_voice_script(
    kind: TriggerKind,
    user_name: &str,
    location: Option<&ResolvedLocation>,
) -> String {
    let mut lines = vec![
        format!("SOS Alert! {} SOS alert", capitalize(kind.as_str())),
        summary_line(kind, user_name),
    ];
    if let Some(loc) = location {
        lines.push(format!("Location: {}", loc.address));
    }
    lines
        .iter()
        .map(|line| speakable(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Strips markup-unsafe characters, collapses whitespace and terminates the
/// sentence.
fn speakable(line: &str) -> String {
    let cleaned: String = line
        .chars()
        .map(|c| match c {
            '&' | '<' | '>' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let mut sentence = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() && !sentence.ends_with(['.', '!', '?']) {
        sentence.push('.');
    }
    sentence
}
