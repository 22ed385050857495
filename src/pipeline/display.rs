/// Label returned for empty identifiers.
pub const UNKNOWN: &str = "Unknown";

/// Labels for the observed properties our sensors publish.
fn known_label(key: &str) -> Option<&'static str> {
    let label = match key {
        "co2" => "CO₂",
        "co2_indoor" => "Indoor CO₂",
        "temperature" => "Temperature (℃)",
        "temperature_indoor" => "Indoor Temperature (℃)",
        "temperature_outdoor" => "Outdoor Temperature (℃)",
        "humidity" => "Relative Humidity (%)",
        "humidity_indoor" => "Indoor Relative Humidity (%)",
        "noise" => "Noise (dB)",
        "noise_internal" => "Indoor Noise (dB)",
        "gauge_pressure" => "Gauge Pressure (hPa)",
        "absolute_pressure" => "Absolute Pressure (hPa)",
        "battery_level" => "Battery Level (%)",
        "light_level_indoor" => "Indoor Light Level (lx)",
        "passive_infrared" => "Motion (PIR)",
        "particulate_matter_10" => "PM₁₀ (µg/m³)",
        "particulate_matter_2_5" => "PM₂.₅ (µg/m³)",
        "total_volatile_organic_compounds" => "TVOC (ppb)",
        "phenomenon_time" => "Phenomenon Time",
        _ => return None,
    };
    Some(label)
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Human-readable label for a property identifier.
///
/// Known identifiers map to fixed labels; anything else is converted from
/// snake_case to Title Case (`"unknown_field_x"` becomes `"Unknown Field X"`).
#[must_use]
pub fn format_display_name(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return UNKNOWN.to_string();
    }

    if let Some(label) = known_label(&key) {
        return label.to_string();
    }

    let words: Vec<String> = key
        .split('_')
        .filter(|s| !s.is_empty())
        .map(title_case)
        .collect();

    if words.is_empty() {
        UNKNOWN.to_string()
    } else {
        words.join(" ")
    }
}
