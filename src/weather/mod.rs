//! Weather derivation engine.
//!
//! Normalizes the weather entity's condition string to a display label and an
//! icon key, and resolves high/low/feels-like temperatures through layered
//! fallback chains. Every stage is independent and terminates in an explicit
//! placeholder; no upstream shape is an error.

use crate::hub::EntitySnapshot;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Derived weather view model. All temperatures are rounded for display;
/// `None` renders as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeatherView {
    pub label: String,
    pub icon: &'static str,
    pub unit: String,
    pub temperature: Option<i32>,
    pub high: Option<i32>,
    pub low: Option<i32>,
    pub feels_like: Option<i32>,
}

/// Format one temperature field, `—` when absent.
pub fn fmt_temp(value: Option<i32>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v}{unit}"),
        None => "—".to_string(),
    }
}

/// Derive the full weather view from the latest snapshot. `now` supplies the
/// current local date (forecast matching) and hour (low-estimate heuristic).
pub fn derive(snapshot: &EntitySnapshot, now: OffsetDateTime) -> WeatherView {
    let unit = snapshot
        .attr_str("temperature_unit")
        .unwrap_or("°F")
        .to_string();
    let temperature = snapshot.attr_f64("temperature");

    let forecast: &[Value] = snapshot
        .attr("forecast")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let (mut high, mut low) = forecast_high_low(forecast, now);

    if high.is_none() {
        high = snapshot.first_attr_f64(&["temp_max", "temperature", "temp"]);
    }
    if low.is_none() {
        low = snapshot
            .first_attr_f64(&["temp_min", "templow"])
            .or_else(|| temperature.map(|t| estimate_low(t, now.hour())));
    }

    let feels_like = snapshot
        .first_attr_f64(&["apparent_temperature", "feels_like", "feelslike", "apparent"])
        .or_else(|| {
            temperature.map(|t| {
                feels_like_estimate(
                    t,
                    snapshot.attr_f64("humidity"),
                    snapshot.attr_f64("wind_speed"),
                )
            })
        });

    WeatherView {
        label: condition_label(&snapshot.state),
        icon: icon_key(&snapshot.state),
        unit,
        temperature: temperature.map(round),
        high: high.map(round),
        low: low.map(round),
        feels_like: feels_like.map(round),
    }
}

fn round(v: f64) -> i32 {
    v.round() as i32
}

fn num(entry: &Value, key: &str) -> Option<f64> {
    entry.get(key).and_then(Value::as_f64)
}

/// Stages (a) and (b) of the high/low chain: today's forecast entry (falling
/// back to the first), then a max/min over the first five entries.
fn forecast_high_low(forecast: &[Value], now: OffsetDateTime) -> (Option<f64>, Option<f64>) {
    if forecast.is_empty() {
        return (None, None);
    }

    let today = forecast
        .iter()
        .find(|f| {
            f.get("datetime")
                .and_then(Value::as_str)
                .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
                .is_some_and(|t| t.date() == now.date())
        })
        .or_else(|| forecast.first());

    let mut high = today.and_then(|f| num(f, "temperature").or_else(|| num(f, "temp")));
    let mut low = today.and_then(|f| num(f, "templow").or_else(|| num(f, "temp_min")));

    if high.is_none() || low.is_none() {
        let temps: Vec<f64> = forecast
            .iter()
            .take(5)
            .filter_map(|f| num(f, "temperature").or_else(|| num(f, "temp")))
            .collect();
        if !temps.is_empty() {
            if high.is_none() {
                high = temps.iter().copied().reduce(f64::max);
            }
            if low.is_none() {
                low = temps.iter().copied().reduce(f64::min);
            }
        }
    }

    (high, low)
}

/// Last-resort low estimate from the current temperature: daytime readings
/// sit further above the daily low than nighttime ones.
fn estimate_low(current: f64, hour: u8) -> f64 {
    if (6..18).contains(&hour) {
        current - 5.0
    } else {
        current - 2.0
    }
}

/// Feels-like from current conditions. Wind speed comes unit-less from the
/// hub: values over 50 are assumed km/h and converted, values under 20 are
/// taken as m/s already, 20-50 passes through unchanged (upstream quirk,
/// preserved for compatibility).
pub fn feels_like_estimate(temp: f64, humidity: Option<f64>, wind_speed: Option<f64>) -> f64 {
    let wind_ms = wind_speed.map(|w| if w > 50.0 { w / 3.6 } else { w });

    if temp < 10.0
        && let Some(w) = wind_ms
        && w > 0.0
    {
        // Wind chill (Environment Canada formulation, °C and m/s).
        let wp = w.powf(0.16);
        return 13.12 + 0.6215 * temp - 11.37 * wp + 0.3965 * temp * wp;
    }

    if temp > 27.0
        && let Some(h) = humidity
    {
        // Rothfusz heat-index regression, Celsius form.
        let t2 = temp * temp;
        let h2 = h * h;
        return -8.78469475556 + 1.61139411 * temp + 2.33854883889 * h
            - 0.14611605 * temp * h
            - 0.012308094 * t2
            - 0.0164248277778 * h2
            + 0.002211732 * t2 * h
            + 0.00072546 * temp * h2
            - 0.000003582 * t2 * h2;
    }

    let mut adjustment = 0.0;
    if let Some(h) = humidity {
        adjustment += (h - 50.0) * 0.05;
    }
    if let Some(w) = wind_ms
        && w > 2.0
    {
        adjustment -= w * 0.3;
    }
    temp + adjustment
}

/// Human label for a condition string: fixed table first, generic
/// title-casing for anything unknown, `—` for nothing at all.
pub fn condition_label(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let s = spaced.trim();
    if s.is_empty() {
        return "—".to_string();
    }

    let key: String = s.to_lowercase().split_whitespace().collect::<Vec<_>>().join("_");
    let mapped = match key.as_str() {
        "partlycloudy" | "partly_cloudy" => "Partly Cloudy",
        "mostlysunny" | "mostly_sunny" => "Mostly Sunny",
        "clear" => "Clear",
        "sunny" => "Sunny",
        "cloudy" => "Cloudy",
        "rainy" => "Rainy",
        "pouring" => "Pouring",
        "snowy" => "Snowy",
        "fog" => "Fog",
        "windy" => "Windy",
        _ => "",
    };
    if !mapped.is_empty() {
        return mapped.to_string();
    }
    title_case(s)
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Icon key for a condition: exact table, then substring containment in a
/// fixed priority order, then the partly-cloudy default.
pub fn icon_key(condition: &str) -> &'static str {
    let cond = condition.to_lowercase();
    match cond.as_str() {
        "clear" | "sunny" | "clear-day" => "clear",
        "partlycloudy" | "partly-cloudy" | "mostlysunny" | "mostly_sunny" => "partly-cloudy",
        "cloudy" | "cloud" => "cloudy",
        "rainy" | "rain" => "rainy",
        "pouring" => "pouring",
        "snowy" | "snow" => "snowy",
        "foggy" | "fog" | "misty" => "foggy",
        "windy" | "wind" => "windy",
        "thunderstorm" | "storm" => "thunderstorm",
        _ => {
            if cond.contains("rain") {
                "rainy"
            } else if cond.contains("snow") {
                "snowy"
            } else if cond.contains("cloud") {
                "cloudy"
            } else if cond.contains("fog") || cond.contains("mist") {
                "foggy"
            } else if cond.contains("wind") {
                "windy"
            } else if cond.contains("storm") || cond.contains("thunder") {
                "thunderstorm"
            } else if cond.contains("clear") || cond.contains("sun") {
                "clear"
            } else {
                "partly-cloudy"
            }
        }
    }
}
