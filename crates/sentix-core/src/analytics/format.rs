use chrono::{DateTime, NaiveDateTime, Utc};

const NONE: &str = "—";

/// `mm:ss`, or `h:mm:ss` past the hour. Non-finite or negative input renders as a dash.
pub fn fmt_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return NONE.to_string();
    }
    let s = (secs % 60.0).floor() as u64;
    let m = ((secs / 60.0) % 60.0).floor() as u64;
    let h = (secs / 3600.0).floor() as u64;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Parse the timestamp formats news backends emit (RFC 3339, RFC 2822, naive ISO as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// "just now", "5m ago", "3h ago", "2d ago", else the calendar date.
pub fn relative_time(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(ts) = raw.and_then(parse_timestamp) else {
        return NONE.to_string();
    };
    let secs = (now - ts).num_seconds();
    let mins = secs.div_euclid(60);
    let hours = mins.div_euclid(60);
    let days = hours.div_euclid(24);
    if secs < 30 {
        "just now".to_string()
    } else if mins < 60 {
        format!("{mins}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        ts.format("%Y-%m-%d").to_string()
    }
}

fn trim_unit(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

/// Human label for a live-news window given in minutes.
pub fn format_window(minutes: u32) -> String {
    if minutes == 0 {
        return NONE.to_string();
    }
    let m = f64::from(minutes);
    if minutes < 60 {
        return format!("{minutes} min");
    }
    let h = m / 60.0;
    if h < 24.0 {
        return format!("{} hours", trim_unit(h));
    }
    let d = m / (60.0 * 24.0);
    if d < 30.0 {
        return format!("{} days", trim_unit(d));
    }
    let months = d / 30.0;
    if months < 12.0 {
        return format!("{} months", trim_unit(months));
    }
    format!("{} years", trim_unit(d / 365.0))
}
