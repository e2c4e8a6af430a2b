//! Commands and types used throughout spotcast.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every action the operator can request, and
//! [`ProjectionMode`] / [`DisplayInfo`] / [`WindowId`] provide the
//! supporting data types.
//!
//! Wire forms are lenient: modes parse case-insensitively ("grid",
//! "Rotating", "slideshow"), intervals accept milliseconds or a string with
//! a unit suffix ("3s", "5m"), and displays can be picked by index or name.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Stable identifier issued by the upstream image feed.
pub type SpotId = u32;

/// Opaque handle for a projection window, allocated by the
/// [`ProjectionHost`](crate::traits::ProjectionHost).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// How a projection window presents its selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProjectionMode {
    /// One image at a time, advancing on the rotation interval.
    Rotating,
    /// Every image at once in a `side × side` grid.
    Grid,
}

impl fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionMode::Rotating => write!(f, "rotating"),
            ProjectionMode::Grid => write!(f, "grid"),
        }
    }
}

/// Parse a mode string (case-insensitive; accepts "rotating", "Grid", "slide-show", etc.).
fn parse_mode(s: &str) -> Option<ProjectionMode> {
    let normalized: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect();
    match normalized.as_str() {
        "rotating" | "rotate" | "rotation" | "slideshow" => Some(ProjectionMode::Rotating),
        "grid" | "uniformgrid" => Some(ProjectionMode::Grid),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for ProjectionMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_mode(&s).ok_or_else(|| DeError::custom(format!("invalid projection mode: {:?}", s)))
    }
}

/// Wire format for interval settings: accepts milliseconds as a number or a
/// string with a unit suffix (`"250ms"`, `"3s"`, `"5m"`, `"1h"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval(pub Duration);

/// Parse `"<digits><unit>"`.  A bare number is milliseconds.
fn parse_interval(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().ok()?;
    match unit.trim() {
        "" | "ms" => Some(Duration::from_millis(value)),
        "s" | "sec" | "secs" => Some(Duration::from_secs(value)),
        "m" | "min" | "mins" => Some(Duration::from_secs(value.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(value.checked_mul(3600)?)),
        _ => None,
    }
}

impl Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0.as_millis() as u64)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = Interval;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "milliseconds or a string such as \"3s\" / \"5m\"")
            }
            fn visit_u64<E>(self, n: u64) -> Result<Interval, E> {
                Ok(Interval(Duration::from_millis(n)))
            }
            fn visit_str<E>(self, s: &str) -> Result<Interval, E>
            where
                E: DeError,
            {
                parse_interval(s)
                    .map(Interval)
                    .ok_or_else(|| DeError::custom(format!("invalid interval: {:?}", s)))
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Which display a projection should land on: an index into the current
/// enumeration, or the display's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DisplaySelector {
    Index(usize),
    Name(String),
}

impl<'de> Deserialize<'de> for DisplaySelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = DisplaySelector;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "display index or display name")
            }
            fn visit_u64<E>(self, n: u64) -> Result<DisplaySelector, E> {
                Ok(DisplaySelector::Index(n as usize))
            }
            fn visit_str<E>(self, s: &str) -> Result<DisplaySelector, E> {
                Ok(DisplaySelector::Name(s.trim().to_string()))
            }
        }
        deserializer.deserialize_any(V)
    }
}

impl DisplaySelector {
    /// Resolve against the current display enumeration.
    pub fn resolve<'a>(&self, displays: &'a [DisplayInfo]) -> Option<&'a DisplayInfo> {
        match self {
            DisplaySelector::Index(i) => displays.get(*i),
            DisplaySelector::Name(name) => displays.iter().find(|d| d.name == *name),
        }
    }
}

/// Every action the operator can request.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed by the
/// [`Controller`](crate::controller::Controller).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Open a projection of `spots` (catalog ids, in display order) on
    /// `display` using `mode`.
    ///
    /// `display` and `mode` are optional on the wire so that an incomplete
    /// selection can be rejected with an operator-facing message instead of
    /// a parse error.
    Project {
        spots: Vec<SpotId>,
        #[serde(default)]
        display: Option<DisplaySelector>,
        #[serde(default)]
        mode: Option<ProjectionMode>,
    },

    /// Close one projection window.
    StopWindow(WindowId),

    /// Close every projection window.
    ///
    /// On the wire this is encoded as the JSON string `"StopAll"`.
    StopAll,

    /// Switch a live projection to another mode without closing it.
    SetMode { window: WindowId, mode: ProjectionMode },

    /// Change the rotation interval; applies to the running timer at once.
    SetRotationInterval(Interval),

    /// Change the image refresh interval; applies to the running timer at once.
    SetRefreshInterval(Interval),

    /// The display configuration changed; re-enumerate and fix up windows.
    DisplaysChanged,

    /// The host reports that a window was closed outside of spotcast
    /// (e.g. the operator closed it).
    WindowClosed(WindowId),

    /// Re-read the location catalog from disk.
    ReloadCatalog,
}

/// A physical display as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Unique name the host uses for this display (e.g. `"DP-1"`).
    pub name: String,
    /// X position on the virtual desktop (physical pixels).
    pub x: i32,
    /// Y position on the virtual desktop (physical pixels).
    pub y: i32,
    /// Horizontal resolution in physical pixels.
    pub width: u32,
    /// Vertical resolution in physical pixels.
    pub height: u32,
    /// Reported DPI, when the host can determine it.
    #[serde(default)]
    pub dpi: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_display() {
        assert_eq!(ProjectionMode::Rotating.to_string(), "rotating");
        assert_eq!(ProjectionMode::Grid.to_string(), "grid");
    }

    #[test]
    fn mode_parses_leniently() {
        assert_eq!(parse_mode("Rotating"), Some(ProjectionMode::Rotating));
        assert_eq!(parse_mode(" slide-show "), Some(ProjectionMode::Rotating));
        assert_eq!(parse_mode("GRID"), Some(ProjectionMode::Grid));
        assert_eq!(parse_mode("uniform_grid"), Some(ProjectionMode::Grid));
        assert_eq!(parse_mode("carousel"), None);
    }

    #[test]
    fn interval_units() {
        assert_eq!(parse_interval("250"), Some(Duration::from_millis(250)));
        assert_eq!(parse_interval("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_interval("3s"), Some(Duration::from_secs(3)));
        assert_eq!(parse_interval("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_interval("1 h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_interval("fast"), None);
        assert_eq!(parse_interval("3 fortnights"), None);
    }

    #[test]
    fn project_command_from_json() {
        let cmd: Command =
            serde_json::from_str(r#"{"Project":{"spots":[4,7],"display":1,"mode":"grid"}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Project {
                spots: vec![4, 7],
                display: Some(DisplaySelector::Index(1)),
                mode: Some(ProjectionMode::Grid),
            }
        );
    }

    #[test]
    fn project_command_with_missing_fields() {
        let cmd: Command = serde_json::from_str(r#"{"Project":{"spots":[]}}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Project {
                spots: vec![],
                display: None,
                mode: None,
            }
        );
    }

    #[test]
    fn display_selector_by_name() {
        let cmd: Command =
            serde_json::from_str(r#"{"Project":{"spots":[1],"display":"HDMI-A-1","mode":"Rotating"}}"#)
                .unwrap();
        match cmd {
            Command::Project { display, .. } => {
                assert_eq!(display, Some(DisplaySelector::Name("HDMI-A-1".into())))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn interval_commands_from_json() {
        let a: Command = serde_json::from_str(r#"{"SetRotationInterval":"5s"}"#).unwrap();
        assert_eq!(a, Command::SetRotationInterval(Interval(Duration::from_secs(5))));
        let b: Command = serde_json::from_str(r#"{"SetRefreshInterval":60000}"#).unwrap();
        assert_eq!(b, Command::SetRefreshInterval(Interval(Duration::from_secs(60))));
    }

    #[test]
    fn unit_commands_from_json() {
        let cmd: Command = serde_json::from_str(r#""StopAll""#).unwrap();
        assert_eq!(cmd, Command::StopAll);
        let cmd: Command = serde_json::from_str(r#"{"WindowClosed":3}"#).unwrap();
        assert_eq!(cmd, Command::WindowClosed(WindowId(3)));
    }

    #[test]
    fn invalid_mode_is_rejected() {
        let res: Result<Command, _> =
            serde_json::from_str(r#"{"SetMode":{"window":1,"mode":"mosaic"}}"#);
        assert!(res.is_err());
    }

    fn displays() -> Vec<DisplayInfo> {
        vec![
            DisplayInfo {
                name: "DP-1".into(),
                x: 0,
                y: 0,
                width: 2560,
                height: 1440,
                dpi: Some(96.0),
            },
            DisplayInfo {
                name: "HDMI-A-1".into(),
                x: 2560,
                y: 0,
                width: 3840,
                height: 2160,
                dpi: Some(144.0),
            },
        ]
    }

    #[test]
    fn selector_resolves_index_and_name() {
        let d = displays();
        assert_eq!(DisplaySelector::Index(1).resolve(&d).map(|d| d.name.as_str()), Some("HDMI-A-1"));
        assert_eq!(DisplaySelector::Name("DP-1".into()).resolve(&d).map(|d| d.x), Some(0));
        assert!(DisplaySelector::Index(2).resolve(&d).is_none());
        assert!(DisplaySelector::Name("eDP-1".into()).resolve(&d).is_none());
    }

    #[test]
    fn display_info_dpi_is_optional() {
        let d: DisplayInfo =
            serde_json::from_str(r#"{"name":"X","x":0,"y":0,"width":800,"height":600}"#).unwrap();
        assert_eq!(d.dpi, None);
    }
}
