//! Stable application-wide constants.
//!
//! Values here are structural invariants, wire-format strings, and default
//! fallbacks for env-var-based configuration. They should rarely change.
//! For the routing knobs that deployments may tune, see
//! [`RouteConfig`](crate::config::RouteConfig) instead.

// --- Server defaults (used when HOST / PORT env vars are absent) ---

/// Default bind address for the HTTP server.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default port for the HTTP server.
pub const DEFAULT_PORT: &str = "3000";

// --- Geometry ---

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Two candidate distances closer than this are considered a tie.
pub const DISTANCE_TIE_TOLERANCE_KM: f64 = 1e-9;
/// Default chain distance for grouping stops into clusters.
pub const DEFAULT_CLUSTER_MAX_DISTANCE_KM: f64 = 20.0;

// --- Time model defaults ---

/// Work time budgeted per horse at a stop.
pub const DEFAULT_WORK_MINUTES_PER_HORSE: u32 = 45;
/// Travel heuristic: ten minutes per ten kilometres.
pub const DEFAULT_TRAVEL_MINUTES_PER_KM: f64 = 1.0;
/// Hour at which the working day starts (fallback schedule and prompt).
pub const DEFAULT_DAY_START_HOUR: u8 = 8;
/// Spacing between stops in the fallback schedule.
pub const DEFAULT_FALLBACK_INTERVAL_MINUTES: u32 = 120;
/// Granularity used when a dropped appointment is snapped on the timeline.
pub const RESCHEDULE_SNAP_MINUTES: i64 = 15;

// --- Enhanced optimizer ---

/// Default base URL of the chat-completions backend.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model for the reasoning backend.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Sampling temperature sent to the reasoning backend.
pub const OPENAI_TEMPERATURE: f32 = 0.5;
/// Default per-attempt timeout for the enhanced path.
pub const DEFAULT_OPTIMIZER_TIMEOUT_SECS: u64 = 20;
/// Default number of retries after a failed optimizer call.
pub const DEFAULT_OPTIMIZER_MAX_RETRIES: u32 = 1;
/// Hard upper bound on retries, regardless of configuration.
pub const MAX_OPTIMIZER_RETRIES: u32 = 3;
/// Pause between optimizer attempts.
pub const OPTIMIZER_RETRY_DELAY_MS: u64 = 250;

/// Message returned when the day has no routable appointments.
pub const MESSAGE_NO_APPOINTMENTS: &str = "No confirmed appointments for this date";
/// Message returned when no appointment of the day is geocoded.
pub const MESSAGE_MISSING_LOCATIONS: &str = "Appointments found but missing location data";

// --- Date suggestions ---

/// Days scored when suggesting a date for a new appointment.
pub const SUGGESTION_DAYS_RANGE: u32 = 7;
/// Recommended interval between two shoeings of the same horse.
pub const SHOEING_INTERVAL_WEEKS: i64 = 6;
/// Lead time of the suggested slot when the last shoeing is unknown.
pub const FALLBACK_SUGGESTION_LEAD_DAYS: i64 = 7;
/// Start hour of a suggested slot.
pub const SUGGESTED_SLOT_HOUR: u8 = 10;

// --- Maps ---

/// Base URL for Google Maps directions deep links.
pub const GOOGLE_MAPS_DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/";

/// Map region shown when no active stop is geocoded (Milan).
pub const DEFAULT_REGION_LAT: f64 = 45.4642;
/// Longitude of the default map region.
pub const DEFAULT_REGION_LNG: f64 = 9.19;
/// Span of the default map region, in degrees.
pub const DEFAULT_REGION_DELTA: f64 = 0.5;
/// Smallest span of a computed region, so a single stop is not over-zoomed.
pub const MIN_REGION_DELTA: f64 = 0.1;
/// Padding added around the stops' bounding box, as a fraction of its span.
pub const REGION_PADDING_FACTOR: f64 = 0.2;

// --- Loader ---

/// Placeholder used when a joined customer record has no display name.
pub const UNKNOWN_CUSTOMER_NAME: &str = "Unknown";
