/// The page-side probe JavaScript.
/// This string is injected into browser contexts by backends.
pub const PROBE_JS: &str = include_str!("probe.js");
