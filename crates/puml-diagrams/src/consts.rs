//! Internal constants for diagram rendering.

use std::time::Duration;

/// Marker that opens every `PlantUML` diagram.
pub const START_MARKER: &str = "@startuml";

/// Marker that closes every `PlantUML` diagram.
pub const END_MARKER: &str = "@enduml";

/// Fence language tag that identifies diagram blocks.
pub const DEFAULT_LANGUAGE: &str = "plantuml";

/// Default HTTP timeout for render requests (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Public `PlantUML` server; the format segment and encoded text are appended.
pub const PUBLIC_SERVER: &str = "https://www.plantuml.com/plantuml";

/// Maximum number of characters of a failure preview.
pub const PREVIEW_LEN: usize = 60;

/// Maximum number of characters kept from an error response body.
pub const ERROR_BODY_LEN: usize = 200;
