pub const FALLBACK_ID_PREFIX: &str = "S:";
pub const CONTENT_ID_PREFIX: &str = "U:";
pub const SCRIPT_ID_PREFIX: &str = "R:";

pub const FALLBACK_CONTAINER_TAG: &str = "div";
pub const CONTENT_CONTAINER_TAG: &str = "template";

pub const UPGRADE_FUNCTION: &str = "u$";
