//! Fixed names and well-known locations.

/// Application name, used for default directory names.
pub const APP_NAME: &str = "podsync";

/// Separator between a pod name and a container name in a qualified identity.
pub const CONTAINER_SEPARATOR: &str = "-";

/// The only manifest `kind` accepted.
pub const POD_KIND: &str = "Pod";

/// Prefix podman uses for generated pod unit files.
pub const POD_UNIT_PREFIX: &str = "pod-";

/// Prefix podman uses for generated container unit files.
pub const CONTAINER_UNIT_PREFIX: &str = "container-";

/// Suffix of every generated service unit.
pub const UNIT_SUFFIX: &str = ".service";

/// Extension of persisted manifest copies.
pub const MANIFEST_EXTENSION: &str = "yaml";

/// Base of per-user runtime directories (`/run/user/<uid>`).
pub const USER_RUNTIME_BASE: &str = "/run/user";

/// Longest pod or container name accepted.
pub const MAX_NAME_LEN: usize = 253;

/// Suffix of the marker left while a changed manifest awaits replay.
pub const REPLACE_PENDING_SUFFIX: &str = "replace-pending";
