/// Constants used throughout the sandbox-access workspace
// Vault namespace used when no service name is configured
pub const DEFAULT_SERVICE_NAME: &str = "sandbox-access";

// Separator between the service namespace and the resource in vault keys
pub const VAULT_KEY_SEPARATOR: char = ':';

// Version of the persisted token record layout
pub const TOKEN_SCHEMA_VERSION: u32 = 1;

// Environment variable names
pub const SERVICE_ENV_VAR: &str = "SANDBOX_ACCESS_SERVICE";
pub const ACCESS_GROUP_ENV_VAR: &str = "SANDBOX_ACCESS_GROUP";
pub const VAULT_PATH_ENV_VAR: &str = "SANDBOX_ACCESS_VAULT";
pub const PROBE_ENV_VAR: &str = "SANDBOX_ACCESS_PROBE";
pub const LOG_ENV_VAR: &str = "SANDBOX_ACCESS_LOG";

// Vault file written by the file-backed vault
pub const VAULT_FILE_NAME: &str = "tokens.json";

// Tracing target for access lifecycle events
pub const AUDIT_TARGET: &str = "sandbox_access::audit";

// URI scheme accepted (and stripped) by resource identities
pub const FILE_URI_SCHEME: &str = "file://";
