//! Environment variable key constants.
//!
//! Every key uses the `LAMABOOT_*` prefix. Aliases cover the names the old
//! setup scripts exported.

/// Project layout
pub mod paths {
    pub const LAMABOOT_PROJECT_DIR: &str = "LAMABOOT_PROJECT_DIR";

    pub const LAMABOOT_VENV_DIR: &str = "LAMABOOT_VENV_DIR";
    pub const VENV_DIR_ALIASES: &[&str] = &["VENV_DIR"];

    pub const LAMABOOT_MANIFEST: &str = "LAMABOOT_MANIFEST";

    pub const LAMABOOT_DATA_DIR: &str = "LAMABOOT_DATA_DIR";
    pub const DATA_DIR_ALIASES: &[&str] = &["DATA_DIR"];

    pub const LAMABOOT_INFO_FILE: &str = "LAMABOOT_INFO_FILE";

    pub const LAMABOOT_ENTRY_POINT: &str = "LAMABOOT_ENTRY_POINT";
}

/// Runtime tool (Ollama) and its installer
pub mod tool {
    pub const LAMABOOT_TOOL: &str = "LAMABOOT_TOOL";

    pub const LAMABOOT_INSTALLER_URL: &str = "LAMABOOT_INSTALLER_URL";

    /// Hex SHA-256 pin for the fetched installer. Unset means unverified.
    pub const LAMABOOT_INSTALLER_SHA256: &str = "LAMABOOT_INSTALLER_SHA256";

    /// "0" / "false" forbids fetching the installer at all.
    pub const LAMABOOT_ALLOW_INSTALLER: &str = "LAMABOOT_ALLOW_INSTALLER";

    pub const LAMABOOT_PULL_MODEL: &str = "LAMABOOT_PULL_MODEL";
}

/// Final step
pub mod handoff {
    /// "1" / "true" stops after seeding without running the entry point.
    pub const LAMABOOT_SKIP_HANDOFF: &str = "LAMABOOT_SKIP_HANDOFF";
}

/// Python interpreter used to create the venv
pub mod python {
    pub const LAMABOOT_PYTHON: &str = "LAMABOOT_PYTHON";
    pub const PYTHON_ALIASES: &[&str] = &["PYTHON"];
}

/// Observability and logging
pub mod observability {
    pub const LAMABOOT_QUIET: &str = "LAMABOOT_QUIET";
    pub const LAMABOOT_LOG_LEVEL: &str = "LAMABOOT_LOG_LEVEL";
    pub const LAMABOOT_LOG_JSON: &str = "LAMABOOT_LOG_JSON";
    pub const LAMABOOT_AUDIT_LOG: &str = "LAMABOOT_AUDIT_LOG";
}
