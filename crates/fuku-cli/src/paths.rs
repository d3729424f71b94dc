//! Resolves the two filesystem locations the CLI needs outside the
//! workspace directory: the socket runtime directory and the session
//! file's config-home directory (spec §6).

use std::path::PathBuf;

/// A per-user, per-host writable directory for the socket: `$XDG_RUNTIME_DIR`
/// when set (the systemd/POSIX convention), otherwise `$TMPDIR/fuku`
/// (falling back to `/tmp/fuku`).
pub fn runtime_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir).join("fuku");
        }
    }
    std::env::temp_dir().join("fuku")
}

/// `<runtime-dir>/fuku-<profile>.sock`.
pub fn socket_path(profile: &str) -> PathBuf {
    runtime_dir().join(format!("fuku-{profile}.sock"))
}

/// `<config-home>/fuku/session.json`, where `<config-home>` is `dirs`'s
/// platform config-home directory (`$XDG_CONFIG_HOME` on Linux).
pub fn session_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
    base.join("fuku").join("session.json")
}
