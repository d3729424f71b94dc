use std::path::Path;

use fuku_core::{Profile, ServiceDescriptor};
use tracing::debug;

use crate::document::Document;
use crate::error::LoadError;

/// Loads a `fuku.toml` document into the core types the Scheduler consumes.
///
/// A service with no `working_dir` inherits the directory containing the
/// config file. A document with no `[profiles.*]` table gets a single
/// synthetic `default` profile covering every declared service with
/// `require_all_ready = true`.
pub fn load(path: impl AsRef<Path>) -> Result<(Vec<ServiceDescriptor>, Vec<Profile>), LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let document: Document =
        toml::from_str(&text).map_err(|source| LoadError::Parse { path: path.to_path_buf(), source })?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut services = Vec::with_capacity(document.services.len());
    for (name, doc) in document.services {
        debug!(service = %name, "loaded service declaration");
        services.push(ServiceDescriptor {
            working_dir: doc.working_dir.unwrap_or_else(|| base_dir.clone()),
            command: doc.command,
            environment: doc.environment,
            dependencies: doc.dependencies,
            readiness: doc.readiness,
            readiness_deadline_secs: doc.readiness_deadline_secs.unwrap_or(fuku_core::DEFAULT_READINESS_DEADLINE.as_secs()),
            restart_policy: doc.restart_policy,
            shutdown_grace_secs: doc.shutdown_grace_secs.unwrap_or(10),
            tier_override: doc.tier_override,
            optional: doc.optional,
            name,
        });
    }

    let profiles = if document.profiles.is_empty() {
        vec![Profile {
            name: "default".to_string(),
            services: services.iter().map(|s| s.name.clone()).collect(),
            require_all_ready: true,
        }]
    } else {
        document
            .profiles
            .into_iter()
            .map(|(name, doc)| Profile {
                name,
                services: doc.services,
                require_all_ready: doc.require_all_ready,
            })
            .collect()
    };

    Ok((services, profiles))
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
