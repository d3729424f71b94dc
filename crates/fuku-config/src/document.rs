//! The on-disk shape of `fuku.toml`: a flat `[services.<name>]` table plus
//! a `[profiles.<name>]` table, deserialized with `indexmap::IndexMap` so
//! declaration order survives into tier tie-breaking.

use std::collections::BTreeMap;
use std::path::PathBuf;

use fuku_core::{Command, ReadinessProbe, RestartPolicy};
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub services: IndexMap<String, ServiceDoc>,
    #[serde(default)]
    pub profiles: IndexMap<String, ProfileDoc>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceDoc {
    pub working_dir: Option<PathBuf>,
    pub command: Command,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub readiness: Option<ReadinessProbe>,
    pub readiness_deadline_secs: Option<u64>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    pub shutdown_grace_secs: Option<u64>,
    #[serde(default)]
    pub tier_override: Option<u32>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProfileDoc {
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub require_all_ready: bool,
}
