//! Dependency resolution and tiering: given a service set, builds the
//! `A depends on B` graph, rejects cycles, and computes a longest-path
//! layering (`tier(v) = 1 + max(tier(u) for u in deps(v))`, leaves at 0).

use std::collections::{HashMap, HashSet};

use fuku_core::{ConfigError, ServiceDescriptor, Tier};

/// Resolves `profile_services` (by name) against the full `services` set
/// and returns them ordered into tiers. Declaration order within
/// `services` is preserved within a tier, for deterministic tie-breaking.
pub fn build_tiers(
    services: &[ServiceDescriptor],
    profile_services: &[String],
) -> Result<Vec<Tier>, ConfigError> {
    let mut seen = HashSet::new();
    for service in services {
        if !seen.insert(service.name.as_str()) {
            return Err(ConfigError::DuplicateService(service.name.clone()));
        }
    }

    let by_name: HashMap<&str, &ServiceDescriptor> =
        services.iter().map(|s| (s.name.as_str(), s)).collect();

    let selected: Vec<&ServiceDescriptor> = profile_services
        .iter()
        .map(|name| {
            by_name
                .get(name.as_str())
                .copied()
                .ok_or_else(|| ConfigError::UnknownService(name.clone()))
        })
        .collect::<Result<_, _>>()?;

    for service in &selected {
        for dep in &service.dependencies {
            if !by_name.contains_key(dep.as_str()) {
                return Err(ConfigError::UnknownDependency(service.name.clone(), dep.clone()));
            }
        }
    }

    let selected_names: HashSet<&str> = selected.iter().map(|s| s.name.as_str()).collect();

    let mut tier_of: HashMap<&str, u32> = HashMap::new();
    for service in &selected {
        resolve_tier(service.name.as_str(), &by_name, &selected_names, &mut tier_of, &mut Vec::new())?;
    }

    // `tier_override` can pin a service to an explicit tier, but never past
    // a dependency it still needs to wait on: the loop below rejects any
    // override (on the service or on a dependency) that would let the
    // service start at or before a dependency's tier.
    let effective_tier: HashMap<&str, u32> = selected
        .iter()
        .map(|service| {
            let natural = tier_of[service.name.as_str()];
            (service.name.as_str(), service.tier_override.unwrap_or(natural))
        })
        .collect();

    for service in &selected {
        for dep in &service.dependencies {
            if !selected_names.contains(dep.as_str()) {
                continue;
            }
            if effective_tier[service.name.as_str()] <= effective_tier[dep.as_str()] {
                return Err(ConfigError::TierOverrideViolatesDependency {
                    service: service.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let max_tier = effective_tier.values().copied().max().unwrap_or(0);
    let mut tiers: Vec<Tier> =
        (0..=max_tier).map(|index| Tier { index, services: Vec::new() }).collect();
    for service in &selected {
        let tier = effective_tier[service.name.as_str()];
        tiers[tier as usize].services.push(service.name.clone());
    }
    tiers.retain(|t| !t.services.is_empty());
    for (index, tier) in tiers.iter_mut().enumerate() {
        tier.index = index as u32;
    }
    Ok(tiers)
}

fn resolve_tier<'a>(
    name: &'a str,
    by_name: &HashMap<&'a str, &'a ServiceDescriptor>,
    selected: &HashSet<&'a str>,
    tier_of: &mut HashMap<&'a str, u32>,
    path: &mut Vec<&'a str>,
) -> Result<u32, ConfigError> {
    if let Some(&tier) = tier_of.get(name) {
        return Ok(tier);
    }
    if let Some(pos) = path.iter().position(|&n| n == name) {
        let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
        cycle.push(name.to_string());
        return Err(ConfigError::Cycle(cycle));
    }
    path.push(name);
    let service = by_name[name];
    let mut tier = 0u32;
    for dep in &service.dependencies {
        if !selected.contains(dep.as_str()) {
            continue;
        }
        let dep_tier = resolve_tier(dep, by_name, selected, tier_of, path)?;
        tier = tier.max(dep_tier + 1);
    }
    path.pop();
    tier_of.insert(name, tier);
    Ok(tier)
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
