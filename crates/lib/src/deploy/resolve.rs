//! Picking which configured deploy target hosts the server and which hosts the assets.
//!
//! Targets are sorted into three buckets by capability. For each half of the
//! FAB, an explicit override wins; otherwise exactly one host that can only
//! do that half wins over exactly one host that can do both. Any tie within
//! the tier that decides is an error the user settles with `--server-host` or
//! `--assets-host`.

use tracing::{info, warn};

use crate::config::DeployConfig;
use crate::consts::DEPLOYING_DOCS;
use crate::error::FabError;

use super::providers::{HostKind, ProviderRegistry};
use super::types::ProviderResolution;

/// Configured target names partitioned by capability, in config order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostBuckets {
  pub server_only: Vec<String>,
  pub assets_only: Vec<String>,
  pub versatile: Vec<String>,
}

impl HostBuckets {
  /// Hosts that can only serve `kind`.
  pub fn specific(&self, kind: HostKind) -> &[String] {
    match kind {
      HostKind::Server => &self.server_only,
      HostKind::Assets => &self.assets_only,
    }
  }
}

/// Partition the configured deploy targets by what they can host.
pub fn classify(deploy: &DeployConfig, registry: &ProviderRegistry) -> Result<HostBuckets, FabError> {
  let mut buckets = HostBuckets::default();

  for target in deploy.keys() {
    let provider = registry.get(target).ok_or_else(|| {
      FabError::InvalidConfig(format!(
        "Deploy target '{}' in your fab.config.json is not supported.\nNeeds to be one of {}",
        target,
        registry.names().collect::<Vec<_>>().join(", ")
      ))
    })?;

    let caps = provider.capabilities;
    match (caps.server, caps.assets) {
      (true, true) => buckets.versatile.push(target.clone()),
      (true, false) => buckets.server_only.push(target.clone()),
      (false, true) => buckets.assets_only.push(target.clone()),
      (false, false) => {
        return Err(FabError::Deploy(format!(
          "Deploy target '{}' doesn't host the server or the assets, what is it for?",
          target
        )));
      }
    }
  }

  Ok(buckets)
}

/// Choose the target hosting `kind`.
///
/// An explicit override must name a configured target whose provider can
/// host `kind`. Without one, the automatic rules apply (see module docs).
pub fn resolve_one(
  kind: HostKind,
  explicit: Option<&str>,
  deploy: &DeployConfig,
  registry: &ProviderRegistry,
  buckets: &HostBuckets,
) -> Result<String, FabError> {
  if let Some(name) = explicit {
    return check_override(kind, name, deploy, registry);
  }

  let specific = buckets.specific(kind);
  let versatile = &buckets.versatile;

  let chosen = choose_automatically(kind, specific, versatile)?;

  info!(kind = %kind, provider = %chosen, "selected deploy target");
  let rejected: Vec<&str> = specific
    .iter()
    .chain(versatile.iter())
    .map(String::as_str)
    .filter(|name| *name != chosen)
    .collect();
  if !rejected.is_empty() {
    info!(
      kind = %kind,
      others = %rejected.join(", "),
      "other {}-compatible hosts are configured; use --{}-host to override",
      kind,
      kind
    );
  }

  Ok(chosen)
}

/// Resolve both halves against one classification of `deploy`.
pub fn resolve(
  deploy: &DeployConfig,
  registry: &ProviderRegistry,
  server_host: Option<&str>,
  assets_host: Option<&str>,
) -> Result<ProviderResolution, FabError> {
  let buckets = classify(deploy, registry)?;

  let server_provider = resolve_one(HostKind::Server, server_host, deploy, registry, &buckets)?;
  let assets_provider = resolve_one(HostKind::Assets, assets_host, deploy, registry, &buckets)?;

  Ok(ProviderResolution {
    server_provider,
    assets_provider,
  })
}

fn check_override(kind: HostKind, name: &str, deploy: &DeployConfig, registry: &ProviderRegistry) -> Result<String, FabError> {
  if !deploy.contains_key(name) {
    return Err(FabError::InvalidConfig(format!(
      "Your specified {} host '{}' does not exist in your fab.config.json deploy config.",
      kind, name
    )));
  }

  let supported = registry
    .get(name)
    .is_some_and(|provider| provider.capabilities.supports(kind));
  if !supported {
    warn!(kind = %kind, provider = name, "override names a host without the capability");
    return Err(FabError::InvalidConfig(format!(
      "Your specified {} host '{}' cannot host the {}.",
      kind, name, kind
    )));
  }

  info!(kind = %kind, provider = name, "using deploy target from --{}-host", kind);
  Ok(name.to_string())
}

fn choose_automatically(kind: HostKind, specific: &[String], versatile: &[String]) -> Result<String, FabError> {
  match (specific, versatile) {
    ([only], _) => Ok(only.clone()),
    ([_, _, ..], _) => Err(FabError::InvalidConfig(format!(
      "Your fab.config.json deploy config has multiple {}-only hosts: {}\nChoose one with the --{}-host argument",
      kind,
      specific.join(", "),
      kind
    ))),
    ([], [only]) => Ok(only.clone()),
    ([], [_, _, ..]) => Err(FabError::InvalidConfig(format!(
      "Your fab.config.json deploy config has multiple hosts capable of both server & asset hosting: {}\nSpecify which one to use with the --server-host & --assets-host arguments",
      versatile.join(", ")
    ))),
    ([], []) => Err(FabError::InvalidConfig(format!(
      "Your fab.config.json deploy config has no entries for hosts capable of hosting your {}.\nSee {} for more information.",
      kind, DEPLOYING_DOCS
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deploy::providers::{Capabilities, HostingProvider};
  use serde_json::json;

  fn registry() -> ProviderRegistry {
    ProviderRegistry::new(
      [
        ("A", Capabilities::SERVER),
        ("A2", Capabilities::SERVER),
        ("B", Capabilities::ASSETS),
        ("B2", Capabilities::ASSETS),
        ("C", Capabilities::BOTH),
        ("C2", Capabilities::BOTH),
        (
          "N",
          Capabilities {
            server: false,
            assets: false,
          },
        ),
      ]
      .into_iter()
      .map(|(name, capabilities)| HostingProvider {
        name: name.to_string(),
        capabilities,
        module: format!("deployer-{}", name.to_lowercase()),
      }),
    )
  }

  fn config(targets: &[&str]) -> DeployConfig {
    targets.iter().map(|t| (t.to_string(), json!({}))).collect()
  }

  fn resolved(server: &str, assets: &str) -> ProviderResolution {
    ProviderResolution {
      server_provider: server.to_string(),
      assets_provider: assets.to_string(),
    }
  }

  fn assert_invalid_config(result: Result<ProviderResolution, FabError>, needle: &str) {
    match result {
      Err(FabError::InvalidConfig(message)) => assert!(message.contains(needle), "{}", message),
      other => panic!("expected InvalidConfig containing {:?}, got {:?}", needle, other),
    }
  }

  #[test]
  fn classify_preserves_config_order() {
    let buckets = classify(&config(&["C2", "A", "B", "C"]), &registry()).unwrap();

    assert_eq!(buckets.server_only, ["A"]);
    assert_eq!(buckets.assets_only, ["B"]);
    assert_eq!(buckets.versatile, ["C2", "C"]);
  }

  #[test]
  fn classify_rejects_unknown_target() {
    let err = classify(&config(&["A", "netlify"]), &registry()).unwrap_err();

    assert!(matches!(err, FabError::InvalidConfig(_)));
    assert!(err.to_string().contains("'netlify'"));
    assert!(err.to_string().contains("A, A2, B"));
  }

  #[test]
  fn classify_rejects_target_without_capabilities() {
    let err = classify(&config(&["N"]), &registry()).unwrap_err();
    assert!(matches!(err, FabError::Deploy(_)));
  }

  #[test]
  fn specific_hosts_pair_up() {
    let resolution = resolve(&config(&["A", "B"]), &registry(), None, None).unwrap();
    assert_eq!(resolution, resolved("A", "B"));
    assert!(!resolution.is_single_provider());
  }

  #[test]
  fn single_versatile_hosts_everything() {
    let resolution = resolve(&config(&["C"]), &registry(), None, None).unwrap();
    assert_eq!(resolution, resolved("C", "C"));
    assert!(resolution.is_single_provider());
  }

  #[test]
  fn specific_beats_versatile() {
    let resolution = resolve(&config(&["C", "A"]), &registry(), None, None).unwrap();
    assert_eq!(resolution, resolved("A", "C"));
  }

  #[test]
  fn single_specific_beats_ambiguous_versatile() {
    let resolution = resolve(&config(&["C", "C2", "A", "B"]), &registry(), None, None).unwrap();
    assert_eq!(resolution, resolved("A", "B"));
  }

  #[test]
  fn two_server_only_hosts_are_ambiguous() {
    assert_invalid_config(
      resolve(&config(&["A", "A2", "B"]), &registry(), None, None),
      "multiple server-only hosts: A, A2",
    );
  }

  #[test]
  fn ambiguous_specific_is_not_rescued_by_versatile() {
    assert_invalid_config(
      resolve(&config(&["A", "A2", "C"]), &registry(), None, None),
      "--server-host",
    );
  }

  #[test]
  fn two_versatile_hosts_are_ambiguous() {
    assert_invalid_config(
      resolve(&config(&["C", "C2"]), &registry(), None, None),
      "both server & asset hosting: C, C2",
    );
  }

  #[test]
  fn missing_half_is_an_error() {
    assert_invalid_config(
      resolve(&config(&["A"]), &registry(), None, None),
      "hosting your assets",
    );
  }

  #[test]
  fn empty_deploy_config_has_no_server_host() {
    assert_invalid_config(resolve(&config(&[]), &registry(), None, None), "hosting your server");
  }

  #[test]
  fn override_settles_ambiguity() {
    let resolution = resolve(&config(&["A", "A2", "B"]), &registry(), Some("A2"), None).unwrap();
    assert_eq!(resolution, resolved("A2", "B"));
  }

  #[test]
  fn override_can_pick_versatile_over_specific() {
    let resolution = resolve(&config(&["A", "B", "C"]), &registry(), Some("C"), Some("C")).unwrap();
    assert_eq!(resolution, resolved("C", "C"));
  }

  #[test]
  fn override_must_be_configured() {
    assert_invalid_config(
      resolve(&config(&["A", "B"]), &registry(), Some("X"), None),
      "server host 'X' does not exist",
    );
  }

  #[test]
  fn override_must_have_capability() {
    assert_invalid_config(
      resolve(&config(&["A", "B"]), &registry(), Some("B"), None),
      "server host 'B' cannot host the server",
    );
    assert_invalid_config(
      resolve(&config(&["A", "B"]), &registry(), None, Some("A")),
      "assets host 'A' cannot host the assets",
    );
  }

  #[test]
  fn configured_override_still_requires_known_targets() {
    // Classification runs before overrides are looked at.
    let err = resolve(&config(&["A", "B", "ghost"]), &registry(), Some("A"), Some("B")).unwrap_err();
    assert!(matches!(err, FabError::InvalidConfig(_)));
  }
}
