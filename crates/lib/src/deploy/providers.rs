//! Supported hosting providers and what each can host.

use indexmap::IndexMap;
use serde::Serialize;

/// Capability flags declared by a hosting provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
  pub server: bool,
  pub assets: bool,
}

impl Capabilities {
  pub const SERVER: Self = Self {
    server: true,
    assets: false,
  };
  pub const ASSETS: Self = Self {
    server: false,
    assets: true,
  };
  pub const BOTH: Self = Self {
    server: true,
    assets: true,
  };

  pub fn supports(self, kind: HostKind) -> bool {
    match kind {
      HostKind::Server => self.server,
      HostKind::Assets => self.assets,
    }
  }
}

/// The two halves of a FAB a host can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
  Server,
  Assets,
}

impl HostKind {
  pub fn as_str(self) -> &'static str {
    match self {
      HostKind::Server => "server",
      HostKind::Assets => "assets",
    }
  }
}

impl std::fmt::Display for HostKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostingProvider {
  pub name: String,
  pub capabilities: Capabilities,
  /// Name of the deployer module, resolved through the plugin resolver.
  pub module: String,
}

/// Static table of hosting providers, keyed by deploy target name.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
  providers: IndexMap<String, HostingProvider>,
}

impl ProviderRegistry {
  pub fn new(providers: impl IntoIterator<Item = HostingProvider>) -> Self {
    Self {
      providers: providers.into_iter().map(|p| (p.name.clone(), p)).collect(),
    }
  }

  /// The providers fab knows how to deploy to.
  pub fn builtin() -> Self {
    Self::new([
      HostingProvider {
        name: "aws-lambda-edge".to_string(),
        capabilities: Capabilities::SERVER,
        module: "@fab/deployer-aws-lambda".to_string(),
      },
      HostingProvider {
        name: "aws-s3".to_string(),
        capabilities: Capabilities::ASSETS,
        module: "@fab/deployer-aws-s3".to_string(),
      },
      HostingProvider {
        name: "cf-workers".to_string(),
        capabilities: Capabilities::BOTH,
        module: "@fab/deployer-cf-workers".to_string(),
      },
    ])
  }

  pub fn get(&self, name: &str) -> Option<&HostingProvider> {
    self.providers.get(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.providers.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &HostingProvider> {
    self.providers.values()
  }
}
