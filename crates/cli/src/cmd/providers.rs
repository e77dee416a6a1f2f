use anyhow::Result;

use fab_lib::deploy::ProviderRegistry;

use crate::output::{OutputFormat, format_capabilities, print_info, print_json, print_stat};

pub fn cmd_providers(format: OutputFormat) -> Result<()> {
  let registry = ProviderRegistry::builtin();

  if format.is_json() {
    return print_json(&registry.iter().collect::<Vec<_>>());
  }

  for provider in registry.iter() {
    print_info(&provider.name);
    print_stat("Hosts", &format_capabilities(provider.capabilities));
    print_stat("Module", &provider.module);
  }

  Ok(())
}
