//! The build pipeline.
//!
//! A build runs every plugin of the `build` config section, in declaration
//! order, against a single [`ProtoFab`]:
//!
//! 1. all build and runtime plugins are resolved up front, so a typo fails
//!    the build before anything runs
//! 2. each build plugin gets `&mut ProtoFab` in turn and sees everything the
//!    plugins before it wrote
//! 3. the result must pass [`gate::validate`]
//! 4. the artifact and the runtime plugin list go to the [`Compiler`]
//!
//! A failing plugin stops the build where it is. Nothing is rolled back and
//! nothing is written.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, instrument};

use crate::compile::{CompileOutput, Compiler};
use crate::config::FabConfig;
use crate::consts::{REWIRE_ASSETS_DOCS, REWIRE_ASSETS_PLUGIN};
use crate::error::FabError;
use crate::gate;
use crate::plugin::{
  BuildPluginDescriptor, PluginResolver, RuntimePluginDescriptor, resolve_build_plugin, resolve_runtime_plugin,
};
use crate::proto_fab::ProtoFab;

/// Build plugins and runtime plugins resolved from a config, in declared order.
#[derive(Debug, Clone)]
pub struct BuildPlan {
  pub build_plugins: Vec<BuildPluginDescriptor>,
  pub runtime_plugins: Vec<RuntimePluginDescriptor>,
}

impl BuildPlan {
  /// Resolve every plugin named in `config` relative to `base`.
  pub fn resolve(base: &Path, config: &FabConfig, resolver: &dyn PluginResolver) -> Result<Self, FabError> {
    let build_plugins = config
      .build
      .iter()
      .map(|(name, args)| resolve_build_plugin(resolver, base, name, args))
      .collect::<Result<Vec<_>, _>>()?;

    let runtime_plugins = config
      .runtime
      .iter()
      .map(|name| resolve_runtime_plugin(resolver, base, name))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      build_plugins,
      runtime_plugins,
    })
  }

  /// Run the build plugins against `proto_fab`, one at a time.
  pub async fn run(&self, proto_fab: &mut ProtoFab) -> Result<(), FabError> {
    let total = self.build_plugins.len();

    for (index, plugin) in self.build_plugins.iter().enumerate() {
      debug!(plugin = %plugin.name, step = index + 1, total, args = %plugin.args, "running build plugin");
      let started = Instant::now();

      if let Err(e) = plugin.builder.build(&plugin.args, proto_fab).await {
        error!(plugin = %plugin.name, step = index + 1, error = %e, "build plugin failed");
        return Err(FabError::plugin_failed(&plugin.name, e));
      }

      info!(
        plugin = %plugin.name,
        step = index + 1,
        total,
        files = proto_fab.file_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build plugin finished"
      );
    }

    Ok(())
  }
}

/// Check that a finished artifact can be compiled.
pub fn check_compilable(proto_fab: &ProtoFab) -> Result<(), FabError> {
  match gate::validate(proto_fab) {
    None => Ok(()),
    Some(reason) => Err(FabError::BuildFailed(format!(
      "FAB is not ready for compilation.\n{}\nYou might need to add {} to your 'build' config. See {} for more information about what this module is and why it's needed.",
      reason, REWIRE_ASSETS_PLUGIN, REWIRE_ASSETS_DOCS
    ))),
  }
}

/// Run a full build: resolve, run plugins, validate, compile.
#[instrument(skip_all, fields(base = %base.display()))]
pub async fn build(
  base: &Path,
  config: &FabConfig,
  resolver: &dyn PluginResolver,
  compiler: &dyn Compiler,
) -> Result<CompileOutput, FabError> {
  let plan = BuildPlan::resolve(base, config, resolver)?;
  info!(
    build_plugins = plan.build_plugins.len(),
    runtime_plugins = plan.runtime_plugins.len(),
    "resolved plugins"
  );

  let mut proto_fab = ProtoFab::new();
  plan.run(&mut proto_fab).await?;

  check_compilable(&proto_fab)?;

  compiler.compile(proto_fab, &plan.runtime_plugins).await
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;
  use std::rc::Rc;

  use async_trait::async_trait;
  use serde_json::json;
  use tracing_test::traced_test;

  use super::*;
  use crate::config::PluginArgs;
  use crate::error::PluginError;
  use crate::plugin::{PluginLocation, PluginRegistry};

  /// Compiler that keeps what it was given.
  #[derive(Default)]
  struct CapturingCompiler {
    received: RefCell<Option<(ProtoFab, Vec<RuntimePluginDescriptor>)>>,
  }

  #[async_trait(?Send)]
  impl Compiler for CapturingCompiler {
    async fn compile(
      &self,
      proto_fab: ProtoFab,
      runtime_plugins: &[RuntimePluginDescriptor],
    ) -> Result<CompileOutput, FabError> {
      let file_count = proto_fab.file_count();
      *self.received.borrow_mut() = Some((proto_fab, runtime_plugins.to_vec()));
      Ok(CompileOutput {
        output_dir: "out".into(),
        manifest_path: "out/fab.manifest.json".into(),
        file_count,
        total_bytes: 0,
      })
    }
  }

  impl CapturingCompiler {
    fn was_called(&self) -> bool {
      self.received.borrow().is_some()
    }
  }

  type Trace = Rc<RefCell<Vec<String>>>;

  /// A plugin that records its name and the files it saw, then writes `file`.
  fn tracing_plugin(registry: PluginRegistry, name: &'static str, trace: &Trace) -> PluginRegistry {
    let trace = trace.clone();
    registry.with_build_fn(name, move |args: &PluginArgs, fab: &mut ProtoFab| {
      let seen: Vec<_> = fab.paths().map(str::to_string).collect();
      trace.borrow_mut().push(format!("{}:{}", name, seen.join(",")));
      if let Some(file) = args["file"].as_str() {
        fab.add_file(file, name);
      }
      Ok(())
    })
  }

  fn config(build: serde_json::Value, runtime: &[&str]) -> FabConfig {
    FabConfig {
      build: serde_json::from_value(build).unwrap(),
      runtime: runtime.iter().map(|s| s.to_string()).collect(),
      deploy: None,
    }
  }

  fn base() -> &'static Path {
    Path::new("/project")
  }

  #[tokio::test]
  async fn plugins_run_in_declared_order_and_see_earlier_output() {
    let trace = Trace::default();
    let registry = PluginRegistry::new();
    let registry = tracing_plugin(registry, "zeta", &trace);
    let registry = tracing_plugin(registry, "alpha", &trace);
    let registry = tracing_plugin(registry, "mid", &trace);
    let compiler = CapturingCompiler::default();

    build(
      base(),
      &config(
        json!({
          "zeta": { "file": "/server.js" },
          "alpha": { "file": "/_assets/a.js" },
          "mid": {}
        }),
        &[],
      ),
      &registry,
      &compiler,
    )
    .await
    .unwrap();

    assert_eq!(
      *trace.borrow(),
      ["zeta:", "alpha:/server.js", "mid:/_assets/a.js,/server.js"]
    );
  }

  #[tokio::test]
  async fn later_plugins_can_rewrite_earlier_output() {
    let registry = PluginRegistry::new()
      .with_build_fn("input", |_: &PluginArgs, fab: &mut ProtoFab| {
        fab.add_file("/index.html", "<html>");
        fab.add_file("/server.js", "server");
        Ok(())
      })
      .with_build_fn("rewire", |_: &PluginArgs, fab: &mut ProtoFab| {
        let stray: Vec<String> = fab
          .paths()
          .filter(|p| *p != "/server.js" && !p.starts_with("/_assets/"))
          .map(str::to_string)
          .collect();
        for path in stray {
          fab.rename_file(&path, &format!("/_assets{}", path));
        }
        Ok(())
      });
    let compiler = CapturingCompiler::default();

    let output = build(
      base(),
      &config(json!({ "input": {}, "rewire": {} }), &[]),
      &registry,
      &compiler,
    )
    .await
    .unwrap();

    assert_eq!(output.file_count, 2);
    let received = compiler.received.borrow();
    let (fab, _) = received.as_ref().unwrap();
    assert!(fab.has_file("/_assets/index.html"));
  }

  #[tokio::test]
  async fn unresolvable_plugin_fails_before_any_plugin_runs() {
    let trace = Trace::default();
    let registry = tracing_plugin(PluginRegistry::new(), "first", &trace);
    let registry = tracing_plugin(registry, "third", &trace);
    let compiler = CapturingCompiler::default();

    let err = build(
      base(),
      &config(json!({ "first": {}, "second": {}, "third": {} }), &[]),
      &registry,
      &compiler,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FabError::InvalidConfig(_)));
    assert!(err.to_string().contains("'second'"));
    assert!(trace.borrow().is_empty());
    assert!(!compiler.was_called());
  }

  #[tokio::test]
  async fn failing_plugin_stops_the_pipeline() {
    let trace = Trace::default();
    let registry = tracing_plugin(PluginRegistry::new(), "first", &trace)
      .with_build_fn("broken", |_: &PluginArgs, _: &mut ProtoFab| {
        Err(PluginError::Message("cannot read public/".to_string()))
      });
    let registry = tracing_plugin(registry, "last", &trace);
    let compiler = CapturingCompiler::default();

    let err = build(
      base(),
      &config(json!({ "first": {}, "broken": {}, "last": {} }), &[]),
      &registry,
      &compiler,
    )
    .await
    .unwrap_err();

    match err {
      FabError::PluginFailed { plugin, source } => {
        assert_eq!(plugin, "broken");
        assert_eq!(source.to_string(), "cannot read public/");
      }
      other => panic!("expected PluginFailed, got {:?}", other),
    }
    assert_eq!(*trace.borrow(), ["first:"]);
    assert!(!compiler.was_called());
  }

  #[tokio::test]
  async fn stray_files_fail_with_their_paths() {
    let registry = PluginRegistry::new().with_build_fn("input", |_: &PluginArgs, fab: &mut ProtoFab| {
      fab.add_file("/server.js", "server");
      fab.add_file("/index.html", "<html>");
      fab.add_file("/robots.txt", "");
      Ok(())
    });
    let compiler = CapturingCompiler::default();

    let err = build(base(), &config(json!({ "input": {} }), &[]), &registry, &compiler)
      .await
      .unwrap_err();

    match &err {
      FabError::BuildFailed(message) => {
        assert!(message.contains("/index.html"));
        assert!(message.contains("/robots.txt"));
        assert!(message.contains(REWIRE_ASSETS_PLUGIN));
      }
      other => panic!("expected BuildFailed, got {:?}", other),
    }
    assert!(!compiler.was_called());
  }

  #[tokio::test]
  async fn runtime_plugins_reach_the_compiler_in_order() {
    let registry = PluginRegistry::new()
      .with_runtime("@fab/b/runtime")
      .with_runtime("@fab/a");
    let compiler = CapturingCompiler::default();

    build(base(), &config(json!({}), &["@fab/b", "@fab/a"]), &registry, &compiler)
      .await
      .unwrap();

    let received = compiler.received.borrow();
    let (_, runtime) = received.as_ref().unwrap();
    assert_eq!(
      *runtime,
      [
        RuntimePluginDescriptor {
          name: "@fab/b".to_string(),
          location: PluginLocation::Registered("@fab/b/runtime".to_string()),
        },
        RuntimePluginDescriptor {
          name: "@fab/a".to_string(),
          location: PluginLocation::Registered("@fab/a".to_string()),
        },
      ]
    );
  }

  #[tokio::test]
  async fn runtime_plugins_are_not_run() {
    let trace = Trace::default();
    // The module has both exports; listing it under `runtime` only must not run it.
    let registry = tracing_plugin(PluginRegistry::new(), "@fab/both", &trace).with_runtime("@fab/both");
    let compiler = CapturingCompiler::default();

    build(base(), &config(json!({}), &["@fab/both"]), &registry, &compiler)
      .await
      .unwrap();

    assert!(trace.borrow().is_empty());
  }

  #[tokio::test]
  async fn runtime_resolution_failure_stops_build_before_plugins() {
    let trace = Trace::default();
    let registry = tracing_plugin(PluginRegistry::new(), "first", &trace);
    let compiler = CapturingCompiler::default();

    let err = build(base(), &config(json!({ "first": {} }), &["@fab/ghost"]), &registry, &compiler)
      .await
      .unwrap_err();

    assert!(matches!(err, FabError::InvalidConfig(_)));
    assert!(trace.borrow().is_empty());
  }

  #[tokio::test]
  #[traced_test]
  async fn plugin_progress_is_logged() {
    let registry = PluginRegistry::new().with_build_fn("input", |_: &PluginArgs, fab: &mut ProtoFab| {
      fab.add_file("/server.js", "server");
      Ok(())
    });
    let compiler = CapturingCompiler::default();

    build(base(), &config(json!({ "input": {} }), &[]), &registry, &compiler)
      .await
      .unwrap();

    assert!(logs_contain("build plugin finished"));
    assert!(logs_contain("resolved plugins"));
  }
}
