use std::sync::Arc;

use brick_core::types::{
    BuildOptions, Dependency, DependencyOptions, Manifest, ProjectType, SharedLibrary, Version,
};
use brick_registry::MemoryRegistry;
use camino::Utf8PathBuf;
use proptest::prelude::*;
use tempfile::TempDir;

use super::*;
use crate::locator::{Locator, Package, PackageSource};
use crate::session::{Resolution, Session};

fn resolve(registry: &MemoryRegistry, root: Manifest) -> Resolution {
    let temp = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    let locator = Locator::new(dir.join("vendor"), dir.join("modules"));
    Session::new(registry, locator).resolve_project(&dir, root).unwrap()
}

fn plan(registry: &MemoryRegistry, root: Manifest) -> ResolverResult<BuildPlan> {
    build_plan(&resolve(registry, root))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn package(name: &str) -> Manifest {
    Manifest::new(ProjectType::Package, name, Version::new(1, 0, 0))
}

fn app() -> Manifest {
    Manifest::new(ProjectType::Application, "app", Version::new(0, 1, 0))
}

fn with_definitions(name: &str, definitions: &[&str]) -> Dependency {
    Dependency::new(name, "^1").with_options(DependencyOptions {
        definitions: strings(definitions),
        ..Default::default()
    })
}

fn with_link(name: &str, link: Option<Visibility>) -> Dependency {
    Dependency::new(name, "^1").with_options(DependencyOptions {
        link,
        ..Default::default()
    })
}

fn target<'a>(plan: &'a BuildPlan, display_name: &str) -> &'a Target {
    plan.targets
        .targets()
        .find(|target| target.display_name == display_name)
        .unwrap_or_else(|| panic!("no target named {}", display_name))
}

fn visibility(plan: &BuildPlan, from: &str, to: &str) -> Visibility {
    let from = &target(plan, from).id;
    let to = &target(plan, to).id;
    plan.targets
        .links_from(from)
        .find(|edge| &edge.to == to)
        .map(|edge| edge.visibility)
        .unwrap_or_else(|| panic!("no link"))
}

#[test]
fn test_root_target() {
    let registry = MemoryRegistry::new();
    let flags = strings(&["-O2", "-lm", "-Wall", "-lpthread"]);

    let lib = package("lib").with_build(BuildOptions {
        flags: flags.clone(),
        standard: Some("c++17".to_string()),
        ..Default::default()
    });
    let plan = plan(&registry, lib).unwrap();
    let root = plan.root_target().unwrap();
    assert_eq!(root.display_name, "lib");
    assert_eq!(root.flags, strings(&["-O2", "-Wall"]));
    assert_eq!(root.link_flags, strings(&["-lm", "-lpthread"]));
    assert_eq!(root.standard.map(|s| s.to_string()).as_deref(), Some("c++17"));

    // Link flags are only split out for packages
    let application = app().with_build(BuildOptions {
        flags: flags.clone(),
        ..Default::default()
    });
    let plan = self::plan(&registry, application).unwrap();
    assert_eq!(plan.root_target().unwrap().flags, flags);
    assert_eq!(plan.targets.len(), 1);
}

#[test]
fn test_identical_edges_share_one_target() {
    let registry = MemoryRegistry::new()
        .with(&package("bar"))
        .with(&package("foo").with_dependency(Dependency::new("bar", "^1")))
        .with(&package("baz").with_dependency(Dependency::new("bar", "^1")));
    let root = app()
        .with_dependency(Dependency::new("foo", "^1"))
        .with_dependency(Dependency::new("baz", "^1"));

    let plan = plan(&registry, root).unwrap();

    assert_eq!(plan.targets.named("bar").count(), 1);
    assert_eq!(plan.targets.len(), 4);
    assert_eq!(plan.targets.links().len(), 4);
    assert_eq!(visibility(&plan, "foo", "bar"), Visibility::Private);
    assert_eq!(visibility(&plan, "baz", "bar"), Visibility::Private);
}

#[test]
fn test_different_definitions_split_targets() {
    let bar = package("bar").with_build(BuildOptions {
        optional: Definitions::new(Vec::new(), strings(&["MODE"])),
        ..Default::default()
    });
    let registry = MemoryRegistry::new()
        .with(&bar)
        .with(&package("foo").with_dependency(with_definitions("bar", &["MODE=fast"])))
        .with(&package("baz").with_dependency(with_definitions("bar", &["MODE=small"])))
        .with(&package("qux").with_dependency(with_definitions("bar", &["MODE=fast"])));
    let root = app()
        .with_dependency(Dependency::new("foo", "^1"))
        .with_dependency(Dependency::new("baz", "^1"))
        .with_dependency(Dependency::new("qux", "^1"));

    let plan = plan(&registry, root).unwrap();

    let names: Vec<_> = plan.targets.named("bar").map(|t| t.display_name.as_str()).collect();
    assert_eq!(names, vec!["bar", "bar_1"]);
    assert_eq!(target(&plan, "bar").definitions.private, strings(&["MODE=fast"]));
    assert_eq!(target(&plan, "bar_1").definitions.private, strings(&["MODE=small"]));

    // qux reuses the first specialization
    let qux = &target(&plan, "qux").id;
    let linked: Vec<_> = plan.targets.links_from(qux).map(|edge| edge.to.clone()).collect();
    assert_eq!(linked, vec![target(&plan, "bar").id.clone()]);
}

#[test]
fn test_required_definitions() {
    let required = BuildOptions {
        required: Definitions::new(Vec::new(), strings(&["FOO"])),
        ..Default::default()
    };
    let registry = MemoryRegistry::new().with(&package("bar").with_build(required.clone()));

    let err = plan(&registry, app().with_dependency(Dependency::new("bar", "^1"))).unwrap_err();
    assert!(matches!(
        err,
        BrickError::MissingRequiredDefinition { ref package, ref key, .. }
            if package == "bar" && key == "FOO"
    ));

    let plan_ok = plan(&registry, app().with_dependency(with_definitions("bar", &["FOO=7"]))).unwrap();
    assert_eq!(target(&plan_ok, "bar").definitions.private, strings(&["FOO=7"]));

    let singleton = MemoryRegistry::new().with(&package("bar").with_build(BuildOptions {
        singleton: true,
        ..required
    }));
    let plan_singleton = plan(&singleton, app().with_dependency(Dependency::new("bar", "^1"))).unwrap();
    assert!(target(&plan_singleton, "bar").definitions.is_empty());
}

#[test]
fn test_link_visibility() {
    let header_only = BuildOptions {
        header_only: true,
        ..Default::default()
    };
    let registry = MemoryRegistry::new()
        .with(&package("hdr").with_build(header_only.clone()))
        .with(&package("pub"))
        .with(&package("priv"))
        .with(&package("leaf"))
        .with(
            &package("inline")
                .with_build(header_only)
                .with_dependency(with_link("leaf", Some(Visibility::Private))),
        );
    let root = app()
        .with_dependency(with_link("hdr", Some(Visibility::Public)))
        .with_dependency(with_link("pub", Some(Visibility::Public)))
        .with_dependency(with_link("priv", None))
        .with_dependency(with_link("inline", None));

    let plan = plan(&registry, root).unwrap();

    assert_eq!(visibility(&plan, "app", "hdr"), Visibility::Interface);
    assert_eq!(visibility(&plan, "app", "pub"), Visibility::Public);
    assert_eq!(visibility(&plan, "app", "priv"), Visibility::Private);
    // A header-only consumer can only pass usage requirements through
    assert_eq!(visibility(&plan, "inline", "leaf"), Visibility::Interface);
}

#[test]
fn test_consumer_flags_come_last() {
    let edge = DependencyOptions {
        flags: strings(&["-DEDGE"]),
        link_flags: strings(&["-Wl,-z,now"]),
        ..Default::default()
    };
    let registry = MemoryRegistry::new()
        .with(&package("lib").with_build(BuildOptions {
            flags: strings(&["-O2"]),
            ..Default::default()
        }))
        .with(&package("once").with_build(BuildOptions {
            flags: strings(&["-O2"]),
            singleton: true,
            ..Default::default()
        }));
    let root = app()
        .with_dependency(Dependency::new("lib", "^1").with_options(edge.clone()))
        .with_dependency(Dependency::new("once", "^1").with_options(edge));

    let plan = plan(&registry, root).unwrap();

    assert_eq!(target(&plan, "lib").flags, strings(&["-O2", "-DEDGE"]));
    assert_eq!(target(&plan, "once").flags, strings(&["-O2"]));
    let edge = &plan.targets.links()[0];
    assert_eq!(edge.link_flags, strings(&["-Wl,-z,now"]));
}

#[test]
fn test_placeholders_flow_down_the_tree() {
    let registry = MemoryRegistry::new()
        .with(&package("reg").with_build(BuildOptions {
            optional: Definitions::new(strings(&["RATE"]), Vec::new()),
            ..Default::default()
        }))
        .with(
            &package("uart")
                .with_build(BuildOptions {
                    required: Definitions::new(Vec::new(), strings(&["BAUD"])),
                    ..Default::default()
                })
                .with_dependency(with_definitions("reg", &["RATE=${BAUD}"])),
        );
    let root = app()
        .with_build(BuildOptions {
            definitions: Definitions::new(Vec::new(), strings(&["SPEED=9600"])),
            ..Default::default()
        })
        .with_dependency(with_definitions("uart", &["BAUD=${SPEED}"]));

    let plan = plan(&registry, root).unwrap();

    assert_eq!(target(&plan, "uart").definitions.private, strings(&["BAUD=9600"]));
    assert_eq!(target(&plan, "reg").definitions.public, strings(&["RATE=9600"]));
}

#[test]
fn test_global_definitions() {
    let registry = MemoryRegistry::new()
        .with(&package("log").with_build(BuildOptions {
            global: Definitions::new(strings(&["LOG_LEVEL=2"]), Vec::new()),
            ..Default::default()
        }))
        .with(&package("plain"));
    let globals = BuildOptions {
        global_definitions: strings(&["LOG_LEVEL=4"]),
        ..Default::default()
    };

    let root = app()
        .with_build(globals.clone())
        .with_dependency(Dependency::new("log", "^1"))
        .with_dependency(Dependency::new("plain", "^1"));
    let plan_ok = plan(&registry, root).unwrap();
    assert_eq!(target(&plan_ok, "log").definitions.public, strings(&["LOG_LEVEL=4"]));
    assert!(target(&plan_ok, "plain").definitions.is_empty());

    let root = app()
        .with_build(globals)
        .with_dependency(Dependency::new("plain", "^1"));
    match plan(&registry, root) {
        Err(BrickError::UnrecognizedGlobalDefinition { key }) => assert_eq!(key, "LOG_LEVEL"),
        other => panic!("expected UnrecognizedGlobalDefinition, got {:?}", other),
    }
}

#[test]
fn test_dependency_not_declared() {
    let registry = MemoryRegistry::new().with(&package("bar"));
    let mut resolution = resolve(&registry, app().with_dependency(Dependency::new("bar", "^1")));

    // The manifest lost its dependency after resolution
    let path = resolution.root_package.path.clone();
    resolution.root_package = Arc::new(Package::new(app(), path, PackageSource::Root));

    match build_plan(&resolution) {
        Err(BrickError::DependencyNotDeclared { package, consumer }) => {
            assert_eq!(package, "bar");
            assert_eq!(consumer, "app");
        },
        other => panic!("expected DependencyNotDeclared, got {:?}", other),
    }
}

#[test]
fn test_invalid_standard() {
    let registry = MemoryRegistry::new().with(&package("bar").with_build(BuildOptions {
        standard: Some("c++21".to_string()),
        ..Default::default()
    }));

    let err = plan(&registry, app().with_dependency(Dependency::new("bar", "^1"))).unwrap_err();
    assert!(matches!(
        err,
        BrickError::InvalidStandard { ref package, ref token } if package == "bar" && token == "c++21"
    ));
}

#[test]
fn test_build_order_puts_dependencies_first() {
    let registry = MemoryRegistry::new()
        .with(&package("zlib"))
        .with(&package("png").with_dependency(Dependency::new("zlib", "^1")))
        .with(&package("freetype").with_dependency(Dependency::new("png", "^1")));
    let root = app()
        .with_dependency(Dependency::new("freetype", "^1"))
        .with_dependency(Dependency::new("zlib", "^1"));

    let plan = plan(&registry, root).unwrap();
    let order: Vec<_> = plan
        .targets
        .build_order()
        .unwrap()
        .into_iter()
        .map(|target| target.display_name.as_str())
        .collect();

    let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert_eq!(order.len(), 4);
    assert!(position("zlib") < position("png"));
    assert!(position("png") < position("freetype"));
    assert_eq!(position("app"), 3);
}

#[test]
fn test_shared_libraries() {
    let ssl = SharedLibrary {
        name: "ssl".to_string(),
        path: Some("/usr/lib/libssl.so".to_string()),
        header_only: false,
        link: Some(Visibility::Public),
        link_flags: strings(&["-Wl,--as-needed"]),
    };
    let foo_lib = SharedLibrary {
        name: "foo".to_string(),
        path: None,
        header_only: true,
        link: None,
        link_flags: Vec::new(),
    };
    let registry = MemoryRegistry::new().with(&package("foo").with_build(BuildOptions {
        shared_libraries: vec![ssl.clone()],
        ..Default::default()
    }));
    let root = app()
        .with_build(BuildOptions {
            shared_libraries: vec![ssl, foo_lib],
            ..Default::default()
        })
        .with_dependency(Dependency::new("foo", "^1"));

    let plan = plan(&registry, root).unwrap();

    assert_eq!(plan.shared_libraries.len(), 2);
    assert_eq!(plan.shared_libraries.links().len(), 3);
    let ssl = plan.shared_libraries.named("ssl").next().unwrap();
    assert_eq!(ssl.path.as_ref().map(|p| p.as_str()), Some("/usr/lib/libssl.so"));
    assert!(ssl.version.is_none());
    assert!(plan
        .shared_libraries
        .links()
        .iter()
        .filter(|edge| edge.to == ssl.id)
        .all(|edge| edge.visibility == Visibility::Public));

    // Display names are unique across both sets
    let prebuilt_foo = plan.shared_libraries.named("foo").next().unwrap();
    assert_eq!(prebuilt_foo.display_name, "foo");
    assert_eq!(target(&plan, "foo_1").name, "foo");
    let edge = plan
        .shared_libraries
        .links()
        .iter()
        .find(|edge| edge.to == prebuilt_foo.id)
        .unwrap();
    assert_eq!(edge.visibility, Visibility::Interface);
}

#[test]
fn test_plan_serializes() {
    let registry = MemoryRegistry::new().with(&package("bar"));
    let plan = plan(&registry, app().with_dependency(Dependency::new("bar", "^1"))).unwrap();

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["root"], serde_json::json!(plan.root.as_str()));
    assert_eq!(json["targets"]["targets"][1]["name"], "bar");
    assert_eq!(json["targets"]["targets"][1]["version"], "1.0.0");
    assert_eq!(json["targets"]["links"][0]["visibility"], "private");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_one_target_per_distinct_specialization(modes in prop::collection::vec(0u8..4, 1..6)) {
        let mut registry = MemoryRegistry::new().with(&package("bar").with_build(BuildOptions {
            required: Definitions::new(Vec::new(), strings(&["MODE"])),
            ..Default::default()
        }));
        let mut root = app();
        for (index, mode) in modes.iter().enumerate() {
            let consumer = format!("c{}", index);
            let definition = format!("MODE={}", mode);
            registry.publish(&package(&consumer).with_dependency(with_definitions("bar", &[definition.as_str()])));
            root = root.with_dependency(Dependency::new(consumer, "^1"));
        }

        let plan = plan(&registry, root).unwrap();

        let mut distinct = modes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        let bars: Vec<_> = plan.targets.named("bar").collect();
        prop_assert_eq!(bars.len(), distinct.len());

        let mut names: Vec<_> = plan.targets.targets().map(|t| t.display_name.clone()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        prop_assert_eq!(names.len(), total);
    }
}
