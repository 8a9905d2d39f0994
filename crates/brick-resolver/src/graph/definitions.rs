//! Definition propagation.
//!
//! A dependency's definitions are assembled from its own list plus four
//! tiers, each split into public and private halves:
//!
//! 1. global: root-level definitions the dependency accepts by key
//! 2. required: keys every direct consumer must supply
//! 3. optional: keys a direct consumer may supply
//! 4. ingest: always applied
//!
//! Singleton dependencies skip the consumer tiers.

use std::collections::HashSet;

use brick_core::error::BrickError;
use brick_core::types::definitions::{
    definition_key, definition_value, find_definition, has_value, substitute_placeholders,
};
use brick_core::types::{Definitions, Manifest};

use crate::ResolverResult;

/// Root-level global definitions and the keys some dependency accepted
#[derive(Debug, Clone)]
pub struct Globals {
    values: Vec<String>,
    accepted: HashSet<String>,
}

impl Globals {
    /// Globals declared by `root`. Keys in the root's own global template
    /// count as accepted.
    pub fn new(root: &Manifest) -> Self {
        let accepted = root
            .build
            .global
            .all()
            .map(|entry| definition_key(entry).to_string())
            .collect();
        Self {
            values: root.build.global_definitions.clone(),
            accepted,
        }
    }

    /// Value for `key`, marking the key as accepted
    fn take(&mut self, key: &str) -> Option<String> {
        let value = find_definition(&self.values, key)?.clone();
        self.accepted.insert(key.to_string());
        Some(value)
    }

    /// First global key nothing accepted
    pub fn unrecognized(&self) -> Option<&str> {
        self.values
            .iter()
            .map(|entry| definition_key(entry))
            .find(|key| !self.accepted.contains(*key))
    }
}

/// The consuming edge a dependency is reached through
#[derive(Debug, Clone, Copy)]
pub struct Consumer<'a> {
    pub name: &'a str,
    /// Definitions the consumer hands down on this edge
    pub supplied: &'a [String],
    /// The consumer target's own computed definitions
    pub definitions: &'a Definitions,
}

/// Compute the definitions `package` builds with when reached through
/// `consumer`
pub fn fill_definitions(
    package: &Manifest,
    consumer: Consumer<'_>,
    globals: &mut Globals,
) -> ResolverResult<Definitions> {
    let build = &package.build;
    let mut filled = build.definitions.clone();

    global_tier(&build.global.public, globals, &mut filled.public);
    global_tier(&build.global.private, globals, &mut filled.private);

    if !build.singleton {
        let supplied = substitute(package, consumer)?;
        let tiers = [(&build.required, true), (&build.optional, false)];
        for (template, mandatory) in tiers {
            consumer_tier(package, consumer, &template.public, &supplied, mandatory, &mut filled.public)?;
            consumer_tier(package, consumer, &template.private, &supplied, mandatory, &mut filled.private)?;
        }
    }

    filled.extend(&build.ingest);
    Ok(filled)
}

fn global_tier(template: &[String], globals: &mut Globals, out: &mut Vec<String>) {
    for entry in template {
        match globals.take(definition_key(entry)) {
            Some(value) => out.push(value),
            // `KEY=value` entries are defaults
            None if has_value(entry) => out.push(entry.clone()),
            None => {},
        }
    }
}

fn consumer_tier(
    package: &Manifest,
    consumer: Consumer<'_>,
    template: &[String],
    supplied: &[String],
    mandatory: bool,
    out: &mut Vec<String>,
) -> ResolverResult<()> {
    for entry in template {
        let key = definition_key(entry);
        match find_definition(supplied, key) {
            Some(value) => out.push(value.clone()),
            None if mandatory => {
                return Err(BrickError::MissingRequiredDefinition {
                    package: package.name.clone(),
                    consumer: consumer.name.to_string(),
                    key: key.to_string(),
                })
            },
            None => {},
        }
    }
    Ok(())
}

/// Fill `${KEY}` placeholders in the consumer's definitions from the
/// consumer's own computed definitions
fn substitute(package: &Manifest, consumer: Consumer<'_>) -> ResolverResult<Vec<String>> {
    let lookup = |token: &str| consumer.definitions.find(token).map(|d| definition_value(d));

    consumer
        .supplied
        .iter()
        .map(|definition| {
            substitute_placeholders(definition, &lookup).map_err(|token| {
                BrickError::UnresolvedPlaceholder {
                    package: package.name.clone(),
                    consumer: consumer.name.to_string(),
                    token,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brick_core::types::{BuildOptions, ProjectType, Version};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn private(items: &[&str]) -> Definitions {
        Definitions::new(Vec::new(), strings(items))
    }

    fn manifest(name: &str, build: BuildOptions) -> Manifest {
        Manifest::new(ProjectType::Package, name, Version::new(1, 0, 0)).with_build(build)
    }

    fn root(globals: &[&str]) -> Manifest {
        manifest(
            "app",
            BuildOptions {
                global_definitions: strings(globals),
                ..Default::default()
            },
        )
    }

    fn consumer<'a>(supplied: &'a [String], definitions: &'a Definitions) -> Consumer<'a> {
        Consumer {
            name: "app",
            supplied,
            definitions,
        }
    }

    #[test]
    fn test_tiers_in_order() {
        let package = manifest(
            "led",
            BuildOptions {
                definitions: private(&["OWN"]),
                global: Definitions::new(strings(&["DEBUG"]), Vec::new()),
                required: private(&["PIN"]),
                optional: private(&["BLINK", "DIM"]),
                ingest: Definitions::new(strings(&["LED_LIB"]), Vec::new()),
                ..Default::default()
            },
        );
        let mut globals = Globals::new(&root(&["DEBUG=2"]));
        let supplied = strings(&["PIN=13", "DIM=1", "UNUSED=5"]);
        let parent = Definitions::default();

        let filled = fill_definitions(&package, consumer(&supplied, &parent), &mut globals).unwrap();

        assert_eq!(filled.public, strings(&["DEBUG=2", "LED_LIB"]));
        assert_eq!(filled.private, strings(&["OWN", "PIN=13", "DIM=1"]));
        assert!(globals.unrecognized().is_none());
    }

    #[test]
    fn test_missing_required() {
        let package = manifest(
            "led",
            BuildOptions {
                required: private(&["FOO"]),
                ..Default::default()
            },
        );
        let mut globals = Globals::new(&root(&[]));
        let parent = Definitions::default();

        let err = fill_definitions(&package, consumer(&[], &parent), &mut globals).unwrap_err();
        match err {
            BrickError::MissingRequiredDefinition {
                package,
                consumer,
                key,
            } => {
                assert_eq!(package, "led");
                assert_eq!(consumer, "app");
                assert_eq!(key, "FOO");
            },
            other => panic!("expected MissingRequiredDefinition, got {:?}", other),
        }

        let supplied = strings(&["FOO=bar"]);
        let filled = fill_definitions(&package, consumer(&supplied, &parent), &mut globals).unwrap();
        assert_eq!(filled.private, strings(&["FOO=bar"]));
    }

    #[test]
    fn test_singleton_skips_consumer_tiers() {
        let package = manifest(
            "log",
            BuildOptions {
                singleton: true,
                required: private(&["FOO"]),
                global: private(&["LEVEL=info"]),
                ..Default::default()
            },
        );
        let mut globals = Globals::new(&root(&[]));
        let supplied = strings(&["FOO=1"]);
        let parent = Definitions::default();

        let filled = fill_definitions(&package, consumer(&supplied, &parent), &mut globals).unwrap();

        assert_eq!(filled.private, strings(&["LEVEL=info"]));
        assert!(filled.public.is_empty());
    }

    #[test]
    fn test_global_defaults_and_bare_keys() {
        let package = manifest(
            "net",
            BuildOptions {
                global: private(&["TLS=openssl", "IPV6"]),
                ..Default::default()
            },
        );

        let mut globals = Globals::new(&root(&[]));
        let parent = Definitions::default();
        let filled = fill_definitions(&package, consumer(&[], &parent), &mut globals).unwrap();
        assert_eq!(filled.private, strings(&["TLS=openssl"]));

        let mut globals = Globals::new(&root(&["IPV6", "TLS=mbedtls"]));
        let filled = fill_definitions(&package, consumer(&[], &parent), &mut globals).unwrap();
        assert_eq!(filled.private, strings(&["TLS=mbedtls", "IPV6"]));
    }

    #[test]
    fn test_placeholders_use_consumer_definitions() {
        let package = manifest(
            "uart",
            BuildOptions {
                required: private(&["BAUD"]),
                ..Default::default()
            },
        );
        let mut globals = Globals::new(&root(&[]));
        let parent = private(&["CLOCK=16000000", "SPEED=115200"]);

        let supplied = strings(&["BAUD=${SPEED}"]);
        let filled = fill_definitions(&package, consumer(&supplied, &parent), &mut globals).unwrap();
        assert_eq!(filled.private, strings(&["BAUD=115200"]));

        let supplied = strings(&["BAUD=${RATE}"]);
        let err = fill_definitions(&package, consumer(&supplied, &parent), &mut globals).unwrap_err();
        assert!(matches!(err, BrickError::UnresolvedPlaceholder { token, .. } if token == "RATE"));
    }

    #[test]
    fn test_unrecognized_globals() {
        let mut globals = Globals::new(&root(&["DEBUG", "TRACE=1"]));
        assert_eq!(globals.unrecognized(), Some("DEBUG"));

        assert_eq!(globals.take("DEBUG").as_deref(), Some("DEBUG"));
        assert_eq!(globals.unrecognized(), Some("TRACE"));

        // The root's own template accepts keys too
        let mut app = root(&["TRACE=1"]);
        app.build.global = private(&["TRACE"]);
        assert!(Globals::new(&app).unrecognized().is_none());
    }
}
