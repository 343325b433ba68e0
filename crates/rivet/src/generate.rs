//! Proxy Generator
//!
//! Discovers the names a proxy answers to. Fields are flattened across
//! embedded members breadth-first, so every field at embedding depth `d` is
//! registered before any field at depth `d + 1`. A name, once registered,
//! keeps its first binding: an outer field always shadows a deeper one.

use std::collections::VecDeque;

use rivet_sdk::NativeFunction;
use rivet_types::{Field, HostType, Method, Shape};
use rustc_hash::FxHashMap;

use crate::config::BridgeConfig;
use crate::descriptor::AccessPath;
use crate::function::wrap_func;

/// Field names reachable from struct `root`, with their access paths
pub(crate) fn fields(root: &HostType, config: &BridgeConfig) -> FxHashMap<String, AccessPath> {
    let mut table = FxHashMap::default();
    let mut queue = VecDeque::new();
    queue.push_back((root.clone(), AccessPath::root()));

    while let Some((ty, path)) = queue.pop_front() {
        let ty = match ty.shape() {
            Shape::Pointer(elem) => elem.clone(),
            _ => ty,
        };
        for (index, field) in ty.fields().iter().enumerate() {
            if !field.exported {
                continue;
            }
            let Some(names) = field_names(field, config) else {
                continue;
            };
            let field_path = path.child(index);
            let mut registered = false;
            for name in names {
                if table.contains_key(&name) {
                    continue;
                }
                table.insert(name, field_path.clone());
                registered = true;
            }
            if field.embedded && registered {
                queue.push_back((field.ty.clone(), field_path));
            }
        }
    }
    table
}

/// Names for a field, or `None` when the tag hides it
fn field_names(field: &Field, config: &BridgeConfig) -> Option<Vec<String>> {
    match field.tag(&config.tag_key) {
        Some("-") => None,
        Some(tag) if !tag.is_empty() => Some(vec![tag.to_string()]),
        _ => Some(config.names_for(&field.name)),
    }
}

/// Register exported methods into a behavior table
pub(crate) fn behaviors(
    methods: &[Method],
    table: &mut FxHashMap<String, NativeFunction>,
    config: &BridgeConfig,
) {
    for method in methods.iter().filter(|m| m.exported) {
        let func = wrap_func(&method.name, method.func.clone());
        for name in config.names_for(&method.name) {
            table.entry(name).or_insert_with(|| func.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_types::HostFunc;

    fn paths(table: &FxHashMap<String, AccessPath>, name: &str) -> Option<Vec<usize>> {
        table.get(name).map(|p| p.as_slice().to_vec())
    }

    #[test]
    fn test_outer_field_shadows_embedded() {
        let inner = HostType::structure(
            "Inner",
            vec![
                Field::new("Name", HostType::string()),
                Field::new("Depth", HostType::int()),
            ],
        );
        let outer = HostType::structure(
            "Outer",
            vec![
                Field::embedded(inner.clone()),
                Field::new("Name", HostType::string()),
            ],
        );
        let table = fields(&outer, &BridgeConfig::default());
        assert_eq!(paths(&table, "Name"), Some(vec![1]));
        assert_eq!(paths(&table, "name"), Some(vec![1]));
        assert_eq!(paths(&table, "Depth"), Some(vec![0, 1]));
        assert_eq!(paths(&table, "Inner"), Some(vec![0]));
    }

    #[test]
    fn test_breadth_first_across_levels() {
        // Outer { A; B }, A { C }, C { X }, B { X }: B.X is shallower than C.X
        let c = HostType::structure("C", vec![Field::new("X", HostType::int())]);
        let a = HostType::structure("A", vec![Field::embedded(c)]);
        let b = HostType::structure("B", vec![Field::new("X", HostType::int())]);
        let outer = HostType::structure(
            "Outer",
            vec![Field::embedded(a), Field::embedded(HostType::pointer_to(&b))],
        );
        let table = fields(&outer, &BridgeConfig::default());
        assert_eq!(paths(&table, "X"), Some(vec![1, 0]));
    }

    #[test]
    fn test_tags_and_visibility() {
        let ty = HostType::structure(
            "Tagged",
            vec![
                Field::new("Hidden", HostType::int()).with_tag("rivet", "-"),
                Field::new("Renamed", HostType::int()).with_tag("rivet", "alias"),
                Field::new("secret", HostType::int()).private(),
                Field::new("Other", HostType::int()).with_tag("json", "x"),
            ],
        );
        let table = fields(&ty, &BridgeConfig::default());
        assert!(!table.contains_key("Hidden"));
        assert!(!table.contains_key("hidden"));
        assert_eq!(paths(&table, "alias"), Some(vec![1]));
        assert!(!table.contains_key("Renamed"));
        assert!(!table.contains_key("secret"));
        assert_eq!(paths(&table, "other"), Some(vec![3]));

        let custom = BridgeConfig {
            tag_key: "json".to_string(),
            ..BridgeConfig::default()
        };
        let table = fields(&ty, &custom);
        assert_eq!(paths(&table, "x"), Some(vec![3]));
        assert_eq!(paths(&table, "Hidden"), Some(vec![0]));
    }

    #[test]
    fn test_self_embedding_terminates() {
        let node = HostType::declare("Node");
        node.define(
            Shape::Struct(vec![
                Field::embedded(HostType::pointer_to(&node)),
                Field::new("Value", HostType::int()),
            ]),
            Default::default(),
        )
        .unwrap();
        let table = fields(&node, &BridgeConfig::default());
        assert_eq!(paths(&table, "Node"), Some(vec![0]));
        assert_eq!(paths(&table, "Value"), Some(vec![1]));
    }

    #[test]
    fn test_behaviors_first_found_wins() {
        let noop = HostFunc::new(vec![HostType::int()], vec![], |_| Ok(vec![]));
        let methods = vec![
            Method::new("Len", noop.clone()),
            Method::new("Hidden", noop.clone()).private(),
        ];
        let mut table = FxHashMap::default();
        let builtin = NativeFunction::new("len", |_, _| Ok(vec![]));
        table.insert("len".to_string(), builtin.clone());
        behaviors(&methods, &mut table, &BridgeConfig::default());

        assert!(table["len"].same(&builtin));
        assert!(table.contains_key("Len"));
        assert!(!table.contains_key("Hidden"));
    }
}
