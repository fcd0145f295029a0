//! Compiled class/interface/trait/enum declarations, resolved at compile
//! time: trait method tables are flattened into the owning class with
//! `insteadof`/`as` conflicts already settled, so the VM never walks trait
//! use-lists at call time.

use crate::ast::Visibility;
use crate::opcode::{Constant, FunctionRef};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CompiledProperty {
    pub name: String,
    pub visibility: Visibility,
    pub readonly: bool,
    pub is_static: bool,
    /// A simple literal default, folded at compile time; complex defaults
    /// (`new Foo()`, `self::OTHER * 2`) are evaluated on first instantiation
    /// instead and recorded as `None` here.
    pub default: Option<Constant>,
    pub has_runtime_default: bool,
}

#[derive(Debug, Clone)]
pub struct CompiledMethod {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub function: Option<FunctionRef>,
    /// The trait this method was copied from, for error messages and
    /// `insteadof`/`as` bookkeeping; `None` for methods declared directly.
    pub declared_in: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledClass {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub is_final: bool,
    /// Constants are folded in declaration order with a topological pass so
    /// `const B = self::A + 1;` sees `A` already resolved.
    pub constants: Vec<(String, Constant)>,
    pub properties: Vec<CompiledProperty>,
    pub methods: HashMap<String, CompiledMethod>,
}

impl CompiledClass {
    /// Case-insensitive method lookup, as PHP method names are.
    pub fn find_method(&self, name: &str) -> Option<&CompiledMethod> {
        let lower = name.to_ascii_lowercase();
        self.methods.values().find(|m| m.name.to_ascii_lowercase() == lower)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompiledInterface {
    pub name: String,
    pub parents: Vec<String>,
    pub constants: Vec<(String, Constant)>,
    pub method_names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledTrait {
    pub name: String,
    pub properties: Vec<CompiledProperty>,
    pub methods: HashMap<String, CompiledMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBacking {
    None,
    Int,
    String,
}

#[derive(Debug, Clone)]
pub struct CompiledEnumCase {
    pub name: String,
    pub backing_value: Option<Constant>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledEnum {
    pub name: String,
    pub backing: Option<EnumBacking>,
    pub implements: Vec<String>,
    pub cases: Vec<CompiledEnumCase>,
    pub constants: Vec<(String, Constant)>,
    pub methods: HashMap<String, CompiledMethod>,
}

impl Default for EnumBacking {
    fn default() -> Self {
        EnumBacking::None
    }
}

/// Flatten a set of used traits' method/property tables into a class,
/// applying `insteadof` exclusions and `as` aliases before conflict
/// detection. Returns an error describing an unresolved collision — two
/// traits defining the same method with neither `insteadof` nor `as`
/// picking a winner.
pub fn resolve_trait_uses(
    class_name: &str,
    traits: &[CompiledTrait],
    insteadof: &[(String, String, Vec<String>)],
    aliases: &[(Option<String>, String, Option<String>, Option<Visibility>)],
) -> Result<(HashMap<String, CompiledMethod>, Vec<CompiledProperty>), String> {
    let mut methods: HashMap<String, CompiledMethod> = HashMap::new();
    let mut properties = Vec::new();
    let mut winners: HashMap<String, String> = HashMap::new();

    for (method, trait_name, _excluded) in insteadof {
        winners.insert(method.to_ascii_lowercase(), trait_name.clone());
    }

    for t in traits {
        for prop in &t.properties {
            if !properties.iter().any(|p: &CompiledProperty| p.name == prop.name) {
                properties.push(prop.clone());
            }
        }
        for (mname, method) in &t.methods {
            let key = mname.to_ascii_lowercase();
            let excluded_here = insteadof
                .iter()
                .any(|(m, winner, losers)| m.to_ascii_lowercase() == key && losers.contains(&t.name) && winner != &t.name);
            if excluded_here {
                continue;
            }
            if let Some(existing) = methods.get(&key) {
                let decided = winners.get(&key);
                match decided {
                    Some(winner) if winner == &t.name => {
                        methods.insert(key.clone(), method.clone());
                    }
                    Some(_) => {}
                    None if existing.declared_in.as_deref() != Some(t.name.as_str()) => {
                        return Err(format!(
                            "{class_name}: trait method conflict for {mname}, use insteadof to resolve"
                        ));
                    }
                    None => {}
                }
            } else {
                methods.insert(key, method.clone());
            }
        }
    }

    for (trait_name, method, alias, visibility) in aliases {
        let source_trait = trait_name
            .clone()
            .or_else(|| traits.iter().find(|t| t.methods.contains_key(method)).map(|t| t.name.clone()));
        let Some(source_trait) = source_trait else {
            return Err(format!("{class_name}: alias refers to unknown method {method}"));
        };
        let Some(source) = traits.iter().find(|t| t.name == source_trait) else {
            return Err(format!("{class_name}: alias refers to unused trait {source_trait}"));
        };
        let Some(base) = source.methods.get(method) else {
            return Err(format!("{class_name}: trait {source_trait} has no method {method}"));
        };
        let mut aliased = base.clone();
        if let Some(vis) = visibility {
            aliased.visibility = *vis;
        }
        let new_name = alias.clone().unwrap_or_else(|| method.clone());
        aliased.name = new_name.clone();
        methods.insert(new_name.to_ascii_lowercase(), aliased);
    }

    Ok((methods, properties))
}
