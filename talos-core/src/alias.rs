//! 别名注册表
//!
//! 维护别名到规范名的映射，拒绝成环的别名链。

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::config::StringValueResolver;
use crate::error::{ContainerError, ContainerResult};

/// 别名注册表
pub struct AliasRegistry {
    /// 别名 -> 目标名（目标可能仍是别名）
    aliases: RwLock<IndexMap<String, String>>,

    /// 是否允许覆盖已有的别名注册
    allow_override: RwLock<bool>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self {
            aliases: RwLock::new(IndexMap::new()),
            allow_override: RwLock::new(true),
        }
    }

    /// 设置是否允许别名覆盖
    pub fn set_allow_override(&self, allow: bool) {
        *self.allow_override.write() = allow;
    }

    /// 注册别名
    ///
    /// 别名与目标同名时视为移除该别名；重复注册同一映射是幂等的；
    /// 会形成环的别名链被拒绝。
    pub fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        if name.is_empty() || alias.is_empty() {
            return Err(ContainerError::DefinitionStore {
                name: None,
                message: "Alias and target name must not be empty".to_string(),
            });
        }

        let mut aliases = self.aliases.write();

        if alias == name {
            if aliases.shift_remove(alias).is_some() {
                tracing::debug!("Alias '{}' removed: points to same name", alias);
            }
            return Ok(());
        }

        if let Some(registered) = aliases.get(alias) {
            if registered == name {
                // 重复注册，无事可做
                return Ok(());
            }
            if !*self.allow_override.read() {
                return Err(ContainerError::DefinitionStore {
                    name: None,
                    message: format!(
                        "Cannot define alias '{}' for name '{}': it is already registered for name '{}'",
                        alias, name, registered
                    ),
                });
            }
            tracing::debug!(
                "Overriding alias '{}': '{}' replaced by '{}'",
                alias,
                registered,
                name
            );
        }

        // 沿 name 的别名链检查是否会形成环
        if Self::has_alias_locked(&aliases, alias, name) {
            return Err(ContainerError::DefinitionStore {
                name: None,
                message: format!(
                    "Cannot register alias '{}' for name '{}': circular reference - '{}' is a direct or indirect alias for '{}' already",
                    alias, name, name, alias
                ),
            });
        }

        aliases.insert(alias.to_string(), name.to_string());
        tracing::trace!("Alias '{}' registered for name '{}'", alias, name);
        Ok(())
    }

    /// name 是否（直接或间接）是 alias 的别名
    fn has_alias_locked(aliases: &IndexMap<String, String>, name: &str, alias: &str) -> bool {
        for (registered_alias, registered_name) in aliases.iter() {
            if registered_name == name {
                if registered_alias == alias {
                    return true;
                }
                if Self::has_alias_locked(aliases, registered_alias, alias) {
                    return true;
                }
            }
        }
        false
    }

    /// 移除别名
    pub fn remove_alias(&self, alias: &str) -> ContainerResult<()> {
        self.aliases
            .write()
            .shift_remove(alias)
            .map(|_| ())
            .ok_or_else(|| ContainerError::NoSuchBean {
                name: alias.to_string(),
            })
    }

    /// 指定名称是否已注册为别名
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.read().contains_key(name)
    }

    /// 获取指向指定名称的全部别名（含间接）
    pub fn get_aliases(&self, name: &str) -> Vec<String> {
        let aliases = self.aliases.read();
        let mut result = Vec::new();
        Self::collect_aliases_locked(&aliases, name, &mut result);
        result
    }

    fn collect_aliases_locked(
        aliases: &IndexMap<String, String>,
        name: &str,
        result: &mut Vec<String>,
    ) {
        for (alias, target) in aliases.iter() {
            if target == name {
                result.push(alias.clone());
                Self::collect_aliases_locked(aliases, alias, result);
            }
        }
    }

    /// 沿别名链解析到规范名
    pub fn canonical_name(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut canonical = name;
        while let Some(target) = aliases.get(canonical) {
            canonical = target;
        }
        canonical.to_string()
    }

    /// 用字符串解析器改写全部别名与目标
    ///
    /// 解析产生冲突时保留既有注册并记录告警。
    pub fn resolve_aliases(&self, resolver: &dyn StringValueResolver) -> ContainerResult<()> {
        let mut aliases = self.aliases.write();
        let snapshot: Vec<(String, String)> = aliases
            .iter()
            .map(|(a, n)| (a.clone(), n.clone()))
            .collect();

        for (alias, name) in snapshot {
            let resolved_alias = resolver.resolve(&alias)?;
            let resolved_name = resolver.resolve(&name)?;

            if resolved_alias == alias && resolved_name == name {
                continue;
            }

            if resolved_alias == resolved_name {
                aliases.shift_remove(&alias);
                tracing::debug!(
                    "Alias '{}' removed: resolved to the same name '{}'",
                    alias,
                    resolved_name
                );
                continue;
            }

            if let Some(existing) = aliases.get(&resolved_alias) {
                if existing != &resolved_name {
                    // 确定性规则：先到者胜
                    tracing::warn!(
                        "Alias resolution collision: '{}' already maps to '{}', dropping mapping to '{}'",
                        resolved_alias,
                        existing,
                        resolved_name
                    );
                    aliases.shift_remove(&alias);
                    continue;
                }
            }

            aliases.shift_remove(&alias);
            aliases.insert(resolved_alias, resolved_name);
        }
        Ok(())
    }
}

impl Default for AliasRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Suffixer;

    impl StringValueResolver for Suffixer {
        fn resolve(&self, value: &str) -> ContainerResult<String> {
            Ok(value.replace("${env}", "prod"))
        }
    }

    #[test]
    fn canonical_name_follows_chain() {
        let registry = AliasRegistry::new();
        registry.register_alias("serviceA", "aliasOne").unwrap();
        registry.register_alias("aliasOne", "aliasTwo").unwrap();

        assert_eq!(registry.canonical_name("aliasTwo"), "serviceA");
        assert_eq!(registry.canonical_name("aliasOne"), "serviceA");
        assert_eq!(registry.canonical_name("serviceA"), "serviceA");
    }

    #[test]
    fn reregistration_is_idempotent() {
        let registry = AliasRegistry::new();
        registry.register_alias("serviceA", "a").unwrap();
        registry.register_alias("serviceA", "a").unwrap();
        assert_eq!(registry.canonical_name("a"), "serviceA");
        assert_eq!(registry.get_aliases("serviceA"), vec!["a".to_string()]);
    }

    #[test]
    fn circular_alias_chain_rejected() {
        let registry = AliasRegistry::new();
        registry.register_alias("a", "b").unwrap();
        registry.register_alias("b", "c").unwrap();

        let result = registry.register_alias("c", "a");
        assert!(result.is_err());
    }

    #[test]
    fn override_disabled_rejects_conflicting_alias() {
        let registry = AliasRegistry::new();
        registry.set_allow_override(false);
        registry.register_alias("serviceA", "shared").unwrap();

        assert!(registry.register_alias("serviceB", "shared").is_err());
        // 同一映射仍然幂等
        registry.register_alias("serviceA", "shared").unwrap();
    }

    #[test]
    fn transitive_aliases_collected() {
        let registry = AliasRegistry::new();
        registry.register_alias("svc", "first").unwrap();
        registry.register_alias("first", "second").unwrap();

        let aliases = registry.get_aliases("svc");
        assert!(aliases.contains(&"first".to_string()));
        assert!(aliases.contains(&"second".to_string()));
    }

    #[test]
    fn resolve_aliases_rewrites_both_sides() {
        let registry = AliasRegistry::new();
        registry.register_alias("service-${env}", "alias-${env}").unwrap();
        registry.resolve_aliases(&Suffixer).unwrap();

        assert_eq!(registry.canonical_name("alias-prod"), "service-prod");
        assert!(!registry.is_alias("alias-${env}"));
    }
}
