//! 配置环境与字符串值解析
//!
//! Environment 聚合多个按优先级排序的配置源，为容器提供统一的配置访问。
//! `${key}` 占位符解析通过 `StringValueResolver` 接口接入 Bean 工厂，
//! 用于字面量属性值与别名的改写。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use parking_lot::RwLock;

use crate::error::{ContainerError, ContainerResult};

/// 配置值类型
#[derive(Debug, Clone)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 渲染为占位符替换所用的文本
    pub fn render(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Int(i) => Some(i.to_string()),
            ConfigValue::Float(f) => Some(f.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// 转换为浮点数
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 获取所有配置键
    fn keys(&self) -> Vec<String>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// Environment - 配置管理器
///
/// 提供统一的配置访问接口，配置源按优先级查找
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,

    /// 当前激活的 profile
    active_profiles: RwLock<Vec<String>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("active_profiles", &*self.active_profiles.read())
            .field("sources_count", &self.sources.read().len())
            .finish()
    }
}

impl Environment {
    /// 创建新的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            active_profiles: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        sources.push(source);
        // 按优先级降序排序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        None
    }

    /// 获取字符串配置
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.render())
    }

    /// 获取字符串配置（带默认值）
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// 获取整数配置
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 设置激活的 profile
    pub fn set_active_profiles(&self, profiles: Vec<String>) {
        *self.active_profiles.write() = profiles;
    }

    /// 获取激活的 profile
    pub fn get_active_profiles(&self) -> Vec<String> {
        self.active_profiles.read().clone()
    }

    /// 检查是否包含指定的 profile
    pub fn accepts_profile(&self, profile: &str) -> bool {
        self.active_profiles.read().iter().any(|p| p == profile)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 字符串值解析 ==========

/// 字符串值解析器
///
/// 容器消费的窄接口：字面量属性值、别名在使用前都经过已注册的解析器链。
pub trait StringValueResolver: Send + Sync {
    /// 解析字符串中的占位符等内容，返回最终文本
    fn resolve(&self, value: &str) -> ContainerResult<String>;
}

/// 占位符嵌套解析的最大轮数
const MAX_PLACEHOLDER_DEPTH: usize = 8;

/// 基于 Environment 的 `${key}` / `${key:default}` 占位符解析器
pub struct PlaceholderResolver {
    environment: std::sync::Arc<Environment>,
}

impl PlaceholderResolver {
    pub fn new(environment: std::sync::Arc<Environment>) -> Self {
        Self { environment }
    }

    fn resolve_once(&self, value: &str) -> ContainerResult<(String, bool)> {
        let mut result = String::with_capacity(value.len());
        let mut rest = value;
        let mut replaced = false;

        while let Some(start) = rest.find("${") {
            let Some(end_rel) = rest[start + 2..].find('}') else {
                // 不完整的占位符原样保留
                break;
            };
            let end = start + 2 + end_rel;
            result.push_str(&rest[..start]);

            let placeholder = &rest[start + 2..end];
            let (key, default) = match placeholder.split_once(':') {
                Some((k, d)) => (k, Some(d)),
                None => (placeholder, None),
            };

            match self.environment.get_string(key) {
                Some(v) => result.push_str(&v),
                None => match default {
                    Some(d) => result.push_str(d),
                    None => {
                        return Err(ContainerError::DefinitionStore {
                            name: None,
                            message: format!(
                                "Could not resolve placeholder '{}' in value '{}'",
                                key, value
                            ),
                        });
                    }
                },
            }

            replaced = true;
            rest = &rest[end + 1..];
        }

        result.push_str(rest);
        Ok((result, replaced))
    }
}

impl StringValueResolver for PlaceholderResolver {
    fn resolve(&self, value: &str) -> ContainerResult<String> {
        let mut current = value.to_string();
        for _ in 0..MAX_PLACEHOLDER_DEPTH {
            let (next, replaced) = self.resolve_once(&current)?;
            current = next;
            if !replaced {
                return Ok(current);
            }
        }
        Ok(current)
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 将环境变量名转换为配置键
    /// 例如: APP_DATABASE_URL -> database.url
    fn env_to_key(&self, env_key: &str) -> String {
        let stripped = env_key.strip_prefix(&self.prefix).unwrap_or(env_key);
        stripped.to_lowercase().replace('_', ".")
    }

    /// 将配置键转换为环境变量名
    /// 例如: database.url -> APP_DATABASE_URL
    fn key_to_env(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace('.', "_").to_uppercase())
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn keys(&self) -> Vec<String> {
        std::env::vars()
            .filter(|(k, _)| k.starts_with(&self.prefix))
            .map(|(k, _)| self.env_to_key(&k))
            .collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 文件配置源
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ContainerError::DefinitionStore {
            name: None,
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        Self::from_str(&content, path.to_string_lossy().to_string())
    }

    /// 从字符串解析 TOML 配置
    pub fn from_str(content: &str, name: String) -> ContainerResult<Self> {
        let value: toml::Value =
            toml::from_str(content).map_err(|e| ContainerError::DefinitionStore {
                name: None,
                message: format!("Failed to parse TOML '{}': {}", name, e),
            })?;

        let mut properties = HashMap::new();
        Self::flatten(&value, String::new(), &mut properties);

        Ok(Self {
            name,
            properties,
            priority: 0, // 文件配置优先级最低
        })
    }

    /// 展平 TOML 结构
    /// 例如: { database: { url: "xxx" } } -> { "database.url": "xxx" }
    fn flatten(value: &toml::Value, prefix: String, result: &mut HashMap<String, ConfigValue>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    Self::flatten(val, new_prefix, result);
                }
            }
            other => {
                result.insert(prefix, Self::convert(other));
            }
        }
    }

    fn convert(value: &toml::Value) -> ConfigValue {
        match value {
            toml::Value::String(s) => ConfigValue::String(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Float(f) => ConfigValue::Float(*f),
            toml::Value::Boolean(b) => ConfigValue::Bool(*b),
            toml::Value::Array(arr) => {
                ConfigValue::Array(arr.iter().map(Self::convert).collect())
            }
            toml::Value::Table(table) => {
                let mut map = HashMap::new();
                for (k, v) in table {
                    map.insert(k.clone(), Self::convert(v));
                }
                ConfigValue::Object(map)
            }
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn env_with(pairs: &[(&str, &str)]) -> Arc<Environment> {
        let env = Environment::new();
        let mut source = MapPropertySource::new("test");
        for (k, v) in pairs {
            source = source.with_property(*k, ConfigValue::String(v.to_string()));
        }
        env.add_property_source(Box::new(source));
        Arc::new(env)
    }

    #[test]
    fn higher_priority_source_wins() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("low")
                .with_property("app.name", ConfigValue::String("low".into()))
                .with_priority(0),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("high")
                .with_property("app.name", ConfigValue::String("high".into()))
                .with_priority(100),
        ));
        assert_eq!(env.get_string("app.name").as_deref(), Some("high"));
    }

    #[test]
    fn placeholder_resolution() {
        let env = env_with(&[("db.host", "localhost"), ("db.port", "5432")]);
        let resolver = PlaceholderResolver::new(env);

        assert_eq!(
            resolver.resolve("postgres://${db.host}:${db.port}/app").unwrap(),
            "postgres://localhost:5432/app"
        );
        assert_eq!(resolver.resolve("plain text").unwrap(), "plain text");
    }

    #[test]
    fn placeholder_default_value() {
        let env = env_with(&[]);
        let resolver = PlaceholderResolver::new(env);

        assert_eq!(resolver.resolve("${missing:fallback}").unwrap(), "fallback");
        assert!(resolver.resolve("${missing}").is_err());
    }

    #[test]
    fn toml_source_flattens_tables() {
        let source =
            TomlPropertySource::from_str("[database]\nurl = \"sqlite://mem\"\npool = 4\n", "t".into())
                .unwrap();
        assert_eq!(source.get("database.url").unwrap().as_str(), Some("sqlite://mem"));
        assert_eq!(source.get("database.pool").unwrap().as_i64(), Some(4));
    }
}
