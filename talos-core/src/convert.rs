//! 类型转换器
//!
//! 字面量属性值与构造参数在注入前经由转换器变为目标类型的实例。
//! 转换器注册表不做并发共享，工厂持锁访问。

use std::any::TypeId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigValue;
use crate::error::{ContainerError, ContainerResult};
use crate::metadata::{BeanHandle, TypeKey};

/// 类型转换契约（容器消费的窄接口）
pub trait TypeConverter: Send {
    /// 把字符串转换为目标类型的实例句柄
    fn convert(&self, raw: &str, target: &TypeKey) -> ContainerResult<BeanHandle>;

    /// 把已类型化的配置值转换为目标类型
    fn convert_value(&self, value: &ConfigValue, target: &TypeKey) -> ContainerResult<BeanHandle> {
        let rendered = value.render().ok_or_else(|| ContainerError::TypeMismatch {
            expected: target.name.to_string(),
            found: "non-scalar config value".to_string(),
        })?;
        self.convert(&rendered, target)
    }
}

type Parser = Box<dyn Fn(&str) -> ContainerResult<BeanHandle> + Send>;

/// 默认转换器：内建标量解析，按类型扩展
pub struct SimpleTypeConverter {
    parsers: HashMap<TypeId, Parser>,
}

macro_rules! register_parse {
    ($converter:expr, $($ty:ty),+ $(,)?) => {
        $(
            $converter.register::<$ty, _>(|raw| {
                raw.trim().parse::<$ty>().map_err(|e| ContainerError::TypeMismatch {
                    expected: std::any::type_name::<$ty>().to_string(),
                    found: format!("unparsable literal '{}' ({})", raw, e),
                })
            });
        )+
    };
}

impl SimpleTypeConverter {
    pub fn new() -> Self {
        let mut converter = Self {
            parsers: HashMap::new(),
        };

        converter.register::<String, _>(|raw| Ok(raw.to_string()));
        register_parse!(
            converter, bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64
        );
        converter.register::<PathBuf, _>(|raw| Ok(PathBuf::from(raw)));
        converter.register::<Duration, _>(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ContainerError::TypeMismatch {
                    expected: "duration in whole seconds".to_string(),
                    found: format!("'{}'", raw),
                })
        });

        converter
    }

    /// 注册自定义解析器
    pub fn register<T, F>(&mut self, parse: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&str) -> ContainerResult<T> + Send + 'static,
    {
        self.parsers.insert(
            TypeId::of::<T>(),
            Box::new(move |raw| parse(raw).map(|v| Arc::new(v) as BeanHandle)),
        );
    }
}

impl TypeConverter for SimpleTypeConverter {
    fn convert(&self, raw: &str, target: &TypeKey) -> ContainerResult<BeanHandle> {
        let parser = self
            .parsers
            .get(&target.id)
            .ok_or_else(|| ContainerError::TypeMismatch {
                expected: target.name.to_string(),
                found: format!("string literal '{}' with no registered converter", raw),
            })?;
        parser(raw)
    }
}

impl Default for SimpleTypeConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scalar_conversions() {
        let converter = SimpleTypeConverter::new();

        let port = converter.convert("8080", &TypeKey::of::<u16>()).unwrap();
        assert_eq!(*port.downcast::<u16>().unwrap(), 8080);

        let flag = converter.convert("true", &TypeKey::of::<bool>()).unwrap();
        assert!(*flag.downcast::<bool>().unwrap());

        let text = converter.convert("hello", &TypeKey::of::<String>()).unwrap();
        assert_eq!(*text.downcast::<String>().unwrap(), "hello");
    }

    #[test]
    fn unknown_target_type_is_reported() {
        struct Opaque;
        let converter = SimpleTypeConverter::new();
        assert!(matches!(
            converter.convert("x", &TypeKey::of::<Opaque>()),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn custom_parser_registration() {
        #[derive(PartialEq, Debug)]
        struct Port(u16);

        let mut converter = SimpleTypeConverter::new();
        converter.register::<Port, _>(|raw| {
            raw.parse::<u16>().map(Port).map_err(|_| {
                ContainerError::TypeMismatch {
                    expected: "Port".to_string(),
                    found: raw.to_string(),
                }
            })
        });

        let value = converter.convert("9090", &TypeKey::of::<Port>()).unwrap();
        assert_eq!(*value.downcast::<Port>().unwrap(), Port(9090));
    }

    #[test]
    fn config_value_conversion_renders_scalars() {
        let converter = SimpleTypeConverter::new();
        let value = converter
            .convert_value(&ConfigValue::Int(42), &TypeKey::of::<i64>())
            .unwrap();
        assert_eq!(*value.downcast::<i64>().unwrap(), 42);
    }
}
