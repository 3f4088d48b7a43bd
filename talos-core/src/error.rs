//! 容器统一错误类型
//!
//! 所有容器操作都返回 `ContainerResult`，错误按照失败种类划分变体。
//! 创建失败会携带同一次单例创建过程中被压制的同伴错误（上限 100 条）。

use thiserror::Error;

/// 同一次创建过程中记录的被压制错误的上限
pub const SUPPRESSED_EXCEPTIONS_LIMIT: usize = 100;

/// 容器错误
#[derive(Error, Debug)]
pub enum ContainerError {
    /// 按名称或类型查找不到任何 Bean
    #[error("No such bean: {name}")]
    NoSuchBean { name: String },

    /// 要求唯一匹配但找到多个候选且无法裁决
    #[error("No unique bean of type '{type_name}': {} candidates {:?}", candidates.len(), candidates)]
    NoUniqueBean {
        type_name: String,
        candidates: Vec<String>,
    },

    /// 检测到无法通过提前暴露化解的循环引用
    #[error("Bean '{name}' is currently in creation: {detail}")]
    CurrentlyInCreation { name: String, detail: String },

    /// 构造、属性填充或初始化过程中用户代码抛出的任何错误
    #[error("Failed to create bean '{name}': {message}")]
    CreationFailed {
        name: String,
        message: String,
        /// 同一次单例创建尝试中发生的同伴失败（最多 100 条）
        related: Vec<ContainerError>,
    },

    /// 依赖检查开启时属性未被赋值，或必需注入点无法满足
    #[error("Unsatisfied dependency for bean '{name}' at {injection_point}: {detail}")]
    UnsatisfiedDependency {
        name: String,
        injection_point: String,
        detail: String,
    },

    /// 非法的 Bean 定义：父定义不可解析、方法缺失、类未注册等
    #[error("Invalid bean definition{}: {message}", name.as_deref().map(|n| format!(" '{}'", n)).unwrap_or_default())]
    DefinitionStore {
        name: Option<String>,
        message: String,
    },

    /// 容器销毁期间到达的查找请求
    #[error("Singleton bean '{name}' is not allowed for creation: registry is in destruction")]
    CreationNotAllowed { name: String },

    /// 实例类型与期望类型不符
    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ContainerError {
    /// 便捷构造：Bean 定义存储错误
    pub fn definition(name: impl Into<String>, message: impl Into<String>) -> Self {
        ContainerError::DefinitionStore {
            name: Some(name.into()),
            message: message.into(),
        }
    }

    /// 便捷构造：创建失败（无同伴错误）
    pub fn creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        ContainerError::CreationFailed {
            name: name.into(),
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// 将同伴错误附加到创建失败上，遵守 100 条上限
    pub fn with_related(mut self, peers: Vec<ContainerError>) -> Self {
        if let ContainerError::CreationFailed { related, .. } = &mut self {
            for peer in peers {
                if related.len() >= SUPPRESSED_EXCEPTIONS_LIMIT {
                    break;
                }
                related.push(peer);
            }
        }
        self
    }
}

/// 容器操作的统一结果类型
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 应用层结果类型
///
/// 框架内部使用 `ContainerResult`，应用编排层（启动、关闭钩子）使用
/// `anyhow::Result`，通过 `.context()` 补充上下文信息。
pub type ApplicationResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn related_causes_are_capped() {
        let peers: Vec<ContainerError> = (0..150)
            .map(|i| ContainerError::creation(format!("peer{}", i), "boom"))
            .collect();
        let err = ContainerError::creation("subject", "outer failure").with_related(peers);
        match err {
            ContainerError::CreationFailed { related, .. } => {
                assert_eq!(related.len(), SUPPRESSED_EXCEPTIONS_LIMIT);
            }
            other => panic!("unexpected error kind: {}", other),
        }
    }

    #[test]
    fn definition_error_names_the_bean() {
        let err = ContainerError::definition("userService", "unknown class");
        assert!(err.to_string().contains("userService"));
        assert!(err.to_string().contains("unknown class"));
    }
}
