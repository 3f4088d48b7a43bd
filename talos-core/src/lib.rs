// talos-core: Spring 风格的依赖注入容器核心
//
// 从声明式的 Bean 定义构建对象图，提供：
// - 单例 / 原型 / 自定义作用域
// - 构造函数、工厂方法与属性注入
// - 循环引用的提前暴露处理
// - 生命周期管理（init/destroy 回调、销毁排序）
// - 定义阶段与实例阶段的后置处理器流水线

pub mod alias;
pub mod bean;
pub mod bean_factory;
pub mod config;
pub mod constants;
pub mod context;
pub mod convert;
pub mod error;
pub mod factory_bean;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod resolver;
pub mod scope;
pub mod singleton;
pub mod utils;

// 重新导出常用类型
pub use alias::AliasRegistry;
pub use bean::{
    AutowireMode, BeanDefinition, BeanRole, ConstructorArgumentValue, ConstructorArgumentValues,
    DestroyCallback, InitCallback, MergedBeanDefinition, PropertyValue, PropertyValues, ValueSpec,
};
pub use bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultListableBeanFactory, ListableBeanFactory,
};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PlaceholderResolver,
    PropertySource, StringValueResolver, TomlPropertySource,
};
pub use constants::*;
pub use context::{ApplicationContext, ApplicationContextBuilder, Container, ShutdownHook};
pub use convert::{SimpleTypeConverter, TypeConverter};
pub use error::{ApplicationResult, ContainerError, ContainerResult};
pub use factory_bean::{FactoryBean, FactoryBeanRegistry};
pub use lifecycle::{
    BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor,
    DisposableBean, DisposableBeanAdapter, OrderingPhase, SmartInitializingSingleton,
};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use metadata::{
    arg, AwareContext, BeanClass, BeanHandle, ClassRegistry, ConstructorSpec, MethodSpec,
    ParameterSpec, PropertySpec, TypeKey,
};
pub use resolver::{BeanProvider, DependencyDescriptor, DependencyShape};
pub use scope::{Scope, SCOPE_PROTOTYPE, SCOPE_SINGLETON};
pub use singleton::SingletonRegistry;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{
        AutowireMode, BeanDefinition, ConstructorArgumentValue, ConstructorArgumentValues,
        PropertyValues, ValueSpec,
    };
    pub use crate::bean_factory::{
        BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
        DefaultListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::config::{
        self, ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource,
        PropertySource, TomlPropertySource,
    };
    pub use crate::context::{ApplicationContext, Container};
    pub use crate::error::{ApplicationResult, ContainerError, ContainerResult};
    pub use crate::factory_bean::FactoryBean;
    pub use crate::lifecycle::{
        BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor,
        DisposableBean, SmartInitializingSingleton,
    };
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::metadata::{
        arg, BeanClass, BeanHandle, ConstructorSpec, MethodSpec, ParameterSpec, PropertySpec,
        TypeKey,
    };
    pub use crate::resolver::{BeanProvider, DependencyDescriptor, DependencyShape};
    pub use crate::scope::Scope;
    pub use crate::utils;
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context as AnyhowContext};
}
