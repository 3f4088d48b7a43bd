/// 核心组件常量定义

/// ApplicationContext 相关常量
pub const APPLICATION_CONTEXT_BEAN_NAME: &str = "applicationContext";

/// Environment 相关常量
pub const ENVIRONMENT_BEAN_NAME: &str = "environment";

/// BeanFactory 相关常量
pub const BEAN_FACTORY_BEAN_NAME: &str = "beanFactory";

/// FactoryBean 解引用前缀：`&name` 取工厂对象本身，`name` 取其产品
pub const FACTORY_BEAN_PREFIX: char = '&';

// ==================== 作用域常量 ====================

/// 单例作用域名称
pub const SCOPE_SINGLETON: &str = "singleton";

/// 原型作用域名称
pub const SCOPE_PROTOTYPE: &str = "prototype";

// ==================== 框架配置常量 ====================

/// 环境变量前缀
pub const ENV_PREFIX: &str = "TALOS_";

/// 默认应用名称（当配置文件未指定时使用）
pub const DEFAULT_APP_NAME: &str = "application";

/// 配置键：应用名称
pub const CONFIG_APP_NAME: &str = "talos.app.name";

/// 配置键：激活的profiles
pub const CONFIG_PROFILES_ACTIVE: &str = "talos.profiles.active";

/// 环境变量：激活的profiles
pub const ENV_PROFILES_ACTIVE: &str = "TALOS_PROFILES_ACTIVE";
