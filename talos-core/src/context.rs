//! 应用上下文 - 刷新驱动
//!
//! ApplicationContext 持有 BeanFactory 与 Environment，编排一次完整的
//! 容器刷新：定义阶段处理器 → 实例阶段处理器注册 → 冻结配置 →
//! 预实例化非延迟单例 → 就绪。关闭时先执行 shutdown hooks 再销毁单例。

use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::BeanDefinition;
use crate::bean_factory::{
    BeanFactory, BeanFactoryExt, ConfigurableBeanFactory, ConfigurableListableBeanFactory,
    DefaultListableBeanFactory, ListableBeanFactory,
};
use crate::config::{Environment, PlaceholderResolver, PropertySource};
use crate::constants;
use crate::error::{ContainerError, ContainerResult};
use crate::lifecycle::{BeanDefinitionRegistryPostProcessor, BeanFactoryPostProcessor, BeanPostProcessor};
use crate::metadata::{BeanClass, BeanHandle, TypeKey};

/// Shutdown hook类型
pub type ShutdownHook = Box<dyn Fn() -> ContainerResult<()> + Send + Sync>;

/// 容器 trait - 定义依赖注入容器的核心接口
pub trait Container: Send + Sync {
    /// 注册 Bean 定义
    fn register(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()>;

    /// 通过名称获取 Bean
    fn get_bean(&self, name: &str) -> ContainerResult<BeanHandle>;

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;

    /// 获取所有 Bean 定义的名称
    fn get_bean_names(&self) -> Vec<String>;
}

/// 应用上下文 - Container 的默认实现
///
/// 持有 BeanFactory（Bean 的创建与管理）与 Environment（配置访问）
pub struct ApplicationContext {
    /// Bean 工厂
    bean_factory: Arc<DefaultListableBeanFactory>,

    /// 配置环境
    environment: Arc<Environment>,

    /// Shutdown hooks
    shutdown_hooks: RwLock<Vec<ShutdownHook>>,

    /// 应用名称
    app_name: RwLock<Option<String>>,

    /// 程序注册的 Bean 工厂后置处理器
    bean_factory_post_processors: RwLock<Vec<Arc<dyn BeanFactoryPostProcessor>>>,

    /// 程序注册的定义注册表后置处理器
    registry_post_processors: RwLock<Vec<Arc<dyn BeanDefinitionRegistryPostProcessor>>>,

    /// 核心单例是否已自注册
    core_registered: AtomicBool,
}

impl ApplicationContext {
    /// 创建新的应用上下文
    pub fn new() -> Arc<Self> {
        Self::with_environment(Arc::new(Environment::new()))
    }

    /// 以现有 Environment 创建应用上下文
    pub fn with_environment(environment: Arc<Environment>) -> Arc<Self> {
        Arc::new(Self {
            bean_factory: DefaultListableBeanFactory::new(),
            environment,
            shutdown_hooks: RwLock::new(Vec::new()),
            app_name: RwLock::new(None),
            bean_factory_post_processors: RwLock::new(Vec::new()),
            registry_post_processors: RwLock::new(Vec::new()),
            core_registered: AtomicBool::new(false),
        })
    }

    /// 构建器模式创建上下文
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    /// 获取内部的 BeanFactory
    pub fn get_bean_factory(&self) -> &Arc<DefaultListableBeanFactory> {
        &self.bean_factory
    }

    /// 获取 Environment
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 设置应用名称
    pub fn set_app_name(&self, name: String) {
        *self.app_name.write() = Some(name);
    }

    /// 获取应用名称
    pub fn get_app_name(&self) -> Option<String> {
        self.app_name.read().clone()
    }

    /// 注册 shutdown hook
    ///
    /// Shutdown hook 会在应用关闭时按注册顺序执行
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> ContainerResult<()> + Send + Sync + 'static,
    {
        let mut hooks = self.shutdown_hooks.write();
        hooks.push(Box::new(hook));
        tracing::debug!("Registered shutdown hook, total: {}", hooks.len());
    }

    /// 注册 BeanPostProcessor
    pub fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        self.bean_factory.add_bean_post_processor(processor);
    }

    /// 注册 BeanFactoryPostProcessor
    ///
    /// 在定义加载后、Bean 实例化之前执行，只应修改既有定义
    pub fn add_bean_factory_post_processor(&self, processor: Arc<dyn BeanFactoryPostProcessor>) {
        self.bean_factory_post_processors.write().push(processor);
    }

    /// 注册 BeanDefinitionRegistryPostProcessor
    ///
    /// 可以向注册表追加新定义，先于普通工厂处理器执行
    pub fn add_registry_post_processor(
        &self,
        processor: Arc<dyn BeanDefinitionRegistryPostProcessor>,
    ) {
        self.registry_post_processors.write().push(processor);
    }

    /// 注册类型记录的便捷入口
    pub fn register_class(&self, class: BeanClass) {
        self.bean_factory.register_class(class);
    }

    // ==================== 刷新 ====================

    /// 刷新上下文
    ///
    /// 1. 复位销毁闩锁，安装占位符解析器，自注册核心单例；
    /// 2. 定义注册表处理器迭代到不动点，然后是普通工厂处理器；
    /// 3. 预检全部 depends_on 声明（目标存在、链不成环）；
    /// 4. 从定义中发现并注册实例阶段处理器；
    /// 5. 冻结配置并预实例化非延迟单例；
    /// 6. 失败时销毁已创建的单例再向外传播。
    pub fn refresh(self: &Arc<Self>) -> ContainerResult<()> {
        tracing::info!("Refreshing application context");
        let factory = &self.bean_factory;

        factory.prepare_refresh();
        self.register_core_singletons()?;
        if !factory.has_embedded_value_resolver() {
            factory.add_embedded_value_resolver(Arc::new(PlaceholderResolver::new(
                self.environment.clone(),
            )));
        }

        self.invoke_bean_factory_post_processors()?;
        // 定义阶段处理器跑完之后定义才算定型，此时预检 depends_on
        self.validate_dependencies()?;
        self.register_bean_post_processors()?;

        factory.freeze_configuration();

        if let Err(e) = factory.pre_instantiate_singletons() {
            tracing::error!("Eager singleton pre-instantiation failed: {}", e);
            // 部分创建的单例在错误浮出之前销毁
            factory.destroy_singletons();
            return Err(e);
        }

        tracing::info!(
            "Application context refreshed, {} singleton(s) ready",
            factory.get_singleton_count()
        );
        Ok(())
    }

    /// 上下文、Environment 与 BeanFactory 以周知名称自注册
    ///
    /// 销毁后的再次刷新会重新注册
    fn register_core_singletons(self: &Arc<Self>) -> ContainerResult<()> {
        if self.core_registered.swap(true, Ordering::SeqCst)
            && self
                .bean_factory
                .contains_singleton(constants::APPLICATION_CONTEXT_BEAN_NAME)
        {
            return Ok(());
        }
        let factory = &self.bean_factory;

        factory.register_singleton(
            constants::APPLICATION_CONTEXT_BEAN_NAME,
            Arc::new(self.clone()) as BeanHandle,
        )?;
        factory.register_singleton(
            constants::ENVIRONMENT_BEAN_NAME,
            Arc::new(self.environment.clone()) as BeanHandle,
        )?;
        factory.register_singleton(
            constants::BEAN_FACTORY_BEAN_NAME,
            Arc::new(factory.clone()) as BeanHandle,
        )?;

        factory.register_resolvable_dependency(
            TypeKey::of::<Arc<ApplicationContext>>(),
            Arc::new(self.clone()) as BeanHandle,
        );
        factory.register_resolvable_dependency(
            TypeKey::of::<Arc<Environment>>(),
            Arc::new(self.environment.clone()) as BeanHandle,
        );
        factory.register_resolvable_dependency(
            TypeKey::of::<Arc<DefaultListableBeanFactory>>(),
            Arc::new(factory.clone()) as BeanHandle,
        );

        tracing::debug!("Framework core singletons registered");
        Ok(())
    }

    /// 定义名中筛出声明了某能力的集合
    fn capability_definition_names(
        &self,
        has_capability: impl Fn(&BeanClass) -> bool,
    ) -> Vec<String> {
        let factory = &self.bean_factory;
        factory
            .get_bean_definition_names()
            .into_iter()
            .filter(|name| {
                factory
                    .get_merged_local_definition(name)
                    .ok()
                    .and_then(|mbd| factory.resolve_bean_class(&mbd, name).ok().flatten())
                    .map(|class| has_capability(&class))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// 调用定义阶段处理器
    ///
    /// 注册表处理器（可追加定义）迭代到不再出现新处理器，
    /// 之后统一执行 bean-factory 阶段（只改既有定义）。
    fn invoke_bean_factory_post_processors(self: &Arc<Self>) -> ContainerResult<()> {
        let factory = &self.bean_factory;

        // 程序注册的注册表处理器先行
        let mut registry_processors: Vec<Arc<dyn BeanDefinitionRegistryPostProcessor>> =
            self.registry_post_processors.read().clone();
        registry_processors.sort_by_key(|p| (p.phase(), p.order()));
        for processor in &registry_processors {
            tracing::debug!("Invoking registry post processor '{}'", processor.name());
            processor.post_process_definition_registry(factory)?;
        }

        // 定义派生的注册表处理器：迭代到不动点
        let mut invoked: HashSet<String> = HashSet::new();
        let mut definition_registry_processors: Vec<Arc<dyn BeanDefinitionRegistryPostProcessor>> =
            Vec::new();
        loop {
            let fresh: Vec<String> = self
                .capability_definition_names(|class| class.registry_post_processor.is_some())
                .into_iter()
                .filter(|name| !invoked.contains(name))
                .collect();
            if fresh.is_empty() {
                break;
            }

            let mut batch: Vec<Arc<dyn BeanDefinitionRegistryPostProcessor>> = Vec::new();
            for name in fresh {
                invoked.insert(name.clone());
                let instance = factory.get_bean(&name)?;
                let mbd = factory.get_merged_local_definition(&name)?;
                let Some(class) = factory.resolve_bean_class(&mbd, &name)? else {
                    continue;
                };
                let Some(caster) = &class.registry_post_processor else {
                    continue;
                };
                match caster(&instance) {
                    Some(processor) => batch.push(processor),
                    None => tracing::warn!(
                        "Bean '{}' declares the registry post processor capability but the cast failed",
                        name
                    ),
                }
            }
            batch.sort_by_key(|p| (p.phase(), p.order()));
            for processor in &batch {
                tracing::debug!("Invoking registry post processor '{}'", processor.name());
                processor.post_process_definition_registry(factory)?;
            }
            definition_registry_processors.extend(batch);
        }

        // 注册表处理器的 bean-factory 阶段
        for processor in registry_processors
            .iter()
            .chain(definition_registry_processors.iter())
        {
            processor.post_process_bean_factory(factory)?;
        }

        // 普通工厂处理器：程序注册的 + 定义派生的
        let mut factory_processors: Vec<Arc<dyn BeanFactoryPostProcessor>> =
            self.bean_factory_post_processors.read().clone();
        for name in self.capability_definition_names(|class| {
            class.factory_post_processor.is_some() && class.registry_post_processor.is_none()
        }) {
            let instance = factory.get_bean(&name)?;
            let mbd = factory.get_merged_local_definition(&name)?;
            let Some(class) = factory.resolve_bean_class(&mbd, &name)? else {
                continue;
            };
            let Some(caster) = &class.factory_post_processor else {
                continue;
            };
            match caster(&instance) {
                Some(processor) => factory_processors.push(processor),
                None => tracing::warn!(
                    "Bean '{}' declares the factory post processor capability but the cast failed",
                    name
                ),
            }
        }
        factory_processors.sort_by_key(|p| (p.phase(), p.order()));

        if !factory_processors.is_empty() {
            tracing::info!(
                "Invoking {} bean factory post processor(s)",
                factory_processors.len()
            );
        }
        for processor in &factory_processors {
            processor.post_process_bean_factory(factory).map_err(|e| {
                ContainerError::creation(
                    processor.name(),
                    format!("BeanFactoryPostProcessor failed: {}", e),
                )
            })?;
        }
        Ok(())
    }

    /// 从定义中发现并注册实例阶段处理器
    ///
    /// 注册完成前创建的 Bean 会错过后注册的处理器，创建路径据此
    /// 发出「不参与完整流水线」的提示。
    fn register_bean_post_processors(self: &Arc<Self>) -> ContainerResult<()> {
        let factory = &self.bean_factory;
        let names = self.capability_definition_names(|class| class.post_processor.is_some());

        // 预告最终处理器数量，晚创建检查据此比较
        let target = factory.get_bean_post_processor_count() + names.len();
        factory.set_post_processor_target(target);

        if names.is_empty() {
            return Ok(());
        }
        tracing::info!("Registering {} bean post processor(s) from definitions", names.len());

        let mut processors: Vec<Arc<dyn BeanPostProcessor>> = Vec::new();
        for name in names {
            let instance = factory.get_bean(&name)?;
            let mbd = factory.get_merged_local_definition(&name)?;
            let Some(class) = factory.resolve_bean_class(&mbd, &name)? else {
                continue;
            };
            let Some(caster) = &class.post_processor else {
                continue;
            };
            match caster(&instance) {
                Some(processor) => processors.push(processor),
                None => tracing::warn!(
                    "Bean '{}' declares the post processor capability but the cast failed",
                    name
                ),
            }
        }
        for processor in processors {
            factory.add_bean_post_processor(processor);
        }
        Ok(())
    }

    /// 预检所有 Bean 的显式 depends_on 声明
    ///
    /// 每个目标必须在容器中可见（本地定义、已注册单例或父工厂），
    /// 且图内不存在环。`refresh()` 在预实例化之前自动调用。
    pub fn validate_dependencies(&self) -> ContainerResult<()> {
        use crate::utils::dependency::find_depends_on_cycle;
        use std::collections::HashMap;

        let factory = &self.bean_factory;
        let mut graph: HashMap<String, Vec<String>> = HashMap::new();
        for name in factory.get_bean_definition_names() {
            let deps: Vec<String> = factory
                .get_merged_local_definition(&name)
                .map(|m| {
                    m.definition
                        .depends_on
                        .iter()
                        .map(|dep| factory.canonical_name(dep))
                        .collect()
                })
                .unwrap_or_default();
            graph.insert(name, deps);
        }

        for (bean, deps) in &graph {
            for dep in deps {
                if !graph.contains_key(dep) && !factory.contains_bean(dep) {
                    return Err(ContainerError::definition(
                        bean,
                        format!("Declared depends-on target '{}' is not registered", dep),
                    ));
                }
            }
        }

        if let Some(chain) = find_depends_on_cycle(&graph) {
            return Err(ContainerError::DefinitionStore {
                name: None,
                message: format!("Circular depends-on chain: {}", chain.join(" -> ")),
            });
        }

        tracing::debug!(
            "Depends-on validation passed for {} definition(s)",
            graph.len()
        );
        Ok(())
    }

    /// 关闭上下文：执行 shutdown hooks，销毁所有单例
    ///
    /// 单个 hook 或 Bean 的失败只记录日志，不阻断其余清理
    pub fn shutdown(&self) -> ContainerResult<()> {
        tracing::info!("Starting application shutdown");

        let hooks = self.shutdown_hooks.read();
        tracing::info!("Executing {} shutdown hook(s)", hooks.len());
        for (idx, hook) in hooks.iter().enumerate() {
            match hook() {
                Ok(_) => tracing::debug!("Shutdown hook {} executed successfully", idx + 1),
                Err(e) => tracing::warn!("Shutdown hook {} failed: {}", idx + 1, e),
            }
        }
        drop(hooks);

        self.bean_factory.destroy_singletons();

        tracing::info!("Application shutdown complete");
        Ok(())
    }

    /// 通过类型获取 Bean
    pub fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        self.bean_factory.get_bean_by_type::<T>()
    }

    /// 通过名称获取并转型
    pub fn get_bean_of_type<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.bean_factory.get_bean_of_type::<T>(name)
    }
}

impl Container for ApplicationContext {
    fn register(&self, name: &str, definition: BeanDefinition) -> ContainerResult<()> {
        self.bean_factory.register_bean_definition(name, definition)
    }

    fn get_bean(&self, name: &str) -> ContainerResult<BeanHandle> {
        self.bean_factory.get_bean(name)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.bean_factory.contains_bean(name)
    }

    fn get_bean_names(&self) -> Vec<String> {
        self.bean_factory.get_bean_definition_names()
    }
}

/// 应用上下文构建器
pub struct ApplicationContextBuilder {
    environment: Arc<Environment>,
    registrations: Vec<(String, BeanDefinition)>,
    classes: Vec<BeanClass>,
    app_name: Option<String>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            environment: Arc::new(Environment::new()),
            registrations: Vec::new(),
            classes: Vec::new(),
            app_name: None,
        }
    }

    /// 设置应用名称
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// 注册 Bean 定义
    pub fn register(mut self, name: impl Into<String>, definition: BeanDefinition) -> Self {
        self.registrations.push((name.into(), definition));
        self
    }

    /// 注册类型记录
    pub fn register_class(mut self, class: BeanClass) -> Self {
        self.classes.push(class);
        self
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(self, source: Box<dyn PropertySource>) -> Self {
        self.environment.add_property_source(source);
        self
    }

    /// 设置激活的 profiles
    pub fn set_active_profiles(self, profiles: Vec<String>) -> Self {
        self.environment.set_active_profiles(profiles);
        self
    }

    /// 构建上下文（不刷新；调用方决定何时 refresh）
    pub fn build(self) -> ContainerResult<Arc<ApplicationContext>> {
        let context = ApplicationContext::with_environment(self.environment);
        if let Some(name) = self.app_name {
            context.set_app_name(name);
        }
        for class in self.classes {
            context.register_class(class);
        }
        for (name, definition) in self.registrations {
            context.register(&name, definition)?;
        }
        Ok(context)
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
