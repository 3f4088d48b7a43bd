//! Bean Factory - 核心容器接口
//!
//! 自上而下的接口阶梯：BeanFactory 提供基础查找，Listable 提供枚举，
//! Configurable 提供注册与配置，DefaultListableBeanFactory 是全部能力
//! 的默认实现：定义注册与合并、单例三段缓存、创建引擎与销毁入口。

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::alias::AliasRegistry;
use crate::bean::{
    AutowireMode, BeanDefinition, BeanRole, MergedBeanDefinition, PropertyValues, ValueSpec,
};
use crate::config::StringValueResolver;
use crate::constants::SCOPE_SINGLETON;
use crate::convert::{SimpleTypeConverter, TypeConverter};
use crate::error::{ContainerError, ContainerResult};
use crate::factory_bean::{
    is_factory_dereference, transformed_bean_name, FactoryBean, FactoryBeanRegistry,
};
use crate::lifecycle::{sort_post_processors, BeanPostProcessor, DisposableBeanAdapter};
use crate::metadata::{BeanClass, BeanHandle, ClassRegistry, MethodSpec, TypeKey};
use crate::resolver::DependencyDescriptor;
use crate::scope::{is_builtin_scope, Scope};
use crate::singleton::SingletonRegistry;

/// BeanFactory - 最基础的容器接口
///
/// 提供基本的 Bean 访问功能
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean
    fn get_bean(&self, name: &str) -> ContainerResult<BeanHandle>;

    /// 通过名称获取 Bean，显式构造参数覆盖定义声明的参数
    fn get_bean_with_args(&self, name: &str, args: Vec<BeanHandle>) -> ContainerResult<BeanHandle>;

    /// 检查是否包含指定名称的 Bean
    fn contains_bean(&self, name: &str) -> bool;

    /// 指定名称的 Bean 是否为单例
    fn is_singleton(&self, name: &str) -> ContainerResult<bool>;

    /// 指定名称的 Bean 是否为原型
    fn is_prototype(&self, name: &str) -> ContainerResult<bool>;

    /// 指定名称的 Bean 是否与类型匹配
    fn is_type_match(&self, name: &str, key: &TypeKey) -> ContainerResult<bool>;

    /// 获取 Bean 的类型（可确定时）
    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeKey>>;

    /// 获取 Bean 的类型，允许为确定 FactoryBean 产品类型而初始化工厂
    fn get_type_allow_init(
        &self,
        name: &str,
        allow_factory_bean_init: bool,
    ) -> ContainerResult<Option<TypeKey>>;

    /// 获取指定名称的全部别名
    fn get_aliases(&self, name: &str) -> Vec<String>;
}

/// BeanFactoryExt - BeanFactory 的泛型扩展
///
/// 提供类型安全的查找方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 按名称获取并转型
    fn get_bean_of_type<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        downcast_bean(self.get_bean(name)?)
    }

    /// 按类型获取唯一 Bean
    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>>;

    /// 按类型获取唯一 Bean，显式构造参数覆盖定义声明的参数
    fn get_bean_by_type_with_args<T: Any + Send + Sync>(
        &self,
        args: Vec<BeanHandle>,
    ) -> ContainerResult<Arc<T>>;
}

/// ListableBeanFactory - 可枚举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 全部定义名（冻结快照顺序，否则注册顺序）
    fn get_bean_definition_names(&self) -> Vec<String>;

    /// 是否存在指定名称的定义
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 定义数量
    fn get_bean_definition_count(&self) -> usize;

    /// 与类型匹配的 Bean 名称
    ///
    /// 定义名在前（注册顺序），之后是无定义的手工注册单例。
    fn get_bean_names_for_type(
        &self,
        key: &TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String>;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 注册 Bean 定义
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition)
        -> ContainerResult<()>;

    /// 移除 Bean 定义
    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()>;

    /// 注册别名
    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()>;

    /// 预注册单例实例（不经创建流程，不触发创建回调）
    fn register_singleton(&self, name: &str, instance: BeanHandle) -> ContainerResult<()>;

    /// 注册自定义作用域处理器
    fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> ContainerResult<()>;

    /// 添加 BeanPostProcessor
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 已注册的 BeanPostProcessor 数量
    fn get_bean_post_processor_count(&self) -> usize;
}

/// ConfigurableListableBeanFactory - 可配置且可枚举的 Bean 工厂
///
/// 这是定义阶段处理器接收的参数类型
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 预实例化所有非延迟单例 Bean
    fn pre_instantiate_singletons(&self) -> ContainerResult<()>;

    /// 冻结配置：快照定义名序列，此后按覆盖策略约束注册
    fn freeze_configuration(&self);

    /// 检查配置是否已冻结
    fn is_configuration_frozen(&self) -> bool;

    /// 销毁所有单例 Bean（调用销毁回调）
    fn destroy_singletons(&self);

    /// 销毁指定作用域 Bean
    fn destroy_scoped_bean(&self, name: &str) -> ContainerResult<()>;

    /// 获取合并后的定义
    fn get_merged_bean_definition(&self, name: &str) -> ContainerResult<Arc<MergedBeanDefinition>>;

    /// 已注册的自定义作用域名称
    fn get_registered_scope_names(&self) -> Vec<String>;
}

/// 统一的实例转型辅助
pub(crate) fn downcast_bean<T: Any + Send + Sync>(bean: BeanHandle) -> ContainerResult<Arc<T>> {
    bean.downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            found: "unknown".to_string(),
        })
}

/// DefaultListableBeanFactory - 默认实现
///
/// 实际的 Bean 容器：定义注册与父子合并、别名、单例三段缓存、
/// FactoryBean 产品缓存、创建引擎、依赖解析与销毁编排。
pub struct DefaultListableBeanFactory {
    /// 自引用（延迟注入委托需要弱引用）
    weak_self: Weak<DefaultListableBeanFactory>,

    /// 类型元数据注册表（类加载器的对应物）
    classes: ClassRegistry,

    /// 别名注册表
    aliases: AliasRegistry,

    /// 单例注册表
    singletons: SingletonRegistry,

    /// FactoryBean 产品缓存
    factory_beans: FactoryBeanRegistry,

    /// Bean 定义存储（注册顺序）
    definitions: RwLock<IndexMap<String, Arc<BeanDefinition>>>,

    /// 合并定义缓存
    merged: RwLock<HashMap<String, Arc<MergedBeanDefinition>>>,

    /// 冻结后的定义名快照
    frozen_names: RwLock<Option<Vec<String>>>,

    /// 无定义的手工注册单例名（注册顺序；枚举时排在定义名之后）
    manual_singletons: RwLock<Vec<String>>,

    /// 父工厂：本地无定义时向上查找
    parent: RwLock<Option<Arc<DefaultListableBeanFactory>>>,

    /// Bean 后置处理器列表（按档位与优先级排序）
    post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    /// 刷新期间预告的处理器总数（晚创建告警用）
    post_processor_target: AtomicUsize,

    /// 自定义作用域处理器
    scopes: RwLock<IndexMap<String, Arc<dyn Scope>>>,

    /// 容器提供的可解析依赖（没有定义也能注入的值）
    resolvable_dependencies: RwLock<HashMap<std::any::TypeId, BeanHandle>>,

    /// 自动装配忽略的依赖类型
    ignored_dependency_types: RwLock<HashSet<std::any::TypeId>>,

    /// 内嵌字符串值解析器链
    embedded_value_resolvers: RwLock<Vec<Arc<dyn StringValueResolver>>>,

    /// 类型转换器（注册表非线程安全，持锁访问）
    type_converter: Mutex<Box<dyn TypeConverter>>,

    /// 线程内正在创建的原型名
    prototypes_in_creation: Mutex<HashMap<ThreadId, HashSet<String>>>,

    /// 内嵌 Bean 名称计数器
    inner_bean_counter: AtomicUsize,

    /// 是否允许循环引用（早期暴露）
    allow_circular_references: AtomicBool,

    /// 包装冲突时是否容忍已注入的原始引用
    allow_raw_injection_despite_wrapping: AtomicBool,

    /// 是否允许定义覆盖
    allow_definition_overriding: AtomicBool,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            weak_self: weak_self.clone(),
            classes: ClassRegistry::new(),
            aliases: AliasRegistry::new(),
            singletons: SingletonRegistry::new(),
            factory_beans: FactoryBeanRegistry::new(),
            definitions: RwLock::new(IndexMap::new()),
            merged: RwLock::new(HashMap::new()),
            frozen_names: RwLock::new(None),
            manual_singletons: RwLock::new(Vec::new()),
            parent: RwLock::new(None),
            post_processors: RwLock::new(Vec::new()),
            post_processor_target: AtomicUsize::new(0),
            scopes: RwLock::new(IndexMap::new()),
            resolvable_dependencies: RwLock::new(HashMap::new()),
            ignored_dependency_types: RwLock::new(HashSet::new()),
            embedded_value_resolvers: RwLock::new(Vec::new()),
            type_converter: Mutex::new(Box::new(SimpleTypeConverter::new())),
            prototypes_in_creation: Mutex::new(HashMap::new()),
            inner_bean_counter: AtomicUsize::new(0),
            allow_circular_references: AtomicBool::new(true),
            allow_raw_injection_despite_wrapping: AtomicBool::new(false),
            allow_definition_overriding: AtomicBool::new(true),
        })
    }

    pub(crate) fn weak_self(&self) -> Weak<DefaultListableBeanFactory> {
        self.weak_self.clone()
    }

    // ==================== 配置 ====================

    pub fn set_parent(&self, parent: Arc<DefaultListableBeanFactory>) {
        *self.parent.write() = Some(parent);
    }

    pub fn parent(&self) -> Option<Arc<DefaultListableBeanFactory>> {
        self.parent.read().clone()
    }

    pub fn set_allow_circular_references(&self, allow: bool) {
        self.allow_circular_references.store(allow, Ordering::SeqCst);
    }

    pub fn set_allow_raw_injection_despite_wrapping(&self, allow: bool) {
        self.allow_raw_injection_despite_wrapping
            .store(allow, Ordering::SeqCst);
    }

    pub fn set_allow_definition_overriding(&self, allow: bool) {
        self.allow_definition_overriding.store(allow, Ordering::SeqCst);
        self.aliases.set_allow_override(allow);
    }

    /// 类型元数据注册表
    pub fn class_registry(&self) -> &ClassRegistry {
        &self.classes
    }

    /// 注册类型记录的便捷入口
    pub fn register_class(&self, class: BeanClass) {
        self.classes.register(class);
    }

    /// 以生成的默认名注册定义，返回实际使用的名称
    pub fn register_with_generated_name(
        &self,
        definition: BeanDefinition,
    ) -> ContainerResult<String> {
        let name = self.generate_bean_name(&definition)?;
        self.register_bean_definition(&name, definition)?;
        Ok(name)
    }

    /// 为定义推导默认 Bean 名
    ///
    /// 类名的简名首字母小写；与既有名称冲突时追加 `#N` 序号。
    pub fn generate_bean_name(&self, definition: &BeanDefinition) -> ContainerResult<String> {
        let base = match (&definition.bean_class, &definition.class_name) {
            (Some(class), _) => crate::utils::naming::default_bean_name(&class.class_name),
            (None, Some(class_name)) => crate::utils::naming::default_bean_name(class_name),
            _ => {
                return Err(ContainerError::DefinitionStore {
                    name: None,
                    message: "Cannot generate a bean name for a definition without a class"
                        .to_string(),
                });
            }
        };
        if !self.definitions.read().contains_key(&base) && !self.singletons.contains_singleton(&base)
        {
            return Ok(base);
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}#{}", base, counter);
            if !self.definitions.read().contains_key(&candidate)
                && !self.singletons.contains_singleton(&candidate)
            {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    pub(crate) fn singleton_registry(&self) -> &SingletonRegistry {
        &self.singletons
    }

    /// 已发布单例数量
    pub fn get_singleton_count(&self) -> usize {
        self.singletons.singleton_count()
    }

    /// 已发布单例名称（发布顺序）
    pub fn get_singleton_names(&self) -> Vec<String> {
        self.singletons.singleton_names()
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons
            .contains_singleton(&self.canonical_name(name))
    }

    /// 注册容器提供的可解析依赖：该类型的注入点直接得到给定值
    pub fn register_resolvable_dependency(&self, key: TypeKey, value: BeanHandle) {
        self.resolvable_dependencies.write().insert(key.id, value);
    }

    /// 自动装配时忽略指定依赖类型
    pub fn ignore_dependency_type(&self, key: TypeKey) {
        self.ignored_dependency_types.write().insert(key.id);
    }

    pub(crate) fn is_ignored_dependency(&self, key: &TypeKey) -> bool {
        self.ignored_dependency_types.read().contains(&key.id)
    }

    pub(crate) fn resolvable_dependency(&self, key: &TypeKey) -> Option<BeanHandle> {
        self.resolvable_dependencies.read().get(&key.id).cloned()
    }

    /// 添加字符串值解析器（占位符等）
    pub fn add_embedded_value_resolver(&self, resolver: Arc<dyn StringValueResolver>) {
        self.embedded_value_resolvers.write().push(resolver);
    }

    pub fn has_embedded_value_resolver(&self) -> bool {
        !self.embedded_value_resolvers.read().is_empty()
    }

    /// 经解析器链解析字符串值
    pub fn resolve_embedded_value(&self, value: &str) -> ContainerResult<String> {
        let resolvers = self.embedded_value_resolvers.read();
        let mut current = value.to_string();
        for resolver in resolvers.iter() {
            current = resolver.resolve(&current)?;
        }
        Ok(current)
    }

    /// 替换类型转换器
    pub fn set_type_converter(&self, converter: Box<dyn TypeConverter>) {
        *self.type_converter.lock() = converter;
    }

    /// 在转换器上执行操作（转换器注册表非线程安全，持锁访问）
    pub fn with_type_converter<R>(&self, f: impl FnOnce(&mut dyn TypeConverter) -> R) -> R {
        let mut converter = self.type_converter.lock();
        f(converter.as_mut())
    }

    /// 用别名注册表解析规范名
    pub fn canonical_name(&self, name: &str) -> String {
        self.aliases.canonical_name(transformed_bean_name(name))
    }

    /// 别名注册表
    pub fn alias_registry(&self) -> &AliasRegistry {
        &self.aliases
    }

    /// 刷新期间预告处理器总数，供晚创建告警比较
    pub(crate) fn set_post_processor_target(&self, target: usize) {
        self.post_processor_target.store(target, Ordering::SeqCst);
    }

    pub(crate) fn post_processors_snapshot(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.post_processors.read().clone()
    }

    /// 新一轮刷新前复位销毁闩锁并移除临时类型覆盖层
    pub fn prepare_refresh(&self) {
        self.singletons.clear_after_refresh();
        self.classes.clear_temporary();
    }

    // ==================== 定义注册与合并 ====================

    fn find_definition(&self, name: &str) -> Option<Arc<BeanDefinition>> {
        if let Some(def) = self.definitions.read().get(name) {
            return Some(def.clone());
        }
        self.parent
            .read()
            .as_ref()
            .and_then(|p| p.find_definition(name))
    }

    /// 获取合并后的本地定义（缓存）
    pub(crate) fn get_merged_local_definition(
        &self,
        name: &str,
    ) -> ContainerResult<Arc<MergedBeanDefinition>> {
        if let Some(merged) = self.merged.read().get(name) {
            return Ok(merged.clone());
        }
        let definition =
            self.definitions
                .read()
                .get(name)
                .cloned()
                .ok_or_else(|| ContainerError::NoSuchBean {
                    name: name.to_string(),
                })?;
        let merged = self.merge_definition(name, &definition)?;
        self.merged
            .write()
            .insert(name.to_string(), merged.clone());
        Ok(merged)
    }

    /// 沿父链叠加出合并定义（不缓存；内嵌 Bean 也走此入口）
    pub(crate) fn merge_definition(
        &self,
        name: &str,
        definition: &Arc<BeanDefinition>,
    ) -> ContainerResult<Arc<MergedBeanDefinition>> {
        let mut ancestors: Vec<Arc<BeanDefinition>> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(name.to_string());

        let mut parent_name = definition.parent_name.clone();
        while let Some(pname) = parent_name {
            let canonical = self.canonical_name(&pname);
            if !seen.insert(canonical.clone()) {
                return Err(ContainerError::definition(
                    name,
                    format!("Circular parent chain involving '{}'", canonical),
                ));
            }
            let parent_def = self.find_definition(&canonical).ok_or_else(|| {
                ContainerError::definition(
                    name,
                    format!("Parent definition '{}' not found", pname),
                )
            })?;
            parent_name = parent_def.parent_name.clone();
            ancestors.push(parent_def);
        }

        let mut effective = match ancestors.last() {
            Some(root) => {
                let mut merged = (**root).clone();
                merged.parent_name = None;
                for ancestor in ancestors.iter().rev().skip(1) {
                    merged = ancestor.merged_onto(&merged);
                }
                definition.merged_onto(&merged)
            }
            None => (**definition).clone(),
        };

        if effective.scope.is_empty() {
            effective.scope = SCOPE_SINGLETON.to_string();
        }
        effective.validate(name)?;

        Ok(Arc::new(MergedBeanDefinition::new(effective)))
    }

    /// 清空合并定义缓存（元数据缓存失效入口）
    pub fn clear_metadata_cache(&self) {
        self.merged.write().clear();
    }

    /// 失效 name 以及父链触及 name 的全部合并缓存
    fn clear_merged_cache_for(&self, name: &str) {
        let mut stale: Vec<String> = vec![name.to_string()];
        {
            let definitions = self.definitions.read();
            for (candidate, definition) in definitions.iter() {
                let mut current = definition.parent_name.clone();
                let mut hops = 0;
                while let Some(parent) = current {
                    if parent == name {
                        stale.push(candidate.clone());
                        break;
                    }
                    current = definitions
                        .get(&self.aliases.canonical_name(&parent))
                        .and_then(|d| d.parent_name.clone());
                    hops += 1;
                    if hops > definitions.len() {
                        break;
                    }
                }
            }
        }
        let mut merged = self.merged.write();
        for name in stale {
            merged.remove(&name);
        }
    }

    /// 解析定义的类型记录
    pub(crate) fn resolve_bean_class(
        &self,
        mbd: &MergedBeanDefinition,
        bean_name: &str,
    ) -> ContainerResult<Option<Arc<BeanClass>>> {
        if let Some(class) = &mbd.definition.bean_class {
            return Ok(Some(class.clone()));
        }
        match &mbd.definition.class_name {
            Some(class_name) => self
                .classes
                .load(class_name)
                .map(Some)
                .map_err(|_| {
                    ContainerError::definition(
                        bean_name,
                        format!("Unknown class '{}'", class_name),
                    )
                }),
            None => Ok(None),
        }
    }

    // ==================== 原型创建中跟踪 ====================

    fn before_prototype_creation(&self, name: &str) {
        self.prototypes_in_creation
            .lock()
            .entry(thread::current().id())
            .or_default()
            .insert(name.to_string());
    }

    fn after_prototype_creation(&self, name: &str) {
        let mut map = self.prototypes_in_creation.lock();
        let id = thread::current().id();
        if let Some(set) = map.get_mut(&id) {
            set.remove(name);
            if set.is_empty() {
                map.remove(&id);
            }
        }
    }

    fn is_prototype_currently_in_creation(&self, name: &str) -> bool {
        self.prototypes_in_creation
            .lock()
            .get(&thread::current().id())
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }

    // ==================== 查找 ====================

    fn do_get_bean(&self, name: &str, args: Option<&[BeanHandle]>) -> ContainerResult<BeanHandle> {
        tracing::trace!("Requesting bean: '{}'", name);
        let bean_name = self.canonical_name(name);

        // 单例快路径
        if args.is_none() {
            if let Some(shared) = self.singletons.get_singleton(&bean_name)? {
                if self.singletons.is_in_creation(&bean_name) {
                    tracing::trace!(
                        "Returning eagerly cached instance of singleton bean '{}' that is not fully initialized yet",
                        bean_name
                    );
                } else {
                    tracing::trace!(
                        "Returning cached instance of singleton bean '{}'",
                        bean_name
                    );
                }
                return self.object_for_bean_instance(shared, name, &bean_name);
            }
        }

        // 原型循环：同一线程重复进入
        if self.is_prototype_currently_in_creation(&bean_name) {
            return Err(ContainerError::CurrentlyInCreation {
                name: bean_name,
                detail: "Prototype bean is currently in creation on this thread: circular reference?".to_string(),
            });
        }

        // 本地无定义时委托父工厂
        if !self.definitions.read().contains_key(&bean_name) {
            if let Some(parent) = self.parent.read().clone() {
                return match args {
                    Some(args) => parent.get_bean_with_args(name, args.to_vec()),
                    None => parent.get_bean(name),
                };
            }
        }

        let mbd = self.get_merged_local_definition(&bean_name)?;

        // depends_on：先完整创建声明的依赖
        for dep in &mbd.definition.depends_on {
            let dep_canonical = self.canonical_name(dep);
            if self.singletons.is_dependent(&bean_name, &dep_canonical) {
                return Err(ContainerError::definition(
                    &bean_name,
                    format!(
                        "Circular depends-on relationship between '{}' and '{}'",
                        bean_name, dep
                    ),
                ));
            }
            self.singletons
                .register_dependent_bean(&dep_canonical, &bean_name);
            self.get_bean(dep).map_err(|e| {
                ContainerError::creation(
                    &bean_name,
                    format!("Failed to initialize depends-on bean '{}': {}", dep, e),
                )
            })?;
        }

        let instance = if mbd.is_singleton() {
            tracing::debug!("Creating shared instance of singleton bean '{}'", bean_name);
            self.singletons.get_or_create(&bean_name, || {
                self.create_bean(&bean_name, &mbd, args)
                    .map_err(|e| self.wrap_creation_error(&bean_name, e))
            })?
        } else if mbd.is_prototype() {
            tracing::debug!("Creating new instance of prototype bean '{}'", bean_name);
            self.before_prototype_creation(&bean_name);
            let result = self.create_bean(&bean_name, &mbd, args);
            self.after_prototype_creation(&bean_name);
            result.map_err(|e| self.wrap_creation_error(&bean_name, e))?
        } else {
            let scope_name = mbd.scope().to_string();
            let scope = self
                .scopes
                .read()
                .get(&scope_name)
                .cloned()
                .ok_or_else(|| {
                    ContainerError::definition(
                        &bean_name,
                        format!("No scope registered for scope name '{}'", scope_name),
                    )
                })?;
            tracing::debug!(
                "Creating instance of bean '{}' in scope '{}'",
                bean_name,
                scope_name
            );
            let object_factory = || -> ContainerResult<BeanHandle> {
                self.before_prototype_creation(&bean_name);
                let result = self.create_bean(&bean_name, &mbd, args);
                self.after_prototype_creation(&bean_name);
                result.map_err(|e| self.wrap_creation_error(&bean_name, e))
            };
            scope.get(&bean_name, &object_factory)?
        };

        self.object_for_bean_instance(instance, name, &bean_name)
    }

    /// 保留循环引用与销毁期错误，其余包装为创建失败
    fn wrap_creation_error(&self, bean_name: &str, e: ContainerError) -> ContainerError {
        match e {
            ContainerError::CurrentlyInCreation { .. }
            | ContainerError::CreationNotAllowed { .. }
            | ContainerError::CreationFailed { .. } => e,
            other => ContainerError::creation(bean_name, other.to_string()),
        }
    }

    /// FactoryBean 解引用：名称不带 `&` 时把工厂对象换成其产品
    fn object_for_bean_instance(
        &self,
        instance: BeanHandle,
        original_name: &str,
        bean_name: &str,
    ) -> ContainerResult<BeanHandle> {
        let factory = self.as_factory_bean(bean_name, &instance);

        if is_factory_dereference(original_name) {
            return match factory {
                Some(_) => Ok(instance),
                None => Err(ContainerError::definition(
                    bean_name,
                    "Bean is not a factory bean but was requested with the factory dereference prefix",
                )),
            };
        }

        let Some(factory) = factory else {
            return Ok(instance);
        };

        if let Some(cached) = self.factory_beans.get_cached(bean_name) {
            return Ok(cached);
        }

        let synthetic = self
            .definitions
            .read()
            .get(bean_name)
            .map(|d| d.synthetic)
            .unwrap_or(false);

        self.factory_beans.object_from_factory(
            &factory,
            bean_name,
            &self.singletons,
            !synthetic,
            |object, name| self.apply_after_initialization(object, name),
        )
    }

    /// 实例是否声明了 FactoryBean 能力
    fn as_factory_bean(
        &self,
        bean_name: &str,
        instance: &BeanHandle,
    ) -> Option<Arc<dyn FactoryBean>> {
        let mbd = self.get_merged_local_definition(bean_name).ok()?;
        let class = self.resolve_bean_class(&mbd, bean_name).ok()??;
        let caster = class.factory_bean.as_ref()?;
        caster(instance)
    }

    fn is_factory_bean_definition(
        &self,
        bean_name: &str,
        mbd: &MergedBeanDefinition,
    ) -> ContainerResult<bool> {
        Ok(self
            .resolve_bean_class(mbd, bean_name)?
            .map(|c| c.factory_bean.is_some())
            .unwrap_or(false))
    }

    // ==================== 创建引擎 ====================

    pub(crate) fn create_bean(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        args: Option<&[BeanHandle]>,
    ) -> ContainerResult<BeanHandle> {
        tracing::trace!("Creating instance of bean '{}'", bean_name);

        // 晚创建告警：刷新还在注册处理器时被创建的 Bean 享受不到完整流水线
        let target = self.post_processor_target.load(Ordering::SeqCst);
        if target > 0
            && self.post_processors.read().len() < target
            && !matches!(mbd.definition.role, BeanRole::Infrastructure)
        {
            tracing::info!(
                "Bean '{}' is not eligible for getting processed by all BeanPostProcessors (for example: not eligible for auto-proxying)",
                bean_name
            );
        }

        let class = self.resolve_bean_class(mbd, bean_name)?;

        // 方法覆盖必须能在类型记录上找到目标
        if let Some(class) = &class {
            for overridden in &mbd.definition.lookup_overrides {
                if class.method(overridden).is_none() {
                    return Err(ContainerError::definition(
                        bean_name,
                        format!(
                            "Lookup method '{}' not found on class '{}'",
                            overridden, class.class_name
                        ),
                    ));
                }
            }
        }

        // 实例化前短路：处理器可以直接给出成品（典型：代理）
        if !mbd.definition.synthetic {
            if let Some(class) = &class {
                let processors = self.post_processors.read().clone();
                for processor in processors.iter() {
                    if let Some(bean) = processor.before_instantiation(class, bean_name)? {
                        tracing::debug!(
                            "Bean '{}' produced by before-instantiation hook of '{}'",
                            bean_name,
                            processor.name()
                        );
                        return self.apply_after_initialization(bean, bean_name);
                    }
                }
            }
        }

        self.do_create_bean(bean_name, mbd, class, args)
    }

    fn do_create_bean(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        class: Option<Arc<BeanClass>>,
        args: Option<&[BeanHandle]>,
    ) -> ContainerResult<BeanHandle> {
        let instance = self.instantiate(bean_name, mbd, class.as_deref(), args)?;

        // 合并定义处理：每个合并定义恰好一次
        if !mbd.post_processed.swap(true, Ordering::SeqCst) && !mbd.definition.synthetic {
            let processors = self.post_processors.read().clone();
            for processor in processors.iter() {
                processor.process_merged_definition(mbd, bean_name)?;
            }
        }

        // 提前暴露：单例 + 允许循环引用 + 正在创建
        let early_exposure = mbd.is_singleton()
            && self.allow_circular_references.load(Ordering::SeqCst)
            && self.singletons.is_in_creation(bean_name);
        if early_exposure {
            tracing::trace!(
                "Eagerly caching bean '{}' to allow for resolving potential circular references",
                bean_name
            );
            let processors = self.post_processors.read().clone();
            let raw = instance.clone();
            let owned_name = bean_name.to_string();
            self.singletons.add_early_factory(
                bean_name,
                Box::new(move || {
                    let mut exposed = raw;
                    for processor in &processors {
                        exposed = processor.get_early_reference(exposed, &owned_name)?;
                    }
                    Ok(exposed)
                }),
            );
        }

        self.populate_bean(bean_name, mbd, class.as_deref(), &instance)?;
        let mut exposed = self.initialize_bean(bean_name, mbd, class.as_deref(), instance.clone())?;

        // 循环引用对账：早期引用已被取走时，包装结果必须与之一致
        if early_exposure {
            if let Some(early) = self
                .singletons
                .get_singleton_allow_early(bean_name, false)?
            {
                if Arc::ptr_eq(&exposed, &instance) {
                    exposed = early;
                } else if !self
                    .allow_raw_injection_despite_wrapping
                    .load(Ordering::SeqCst)
                    && self.singletons.has_dependents(bean_name)
                {
                    let actual: Vec<String> = self
                        .singletons
                        .get_dependents(bean_name)
                        .into_iter()
                        .filter(|dep| self.singletons.contains_singleton(dep))
                        .collect();
                    if !actual.is_empty() {
                        return Err(ContainerError::CurrentlyInCreation {
                            name: bean_name.to_string(),
                            detail: format!(
                                "Bean '{}' has been injected into other beans {:?} in its raw version as part of a circular reference, but has eventually been wrapped. This means that said other beans do not use the final version of the bean.",
                                bean_name, actual
                            ),
                        });
                    }
                }
            }
        }

        self.register_disposable_if_necessary(bean_name, &exposed, mbd, class.as_deref())?;
        Ok(exposed)
    }

    /// 实例化：供应器 → 工厂方法 → 构造函数
    fn instantiate(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        class: Option<&BeanClass>,
        args: Option<&[BeanHandle]>,
    ) -> ContainerResult<BeanHandle> {
        if let Some(supplier) = &mbd.definition.instance_supplier {
            tracing::trace!("Obtaining bean '{}' from instance supplier", bean_name);
            return supplier();
        }

        if let Some(method_name) = mbd.definition.factory_method_name.clone() {
            return self.instantiate_using_factory_method(bean_name, mbd, class, &method_name, args);
        }

        let class = class.ok_or_else(|| {
            ContainerError::definition(bean_name, "No class attached to definition")
        })?;

        // 处理器给出的候选构造函数
        let mut candidates: Option<Vec<usize>> = None;
        if !mbd.definition.synthetic {
            let processors = self.post_processors.read().clone();
            for processor in processors.iter() {
                if let Some(found) = processor.determine_constructors(class, bean_name) {
                    candidates = Some(found);
                    break;
                }
            }
        }

        if candidates.is_some()
            || mbd.definition.autowire_mode == AutowireMode::Constructor
            || !mbd.definition.constructor_args.is_empty()
            || args.is_some()
        {
            return self.autowire_constructor(bean_name, mbd, class, candidates, args);
        }

        // 默认路径：缓存的候选 → 无参构造 → 唯一构造
        if let Some(&cached) = mbd.resolved_constructor.get() {
            if let Some(ctor) = class.constructors.get(cached) {
                if ctor.parameters.is_empty() {
                    return (ctor.invoke)(&[]);
                }
                return self.autowire_constructor(bean_name, mbd, class, Some(vec![cached]), None);
            }
        }
        if let Some(index) = class
            .constructors
            .iter()
            .position(|c| c.parameters.is_empty())
        {
            let _ = mbd.resolved_constructor.set(index);
            return (class.constructors[index].invoke)(&[]);
        }
        if class.constructors.len() == 1 {
            return self.autowire_constructor(bean_name, mbd, class, Some(vec![0]), None);
        }
        Err(ContainerError::definition(
            bean_name,
            format!(
                "No default constructor found on class '{}'",
                class.class_name
            ),
        ))
    }

    /// 构造函数解析与调用
    ///
    /// 候选按公有优先、参数多者优先排序；显式值优先，其余参数交给
    /// 依赖解析器。同参数数的多个可解析候选按参数名匹配数裁决。
    fn autowire_constructor(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        class: &BeanClass,
        candidates: Option<Vec<usize>>,
        args: Option<&[BeanHandle]>,
    ) -> ContainerResult<BeanHandle> {
        // 原型重复创建：直接用缓存的候选
        if args.is_none() {
            if let Some(&cached) = mbd.resolved_constructor.get() {
                if let Some(ctor) = class.constructors.get(cached) {
                    let values = self.resolve_parameter_values(bean_name, mbd, &ctor.parameters, None)?;
                    return (ctor.invoke)(&values);
                }
            }
        }

        let mut indexes: Vec<usize> =
            candidates.unwrap_or_else(|| (0..class.constructors.len()).collect());
        if indexes.is_empty() {
            return Err(ContainerError::definition(
                bean_name,
                "No constructor candidates available",
            ));
        }
        indexes.sort_by(|&a, &b| {
            let (ca, cb) = (&class.constructors[a], &class.constructors[b]);
            cb.public
                .cmp(&ca.public)
                .then(cb.parameters.len().cmp(&ca.parameters.len()))
        });

        let min_params = args
            .map(|a| a.len())
            .unwrap_or_else(|| mbd.definition.constructor_args.min_parameter_count());

        let mut resolved: Vec<(usize, Vec<BeanHandle>)> = Vec::new();
        let mut last_failure: Option<String> = None;

        for &index in &indexes {
            let ctor = &class.constructors[index];
            if ctor.parameters.len() < min_params {
                continue;
            }
            if let Some(args) = args {
                if ctor.parameters.len() != args.len() {
                    continue;
                }
            }
            if let Some((first, _)) = resolved.first() {
                if class.constructors[*first].parameters.len() > ctor.parameters.len() {
                    // 已有更“贪婪”的可解析候选
                    break;
                }
            }
            match self.resolve_parameter_values(bean_name, mbd, &ctor.parameters, args) {
                Ok(values) => resolved.push((index, values)),
                // 构造注入撞上创建中的循环没有退路，立即上抛
                Err(e @ ContainerError::CurrentlyInCreation { .. }) => return Err(e),
                Err(e) => {
                    last_failure = Some(e.to_string());
                    self.singletons.register_suppressed(e);
                }
            }
        }

        let (chosen, values) = match resolved.len() {
            0 => {
                return Err(ContainerError::UnsatisfiedDependency {
                    name: bean_name.to_string(),
                    injection_point: "constructor".to_string(),
                    detail: last_failure
                        .unwrap_or_else(|| "no matching constructor found".to_string()),
                });
            }
            1 => resolved.remove(0),
            _ => {
                // 同参数数的平局：参数名与显式具名参数的匹配数多者胜
                let score = |index: usize| -> usize {
                    class.constructors[index]
                        .parameters
                        .iter()
                        .filter(|p| {
                            p.name.as_deref().is_some_and(|n| {
                                mbd.definition
                                    .constructor_args
                                    .get_generic(Some(n), p.dependency.name)
                                    .is_some()
                            })
                        })
                        .count()
                };
                let best = resolved
                    .iter()
                    .map(|(i, _)| score(*i))
                    .max()
                    .unwrap_or(0);
                let mut top: Vec<(usize, Vec<BeanHandle>)> = resolved
                    .into_iter()
                    .filter(|(i, _)| score(*i) == best)
                    .collect();
                if top.len() > 1 {
                    return Err(ContainerError::definition(
                        bean_name,
                        format!(
                            "Ambiguous constructor matches on class '{}' ({} candidates with {} parameters)",
                            class.class_name,
                            top.len(),
                            top[0].1.len()
                        ),
                    ));
                }
                top.remove(0)
            }
        };

        if args.is_none() {
            let _ = mbd.resolved_constructor.set(chosen);
        }
        (class.constructors[chosen].invoke)(&values)
    }

    /// 逐个参数求值：显式位置值 → 显式具名值 → 依赖解析器
    fn resolve_parameter_values(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        parameters: &[crate::metadata::ParameterSpec],
        args: Option<&[BeanHandle]>,
    ) -> ContainerResult<Vec<BeanHandle>> {
        if let Some(args) = args {
            return Ok(args.to_vec());
        }

        let cav = &mbd.definition.constructor_args;
        let mut values = Vec::with_capacity(parameters.len());

        for (index, parameter) in parameters.iter().enumerate() {
            let explicit = cav
                .get_indexed(index)
                .or_else(|| cav.get_generic(parameter.name.as_deref(), parameter.dependency.name));
            if let Some(argument) = explicit {
                let value = self.resolve_value_spec(
                    bean_name,
                    &argument.value,
                    &parameter.dependency,
                    &format!("constructor argument {}", index),
                )?;
                values.push(value);
                continue;
            }

            let descriptor = DependencyDescriptor::for_parameter(parameter);
            let resolved = self.resolve_dependency(&descriptor, Some(bean_name))?;
            if parameter.required && !parameter.lazy {
                match resolved {
                    Some(value) => values.push(value),
                    None => {
                        return Err(ContainerError::UnsatisfiedDependency {
                            name: bean_name.to_string(),
                            injection_point: format!(
                                "constructor parameter {} of type '{}'",
                                index, parameter.dependency.name
                            ),
                            detail: "no candidate bean found".to_string(),
                        });
                    }
                }
            } else if parameter.lazy {
                match resolved {
                    Some(value) => values.push(value),
                    None => {
                        return Err(ContainerError::UnsatisfiedDependency {
                            name: bean_name.to_string(),
                            injection_point: format!("constructor parameter {}", index),
                            detail: "lazy resolution produced no delegate".to_string(),
                        });
                    }
                }
            } else {
                // 可选参数包装为 Option<BeanHandle>
                values.push(Arc::new(resolved) as BeanHandle);
            }
        }

        Ok(values)
    }

    /// 工厂方法实例化：实例工厂（factory_bean_name）或本类静态工厂
    fn instantiate_using_factory_method(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        class: Option<&BeanClass>,
        method_name: &str,
        args: Option<&[BeanHandle]>,
    ) -> ContainerResult<BeanHandle> {
        let (methods, target): (Vec<MethodSpec>, Option<BeanHandle>) =
            match &mbd.definition.factory_bean_name {
                Some(factory_bean_name) => {
                    let factory_canonical = self.canonical_name(factory_bean_name);
                    if factory_canonical == bean_name {
                        return Err(ContainerError::definition(
                            bean_name,
                            "Factory bean reference points back to the same bean definition",
                        ));
                    }
                    let factory_obj = self.get_bean(factory_bean_name)?;
                    self.singletons
                        .register_dependent_bean(&factory_canonical, bean_name);

                    let factory_mbd = self.get_merged_local_definition(&factory_canonical)?;
                    let factory_class = self
                        .resolve_bean_class(&factory_mbd, &factory_canonical)?
                        .ok_or_else(|| {
                            ContainerError::definition(
                                bean_name,
                                format!(
                                    "Factory bean '{}' carries no class metadata",
                                    factory_bean_name
                                ),
                            )
                        })?;
                    let methods: Vec<MethodSpec> = factory_class
                        .methods
                        .iter()
                        .filter(|m| m.name == method_name && !m.is_static)
                        .cloned()
                        .collect();
                    (methods, Some(factory_obj))
                }
                None => {
                    let class = class.ok_or_else(|| {
                        ContainerError::definition(
                            bean_name,
                            "Static factory method requires a class",
                        )
                    })?;
                    let methods: Vec<MethodSpec> = class
                        .methods
                        .iter()
                        .filter(|m| m.name == method_name && m.is_static)
                        .cloned()
                        .collect();
                    (methods, None)
                }
            };

        if methods.is_empty() {
            return Err(ContainerError::definition(
                bean_name,
                format!("No factory method '{}' found", method_name),
            ));
        }

        // 缓存命中：原型重复创建直接复用
        if args.is_none() {
            if let Some(&cached) = mbd.resolved_factory_method.get() {
                if let Some(method) = methods.get(cached) {
                    let values =
                        self.resolve_parameter_values(bean_name, mbd, &method.parameters, None)?;
                    return self.invoke_factory_method(bean_name, method, target.as_ref(), &values);
                }
            }
        }

        // 参数多者优先
        let mut order: Vec<usize> = (0..methods.len()).collect();
        order.sort_by(|&a, &b| methods[b].parameters.len().cmp(&methods[a].parameters.len()));

        let mut last_failure: Option<String> = None;
        for index in order {
            let method = &methods[index];
            if let Some(args) = args {
                if method.parameters.len() != args.len() {
                    continue;
                }
            }
            match self.resolve_parameter_values(bean_name, mbd, &method.parameters, args) {
                Ok(values) => {
                    if args.is_none() {
                        let _ = mbd.resolved_factory_method.set(index);
                    }
                    return self.invoke_factory_method(bean_name, method, target.as_ref(), &values);
                }
                Err(e @ ContainerError::CurrentlyInCreation { .. }) => return Err(e),
                Err(e) => {
                    last_failure = Some(e.to_string());
                    self.singletons.register_suppressed(e);
                }
            }
        }

        Err(ContainerError::UnsatisfiedDependency {
            name: bean_name.to_string(),
            injection_point: format!("factory method '{}'", method_name),
            detail: last_failure.unwrap_or_else(|| "no overload could be satisfied".to_string()),
        })
    }

    fn invoke_factory_method(
        &self,
        bean_name: &str,
        method: &MethodSpec,
        target: Option<&BeanHandle>,
        values: &[BeanHandle],
    ) -> ContainerResult<BeanHandle> {
        (method.invoke)(target, values)?.ok_or_else(|| {
            ContainerError::creation(
                bean_name,
                format!("Factory method '{}' returned no object", method.name),
            )
        })
    }

    /// 属性填充
    fn populate_bean(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        class: Option<&BeanClass>,
        instance: &BeanHandle,
    ) -> ContainerResult<()> {
        // 实例化后钩子可以整体否决属性填充
        if !mbd.definition.synthetic {
            let processors = self.post_processors.read().clone();
            for processor in processors.iter() {
                if !processor.after_instantiation(instance, bean_name)? {
                    tracing::trace!(
                        "Property population of bean '{}' skipped by '{}'",
                        bean_name,
                        processor.name()
                    );
                    return Ok(());
                }
            }
        }

        let mut pvs = mbd.definition.property_values.clone();

        // 按名/按类型自动装配补充未显式赋值的非简单属性
        if matches!(
            mbd.definition.autowire_mode,
            AutowireMode::ByName | AutowireMode::ByType
        ) {
            if let Some(class) = class {
                for property in &class.properties {
                    if property.simple || pvs.contains(&property.name) {
                        continue;
                    }
                    match mbd.definition.autowire_mode {
                        AutowireMode::ByName => {
                            if self.contains_bean(&property.name) {
                                let value = self.get_bean(&property.name)?;
                                self.singletons.register_dependent_bean(
                                    &self.canonical_name(&property.name),
                                    bean_name,
                                );
                                tracing::trace!(
                                    "Autowiring by name: property '{}' of bean '{}'",
                                    property.name,
                                    bean_name
                                );
                                pvs.add(&property.name, ValueSpec::Instance(value));
                            } else {
                                tracing::trace!(
                                    "Not autowiring property '{}' of bean '{}': no matching bean found",
                                    property.name,
                                    bean_name
                                );
                            }
                        }
                        AutowireMode::ByType => {
                            // 按类型自动装配始终可选、名称不敏感
                            let descriptor = DependencyDescriptor::for_property(property).optional();
                            if let Some(value) =
                                self.resolve_dependency(&descriptor, Some(bean_name))?
                            {
                                tracing::trace!(
                                    "Autowiring by type: property '{}' of bean '{}'",
                                    property.name,
                                    bean_name
                                );
                                pvs.add(&property.name, ValueSpec::Instance(value));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        // 属性钩子链：替换对后续处理器可见，None 短路填充
        if !mbd.definition.synthetic {
            let processors = self.post_processors.read().clone();
            for processor in processors.iter() {
                match processor.process_properties(pvs, instance, bean_name)? {
                    Some(replacement) => pvs = replacement,
                    None => return Ok(()),
                }
            }
        }

        // 依赖检查：可写属性必须有值
        if mbd.definition.dependency_check {
            if let Some(class) = class {
                for property in &class.properties {
                    if !pvs.contains(&property.name) {
                        return Err(ContainerError::UnsatisfiedDependency {
                            name: bean_name.to_string(),
                            injection_point: format!("property '{}'", property.name),
                            detail: "dependency checking is enabled and no value was supplied"
                                .to_string(),
                        });
                    }
                }
            }
        }

        self.apply_property_values(bean_name, class, instance, &pvs)
    }

    fn apply_property_values(
        &self,
        bean_name: &str,
        class: Option<&BeanClass>,
        instance: &BeanHandle,
        pvs: &PropertyValues,
    ) -> ContainerResult<()> {
        if pvs.is_empty() {
            return Ok(());
        }
        let class = class.ok_or_else(|| {
            ContainerError::definition(
                bean_name,
                "Property values supplied but definition carries no class metadata",
            )
        })?;

        for pv in pvs.iter() {
            let property = class.property(&pv.name).ok_or_else(|| {
                ContainerError::definition(
                    bean_name,
                    format!(
                        "No writable property '{}' on class '{}'",
                        pv.name, class.class_name
                    ),
                )
            })?;

            let value = match pv.converted() {
                Some(cached) => cached,
                None => {
                    let value = self.resolve_value_spec(
                        bean_name,
                        &pv.value,
                        &property.value_type,
                        &format!("property '{}'", pv.name),
                    )?;
                    if pv.value.is_cacheable() {
                        pv.cache_converted(value.clone());
                    }
                    value
                }
            };

            (property.set)(instance.as_ref(), value).map_err(|e| {
                ContainerError::creation(
                    bean_name,
                    format!("Failed to set property '{}': {}", pv.name, e),
                )
            })?;
        }
        Ok(())
    }

    /// 值来源求解：字面量经字符串解析器与类型转换器，引用经容器查找
    pub(crate) fn resolve_value_spec(
        &self,
        bean_name: &str,
        value: &ValueSpec,
        target: &TypeKey,
        site: &str,
    ) -> ContainerResult<BeanHandle> {
        match value {
            ValueSpec::Literal(raw) => {
                let resolved = self.resolve_embedded_value(raw)?;
                self.type_converter.lock().convert(&resolved, target)
            }
            ValueSpec::Value(config_value) => {
                self.type_converter.lock().convert_value(config_value, target)
            }
            ValueSpec::Instance(handle) => Ok(handle.clone()),
            ValueSpec::Reference(reference) => {
                let bean = self.get_bean(reference)?;
                self.singletons
                    .register_dependent_bean(&self.canonical_name(reference), bean_name);
                Ok(bean)
            }
            ValueSpec::ReferenceList(references) => {
                let mut handles: Vec<BeanHandle> = Vec::with_capacity(references.len());
                for reference in references {
                    let bean = self.get_bean(reference)?;
                    self.singletons
                        .register_dependent_bean(&self.canonical_name(reference), bean_name);
                    handles.push(bean);
                }
                Ok(Arc::new(handles) as BeanHandle)
            }
            ValueSpec::NestedDefinition(definition) => {
                self.resolve_inner_bean(bean_name, definition)
            }
            ValueSpec::Autowired => {
                let descriptor = DependencyDescriptor::new(*target).at_site(site);
                self.resolve_dependency(&descriptor, Some(bean_name))?
                    .ok_or_else(|| ContainerError::UnsatisfiedDependency {
                        name: bean_name.to_string(),
                        injection_point: site.to_string(),
                        detail: format!("no bean of type '{}' available", target.name),
                    })
            }
        }
    }

    /// 内嵌 Bean：随外层 Bean 创建，单例作用域时登记包含关系
    fn resolve_inner_bean(
        &self,
        outer_name: &str,
        definition: &Arc<BeanDefinition>,
    ) -> ContainerResult<BeanHandle> {
        let id = self.inner_bean_counter.fetch_add(1, Ordering::SeqCst);
        let inner_name = format!("(inner bean)#{}", id);
        let merged = self.merge_definition(&inner_name, definition)?;

        if merged.is_singleton() {
            self.singletons
                .register_contained_bean(&inner_name, outer_name);
        }

        self.create_bean(&inner_name, &merged, None)
            .map_err(|e| self.wrap_creation_error(&inner_name, e))
    }

    /// 初始化：Aware 回调 → 前置处理器 → 初始化回调与具名方法 → 后置处理器
    fn initialize_bean(
        &self,
        bean_name: &str,
        mbd: &Arc<MergedBeanDefinition>,
        class: Option<&BeanClass>,
        instance: BeanHandle,
    ) -> ContainerResult<BeanHandle> {
        if let Some(class) = class {
            if let Some(aware) = &class.aware {
                let context = crate::metadata::AwareContext {
                    bean_name,
                    factory: self,
                };
                aware(instance.as_ref(), &context).map_err(|e| {
                    ContainerError::creation(
                        bean_name,
                        format!("Aware callback failed: {}", e),
                    )
                })?;
            }
        }

        let mut wrapped = instance;

        if !mbd.definition.synthetic {
            let processors = self.post_processors.read().clone();
            for processor in processors.iter() {
                match processor.before_initialization(wrapped.clone(), bean_name)? {
                    Some(replacement) => wrapped = replacement,
                    None => break,
                }
            }
        }

        if let Some(init) = &mbd.definition.init_callback {
            tracing::trace!("Invoking init callback on bean '{}'", bean_name);
            init(wrapped.as_ref()).map_err(|e| {
                ContainerError::creation(bean_name, format!("Init callback failed: {}", e))
            })?;
        }

        if let Some(method_name) = &mbd.definition.init_method_name {
            match class.and_then(|c| c.method(method_name)) {
                Some(method) => {
                    tracing::trace!(
                        "Invoking init method '{}' on bean '{}'",
                        method_name,
                        bean_name
                    );
                    (method.invoke)(Some(&wrapped), &[]).map_err(|e| {
                        ContainerError::creation(
                            bean_name,
                            format!("Init method '{}' failed: {}", method_name, e),
                        )
                    })?;
                }
                None => {
                    if mbd.definition.enforce_init_method {
                        return Err(ContainerError::definition(
                            bean_name,
                            format!("Init method '{}' not found", method_name),
                        ));
                    }
                    tracing::debug!(
                        "No init method '{}' found on bean '{}', skipping",
                        method_name,
                        bean_name
                    );
                }
            }
        }

        if !mbd.definition.synthetic {
            wrapped = self.apply_after_initialization(wrapped, bean_name)?;
        }

        Ok(wrapped)
    }

    /// 初始化后处理器链（FactoryBean 产品与前实例化短路复用）
    pub(crate) fn apply_after_initialization(
        &self,
        bean: BeanHandle,
        bean_name: &str,
    ) -> ContainerResult<BeanHandle> {
        let processors = self.post_processors.read().clone();
        let mut current = bean;
        for processor in processors.iter() {
            match processor.after_initialization(current.clone(), bean_name)? {
                Some(replacement) => current = replacement,
                None => break,
            }
        }
        Ok(current)
    }

    /// 销毁登记：有销毁契约、具名方法或销毁感知处理器认领时包装注册
    fn register_disposable_if_necessary(
        &self,
        bean_name: &str,
        bean: &BeanHandle,
        mbd: &Arc<MergedBeanDefinition>,
        class: Option<&BeanClass>,
    ) -> ContainerResult<()> {
        if mbd.is_prototype() {
            // 原型的销毁由调用方负责
            return Ok(());
        }

        let destroy_method = match &mbd.definition.destroy_method_name {
            Some(method_name) => match class.and_then(|c| c.method(method_name)) {
                Some(method) => Some(method.clone()),
                None => {
                    if mbd.definition.enforce_destroy_method {
                        return Err(ContainerError::definition(
                            bean_name,
                            format!("Destroy method '{}' not found", method_name),
                        ));
                    }
                    None
                }
            },
            None => None,
        };

        let disposable_contract = class
            .and_then(|c| c.disposable.as_ref())
            .and_then(|caster| caster(bean));

        let destruction_processors: Vec<Arc<dyn BeanPostProcessor>> = self
            .post_processors
            .read()
            .iter()
            .filter(|p| p.requires_destruction(bean))
            .cloned()
            .collect();

        if disposable_contract.is_none()
            && mbd.definition.destroy_callback.is_none()
            && destroy_method.is_none()
            && destruction_processors.is_empty()
        {
            return Ok(());
        }

        let adapter = DisposableBeanAdapter::new(
            bean_name,
            bean.clone(),
            disposable_contract,
            mbd.definition.destroy_callback.clone(),
            destroy_method,
            destruction_processors,
        );

        if mbd.is_singleton() {
            self.singletons
                .register_disposable(bean_name, Box::new(adapter));
        } else {
            let scope_name = mbd.scope().to_string();
            let scope = self
                .scopes
                .read()
                .get(&scope_name)
                .cloned()
                .ok_or_else(|| {
                    ContainerError::definition(
                        bean_name,
                        format!("No scope registered for scope name '{}'", scope_name),
                    )
                })?;
            use crate::lifecycle::DisposableBean as _;
            scope.register_destruction_callback(
                bean_name,
                Box::new(move || {
                    let _ = adapter.destroy();
                }),
            );
        }
        Ok(())
    }

    // ==================== 类型查询 ====================

    /// FactoryBean 定义的产品类型；必要且允许时先初始化工厂对象
    fn factory_product_type(
        &self,
        bean_name: &str,
        allow_factory_bean_init: bool,
    ) -> ContainerResult<Option<TypeKey>> {
        if self.singletons.contains_singleton(bean_name) {
            if let Some(instance) = self.singletons.get_singleton(bean_name)? {
                if let Some(factory) = self.as_factory_bean(bean_name, &instance) {
                    return Ok(factory.product_type());
                }
            }
            return Ok(None);
        }
        if !allow_factory_bean_init {
            return Ok(None);
        }
        let factory_obj = self.get_bean(&format!("&{}", bean_name))?;
        Ok(self
            .as_factory_bean(bean_name, &factory_obj)
            .and_then(|f| f.product_type()))
    }

    /// 定义（或其产品）是否与类型匹配
    pub(crate) fn definition_matches_type(
        &self,
        bean_name: &str,
        mbd: &MergedBeanDefinition,
        key: &TypeKey,
        allow_eager_init: bool,
    ) -> bool {
        let Ok(class_opt) = self.resolve_bean_class(mbd, bean_name) else {
            return false;
        };
        let Some(class) = class_opt else {
            // 纯供应器定义：只能凭已创建的实例判断
            return self
                .singletons
                .get_singleton_allow_early(bean_name, false)
                .ok()
                .flatten()
                .map(|instance| instance.as_ref().type_id() == key.id)
                .unwrap_or(false);
        };

        if class.factory_bean.is_some() {
            return match self.factory_product_type(bean_name, allow_eager_init) {
                Ok(Some(product)) => product.id == key.id,
                _ => false,
            };
        }

        // 处理器的类型预测优先于静态元数据
        let processors = self.post_processors.read().clone();
        for processor in processors.iter() {
            if let Some(predicted) = processor.predict_type(&class, bean_name) {
                return predicted.id == key.id;
            }
        }

        class.is_assignable_to(key)
    }

    /// 定义名（冻结快照顺序，否则注册顺序）
    fn definition_names(&self) -> Vec<String> {
        if let Some(frozen) = self.frozen_names.read().as_ref() {
            return frozen.clone();
        }
        self.definitions.read().keys().cloned().collect()
    }

    /// 无定义的手工注册单例名
    fn manual_singleton_names(&self) -> Vec<String> {
        self.manual_singletons.read().clone()
    }

    /// 定义的注册序号（候选排序的兜底键）
    pub(crate) fn definition_index(&self, name: &str) -> Option<usize> {
        self.definitions.read().get_index_of(name)
    }

    // ==================== 预实例化 ====================

    fn do_pre_instantiate_singletons(&self) -> ContainerResult<()> {
        let names = self.definition_names();
        tracing::debug!("Pre-instantiating singletons: {:?}", names);

        for name in &names {
            let mbd = self.get_merged_local_definition(name)?;
            if !mbd.is_singleton() || mbd.definition.lazy_init {
                continue;
            }
            if self.is_factory_bean_definition(name, &mbd)? {
                // 工厂对象本身急加载；产品仅在工厂声明急加载时一并创建
                let factory_obj = self.get_bean(&format!("&{}", name))?;
                if let Some(factory) = self.as_factory_bean(name, &factory_obj) {
                    if factory.eager_product() {
                        self.get_bean(name)?;
                    }
                }
            } else {
                self.get_bean(name)?;
            }
        }

        // 全部非延迟单例就绪后触发 smart-initializing 回调
        for name in &names {
            if !self.singletons.contains_singleton(name) {
                continue;
            }
            let Some(instance) = self.singletons.get_singleton(name)? else {
                continue;
            };
            let mbd = self.get_merged_local_definition(name)?;
            if let Some(class) = self.resolve_bean_class(&mbd, name)? {
                if let Some(caster) = &class.smart_singleton {
                    if let Some(smart) = caster(&instance) {
                        tracing::trace!(
                            "Invoking after-singletons-instantiated callback on bean '{}'",
                            name
                        );
                        smart.after_singletons_instantiated()?;
                    }
                }
            }
        }

        tracing::debug!("Pre-instantiation of singletons completed");
        Ok(())
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<BeanHandle> {
        self.do_get_bean(name, None)
    }

    fn get_bean_with_args(&self, name: &str, args: Vec<BeanHandle>) -> ContainerResult<BeanHandle> {
        self.do_get_bean(name, Some(&args))
    }

    fn contains_bean(&self, name: &str) -> bool {
        let bean_name = self.canonical_name(name);
        if self.definitions.read().contains_key(&bean_name)
            || self.singletons.contains_singleton(&bean_name)
        {
            return true;
        }
        self.parent
            .read()
            .as_ref()
            .map(|p| p.contains_bean(name))
            .unwrap_or(false)
    }

    fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        let bean_name = self.canonical_name(name);
        if let Ok(mbd) = self.get_merged_local_definition(&bean_name) {
            return Ok(mbd.is_singleton());
        }
        if self.singletons.contains_singleton(&bean_name) {
            return Ok(true);
        }
        match self.parent.read().as_ref() {
            Some(parent) => parent.is_singleton(name),
            None => Err(ContainerError::NoSuchBean { name: bean_name }),
        }
    }

    fn is_prototype(&self, name: &str) -> ContainerResult<bool> {
        let bean_name = self.canonical_name(name);
        if let Ok(mbd) = self.get_merged_local_definition(&bean_name) {
            return Ok(mbd.is_prototype());
        }
        if self.singletons.contains_singleton(&bean_name) {
            return Ok(false);
        }
        match self.parent.read().as_ref() {
            Some(parent) => parent.is_prototype(name),
            None => Err(ContainerError::NoSuchBean { name: bean_name }),
        }
    }

    fn is_type_match(&self, name: &str, key: &TypeKey) -> ContainerResult<bool> {
        let bean_name = self.canonical_name(name);
        let deref = is_factory_dereference(name);

        if let Some(instance) = self.singletons.get_singleton_allow_early(&bean_name, false)? {
            if let Some(factory) = self.as_factory_bean(&bean_name, &instance) {
                if !deref {
                    return Ok(factory
                        .product_type()
                        .map(|t| t.id == key.id)
                        .unwrap_or(false));
                }
            }
            if instance.as_ref().type_id() == key.id {
                return Ok(true);
            }
            // 实例具体类型不同时仍可能通过声明的可赋值集匹配
            if let Ok(mbd) = self.get_merged_local_definition(&bean_name) {
                if let Ok(Some(class)) = self.resolve_bean_class(&mbd, &bean_name) {
                    return Ok(class.is_assignable_to(key));
                }
            }
            return Ok(false);
        }

        if let Ok(mbd) = self.get_merged_local_definition(&bean_name) {
            if deref {
                if let Ok(Some(class)) = self.resolve_bean_class(&mbd, &bean_name) {
                    return Ok(class.is_assignable_to(key));
                }
                return Ok(false);
            }
            return Ok(self.definition_matches_type(&bean_name, &mbd, key, false));
        }

        match self.parent.read().as_ref() {
            Some(parent) => parent.is_type_match(name, key),
            None => Err(ContainerError::NoSuchBean { name: bean_name }),
        }
    }

    fn get_type(&self, name: &str) -> ContainerResult<Option<TypeKey>> {
        self.get_type_allow_init(name, true)
    }

    fn get_type_allow_init(
        &self,
        name: &str,
        allow_factory_bean_init: bool,
    ) -> ContainerResult<Option<TypeKey>> {
        let bean_name = self.canonical_name(name);
        let deref = is_factory_dereference(name);

        if let Ok(mbd) = self.get_merged_local_definition(&bean_name) {
            let class = self.resolve_bean_class(&mbd, &bean_name)?;
            let Some(class) = class else {
                return Ok(None);
            };
            if class.factory_bean.is_some() && !deref {
                return self.factory_product_type(&bean_name, allow_factory_bean_init);
            }
            return Ok(Some(class.type_key));
        }

        if self.singletons.contains_singleton(&bean_name) {
            // 无定义的手工注册单例：只有 TypeId 可用
            return Ok(None);
        }

        match self.parent.read().as_ref() {
            Some(parent) => parent.get_type_allow_init(name, allow_factory_bean_init),
            None => Err(ContainerError::NoSuchBean { name: bean_name }),
        }
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let canonical = self.canonical_name(name);
        let mut aliases = Vec::new();
        if canonical != name {
            aliases.push(canonical.clone());
        }
        for alias in self.aliases.get_aliases(&canonical) {
            if alias != name {
                aliases.push(alias);
            }
        }
        aliases
    }
}

impl BeanFactoryExt for DefaultListableBeanFactory {
    fn get_bean_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let name = self.resolve_unique_bean_name(&TypeKey::of::<T>())?;
        self.get_bean_of_type::<T>(&name)
    }

    fn get_bean_by_type_with_args<T: Any + Send + Sync>(
        &self,
        args: Vec<BeanHandle>,
    ) -> ContainerResult<Arc<T>> {
        let name = self.resolve_unique_bean_name(&TypeKey::of::<T>())?;
        downcast_bean(self.get_bean_with_args(&name, args)?)
    }
}

impl DefaultListableBeanFactory {
    /// 按类型定位唯一 Bean 名：单候选直取，多候选唯一 primary 胜出
    pub(crate) fn resolve_unique_bean_name(&self, key: &TypeKey) -> ContainerResult<String> {
        let mut names = self.get_bean_names_for_type(key, true, true);
        match names.len() {
            0 => match self.parent.read().as_ref() {
                Some(parent) => parent.resolve_unique_bean_name(key),
                None => Err(ContainerError::NoSuchBean {
                    name: format!("of type '{}'", key.name),
                }),
            },
            1 => Ok(names.remove(0)),
            _ => {
                let mut primaries: Vec<String> = names
                    .iter()
                    .filter(|n| {
                        self.get_merged_local_definition(n)
                            .map(|m| m.definition.primary)
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();
                match primaries.len() {
                    1 => Ok(primaries.remove(0)),
                    0 => Err(ContainerError::NoUniqueBean {
                        type_name: key.name.to_string(),
                        candidates: names,
                    }),
                    _ => Err(ContainerError::NoUniqueBean {
                        type_name: key.name.to_string(),
                        candidates: primaries,
                    }),
                }
            }
        }
    }

    /// 按类型收集全部 Bean（名称 → 实例，枚举顺序）
    pub fn get_beans_of_type<T: Any + Send + Sync>(
        &self,
    ) -> ContainerResult<IndexMap<String, Arc<T>>> {
        let names = self.get_bean_names_for_type(&TypeKey::of::<T>(), true, true);
        let mut beans = IndexMap::with_capacity(names.len());
        for name in names {
            let bean = self.get_bean_of_type::<T>(&name)?;
            beans.insert(name, bean);
        }
        Ok(beans)
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_definition_names(&self) -> Vec<String> {
        self.definition_names()
    }

    fn contains_bean_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(&self.canonical_name(name))
    }

    fn get_bean_definition_count(&self) -> usize {
        self.definitions.read().len()
    }

    fn get_bean_names_for_type(
        &self,
        key: &TypeKey,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Vec<String> {
        let mut result = Vec::new();

        for name in self.definition_names() {
            let Ok(mbd) = self.get_merged_local_definition(&name) else {
                continue;
            };
            if !include_non_singletons && !mbd.is_singleton() {
                continue;
            }
            if self.definition_matches_type(&name, &mbd, key, allow_eager_init) {
                result.push(name);
                continue;
            }
            // 工厂对象本身匹配时以解引用名参与
            if let Ok(Some(class)) = self.resolve_bean_class(&mbd, &name) {
                if class.factory_bean.is_some() && class.is_assignable_to(key) {
                    result.push(format!("&{}", name));
                }
            }
        }

        // 定义名之后：无定义的手工注册单例
        for name in self.manual_singleton_names() {
            if let Ok(Some(instance)) = self.singletons.get_singleton(&name) {
                if instance.as_ref().type_id() == key.id {
                    result.push(name);
                }
            }
        }

        result
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn register_bean_definition(
        &self,
        name: &str,
        definition: BeanDefinition,
    ) -> ContainerResult<()> {
        definition.validate(name)?;

        tracing::trace!(
            "Attempting to register bean definition: name='{}', class={:?}, scope='{}'",
            name,
            definition.class_name,
            definition.scope
        );

        let exists = self.definitions.read().contains_key(name);
        if exists && !self.allow_definition_overriding.load(Ordering::SeqCst) {
            tracing::warn!("Bean definition '{}' already exists, registration failed", name);
            return Err(ContainerError::definition(
                name,
                "A definition with that name already exists and overriding is disabled",
            ));
        }
        if !exists && self.frozen_names.read().is_some() {
            return Err(ContainerError::definition(
                name,
                "Cannot register new bean definition: configuration is frozen",
            ));
        }
        if exists {
            tracing::info!("Overriding bean definition for bean '{}'", name);
        }

        self.definitions
            .write()
            .insert(name.to_string(), Arc::new(definition));
        self.clear_merged_cache_for(name);
        if exists {
            // 旧定义的单例与产品缓存随定义一起失效
            self.factory_beans.remove(name);
            self.singletons.destroy_singleton(name);
        }
        // 定义与手工单例同名时定义优先参与枚举
        self.manual_singletons.write().retain(|n| n != name);

        tracing::debug!("Bean definition registered: '{}'", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> ContainerResult<()> {
        if self.frozen_names.read().is_some() {
            return Err(ContainerError::definition(
                name,
                "Cannot remove bean definition: configuration is frozen",
            ));
        }
        self.definitions
            .write()
            .shift_remove(name)
            .ok_or_else(|| ContainerError::NoSuchBean {
                name: name.to_string(),
            })?;
        self.clear_merged_cache_for(name);
        self.factory_beans.remove(name);
        self.singletons.destroy_singleton(name);
        tracing::debug!("Bean definition removed: '{}'", name);
        Ok(())
    }

    fn register_alias(&self, name: &str, alias: &str) -> ContainerResult<()> {
        // 别名不得遮蔽既有定义名
        if alias != name && self.definitions.read().contains_key(alias) {
            return Err(ContainerError::definition(
                alias,
                format!(
                    "Cannot register alias '{}' for bean '{}': the alias is already the name of a bean definition",
                    alias, name
                ),
            ));
        }
        self.aliases.register_alias(name, alias)
    }

    fn register_singleton(&self, name: &str, instance: BeanHandle) -> ContainerResult<()> {
        self.singletons.register_singleton(name, instance)?;
        if !self.definitions.read().contains_key(name) {
            let mut manual = self.manual_singletons.write();
            if !manual.iter().any(|n| n == name) {
                manual.push(name.to_string());
            }
        }
        Ok(())
    }

    fn register_scope(&self, name: &str, scope: Arc<dyn Scope>) -> ContainerResult<()> {
        if is_builtin_scope(name) {
            return Err(ContainerError::DefinitionStore {
                name: None,
                message: format!("Cannot replace existing scope '{}'", name),
            });
        }
        let replaced = self.scopes.write().insert(name.to_string(), scope);
        if replaced.is_some() {
            tracing::debug!("Replacing scope handler for scope '{}'", name);
        } else {
            tracing::debug!("Registered scope '{}'", name);
        }
        Ok(())
    }

    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.post_processors.write();
        // 重复注册按最新生效
        processors.retain(|p| !Arc::ptr_eq(p, &processor));
        processors.push(processor);
        sort_post_processors(&mut processors);
    }

    fn get_bean_post_processor_count(&self) -> usize {
        self.post_processors.read().len()
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn pre_instantiate_singletons(&self) -> ContainerResult<()> {
        self.do_pre_instantiate_singletons()
    }

    fn freeze_configuration(&self) {
        let mut frozen = self.frozen_names.write();
        if frozen.is_none() {
            *frozen = Some(self.definitions.read().keys().cloned().collect());
            tracing::debug!("Bean factory configuration frozen");
        }
    }

    fn is_configuration_frozen(&self) -> bool {
        self.frozen_names.read().is_some()
    }

    fn destroy_singletons(&self) {
        tracing::info!("Destroying singleton beans");
        self.factory_beans.clear();
        self.singletons.destroy_singletons();
        self.manual_singletons.write().clear();
        tracing::info!("Singleton beans destruction completed");
    }

    fn destroy_scoped_bean(&self, name: &str) -> ContainerResult<()> {
        let bean_name = self.canonical_name(name);
        let mbd = self.get_merged_local_definition(&bean_name)?;
        if mbd.is_singleton() || mbd.is_prototype() {
            return Err(ContainerError::definition(
                &bean_name,
                "destroy_scoped_bean only applies to custom-scoped beans",
            ));
        }
        let scope_name = mbd.scope().to_string();
        let scope = self
            .scopes
            .read()
            .get(&scope_name)
            .cloned()
            .ok_or_else(|| {
                ContainerError::definition(
                    &bean_name,
                    format!("No scope registered for scope name '{}'", scope_name),
                )
            })?;
        if let Some(instance) = scope.remove(&bean_name) {
            self.destroy_bean(&bean_name, instance)?;
        }
        Ok(())
    }

    fn get_merged_bean_definition(
        &self,
        name: &str,
    ) -> ContainerResult<Arc<MergedBeanDefinition>> {
        let bean_name = self.canonical_name(name);
        if self.definitions.read().contains_key(&bean_name) {
            return self.get_merged_local_definition(&bean_name);
        }
        match self.parent.read().as_ref() {
            Some(parent) => parent.get_merged_bean_definition(name),
            None => Err(ContainerError::NoSuchBean { name: bean_name }),
        }
    }

    fn get_registered_scope_names(&self) -> Vec<String> {
        self.scopes.read().keys().cloned().collect()
    }
}

impl DefaultListableBeanFactory {
    /// 按定义的销毁配置立即销毁给定实例（原型与作用域实例的手动销毁入口）
    pub fn destroy_bean(&self, name: &str, instance: BeanHandle) -> ContainerResult<()> {
        let bean_name = self.canonical_name(name);
        let (destroy_callback, destroy_method, disposable) = match self
            .get_merged_local_definition(&bean_name)
        {
            Ok(mbd) => {
                let class = self.resolve_bean_class(&mbd, &bean_name)?;
                let method = mbd
                    .definition
                    .destroy_method_name
                    .as_ref()
                    .and_then(|m| class.as_ref().and_then(|c| c.method(m)).cloned());
                let disposable = class
                    .as_ref()
                    .and_then(|c| c.disposable.as_ref())
                    .and_then(|caster| caster(&instance));
                (mbd.definition.destroy_callback.clone(), method, disposable)
            }
            Err(_) => (None, None, None),
        };

        let destruction_processors: Vec<Arc<dyn BeanPostProcessor>> = self
            .post_processors
            .read()
            .iter()
            .filter(|p| p.requires_destruction(&instance))
            .cloned()
            .collect();

        let adapter = DisposableBeanAdapter::new(
            bean_name,
            instance,
            disposable,
            destroy_callback,
            destroy_method,
            destruction_processors,
        );
        use crate::lifecycle::DisposableBean as _;
        adapter.destroy()
    }
}

impl std::fmt::Debug for DefaultListableBeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultListableBeanFactory")
            .field("definitions", &self.definitions.read().len())
            .field("singletons", &self.singletons.singleton_count())
            .field("post_processors", &self.post_processors.read().len())
            .field("frozen", &self.frozen_names.read().is_some())
            .finish()
    }
}
