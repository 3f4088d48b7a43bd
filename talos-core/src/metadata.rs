//! 类型元数据服务
//!
//! 容器不依赖运行时反射：每个可实例化的类型以 `BeanClass` 记录的形式
//! 注册到 `ClassRegistry`，声明自己的构造函数、可写属性、具名方法与
//! 能力转换器。核心逻辑只面向这层窄接口，测试时可以用手工构造的
//! `BeanClass` 替代真实类型。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ContainerError, ContainerResult};
use crate::factory_bean::FactoryBean;
use crate::lifecycle::{
    BeanFactoryPostProcessor, BeanDefinitionRegistryPostProcessor, BeanPostProcessor,
    DisposableBean, SmartInitializingSingleton,
};
use crate::resolver::DependencyShape;

/// 容器中流转的实例句柄
pub type BeanHandle = Arc<dyn Any + Send + Sync>;

/// 名义类型标记
///
/// `TypeId` 用于匹配，`name` 用于日志与错误信息。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeKey {
    /// 取类型 T 的标记；T 可以是具体类型或 `dyn Trait`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// 构造函数调用
pub type ConstructorFn =
    Arc<dyn Fn(&[BeanHandle]) -> ContainerResult<BeanHandle> + Send + Sync>;

/// 具名方法调用：实例方法收到 `Some(target)`，静态方法收到 `None`
pub type MethodFn = Arc<
    dyn Fn(Option<&BeanHandle>, &[BeanHandle]) -> ContainerResult<Option<BeanHandle>>
        + Send
        + Sync,
>;

/// 属性赋值：目标以共享引用传入，需要写入的字段由类型自身提供内部可变性
pub type PropertySetter =
    Arc<dyn Fn(&(dyn Any + Send + Sync), BeanHandle) -> ContainerResult<()> + Send + Sync>;

/// Aware 回调：在初始化第一步收到自身名称与所属工厂
pub type AwareFn = Arc<
    dyn Fn(&(dyn Any + Send + Sync), &AwareContext<'_>) -> ContainerResult<()> + Send + Sync,
>;

/// Aware 回调上下文
pub struct AwareContext<'a> {
    pub bean_name: &'a str,
    pub factory: &'a crate::bean_factory::DefaultListableBeanFactory,
}

/// 构造函数参数描述
#[derive(Clone)]
pub struct ParameterSpec {
    /// 参数名（用于按名匹配显式参数值与注入点命名裁决）
    pub name: Option<String>,
    /// 依赖类型
    pub dependency: TypeKey,
    /// 注入形态：单值或集合
    pub shape: DependencyShape,
    /// 是否必需；非必需参数解析不到候选时传入占位空值由调用方处理
    pub required: bool,
    /// 限定符
    pub qualifier: Option<String>,
    /// 是否延迟注入（注入解析器委托而非立即解析）
    pub lazy: bool,
}

impl ParameterSpec {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: None,
            dependency: TypeKey::of::<T>(),
            shape: DependencyShape::Single,
            required: true,
            qualifier: None,
            lazy: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn shape(mut self, shape: DependencyShape) -> Self {
        self.shape = shape;
        self
    }
}

/// 构造函数描述
#[derive(Clone)]
pub struct ConstructorSpec {
    pub parameters: Vec<ParameterSpec>,
    pub public: bool,
    pub invoke: ConstructorFn,
}

impl ConstructorSpec {
    pub fn new<F>(parameters: Vec<ParameterSpec>, invoke: F) -> Self
    where
        F: Fn(&[BeanHandle]) -> ContainerResult<BeanHandle> + Send + Sync + 'static,
    {
        Self {
            parameters,
            public: true,
            invoke: Arc::new(invoke),
        }
    }

    pub fn non_public(mut self) -> Self {
        self.public = false;
        self
    }
}

/// 具名方法描述（init/destroy 目标、lookup 目标与工厂方法）
#[derive(Clone)]
pub struct MethodSpec {
    pub name: String,
    pub is_static: bool,
    /// 工厂方法的参数表；init/destroy 方法为空
    pub parameters: Vec<ParameterSpec>,
    pub invoke: MethodFn,
}

impl MethodSpec {
    /// 无参实例方法（init/destroy/lookup 目标）
    pub fn instance<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&BeanHandle) -> ContainerResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            is_static: false,
            parameters: Vec::new(),
            invoke: Arc::new(move |target, _args| {
                let target = target.ok_or_else(|| {
                    ContainerError::Other(anyhow::anyhow!(
                        "instance method invoked without a target"
                    ))
                })?;
                invoke(target)?;
                Ok(None)
            }),
        }
    }

    /// 实例工厂方法：在目标对象上调用并返回产品
    pub fn factory<F>(
        name: impl Into<String>,
        parameters: Vec<ParameterSpec>,
        invoke: F,
    ) -> Self
    where
        F: Fn(&BeanHandle, &[BeanHandle]) -> ContainerResult<BeanHandle> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            is_static: false,
            parameters,
            invoke: Arc::new(move |target, args| {
                let target = target.ok_or_else(|| {
                    ContainerError::Other(anyhow::anyhow!(
                        "factory method invoked without a target"
                    ))
                })?;
                invoke(target, args).map(Some)
            }),
        }
    }

    /// 静态工厂方法
    pub fn static_factory<F>(
        name: impl Into<String>,
        parameters: Vec<ParameterSpec>,
        invoke: F,
    ) -> Self
    where
        F: Fn(&[BeanHandle]) -> ContainerResult<BeanHandle> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            is_static: true,
            parameters,
            invoke: Arc::new(move |_target, args| invoke(args).map(Some)),
        }
    }
}

/// 可写属性描述
#[derive(Clone)]
pub struct PropertySpec {
    pub name: String,
    pub value_type: TypeKey,
    /// 简单值属性（字符串、数字等）不参与按名/按类型自动装配
    pub simple: bool,
    pub set: PropertySetter,
}

impl PropertySpec {
    /// 引用其他 Bean 的属性
    pub fn bean<T: ?Sized + 'static, F>(name: impl Into<String>, set: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync), BeanHandle) -> ContainerResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            value_type: TypeKey::of::<T>(),
            simple: false,
            set: Arc::new(set),
        }
    }

    /// 简单值属性
    pub fn simple<T: ?Sized + 'static, F>(name: impl Into<String>, set: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync), BeanHandle) -> ContainerResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            value_type: TypeKey::of::<T>(),
            simple: true,
            set: Arc::new(set),
        }
    }
}

// ==================== 能力转换器 ====================
//
// Arc<dyn Any> 无法向上转型为任意 trait 对象，能力以显式注册的
// 转换闭包表达：声明了某能力的类型提供「句柄 -> 能力对象」的转换。

pub type FactoryBeanCaster =
    Arc<dyn Fn(&BeanHandle) -> Option<Arc<dyn FactoryBean>> + Send + Sync>;
pub type PostProcessorCaster =
    Arc<dyn Fn(&BeanHandle) -> Option<Arc<dyn BeanPostProcessor>> + Send + Sync>;
pub type FactoryPostProcessorCaster =
    Arc<dyn Fn(&BeanHandle) -> Option<Arc<dyn BeanFactoryPostProcessor>> + Send + Sync>;
pub type RegistryPostProcessorCaster =
    Arc<dyn Fn(&BeanHandle) -> Option<Arc<dyn BeanDefinitionRegistryPostProcessor>> + Send + Sync>;
pub type SmartSingletonCaster =
    Arc<dyn Fn(&BeanHandle) -> Option<Arc<dyn SmartInitializingSingleton>> + Send + Sync>;
pub type DisposableCaster =
    Arc<dyn Fn(&BeanHandle) -> Option<Arc<dyn DisposableBean>> + Send + Sync>;

/// Bean 类型记录
///
/// 相当于一个「类」的全部容器可见信息。
#[derive(Clone)]
pub struct BeanClass {
    /// 注册键（类全名）
    pub class_name: String,
    /// 具体类型标记
    pub type_key: TypeKey,
    /// 额外可赋值类型（trait 契约等），参与按类型匹配
    pub assignable: Vec<TypeKey>,
    pub constructors: Vec<ConstructorSpec>,
    pub methods: Vec<MethodSpec>,
    pub properties: Vec<PropertySpec>,
    pub factory_bean: Option<FactoryBeanCaster>,
    pub post_processor: Option<PostProcessorCaster>,
    pub factory_post_processor: Option<FactoryPostProcessorCaster>,
    pub registry_post_processor: Option<RegistryPostProcessorCaster>,
    pub smart_singleton: Option<SmartSingletonCaster>,
    pub disposable: Option<DisposableCaster>,
    pub aware: Option<AwareFn>,
}

impl BeanClass {
    /// 创建类型 T 的记录
    pub fn of<T: Any + Send + Sync>(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            type_key: TypeKey::of::<T>(),
            assignable: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            factory_bean: None,
            post_processor: None,
            factory_post_processor: None,
            registry_post_processor: None,
            smart_singleton: None,
            disposable: None,
            aware: None,
        }
    }

    /// 声明该类型可按 U 注入（trait 契约）
    pub fn assignable_to<U: ?Sized + 'static>(mut self) -> Self {
        self.assignable.push(TypeKey::of::<U>());
        self
    }

    pub fn with_constructor(mut self, constructor: ConstructorSpec) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn with_method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_aware<F>(mut self, aware: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync), &AwareContext<'_>) -> ContainerResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.aware = Some(Arc::new(aware));
        self
    }

    /// 声明实例实现 FactoryBean：以该名称查找时发布其产品
    pub fn as_factory_bean<T>(mut self) -> Self
    where
        T: FactoryBean + Any + Send + Sync,
    {
        self.factory_bean = Some(Arc::new(|handle: &BeanHandle| {
            handle
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn FactoryBean>)
        }));
        self
    }

    /// 声明实例实现 BeanPostProcessor
    pub fn as_post_processor<T>(mut self) -> Self
    where
        T: BeanPostProcessor + Any + Send + Sync,
    {
        self.post_processor = Some(Arc::new(|handle: &BeanHandle| {
            handle
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn BeanPostProcessor>)
        }));
        self
    }

    /// 声明实例实现 BeanFactoryPostProcessor
    pub fn as_factory_post_processor<T>(mut self) -> Self
    where
        T: BeanFactoryPostProcessor + Any + Send + Sync,
    {
        self.factory_post_processor = Some(Arc::new(|handle: &BeanHandle| {
            handle
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn BeanFactoryPostProcessor>)
        }));
        self
    }

    /// 声明实例实现 BeanDefinitionRegistryPostProcessor
    pub fn as_registry_post_processor<T>(mut self) -> Self
    where
        T: BeanDefinitionRegistryPostProcessor + Any + Send + Sync,
    {
        self.registry_post_processor = Some(Arc::new(|handle: &BeanHandle| {
            handle
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn BeanDefinitionRegistryPostProcessor>)
        }));
        self
    }

    /// 声明实例实现 SmartInitializingSingleton
    pub fn as_smart_singleton<T>(mut self) -> Self
    where
        T: SmartInitializingSingleton + Any + Send + Sync,
    {
        self.smart_singleton = Some(Arc::new(|handle: &BeanHandle| {
            handle
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn SmartInitializingSingleton>)
        }));
        self
    }

    /// 声明实例实现 DisposableBean
    pub fn as_disposable<T>(mut self) -> Self
    where
        T: DisposableBean + Any + Send + Sync,
    {
        self.disposable = Some(Arc::new(|handle: &BeanHandle| {
            handle
                .clone()
                .downcast::<T>()
                .ok()
                .map(|a| a as Arc<dyn DisposableBean>)
        }));
        self
    }

    /// 按名称查找方法
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// 按名称查找可写属性
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// 是否可按 key 类型注入
    pub fn is_assignable_to(&self, key: &TypeKey) -> bool {
        self.type_key.id == key.id || self.assignable.iter().any(|a| a.id == key.id)
    }
}

impl std::fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanClass")
            .field("class_name", &self.class_name)
            .field("type", &self.type_key.name)
            .field("constructors", &self.constructors.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// 类注册表
///
/// 类名到 `BeanClass` 的映射；临时覆盖层用于类型探测，
/// 预实例化开始前必须移除。
pub struct ClassRegistry {
    classes: RwLock<HashMap<String, Arc<BeanClass>>>,
    temporary: RwLock<Option<HashMap<String, Arc<BeanClass>>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            temporary: RwLock::new(None),
        }
    }

    /// 注册类型记录；同名重复注册时替换并记录日志
    pub fn register(&self, class: BeanClass) {
        let name = class.class_name.clone();
        let replaced = self
            .classes
            .write()
            .insert(name.clone(), Arc::new(class))
            .is_some();
        if replaced {
            tracing::debug!("Class '{}' re-registered, previous record replaced", name);
        } else {
            tracing::trace!("Class '{}' registered", name);
        }
    }

    /// 加载类型记录，临时覆盖层优先
    pub fn load(&self, class_name: &str) -> ContainerResult<Arc<BeanClass>> {
        if let Some(temp) = self.temporary.read().as_ref() {
            if let Some(class) = temp.get(class_name) {
                return Ok(Arc::clone(class));
            }
        }
        self.classes
            .read()
            .get(class_name)
            .cloned()
            .ok_or_else(|| ContainerError::DefinitionStore {
                name: None,
                message: format!("Unknown class '{}'", class_name),
            })
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.read().contains_key(class_name)
            || self
                .temporary
                .read()
                .as_ref()
                .map(|t| t.contains_key(class_name))
                .unwrap_or(false)
    }

    /// 安装类型探测用的临时覆盖层
    pub fn install_temporary(&self, classes: HashMap<String, Arc<BeanClass>>) {
        *self.temporary.write() = Some(classes);
    }

    /// 移除临时覆盖层（预实例化开始前调用）
    pub fn clear_temporary(&self) {
        if self.temporary.write().take().is_some() {
            tracing::debug!("Temporary class overlay removed");
        }
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 从参数表中取出第 index 个参数并向下转型
///
/// 构造函数与工厂方法闭包的取参辅助。
pub fn arg<T: Any + Send + Sync>(args: &[BeanHandle], index: usize) -> ContainerResult<Arc<T>> {
    let handle = args.get(index).cloned().ok_or_else(|| {
        ContainerError::Other(anyhow::anyhow!("missing argument at index {}", index))
    })?;
    handle
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            found: "unknown".to_string(),
        })
}
