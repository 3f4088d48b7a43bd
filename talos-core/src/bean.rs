//! Bean 定义模型
//!
//! BeanDefinition 描述如何创建并管理一个 Bean：构造配方、作用域、
//! 依赖声明、属性值与生命周期回调。定义可声明父定义，查找时沿父链
//! 合并成 MergedBeanDefinition 后供创建引擎使用。

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use crate::config::ConfigValue;
use crate::constants::{SCOPE_PROTOTYPE, SCOPE_SINGLETON};
use crate::error::{ContainerError, ContainerResult};
use crate::metadata::{BeanClass, BeanHandle};

/// 生命周期回调类型
///
/// 回调收到共享引用；需要写入的状态由 Bean 类型自身以内部可变性承载。
pub type InitCallback =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;
pub type DestroyCallback =
    Arc<dyn Fn(&(dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync>;

/// 实例供应器：绕过构造解析直接提供实例
pub type InstanceSupplier = Arc<dyn Fn() -> ContainerResult<BeanHandle> + Send + Sync>;

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireMode {
    /// 不自动装配，只应用显式属性值
    #[default]
    No,
    /// 按属性名查找同名 Bean 注入
    ByName,
    /// 按属性类型通过依赖解析器注入
    ByType,
    /// 构造函数注入
    Constructor,
}

/// Bean 角色（只影响报告与日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeanRole {
    #[default]
    Application,
    Support,
    Infrastructure,
}

/// 属性值 / 构造参数的值来源
#[derive(Clone)]
pub enum ValueSpec {
    /// 字符串字面量：先经字符串解析器，再经类型转换器
    Literal(String),
    /// 已类型化的配置值
    Value(ConfigValue),
    /// 对另一个 Bean 的名称引用
    Reference(String),
    /// 名称引用列表，注入为有序集合
    ReferenceList(Vec<String>),
    /// 内嵌定义（inner bean），随外层 Bean 创建与销毁
    NestedDefinition(Arc<BeanDefinition>),
    /// 预构建实例，原样注入
    Instance(BeanHandle),
    /// 请求依赖解析器按声明类型装配
    Autowired,
}

impl ValueSpec {
    /// 解析结果是否可缓存（稳定值，原型重复创建可复用）
    pub fn is_cacheable(&self) -> bool {
        matches!(self, ValueSpec::Literal(_) | ValueSpec::Value(_))
    }
}

impl std::fmt::Debug for ValueSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSpec::Literal(s) => write!(f, "Literal({:?})", s),
            ValueSpec::Value(v) => write!(f, "Value({:?})", v),
            ValueSpec::Reference(r) => write!(f, "Reference({:?})", r),
            ValueSpec::ReferenceList(rs) => write!(f, "ReferenceList({:?})", rs),
            ValueSpec::NestedDefinition(_) => write!(f, "NestedDefinition"),
            ValueSpec::Instance(_) => write!(f, "Instance"),
            ValueSpec::Autowired => write!(f, "Autowired"),
        }
    }
}

/// 单个属性值
pub struct PropertyValue {
    pub name: String,
    pub value: ValueSpec,
    /// 已解析并转换的值缓存（仅对稳定值填充）
    converted: OnceLock<BeanHandle>,
}

impl std::fmt::Debug for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyValue")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: ValueSpec) -> Self {
        Self {
            name: name.into(),
            value,
            converted: OnceLock::new(),
        }
    }

    pub fn converted(&self) -> Option<BeanHandle> {
        self.converted.get().cloned()
    }

    pub fn cache_converted(&self, value: BeanHandle) {
        let _ = self.converted.set(value);
    }
}

/// 属性值集合（按名唯一，保持声明顺序）
///
/// 条目以 Arc 共享：工作副本与合并定义指向同一缓存，
/// 原型的重复创建因此能复用已转换的稳定值。
#[derive(Clone, Default)]
pub struct PropertyValues {
    values: Vec<Arc<PropertyValue>>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性值，同名条目被替换
    pub fn add(&mut self, name: impl Into<String>, value: ValueSpec) -> &mut Self {
        self.add_property_value(PropertyValue::new(name, value));
        self
    }

    pub fn add_property_value(&mut self, pv: PropertyValue) {
        if let Some(existing) = self.values.iter_mut().find(|v| v.name == pv.name) {
            *existing = Arc::new(pv);
        } else {
            self.values.push(Arc::new(pv));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PropertyValue>> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PropertyValue>> {
        self.values.iter()
    }

    pub fn property_names(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 以 parent 为底板合并：parent 独有的条目排在前面，self 覆盖同名
    pub fn merge_from(&mut self, parent: &PropertyValues) {
        let mut merged: Vec<Arc<PropertyValue>> = parent
            .values
            .iter()
            .filter(|pv| !self.contains(&pv.name))
            .cloned()
            .collect();
        merged.append(&mut self.values);
        self.values = merged;
    }
}

impl std::fmt::Debug for PropertyValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.values.iter().map(|v| &v.name)).finish()
    }
}

/// 单个构造参数值
#[derive(Debug, Clone)]
pub struct ConstructorArgumentValue {
    pub value: ValueSpec,
    /// 参数名提示（匹配具名参数）
    pub name: Option<String>,
    /// 类型名提示（匹配参数声明类型）
    pub type_name: Option<String>,
}

impl ConstructorArgumentValue {
    pub fn new(value: ValueSpec) -> Self {
        Self {
            value,
            name: None,
            type_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }
}

/// 构造参数集合：按位置索引的值 + 泛化值
#[derive(Debug, Clone, Default)]
pub struct ConstructorArgumentValues {
    indexed: BTreeMap<usize, ConstructorArgumentValue>,
    generic: Vec<ConstructorArgumentValue>,
}

impl ConstructorArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_indexed(&mut self, index: usize, value: ConstructorArgumentValue) -> &mut Self {
        self.indexed.insert(index, value);
        self
    }

    pub fn add_generic(&mut self, value: ConstructorArgumentValue) -> &mut Self {
        self.generic.push(value);
        self
    }

    pub fn get_indexed(&self, index: usize) -> Option<&ConstructorArgumentValue> {
        self.indexed.get(&index)
    }

    /// 按参数名或类型名匹配一个泛化值
    pub fn get_generic(
        &self,
        param_name: Option<&str>,
        type_name: &str,
    ) -> Option<&ConstructorArgumentValue> {
        self.generic.iter().find(|v| {
            let name_ok = match (&v.name, param_name) {
                (Some(n), Some(p)) => n == p,
                (Some(_), None) => false,
                (None, _) => true,
            };
            let type_ok = v
                .type_name
                .as_deref()
                .map(|t| t == type_name)
                .unwrap_or(true);
            name_ok && type_ok
        })
    }

    pub fn count(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    /// 最大的显式位置索引 + 1（参与候选构造的最小参数数判断）
    pub fn min_parameter_count(&self) -> usize {
        self.indexed
            .keys()
            .max()
            .map(|i| i + 1)
            .unwrap_or(0)
            .max(self.generic.len())
    }

    pub fn merge_from(&mut self, parent: &ConstructorArgumentValues) {
        for (index, value) in &parent.indexed {
            self.indexed.entry(*index).or_insert_with(|| value.clone());
        }
        let mut merged = parent.generic.clone();
        merged.append(&mut self.generic);
        self.generic = merged;
    }
}

/// Bean 定义 - 描述如何创建和管理 Bean
#[derive(Clone)]
pub struct BeanDefinition {
    /// 类名（在 ClassRegistry 中解析）；已附加类型记录时可为空
    pub class_name: Option<String>,

    /// 已解析的类型记录
    pub bean_class: Option<Arc<BeanClass>>,

    /// 父定义名：沿父链继承并覆盖字段
    pub parent_name: Option<String>,

    /// 作用域名称；空串继承父定义，最终默认单例
    pub scope: String,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy_init: bool,

    /// 必须先于本 Bean 完整创建的名称列表（销毁时顺序相反）
    pub depends_on: Vec<String>,

    /// 自动装配模式
    pub autowire_mode: AutowireMode,

    /// 是否开启依赖检查：可写属性未被赋值时报错
    pub dependency_check: bool,

    /// 多候选裁决时优先
    pub primary: bool,

    /// 是否参与按类型自动装配
    pub autowire_candidate: bool,

    /// 限定符
    pub qualifier: Option<String>,

    /// 排序值（集合注入与多候选排序）
    pub order: Option<i32>,

    /// 工厂 Bean 名称 + 工厂方法：在该 Bean 实例上调用方法产出实例
    pub factory_bean_name: Option<String>,

    /// 工厂方法名；无 factory_bean_name 时为本类的静态工厂方法
    pub factory_method_name: Option<String>,

    /// 实例供应器，优先于其他构造配方
    pub instance_supplier: Option<InstanceSupplier>,

    /// 构造参数值
    pub constructor_args: ConstructorArgumentValues,

    /// 属性值
    pub property_values: PropertyValues,

    /// 初始化回调（在属性填充完成后调用）
    pub init_callback: Option<InitCallback>,

    /// 具名初始化方法
    pub init_method_name: Option<String>,

    /// 找不到具名初始化方法时是否报错
    pub enforce_init_method: bool,

    /// 销毁回调
    pub destroy_callback: Option<DestroyCallback>,

    /// 具名销毁方法
    pub destroy_method_name: Option<String>,

    /// 找不到具名销毁方法时是否报错
    pub enforce_destroy_method: bool,

    /// 方法注入覆盖：声明的方法必须存在于类型记录中
    pub lookup_overrides: Vec<String>,

    /// Bean 角色
    pub role: BeanRole,

    /// 框架合成的定义不参与实例阶段处理器
    pub synthetic: bool,

    /// 供处理器使用的属性袋
    pub attributes: HashMap<String, String>,

    /// 来源描述（错误信息中携带）
    pub resource_description: Option<String>,
}

impl BeanDefinition {
    pub fn new() -> Self {
        Self {
            class_name: None,
            bean_class: None,
            parent_name: None,
            scope: String::new(),
            lazy_init: false,
            depends_on: Vec::new(),
            autowire_mode: AutowireMode::No,
            dependency_check: false,
            primary: false,
            autowire_candidate: true,
            qualifier: None,
            order: None,
            factory_bean_name: None,
            factory_method_name: None,
            instance_supplier: None,
            constructor_args: ConstructorArgumentValues::new(),
            property_values: PropertyValues::new(),
            init_callback: None,
            init_method_name: None,
            enforce_init_method: false,
            destroy_callback: None,
            destroy_method_name: None,
            enforce_destroy_method: false,
            lookup_overrides: Vec::new(),
            role: BeanRole::Application,
            synthetic: false,
            attributes: HashMap::new(),
            resource_description: None,
        }
    }

    /// 以类名创建定义
    pub fn for_class_name(class_name: impl Into<String>) -> Self {
        let mut def = Self::new();
        def.class_name = Some(class_name.into());
        def
    }

    /// 以已解析的类型记录创建定义
    pub fn for_class(class: Arc<BeanClass>) -> Self {
        let mut def = Self::new();
        def.class_name = Some(class.class_name.clone());
        def.bean_class = Some(class);
        def
    }

    /// 以实例供应器创建定义
    pub fn from_supplier<F>(supplier: F) -> Self
    where
        F: Fn() -> ContainerResult<BeanHandle> + Send + Sync + 'static,
    {
        let mut def = Self::new();
        def.instance_supplier = Some(Arc::new(supplier));
        def
    }

    // ---------- builder 风格设置 ----------

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_name = Some(parent.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn singleton(self) -> Self {
        self.with_scope(SCOPE_SINGLETON)
    }

    pub fn prototype(self) -> Self {
        self.with_scope(SCOPE_PROTOTYPE)
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy_init = lazy;
        self
    }

    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn with_autowire(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = mode;
        self
    }

    pub fn with_dependency_check(mut self, check: bool) -> Self {
        self.dependency_check = check;
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_factory_method(
        mut self,
        factory_bean_name: Option<String>,
        method_name: impl Into<String>,
    ) -> Self {
        self.factory_bean_name = factory_bean_name;
        self.factory_method_name = Some(method_name.into());
        self
    }

    pub fn with_constructor_args(mut self, args: ConstructorArgumentValues) -> Self {
        self.constructor_args = args;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: ValueSpec) -> Self {
        self.property_values.add(name, value);
        self
    }

    pub fn with_init<F>(mut self, init_fn: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.init_callback = Some(Arc::new(init_fn));
        self
    }

    pub fn with_init_method(mut self, name: impl Into<String>, enforce: bool) -> Self {
        self.init_method_name = Some(name.into());
        self.enforce_init_method = enforce;
        self
    }

    pub fn with_destroy<F>(mut self, destroy_fn: F) -> Self
    where
        F: Fn(&(dyn Any + Send + Sync)) -> ContainerResult<()> + Send + Sync + 'static,
    {
        self.destroy_callback = Some(Arc::new(destroy_fn));
        self
    }

    pub fn with_destroy_method(mut self, name: impl Into<String>, enforce: bool) -> Self {
        self.destroy_method_name = Some(name.into());
        self.enforce_destroy_method = enforce;
        self
    }

    pub fn with_role(mut self, role: BeanRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_synthetic(mut self, synthetic: bool) -> Self {
        self.synthetic = synthetic;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_resource_description(mut self, desc: impl Into<String>) -> Self {
        self.resource_description = Some(desc.into());
        self
    }

    // ---------- 查询 ----------

    pub fn is_singleton(&self) -> bool {
        self.scope.is_empty() || self.scope == SCOPE_SINGLETON
    }

    pub fn is_prototype(&self) -> bool {
        self.scope == SCOPE_PROTOTYPE
    }

    /// 校验定义自身的一致性
    ///
    /// 每个可解析的定义必须恰好有一种构造配方。
    pub fn validate(&self, name: &str) -> ContainerResult<()> {
        if self.instance_supplier.is_some() && self.factory_method_name.is_some() {
            return Err(ContainerError::definition(
                name,
                "Cannot combine an instance supplier with a factory method",
            ));
        }
        if self.factory_bean_name.is_some() && self.factory_method_name.is_none() {
            return Err(ContainerError::definition(
                name,
                "A factory bean name requires a factory method name",
            ));
        }
        if self.instance_supplier.is_none()
            && self.class_name.is_none()
            && self.bean_class.is_none()
            && self.factory_bean_name.is_none()
            && self.parent_name.is_none()
        {
            return Err(ContainerError::definition(
                name,
                "Definition carries neither a class, a factory recipe nor a parent",
            ));
        }
        if !self.lookup_overrides.is_empty()
            && self.class_name.is_none()
            && self.bean_class.is_none()
        {
            return Err(ContainerError::definition(
                name,
                "Method overrides require a resolvable class",
            ));
        }
        Ok(())
    }

    /// 父定义字段打底，self 的显式字段覆盖，产出合并后的定义
    pub(crate) fn merged_onto(&self, parent: &BeanDefinition) -> BeanDefinition {
        let mut merged = parent.clone();
        merged.parent_name = None;

        if self.class_name.is_some() {
            merged.class_name = self.class_name.clone();
            merged.bean_class = self.bean_class.clone();
        }
        if !self.scope.is_empty() {
            merged.scope = self.scope.clone();
        }
        merged.lazy_init = self.lazy_init;
        if !self.depends_on.is_empty() {
            merged.depends_on = self.depends_on.clone();
        }
        if self.autowire_mode != AutowireMode::No {
            merged.autowire_mode = self.autowire_mode;
        }
        merged.dependency_check = self.dependency_check;
        merged.primary = self.primary;
        merged.autowire_candidate = self.autowire_candidate;
        if self.qualifier.is_some() {
            merged.qualifier = self.qualifier.clone();
        }
        if self.order.is_some() {
            merged.order = self.order;
        }
        if self.factory_method_name.is_some() {
            merged.factory_bean_name = self.factory_bean_name.clone();
            merged.factory_method_name = self.factory_method_name.clone();
        }
        if self.instance_supplier.is_some() {
            merged.instance_supplier = self.instance_supplier.clone();
        }

        let mut ctor_args = self.constructor_args.clone();
        ctor_args.merge_from(&parent.constructor_args);
        merged.constructor_args = ctor_args;

        let mut pvs = self.property_values.clone();
        pvs.merge_from(&parent.property_values);
        merged.property_values = pvs;

        if self.init_callback.is_some() {
            merged.init_callback = self.init_callback.clone();
        }
        if self.init_method_name.is_some() {
            merged.init_method_name = self.init_method_name.clone();
            merged.enforce_init_method = self.enforce_init_method;
        }
        if self.destroy_callback.is_some() {
            merged.destroy_callback = self.destroy_callback.clone();
        }
        if self.destroy_method_name.is_some() {
            merged.destroy_method_name = self.destroy_method_name.clone();
            merged.enforce_destroy_method = self.enforce_destroy_method;
        }
        if !self.lookup_overrides.is_empty() {
            merged.lookup_overrides = self.lookup_overrides.clone();
        }
        merged.role = self.role;
        merged.synthetic = self.synthetic;

        for (k, v) in &self.attributes {
            merged.attributes.insert(k.clone(), v.clone());
        }
        if self.resource_description.is_some() {
            merged.resource_description = self.resource_description.clone();
        }

        merged
    }
}

impl Default for BeanDefinition {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("class_name", &self.class_name)
            .field("parent_name", &self.parent_name)
            .field("scope", &self.scope)
            .field("lazy_init", &self.lazy_init)
            .field("depends_on", &self.depends_on)
            .field("autowire_mode", &self.autowire_mode)
            .field("primary", &self.primary)
            .field("factory_method", &self.factory_method_name)
            .field("properties", &self.property_values)
            .finish()
    }
}

/// 合并定义：沿父链叠加后的定义视图，附带按合并定义粒度的缓存
pub struct MergedBeanDefinition {
    pub definition: BeanDefinition,
    /// 合并定义处理器是否已运行（每个合并定义恰好一次）
    pub(crate) post_processed: AtomicBool,
    /// 已解析的构造函数下标（原型重复创建复用）
    pub(crate) resolved_constructor: OnceLock<usize>,
    /// 已解析的工厂方法下标
    pub(crate) resolved_factory_method: OnceLock<usize>,
}

impl MergedBeanDefinition {
    pub fn new(definition: BeanDefinition) -> Self {
        Self {
            definition,
            post_processed: AtomicBool::new(false),
            resolved_constructor: OnceLock::new(),
            resolved_factory_method: OnceLock::new(),
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.definition.is_singleton()
    }

    pub fn is_prototype(&self) -> bool {
        self.definition.is_prototype()
    }

    pub fn scope(&self) -> &str {
        if self.definition.scope.is_empty() {
            SCOPE_SINGLETON
        } else {
            &self.definition.scope
        }
    }
}

impl std::fmt::Debug for MergedBeanDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedBeanDefinition")
            .field("definition", &self.definition)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_values_replace_by_name() {
        let mut pvs = PropertyValues::new();
        pvs.add("url", ValueSpec::Literal("first".into()));
        pvs.add("url", ValueSpec::Literal("second".into()));

        assert_eq!(pvs.len(), 1);
        match &pvs.get("url").unwrap().value {
            ValueSpec::Literal(s) => assert_eq!(s, "second"),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn merge_overlays_child_over_parent() {
        let parent = BeanDefinition::for_class_name("app.Base")
            .singleton()
            .with_property("timeout", ValueSpec::Literal("30".into()))
            .with_property("name", ValueSpec::Literal("base".into()));

        let child = BeanDefinition::new()
            .with_parent("base")
            .prototype()
            .with_property("name", ValueSpec::Literal("child".into()));

        let merged = child.merged_onto(&parent);
        assert_eq!(merged.class_name.as_deref(), Some("app.Base"));
        assert!(merged.is_prototype());
        assert_eq!(merged.property_values.len(), 2);
        match &merged.property_values.get("name").unwrap().value {
            ValueSpec::Literal(s) => assert_eq!(s, "child"),
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn validate_rejects_recipe_conflicts() {
        let def = BeanDefinition::from_supplier(|| {
            Ok(Arc::new(0_u8) as BeanHandle)
        })
        .with_factory_method(None, "create");

        assert!(def.validate("conflicted").is_err());
    }

    #[test]
    fn validate_rejects_empty_definition() {
        assert!(BeanDefinition::new().validate("empty").is_err());
    }

    #[test]
    fn constructor_args_generic_matching() {
        let mut args = ConstructorArgumentValues::new();
        args.add_generic(
            ConstructorArgumentValue::new(ValueSpec::Literal("8080".into())).named("port"),
        );

        assert!(args.get_generic(Some("port"), "i64").is_some());
        assert!(args.get_generic(Some("host"), "i64").is_none());
    }
}
