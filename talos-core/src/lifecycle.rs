//! 生命周期扩展点
//!
//! 两族处理器：定义阶段处理器在刷新期间运行一次，可以改写或追加
//! Bean 定义；实例阶段处理器挂接到每个 Bean 创建的固定生命周期点。
//! 实例阶段的钩子全部带默认实现，处理器按需覆盖自己关心的能力，
//! 不依赖类型层次分派。

use std::sync::Arc;

use crate::bean::{DestroyCallback, MergedBeanDefinition, PropertyValues};
use crate::bean_factory::DefaultListableBeanFactory;
use crate::error::ContainerResult;
use crate::metadata::{BeanClass, BeanHandle, MethodSpec, TypeKey};

/// 处理器排序档位
///
/// 优先档在前，同档内按 `order()` 升序，再按注册顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderingPhase {
    PriorityOrdered,
    Ordered,
    Unordered,
}

/// BeanPostProcessor trait
///
/// 在 Bean 创建生命周期的各个阶段提供钩子，允许观察或替换实例。
///
/// 使用场景：
/// - 代理包装（在 `after_initialization` 或 `get_early_reference` 中替换实例）
/// - 注解风格的成员注入（在 `process_properties` 中补充属性值）
/// - 实例化短路（在 `before_instantiation` 中返回预制对象）
pub trait BeanPostProcessor: Send + Sync {
    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }

    /// 获取处理器的优先级（数字越小优先级越高）
    fn order(&self) -> i32 {
        1000
    }

    /// 排序档位
    fn phase(&self) -> OrderingPhase {
        OrderingPhase::Unordered
    }

    /// 在不实例化的情况下预测该定义最终发布的类型
    fn predict_type(&self, _class: &BeanClass, _bean_name: &str) -> Option<TypeKey> {
        None
    }

    /// 返回候选构造函数（`BeanClass::constructors` 的下标）；返回 Some 即生效
    fn determine_constructors(&self, _class: &BeanClass, _bean_name: &str) -> Option<Vec<usize>> {
        None
    }

    /// 提前暴露时获取早期引用；可以返回包装后的实例（如代理）
    fn get_early_reference(
        &self,
        bean: BeanHandle,
        _bean_name: &str,
    ) -> ContainerResult<BeanHandle> {
        Ok(bean)
    }

    /// 实例化之前调用；返回 Some 则以该对象作为成品 Bean，跳过常规创建
    fn before_instantiation(
        &self,
        _class: &BeanClass,
        _bean_name: &str,
    ) -> ContainerResult<Option<BeanHandle>> {
        Ok(None)
    }

    /// 实例化之后、属性填充之前调用；返回 false 则跳过属性填充
    fn after_instantiation(&self, _bean: &BeanHandle, _bean_name: &str) -> ContainerResult<bool> {
        Ok(true)
    }

    /// 属性填充前处理属性值集合
    ///
    /// 返回 Some(替换值) 时后续处理器看到替换后的集合；
    /// 返回 None 短路整个属性填充。
    fn process_properties(
        &self,
        pvs: PropertyValues,
        _bean: &BeanHandle,
        _bean_name: &str,
    ) -> ContainerResult<Option<PropertyValues>> {
        Ok(Some(pvs))
    }

    /// 合并定义确定后调用，每个合并定义恰好一次（用于缓存注入元数据）
    fn process_merged_definition(
        &self,
        _definition: &MergedBeanDefinition,
        _bean_name: &str,
    ) -> ContainerResult<()> {
        Ok(())
    }

    /// 在 Bean 初始化回调之前调用
    ///
    /// 返回 None 中止处理器链，已有结果生效
    fn before_initialization(
        &self,
        bean: BeanHandle,
        _bean_name: &str,
    ) -> ContainerResult<Option<BeanHandle>> {
        Ok(Some(bean))
    }

    /// 在 Bean 初始化回调之后调用
    ///
    /// 典型用途：创建代理、包装 Bean。返回 None 中止处理器链。
    fn after_initialization(
        &self,
        bean: BeanHandle,
        _bean_name: &str,
    ) -> ContainerResult<Option<BeanHandle>> {
        Ok(Some(bean))
    }

    /// 是否需要在销毁前收到回调
    fn requires_destruction(&self, _bean: &BeanHandle) -> bool {
        false
    }

    /// 销毁实例之前调用
    fn before_destruction(&self, _bean: &BeanHandle, _bean_name: &str) -> ContainerResult<()> {
        Ok(())
    }
}

/// BeanFactoryPostProcessor trait
///
/// 在所有 Bean 定义加载完成后、任何 Bean 实例化之前执行，
/// 只应修改既有定义，不应触发 Bean 创建。
pub trait BeanFactoryPostProcessor: Send + Sync {
    fn name(&self) -> &str {
        "BeanFactoryPostProcessor"
    }

    fn order(&self) -> i32 {
        1000
    }

    fn phase(&self) -> OrderingPhase {
        OrderingPhase::Unordered
    }

    fn post_process_bean_factory(
        &self,
        factory: &DefaultListableBeanFactory,
    ) -> ContainerResult<()>;
}

/// 可以向注册表追加新定义的定义阶段处理器
///
/// 刷新驱动会迭代调用直到不再出现新的此类处理器。
pub trait BeanDefinitionRegistryPostProcessor: BeanFactoryPostProcessor {
    fn post_process_definition_registry(
        &self,
        factory: &DefaultListableBeanFactory,
    ) -> ContainerResult<()>;
}

/// 所有非延迟单例实例化完成后的回调
pub trait SmartInitializingSingleton: Send + Sync {
    fn after_singletons_instantiated(&self) -> ContainerResult<()>;
}

/// 销毁回调契约
pub trait DisposableBean: Send + Sync {
    fn destroy(&self) -> ContainerResult<()>;
}

/// 销毁适配器
///
/// 把定义声明的销毁方式（回调、具名方法、DisposableBean 契约）与
/// 销毁感知处理器统一为一个 `DisposableBean`。销毁错误只记录日志，
/// 不向外传播，单个 Bean 的失败不阻止其余 Bean 销毁。
pub struct DisposableBeanAdapter {
    bean_name: String,
    bean: BeanHandle,
    disposable: Option<Arc<dyn DisposableBean>>,
    destroy_callback: Option<DestroyCallback>,
    destroy_method: Option<MethodSpec>,
    processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl DisposableBeanAdapter {
    pub fn new(
        bean_name: impl Into<String>,
        bean: BeanHandle,
        disposable: Option<Arc<dyn DisposableBean>>,
        destroy_callback: Option<DestroyCallback>,
        destroy_method: Option<MethodSpec>,
        processors: Vec<Arc<dyn BeanPostProcessor>>,
    ) -> Self {
        Self {
            bean_name: bean_name.into(),
            bean,
            disposable,
            destroy_callback,
            destroy_method,
            processors,
        }
    }

    /// 实例句柄（销毁排序与作用域回调使用）
    pub fn bean(&self) -> &BeanHandle {
        &self.bean
    }
}

impl DisposableBean for DisposableBeanAdapter {
    fn destroy(&self) -> ContainerResult<()> {
        for processor in &self.processors {
            if let Err(e) = processor.before_destruction(&self.bean, &self.bean_name) {
                tracing::warn!(
                    "Destruction-aware processor '{}' failed for bean '{}': {}",
                    processor.name(),
                    self.bean_name,
                    e
                );
            }
        }

        if let Some(disposable) = &self.disposable {
            if let Err(e) = disposable.destroy() {
                tracing::warn!("Destroy contract failed for bean '{}': {}", self.bean_name, e);
            }
        }

        if let Some(callback) = &self.destroy_callback {
            if let Err(e) = callback(self.bean.as_ref()) {
                tracing::warn!("Destroy callback failed for bean '{}': {}", self.bean_name, e);
            }
        }

        if let Some(method) = &self.destroy_method {
            if let Err(e) = (method.invoke)(Some(&self.bean), &[]) {
                tracing::warn!(
                    "Destroy method '{}' failed for bean '{}': {}",
                    method.name,
                    self.bean_name,
                    e
                );
            }
        }

        tracing::debug!("Bean '{}' destroyed", self.bean_name);
        Ok(())
    }
}

/// 按（档位，order，注册顺序）稳定排序处理器
pub fn sort_post_processors(processors: &mut [Arc<dyn BeanPostProcessor>]) {
    processors.sort_by_key(|p| (p.phase(), p.order()));
}
