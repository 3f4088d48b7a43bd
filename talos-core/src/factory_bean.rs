//! FactoryBean - 产品式 Bean 工厂
//!
//! 实现此契约的 Bean 以其「产品」而非自身对外发布：按名称查找得到
//! `produce()` 的结果，带 `&` 前缀查找才得到工厂对象本身。
//! 单例工厂的产品在工厂名下单独缓存，与工厂实例互不混淆。

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ContainerResult;
use crate::metadata::{BeanHandle, TypeKey};
use crate::singleton::SingletonRegistry;

pub use crate::constants::FACTORY_BEAN_PREFIX;

/// FactoryBean 契约
pub trait FactoryBean: Send + Sync {
    /// 创建产品实例
    fn produce(&self) -> ContainerResult<BeanHandle>;

    /// 产品类型（可确定时）；参与按类型查找
    fn product_type(&self) -> Option<TypeKey> {
        None
    }

    /// 产品是否单例：单例产品按工厂名缓存
    fn is_singleton(&self) -> bool {
        true
    }

    /// 预实例化阶段是否连同产品一起急加载
    fn eager_product(&self) -> bool {
        false
    }
}

/// 剥离名称上的工厂解引用前缀
pub fn transformed_bean_name(name: &str) -> &str {
    let mut stripped = name;
    while let Some(rest) = stripped.strip_prefix(FACTORY_BEAN_PREFIX) {
        stripped = rest;
    }
    stripped
}

/// 名称是否请求工厂对象本身
pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_BEAN_PREFIX)
}

/// FactoryBean 产品缓存
pub struct FactoryBeanRegistry {
    cache: RwLock<HashMap<String, BeanHandle>>,
}

impl FactoryBeanRegistry {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 读取已缓存的产品
    pub fn get_cached(&self, name: &str) -> Option<BeanHandle> {
        self.cache.read().get(name).cloned()
    }

    /// 取得工厂的产品
    ///
    /// 单例工厂且工厂实例已是成品单例时，产品在单例互斥锁内创建并缓存；
    /// 首次产出经过 `post_process`（除非调用方声明无需后处理）。工厂仍在
    /// 创建中时的重入查找拿到未后处理的原始产品，且不会进入缓存。
    pub fn object_from_factory(
        &self,
        factory: &Arc<dyn FactoryBean>,
        name: &str,
        singletons: &SingletonRegistry,
        should_post_process: bool,
        post_process: impl Fn(BeanHandle, &str) -> ContainerResult<BeanHandle>,
    ) -> ContainerResult<BeanHandle> {
        if factory.is_singleton() && singletons.contains_singleton(name) {
            singletons.with_lock(|| {
                if let Some(cached) = self.cache.read().get(name) {
                    return Ok(cached.clone());
                }

                let mut object = factory.produce()?;
                tracing::debug!("FactoryBean '{}' produced its singleton product", name);

                // produce 的回调可能重入并抢先缓存
                if let Some(raced) = self.cache.read().get(name) {
                    return Ok(raced.clone());
                }

                if should_post_process {
                    if singletons.is_in_creation(name) {
                        // 重入：原样交付，不后处理也不缓存
                        return Ok(object);
                    }
                    singletons.before_singleton_creation(name)?;
                    let processed = post_process(object, name);
                    singletons.after_singleton_creation(name);
                    object = processed?;
                }

                if singletons.contains_singleton(name) {
                    self.cache.write().insert(name.to_string(), object.clone());
                }
                Ok(object)
            })
        } else {
            let object = factory.produce()?;
            if should_post_process {
                return post_process(object, name);
            }
            Ok(object)
        }
    }

    /// 随工厂单例销毁一起移除产品缓存
    pub fn remove(&self, name: &str) {
        self.cache.write().remove(name);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

impl Default for FactoryBeanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        produced: AtomicUsize,
        singleton: bool,
    }

    impl FactoryBean for CountingFactory {
        fn produce(&self) -> ContainerResult<BeanHandle> {
            let n = self.produced.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(n) as BeanHandle)
        }

        fn is_singleton(&self) -> bool {
            self.singleton
        }
    }

    #[test]
    fn transformed_name_strips_prefix() {
        assert_eq!(transformed_bean_name("&factory"), "factory");
        assert_eq!(transformed_bean_name("&&factory"), "factory");
        assert_eq!(transformed_bean_name("plain"), "plain");
        assert!(is_factory_dereference("&factory"));
        assert!(!is_factory_dereference("plain"));
    }

    #[test]
    fn singleton_product_cached_per_factory_name() {
        let singletons = SingletonRegistry::new();
        let factory: Arc<dyn FactoryBean> = Arc::new(CountingFactory {
            produced: AtomicUsize::new(0),
            singleton: true,
        });
        singletons
            .register_singleton("factory", Arc::new(()) as BeanHandle)
            .unwrap();

        let registry = FactoryBeanRegistry::new();
        let first = registry
            .object_from_factory(&factory, "factory", &singletons, true, |b, _| Ok(b))
            .unwrap();
        let second = registry
            .object_from_factory(&factory, "factory", &singletons, true, |b, _| Ok(b))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn prototype_product_created_each_time() {
        let singletons = SingletonRegistry::new();
        let factory: Arc<dyn FactoryBean> = Arc::new(CountingFactory {
            produced: AtomicUsize::new(0),
            singleton: false,
        });

        let registry = FactoryBeanRegistry::new();
        let first = registry
            .object_from_factory(&factory, "factory", &singletons, true, |b, _| Ok(b))
            .unwrap();
        let second = registry
            .object_from_factory(&factory, "factory", &singletons, true, |b, _| Ok(b))
            .unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn reentrant_lookup_returns_raw_uncached_product() {
        let singletons = SingletonRegistry::new();
        let factory: Arc<dyn FactoryBean> = Arc::new(CountingFactory {
            produced: AtomicUsize::new(0),
            singleton: true,
        });
        singletons
            .register_singleton("factory", Arc::new(()) as BeanHandle)
            .unwrap();
        // 模拟工厂产品的首次查找发生在它自身仍在创建中时
        singletons.before_singleton_creation("factory").unwrap();

        let registry = FactoryBeanRegistry::new();
        let raw = registry
            .object_from_factory(&factory, "factory", &singletons, true, |_, _| {
                panic!("post-processing must not run for re-entrant lookups")
            })
            .unwrap();

        assert!(registry.get_cached("factory").is_none());
        drop(raw);
        singletons.after_singleton_creation("factory");
    }
}
