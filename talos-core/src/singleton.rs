//! 单例注册表
//!
//! 循环引用处理的核心：三段缓存（成品 / 早期工厂 / 已具化的早期引用）
//! 加上创建中集合，保证每个单例恰好创建一次，并让创建中的 Bean 能以
//! 早期引用的形式被相互注入。
//!
//! 单例互斥锁是可重入的：创建线程在工厂回调里递归获取依赖时再次进入
//! 注册表，而其他线程在同名 Bean 创建完成前阻塞等待。扩展创建流程的
//! 调用方必须经由本注册表的锁，避免与延迟初始化产生死锁。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::error::{ContainerError, ContainerResult, SUPPRESSED_EXCEPTIONS_LIMIT};
use crate::lifecycle::DisposableBean;
use crate::metadata::BeanHandle;

/// 早期暴露工厂：按需给出原始实例或其包装
pub type EarlyFactory = Box<dyn FnOnce() -> ContainerResult<BeanHandle> + Send>;

#[derive(Default)]
struct SingletonState {
    /// 完整构造并初始化的单例
    finished: HashMap<String, BeanHandle>,

    /// 构造已开始、属性填充前登记的早期工厂
    early_factories: HashMap<String, EarlyFactory>,

    /// 已向外交付过的早期引用（工厂结果的记忆化）
    early_refs: HashMap<String, BeanHandle>,

    /// 发布顺序（枚举与销毁的迭代来源）
    registered: Vec<String>,

    /// 正在创建的名称
    in_creation: HashSet<String>,

    /// 不参与创建中检查的名称（类型探测等）
    in_creation_excluded: HashSet<String>,

    /// 当前单例创建尝试中压制的同伴错误
    suppressed: Option<Vec<ContainerError>>,

    /// 全局销毁标志；置位后拒绝创建，直到下一次刷新
    in_destruction: bool,
}

/// 单例注册表
pub struct SingletonRegistry {
    state: ReentrantMutex<RefCell<SingletonState>>,

    /// dependents[A] = 依赖 A 的 Bean（销毁时先于 A 销毁）
    dependents: RwLock<HashMap<String, Vec<String>>>,

    /// dependencies[B] = B 依赖的 Bean（与 dependents 成对维护）
    dependencies: RwLock<HashMap<String, Vec<String>>>,

    /// 外层 Bean -> 内嵌 Bean
    contained: RwLock<HashMap<String, Vec<String>>>,

    /// 注册的销毁适配器（登记顺序即反向销毁顺序的依据）
    disposables: Mutex<IndexMap<String, Box<dyn DisposableBean>>>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(SingletonState::default())),
            dependents: RwLock::new(HashMap::new()),
            dependencies: RwLock::new(HashMap::new()),
            contained: RwLock::new(HashMap::new()),
            disposables: Mutex::new(IndexMap::new()),
        }
    }

    // ==================== 查找 ====================

    /// 非创建式查找，允许经由早期工厂具化早期引用
    pub fn get_singleton(&self, name: &str) -> ContainerResult<Option<BeanHandle>> {
        self.get_singleton_allow_early(name, true)
    }

    /// 非创建式查找
    ///
    /// 1. 成品缓存命中直接返回；
    /// 2. 创建中且早期引用已具化则返回之；
    /// 3. `allow_early` 时在锁内调用早期工厂，结果记忆化后返回；
    /// 4. 其余情况返回 None。
    pub fn get_singleton_allow_early(
        &self,
        name: &str,
        allow_early: bool,
    ) -> ContainerResult<Option<BeanHandle>> {
        let guard = self.state.lock();

        {
            let state = guard.borrow();
            if let Some(bean) = state.finished.get(name) {
                return Ok(Some(bean.clone()));
            }
            if !state.in_creation.contains(name) {
                return Ok(None);
            }
            if let Some(early) = state.early_refs.get(name) {
                return Ok(Some(early.clone()));
            }
            if !allow_early {
                return Ok(None);
            }
        }

        let factory = guard.borrow_mut().early_factories.remove(name);
        match factory {
            Some(factory) => {
                // 工厂在锁内求值，所有观察者看到同一个引用
                let early = factory()?;
                guard
                    .borrow_mut()
                    .early_refs
                    .insert(name.to_string(), early.clone());
                tracing::trace!("Early reference for singleton bean '{}' materialized", name);
                Ok(Some(early))
            }
            None => Ok(None),
        }
    }

    /// 获取或创建单例
    ///
    /// 创建全程持有单例互斥锁；`factory` 内部的递归查找因锁可重入而不受影响。
    pub fn get_or_create(
        &self,
        name: &str,
        factory: impl FnOnce() -> ContainerResult<BeanHandle>,
    ) -> ContainerResult<BeanHandle> {
        let guard = self.state.lock();

        {
            let state = guard.borrow();
            if let Some(bean) = state.finished.get(name) {
                return Ok(bean.clone());
            }
            if state.in_destruction {
                tracing::warn!(
                    "Singleton bean '{}' requested while the registry is destroying singletons",
                    name
                );
                return Err(ContainerError::CreationNotAllowed {
                    name: name.to_string(),
                });
            }
        }

        self.before_singleton_creation_locked(&guard, name)?;

        let record_suppressed = {
            let mut state = guard.borrow_mut();
            if state.suppressed.is_none() {
                state.suppressed = Some(Vec::new());
                true
            } else {
                false
            }
        };

        let outcome = factory();

        let outcome = match outcome {
            Ok(bean) => Ok(bean),
            Err(err) => {
                // 工厂失败后成品却已出现：其他创建路径隐式完成了注册
                let appeared = guard.borrow().finished.get(name).cloned();
                match appeared {
                    Some(bean) => Ok(bean),
                    None => {
                        let related = if record_suppressed {
                            guard
                                .borrow_mut()
                                .suppressed
                                .take()
                                .unwrap_or_default()
                        } else {
                            Vec::new()
                        };
                        Err(err.with_related(related))
                    }
                }
            }
        };

        if record_suppressed {
            guard.borrow_mut().suppressed = None;
        }

        self.after_singleton_creation_locked(&guard, name);

        match outcome {
            Ok(bean) => {
                self.add_singleton_locked(&guard, name, bean.clone());
                Ok(bean)
            }
            Err(err) => Err(err),
        }
    }

    // ==================== 创建中簿记 ====================

    fn before_singleton_creation_locked(
        &self,
        guard: &parking_lot::ReentrantMutexGuard<'_, RefCell<SingletonState>>,
        name: &str,
    ) -> ContainerResult<()> {
        let mut state = guard.borrow_mut();
        if state.in_creation_excluded.contains(name) {
            return Ok(());
        }
        if !state.in_creation.insert(name.to_string()) {
            return Err(ContainerError::CurrentlyInCreation {
                name: name.to_string(),
                detail: "Requested bean is currently in creation: is there an unresolvable circular reference?".to_string(),
            });
        }
        Ok(())
    }

    fn after_singleton_creation_locked(
        &self,
        guard: &parking_lot::ReentrantMutexGuard<'_, RefCell<SingletonState>>,
        name: &str,
    ) {
        let mut state = guard.borrow_mut();
        if !state.in_creation_excluded.contains(name) && !state.in_creation.remove(name) {
            tracing::error!("Singleton '{}' was not marked as in creation", name);
        }
    }

    fn add_singleton_locked(
        &self,
        guard: &parking_lot::ReentrantMutexGuard<'_, RefCell<SingletonState>>,
        name: &str,
        bean: BeanHandle,
    ) {
        let mut state = guard.borrow_mut();
        state.finished.insert(name.to_string(), bean);
        state.early_factories.remove(name);
        state.early_refs.remove(name);
        if !state.registered.iter().any(|n| n == name) {
            state.registered.push(name.to_string());
        }
    }

    /// 预注册单例实例（不经创建流程，不触发任何创建回调）
    pub fn register_singleton(&self, name: &str, bean: BeanHandle) -> ContainerResult<()> {
        let guard = self.state.lock();
        if guard.borrow().finished.contains_key(name) {
            return Err(ContainerError::DefinitionStore {
                name: Some(name.to_string()),
                message: "Could not register singleton: a singleton under that name already exists"
                    .to_string(),
            });
        }
        self.add_singleton_locked(&guard, name, bean);
        tracing::debug!("Singleton instance '{}' registered", name);
        Ok(())
    }

    /// 登记早期暴露工厂（原始构造之后、属性填充之前）
    pub fn add_early_factory(&self, name: &str, factory: EarlyFactory) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if !state.finished.contains_key(name) {
            state.early_factories.insert(name.to_string(), factory);
            state.early_refs.remove(name);
        }
    }

    /// 早期引用是否已经被具化交付
    ///
    /// 区别于「工厂是否登记过」：只有真正交付过引用的 Bean 才会在
    /// 包装冲突时触发创建中错误。
    pub fn was_early_reference_taken(&self, name: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.early_refs.contains_key(name)
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.finished.contains_key(name)
    }

    /// 已发布单例的名称（发布顺序）
    pub fn singleton_names(&self) -> Vec<String> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.registered.clone()
    }

    pub fn singleton_count(&self) -> usize {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.registered.len()
    }

    pub fn is_in_creation(&self, name: &str) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.in_creation.contains(name)
    }

    /// 在持有单例互斥锁的情况下执行闭包
    ///
    /// 扩展创建流程（如 FactoryBean 产品缓存）经由此入口串行化。
    pub fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.state.lock();
        f()
    }

    /// 创建前簿记的公开入口（扩展创建流程使用）
    pub fn before_singleton_creation(&self, name: &str) -> ContainerResult<()> {
        let guard = self.state.lock();
        self.before_singleton_creation_locked(&guard, name)
    }

    /// 创建后簿记的公开入口
    pub fn after_singleton_creation(&self, name: &str) {
        let guard = self.state.lock();
        self.after_singleton_creation_locked(&guard, name);
    }

    /// 将名称排除出创建中检查（类型探测等场景）
    pub fn set_in_creation_excluded(&self, name: &str, excluded: bool) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if excluded {
            state.in_creation_excluded.insert(name.to_string());
        } else {
            state.in_creation_excluded.remove(name);
        }
    }

    /// 记录当前单例创建尝试中的同伴错误（最多 100 条）
    pub fn register_suppressed(&self, err: ContainerError) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if let Some(suppressed) = state.suppressed.as_mut() {
            if suppressed.len() < SUPPRESSED_EXCEPTIONS_LIMIT {
                suppressed.push(err);
            }
        }
    }

    pub fn is_in_destruction(&self) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.in_destruction
    }

    /// 新一轮刷新前复位销毁闩锁
    pub fn clear_after_refresh(&self) {
        let guard = self.state.lock();
        guard.borrow_mut().in_destruction = false;
    }

    // ==================== 依赖边 ====================

    /// 登记依赖边：dependent 依赖 name（调用方已做名称规范化）
    pub fn register_dependent_bean(&self, name: &str, dependent: &str) {
        {
            let mut dependents = self.dependents.write();
            let entry = dependents.entry(name.to_string()).or_default();
            if entry.iter().any(|d| d == dependent) {
                return;
            }
            entry.push(dependent.to_string());
        }
        let mut dependencies = self.dependencies.write();
        let entry = dependencies.entry(dependent.to_string()).or_default();
        if !entry.iter().any(|d| d == name) {
            entry.push(name.to_string());
        }
    }

    /// dependent 是否（传递地）依赖 name
    pub fn is_dependent(&self, name: &str, dependent: &str) -> bool {
        let dependents = self.dependents.read();
        let mut visited = HashSet::new();
        Self::is_dependent_locked(&dependents, name, dependent, &mut visited)
    }

    fn is_dependent_locked(
        map: &HashMap<String, Vec<String>>,
        name: &str,
        dependent: &str,
        visited: &mut HashSet<String>,
    ) -> bool {
        if !visited.insert(name.to_string()) {
            return false;
        }
        let Some(direct) = map.get(name) else {
            return false;
        };
        if direct.iter().any(|d| d == dependent) {
            return true;
        }
        direct
            .iter()
            .any(|d| Self::is_dependent_locked(map, d, dependent, visited))
    }

    pub fn has_dependents(&self, name: &str) -> bool {
        self.dependents
            .read()
            .get(name)
            .map(|d| !d.is_empty())
            .unwrap_or(false)
    }

    pub fn get_dependents(&self, name: &str) -> Vec<String> {
        self.dependents.read().get(name).cloned().unwrap_or_default()
    }

    pub fn get_dependencies(&self, name: &str) -> Vec<String> {
        self.dependencies
            .read()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// 登记内嵌 Bean：外层销毁先于内嵌
    pub fn register_contained_bean(&self, contained: &str, containing: &str) {
        {
            let mut map = self.contained.write();
            let entry = map.entry(containing.to_string()).or_default();
            if !entry.iter().any(|c| c == contained) {
                entry.push(contained.to_string());
            }
        }
        self.register_dependent_bean(contained, containing);
    }

    // ==================== 销毁 ====================

    /// 注册销毁适配器
    pub fn register_disposable(&self, name: &str, disposable: Box<dyn DisposableBean>) {
        self.disposables.lock().insert(name.to_string(), disposable);
    }

    /// 销毁全部单例
    ///
    /// 按登记逆序逐个销毁；每个 Bean 先递归销毁其 dependents。
    /// 完成后注册表保持拒绝创建状态，直到下一次刷新。
    pub fn destroy_singletons(&self) {
        tracing::debug!("Destroying singletons");
        {
            let guard = self.state.lock();
            guard.borrow_mut().in_destruction = true;
        }

        let names: Vec<String> = {
            let disposables = self.disposables.lock();
            disposables.keys().rev().cloned().collect()
        };
        for name in names {
            self.destroy_singleton(&name);
        }

        self.contained.write().clear();
        self.dependents.write().clear();
        self.dependencies.write().clear();

        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.finished.clear();
        state.early_factories.clear();
        state.early_refs.clear();
        state.registered.clear();
    }

    /// 销毁单个单例并移除全部缓存条目
    pub fn destroy_singleton(&self, name: &str) {
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            state.finished.remove(name);
            state.early_factories.remove(name);
            state.early_refs.remove(name);
            state.registered.retain(|n| n != name);
        }

        let disposable = self.disposables.lock().shift_remove(name);
        self.destroy_bean(name, disposable);
    }

    /// 执行销毁：先 dependents，再自身，再内嵌 Bean，最后清理边
    pub fn destroy_bean(&self, name: &str, disposable: Option<Box<dyn DisposableBean>>) {
        let dependents = self.dependents.write().remove(name);
        if let Some(dependents) = dependents {
            tracing::trace!(
                "Destroying dependents {:?} of bean '{}' first",
                dependents,
                name
            );
            for dependent in dependents {
                self.destroy_singleton(&dependent);
            }
        }

        if let Some(disposable) = disposable {
            if let Err(e) = disposable.destroy() {
                // 销毁错误不传播，避免一个 Bean 阻断其余销毁
                tracing::error!("Destruction of bean '{}' threw an error: {}", name, e);
            }
        }

        let contained = self.contained.write().remove(name);
        if let Some(contained) = contained {
            for inner in contained {
                self.destroy_singleton(&inner);
            }
        }

        {
            let mut dependents = self.dependents.write();
            for list in dependents.values_mut() {
                list.retain(|d| d != name);
            }
            dependents.retain(|_, list| !list.is_empty());
        }
        self.dependencies.write().remove(name);
    }
}

impl Default for SingletonRegistry {
    fn default() -> Self {
        Self::new()
    }
}
