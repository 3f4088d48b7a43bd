//! Bean 作用域
//!
//! 单例与原型由容器内建；其余作用域通过注册 `Scope` 处理器扩展，
//! 由处理器决定实例的存取与销毁时机。

use crate::error::ContainerResult;
use crate::metadata::BeanHandle;

pub use crate::constants::{SCOPE_PROTOTYPE, SCOPE_SINGLETON};

/// 作用域内实例的销毁回调
pub type DestructionCallback = Box<dyn FnOnce() + Send>;

/// 按需创建实例的对象工厂
pub type ObjectFactory<'a> = &'a dyn Fn() -> ContainerResult<BeanHandle>;

/// 自定义作用域处理器
///
/// 容器在遇到非内建作用域的 Bean 定义时，将创建委托给对应的处理器。
/// 处理器负责决定实例的共享范围（如请求、会话、线程等）。
pub trait Scope: Send + Sync {
    /// 返回该作用域下指定名称的实例；不存在时调用 `factory` 创建并保存
    fn get(&self, name: &str, factory: ObjectFactory<'_>) -> ContainerResult<BeanHandle>;

    /// 从作用域中移除并返回指定实例（若存在）
    ///
    /// 移除时不触发销毁回调，调用方决定是否销毁
    fn remove(&self, name: &str) -> Option<BeanHandle>;

    /// 注册实例的销毁回调，作用域结束时由处理器调用
    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback);

    /// 作用域标识（用于日志）
    fn scope_id(&self) -> &str;
}

/// 判断作用域名称是否为容器内建
pub fn is_builtin_scope(scope: &str) -> bool {
    scope.is_empty() || scope == SCOPE_SINGLETON || scope == SCOPE_PROTOTYPE
}
