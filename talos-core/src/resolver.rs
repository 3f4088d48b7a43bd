//! 依赖解析器
//!
//! 给定一个注入点描述，从容器中找出满足它的 Bean（或集合）。
//! 候选过滤、primary / 名称 / 限定符裁决与集合排序都在这里，
//! 延迟注入点得到的是回到同一解析路径的委托。

use std::any::Any;
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;

use crate::bean_factory::{downcast_bean, BeanFactory, DefaultListableBeanFactory, ListableBeanFactory};
use crate::error::{ContainerError, ContainerResult};
use crate::metadata::{BeanHandle, ParameterSpec, PropertySpec, TypeKey};

/// 注入形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyShape {
    /// 单个实例
    Single,
    /// 有序集合：全部可赋值候选，注入为 `Vec<BeanHandle>`
    Multi,
    /// 名称键控映射：注入为 `IndexMap<String, BeanHandle>`（优先级顺序）
    NamedMap,
}

/// 注入点描述
///
/// 携带声明类型、形态与裁决提示；解析成功后缓存命中的 Bean 名，
/// 供重复解析（原型再创建）走捷径。
#[derive(Debug, Clone)]
pub struct DependencyDescriptor {
    pub dependency: TypeKey,
    pub shape: DependencyShape,
    pub required: bool,
    pub qualifier: Option<String>,
    /// 注入点名称（属性名或参数名），参与按名裁决
    pub site_name: Option<String>,
    pub lazy: bool,
    cached_name: OnceLock<String>,
}

impl DependencyDescriptor {
    pub fn new(dependency: TypeKey) -> Self {
        Self {
            dependency,
            shape: DependencyShape::Single,
            required: true,
            qualifier: None,
            site_name: None,
            lazy: false,
            cached_name: OnceLock::new(),
        }
    }

    /// 从构造参数描述构建
    pub fn for_parameter(parameter: &ParameterSpec) -> Self {
        Self {
            dependency: parameter.dependency,
            shape: parameter.shape,
            required: parameter.required,
            qualifier: parameter.qualifier.clone(),
            site_name: parameter.name.clone(),
            lazy: parameter.lazy,
            cached_name: OnceLock::new(),
        }
    }

    /// 从可写属性描述构建（按类型自动装配）
    pub fn for_property(property: &PropertySpec) -> Self {
        Self {
            dependency: property.value_type,
            shape: DependencyShape::Single,
            required: true,
            qualifier: None,
            site_name: Some(property.name.clone()),
            lazy: false,
            cached_name: OnceLock::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn multi(mut self) -> Self {
        self.shape = DependencyShape::Multi;
        self
    }

    pub fn named_map(mut self) -> Self {
        self.shape = DependencyShape::NamedMap;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn at_site(mut self, site: &str) -> Self {
        self.site_name = Some(site.to_string());
        self
    }

    fn cached_bean_name(&self) -> Option<&String> {
        self.cached_name.get()
    }

    fn cache_bean_name(&self, name: &str) {
        let _ = self.cached_name.set(name.to_string());
    }

    /// 懒委托内部使用的非懒副本
    fn eager_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.lazy = false;
        copy.cached_name = OnceLock::new();
        copy
    }
}

/// 延迟注入委托
///
/// 每次 `get()` 都经由依赖解析器重新裁决候选，容器而非注入方决定
/// 最终命中的 Bean。可用于打破提前暴露无法化解的循环。
pub struct BeanProvider {
    factory: Weak<DefaultListableBeanFactory>,
    descriptor: DependencyDescriptor,
    requesting: Option<String>,
}

impl BeanProvider {
    pub(crate) fn new(
        factory: Weak<DefaultListableBeanFactory>,
        descriptor: DependencyDescriptor,
        requesting: Option<&str>,
    ) -> Self {
        Self {
            factory,
            descriptor,
            requesting: requesting.map(|s| s.to_string()),
        }
    }

    fn resolve(&self, required: bool) -> ContainerResult<Option<BeanHandle>> {
        let factory = self.factory.upgrade().ok_or_else(|| {
            ContainerError::Other(anyhow::anyhow!(
                "Bean factory backing this provider has been dropped"
            ))
        })?;
        let mut descriptor = self.descriptor.eager_copy();
        descriptor.required = required;
        factory.resolve_dependency(&descriptor, self.requesting.as_deref())
    }

    /// 解析依赖；无候选时报 no-such-bean
    pub fn get(&self) -> ContainerResult<BeanHandle> {
        self.resolve(true)?
            .ok_or_else(|| ContainerError::NoSuchBean {
                name: format!("of type '{}'", self.descriptor.dependency.name),
            })
    }

    /// 解析并转型
    pub fn get_of_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        downcast_bean(self.get()?)
    }

    /// 无候选时返回 None 而非报错
    pub fn get_if_available(&self) -> ContainerResult<Option<BeanHandle>> {
        self.resolve(false)
    }
}

impl DefaultListableBeanFactory {
    /// 解析一个注入点
    ///
    /// 返回 `Ok(None)` 仅当注入点可选且无候选，或依赖类型被忽略。
    pub fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> ContainerResult<Option<BeanHandle>> {
        if self.is_ignored_dependency(&descriptor.dependency) {
            return Ok(None);
        }

        // 懒注入点：交付解析委托
        if descriptor.lazy {
            let provider = BeanProvider::new(self.weak_self(), descriptor.clone(), requesting);
            return Ok(Some(Arc::new(provider) as BeanHandle));
        }

        match descriptor.shape {
            DependencyShape::Multi => self.resolve_multi(descriptor, requesting),
            DependencyShape::NamedMap => self.resolve_named_map(descriptor, requesting),
            DependencyShape::Single => self.resolve_single(descriptor, requesting),
        }
    }

    /// 候选枚举：可赋值、非自身、`autowire_candidate=true`，按序排列
    pub(crate) fn find_autowire_candidates(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> Vec<String> {
        let mut names = self.get_bean_names_for_type(&descriptor.dependency, true, true);

        let requesting_canonical = requesting.map(|r| self.canonical_name(r));
        names.retain(|name| {
            let canonical = self.canonical_name(name);
            if let Some(requesting) = &requesting_canonical {
                if &canonical == requesting {
                    return false;
                }
            }
            self.get_merged_local_definition(&canonical)
                .map(|m| m.definition.autowire_candidate)
                .unwrap_or(true)
        });

        // 排序：order 声明者在前（升序），其余按注册顺序
        let sort_key = |name: &String| -> (u8, i64, usize) {
            let canonical = self.canonical_name(name);
            let order = self
                .get_merged_local_definition(&canonical)
                .ok()
                .and_then(|m| m.definition.order);
            let index = self.definition_index(&canonical).unwrap_or(usize::MAX);
            match order {
                Some(order) => (0, order as i64, index),
                None => (1, 0, index),
            }
        };
        names.sort_by_key(sort_key);
        names
    }

    fn resolve_multi(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> ContainerResult<Option<BeanHandle>> {
        let candidates = self.find_autowire_candidates(descriptor, requesting);
        if candidates.is_empty() {
            if descriptor.required {
                return Err(ContainerError::NoSuchBean {
                    name: format!("of type '{}' (collection injection)", descriptor.dependency.name),
                });
            }
            return Ok(Some(Arc::new(Vec::<BeanHandle>::new()) as BeanHandle));
        }

        let mut handles: Vec<BeanHandle> = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            handles.push(self.get_bean(candidate)?);
            self.record_dependency_edge(candidate, requesting);
        }
        Ok(Some(Arc::new(handles) as BeanHandle))
    }

    fn resolve_named_map(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> ContainerResult<Option<BeanHandle>> {
        let candidates = self.find_autowire_candidates(descriptor, requesting);
        if candidates.is_empty() {
            if descriptor.required {
                return Err(ContainerError::NoSuchBean {
                    name: format!("of type '{}' (map injection)", descriptor.dependency.name),
                });
            }
            return Ok(Some(
                Arc::new(IndexMap::<String, BeanHandle>::new()) as BeanHandle
            ));
        }

        let mut map: IndexMap<String, BeanHandle> = IndexMap::with_capacity(candidates.len());
        for candidate in &candidates {
            let bean = self.get_bean(candidate)?;
            self.record_dependency_edge(candidate, requesting);
            map.insert(candidate.clone(), bean);
        }
        Ok(Some(Arc::new(map) as BeanHandle))
    }

    fn resolve_single(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> ContainerResult<Option<BeanHandle>> {
        // 捷径：先前解析过且命中名仍有效
        if let Some(cached) = descriptor.cached_bean_name() {
            if self.contains_bean(cached) {
                let bean = self.get_bean(cached)?;
                self.record_dependency_edge(cached, requesting);
                return Ok(Some(bean));
            }
        }

        let candidates = self.find_autowire_candidates(descriptor, requesting);

        if candidates.is_empty() {
            // 容器提供的可解析依赖兜底
            if let Some(value) = self.resolvable_dependency(&descriptor.dependency) {
                return Ok(Some(value));
            }
            if descriptor.required {
                return Err(ContainerError::NoSuchBean {
                    name: format!("of type '{}'", descriptor.dependency.name),
                });
            }
            return Ok(None);
        }

        let winner = if candidates.len() == 1 {
            let mut candidates = candidates;
            candidates.remove(0)
        } else {
            self.determine_autowire_candidate(candidates, descriptor)?
        };

        let bean = self.get_bean(&winner)?;
        self.record_dependency_edge(&winner, requesting);
        descriptor.cache_bean_name(&winner);
        Ok(Some(bean))
    }

    /// 多候选裁决：唯一 primary → 注入点同名候选 → 限定符匹配 → 报歧义
    fn determine_autowire_candidate(
        &self,
        candidates: Vec<String>,
        descriptor: &DependencyDescriptor,
    ) -> ContainerResult<String> {
        let primaries: Vec<&String> = candidates
            .iter()
            .filter(|name| {
                self.get_merged_local_definition(&self.canonical_name(name))
                    .map(|m| m.definition.primary)
                    .unwrap_or(false)
            })
            .collect();
        match primaries.len() {
            1 => return Ok(primaries[0].clone()),
            0 => {}
            _ => {
                return Err(ContainerError::NoUniqueBean {
                    type_name: descriptor.dependency.name.to_string(),
                    candidates: primaries.into_iter().cloned().collect(),
                });
            }
        }

        if let Some(site) = &descriptor.site_name {
            for candidate in &candidates {
                if candidate == site || self.get_aliases(candidate).iter().any(|a| a == site) {
                    return Ok(candidate.clone());
                }
            }
        }

        if let Some(qualifier) = &descriptor.qualifier {
            let qualified: Vec<&String> = candidates
                .iter()
                .filter(|candidate| {
                    if *candidate == qualifier {
                        return true;
                    }
                    self.get_merged_local_definition(&self.canonical_name(candidate))
                        .map(|m| m.definition.qualifier.as_deref() == Some(qualifier.as_str()))
                        .unwrap_or(false)
                })
                .collect();
            if qualified.len() == 1 {
                return Ok(qualified[0].clone());
            }
        }

        Err(ContainerError::NoUniqueBean {
            type_name: descriptor.dependency.name.to_string(),
            candidates,
        })
    }

    fn record_dependency_edge(&self, chosen: &str, requesting: Option<&str>) {
        if let Some(requesting) = requesting {
            self.singleton_registry()
                .register_dependent_bean(&self.canonical_name(chosen), &self.canonical_name(requesting));
        }
    }
}
