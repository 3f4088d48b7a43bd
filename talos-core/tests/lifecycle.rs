//! Lifecycle plumbing: post-processor hooks and ordering, factory-bean
//! product caching, custom scopes, smart-initializing singletons and
//! destruction behavior.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use talos_core::prelude::*;
use talos_core::scope::DestructionCallback;
use talos_core::{ContainerError, OrderingPhase};

type EventLog = Arc<Mutex<Vec<String>>>;

fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

struct Probe;

fn probe_class() -> BeanClass {
    BeanClass::of::<Probe>("app.Probe")
        .with_constructor(ConstructorSpec::new(vec![], |_| Ok(Arc::new(Probe) as BeanHandle)))
}

struct RecordingProcessor {
    label: &'static str,
    order: i32,
    phase: OrderingPhase,
    log: EventLog,
}

impl BeanPostProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        self.label
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn phase(&self) -> OrderingPhase {
        self.phase
    }

    fn before_initialization(
        &self,
        bean: BeanHandle,
        bean_name: &str,
    ) -> ContainerResult<Option<BeanHandle>> {
        self.log
            .lock()
            .push(format!("{}:before:{}", self.label, bean_name));
        Ok(Some(bean))
    }

    fn after_initialization(
        &self,
        bean: BeanHandle,
        bean_name: &str,
    ) -> ContainerResult<Option<BeanHandle>> {
        self.log
            .lock()
            .push(format!("{}:after:{}", self.label, bean_name));
        Ok(Some(bean))
    }
}

#[test]
fn processors_run_in_phase_then_order() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(probe_class());

    factory.add_bean_post_processor(Arc::new(RecordingProcessor {
        label: "late",
        order: 10,
        phase: OrderingPhase::Unordered,
        log: log.clone(),
    }));
    factory.add_bean_post_processor(Arc::new(RecordingProcessor {
        label: "priority",
        order: 500,
        phase: OrderingPhase::PriorityOrdered,
        log: log.clone(),
    }));
    factory.add_bean_post_processor(Arc::new(RecordingProcessor {
        label: "ordered",
        order: 1,
        phase: OrderingPhase::Ordered,
        log: log.clone(),
    }));

    factory
        .register_bean_definition("probe", BeanDefinition::for_class_name("app.Probe").singleton())
        .unwrap();
    factory.get_bean("probe").unwrap();

    let events = log.lock().clone();
    assert_eq!(
        events,
        vec![
            "priority:before:probe",
            "ordered:before:probe",
            "late:before:probe",
            "priority:after:probe",
            "ordered:after:probe",
            "late:after:probe",
        ]
    );
}

#[test]
fn full_initialization_sequence() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();

    let aware_log = log.clone();
    let init_method_log = log.clone();
    factory.register_class(
        BeanClass::of::<Probe>("app.Probe")
            .with_constructor(ConstructorSpec::new(vec![], |_| {
                Ok(Arc::new(Probe) as BeanHandle)
            }))
            .with_aware(move |_, ctx| {
                aware_log.lock().push(format!("aware:{}", ctx.bean_name));
                Ok(())
            })
            .with_method(MethodSpec::instance("startup", move |_| {
                init_method_log.lock().push("initMethod".to_string());
                Ok(())
            })),
    );

    factory.add_bean_post_processor(Arc::new(RecordingProcessor {
        label: "pp",
        order: 0,
        phase: OrderingPhase::Unordered,
        log: log.clone(),
    }));

    let callback_log = log.clone();
    factory
        .register_bean_definition(
            "probe",
            BeanDefinition::for_class_name("app.Probe")
                .singleton()
                .with_init(move |_| {
                    callback_log.lock().push("initCallback".to_string());
                    Ok(())
                })
                .with_init_method("startup", true),
        )
        .unwrap();

    factory.get_bean("probe").unwrap();

    let events = log.lock().clone();
    assert_eq!(
        events,
        vec![
            "aware:probe",
            "pp:before:probe",
            "initCallback",
            "initMethod",
            "pp:after:probe",
        ]
    );
}

#[test]
fn missing_enforced_init_method_fails() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(probe_class());
    factory
        .register_bean_definition(
            "probe",
            BeanDefinition::for_class_name("app.Probe")
                .singleton()
                .with_init_method("nope", true),
        )
        .unwrap();

    assert!(factory.get_bean("probe").is_err());

    // 非强制的缺失方法被忽略
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(probe_class());
    factory
        .register_bean_definition(
            "probe",
            BeanDefinition::for_class_name("app.Probe")
                .singleton()
                .with_init_method("nope", false),
        )
        .unwrap();
    assert!(factory.get_bean("probe").is_ok());
}

struct ShortCircuit;

impl BeanPostProcessor for ShortCircuit {
    fn name(&self) -> &str {
        "ShortCircuit"
    }

    fn before_instantiation(
        &self,
        _class: &BeanClass,
        bean_name: &str,
    ) -> ContainerResult<Option<BeanHandle>> {
        if bean_name == "probe" {
            return Ok(Some(Arc::new("canned".to_string()) as BeanHandle));
        }
        Ok(None)
    }
}

#[test]
fn before_instantiation_short_circuits_creation() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(probe_class());
    factory.add_bean_post_processor(Arc::new(ShortCircuit));
    factory.add_bean_post_processor(Arc::new(RecordingProcessor {
        label: "pp",
        order: 0,
        phase: OrderingPhase::Unordered,
        log: log.clone(),
    }));

    factory
        .register_bean_definition("probe", BeanDefinition::for_class_name("app.Probe").singleton())
        .unwrap();

    let bean = factory.get_bean_of_type::<String>("probe").unwrap();
    assert_eq!(&*bean, "canned");

    // 短路后仍然经过初始化后钩子，但没有前置钩子
    let events = log.lock().clone();
    assert_eq!(events, vec!["pp:after:probe"]);
}

struct PopulationVeto;

impl BeanPostProcessor for PopulationVeto {
    fn name(&self) -> &str {
        "PopulationVeto"
    }

    fn after_instantiation(&self, _bean: &BeanHandle, bean_name: &str) -> ContainerResult<bool> {
        Ok(bean_name != "muted")
    }
}

struct Settable {
    value: OnceLock<String>,
}

fn settable_class() -> BeanClass {
    BeanClass::of::<Settable>("app.Settable")
        .with_constructor(ConstructorSpec::new(vec![], |_| {
            Ok(Arc::new(Settable {
                value: OnceLock::new(),
            }) as BeanHandle)
        }))
        .with_property(PropertySpec::simple::<String, _>("value", |target, value| {
            let settable = target
                .downcast_ref::<Settable>()
                .ok_or_else(|| ContainerError::Other(anyhow!("not a Settable")))?;
            let _ = settable.value.set(
                value
                    .downcast::<String>()
                    .map_err(|_| ContainerError::Other(anyhow!("expected String")))?
                    .as_ref()
                    .clone(),
            );
            Ok(())
        }))
}

#[test]
fn after_instantiation_veto_skips_population() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(settable_class());
    factory.add_bean_post_processor(Arc::new(PopulationVeto));

    factory
        .register_bean_definition(
            "muted",
            BeanDefinition::for_class_name("app.Settable")
                .singleton()
                .with_property("value", ValueSpec::Literal("ignored".into())),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "normal",
            BeanDefinition::for_class_name("app.Settable")
                .singleton()
                .with_property("value", ValueSpec::Literal("applied".into())),
        )
        .unwrap();

    let muted = factory.get_bean_of_type::<Settable>("muted").unwrap();
    assert!(muted.value.get().is_none());

    let normal = factory.get_bean_of_type::<Settable>("normal").unwrap();
    assert_eq!(normal.value.get().map(String::as_str), Some("applied"));
}

struct PropertyRewriter;

impl BeanPostProcessor for PropertyRewriter {
    fn name(&self) -> &str {
        "PropertyRewriter"
    }

    fn process_properties(
        &self,
        mut pvs: PropertyValues,
        _bean: &BeanHandle,
        bean_name: &str,
    ) -> ContainerResult<Option<PropertyValues>> {
        match bean_name {
            "rewritten" => {
                pvs.add("value", ValueSpec::Literal("injected".into()));
                Ok(Some(pvs))
            }
            "abandoned" => Ok(None),
            _ => Ok(Some(pvs)),
        }
    }
}

#[test]
fn property_pipeline_replacement_and_short_circuit() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(settable_class());
    factory.add_bean_post_processor(Arc::new(PropertyRewriter));

    factory
        .register_bean_definition(
            "rewritten",
            BeanDefinition::for_class_name("app.Settable").singleton(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "abandoned",
            BeanDefinition::for_class_name("app.Settable")
                .singleton()
                .with_property("value", ValueSpec::Literal("never".into())),
        )
        .unwrap();

    let rewritten = factory.get_bean_of_type::<Settable>("rewritten").unwrap();
    assert_eq!(rewritten.value.get().map(String::as_str), Some("injected"));

    // None 短路整个属性填充
    let abandoned = factory.get_bean_of_type::<Settable>("abandoned").unwrap();
    assert!(abandoned.value.get().is_none());
}

#[test]
fn dependency_check_reports_unset_properties() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(settable_class());
    factory
        .register_bean_definition(
            "checked",
            BeanDefinition::for_class_name("app.Settable")
                .singleton()
                .with_dependency_check(true),
        )
        .unwrap();

    match factory.get_bean("checked") {
        Err(ContainerError::CreationFailed { .. }) | Err(ContainerError::UnsatisfiedDependency { .. }) => {}
        other => panic!("expected unsatisfied dependency, got {:?}", other.map(|_| ())),
    }
}

// ==================== FactoryBean ====================

struct Connection {
    id: usize,
}

struct ConnectionFactory {
    created: Mutex<usize>,
}

impl FactoryBean for ConnectionFactory {
    fn produce(&self) -> ContainerResult<BeanHandle> {
        let mut created = self.created.lock();
        *created += 1;
        Ok(Arc::new(Connection { id: *created }) as BeanHandle)
    }

    fn product_type(&self) -> Option<TypeKey> {
        Some(TypeKey::of::<Connection>())
    }
}

fn connection_factory_class() -> BeanClass {
    BeanClass::of::<ConnectionFactory>("app.ConnectionFactory")
        .with_constructor(ConstructorSpec::new(vec![], |_| {
            Ok(Arc::new(ConnectionFactory {
                created: Mutex::new(0),
            }) as BeanHandle)
        }))
        .as_factory_bean::<ConnectionFactory>()
}

#[test]
fn factory_bean_publishes_its_product() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(connection_factory_class());
    factory
        .register_bean_definition(
            "connection",
            BeanDefinition::for_class_name("app.ConnectionFactory").singleton(),
        )
        .unwrap();

    // 普通名称取产品，且产品被缓存
    let first = factory.get_bean_of_type::<Connection>("connection").unwrap();
    let second = factory.get_bean_of_type::<Connection>("connection").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id, 1);

    // `&` 前缀取工厂对象本身
    let raw_factory = factory
        .get_bean_of_type::<ConnectionFactory>("&connection")
        .unwrap();
    assert_eq!(*raw_factory.created.lock(), 1);

    // 非工厂 Bean 不接受解引用前缀
    factory.register_class(probe_class());
    factory
        .register_bean_definition("probe", BeanDefinition::for_class_name("app.Probe").singleton())
        .unwrap();
    assert!(factory.get_bean("&probe").is_err());
}

#[test]
fn factory_bean_participates_in_type_lookup() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(connection_factory_class());
    factory
        .register_bean_definition(
            "connection",
            BeanDefinition::for_class_name("app.ConnectionFactory").singleton(),
        )
        .unwrap();

    let names = factory.get_bean_names_for_type(&TypeKey::of::<Connection>(), true, true);
    assert_eq!(names, vec!["connection".to_string()]);

    let product_type = factory.get_type("connection").unwrap();
    assert_eq!(product_type.map(|t| t.id), Some(TypeKey::of::<Connection>().id));
}

// ==================== 自定义作用域 ====================

struct TestScope {
    instances: Mutex<HashMap<String, BeanHandle>>,
    callbacks: Mutex<HashMap<String, DestructionCallback>>,
}

impl TestScope {
    fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(HashMap::new()),
        }
    }
}

impl Scope for TestScope {
    fn get(
        &self,
        name: &str,
        factory: talos_core::scope::ObjectFactory<'_>,
    ) -> ContainerResult<BeanHandle> {
        if let Some(existing) = self.instances.lock().get(name) {
            return Ok(existing.clone());
        }
        let created = factory()?;
        self.instances
            .lock()
            .insert(name.to_string(), created.clone());
        Ok(created)
    }

    fn remove(&self, name: &str) -> Option<BeanHandle> {
        self.callbacks.lock().remove(name);
        self.instances.lock().remove(name)
    }

    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback) {
        self.callbacks.lock().insert(name.to_string(), callback);
    }

    fn scope_id(&self) -> &str {
        "test"
    }
}

#[test]
fn custom_scope_routes_creation_and_destruction() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(probe_class());
    factory
        .register_scope("test", Arc::new(TestScope::new()))
        .unwrap();
    assert_eq!(factory.get_registered_scope_names(), vec!["test".to_string()]);

    let destroy_log = log.clone();
    factory
        .register_bean_definition(
            "scoped",
            BeanDefinition::for_class_name("app.Probe")
                .with_scope("test")
                .with_destroy(move |_| {
                    destroy_log.lock().push("destroy:scoped".to_string());
                    Ok(())
                }),
        )
        .unwrap();

    // 作用域处理器负责实例共享
    let first = factory.get_bean("scoped").unwrap();
    let second = factory.get_bean("scoped").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    factory.destroy_scoped_bean("scoped").unwrap();
    assert_eq!(*log.lock(), vec!["destroy:scoped".to_string()]);

    // 销毁后重新创建
    let third = factory.get_bean("scoped").unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn unknown_scope_is_rejected() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(probe_class());
    factory
        .register_bean_definition(
            "ghost",
            BeanDefinition::for_class_name("app.Probe").with_scope("request"),
        )
        .unwrap();

    assert!(factory.get_bean("ghost").is_err());
    // 内建作用域名不可被处理器替换
    assert!(factory
        .register_scope("singleton", Arc::new(TestScope::new()))
        .is_err());
}

// ==================== 销毁 ====================

struct FailingDestroy;

impl DisposableBean for FailingDestroy {
    fn destroy(&self) -> ContainerResult<()> {
        Err(ContainerError::Other(anyhow!("destroy exploded")))
    }
}

#[test]
fn destruction_errors_are_contained() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();

    factory.register_class(
        BeanClass::of::<FailingDestroy>("app.FailingDestroy")
            .with_constructor(ConstructorSpec::new(vec![], |_| {
                Ok(Arc::new(FailingDestroy) as BeanHandle)
            }))
            .as_disposable::<FailingDestroy>(),
    );

    let destroy_log = log.clone();
    factory
        .register_bean_definition(
            "fragile",
            BeanDefinition::for_class_name("app.FailingDestroy").singleton(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "sturdy",
            BeanDefinition::from_supplier(|| Ok(Arc::new(()) as BeanHandle))
                .singleton()
                .with_destroy(move |_| {
                    destroy_log.lock().push("destroy:sturdy".to_string());
                    Ok(())
                }),
        )
        .unwrap();

    factory.get_bean("fragile").unwrap();
    factory.get_bean("sturdy").unwrap();

    // fragile 的销毁失败不阻止 sturdy 的销毁
    factory.destroy_singletons();
    assert_eq!(*log.lock(), vec!["destroy:sturdy".to_string()]);
}

struct DestructionAware {
    log: EventLog,
}

impl BeanPostProcessor for DestructionAware {
    fn name(&self) -> &str {
        "DestructionAware"
    }

    fn requires_destruction(&self, _bean: &BeanHandle) -> bool {
        true
    }

    fn before_destruction(&self, _bean: &BeanHandle, bean_name: &str) -> ContainerResult<()> {
        self.log.lock().push(format!("beforeDestroy:{}", bean_name));
        Ok(())
    }
}

#[test]
fn destruction_aware_processor_claims_beans() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(probe_class());
    factory.add_bean_post_processor(Arc::new(DestructionAware { log: log.clone() }));

    factory
        .register_bean_definition("probe", BeanDefinition::for_class_name("app.Probe").singleton())
        .unwrap();
    factory.get_bean("probe").unwrap();
    factory.destroy_singletons();

    assert_eq!(*log.lock(), vec!["beforeDestroy:probe".to_string()]);
}

// ==================== 刷新编排 ====================

struct Smart {
    log: EventLog,
}

impl SmartInitializingSingleton for Smart {
    fn after_singletons_instantiated(&self) -> ContainerResult<()> {
        self.log.lock().push("smart".to_string());
        Ok(())
    }
}

struct DefinitionAdder;

impl BeanFactoryPostProcessor for DefinitionAdder {
    fn name(&self) -> &str {
        "DefinitionAdder"
    }

    fn post_process_bean_factory(
        &self,
        _factory: &DefaultListableBeanFactory,
    ) -> ContainerResult<()> {
        Ok(())
    }
}

impl BeanDefinitionRegistryPostProcessor for DefinitionAdder {
    fn post_process_definition_registry(
        &self,
        factory: &DefaultListableBeanFactory,
    ) -> ContainerResult<()> {
        factory.register_bean_definition(
            "added",
            BeanDefinition::from_supplier(|| Ok(Arc::new(42_i64) as BeanHandle)).singleton(),
        )
    }
}

struct DefinitionMutator;

impl BeanFactoryPostProcessor for DefinitionMutator {
    fn name(&self) -> &str {
        "DefinitionMutator"
    }

    fn post_process_bean_factory(
        &self,
        factory: &DefaultListableBeanFactory,
    ) -> ContainerResult<()> {
        // 定义阶段可以整体替换既有定义
        factory.register_bean_definition(
            "mutable",
            BeanDefinition::from_supplier(|| Ok(Arc::new("mutated".to_string()) as BeanHandle))
                .singleton(),
        )
    }
}

#[test]
fn refresh_runs_definition_processors_then_preinstantiates() {
    let log = event_log();
    let smart_log = log.clone();

    let context = ApplicationContext::builder()
        .register_class(
            BeanClass::of::<Smart>("app.Smart")
                .with_constructor(ConstructorSpec::new(vec![], move |_| {
                    Ok(Arc::new(Smart {
                        log: smart_log.clone(),
                    }) as BeanHandle)
                }))
                .as_smart_singleton::<Smart>(),
        )
        .register(
            "mutable",
            BeanDefinition::from_supplier(|| Ok(Arc::new("original".to_string()) as BeanHandle))
                .singleton(),
        )
        .register("smart", BeanDefinition::for_class_name("app.Smart").singleton())
        .build()
        .unwrap();

    context.add_registry_post_processor(Arc::new(DefinitionAdder));
    context.add_bean_factory_post_processor(Arc::new(DefinitionMutator));

    context.refresh().unwrap();

    // 注册表处理器追加的定义已实例化
    let added = context.get_bean_of_type::<i64>("added").unwrap();
    assert_eq!(*added, 42);

    // 工厂处理器的定义改写在实例化之前生效
    let mutated = context.get_bean_of_type::<String>("mutable").unwrap();
    assert_eq!(&*mutated, "mutated");

    // smart-initializing 回调在全部单例就绪后触发
    assert_eq!(*log.lock(), vec!["smart".to_string()]);

    // 核心单例可按类型解析
    let env = context
        .get_bean_factory()
        .get_bean_of_type::<Arc<Environment>>("environment")
        .unwrap();
    assert!(env.get_active_profiles().is_empty());

    context.shutdown().unwrap();

    // 关闭后查找被拒绝
    assert!(context.get_bean("mutable").is_err());
}

#[test]
fn refresh_validates_depends_on_declarations() {
    // 目标不存在：刷新在任何单例创建之前失败
    let context = ApplicationContext::builder()
        .register(
            "service",
            BeanDefinition::from_supplier(|| Ok(Arc::new(()) as BeanHandle))
                .singleton()
                .with_depends_on(vec!["ghost".into()]),
        )
        .build()
        .unwrap();

    let result = context.refresh();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("depends-on target 'ghost'"));
    assert!(!context.get_bean_factory().contains_singleton("service"));

    // depends_on 链成环：同样在预检阶段被拒绝
    let context = ApplicationContext::builder()
        .register(
            "a",
            BeanDefinition::from_supplier(|| Ok(Arc::new(()) as BeanHandle))
                .singleton()
                .with_depends_on(vec!["b".into()]),
        )
        .register(
            "b",
            BeanDefinition::from_supplier(|| Ok(Arc::new(()) as BeanHandle))
                .singleton()
                .with_depends_on(vec!["a".into()]),
        )
        .build()
        .unwrap();

    let result = context.refresh();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Circular depends-on"));
}

#[test]
fn smart_callback_failure_aborts_refresh_and_destroys_singletons() {
    struct BrokenSmart;
    impl SmartInitializingSingleton for BrokenSmart {
        fn after_singletons_instantiated(&self) -> ContainerResult<()> {
            Err(ContainerError::Other(anyhow!("smart init failed")))
        }
    }

    let context = ApplicationContext::builder()
        .register_class(
            BeanClass::of::<BrokenSmart>("app.BrokenSmart")
                .with_constructor(ConstructorSpec::new(vec![], |_| {
                    Ok(Arc::new(BrokenSmart) as BeanHandle)
                }))
                .as_smart_singleton::<BrokenSmart>(),
        )
        .register(
            "broken",
            BeanDefinition::for_class_name("app.BrokenSmart").singleton(),
        )
        .build()
        .unwrap();

    assert!(context.refresh().is_err());
    // 刷新失败后已创建的单例被销毁
    assert_eq!(context.get_bean_factory().get_singleton_count(), 0);
}
