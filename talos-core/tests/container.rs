//! End-to-end container behavior: singleton identity, prototypes,
//! primary tie-breaking, depends-on ordering, aliases and freezing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use talos_core::prelude::*;
use talos_core::{ContainerError, DependencyShape};

type EventLog = Arc<Mutex<Vec<String>>>;

fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

struct Repo;

struct Service {
    repo: OnceLock<BeanHandle>,
}

fn repo_class() -> BeanClass {
    BeanClass::of::<Repo>("app.Repo")
        .with_constructor(ConstructorSpec::new(vec![], |_| Ok(Arc::new(Repo) as BeanHandle)))
}

fn service_class() -> BeanClass {
    BeanClass::of::<Service>("app.Service")
        .with_constructor(ConstructorSpec::new(vec![], |_| {
            Ok(Arc::new(Service {
                repo: OnceLock::new(),
            }) as BeanHandle)
        }))
        .with_property(PropertySpec::bean::<Repo, _>("repo", |target, value| {
            let service = target
                .downcast_ref::<Service>()
                .ok_or_else(|| ContainerError::Other(anyhow!("not a Service")))?;
            let _ = service.repo.set(value);
            Ok(())
        }))
}

#[test]
fn simple_singleton_chain() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());
    factory.register_class(service_class());

    factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();
    factory
        .register_bean_definition(
            "service",
            BeanDefinition::for_class_name("app.Service")
                .singleton()
                .with_property("repo", ValueSpec::Reference("repo".into())),
        )
        .unwrap();

    let service = factory.get_bean_of_type::<Service>("service").unwrap();
    let repo = factory.get_bean_of_type::<Repo>("repo").unwrap();

    // service 内部持有的就是容器里的 repo 单例
    let injected = service.repo.get().unwrap().clone();
    assert!(Arc::ptr_eq(
        &injected.downcast::<Repo>().unwrap(),
        &repo
    ));

    // 重复查找返回同一引用
    let repo_again = factory.get_bean_of_type::<Repo>("repo").unwrap();
    assert!(Arc::ptr_eq(&repo, &repo_again));

    assert_eq!(factory.get_singleton_count(), 2);
    assert_eq!(factory.get_singleton_names(), vec!["repo", "service"]);
}

#[test]
fn prototype_lookups_return_distinct_instances() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());
    factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").prototype())
        .unwrap();

    let first = factory.get_bean("repo").unwrap();
    let second = factory.get_bean("repo").unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    // 原型不被容器保留
    assert_eq!(factory.get_singleton_count(), 0);
}

struct Worker;

struct Consumer {
    worker: Arc<Worker>,
}

#[test]
fn primary_candidate_wins_for_prototype_consumer() {
    let constructions = Arc::new(AtomicUsize::new(0));

    let factory = DefaultListableBeanFactory::new();
    let counter = constructions.clone();
    factory.register_class(
        BeanClass::of::<Worker>("app.Worker").with_constructor(ConstructorSpec::new(
            vec![],
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Worker) as BeanHandle)
            },
        )),
    );
    factory.register_class(
        BeanClass::of::<Consumer>("app.Consumer").with_constructor(ConstructorSpec::new(
            vec![ParameterSpec::of::<Worker>()],
            |args| {
                Ok(Arc::new(Consumer {
                    worker: arg::<Worker>(args, 0)?,
                }) as BeanHandle)
            },
        )),
    );

    factory
        .register_bean_definition(
            "primaryWorker",
            BeanDefinition::for_class_name("app.Worker")
                .singleton()
                .with_primary(true),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "backupWorker",
            BeanDefinition::for_class_name("app.Worker").singleton(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "consumer",
            BeanDefinition::for_class_name("app.Consumer")
                .prototype()
                .with_autowire(AutowireMode::Constructor),
        )
        .unwrap();

    let first = factory.get_bean_of_type::<Consumer>("consumer").unwrap();
    let second = factory.get_bean_of_type::<Consumer>("consumer").unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.worker, &second.worker));
    // 只有 primary 候选被构造过
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
}

#[test]
fn ambiguous_candidates_without_primary_are_rejected() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());
    factory
        .register_bean_definition("repoA", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();
    factory
        .register_bean_definition("repoB", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();

    match factory.get_bean_by_type::<Repo>() {
        Err(ContainerError::NoUniqueBean { candidates, .. }) => {
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected no-unique-bean, got {:?}", other.map(|_| ())),
    }

    match DefaultListableBeanFactory::new().get_bean_by_type::<Repo>() {
        Err(ContainerError::NoSuchBean { .. }) => {}
        other => panic!("expected no-such-bean, got {:?}", other.map(|_| ())),
    }
}

fn logging_definition(log: &EventLog, label: &str) -> BeanDefinition {
    let created = log.clone();
    let destroyed = log.clone();
    let create_label = format!("create:{}", label);
    let destroy_label = format!("destroy:{}", label);
    BeanDefinition::from_supplier(move || {
        created.lock().push(create_label.clone());
        Ok(Arc::new(()) as BeanHandle)
    })
    .singleton()
    .with_destroy(move |_| {
        destroyed.lock().push(destroy_label.clone());
        Ok(())
    })
}

#[test]
fn depends_on_forces_creation_and_destruction_order() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();

    factory
        .register_bean_definition(
            "service",
            logging_definition(&log, "service").with_depends_on(vec!["logger".into()]),
        )
        .unwrap();
    factory
        .register_bean_definition("logger", logging_definition(&log, "logger"))
        .unwrap();

    // 请求 service 时 logger 必须先完整创建
    factory.get_bean("service").unwrap();
    assert_eq!(
        *log.lock(),
        vec!["create:logger".to_string(), "create:service".to_string()]
    );

    factory.destroy_singletons();
    let events = log.lock().clone();
    assert_eq!(
        events[2..],
        ["destroy:service".to_string(), "destroy:logger".to_string()]
    );
}

#[test]
fn circular_depends_on_is_rejected() {
    let log = event_log();
    let factory = DefaultListableBeanFactory::new();

    factory
        .register_bean_definition(
            "a",
            logging_definition(&log, "a").with_depends_on(vec!["b".into()]),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "b",
            logging_definition(&log, "b").with_depends_on(vec!["a".into()]),
        )
        .unwrap();

    let result = factory.get_bean("a");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("depends-on"));
}

#[test]
fn generated_bean_names_derive_from_class_name() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());

    let first = factory
        .register_with_generated_name(BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();
    let second = factory
        .register_with_generated_name(BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();

    // 简名首字母小写；冲突时追加序号
    assert_eq!(first, "repo");
    assert_eq!(second, "repo#2");
    assert!(factory.get_bean("repo").is_ok());
    assert!(factory.get_bean("repo#2").is_ok());

    // 没有类的定义无法推导名称
    assert!(factory
        .register_with_generated_name(BeanDefinition::from_supplier(|| {
            Ok(Arc::new(()) as BeanHandle)
        }))
        .is_err());
}

#[test]
fn alias_round_trip() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());
    factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();
    factory.register_alias("repo", "mainRepo").unwrap();
    // 重复注册是幂等的
    factory.register_alias("repo", "mainRepo").unwrap();

    let by_name = factory.get_bean("repo").unwrap();
    let by_alias = factory.get_bean("mainRepo").unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_alias));

    assert!(factory.get_aliases("repo").contains(&"mainRepo".to_string()));
    // 别名不得遮蔽既有定义名
    assert!(factory.register_alias("other", "repo").is_err());
}

#[test]
fn frozen_configuration_rejects_new_definitions() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());
    factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();

    factory.freeze_configuration();
    factory.freeze_configuration(); // 幂等
    assert!(factory.is_configuration_frozen());

    // 新名称被拒绝
    let result = factory
        .register_bean_definition("late", BeanDefinition::for_class_name("app.Repo").singleton());
    assert!(result.is_err());

    // 既有名称按覆盖策略处理
    factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").prototype())
        .unwrap();
    factory.set_allow_definition_overriding(false);
    assert!(factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").singleton())
        .is_err());
}

#[test]
fn destroyed_registry_rejects_lookups_until_refresh() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());
    factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();

    factory.get_bean("repo").unwrap();
    factory.destroy_singletons();

    match factory.get_bean("repo") {
        Err(ContainerError::CreationNotAllowed { .. }) => {}
        other => panic!("expected creation-not-allowed, got {:?}", other.map(|_| ())),
    }

    // 刷新准备之后可以重建
    factory.prepare_refresh();
    assert!(factory.get_bean("repo").is_ok());
}

#[test]
fn definition_names_precede_manual_singletons_in_enumeration() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());

    factory
        .register_singleton("manualRepo", Arc::new(Repo) as BeanHandle)
        .unwrap();
    factory
        .register_bean_definition("definedRepo", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();

    let names = factory.get_bean_names_for_type(&TypeKey::of::<Repo>(), true, true);
    assert_eq!(names, vec!["definedRepo".to_string(), "manualRepo".to_string()]);
}

struct Holder {
    all: OnceLock<BeanHandle>,
}

#[test]
fn collection_injection_orders_and_filters_candidates() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(repo_class());
    factory.register_class(
        BeanClass::of::<Holder>("app.Holder").with_constructor(ConstructorSpec::new(
            vec![ParameterSpec::of::<Repo>().shape(DependencyShape::Multi)],
            |args| {
                let holder = Holder {
                    all: OnceLock::new(),
                };
                let _ = holder.all.set(args[0].clone());
                Ok(Arc::new(holder) as BeanHandle)
            },
        )),
    );

    factory
        .register_bean_definition(
            "third",
            BeanDefinition::for_class_name("app.Repo").singleton().with_order(20),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "first",
            BeanDefinition::for_class_name("app.Repo").singleton().with_order(1),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "unordered",
            BeanDefinition::for_class_name("app.Repo").singleton(),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "hidden",
            BeanDefinition::for_class_name("app.Repo")
                .singleton()
                .with_autowire_candidate(false),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "holder",
            BeanDefinition::for_class_name("app.Holder")
                .singleton()
                .with_autowire(AutowireMode::Constructor),
        )
        .unwrap();

    let holder = factory.get_bean_of_type::<Holder>("holder").unwrap();
    let all = holder
        .all
        .get()
        .unwrap()
        .clone()
        .downcast::<Vec<BeanHandle>>()
        .unwrap();

    // order 声明者在前，其余按注册顺序；autowire_candidate=false 被排除
    assert_eq!(all.len(), 3);
    let first = factory.get_bean("first").unwrap();
    let third = factory.get_bean("third").unwrap();
    let unordered = factory.get_bean("unordered").unwrap();
    assert!(Arc::ptr_eq(&all[0], &first));
    assert!(Arc::ptr_eq(&all[1], &third));
    assert!(Arc::ptr_eq(&all[2], &unordered));
}

#[test]
fn merged_definition_inherits_parent_recipe() {
    let factory = DefaultListableBeanFactory::new();
    factory.register_class(service_class());
    factory.register_class(repo_class());

    factory
        .register_bean_definition(
            "base",
            BeanDefinition::for_class_name("app.Service")
                .singleton()
                .with_property("repo", ValueSpec::Reference("repo".into())),
        )
        .unwrap();
    factory
        .register_bean_definition(
            "derived",
            BeanDefinition::new().with_parent("base").prototype(),
        )
        .unwrap();
    factory
        .register_bean_definition("repo", BeanDefinition::for_class_name("app.Repo").singleton())
        .unwrap();

    let merged = factory.get_merged_bean_definition("derived").unwrap();
    assert!(merged.is_prototype());
    assert_eq!(merged.definition.class_name.as_deref(), Some("app.Service"));

    let derived = factory.get_bean_of_type::<Service>("derived").unwrap();
    assert!(derived.repo.get().is_some());
}

#[test]
fn literal_properties_go_through_placeholder_resolution_and_conversion() {
    struct Config {
        port: OnceLock<u16>,
        name: OnceLock<String>,
    }

    let context = ApplicationContext::builder()
        .add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("server.port", ConfigValue::String("9090".into())),
        ))
        .register_class(
            BeanClass::of::<Config>("app.Config")
                .with_constructor(ConstructorSpec::new(vec![], |_| {
                    Ok(Arc::new(Config {
                        port: OnceLock::new(),
                        name: OnceLock::new(),
                    }) as BeanHandle)
                }))
                .with_property(PropertySpec::simple::<u16, _>("port", |target, value| {
                    let config = target
                        .downcast_ref::<Config>()
                        .ok_or_else(|| ContainerError::Other(anyhow!("not a Config")))?;
                    let _ = config.port.set(*value.downcast::<u16>().map_err(|_| {
                        ContainerError::Other(anyhow!("port must convert to u16"))
                    })?);
                    Ok(())
                }))
                .with_property(PropertySpec::simple::<String, _>("name", |target, value| {
                    let config = target
                        .downcast_ref::<Config>()
                        .ok_or_else(|| ContainerError::Other(anyhow!("not a Config")))?;
                    let _ = config.name.set(
                        value
                            .downcast::<String>()
                            .map_err(|_| ContainerError::Other(anyhow!("name must be a String")))?
                            .as_ref()
                            .clone(),
                    );
                    Ok(())
                })),
        )
        .register(
            "config",
            BeanDefinition::for_class_name("app.Config")
                .singleton()
                .with_property("port", ValueSpec::Literal("${server.port}".into()))
                .with_property("name", ValueSpec::Literal("${app.title:talos}".into())),
        )
        .build()
        .unwrap();

    context.refresh().unwrap();

    let config = context.get_bean_of_type::<Config>("config").unwrap();
    assert_eq!(config.port.get(), Some(&9090));
    assert_eq!(config.name.get().map(String::as_str), Some("talos"));

    context.shutdown().unwrap();
}
