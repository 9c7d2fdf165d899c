// End-to-end assembly over fixture application trees: category loading,
// pruning, override order, failure isolation, and registry merging.
mod support;

use anyhow::{Result, bail};
use api_registry::{
    Assembler, AssemblySummary, Category, ExportRegistry, Handler, LoadError, LoadedValue,
    Registry,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use support::AppFixture;

fn blog_exports(find: &Handler) -> ExportRegistry {
    let mut members = BTreeMap::new();
    members.insert("find".to_string(), LoadedValue::Function(find.clone()));
    let mut exports = ExportRegistry::new();
    exports.register("blog/controllers/Blog", LoadedValue::Object(members));
    exports
}

// Controllers plus common and production config; nothing else.
#[test]
fn blog_scenario_in_production() -> Result<()> {
    let app = AppFixture::new()?;
    app.write_api("blog/controllers/Blog.js", "module.exports = { find };")?;
    app.write_api("blog/config/settings.json", r#"{"draft": false}"#)?;
    app.write_api(
        "blog/config/environments/production/settings.json",
        r#"{"draft": true}"#,
    )?;
    app.write_api(
        "blog/config/routes.json",
        r#"{"routes": {"GET /posts": {"handler": "Blog.find"}}}"#,
    )?;

    let find = Handler::new("find", |_| Ok(json!([])));
    let assembler = Assembler::new(app.config("production"), blog_exports(&find));
    let mut registry = Registry::new();
    let summary = assembler.build_all(&mut registry)?;
    assert_eq!(summary.assembled, vec!["blog"]);

    let controller = registry.controllers().get("blog").expect("blog controller");
    assert_eq!(controller.get("find"), Some(LoadedValue::Function(find)));

    let blog = registry.api("blog").expect("blog namespace");
    let config = blog.get(Category::Config).expect("effective config");
    assert_eq!(config.get("draft"), Some(&LoadedValue::Data(json!(true))));
    assert!(config.get("settings").is_none());
    assert_eq!(
        registry.routes().get("GET /posts"),
        Some(&LoadedValue::Data(json!({"handler": "Blog.find"})))
    );
    assert!(registry.routes().get("routes").is_none());
    for absent in [Category::Models, Category::Services, Category::Policies] {
        assert!(blog.get(absent).is_none(), "{absent} should be pruned");
    }
    assert!(registry.services().is_empty());
    assert!(registry.policies().is_empty());
    Ok(())
}

#[test]
fn environment_config_overrides_common() -> Result<()> {
    let app = AppFixture::new()?;
    app.write_api(
        "orders/config/settings.json",
        r#"{"timeout": 10, "retry": {"count": 3, "backoff": "linear"}}"#,
    )?;
    app.write_api(
        "orders/config/environments/staging/settings.json",
        r#"{"timeout": 30, "retry": {"backoff": "exponential"}}"#,
    )?;

    let assembler = Assembler::new(app.config("staging"), ExportRegistry::new());
    let api = assembler.assemble_namespace("orders")?;
    let config = api.get(Category::Config).expect("config");
    assert_eq!(config.get("timeout"), Some(&LoadedValue::Data(json!(30))));
    assert_eq!(
        config.get("retry"),
        Some(&LoadedValue::Data(json!({"count": 3, "backoff": "exponential"})))
    );
    Ok(())
}

#[test]
fn config_files_of_both_kinds_merge_into_one_object() -> Result<()> {
    let app = AppFixture::new()?;
    app.scaffold("shop", "development")?;
    app.write_api("shop/config/settings.js", "module.exports = { currency };")?;
    app.write_api("shop/config/settings.json", r#"{"currency": "EUR", "tax": 0.2}"#)?;

    let mut exports = ExportRegistry::new();
    exports.register("shop/config/settings", json!({"currency": "USD", "rounding": 2}));
    let assembler = Assembler::new(app.config("development"), exports);
    let api = assembler.assemble_namespace("shop")?;

    let config = api.get(Category::Config).expect("config");
    assert_eq!(
        config.keys().collect::<Vec<_>>(),
        vec!["currency", "rounding", "tax"]
    );
    assert_eq!(config.get("currency"), Some(&LoadedValue::Data(json!("EUR"))));
    Ok(())
}

#[test]
fn namespace_without_active_environment_uses_common_config() -> Result<()> {
    let app = AppFixture::new()?;
    app.write_api("blog/controllers/Blog.js", "")?;
    app.write_api("blog/config/settings.json", r#"{"draft": false}"#)?;
    app.write_api(
        "blog/config/environments/production/settings.json",
        r#"{"draft": true}"#,
    )?;

    let assembler = Assembler::new(
        app.config("staging"),
        ExportRegistry::with_unbound_fallback(),
    );
    let mut registry = Registry::new();
    assembler.build_all(&mut registry)?;

    let blog = registry.api("blog").expect("blog namespace");
    assert_eq!(
        blog.get(Category::Config).and_then(|config| config.get("draft")),
        Some(&LoadedValue::Data(json!(false)))
    );
    Ok(())
}

// Module exports win scalar collisions; nested settings objects merge.
#[test]
fn model_functions_deep_merge_over_settings() -> Result<()> {
    let app = AppFixture::new()?;
    app.scaffold("blog", "development")?;
    app.write_api(
        "blog/models/Post.settings.json",
        r#"{"connection": "default", "attributes": {"title": {"type": "string"}}}"#,
    )?;
    app.write_api("blog/models/Post.js", "module.exports = {};")?;

    let before_save = Handler::new("beforeSave", |input| Ok(input.clone()));
    let mut exported = BTreeMap::new();
    exported.insert(
        "beforeSave".to_string(),
        LoadedValue::Function(before_save.clone()),
    );
    exported.insert(
        "connection".to_string(),
        LoadedValue::Data(json!("replica")),
    );
    exported.insert(
        "attributes".to_string(),
        LoadedValue::Data(json!({"title": {"required": true}})),
    );
    let mut exports = ExportRegistry::new();
    exports.register("models/Post", LoadedValue::Object(exported));

    let assembler = Assembler::new(app.config("development"), exports);
    let mut registry = Registry::new();
    assembler.build_all(&mut registry)?;

    let post = registry.models().get("post").expect("post model");
    assert_eq!(post.get("connection"), Some(LoadedValue::Data(json!("replica"))));
    assert_eq!(
        post.get("attributes"),
        Some(LoadedValue::Data(
            json!({"title": {"type": "string", "required": true}})
        ))
    );
    assert_eq!(post.get("beforesave"), None);
    assert_eq!(
        post.get("beforeSave"),
        Some(LoadedValue::Function(before_save))
    );
    Ok(())
}

#[test]
fn namespace_with_empty_directories_is_pruned() -> Result<()> {
    let app = AppFixture::new()?;
    for dir in ["controllers", "models", "services", "policies"] {
        app.mkdir_api(&format!("empty/{dir}"))?;
    }
    app.scaffold("empty", "development")?;
    app.write_api("blog/services/Blog.js", "")?;
    app.scaffold("blog", "development")?;

    let mut exports = ExportRegistry::new();
    exports.register("blog/services/Blog", json!({"publish": true}));
    let assembler = Assembler::new(app.config("development"), exports);
    let mut registry = Registry::new();
    let summary = assembler.build_all(&mut registry)?;

    assert_eq!(
        summary,
        AssemblySummary {
            assembled: vec!["blog".to_string()],
            pruned: vec!["empty".to_string()],
        }
    );
    assert!(registry.api("empty").is_none());
    assert_eq!(registry.apis().count(), 1);
    assert!(registry.controllers().is_empty());
    Ok(())
}

#[test]
fn missing_services_directory_is_not_an_error() -> Result<()> {
    let app = AppFixture::new()?;
    app.scaffold("blog", "development")?;
    app.write_api("blog/policies/isAuthor.js", "")?;

    let is_author = Handler::new("isAuthor", |_| Ok(Value::Bool(true)));
    let mut exports = ExportRegistry::new();
    exports.register("policies/isAuthor", is_author.clone());

    let assembler = Assembler::new(app.config("development"), exports);
    let api = assembler.assemble_namespace("blog")?;
    assert_eq!(api.get(Category::Services), Some(&BTreeMap::new()));

    let mut registry = Registry::new();
    assembler.build_all(&mut registry)?;
    let blog = registry.api("blog").expect("blog kept for its policy");
    assert!(blog.get(Category::Services).is_none());
    assert_eq!(
        registry.policies().get("isauthor"),
        Some(&LoadedValue::Function(is_author))
    );
    Ok(())
}

// A namespace without config fails; its siblings still land in the registry.
#[test]
fn missing_required_config_fails_only_that_namespace() -> Result<()> {
    let app = AppFixture::new()?;
    app.scaffold("alpha", "development")?;
    app.write_api("alpha/config/routes.json", r#"{"routes": {"GET /alpha": {}}}"#)?;
    app.write_api("broken/controllers/Broken.js", "")?;
    app.scaffold("gamma", "development")?;
    app.write_api("gamma/config/environments/development/db.json", r#"{"pool": 4}"#)?;

    let mut exports = ExportRegistry::new();
    exports.register("Broken", json!({"ok": false}));
    let assembler = Assembler::new(app.config("development"), exports);
    let mut registry = Registry::new();

    let err = match assembler.build_all(&mut registry) {
        Ok(summary) => bail!("expected failure, assembled {:?}", summary.assembled),
        Err(err) => err,
    };
    assert_eq!(err.namespaces().collect::<Vec<_>>(), vec!["broken"]);
    let (namespace, first) = err.first().expect("one failure");
    assert_eq!(namespace, "broken");
    match first {
        LoadError::DirectoryNotFound { path } => assert!(path.ends_with("broken/config")),
        other => bail!("unexpected error {other:?}"),
    }

    assert!(registry.api("broken").is_none());
    assert!(registry.controllers().is_empty());
    assert!(registry.api("alpha").is_some());
    assert!(registry.api("gamma").is_some());
    assert!(registry.routes().contains_key("GET /alpha"));
    Ok(())
}

#[test]
fn every_failed_namespace_is_reported() -> Result<()> {
    let app = AppFixture::new()?;
    app.mkdir_api("first/controllers")?;
    app.scaffold("second", "development")?;
    app.write_api("second/config/settings.json", "{not json")?;

    let assembler = Assembler::new(app.config("development"), ExportRegistry::new());
    let mut registry = Registry::new();
    let err = assembler
        .build_all(&mut registry)
        .expect_err("both namespaces fail");

    assert_eq!(
        err.namespaces().collect::<Vec<_>>(),
        vec!["first", "second"]
    );
    assert!(matches!(
        err.failures[1].1,
        LoadError::LoadFailure { ref path, .. } if path.ends_with("settings.json")
    ));
    let message = err.to_string();
    assert!(message.starts_with("2 API namespace(s) failed"), "{message}");
    Ok(())
}

#[test]
fn rebuilding_unchanged_tree_is_idempotent() -> Result<()> {
    let app = AppFixture::new()?;
    app.write_api("blog/controllers/Blog.js", "")?;
    app.write_api("blog/models/Post.settings.json", r#"{"attributes": {"title": {}}}"#)?;
    app.write_api(
        "blog/config/routes.json",
        r#"{"routes": {"GET /posts": {"handler": "Blog.find"}}}"#,
    )?;
    app.scaffold("blog", "development")?;
    app.write_api("users/services/Users.js", "")?;
    app.scaffold("users", "development")?;

    let assembler = Assembler::new(
        app.config("development"),
        ExportRegistry::with_unbound_fallback(),
    );
    let mut first = Registry::new();
    assembler.build_all(&mut first)?;

    let mut second = first.clone();
    assembler.build_all(&mut second)?;
    assert_eq!(first.summary(), second.summary());
    assert_eq!(
        first.routes().get("GET /posts"),
        Some(&LoadedValue::Data(json!({"handler": "Blog.find"})))
    );
    Ok(())
}

// Collisions across namespaces resolve by namespace name, not completion order.
#[test]
fn later_namespace_wins_cross_namespace_collisions() -> Result<()> {
    let app = AppFixture::new()?;
    for (namespace, limit) in [("zeta", 2), ("alpha", 1)] {
        app.scaffold(namespace, "development")?;
        app.write_api(
            &format!("{namespace}/models/Shared.settings.json"),
            &format!(r#"{{"limit": {limit}}}"#),
        )?;
    }

    let assembler = Assembler::new(app.config("development"), ExportRegistry::new());
    for _ in 0..4 {
        let mut registry = Registry::new();
        assembler.build_all(&mut registry)?;
        assert_eq!(
            registry.models().get("shared"),
            Some(&LoadedValue::Data(json!({"limit": 2})))
        );
    }
    Ok(())
}

#[test]
fn configured_namespaces_limit_assembly() -> Result<()> {
    let app = AppFixture::new()?;
    app.write_api("blog/services/Blog.js", "")?;
    app.scaffold("blog", "development")?;
    app.write_api("shop/services/Shop.js", "")?;

    let mut config = app.config("development");
    config.namespaces = Some(vec!["blog".to_string()]);
    let assembler = Assembler::new(config, ExportRegistry::with_unbound_fallback());
    let mut registry = Registry::new();
    let summary = assembler.build_all(&mut registry)?;

    assert_eq!(summary.assembled, vec!["blog"]);
    assert!(registry.services().contains_key("blog"));
    assert!(!registry.services().contains_key("shop"));
    Ok(())
}

#[test]
fn unregistered_module_fails_with_module_name() -> Result<()> {
    let app = AppFixture::new()?;
    app.scaffold("blog", "development")?;
    app.write_api("blog/controllers/Blog.js", "")?;

    let assembler = Assembler::new(app.config("development"), ExportRegistry::new());
    let err = assembler
        .assemble_namespace("blog")
        .expect_err("no export for Blog.js");
    let message = err.to_string();
    assert!(message.contains("Blog.js"), "{message}");
    assert!(message.contains("no export registered"), "{message}");
    Ok(())
}
