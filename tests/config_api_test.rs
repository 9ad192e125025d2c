//! Integration tests for the config public API.

use indexmap::IndexMap;
use serde_json::json;

use capstan::config::{
    render_config, render_value, resolve_vars, Config, EvalEnv, ExprContext, Var,
};
use capstan::state::State;

fn ctx<'a>() -> ExprContext<'a> {
    ExprContext {
        project: "demo-project",
        stage: "staging",
        promotion: Some("demo-project.staging.abc123"),
    }
}

#[test]
fn deep_copy_shares_no_substructure() {
    let mut original = Config::from_value(json!({
        "images": [{"repoURL": "example/app", "tag": "v1"}],
        "helm": {"values": {"replicas": 2}}
    }))
    .unwrap();
    let copy = original.clone();

    // Mutating deeply nested values in one copy must not affect the other
    let mut images = original.get("images").cloned().unwrap();
    images[0]["tag"] = json!("v2");
    original.insert("images", images);
    original.insert("extra", json!(true));

    assert_eq!(
        original.get("images"),
        Some(&json!([{"repoURL": "example/app", "tag": "v2"}]))
    );

    assert_eq!(
        copy.get("images"),
        Some(&json!([{"repoURL": "example/app", "tag": "v1"}]))
    );
    assert!(copy.get("extra").is_none());
}

#[test]
fn empty_config_serializes_to_empty_bytes() {
    assert!(Config::new().to_json_bytes().unwrap().is_empty());

    let non_empty = Config::from_value(json!({"a": 1})).unwrap();
    assert_eq!(non_empty.to_json_bytes().unwrap(), b"{\"a\":1}".to_vec());
}

#[test]
fn chained_vars_render_to_concatenated_string() {
    let vars = vec![
        Var {
            name: "strVar".to_string(),
            value: json!("foo"),
        },
        Var {
            name: "concatStrVar".to_string(),
            value: json!("${{ vars.strVar }}bar"),
        },
    ];
    let resolved = resolve_vars(&ctx(), &vars).unwrap();
    let env = EvalEnv {
        ctx: ctx(),
        vars: &resolved,
        outputs: None,
    };

    let rendered = render_value(&json!("${{ vars.concatStrVar }}"), &env).unwrap();
    assert_eq!(rendered, json!("foobar"));
}

#[test]
fn whole_expression_bool_stays_a_bool() {
    let vars = vec![Var {
        name: "boolVar".to_string(),
        value: json!(true),
    }];
    let resolved = resolve_vars(&ctx(), &vars).unwrap();
    let env = EvalEnv {
        ctx: ctx(),
        vars: &resolved,
        outputs: None,
    };

    let rendered = render_value(&json!("${{ vars.boolVar }}"), &env).unwrap();
    assert_eq!(rendered, json!(true));
    assert_ne!(rendered, json!("true"));
}

#[test]
fn quote_turns_a_bool_into_its_string_form() {
    let vars = vec![Var {
        name: "boolVar".to_string(),
        value: json!(true),
    }];
    let resolved = resolve_vars(&ctx(), &vars).unwrap();
    let env = EvalEnv {
        ctx: ctx(),
        vars: &resolved,
        outputs: None,
    };

    let rendered = render_value(&json!("${{ quote(vars.boolVar) }}"), &env).unwrap();
    assert_eq!(rendered, json!("true"));
}

#[test]
fn whole_expression_can_inject_structures() {
    let vars = vec![Var {
        name: "images".to_string(),
        value: json!([{"repoURL": "example/app", "tag": "v1.2.3"}]),
    }];
    let resolved = resolve_vars(&ctx(), &vars).unwrap();
    let env = EvalEnv {
        ctx: ctx(),
        vars: &resolved,
        outputs: None,
    };

    let config = render_config(&json!({"images": "${{ vars.images }}"}), &env).unwrap();
    assert_eq!(
        config.get("images"),
        Some(&json!([{"repoURL": "example/app", "tag": "v1.2.3"}]))
    );
}

#[test]
fn outputs_environment_reads_prior_step_state() {
    let mut state = State::new();
    state.set(
        "clone",
        Config::from_value(json!({"commit": "abc123"})).unwrap(),
    );
    let vars = IndexMap::new();
    let env = EvalEnv {
        ctx: ctx(),
        vars: &vars,
        outputs: Some(&state),
    };

    let config = render_config(
        &json!({"message": "promote ${{ outputs.clone.commit }}"}),
        &env,
    )
    .unwrap();
    assert_eq!(config.get("message"), Some(&json!("promote abc123")));
}

#[test]
fn config_parses_step_declaration_from_yaml() {
    let config = Config::from_yaml(
        r#"
repoURL: https://example.com/repo.git
checkout:
  - branch: main
    path: src
"#,
    )
    .unwrap();

    assert_eq!(
        config.get("repoURL"),
        Some(&json!("https://example.com/repo.git"))
    );
    assert_eq!(
        config.get("checkout"),
        Some(&json!([{"branch": "main", "path": "src"}]))
    );
}
