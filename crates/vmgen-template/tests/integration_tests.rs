/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for vmgen-template using test fixtures.
 */

use pretty_assertions::assert_eq;
use std::path::Path;
use vmgen_template::{
    FunctionMap, MemoryLoader, Scope, Template, TemplateError, TemplateLoader, TemplateValue,
};

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

/// Helper to load a template from fixtures
fn load_template(name: &str) -> Template {
    let path = fixture_path(name);
    Template::compile_from_file(&path).unwrap_or_else(|_| panic!("Failed to load template: {}", name))
}

#[test]
fn test_instruction_table() {
    let template = load_template("insns.erb");

    let mut scope = Scope::new();
    scope.assign(
        "insns",
        TemplateValue::from(serde_json::json!([
            { "name": "nop", "operands": [] },
            { "name": "putobject", "operands": ["val"] },
        ])),
    );

    let result = template.render(&mut scope).unwrap();
    assert_eq!(
        result,
        "/* instruction table */\n  0: nop\n  1: putobject(val)\n"
    );
}

#[test]
fn test_dash_trimming() {
    let template = load_template("trim.erb");

    let mut scope = Scope::new();
    scope.assign("names", TemplateValue::from(vec!["a", "b"]));

    let result = template.render(&mut scope).unwrap();
    assert_eq!(result, "enum {\n    A,\n    B,\n};\n");
}

#[test]
fn test_escapes_and_comments() {
    let template = load_template("escapes.erb");
    let result = template.render(&mut Scope::new()).unwrap();
    assert_eq!(result, "% not code\n<% literal tag %>\n\nkept\n");
}

#[test]
fn test_parse_error_names_file_and_line() {
    let path = fixture_path("broken.erb");
    let err = Template::compile_from_file(&path).unwrap_err();

    let (message, location) = match err {
        TemplateError::ParseError {
            message, location, ..
        } => (message, location),
        other => panic!("expected a parse error, got {:?}", other),
    };
    assert!(message.contains("unclosed `if` block"), "{}", message);
    assert_eq!(location.file, path.to_string_lossy());
    assert_eq!((location.line, location.column), (2, 3));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Template::compile_from_file(&fixture_path("nope.erb")).unwrap_err();
    assert!(matches!(err, TemplateError::Io(_)));
}

#[test]
fn test_separate_scopes_do_not_leak() {
    let template = Template::compile("<% seen = (defined_before || 'fresh') %><%= seen %>").unwrap();

    let mut first = Scope::new();
    first.assign("defined_before", TemplateValue::from("first"));
    assert_eq!(template.render(&mut first).unwrap(), "first");

    let mut second = Scope::new();
    second.assign("defined_before", TemplateValue::Nil);
    assert_eq!(template.render(&mut second).unwrap(), "fresh");
}

#[test]
fn test_recursive_helper_through_function_table() {
    // A helper that renders another in-memory template, the way a generator
    // renders partials from inside a template.
    let loader = MemoryLoader::with_templates([("_item.erb", "[<%= item %>]")]);
    let mut functions = FunctionMap::new().with("item", move |args| {
        let source = loader.load(Path::new("_item.erb"))?;
        let partial = Template::compile_with_filename(&source, "_item.erb")?;
        let mut scope = Scope::new();
        scope.assign("item", args.into_iter().next().unwrap_or_default());
        Ok(TemplateValue::String(partial.render(&mut scope)?))
    });

    let template = Template::compile("<% [1, 2].each do |n| %><%= item n %><% end %>").unwrap();
    let result = template
        .render_with_functions(&mut Scope::new(), &mut functions)
        .unwrap();
    assert_eq!(result, "[1][2]");
}

#[test]
fn test_locals_from_json_object() {
    let template = Template::compile(
        "% attrs.each_pair do |key, value|\n<%= key %>=<%= value.inspect %>\n% end\n",
    )
    .unwrap();

    let mut scope = Scope::new();
    scope.assign(
        "attrs",
        TemplateValue::from(serde_json::json!({ "zeta": 1, "alpha": [true, null] })),
    );

    // Object keys keep their document order
    assert_eq!(
        template.render(&mut scope).unwrap(),
        "zeta=1\nalpha=[true, nil]\n"
    );
}
